// core/viewport.rs
//
// The visible area: size, zoom, scroll and the entities inside it.
// The viewport also stands in for the host page. It owns the millisecond clock, the
// timer queue, pending animation-frame callbacks and the event bus, and advances
// them all in `tick`.

use std::sync::atomic::{AtomicU32, Ordering};

use glam::Vec2;

use crate::api::error::EngineError;
use crate::api::game::GameConfig;
use crate::api::traits::{Animatable, Positionable, Scrollable};
use crate::api::types::{Axis, Bounds, EntityId, Rect, ScrollBounds, ViewportId};
use crate::components::attributes::Attributes;
use crate::components::entity::{Entity, Lifecycle, RepeatBehavior, DEFAULT_SIZE};
use crate::core::events::{DispatchOptions, Event, EventBus, EventKind, EventTarget, ListenerToken};
use crate::core::handle::EntityMut;
use crate::core::scene::Scene;
use crate::core::time::{TimerId, TimerQueue};
use crate::extensions::registry::{ExtensionRegistry, VariantSpec};
use crate::systems::follow::follow_scroll;
use crate::systems::geometry::{
    entity_box, entity_raw_rect, viewport_box, viewport_raw_rect, GeometryCache, PageLayout,
};

static NEXT_VIEWPORT: AtomicU32 = AtomicU32::new(1);

/// Work scheduled on the viewport's timer queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineTask {
    /// Clear an entity's cached box.
    InvalidateGeometry(EntityId),
    /// One iteration of the follow loop.
    FollowTick,
}

/// Arguments of `Viewport::create_element`.
#[derive(Debug, Clone, Default)]
pub struct ElementSpec {
    /// A registered variant, an extension name, or empty for a plain entity.
    pub name: String,
    pub attributes: Attributes,
    /// Leave the entity detached; connect it later with `append`/`insert_before`.
    pub disable_append: bool,
    /// Insert right before this sibling instead of at the end.
    pub next_to: Option<EntityId>,
}

impl ElementSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.attributes.set(name, value);
        self
    }

    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn detached(mut self) -> Self {
        self.disable_append = true;
        self
    }

    pub fn next_to(mut self, sibling: EntityId) -> Self {
        self.next_to = Some(sibling);
        self
    }
}

#[derive(Debug, Clone, Copy)]
struct Follow {
    target: EntityId,
    offset: Vec2,
    timer: Option<TimerId>,
}

/// Visible area of the game and owner of every entity in it.
pub struct Viewport {
    id: ViewportId,
    pub(crate) size: Vec2,
    pub(crate) zoom: f32,
    pub(crate) fps: f32,
    pub(crate) scroll: Vec2,
    scroll_bounds: ScrollBounds,
    pub(crate) layout: PageLayout,
    geometry: GeometryCache,
    pub(crate) scene: Scene,
    detached: Scene,
    registry: ExtensionRegistry,
    pub(crate) now_ms: f64,
    pub(crate) timers: TimerQueue<EngineTask>,
    frame_requests: Vec<EntityId>,
    follow: Option<Follow>,
    pub(crate) events: EventBus,
    mouse: Vec2,
    next_entity: u32,
    next_listener: u64,
}

impl Viewport {
    pub fn new(config: &GameConfig) -> Self {
        let id = ViewportId(NEXT_VIEWPORT.fetch_add(1, Ordering::Relaxed));
        log::info!(
            "viewport {:?}: {}x{} @ {} fps, zoom {}",
            id,
            config.width,
            config.height,
            config.fps,
            config.zoom
        );
        Self {
            id,
            size: Vec2::new(config.width, config.height),
            zoom: config.zoom,
            fps: config.fps.max(1.0),
            scroll: Vec2::ZERO,
            scroll_bounds: config.scroll_bounds(),
            layout: PageLayout {
                origin: Vec2::from(config.page_origin),
                border: Vec2::from(config.border),
            },
            geometry: GeometryCache::new(),
            scene: Scene::new(),
            detached: Scene::with_capacity(16),
            registry: ExtensionRegistry::new(),
            now_ms: 0.0,
            timers: TimerQueue::new(),
            frame_requests: Vec::new(),
            follow: None,
            events: EventBus::new(),
            mouse: Vec2::ZERO,
            next_entity: 1,
            next_listener: 1,
        }
    }

    /// Build a viewport from element attributes (`width`, `height`, `fps`, `zoom`).
    pub fn from_attributes(attributes: &Attributes) -> Result<Self, EngineError> {
        Ok(Self::new(&GameConfig::from_attributes(attributes)?))
    }

    pub fn id(&self) -> ViewportId {
        self.id
    }

    /// Current simulation time in milliseconds.
    pub fn now_ms(&self) -> f64 {
        self.now_ms
    }

    /// Milliseconds between two follow ticks or cache invalidations.
    pub fn frame_ms(&self) -> f64 {
        1000.0 / self.fps as f64
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }

    // -- Extensions --

    /// Register a named initializer. See `ExtensionRegistry::define`.
    pub fn define<F>(&mut self, name: impl Into<String>, hook: F)
    where
        F: Fn(&mut EntityMut<'_>) -> Result<Option<String>, EngineError> + 'static,
    {
        self.registry.define(name, hook);
    }

    pub fn define_variant(&mut self, name: impl Into<String>, spec: VariantSpec) {
        self.registry.define_variant(name, spec);
    }

    pub fn registry(&self) -> &ExtensionRegistry {
        &self.registry
    }

    // -- Entity creation and removal --

    /// Create an entity owned by this viewport.
    ///
    /// A registered variant name selects that variant's template and default
    /// attributes. Any other non-empty name is treated as an extension name and must
    /// be defined.
    pub fn create_element(&mut self, spec: ElementSpec) -> Result<EntityId, EngineError> {
        let ElementSpec {
            name,
            mut attributes,
            disable_append,
            next_to,
        } = spec;

        let id = EntityId(self.next_entity);
        let mut entity = Entity::new(id, self.id).with_tag(name.clone());

        match self.registry.variant(&name) {
            Some(variant) => {
                attributes.merge_defaults(&variant.defaults);
                entity = entity.with_template(variant.template.clone());
            }
            None if !name.is_empty() => attributes.set("is", &name),
            None => {}
        }
        entity = entity.with_attributes(attributes);

        if let Some(extension) = entity.extension_name() {
            if !self.registry.is_defined(extension) {
                return Err(EngineError::UnknownExtension(extension.to_string()));
            }
        }

        self.next_entity += 1;
        self.detached.spawn(entity);
        log::debug!("created {:?} `{}`", id, name);

        if !disable_append {
            match next_to {
                Some(sibling) => self.insert_before(id, sibling)?,
                None => self.append(id)?,
            }
        }
        Ok(id)
    }

    /// Connect a detached entity at the end of the scene. A connected entity is
    /// moved to the end without going through its lifecycle again.
    pub fn append(&mut self, id: EntityId) -> Result<(), EngineError> {
        if self.scene.move_to_end(id) {
            return Ok(());
        }
        let entity = self.take_for_connect(id)?;
        self.scene.spawn(entity);
        self.frame_requests.push(id);
        Ok(())
    }

    /// Connect a detached entity right before `sibling`.
    pub fn insert_before(&mut self, id: EntityId, sibling: EntityId) -> Result<(), EngineError> {
        if !self.scene.contains(sibling) {
            return Err(EngineError::UnknownEntity(sibling));
        }
        if self.scene.move_before(id, sibling) {
            return Ok(());
        }
        let entity = self.take_for_connect(id)?;
        self.scene.insert_before(entity, sibling);
        self.frame_requests.push(id);
        Ok(())
    }

    /// Read bounds, size and sticky flag, then hand the entity over for insertion.
    /// A failed read leaves the entity detached.
    fn take_for_connect(&mut self, id: EntityId) -> Result<Entity, EngineError> {
        let Some(entity) = self.detached.get(id) else {
            return Err(EngineError::UnknownEntity(id));
        };

        let attrs = &entity.attributes;
        let bounds = Bounds::new(
            attrs.get_int("xmin", f32::NEG_INFINITY)?,
            attrs.get_int("xmax", f32::INFINITY)?,
            attrs.get_int("ymin", f32::NEG_INFINITY)?,
            attrs.get_int("ymax", f32::INFINITY)?,
        );
        let width = attrs.get_int("width", DEFAULT_SIZE)?;
        let height = attrs.get_int("height", DEFAULT_SIZE)?;
        let sticky = attrs.has("sticky");

        let Some(mut entity) = self.detached.despawn(id) else {
            return Err(EngineError::UnknownEntity(id));
        };
        entity.bounds = bounds;
        entity.width = width;
        entity.height = height;
        entity.sticky = sticky;
        entity.lifecycle = Lifecycle::Connected;
        log::debug!("connected {:?}", id);
        Ok(entity)
    }

    /// Remove an entity. A connected entity is destroyed: its timers are cancelled,
    /// its listeners dropped and `destroy` is dispatched before this returns.
    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        if let Some(entity) = self.detached.despawn(id) {
            return Some(entity);
        }
        let Some(mut entity) = self.scene.despawn(id) else {
            log::warn!("remove: unknown {:?}", id);
            return None;
        };

        if let Some(timer) = entity.geometry.invalidate() {
            self.timers.cancel(timer);
        }
        entity.clear_listeners();
        self.frame_requests.retain(|pending| *pending != id);
        if self.follow.map(|f| f.target) == Some(id) {
            self.detach_follow_target();
        }

        self.events
            .dispatch(EventTarget::Entity(id), EventKind::Destroy, DispatchOptions::NONE, self.now_ms);
        log::debug!("destroyed {:?}", id);
        Some(entity)
    }

    /// Remove every entity, stop the follow loop, drop all timers and extensions.
    pub fn shutdown(&mut self) {
        self.detach_follow_target();
        for id in self.scene.ids() {
            self.remove(id);
        }
        self.detached.drain();
        self.timers.clear();
        self.frame_requests.clear();
        self.registry.clear();
        log::info!("viewport {:?}: shut down", self.id);
    }

    // -- Entity access --

    /// Look up a connected or detached entity.
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.scene.get(id).or_else(|| self.detached.get(id))
    }

    /// Mutable access to a detached entity, e.g. to set attributes before `append`.
    pub fn detached_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.detached.get_mut(id)
    }

    /// Connected entities in scene order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.scene.iter()
    }

    pub fn entity_count(&self) -> usize {
        self.scene.len()
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.scene.contains(id)
    }

    /// Live handle to a connected entity.
    pub fn handle(&mut self, id: EntityId) -> Result<EntityMut<'_>, EngineError> {
        match self.scene.position(id) {
            Some(index) => Ok(EntityMut::new(self, id, index)),
            None if self.detached.contains(id) => Err(EngineError::Detached(id)),
            None => Err(EngineError::UnknownEntity(id)),
        }
    }

    pub(crate) fn next_listener_token(&mut self) -> ListenerToken {
        let token = ListenerToken(self.next_listener);
        self.next_listener += 1;
        token
    }

    /// Cached box of the entity at scene position `index`, computed on a miss.
    /// A fresh box schedules its own invalidation one frame later.
    pub(crate) fn entity_bounding_box(&mut self, index: usize) -> Rect {
        let now = self.now_ms;
        let delay = self.frame_ms();
        let entity = self.scene.at_mut(index);
        if let Some(rect) = entity.geometry.get() {
            return rect;
        }

        let translate = Vec2::new(
            entity.channel(Axis::X).rendered_value(now),
            entity.channel(Axis::Y).rendered_value(now),
        );
        let size = Vec2::new(entity.width, entity.height);
        let raw = entity_raw_rect(&self.layout, translate, size, self.scroll, self.zoom, entity.sticky);
        let rect = entity_box(raw, self.zoom, self.scroll, entity.sticky);

        let timer = self
            .timers
            .schedule(now, delay, EngineTask::InvalidateGeometry(entity.id));
        entity.geometry.store(rect, Some(timer));
        rect
    }

    // -- Size, zoom, page layout --

    /// Configured width. `Positionable::width` is the zoom-adjusted box width.
    pub fn configured_size(&self) -> Vec2 {
        self.size
    }

    pub fn set_width(&mut self, width: f32) {
        self.size.x = width;
        self.geometry.invalidate();
    }

    pub fn set_height(&mut self, height: f32) {
        self.size.y = height;
        self.geometry.invalidate();
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn set_zoom(&mut self, zoom: f32) {
        if self.zoom == zoom {
            return;
        }
        self.zoom = zoom;
        self.geometry.invalidate();
    }

    /// The host page moved the viewport element (page scroll or layout change).
    pub fn set_page_origin(&mut self, origin: Vec2) {
        self.layout.origin = origin;
        self.geometry.invalidate();
    }

    pub fn set_border(&mut self, border: Vec2) {
        self.layout.border = border;
        self.geometry.invalidate();
    }

    /// Host window resized.
    pub fn on_host_resize(&mut self) {
        self.geometry.invalidate();
    }

    /// Host window scrolled to a new page origin for the viewport element.
    pub fn on_host_scroll(&mut self, origin: Vec2) {
        self.set_page_origin(origin);
    }

    /// Track the pointer, given in page coordinates.
    pub fn on_pointer_move(&mut self, page: Vec2) {
        let rect = self.bounding_box();
        self.mouse = page - Vec2::new(rect.left, rect.top);
    }

    /// Last pointer position relative to the viewport's top-left corner.
    pub fn mouse(&self) -> Vec2 {
        self.mouse
    }

    // -- Follow loop --

    /// Keep `target` centered (plus `offset`) by re-scrolling every frame.
    /// The first tick runs immediately.
    pub fn attach_follow_target(&mut self, target: EntityId, offset: Vec2) -> Result<(), EngineError> {
        if !self.scene.contains(target) {
            return Err(EngineError::UnknownEntity(target));
        }
        self.detach_follow_target();
        self.follow = Some(Follow {
            target,
            offset,
            timer: None,
        });
        log::debug!("following {:?}", target);
        self.follow_tick()
    }

    /// Stop the follow loop. Idempotent; a pending tick is cancelled.
    pub fn detach_follow_target(&mut self) {
        if let Some(follow) = self.follow.take() {
            if let Some(timer) = follow.timer {
                self.timers.cancel(timer);
            }
            log::debug!("stopped following {:?}", follow.target);
        }
    }

    pub fn follow_target(&self) -> Option<EntityId> {
        self.follow.map(|f| f.target)
    }

    fn follow_tick(&mut self) -> Result<(), EngineError> {
        let Some(follow) = self.follow else {
            return Ok(());
        };
        if !self.scene.contains(follow.target) {
            self.follow = None;
            return Ok(());
        }

        let center = self.handle(follow.target)?.center();
        let view = self.bounding_box();
        self.scroll = follow_scroll(
            center,
            follow.offset,
            Vec2::new(view.width, view.height),
            &self.scroll_bounds,
        );

        let timer = self.timers.schedule(self.now_ms, self.frame_ms(), EngineTask::FollowTick);
        if let Some(active) = self.follow.as_mut() {
            active.timer = Some(timer);
        }
        Ok(())
    }

    // -- Simulation --

    /// Advance the simulated host by `dt_ms`.
    ///
    /// Due timers and transition ends run in chronological order (timers first on
    /// ties, then entities in scene order, X before Y). Animation-frame callbacks
    /// requested before this call run last.
    pub fn tick(&mut self, dt_ms: f64) -> Result<(), EngineError> {
        let frames = std::mem::take(&mut self.frame_requests);
        let end = self.now_ms + dt_ms.max(0.0);

        if let Err(err) = self.advance_to(end) {
            self.requeue_frames(frames);
            return Err(err);
        }
        self.now_ms = end;

        // A failing entity leaves the queue; the rest wait for the next tick.
        let mut frames = frames.into_iter();
        let mut failure = None;
        for id in frames.by_ref() {
            if let Err(err) = self.ready_frame(id) {
                failure = Some(err);
                break;
            }
        }
        match failure {
            Some(err) => {
                self.requeue_frames(frames);
                Err(err)
            }
            None => Ok(()),
        }
    }

    /// Put untaken frame requests back ahead of any made since.
    fn requeue_frames(&mut self, frames: impl IntoIterator<Item = EntityId>) {
        let newer = std::mem::take(&mut self.frame_requests);
        self.frame_requests.extend(frames);
        self.frame_requests.extend(newer);
    }

    /// Run due timers and transition ends up to `end`. On error the clock stays at the
    /// failing event.
    fn advance_to(&mut self, end: f64) -> Result<(), EngineError> {
        loop {
            let timer_due = self.timers.next_due().filter(|due| *due <= end);
            let transition_due = self.next_transition_end().filter(|(due, _, _)| *due <= end);
            match (timer_due, transition_due) {
                (None, None) => return Ok(()),
                (Some(timer), Some((due, id, axis))) if due < timer => {
                    self.finish_transition(due, id, axis)?
                }
                (Some(timer), _) => self.run_timer(timer)?,
                (None, Some((due, id, axis))) => self.finish_transition(due, id, axis)?,
            }
        }
    }

    fn next_transition_end(&self) -> Option<(f64, EntityId, Axis)> {
        let mut next: Option<(f64, EntityId, Axis)> = None;
        for entity in self.scene.iter() {
            for axis in Axis::BOTH {
                if let Some(due) = entity.channel(axis).transition_end_ms() {
                    if next.map_or(true, |(best, _, _)| due < best) {
                        next = Some((due, entity.id, axis));
                    }
                }
            }
        }
        next
    }

    fn run_timer(&mut self, due: f64) -> Result<(), EngineError> {
        self.now_ms = self.now_ms.max(due);
        let Some((timer, task)) = self.timers.pop_due(self.now_ms) else {
            return Ok(());
        };
        match task {
            EngineTask::InvalidateGeometry(id) => {
                if let Some(entity) = self.scene.get_mut(id) {
                    entity.geometry.expire(timer);
                }
                Ok(())
            }
            EngineTask::FollowTick => {
                if self.follow.and_then(|f| f.timer) == Some(timer) {
                    self.follow_tick()
                } else {
                    Ok(())
                }
            }
        }
    }

    /// A channel transition ended: dispatch `transformationEnd` on the channel, then
    /// fire the axis listener, if any, as `afterMoveX`/`afterMoveY`.
    fn finish_transition(&mut self, due: f64, id: EntityId, axis: Axis) -> Result<(), EngineError> {
        self.now_ms = self.now_ms.max(due);
        let now = self.now_ms;
        let Some(entity) = self.scene.get_mut(id) else {
            return Ok(());
        };
        let Some(end) = entity.channel_mut(axis).finish_transition(now) else {
            return Ok(());
        };
        let stale = entity.geometry.invalidate();
        let listener = entity.listeners[axis.index()].take();
        if let Some(timer) = stale {
            self.timers.cancel(timer);
        }

        self.events.dispatch(
            EventTarget::Channel(id, axis),
            EventKind::TransformationEnd(end),
            DispatchOptions::NONE,
            now,
        );

        if let Some((_, request)) = listener {
            self.events.dispatch(
                EventTarget::Entity(id),
                EventKind::after_move(axis),
                DispatchOptions::BUBBLING.cancelable(),
                now,
            );
            if request.options.repeat == RepeatBehavior::Repeat {
                let next = request.target + request.displacement;
                self.handle(id)?
                    .reissue_move(axis, next, request.displacement, request.options)?;
            }
        }
        Ok(())
    }

    /// Animation frame after connection: initial placement, transition attributes,
    /// speeds, extension hook, then `ready`.
    fn ready_frame(&mut self, id: EntityId) -> Result<(), EngineError> {
        let Some(entity) = self.scene.get(id) else {
            return Ok(());
        };
        if entity.lifecycle != Lifecycle::Connected {
            return Ok(());
        }

        let attrs = &entity.attributes;
        let x = attrs.get_int("x", 0.0)?;
        let y = attrs.get_int("y", 0.0)?;
        let hspeed = attrs.get_int("hspeed", 0.0)?;
        let vspeed = attrs.get_int("vspeed", 0.0)?;
        let duration = attrs.get("duration").map(str::to_owned);
        let timing = attrs.get("timing-function").map(str::to_owned);
        let hook = match entity.extension_name() {
            Some(name) => Some(self.registry.hook(name)?),
            None => None,
        };

        {
            let mut handle = self.handle(id)?;
            handle.set_x(x);
            handle.set_y(y);
            handle.set_transition(duration.as_deref(), timing.as_deref())?;
            // Entities start stationary; a zero speed would reset the duration just read.
            if hspeed != 0.0 {
                handle.set_hspeed(hspeed)?;
            }
            if vspeed != 0.0 {
                handle.set_vspeed(vspeed)?;
            }
            if let Some(hook) = hook {
                if let Some(markup) = hook(&mut handle)? {
                    handle.push_markup(markup);
                }
            }
        }

        if let Some(entity) = self.scene.get_mut(id) {
            entity.lifecycle = Lifecycle::Ready;
        }
        self.events
            .dispatch(EventTarget::Entity(id), EventKind::Ready, DispatchOptions::BUBBLING, self.now_ms);
        Ok(())
    }

    // -- Events --

    /// Drain every event dispatched since the last drain.
    pub fn drain_events(&mut self) -> Vec<Event> {
        self.events.drain()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }
}

impl Positionable for Viewport {
    /// The viewport's own box with border compensation. Cleared by size, zoom and
    /// page-layout changes.
    fn bounding_box(&mut self) -> Rect {
        if let Some(rect) = self.geometry.get() {
            return rect;
        }
        let raw = viewport_raw_rect(&self.layout, self.size, self.zoom);
        let rect = viewport_box(raw, self.zoom, self.layout.border);
        self.geometry.store(rect, None);
        rect
    }

    fn x(&mut self) -> f32 {
        self.bounding_box().left
    }

    fn y(&mut self) -> f32 {
        self.bounding_box().top
    }
}

impl Scrollable for Viewport {
    fn scroll(&self) -> Vec2 {
        self.scroll
    }

    fn set_scroll(&mut self, scroll: Vec2) {
        self.scroll = self.scroll_bounds.clamp(scroll);
    }

    fn scroll_bounds(&self) -> ScrollBounds {
        self.scroll_bounds
    }

    fn set_scroll_bounds(&mut self, bounds: ScrollBounds) {
        self.scroll_bounds = bounds;
        self.scroll = bounds.clamp(self.scroll);
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(&GameConfig::default())
    }
}
