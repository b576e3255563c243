use crate::api::types::{Axis, Bounds, EntityId, ViewportId};
use crate::components::attributes::Attributes;
use crate::components::channel::TransformChannel;
use crate::core::events::OneShot;
use crate::extensions::easing::Easing;
use crate::systems::geometry::GeometryCache;

/// Default width/height of an entity, in pixels.
pub const DEFAULT_SIZE: f32 = 16.0;

/// Base content of a generic entity.
pub const DEFAULT_TEMPLATE: &str = "<slot></slot>";

/// Where an entity is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Created but not yet inserted into the viewport.
    Detached,
    /// Inserted; waiting for the next animation frame to become ready.
    Connected,
    /// Initial placement applied, extension hook ran, `ready` dispatched.
    Ready,
}

/// What happens when a move completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RepeatBehavior {
    /// Fire `afterMove` and stop.
    #[default]
    Once,
    /// Fire `afterMove`, then issue the same displacement again.
    Repeat,
}

/// Options of a `move_x`/`move_y` call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveOptions {
    /// Pixels per second. Must be finite and positive.
    pub speed: f32,
    pub easing: Easing,
    pub repeat: RepeatBehavior,
}

impl MoveOptions {
    pub fn speed(speed: f32) -> Self {
        Self {
            speed,
            easing: Easing::Linear,
            repeat: RepeatBehavior::Once,
        }
    }

    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    pub fn repeating(mut self) -> Self {
        self.repeat = RepeatBehavior::Repeat;
        self
    }
}

/// A move as it was requested, kept by the axis listener until completion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveRequest {
    /// Requested (unclamped) target.
    pub target: f32,
    /// Requested displacement from the position the move started at.
    pub displacement: f32,
    pub options: MoveOptions,
}

/// A positioned, sized, independently movable object built from two transform
/// channels. Owned by its viewport's scene; behavior lives on `EntityMut`.
#[derive(Debug, Clone)]
pub struct Entity {
    /// Unique identifier.
    pub id: EntityId,
    /// Viewport that created this entity.
    pub owner: ViewportId,
    /// Element name: a variant name, an extension name, or empty.
    pub tag: String,
    pub attributes: Attributes,
    pub bounds: Bounds,
    /// Exempt from scroll translation.
    pub sticky: bool,
    pub(crate) width: f32,
    pub(crate) height: f32,
    pub(crate) channels: [TransformChannel; 2],
    pub(crate) listeners: [OneShot<MoveRequest>; 2],
    pub(crate) geometry: GeometryCache,
    pub(crate) lifecycle: Lifecycle,
    pub(crate) template: String,
    pub(crate) markup: Vec<String>,
}

impl Entity {
    /// Create a detached entity with default size and no bounds.
    pub fn new(id: EntityId, owner: ViewportId) -> Self {
        Self {
            id,
            owner,
            tag: String::new(),
            attributes: Attributes::new(),
            bounds: Bounds::UNBOUNDED,
            sticky: false,
            width: DEFAULT_SIZE,
            height: DEFAULT_SIZE,
            channels: [
                TransformChannel::for_axis(Axis::X),
                TransformChannel::for_axis(Axis::Y),
            ],
            listeners: [OneShot::new(), OneShot::new()],
            geometry: GeometryCache::new(),
            lifecycle: Lifecycle::Detached,
            template: DEFAULT_TEMPLATE.to_string(),
            markup: Vec::new(),
        }
    }

    // -- Builder pattern --

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    pub fn channel(&self, axis: Axis) -> &TransformChannel {
        &self.channels[axis.index()]
    }

    pub fn channel_mut(&mut self, axis: Axis) -> &mut TransformChannel {
        &mut self.channels[axis.index()]
    }

    /// The pending completion listener of an axis, if a move is in flight.
    pub fn pending_move(&self, axis: Axis) -> Option<&MoveRequest> {
        self.listeners[axis.index()].get()
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn is_connected(&self) -> bool {
        self.lifecycle != Lifecycle::Detached
    }

    pub fn is_ready(&self) -> bool {
        self.lifecycle == Lifecycle::Ready
    }

    /// Extension name declared by the `is` attribute.
    pub fn extension_name(&self) -> Option<&str> {
        self.attributes.get("is").filter(|name| !name.is_empty())
    }

    /// Base template followed by the markup returned from the extension hook.
    pub fn content(&self) -> String {
        let mut content = self.template.clone();
        for extra in &self.markup {
            content.push_str(extra);
        }
        content
    }

    /// Drop both pending move listeners.
    pub(crate) fn clear_listeners(&mut self) {
        for slot in &mut self.listeners {
            slot.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::events::ListenerToken;

    #[test]
    fn new_entity_defaults() {
        let e = Entity::new(EntityId(1), ViewportId(0));
        assert_eq!(e.width, DEFAULT_SIZE);
        assert_eq!(e.height, DEFAULT_SIZE);
        assert_eq!(e.bounds, Bounds::UNBOUNDED);
        assert_eq!(e.lifecycle(), Lifecycle::Detached);
        assert_eq!(e.content(), DEFAULT_TEMPLATE);
        assert!(e.extension_name().is_none());
    }

    #[test]
    fn extension_name_from_attribute() {
        let e = Entity::new(EntityId(1), ViewportId(0))
            .with_attributes(Attributes::new().with("is", "Character"));
        assert_eq!(e.extension_name(), Some("Character"));
    }

    #[test]
    fn clear_listeners_drops_both_axes() {
        let mut e = Entity::new(EntityId(1), ViewportId(0));
        let request = MoveRequest {
            target: 10.0,
            displacement: 10.0,
            options: MoveOptions::speed(5.0),
        };
        e.listeners[0].arm(ListenerToken(1), request);
        e.listeners[1].arm(ListenerToken(2), request);
        assert!(e.pending_move(Axis::X).is_some());
        e.clear_listeners();
        assert!(e.pending_move(Axis::X).is_none());
        assert!(e.pending_move(Axis::Y).is_none());
    }
}
