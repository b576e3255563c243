use glam::Vec2;

use crate::api::error::EngineError;
use crate::api::traits::{Animatable, Positionable};
use crate::api::types::{Axis, EntityId, Rect};
use crate::components::attributes::Attributes;
use crate::components::channel::DurationSpec;
use crate::components::entity::{Entity, MoveOptions, MoveRequest};
use crate::core::viewport::Viewport;
use crate::extensions::easing::Easing;

/// Distance of a speed-only "fling": far enough to be clamped by any sane bound.
pub const FLING_DISTANCE: f32 = 9999.0;

/// Live, mutable view of one connected entity.
///
/// Position and size reads go through the entity's geometry cache; writes go to the
/// transform channels and are committed at once. Obtained from `Viewport::handle`.
pub struct EntityMut<'a> {
    viewport: &'a mut Viewport,
    id: EntityId,
    index: usize,
}

impl<'a> EntityMut<'a> {
    pub(crate) fn new(viewport: &'a mut Viewport, id: EntityId, index: usize) -> Self {
        Self { viewport, id, index }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn entity(&self) -> &Entity {
        self.viewport.scene.at(self.index)
    }

    fn entity_mut(&mut self) -> &mut Entity {
        self.viewport.scene.at_mut(self.index)
    }

    /// The owning viewport, read-only.
    pub fn viewport(&self) -> &Viewport {
        &*self.viewport
    }

    pub fn attributes(&self) -> &Attributes {
        &self.entity().attributes
    }

    pub fn tag(&self) -> &str {
        &self.entity().tag
    }

    pub fn set_width(&mut self, width: f32) {
        self.entity_mut().width = width;
    }

    pub fn set_height(&mut self, height: f32) {
        self.entity_mut().height = height;
    }

    pub fn set_sticky(&mut self, sticky: bool) {
        self.entity_mut().sticky = sticky;
    }

    pub(crate) fn push_markup(&mut self, markup: String) {
        self.entity_mut().markup.push(markup);
    }

    /// Position on `axis`: cached box corner minus the viewport's corner.
    pub fn position(&mut self, axis: Axis) -> f32 {
        let rect = self.bounding_box();
        let view = self.viewport.bounding_box();
        match axis {
            Axis::X => rect.left - view.left,
            Axis::Y => rect.top - view.top,
        }
    }

    /// Clamp into bounds, floor, and commit with the channel's current duration.
    pub fn set_position(&mut self, axis: Axis, value: f32) {
        let now = self.viewport.now_ms;
        let entity = self.entity_mut();
        let value = entity.bounds.clamp(axis, value);
        let channel = entity.channel_mut(axis);
        channel.set_value(value);
        channel.apply_transform(now);
    }

    pub fn set_x(&mut self, x: f32) {
        self.set_position(Axis::X, x);
    }

    pub fn set_y(&mut self, y: f32) {
        self.set_position(Axis::Y, y);
    }

    /// Transition used by later position writes on both axes, as written in markup:
    /// `duration` like `"250ms"` or `"2"`, `easing` like `"ease-in"`. Both are parsed
    /// before either channel changes.
    pub fn set_transition(&mut self, duration: Option<&str>, easing: Option<&str>) -> Result<(), EngineError> {
        let duration = duration.map(str::parse::<DurationSpec>).transpose()?;
        let easing = easing.map(str::parse::<Easing>).transpose()?;
        let entity = self.entity_mut();
        for axis in Axis::BOTH {
            let channel = entity.channel_mut(axis);
            if let Some(duration) = duration {
                channel.set_duration(duration);
            }
            if let Some(easing) = easing {
                channel.set_easing(easing);
            }
        }
        Ok(())
    }

    /// Move toward `target` at `options.speed` pixels per second.
    ///
    /// Any pending listener on the axis is replaced; the new one fires once, when the
    /// transition ends. A move that does not change the position starts no transition.
    pub fn move_axis(&mut self, axis: Axis, target: f32, options: MoveOptions) -> Result<(), EngineError> {
        let prev = self.position(axis);
        self.start_move(axis, prev, target, target - prev, options)
    }

    /// Repeat of a completed move: same displacement, listener kept as requested.
    pub(crate) fn reissue_move(
        &mut self,
        axis: Axis,
        target: f32,
        displacement: f32,
        options: MoveOptions,
    ) -> Result<(), EngineError> {
        let prev = self.position(axis);
        self.start_move(axis, prev, target, displacement, options)
    }

    fn start_move(
        &mut self,
        axis: Axis,
        prev: f32,
        target: f32,
        displacement: f32,
        options: MoveOptions,
    ) -> Result<(), EngineError> {
        if !options.speed.is_finite() || options.speed <= 0.0 {
            return Err(EngineError::InvalidSpeed(options.speed));
        }

        let token = self.viewport.next_listener_token();
        let now = self.viewport.now_ms;
        let entity = self.entity_mut();
        let next = entity.bounds.clamp(axis, target);
        let duration = DurationSpec::seconds((next - prev).abs() / options.speed);

        let request = MoveRequest {
            target,
            displacement,
            options,
        };
        if let Some((replaced, _)) = entity.listeners[axis.index()].arm(token, request) {
            log::debug!("{:?}: move listener {:?} superseded", entity.id, replaced);
        }

        let channel = entity.channel_mut(axis);
        channel.set_duration(duration);
        channel.set_easing(options.easing);
        channel.set_value_from(prev, next);
        channel.apply_transform(now);
        log::debug!("{:?}: move {:?} {} -> {} over {}", self.id, axis, prev, next, duration);
        Ok(())
    }

    /// Speed of the last change on `axis`, in pixels per second.
    pub fn speed(&self, axis: Axis) -> f32 {
        self.entity().channel(axis).speed()
    }

    /// Zero stops the axis in place. Anything else flings the entity toward the far
    /// bound in the speed's direction, repeating until stopped.
    pub fn set_speed(&mut self, axis: Axis, speed: f32) -> Result<(), EngineError> {
        let channel = self.entity().channel(axis);
        if channel.speed() == speed && channel.duration().is_zero() {
            return Ok(());
        }

        if speed == 0.0 {
            let entity = self.entity_mut();
            entity.listeners[axis.index()].clear();
            entity.channel_mut(axis).set_duration(DurationSpec::ZERO);
            let here = self.position(axis);
            self.set_position(axis, here);
            return Ok(());
        }

        if !speed.is_finite() {
            return Err(EngineError::InvalidSpeed(speed));
        }
        let target = self.position(axis) + FLING_DISTANCE * speed.signum();
        self.move_axis(axis, target, MoveOptions::speed(speed.abs()).repeating())
    }
}

impl Positionable for EntityMut<'_> {
    fn bounding_box(&mut self) -> Rect {
        self.viewport.entity_bounding_box(self.index)
    }

    fn x(&mut self) -> f32 {
        self.position(Axis::X)
    }

    fn y(&mut self) -> f32 {
        self.position(Axis::Y)
    }
}

impl Animatable for EntityMut<'_> {
    fn move_x(&mut self, target: f32, options: MoveOptions) -> Result<(), EngineError> {
        self.move_axis(Axis::X, target, options)
    }

    fn move_y(&mut self, target: f32, options: MoveOptions) -> Result<(), EngineError> {
        self.move_axis(Axis::Y, target, options)
    }

    fn stop(&mut self) {
        let entity = self.entity_mut();
        entity.clear_listeners();
        for axis in Axis::BOTH {
            entity.channel_mut(axis).set_duration(DurationSpec::ZERO);
        }
        let here = Vec2::new(self.x(), self.y());
        self.set_x(here.x);
        self.set_y(here.y);
    }

    fn hspeed(&self) -> f32 {
        self.speed(Axis::X)
    }

    fn vspeed(&self) -> f32 {
        self.speed(Axis::Y)
    }

    fn set_hspeed(&mut self, speed: f32) -> Result<(), EngineError> {
        self.set_speed(Axis::X, speed)
    }

    fn set_vspeed(&mut self, speed: f32) -> Result<(), EngineError> {
        self.set_speed(Axis::Y, speed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::game::GameConfig;
    use crate::api::types::Bounds;
    use crate::components::entity::RepeatBehavior;
    use crate::core::events::EventKind;
    use crate::core::viewport::ElementSpec;

    fn ready_entity(vp: &mut Viewport, attrs: &[(&str, &str)]) -> EntityId {
        let mut spec = ElementSpec::default();
        for (name, value) in attrs {
            spec = spec.with_attribute(*name, *value);
        }
        let id = vp.create_element(spec).unwrap();
        vp.tick(0.0).unwrap();
        vp.drain_events();
        id
    }

    #[test]
    fn set_position_clamps_and_floors() {
        let mut vp = Viewport::new(&GameConfig::default());
        let id = ready_entity(&mut vp, &[("xmin", "0"), ("xmax", "100")]);
        let mut e = vp.handle(id).unwrap();
        e.set_x(250.7);
        assert_eq!(e.entity().channel(Axis::X).value(), 100.0);
        e.set_x(-3.0);
        assert_eq!(e.entity().channel(Axis::X).value(), 0.0);
        e.set_y(12.9);
        assert_eq!(e.entity().channel(Axis::Y).value(), 12.0);
        assert_eq!(e.entity().bounds, Bounds::new(0.0, 100.0, f32::NEG_INFINITY, f32::INFINITY));
    }

    #[test]
    fn move_sets_duration_from_speed() {
        let mut vp = Viewport::new(&GameConfig::default());
        let id = ready_entity(&mut vp, &[("x", "10")]);
        let mut e = vp.handle(id).unwrap();
        e.move_x(60.0, MoveOptions::speed(25.0).with_easing(Easing::EaseIn)).unwrap();

        let channel = e.entity().channel(Axis::X);
        assert_eq!(channel.duration(), DurationSpec::seconds(2.0));
        assert_eq!(channel.easing(), Easing::EaseIn);
        assert_eq!(e.hspeed(), 25.0);
        assert!(e.entity().pending_move(Axis::X).is_some());
    }

    #[test]
    fn transition_strings_apply_to_both_axes() {
        let mut vp = Viewport::new(&GameConfig::default());
        let id = ready_entity(&mut vp, &[]);
        let mut e = vp.handle(id).unwrap();
        e.set_transition(Some("250ms"), Some("ease-out")).unwrap();
        for axis in Axis::BOTH {
            let channel = e.entity().channel(axis);
            assert_eq!(channel.duration(), DurationSpec::millis(250.0));
            assert_eq!(channel.easing(), Easing::EaseOut);
        }

        assert!(matches!(
            e.set_transition(Some("1s"), Some("wobbly")),
            Err(EngineError::MalformedEasing(_))
        ));
        assert!(matches!(
            e.set_transition(Some("soon"), None),
            Err(EngineError::MalformedDuration(_))
        ));
        assert_eq!(e.entity().channel(Axis::X).duration(), DurationSpec::millis(250.0));

        e.set_x(40.0);
        assert!(e.entity().channel(Axis::X).is_transitioning());
    }

    #[test]
    fn invalid_speed_leaves_entity_untouched() {
        let mut vp = Viewport::new(&GameConfig::default());
        let id = ready_entity(&mut vp, &[]);
        let mut e = vp.handle(id).unwrap();
        for speed in [0.0, -5.0, f32::NAN, f32::INFINITY] {
            assert!(matches!(
                e.move_y(100.0, MoveOptions::speed(speed)),
                Err(EngineError::InvalidSpeed(_))
            ));
        }
        assert!(e.entity().pending_move(Axis::Y).is_none());
        assert!(!e.entity().channel(Axis::Y).is_transitioning());
    }

    #[test]
    fn second_move_supersedes_first() {
        let mut vp = Viewport::new(&GameConfig::default());
        let id = ready_entity(&mut vp, &[]);
        {
            let mut e = vp.handle(id).unwrap();
            e.move_x(100.0, MoveOptions::speed(100.0)).unwrap();
        }
        vp.tick(500.0).unwrap();
        vp.handle(id).unwrap().move_x(0.0, MoveOptions::speed(100.0)).unwrap();
        vp.tick(2000.0).unwrap();

        let after_moves = vp
            .drain_events()
            .into_iter()
            .filter(|e| e.kind == EventKind::AfterMoveX)
            .count();
        assert_eq!(after_moves, 1);
        assert_eq!(vp.handle(id).unwrap().x(), 0.0);
    }

    #[test]
    fn retarget_mid_flight_keeps_requested_speed() {
        let mut vp = Viewport::new(&GameConfig::default());
        let id = ready_entity(&mut vp, &[]);
        vp.handle(id).unwrap().move_x(100.0, MoveOptions::speed(100.0)).unwrap();
        vp.tick(500.0).unwrap();

        let mut e = vp.handle(id).unwrap();
        assert_eq!(e.x(), 50.0);
        e.move_x(0.0, MoveOptions::speed(100.0)).unwrap();
        let channel = e.entity().channel(Axis::X);
        assert_eq!(channel.duration(), DurationSpec::seconds(0.5));
        assert_eq!(channel.prev_value(), 50.0);
        assert!((e.hspeed() + 100.0).abs() < 1e-3);
    }

    #[test]
    fn zero_distance_move_keeps_listener_pending() {
        let mut vp = Viewport::new(&GameConfig::default());
        let id = ready_entity(&mut vp, &[("x", "20")]);
        vp.handle(id).unwrap().move_x(20.0, MoveOptions::speed(10.0)).unwrap();
        vp.tick(1000.0).unwrap();
        assert!(vp.drain_events().is_empty());
        assert!(vp.entity(id).unwrap().pending_move(Axis::X).is_some());
    }

    #[test]
    fn stop_freezes_both_axes() {
        let mut vp = Viewport::new(&GameConfig::default());
        let id = ready_entity(&mut vp, &[]);
        {
            let mut e = vp.handle(id).unwrap();
            e.move_x(100.0, MoveOptions::speed(100.0)).unwrap();
            e.move_y(100.0, MoveOptions::speed(100.0)).unwrap();
        }
        vp.tick(500.0).unwrap();
        let mut e = vp.handle(id).unwrap();
        e.stop();
        let entity = e.entity();
        assert!(entity.pending_move(Axis::X).is_none());
        assert!(entity.pending_move(Axis::Y).is_none());
        assert!(entity.channel(Axis::X).duration().is_zero());
        assert!(!entity.channel(Axis::X).is_transitioning());
        assert_eq!(e.hspeed(), 0.0);
        vp.tick(2000.0).unwrap();
        assert!(vp.drain_events().is_empty());
    }

    #[test]
    fn center_is_half_size_from_corner() {
        let mut vp = Viewport::new(&GameConfig::default());
        let id = ready_entity(&mut vp, &[("x", "10"), ("y", "20"), ("width", "32"), ("height", "8")]);
        assert_eq!(vp.handle(id).unwrap().center(), Vec2::new(26.0, 24.0));
    }

    #[test]
    fn fling_targets_far_bound_and_repeats() {
        let mut vp = Viewport::new(&GameConfig::default());
        let id = ready_entity(&mut vp, &[]);
        vp.handle(id).unwrap().set_hspeed(-40.0).unwrap();
        {
            let e = vp.entity(id).unwrap();
            assert_eq!(e.channel(Axis::X).value(), -FLING_DISTANCE);
            assert_eq!(e.pending_move(Axis::X).unwrap().options.repeat, RepeatBehavior::Repeat);
        }
        assert!((vp.handle(id).unwrap().hspeed() + 40.0).abs() < 1e-3);
    }
}
