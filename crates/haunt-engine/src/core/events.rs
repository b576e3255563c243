// core/events.rs
//
// Event bus for lifecycle and motion events.
// Dispatch is queued: game logic drains the bus after each tick, the same way
// it drains input. Targets and the bubbling flag decide who an event reaches.

use std::collections::VecDeque;

use crate::api::types::{Axis, EntityId};
use crate::components::channel::TransformEnd;

/// Where an event was dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventTarget {
    Viewport,
    Entity(EntityId),
    Channel(EntityId, Axis),
}

impl EventTarget {
    /// The node a bubbling event travels to next.
    pub fn parent(self) -> Option<EventTarget> {
        match self {
            EventTarget::Viewport => None,
            EventTarget::Entity(_) => Some(EventTarget::Viewport),
            // The X channel is nested inside the Y channel.
            EventTarget::Channel(id, Axis::X) => Some(EventTarget::Channel(id, Axis::Y)),
            EventTarget::Channel(id, Axis::Y) => Some(EventTarget::Entity(id)),
        }
    }
}

/// Semantic event kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    /// Entity fully initialized (placement, speeds, extension hook).
    Ready,
    /// Entity removed from its viewport.
    Destroy,
    AfterMoveX,
    AfterMoveY,
    /// Low-level channel transition completion.
    TransformationEnd(TransformEnd),
}

impl EventKind {
    pub fn after_move(axis: Axis) -> Self {
        match axis {
            Axis::X => EventKind::AfterMoveX,
            Axis::Y => EventKind::AfterMoveY,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            EventKind::Ready => "ready",
            EventKind::Destroy => "destroy",
            EventKind::AfterMoveX => "afterMoveX",
            EventKind::AfterMoveY => "afterMoveY",
            EventKind::TransformationEnd(_) => "transformationEnd",
        }
    }
}

/// Dispatch flags. `composed` defaults to `bubbles`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOptions {
    pub bubbles: bool,
    pub cancelable: bool,
    pub composed: Option<bool>,
}

impl DispatchOptions {
    pub const NONE: DispatchOptions = DispatchOptions {
        bubbles: false,
        cancelable: false,
        composed: None,
    };

    pub const BUBBLING: DispatchOptions = DispatchOptions {
        bubbles: true,
        cancelable: false,
        composed: None,
    };

    pub fn cancelable(mut self) -> Self {
        self.cancelable = true;
        self
    }
}

/// A dispatched event.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub target: EventTarget,
    pub kind: EventKind,
    pub bubbles: bool,
    pub cancelable: bool,
    pub composed: bool,
    /// Simulation time of dispatch, in milliseconds.
    pub time_ms: f64,
    default_prevented: bool,
}

impl Event {
    /// Whether a listener attached to `listener` observes this event.
    pub fn reaches(&self, listener: EventTarget) -> bool {
        if self.target == listener {
            return true;
        }
        if !self.bubbles {
            return false;
        }
        let mut node = self.target.parent();
        while let Some(current) = node {
            if current == listener {
                return true;
            }
            node = current.parent();
        }
        false
    }

    /// The entity this event concerns, if any.
    pub fn entity(&self) -> Option<EntityId> {
        match self.target {
            EventTarget::Entity(id) | EventTarget::Channel(id, _) => Some(id),
            EventTarget::Viewport => None,
        }
    }

    /// Mark the event as handled. No-op for non-cancelable events.
    pub fn prevent_default(&mut self) {
        if self.cancelable {
            self.default_prevented = true;
        }
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }
}

/// Queue of dispatched events, drained by game logic.
#[derive(Debug, Default)]
pub struct EventBus {
    queue: VecDeque<Event>,
    dispatched: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dispatch an event. Returns the queued event.
    pub fn dispatch(
        &mut self,
        target: EventTarget,
        kind: EventKind,
        options: DispatchOptions,
        time_ms: f64,
    ) -> &Event {
        log::debug!("event {} on {:?}", kind.name(), target);
        self.dispatched += 1;
        self.queue.push_back(Event {
            target,
            kind,
            bubbles: options.bubbles,
            cancelable: options.cancelable,
            composed: options.composed.unwrap_or(options.bubbles),
            time_ms,
            default_prevented: false,
        });
        &self.queue[self.queue.len() - 1]
    }

    /// Drain all pending events in dispatch order.
    pub fn drain(&mut self) -> Vec<Event> {
        self.queue.drain(..).collect()
    }

    /// Iterate over pending events without consuming them.
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.queue.iter()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Total number of events ever dispatched.
    pub fn dispatched(&self) -> u64 {
        self.dispatched
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

/// Token identifying one registration of a one-shot listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerToken(pub u64);

/// A cancellable one-shot subscription slot.
///
/// Holds at most one armed registration. Arming again replaces (and invalidates)
/// the previous one; `take` consumes it so it fires at most once.
#[derive(Debug, Clone)]
pub struct OneShot<T> {
    armed: Option<(ListenerToken, T)>,
}

impl<T> OneShot<T> {
    pub fn new() -> Self {
        Self { armed: None }
    }

    /// Arm with a new registration. Returns the registration it replaced.
    pub fn arm(&mut self, token: ListenerToken, value: T) -> Option<(ListenerToken, T)> {
        self.armed.replace((token, value))
    }

    /// Drop the current registration.
    pub fn clear(&mut self) -> Option<(ListenerToken, T)> {
        self.armed.take()
    }

    /// Consume the registration for firing.
    pub fn take(&mut self) -> Option<(ListenerToken, T)> {
        self.armed.take()
    }

    pub fn token(&self) -> Option<ListenerToken> {
        self.armed.as_ref().map(|(token, _)| *token)
    }

    pub fn get(&self) -> Option<&T> {
        self.armed.as_ref().map(|(_, value)| value)
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }
}

impl<T> Default for OneShot<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bubbling_event_reaches_ancestors() {
        let mut bus = EventBus::new();
        let id = EntityId(3);
        bus.dispatch(
            EventTarget::Entity(id),
            EventKind::AfterMoveX,
            DispatchOptions::BUBBLING.cancelable(),
            0.0,
        );
        let event = &bus.drain()[0];
        assert!(event.reaches(EventTarget::Entity(id)));
        assert!(event.reaches(EventTarget::Viewport));
        assert!(!event.reaches(EventTarget::Entity(EntityId(4))));
        assert!(event.composed);
    }

    #[test]
    fn non_bubbling_event_stays_on_target() {
        let mut bus = EventBus::new();
        let id = EntityId(1);
        bus.dispatch(EventTarget::Channel(id, Axis::X), EventKind::Destroy, DispatchOptions::NONE, 0.0);
        let event = &bus.drain()[0];
        assert!(event.reaches(EventTarget::Channel(id, Axis::X)));
        assert!(!event.reaches(EventTarget::Channel(id, Axis::Y)));
        assert!(!event.reaches(EventTarget::Entity(id)));
    }

    #[test]
    fn prevent_default_requires_cancelable() {
        let mut bus = EventBus::new();
        bus.dispatch(EventTarget::Viewport, EventKind::Ready, DispatchOptions::NONE, 0.0);
        bus.dispatch(EventTarget::Viewport, EventKind::Ready, DispatchOptions::NONE.cancelable(), 0.0);
        let mut events = bus.drain();
        events[0].prevent_default();
        events[1].prevent_default();
        assert!(!events[0].default_prevented());
        assert!(events[1].default_prevented());
        assert_eq!(bus.dispatched(), 2);
        assert!(bus.is_empty());
    }

    #[test]
    fn one_shot_replaces_and_fires_once() {
        let mut slot = OneShot::new();
        assert!(slot.arm(ListenerToken(1), "first").is_none());
        let replaced = slot.arm(ListenerToken(2), "second");
        assert_eq!(replaced, Some((ListenerToken(1), "first")));
        assert_eq!(slot.token(), Some(ListenerToken(2)));
        assert_eq!(slot.take(), Some((ListenerToken(2), "second")));
        assert!(slot.take().is_none());
    }
}
