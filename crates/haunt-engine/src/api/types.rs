use bytemuck::{Pod, Zeroable};

/// Unique identifier for an entity owned by a viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u32);

/// Identifier of a viewport. Entities carry it as their owner back-reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewportId(pub u32);

/// One of the two motion axes. Each maps to its own transform channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    pub const BOTH: [Axis; 2] = [Axis::X, Axis::Y];

    /// Slot index for per-axis storage.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
        }
    }
}

/// A sound event emitted by the game logic.
/// The numeric value maps to a game-defined sound on the host page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct SoundEvent(pub u32);

/// A game event handed to the host page through a flat float buffer.
/// Generic container: `kind` identifies the event, `a/b/c` carry payload.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct GameEvent {
    pub kind: f32,
    pub a: f32,
    pub b: f32,
    pub c: f32,
}

impl GameEvent {
    pub const FLOATS: usize = 4;

    pub fn new(kind: f32, a: f32, b: f32, c: f32) -> Self {
        Self { kind, a, b, c }
    }
}

/// Screen-space box in unzoomed pixels, as returned by the geometry caches.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self { left, top, width, height }
    }
}

/// Position bounds of an entity. Unset sides are infinite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub xmin: f32,
    pub xmax: f32,
    pub ymin: f32,
    pub ymax: f32,
}

impl Default for Bounds {
    fn default() -> Self {
        Self::UNBOUNDED
    }
}

impl Bounds {
    pub const UNBOUNDED: Bounds = Bounds {
        xmin: f32::NEG_INFINITY,
        xmax: f32::INFINITY,
        ymin: f32::NEG_INFINITY,
        ymax: f32::INFINITY,
    };

    pub fn new(xmin: f32, xmax: f32, ymin: f32, ymax: f32) -> Self {
        Self { xmin, xmax, ymin, ymax }
    }

    /// Clamp a value into the bounds of `axis`, then floor it.
    /// The lower bound wins when the bounds cross.
    pub fn clamp(&self, axis: Axis, value: f32) -> f32 {
        let (min, max) = match axis {
            Axis::X => (self.xmin, self.xmax),
            Axis::Y => (self.ymin, self.ymax),
        };
        min.max(max.min(value)).floor()
    }
}

/// Scroll limits of a viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollBounds {
    pub min_x: f32,
    pub max_x: f32,
    pub min_y: f32,
    pub max_y: f32,
}

impl Default for ScrollBounds {
    fn default() -> Self {
        Self {
            min_x: 0.0,
            max_x: f32::INFINITY,
            min_y: 0.0,
            max_y: f32::INFINITY,
        }
    }
}

impl ScrollBounds {
    pub fn new(min_x: f32, max_x: f32, min_y: f32, max_y: f32) -> Self {
        Self { min_x, max_x, min_y, max_y }
    }

    /// Clamp a scroll offset into the bounds. The upper bound wins when they cross.
    pub fn clamp(&self, scroll: glam::Vec2) -> glam::Vec2 {
        glam::Vec2::new(
            self.max_x.min(self.min_x.max(scroll.x)),
            self.max_y.min(self.min_y.max(scroll.y)),
        )
    }
}
