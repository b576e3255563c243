use glam::Vec2;

use crate::api::error::EngineError;
use crate::api::types::{Rect, ScrollBounds};
use crate::components::entity::MoveOptions;

/// Anything with a cached screen-space box.
///
/// Reads go through the geometry cache, so they take `&mut self`: the first read in a
/// validity window computes and stores the box.
pub trait Positionable {
    fn bounding_box(&mut self) -> Rect;

    fn x(&mut self) -> f32;

    fn y(&mut self) -> f32;

    fn width(&mut self) -> f32 {
        self.bounding_box().width
    }

    fn height(&mut self) -> f32 {
        self.bounding_box().height
    }

    /// `(x + width / 2, y + height / 2)`.
    fn center(&mut self) -> Vec2 {
        let x = self.x();
        let y = self.y();
        let rect = self.bounding_box();
        Vec2::new(x + rect.width / 2.0, y + rect.height / 2.0)
    }
}

/// A scrolling container.
pub trait Scrollable {
    fn scroll(&self) -> Vec2;

    /// Set the scroll offset, clamped into the scroll bounds.
    fn set_scroll(&mut self, scroll: Vec2);

    fn scroll_bounds(&self) -> ScrollBounds;

    fn set_scroll_bounds(&mut self, bounds: ScrollBounds);
}

/// Speed-driven movement on both axes.
pub trait Animatable {
    fn move_x(&mut self, target: f32, options: MoveOptions) -> Result<(), EngineError>;

    fn move_y(&mut self, target: f32, options: MoveOptions) -> Result<(), EngineError>;

    /// Cancel both pending moves and freeze at the current position.
    fn stop(&mut self);

    fn hspeed(&self) -> f32;

    fn vspeed(&self) -> f32;

    fn set_hspeed(&mut self, speed: f32) -> Result<(), EngineError>;

    fn set_vspeed(&mut self, speed: f32) -> Result<(), EngineError>;
}
