use glam::Vec2;

use crate::api::types::ScrollBounds;

/// Scroll offset that centers `center + offset` in a view of size `view`.
///
/// Clamped into `bounds` (the upper bound wins when the bounds cross), then floored.
pub fn follow_scroll(center: Vec2, offset: Vec2, view: Vec2, bounds: &ScrollBounds) -> Vec2 {
    let wanted = center + offset - view / 2.0;
    bounds.clamp(wanted).floor()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centers_target() {
        let bounds = ScrollBounds::default();
        let scroll = follow_scroll(Vec2::new(400.0, 300.0), Vec2::ZERO, Vec2::new(320.0, 240.0), &bounds);
        assert_eq!(scroll, Vec2::new(240.0, 180.0));
    }

    #[test]
    fn clamps_at_edges() {
        let bounds = ScrollBounds::new(0.0, 160.0, 0.0, 80.0);
        let view = Vec2::new(320.0, 240.0);

        let near = follow_scroll(Vec2::new(8.0, 8.0), Vec2::ZERO, view, &bounds);
        assert_eq!(near, Vec2::ZERO);

        let far = follow_scroll(Vec2::new(1000.0, 1000.0), Vec2::ZERO, view, &bounds);
        assert_eq!(far, Vec2::new(160.0, 80.0));
    }

    #[test]
    fn offset_shifts_and_floors() {
        let bounds = ScrollBounds::default();
        let scroll = follow_scroll(Vec2::new(200.5, 150.0), Vec2::new(10.0, -10.0), Vec2::new(100.0, 100.0), &bounds);
        assert_eq!(scroll, Vec2::new(160.0, 90.0));
    }
}
