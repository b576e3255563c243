use glam::Vec2;

use crate::api::types::Rect;
use crate::core::time::TimerId;

/// Memoized screen-space box.
///
/// An entity cache is stored together with the timer that will clear it one frame
/// later; the viewport cache has no timer and is cleared by resize/scroll signals.
#[derive(Debug, Clone, Default)]
pub struct GeometryCache {
    cached: Option<Rect>,
    invalidation: Option<TimerId>,
}

impl GeometryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<Rect> {
        self.cached
    }

    pub fn is_valid(&self) -> bool {
        self.cached.is_some()
    }

    /// Store a freshly computed box along with its invalidation timer, if any.
    pub fn store(&mut self, rect: Rect, invalidation: Option<TimerId>) {
        self.cached = Some(rect);
        self.invalidation = invalidation;
    }

    /// Drop the cached box. Returns the pending invalidation timer so the owner can
    /// cancel it.
    pub fn invalidate(&mut self) -> Option<TimerId> {
        self.cached = None;
        self.invalidation.take()
    }

    /// Called when the invalidation timer `id` fires. Stale timers are ignored.
    pub fn expire(&mut self, id: TimerId) -> bool {
        if self.invalidation == Some(id) {
            self.cached = None;
            self.invalidation = None;
            true
        } else {
            false
        }
    }

    pub fn invalidation_timer(&self) -> Option<TimerId> {
        self.invalidation
    }
}

/// Where the page has put a viewport: its top-left corner in page pixels and the
/// widths of its left/top borders.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PageLayout {
    pub origin: Vec2,
    pub border: Vec2,
}

/// Raw rendered box of the viewport element, in page pixels. The element is scaled
/// by `|zoom|` from its top-left corner.
pub fn viewport_raw_rect(layout: &PageLayout, size: Vec2, zoom: f32) -> Rect {
    let zoom = zoom.abs();
    Rect::new(layout.origin.x, layout.origin.y, size.x * zoom, size.y * zoom)
}

/// Raw rendered box of an entity's content, in page pixels.
///
/// `translate` is the on-screen translation of both channels. Non-sticky entities
/// are shifted by the viewport scroll.
pub fn entity_raw_rect(
    layout: &PageLayout,
    translate: Vec2,
    size: Vec2,
    scroll: Vec2,
    zoom: f32,
    sticky: bool,
) -> Rect {
    let zoom = zoom.abs();
    let scroll = if sticky { Vec2::ZERO } else { scroll };
    let offset = layout.border + translate - scroll;
    Rect::new(
        layout.origin.x + zoom * offset.x,
        layout.origin.y + zoom * offset.y,
        size.x * zoom,
        size.y * zoom,
    )
}

/// Convert a raw viewport box into unzoomed pixels with border compensation.
/// Zoom 0 collapses the box to a point at the floored raw corner.
pub fn viewport_box(raw: Rect, zoom: f32, border: Vec2) -> Rect {
    let zoom = zoom.abs();
    if zoom == 0.0 {
        return Rect::new(raw.left.floor(), raw.top.floor(), 0.0, 0.0);
    }
    Rect::new(
        (raw.left / zoom).floor() + border.x,
        (raw.top / zoom).floor() + border.y,
        raw.width / zoom,
        raw.height / zoom,
    )
}

/// Convert a raw entity box into unzoomed pixels, adding back the scroll offset
/// unless the entity is sticky. Zoom 0 collapses the box to a point.
pub fn entity_box(raw: Rect, zoom: f32, scroll: Vec2, sticky: bool) -> Rect {
    let zoom = zoom.abs();
    let scroll = if sticky { Vec2::ZERO } else { scroll };
    if zoom == 0.0 {
        return Rect::new(raw.left.floor() + scroll.x, raw.top.floor() + scroll.y, 0.0, 0.0);
    }
    Rect::new(
        (raw.left / zoom).floor() + scroll.x,
        (raw.top / zoom).floor() + scroll.y,
        raw.width / zoom,
        raw.height / zoom,
    )
}
