use glam::Vec2;

/// Input event types the engine understands.
/// No game-specific semantics. Positions are in world pixels
/// (viewport-relative, scroll included).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// A touch/click began at world coordinates (x, y).
    PointerDown { x: f32, y: f32 },
    /// A touch/click ended at world coordinates (x, y).
    PointerUp { x: f32, y: f32 },
    /// The cursor moved to world coordinates (x, y).
    PointerMove { x: f32, y: f32 },
    /// The cursor entered the element at world coordinates (x, y).
    PointerOver { x: f32, y: f32 },
    /// The cursor left the element at world coordinates (x, y).
    PointerOut { x: f32, y: f32 },
    /// A key was pressed.
    KeyDown { key_code: u32 },
    /// A key was released.
    KeyUp { key_code: u32 },
    /// A custom event from the page UI (shop buttons, dialog buttons).
    /// `kind` identifies the event type; `a`, `b`, `c` carry arbitrary data.
    Custom { kind: u32, a: f32, b: f32, c: f32 },
}

impl InputEvent {
    /// World position of pointer events.
    pub fn position(&self) -> Option<Vec2> {
        match *self {
            InputEvent::PointerDown { x, y }
            | InputEvent::PointerUp { x, y }
            | InputEvent::PointerMove { x, y }
            | InputEvent::PointerOver { x, y }
            | InputEvent::PointerOut { x, y } => Some(Vec2::new(x, y)),
            _ => None,
        }
    }

    /// The same pointer event at another position. Non-pointer events are unchanged.
    pub fn with_position(self, at: Vec2) -> Self {
        let (x, y) = (at.x, at.y);
        match self {
            InputEvent::PointerDown { .. } => InputEvent::PointerDown { x, y },
            InputEvent::PointerUp { .. } => InputEvent::PointerUp { x, y },
            InputEvent::PointerMove { .. } => InputEvent::PointerMove { x, y },
            InputEvent::PointerOver { .. } => InputEvent::PointerOver { x, y },
            InputEvent::PointerOut { .. } => InputEvent::PointerOut { x, y },
            other => other,
        }
    }
}

/// A queue of input events.
/// The page writes events into the queue; the game reads them each frame.
pub struct InputQueue {
    events: Vec<InputEvent>,
}

impl InputQueue {
    pub fn new() -> Self {
        Self {
            events: Vec::with_capacity(32),
        }
    }

    /// Push a new input event (called from the page via wasm-bindgen).
    pub fn push(&mut self, event: InputEvent) {
        self.events.push(event);
    }

    /// Drain all pending events. Returns a Vec and clears the queue.
    pub fn drain(&mut self) -> Vec<InputEvent> {
        std::mem::take(&mut self.events)
    }

    /// Iterate over pending events without consuming them.
    pub fn iter(&self) -> impl Iterator<Item = &InputEvent> {
        self.events.iter()
    }

    /// Check if there are pending events.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.events.len()
    }
}

impl Default for InputQueue {
    fn default() -> Self {
        Self::new()
    }
}
