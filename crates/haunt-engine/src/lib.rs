pub mod api;
pub mod core;
pub mod components;
pub mod systems;
pub mod input;
pub mod extensions;

// Re-export key types at crate root for convenience
pub use api::error::EngineError;
pub use api::game::{Game, GameConfig, EngineContext};
pub use api::traits::{Animatable, Positionable, Scrollable};
pub use api::types::{Axis, Bounds, EntityId, GameEvent, Rect, ScrollBounds, SoundEvent, ViewportId};
pub use components::attributes::Attributes;
pub use components::channel::{DurationSpec, DurationUnit, TransformChannel, TransformEnd, TransformProperty};
pub use components::entity::{Entity, Lifecycle, MoveOptions, MoveRequest, RepeatBehavior};
pub use core::events::{DispatchOptions, Event, EventBus, EventKind, EventTarget};
pub use core::handle::EntityMut;
pub use core::scene::Scene;
pub use core::time::{FixedTimestep, TimerId, TimerQueue};
pub use core::viewport::{ElementSpec, EngineTask, Viewport};
pub use input::queue::{InputEvent, InputQueue};
pub use systems::rng::Rng;
pub use systems::style::{build_style_snapshot, EntityStyle};

// Extensions: per-entity behavior and transition curves
pub use extensions::{ease, lerp, Easing, ExtensionHook, ExtensionRegistry, VariantSpec};
