// extensions/mod.rs
//
// Behavior attached to entities from outside the core.
// Easing curves for channel transitions and the named-hook registry that runs
// per-entity initializers before `ready`.

pub mod easing;
pub mod registry;

pub use easing::{ease, lerp, Easing};
pub use registry::{ExtensionHook, ExtensionRegistry, VariantSpec};
