pub mod events;
pub mod handle;
pub mod scene;
pub mod time;
pub mod viewport;
