pub mod follow;
pub mod geometry;
pub mod rng;
pub mod style;
