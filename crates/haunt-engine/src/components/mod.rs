pub mod attributes;
pub mod channel;
pub mod entity;
