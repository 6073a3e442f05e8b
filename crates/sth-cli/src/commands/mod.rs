//! CLI command implementations.

pub mod render;
pub mod resolve;
pub mod validate;
