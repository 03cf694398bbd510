//! CLI library components for the voyage column mapper.

pub mod logging;
pub mod pipeline;
