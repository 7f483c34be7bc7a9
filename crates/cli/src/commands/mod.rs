//! CLI command implementations

pub mod explain;
pub mod names;
pub mod synth;
