//! Zonal isolation detection engine
//!
//! This crate synthesizes the alarm graph that decides whether a single
//! Availability Zone is impaired while its peers are healthy:
//! - Metric-math expressions over raw counters, with deterministic variables
//! - Per-zone detection leaves (outlier, absolute impact, contributor breadth)
//! - Composition of those leaves into zone, region, and service decisions
//! - Observability of every synthesis (metrics and structured logs)

pub mod alarm;
pub mod config;
pub mod detection;
pub mod error;
pub mod expression;
pub mod models;
pub mod observability;
pub mod zones;

pub use alarm::{AlarmCompositionEngine, AlarmGraph, AlarmNode, NodeId, Synthesis};
pub use config::EngineConfig;
pub use error::{Result, SynthesisError};
pub use models::*;
pub use observability::{StructuredLogger, SynthesisMetrics};
pub use zones::{StaticZoneMap, ZoneIdentityResolver};
