//! Per-zone detection signals
//!
//! This module provides the leaves of the decision graph:
//! - Outlier detection (a zone's share of a metric relative to its peers)
//! - Absolute impact (an entity metric crossing a fixed threshold)
//! - Contributor breadth (more than one host behind the faults or latency)

mod contributors;
mod impact;
mod outlier;

pub use contributors::{
    ContributionFilter, ContributorBreadthEvaluator, ContributorRule, ContributorRuleSet,
};
pub use impact::ImpactThresholdEvaluator;
pub use outlier::{OutlierDetector, OutlierInput, CHI_SQUARED_OUTLIER_THRESHOLD};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Statistical method used to decide whether a zone is an outlier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutlierAlgorithm {
    /// Zone share of the region total against a fixed fraction
    #[default]
    Static,
    /// Goodness-of-fit test delegated to an external function
    ChiSquared,
    /// Declared for configuration compatibility; not synthesizable
    ZScore,
}

impl fmt::Display for OutlierAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutlierAlgorithm::Static => write!(f, "STATIC"),
            OutlierAlgorithm::ChiSquared => write!(f, "CHI_SQUARED"),
            OutlierAlgorithm::ZScore => write!(f, "Z_SCORE"),
        }
    }
}

/// External statistical function evaluated by the monitoring backend
///
/// The function receives the significance level, the zone under test, and
/// the per-zone breakdown, and reports `1` when the zone is an outlier and
/// `0` otherwise. Only its identity is needed at synthesis time.
pub trait OutlierFunction: Send + Sync {
    fn function_name(&self) -> &str;
}

/// An [`OutlierFunction`] known by name only
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedOutlierFunction {
    name: String,
}

impl NamedOutlierFunction {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl OutlierFunction for NamedOutlierFunction {
    fn function_name(&self) -> &str {
        &self.name
    }
}
