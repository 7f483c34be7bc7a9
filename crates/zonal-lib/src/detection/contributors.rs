//! Contributor breadth
//!
//! Rules out single-host causes: a zone is only reported when the faults (or
//! high latency) come from a large enough share of the instances serving the
//! operation in that zone. Counts come from log-derived contributor rules,
//! which are emitted alongside the graph.

use crate::alarm::{ComparisonOperator, EvaluationWindow, LeafAlarm, MissingDataPolicy};
use crate::error::{Result, SynthesisError};
use crate::expression::{ContributorCount, MetricExpressionBuilder};
use crate::models::{ContributorRuleDetails, ZoneId};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use serde_json::json;

/// Aggregation applied by every contributor rule
const AGGREGATE_ON: &str = "Count";

/// One filter of a contributor rule
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ContributionFilter {
    In {
        #[serde(rename = "Match")]
        path: String,
        #[serde(rename = "In")]
        values: Vec<String>,
    },
    GreaterThan {
        #[serde(rename = "Match")]
        path: String,
        #[serde(rename = "GreaterThan")]
        value: f64,
    },
}

/// Declarative log rule counting unique contributors (instances)
///
/// Serializes as its name plus the rule body the log backend registers.
#[derive(Debug, Clone, PartialEq)]
pub struct ContributorRule {
    pub name: String,
    pub log_groups: Vec<String>,
    pub keys: Vec<String>,
    pub filters: Vec<ContributionFilter>,
    pub aggregate_on: String,
}

impl Serialize for ContributorRule {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ContributorRule", 2)?;
        state.serialize_field("name", &self.name)?;
        state.serialize_field("body", &self.body())?;
        state.end()
    }
}

impl ContributorRule {
    fn scoped(
        name: String,
        zone: &ZoneId,
        operation: &str,
        details: &ContributorRuleDetails,
    ) -> Self {
        Self {
            name,
            log_groups: details.log_groups.clone(),
            keys: vec![details.instance_id_json_path.clone()],
            filters: vec![
                ContributionFilter::In {
                    path: details.zone_id_json_path.clone(),
                    values: vec![zone.to_string()],
                },
                ContributionFilter::In {
                    path: details.operation_name_json_path.clone(),
                    values: vec![operation.to_string()],
                },
            ],
            aggregate_on: AGGREGATE_ON.to_string(),
        }
    }

    /// Instances serving `operation` in `zone`
    pub fn instances_in_zone(
        name: impl Into<String>,
        zone: &ZoneId,
        operation: &str,
        details: &ContributorRuleDetails,
    ) -> Self {
        Self::scoped(name.into(), zone, operation, details)
    }

    /// Instances logging at least one fault for `operation` in `zone`
    pub fn fault_contributors(
        name: impl Into<String>,
        zone: &ZoneId,
        operation: &str,
        details: &ContributorRuleDetails,
    ) -> Self {
        let mut rule = Self::scoped(name.into(), zone, operation, details);
        rule.filters.push(ContributionFilter::GreaterThan {
            path: details.fault_json_path.clone(),
            value: 0.0,
        });
        rule
    }

    /// Instances logging latency above `latency_threshold` for `operation` in `zone`
    pub fn high_latency_contributors(
        name: impl Into<String>,
        zone: &ZoneId,
        operation: &str,
        details: &ContributorRuleDetails,
        latency_threshold: f64,
    ) -> Self {
        let mut rule = Self::scoped(name.into(), zone, operation, details);
        rule.filters.push(ContributionFilter::GreaterThan {
            path: details.success_latency_json_path.clone(),
            value: latency_threshold,
        });
        rule
    }

    fn region_wide(name: String, operation: &str, details: &ContributorRuleDetails) -> Self {
        Self {
            name,
            log_groups: details.log_groups.clone(),
            keys: vec![details.instance_id_json_path.clone()],
            filters: vec![ContributionFilter::In {
                path: details.operation_name_json_path.clone(),
                values: vec![operation.to_string()],
            }],
            aggregate_on: AGGREGATE_ON.to_string(),
        }
    }

    /// Instances logging at least one fault for `operation`, in any zone
    pub fn regional_fault_contributors(
        name: impl Into<String>,
        operation: &str,
        details: &ContributorRuleDetails,
    ) -> Self {
        let mut rule = Self::region_wide(name.into(), operation, details);
        rule.filters.push(ContributionFilter::GreaterThan {
            path: details.fault_json_path.clone(),
            value: 0.0,
        });
        rule
    }

    /// Instances logging latency above `latency_threshold` for `operation`, in any zone
    pub fn regional_high_latency_contributors(
        name: impl Into<String>,
        operation: &str,
        details: &ContributorRuleDetails,
        latency_threshold: f64,
    ) -> Self {
        let mut rule = Self::region_wide(name.into(), operation, details);
        rule.filters.push(ContributionFilter::GreaterThan {
            path: details.success_latency_json_path.clone(),
            value: latency_threshold,
        });
        rule
    }

    pub fn unique_contributors(&self) -> ContributorCount {
        ContributorCount::unique_contributors(&self.name)
    }

    /// Rule body in the log-rule JSON format
    pub fn body(&self) -> serde_json::Value {
        json!({
            "Schema": { "Name": "CloudWatchLogRule", "Version": 1 },
            "LogGroupNames": self.log_groups,
            "LogFormat": "JSON",
            "Contribution": {
                "Keys": self.keys,
                "Filters": self.filters,
            },
            "AggregateOn": self.aggregate_on,
        })
    }
}

/// The three contributor rules of one operation in one zone
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContributorRuleSet {
    pub instances: ContributorRule,
    pub faults: ContributorRule,
    pub high_latency: ContributorRule,
}

impl ContributorRuleSet {
    pub fn for_zone(
        zone: &ZoneId,
        operation: &str,
        details: &ContributorRuleDetails,
        latency_threshold: f64,
        suffix: &str,
    ) -> Self {
        let prefix = format!("{zone}-{}", operation.to_lowercase());
        Self {
            instances: ContributorRule::instances_in_zone(
                format!("{prefix}-instances-in-the-az-{suffix}"),
                zone,
                operation,
                details,
            ),
            faults: ContributorRule::fault_contributors(
                format!("{prefix}-per-instance-faults-{suffix}"),
                zone,
                operation,
                details,
            ),
            high_latency: ContributorRule::high_latency_contributors(
                format!("{prefix}-per-instance-high-latency-{suffix}"),
                zone,
                operation,
                details,
                latency_threshold,
            ),
        }
    }

    pub fn into_vec(self) -> Vec<ContributorRule> {
        vec![self.instances, self.faults, self.high_latency]
    }
}

/// Produces the `multipleContributors` leaves (server-side only)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContributorBreadthEvaluator {
    threshold: f64,
    window: EvaluationWindow,
}

impl ContributorBreadthEvaluator {
    /// `threshold` is the share of serving instances, in `[0, 1]`
    pub fn new(threshold: f64, window: EvaluationWindow) -> Result<Self> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(SynthesisError::out_of_range(
                "contributor_threshold",
                threshold,
                "[0, 1]",
            ));
        }
        Ok(Self { threshold, window })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Leaf over `contributing / total` unique contributors, compared `>=`
    pub fn multiple_contributors(
        &self,
        builder: &mut MetricExpressionBuilder,
        name: impl Into<String>,
        contributing: &ContributorRule,
        total: &ContributorRule,
    ) -> LeafAlarm {
        let share = builder.contributor_ratio(
            format!("{} share of {}", contributing.name, total.name),
            contributing.unique_contributors(),
            total.unique_contributors(),
        );

        LeafAlarm::new(
            name,
            share,
            ComparisonOperator::GreaterThanOrEqualToThreshold,
            self.threshold,
            self.window,
        )
        .with_description(format!(
            "At least {} of the instances in the zone contribute",
            self.threshold
        ))
        .with_missing_data(MissingDataPolicy::NotBreaching)
    }
}
