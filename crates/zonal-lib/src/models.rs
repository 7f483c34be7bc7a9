//! Core data models for the synthesis engine
//!
//! These types describe the read-only input (service topology and metric
//! catalog) and the raw time series the generated expressions refer to.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Stable identity of an Availability Zone (e.g. `use1-az1`), independent of
/// the account-relative zone name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneId(String);

impl ZoneId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ZoneId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Unit of a raw time series
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Unit {
    #[default]
    Count,
    Milliseconds,
    Percent,
    None,
}

/// Identifies one raw time series
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MetricRef {
    pub namespace: String,
    pub name: String,
    pub dimensions: BTreeMap<String, String>,
    pub statistic: String,
    pub unit: Unit,
    pub period_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl MetricRef {
    /// Create a `Sum`/`Count` series with a 60s period and no dimensions
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            dimensions: BTreeMap::new(),
            statistic: "Sum".to_string(),
            unit: Unit::Count,
            period_secs: 60,
            label: None,
        }
    }

    pub fn with_dimension(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.dimensions.insert(key.into(), value.into());
        self
    }

    pub fn with_dimensions(mut self, dimensions: BTreeMap<String, String>) -> Self {
        self.dimensions = dimensions;
        self
    }

    pub fn with_statistic(mut self, statistic: impl Into<String>) -> Self {
        self.statistic = statistic.into();
        self
    }

    pub fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = unit;
        self
    }

    pub fn with_period(mut self, period_secs: u64) -> Self {
        self.period_secs = period_secs;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Produces the dimension sets for zonal and regional views of a metric
pub trait DimensionProvider {
    fn zonal_dimensions(&self, zone: &ZoneId, region: &str) -> BTreeMap<String, String>;

    fn regional_dimensions(&self, region: &str) -> BTreeMap<String, String>;
}

/// Plain configuration implementing [`DimensionProvider`]
///
/// Zonal dimensions are the static set plus `region_key` and `zone_key`;
/// regional dimensions drop the zone key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionTemplate {
    #[serde(default)]
    pub static_dimensions: BTreeMap<String, String>,
    #[serde(default = "default_region_key")]
    pub region_key: String,
    #[serde(default = "default_zone_key")]
    pub zone_key: String,
}

fn default_region_key() -> String {
    "Region".to_string()
}

fn default_zone_key() -> String {
    "AZ-ID".to_string()
}

impl Default for DimensionTemplate {
    fn default() -> Self {
        Self {
            static_dimensions: BTreeMap::new(),
            region_key: default_region_key(),
            zone_key: default_zone_key(),
        }
    }
}

impl DimensionTemplate {
    pub fn with_static(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.static_dimensions.insert(key.into(), value.into());
        self
    }
}

impl DimensionProvider for DimensionTemplate {
    fn zonal_dimensions(&self, zone: &ZoneId, region: &str) -> BTreeMap<String, String> {
        let mut dimensions = self.regional_dimensions(region);
        dimensions.insert(self.zone_key.clone(), zone.to_string());
        dimensions
    }

    fn regional_dimensions(&self, region: &str) -> BTreeMap<String, String> {
        let mut dimensions = self.static_dimensions.clone();
        dimensions.insert(self.region_key.clone(), region.to_string());
        dimensions
    }
}

/// Metric catalog entry for one metric family (availability or latency) of
/// one operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDetails {
    pub namespace: String,
    #[serde(default)]
    pub success_metric_names: Vec<String>,
    #[serde(default)]
    pub fault_metric_names: Vec<String>,
    /// `Sum` for availability, a percentile such as `p99` for latency
    #[serde(default = "default_alarm_statistic")]
    pub alarm_statistic: String,
    #[serde(default)]
    pub unit: Unit,
    #[serde(default = "default_period")]
    pub period_secs: u64,
    #[serde(default = "default_evaluation_periods")]
    pub evaluation_periods: u32,
    #[serde(default = "default_datapoints_to_alarm")]
    pub datapoints_to_alarm: u32,
    /// Success rate floor (availability) or latency ceiling (latency)
    pub success_alarm_threshold: f64,
    #[serde(default)]
    pub fault_alarm_threshold: f64,
    #[serde(default)]
    pub dimensions: DimensionTemplate,
}

fn default_alarm_statistic() -> String {
    "Sum".to_string()
}

fn default_period() -> u64 {
    60
}

fn default_evaluation_periods() -> u32 {
    5
}

fn default_datapoints_to_alarm() -> u32 {
    3
}

impl MetricDetails {
    /// Build one series per metric name with the given dimensions and statistic
    pub fn series(
        &self,
        names: &[String],
        dimensions: &BTreeMap<String, String>,
        statistic: &str,
    ) -> Vec<MetricRef> {
        names
            .iter()
            .map(|name| {
                MetricRef::new(&self.namespace, name)
                    .with_dimensions(dimensions.clone())
                    .with_statistic(statistic)
                    .with_unit(self.unit)
                    .with_period(self.period_secs)
                    .with_label(name)
            })
            .collect()
    }
}

/// Availability and latency catalog entries for one signal source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalSource {
    pub availability: MetricDetails,
    pub latency: MetricDetails,
}

/// Where to find the fields used by log-derived contributor rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributorRuleDetails {
    pub log_groups: Vec<String>,
    pub success_latency_json_path: String,
    pub fault_json_path: String,
    pub operation_name_json_path: String,
    pub zone_id_json_path: String,
    pub instance_id_json_path: String,
}

/// One operation of a service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub name: String,
    /// Critical operations feed the service-level aggregates
    #[serde(default)]
    pub critical: bool,
    /// Zone names this operation is served from; all service zones when absent
    #[serde(default)]
    pub zones: Option<Vec<String>>,
    pub server_side: SignalSource,
    #[serde(default)]
    pub canary: Option<SignalSource>,
    /// Server-side contributor rule details; no contributor leaves without them
    #[serde(default)]
    pub contributor_rules: Option<ContributorRuleDetails>,
}

/// A load balancer and the zone names it spans
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadBalancer {
    /// Full name as used in the `LoadBalancer` metric dimension
    pub name: String,
    pub zones: Vec<String>,
}

/// A NAT gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NatGateway {
    pub id: String,
}

/// Read-only service topology handed to the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceTopology {
    pub name: String,
    pub region: String,
    /// Zone names (account relative) the service spans, in order
    pub zones: Vec<String>,
    /// Absolute fault count across all critical operations that marks the
    /// region unhealthy
    pub fault_count_threshold: f64,
    #[serde(default = "default_period")]
    pub period_secs: u64,
    #[serde(default)]
    pub operations: Vec<Operation>,
    #[serde(default)]
    pub load_balancers: Vec<LoadBalancer>,
    /// NAT gateways keyed by zone name
    #[serde(default)]
    pub nat_gateways: IndexMap<String, Vec<NatGateway>>,
}

impl ServiceTopology {
    pub fn critical_operations(&self) -> impl Iterator<Item = &Operation> {
        self.operations.iter().filter(|op| op.critical)
    }
}
