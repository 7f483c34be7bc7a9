//! Engine configuration
//!
//! Every field has a default, so an empty source yields a usable config.
//! Values come from an optional file and `AZI_*` environment variables,
//! environment taking precedence.

use crate::alarm::EvaluationWindow;
use crate::detection::{OutlierAlgorithm, OutlierDetector};
use crate::error::{Result, SynthesisError};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable prefix, e.g. `AZI_OUTLIER_THRESHOLD`
pub const ENV_PREFIX: &str = "AZI";

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Algorithm deciding whether a zone is an outlier
    #[serde(default)]
    pub outlier_algorithm: OutlierAlgorithm,

    /// Fraction of the region total for STATIC, significance for CHI_SQUARED
    #[serde(default = "default_outlier_threshold")]
    pub outlier_threshold: f64,

    /// Share of instances that must contribute; the outlier threshold if unset
    #[serde(default)]
    pub contributor_threshold: Option<f64>,

    /// Load balancer fault rate (percent) that counts as impact
    #[serde(default = "default_lb_fault_rate_threshold")]
    pub load_balancer_fault_rate_threshold: f64,

    /// NAT gateway packet drop rate (percent) that counts as impact
    #[serde(default = "default_nat_drop_threshold")]
    pub nat_gateway_drop_threshold: f64,

    #[serde(default = "default_evaluation_periods")]
    pub infrastructure_evaluation_periods: u32,

    #[serde(default = "default_datapoints_to_alarm")]
    pub infrastructure_datapoints_to_alarm: u32,

    /// Name of the external function evaluating CHI_SQUARED
    #[serde(default)]
    pub outlier_function_name: Option<String>,

    /// Region label used in regional alarm names; the topology region if unset
    #[serde(default)]
    pub region_label: Option<String>,
}

fn default_outlier_threshold() -> f64 {
    0.7
}

fn default_lb_fault_rate_threshold() -> f64 {
    5.0
}

fn default_nat_drop_threshold() -> f64 {
    0.01
}

fn default_evaluation_periods() -> u32 {
    5
}

fn default_datapoints_to_alarm() -> u32 {
    3
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            outlier_algorithm: OutlierAlgorithm::default(),
            outlier_threshold: default_outlier_threshold(),
            contributor_threshold: None,
            load_balancer_fault_rate_threshold: default_lb_fault_rate_threshold(),
            nat_gateway_drop_threshold: default_nat_drop_threshold(),
            infrastructure_evaluation_periods: default_evaluation_periods(),
            infrastructure_datapoints_to_alarm: default_datapoints_to_alarm(),
            outlier_function_name: None,
            region_label: None,
        }
    }
}

impl EngineConfig {
    /// Load configuration from an optional file and `AZI_*` variables
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        Self::load_with_prefix(path, ENV_PREFIX)
    }

    pub(crate) fn load_with_prefix(path: Option<&Path>, prefix: &str) -> anyhow::Result<Self> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path).required(true));
        }
        builder = builder.add_source(
            ::config::Environment::with_prefix(prefix)
                .prefix_separator("_")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .context("Failed to read engine configuration")?;
        let config: EngineConfig = settings
            .try_deserialize()
            .context("Failed to parse engine configuration")?;

        config.validate().context("Invalid engine configuration")?;
        Ok(config)
    }

    /// Range-check every threshold and window
    pub fn validate(&self) -> Result<()> {
        OutlierDetector::validate_threshold(self.outlier_algorithm, self.outlier_threshold)?;

        let contributor = self.contributor_threshold();
        if !(0.0..=1.0).contains(&contributor) {
            return Err(SynthesisError::out_of_range(
                "contributor_threshold",
                contributor,
                "[0, 1]",
            ));
        }

        for (field, value) in [
            (
                "load_balancer_fault_rate_threshold",
                self.load_balancer_fault_rate_threshold,
            ),
            ("nat_gateway_drop_threshold", self.nat_gateway_drop_threshold),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(SynthesisError::out_of_range(field, value, ">= 0"));
            }
        }

        self.infrastructure_window()?;
        Ok(())
    }

    /// Contributor-breadth threshold, falling back to the outlier threshold
    ///
    /// A CHI_SQUARED significance level is not a share of instances, so the
    /// STATIC default applies in that case.
    pub fn contributor_threshold(&self) -> f64 {
        match (self.contributor_threshold, self.outlier_algorithm) {
            (Some(threshold), _) => threshold,
            (None, OutlierAlgorithm::Static) => self.outlier_threshold,
            (None, _) => default_outlier_threshold(),
        }
    }

    pub fn infrastructure_window(&self) -> Result<EvaluationWindow> {
        EvaluationWindow::new(
            self.infrastructure_evaluation_periods,
            self.infrastructure_datapoints_to_alarm,
        )
    }
}
