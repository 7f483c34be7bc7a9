//! Zonal outlier detection
//!
//! Decides whether one zone carries a disproportionate share of a metric
//! compared to its peers.

use super::{OutlierAlgorithm, OutlierFunction};
use crate::alarm::{ComparisonOperator, EvaluationWindow, LeafAlarm, MissingDataPolicy};
use crate::error::{Result, SynthesisError};
use crate::expression::{CallArg, Expression, MetricExpressionBuilder};
use crate::models::ZoneId;
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// The external function reports `1` for an outlier zone
pub const CHI_SQUARED_OUTLIER_THRESHOLD: f64 = 1.0;

/// Default fraction of the region total that marks a zone as an outlier
const DEFAULT_STATIC_THRESHOLD: f64 = 0.7;

/// Metric views of one zone handed to the detector
#[derive(Debug, Clone, Copy)]
pub struct OutlierInput<'a> {
    pub zone: &'a ZoneId,
    /// The zone's own aggregate
    pub zone_metric: &'a Arc<Expression>,
    /// Sum over every zone
    pub region_total: &'a Arc<Expression>,
    /// Every zone's aggregate, in zone order
    pub breakdown: &'a IndexMap<ZoneId, Arc<Expression>>,
}

/// Produces the `isOutlier` leaf of one zone
#[derive(Clone)]
pub struct OutlierDetector {
    algorithm: OutlierAlgorithm,
    threshold: f64,
    function: Option<Arc<dyn OutlierFunction>>,
}

impl fmt::Debug for OutlierDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutlierDetector")
            .field("algorithm", &self.algorithm)
            .field("threshold", &self.threshold)
            .field("function", &self.function.as_ref().map(|func| func.function_name()))
            .finish()
    }
}

impl OutlierDetector {
    /// Create a detector, validating the threshold for the algorithm
    ///
    /// STATIC thresholds are fractions in `[0, 1]`; CHI_SQUARED thresholds
    /// are significance levels in `(0, 1)`.
    pub fn new(algorithm: OutlierAlgorithm, threshold: f64) -> Result<Self> {
        Self::validate_threshold(algorithm, threshold)?;
        Ok(Self {
            algorithm,
            threshold,
            function: None,
        })
    }

    /// Inject the external function used by CHI_SQUARED
    pub fn with_function(mut self, function: Arc<dyn OutlierFunction>) -> Self {
        self.function = Some(function);
        self
    }

    pub fn algorithm(&self) -> OutlierAlgorithm {
        self.algorithm
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn validate_threshold(algorithm: OutlierAlgorithm, threshold: f64) -> Result<()> {
        match algorithm {
            OutlierAlgorithm::Static if !(0.0..=1.0).contains(&threshold) => Err(
                SynthesisError::out_of_range("outlier_threshold", threshold, "[0, 1]"),
            ),
            OutlierAlgorithm::ChiSquared if !(threshold > 0.0 && threshold < 1.0) => Err(
                SynthesisError::out_of_range("outlier_threshold", threshold, "(0, 1)"),
            ),
            _ => Ok(()),
        }
    }

    /// Build the outlier leaf for one zone
    ///
    /// # Arguments
    /// * `builder` - Builder of the current pass; every variable comes from it
    /// * `name` - Alarm name of the leaf
    /// * `input` - The zone's metric, the region total, and the breakdown
    /// * `window` - Evaluation window for STATIC; CHI_SQUARED always uses 5 / 3
    ///
    /// # Errors
    /// * `MissingOutlierFunction` for CHI_SQUARED without an injected function
    /// * `UnsupportedAlgorithm` for Z_SCORE
    pub fn is_outlier(
        &self,
        builder: &mut MetricExpressionBuilder,
        name: impl Into<String>,
        input: OutlierInput<'_>,
        window: EvaluationWindow,
    ) -> Result<LeafAlarm> {
        let name = name.into();
        let zone = input.zone;

        let leaf = match self.algorithm {
            OutlierAlgorithm::Static => {
                let share = builder.ratio(
                    Some(format!("{zone} share of region")),
                    input.zone_metric,
                    input.region_total,
                    false,
                );
                LeafAlarm::new(
                    name,
                    share,
                    ComparisonOperator::GreaterThanOrEqualToThreshold,
                    self.threshold,
                    window,
                )
            }
            OutlierAlgorithm::ChiSquared => {
                let function = self
                    .function
                    .as_ref()
                    .ok_or(SynthesisError::MissingOutlierFunction(self.algorithm))?;
                let call = builder.external_call(
                    format!("{zone} is outlier"),
                    function.function_name(),
                    vec![
                        CallArg::Number(self.threshold),
                        CallArg::Text(zone.to_string()),
                    ],
                    input.breakdown,
                )?;
                LeafAlarm::new(
                    name,
                    call,
                    ComparisonOperator::GreaterThanOrEqualToThreshold,
                    CHI_SQUARED_OUTLIER_THRESHOLD,
                    EvaluationWindow::fixed(),
                )
            }
            OutlierAlgorithm::ZScore => {
                return Err(SynthesisError::UnsupportedAlgorithm(self.algorithm))
            }
        };

        Ok(leaf
            .with_description(format!("{zone} is an outlier ({})", self.algorithm))
            .with_missing_data(MissingDataPolicy::NotBreaching))
    }
}

impl Default for OutlierDetector {
    fn default() -> Self {
        Self {
            algorithm: OutlierAlgorithm::Static,
            threshold: DEFAULT_STATIC_THRESHOLD,
            function: None,
        }
    }
}
