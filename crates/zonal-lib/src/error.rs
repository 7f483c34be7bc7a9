//! Errors raised while synthesizing the alarm graph
//!
//! Every variant is a configuration problem detected at synthesis time.
//! Partial data (a zone without gateways, an operation without contributor
//! rules) is never an error; it only yields a smaller graph.

use thiserror::Error;

use crate::detection::OutlierAlgorithm;

pub type Result<T> = std::result::Result<T, SynthesisError>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SynthesisError {
    /// An entity aggregate was requested without any counters
    #[error("entity '{0}' has no counters to aggregate")]
    EmptyEntity(String),

    /// A zone aggregate was requested without any entity expressions
    #[error("zone '{0}' has no entity expressions to aggregate")]
    EmptyZone(String),

    /// An entity expression fed into a zone aggregate is not labelled for that zone
    #[error("expression '{label}' is not labelled for zone '{zone}'")]
    MislabeledEntity { zone: String, label: String },

    /// A region aggregate or a service was given no zones
    #[error("no zones available for '{0}'")]
    NoZones(String),

    /// The zone resolver has no identity for this zone name
    #[error("zone '{0}' cannot be resolved to a zone identity")]
    UnknownZone(String),

    /// A zone is listed twice, or two zone names resolve to the same identity
    #[error("zone '{0}' appears more than once in the service topology")]
    DuplicateZone(String),

    /// An operation references a zone the service topology does not span
    #[error("operation '{operation}' references zone '{zone}' which is not part of the service")]
    ZoneNotInTopology { operation: String, zone: String },

    /// Two alarms would be registered under the same name
    #[error("alarm name '{0}' is already in use")]
    DuplicateAlarmName(String),

    /// A composite alarm was requested without children
    #[error("composite alarm '{0}' has no children")]
    EmptyComposite(String),

    /// A composite references a node that does not exist in the graph
    #[error("composite alarm '{name}' references unknown node {child}")]
    UnknownNode { name: String, child: usize },

    /// A threshold or window value outside its valid range
    #[error("{field} = {value} is out of range ({expected})")]
    OutOfRange {
        field: &'static str,
        value: f64,
        expected: &'static str,
    },

    /// CHI_SQUARED selected but no external statistical function injected
    #[error("outlier algorithm {0:?} requires an external outlier function")]
    MissingOutlierFunction(OutlierAlgorithm),

    /// Declared algorithm without a synthesis strategy
    #[error("outlier algorithm {0:?} is not implemented")]
    UnsupportedAlgorithm(OutlierAlgorithm),
}

impl SynthesisError {
    pub(crate) fn out_of_range(field: &'static str, value: f64, expected: &'static str) -> Self {
        SynthesisError::OutOfRange {
            field,
            value,
            expected,
        }
    }
}
