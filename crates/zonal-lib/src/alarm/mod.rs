//! Alarm decision graph
//!
//! This module provides:
//! - The graph of leaf and composite alarms and its evaluation rules
//! - The composition engine assembling a service's zonal isolation graph
//! - Infrastructure (load balancer, NAT gateway) zone signals

mod composer;
mod graph;
mod infrastructure;

#[cfg(test)]
mod tests;

pub use composer::{
    AlarmCompositionEngine, OperationAlarms, ServiceAlarms, SignalSourceKind, SourceAlarms,
    Synthesis, ZoneSourceAlarms,
};
pub use graph::{
    AlarmGraph, AlarmNode, BooleanOperator, ComparisonOperator, CompositeAlarm, EvaluationWindow,
    LeafAlarm, MissingDataPolicy, NodeId, FIXED_DATAPOINTS_TO_ALARM, FIXED_EVALUATION_PERIODS,
};
pub use infrastructure::{FamilyZoneAlarms, InfrastructureAlarms, ZoneInfrastructureAlarms};
