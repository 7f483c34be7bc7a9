//! Absolute impact thresholds
//!
//! A zone can be a statistical outlier while its absolute numbers are
//! negligible. These leaves require the metric itself to cross a threshold.

use crate::alarm::{
    AlarmGraph, ComparisonOperator, EvaluationWindow, LeafAlarm, MissingDataPolicy, NodeId,
};
use crate::error::{Result, SynthesisError};
use crate::expression::Expression;
use std::sync::Arc;

/// Produces the `hasImpact` leaves of one entity family
#[derive(Debug, Clone, PartialEq)]
pub struct ImpactThresholdEvaluator {
    threshold: f64,
    comparison: ComparisonOperator,
    window: EvaluationWindow,
    missing_data: MissingDataPolicy,
}

impl ImpactThresholdEvaluator {
    /// Create an evaluator; the threshold must be finite and non-negative
    pub fn new(
        threshold: f64,
        comparison: ComparisonOperator,
        window: EvaluationWindow,
    ) -> Result<Self> {
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(SynthesisError::out_of_range(
                "impact_threshold",
                threshold,
                ">= 0",
            ));
        }
        Ok(Self {
            threshold,
            comparison,
            window,
            missing_data: MissingDataPolicy::NotBreaching,
        })
    }

    pub fn with_missing_data(mut self, policy: MissingDataPolicy) -> Self {
        self.missing_data = policy;
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Leaf comparing one entity metric against the threshold
    pub fn exceeds_absolute_impact(
        &self,
        name: impl Into<String>,
        description: impl Into<String>,
        entity_metric: Arc<Expression>,
    ) -> LeafAlarm {
        LeafAlarm::new(
            name,
            entity_metric,
            self.comparison,
            self.threshold,
            self.window,
        )
        .with_description(description)
        .with_missing_data(self.missing_data)
    }

    /// Zone impact: `ANY` over the zone's entity leaves
    pub fn zone_has_impact(
        &self,
        graph: &mut AlarmGraph,
        name: impl Into<String>,
        entity_leaves: Vec<NodeId>,
    ) -> Result<NodeId> {
        graph.any_of(name, entity_leaves)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::MetricExpressionBuilder;
    use crate::models::MetricRef;

    fn fault_rate(builder: &mut MetricExpressionBuilder, name: &str) -> Arc<Expression> {
        builder
            .rate(
                format!("use1-az1 {name} fault rate"),
                &[MetricRef::new("AWS/ApplicationELB", "HTTPCode_Target_5XX_Count")],
                &[MetricRef::new("AWS/ApplicationELB", "RequestCount")],
                true,
            )
            .unwrap()
    }

    #[test]
    fn test_rejects_negative_threshold() {
        let result = ImpactThresholdEvaluator::new(
            -1.0,
            ComparisonOperator::GreaterThanThreshold,
            EvaluationWindow::fixed(),
        );
        assert!(matches!(result, Err(SynthesisError::OutOfRange { .. })));
    }

    #[test]
    fn test_leaf_carries_settings() {
        let evaluator = ImpactThresholdEvaluator::new(
            99.0,
            ComparisonOperator::LessThanThreshold,
            EvaluationWindow::new(3, 2).unwrap(),
        )
        .unwrap()
        .with_missing_data(MissingDataPolicy::Ignore);

        let mut builder = MetricExpressionBuilder::new(60);
        let leaf = evaluator.exceeds_absolute_impact(
            "use1-az1-ride-success-rate-server",
            "success rate below 99",
            fault_rate(&mut builder, "lb"),
        );

        assert_eq!(leaf.threshold, 99.0);
        assert_eq!(leaf.comparison, ComparisonOperator::LessThanThreshold);
        assert_eq!(leaf.window.datapoints_to_alarm, 2);
        assert_eq!(leaf.missing_data, MissingDataPolicy::Ignore);
        assert!(leaf.breaches(Some(98.5)));
    }

    #[test]
    fn test_zone_impact_is_any_of_entities() {
        let evaluator = ImpactThresholdEvaluator::new(
            5.0,
            ComparisonOperator::GreaterThanThreshold,
            EvaluationWindow::fixed(),
        )
        .unwrap();
        let mut builder = MetricExpressionBuilder::new(60);
        let mut graph = AlarmGraph::new();

        let first = graph
            .add_leaf(evaluator.exceeds_absolute_impact("lb-1", "", fault_rate(&mut builder, "lb-1")))
            .unwrap();
        let second = graph
            .add_leaf(evaluator.exceeds_absolute_impact("lb-2", "", fault_rate(&mut builder, "lb-2")))
            .unwrap();

        let zone = evaluator
            .zone_has_impact(&mut graph, "use1-az1-lb-impact", vec![first, second])
            .unwrap();
        let only_second = |leaf: &LeafAlarm| leaf.name == "lb-2";
        assert_eq!(graph.resolve(zone, &only_second), Some(true));
        assert_eq!(graph.children(zone), &[first, second]);

        let none = evaluator.zone_has_impact(&mut graph, "empty-impact", vec![]);
        assert!(matches!(none, Err(SynthesisError::EmptyComposite(_))));
    }
}
