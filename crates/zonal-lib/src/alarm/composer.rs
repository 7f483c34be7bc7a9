//! Alarm composition engine
//!
//! Folds the detection leaves of every operation, signal source, and metric
//! family into the decision graph, then adds the service-level and
//! infrastructure aggregates on top.
//!
//! Every expression pass (one operation, one signal source, one metric
//! family) owns a fresh [`MetricExpressionBuilder`], so variable names are
//! unique within each top-level expression and identical input always yields
//! identical names.

use super::graph::{AlarmGraph, ComparisonOperator, EvaluationWindow, MissingDataPolicy, NodeId};
use super::infrastructure::{InfrastructureAlarms, InfrastructureComposer};
use crate::config::EngineConfig;
use crate::detection::{
    ContributorBreadthEvaluator, ContributorRule, ContributorRuleSet, ImpactThresholdEvaluator,
    NamedOutlierFunction, OutlierDetector, OutlierFunction, OutlierInput,
};
use crate::error::{Result, SynthesisError};
use crate::expression::{AvailabilityMetricType, Expression, MetricExpressionBuilder};
use crate::models::{
    DimensionProvider, MetricDetails, MetricRef, Operation, ServiceTopology, SignalSource, ZoneId,
};
use crate::observability::{StructuredLogger, SynthesisMetrics};
use crate::zones::ZoneIdentityResolver;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Where a signal is observed from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalSourceKind {
    ServerSide,
    Canary,
}

impl SignalSourceKind {
    /// Suffix used in alarm and rule names
    pub fn suffix(self) -> &'static str {
        match self {
            SignalSourceKind::ServerSide => "server",
            SignalSourceKind::Canary => "canary",
        }
    }
}

/// Nodes of one operation, one signal source, one zone
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZoneSourceAlarms {
    /// Success rate below the availability threshold
    pub availability: NodeId,
    /// Latency above the latency threshold
    pub latency: NodeId,
    /// `ANY(availability, latency)` without outlier gating
    pub availability_or_latency: NodeId,
    pub fault_outlier: NodeId,
    pub latency_outlier: NodeId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiple_fault_contributors: Option<NodeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiple_latency_contributors: Option<NodeId>,
    /// `ALL(fault outlier, availability[, fault contributors])`
    pub availability_signal: NodeId,
    /// `ALL(latency outlier, latency[, latency contributors])`
    pub latency_signal: NodeId,
    /// `ANY(availability signal, latency signal)`
    pub isolated_impact: NodeId,
}

/// Nodes of one operation for one signal source
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceAlarms {
    pub kind: SignalSourceKind,
    pub zones: IndexMap<ZoneId, ZoneSourceAlarms>,
    pub regional_availability: NodeId,
    pub regional_latency: NodeId,
    /// `ANY(regional availability, regional latency)`
    pub customer_experience: NodeId,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationAlarms {
    pub server_side: SourceAlarms,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canary: Option<SourceAlarms>,
    /// Per zone `ANY(server-side isolated impact, canary isolated impact?)`
    pub zones: IndexMap<ZoneId, NodeId>,
    /// `ANY(server-side customer experience, canary customer experience?)`
    pub regional: NodeId,
}

/// Service-wide aggregates over the critical operations
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ServiceAlarms {
    /// Per zone `ANY` over the critical operations' zone decisions
    pub zones: IndexMap<ZoneId, NodeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regional_fault_count: Option<NodeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_side_regional: Option<NodeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canary_regional: Option<NodeId>,
}

/// Output of one synthesis: the graph plus handles into it
#[derive(Debug, Clone, Serialize)]
pub struct Synthesis {
    pub service: String,
    pub region: String,
    /// Zone name to identity, in topology order
    pub zones: IndexMap<String, ZoneId>,
    pub graph: AlarmGraph,
    pub rules: Vec<ContributorRule>,
    pub operations: IndexMap<String, OperationAlarms>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub infrastructure: Option<InfrastructureAlarms>,
    pub service_alarms: ServiceAlarms,
    pub fingerprint: String,
    pub generated_at: DateTime<Utc>,
}

impl Synthesis {
    /// Service-level isolated impact decision of one zone
    pub fn zone_decision(&self, zone: &ZoneId) -> Option<NodeId> {
        self.service_alarms.zones.get(zone).copied()
    }

    pub fn zone_ids(&self) -> impl Iterator<Item = &ZoneId> {
        self.zones.values()
    }
}

/// Synthesizes the zonal isolation decision graph of a service
pub struct AlarmCompositionEngine {
    config: EngineConfig,
    resolver: Arc<dyn ZoneIdentityResolver>,
    outlier: OutlierDetector,
    metrics: SynthesisMetrics,
}

impl AlarmCompositionEngine {
    /// Create an engine from a validated configuration
    ///
    /// When the configuration names an outlier function, it is injected as a
    /// [`NamedOutlierFunction`].
    pub fn new(config: EngineConfig, resolver: Arc<dyn ZoneIdentityResolver>) -> Result<Self> {
        config.validate()?;

        let mut outlier = OutlierDetector::new(config.outlier_algorithm, config.outlier_threshold)?;
        if let Some(name) = &config.outlier_function_name {
            outlier = outlier.with_function(Arc::new(NamedOutlierFunction::new(name.clone())));
        }

        Ok(Self {
            config,
            resolver,
            outlier,
            metrics: SynthesisMetrics::new(),
        })
    }

    /// Inject the external function evaluating CHI_SQUARED
    pub fn with_outlier_function(mut self, function: Arc<dyn OutlierFunction>) -> Self {
        self.outlier = self.outlier.with_function(function);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Build the decision graph for a service
    ///
    /// All or nothing: any configuration error aborts the synthesis and no
    /// partial graph is returned.
    pub fn synthesize(&self, topology: &ServiceTopology) -> Result<Synthesis> {
        let logger = StructuredLogger::new(&topology.name);
        logger.log_synthesis_started(
            &topology.region,
            topology.zones.len(),
            topology.operations.len(),
        );
        let started = Instant::now();

        match self.compose(topology, &logger) {
            Ok(synthesis) => {
                let elapsed = started.elapsed().as_secs_f64();
                let graph = &synthesis.graph;
                self.metrics.observe_synthesis_latency(elapsed);
                self.metrics.record_graph(
                    graph.leaf_count(),
                    graph.composite_count(),
                    synthesis.rules.len(),
                    synthesis.zones.len(),
                );
                logger.log_synthesis_completed(
                    graph.leaf_count(),
                    graph.composite_count(),
                    synthesis.rules.len(),
                    &synthesis.fingerprint,
                    elapsed,
                );
                Ok(synthesis)
            }
            Err(err) => {
                self.metrics.inc_syntheses_failed();
                logger.log_synthesis_failed(&err.to_string());
                Err(err)
            }
        }
    }

    fn compose(&self, topology: &ServiceTopology, logger: &StructuredLogger) -> Result<Synthesis> {
        let zones = self.resolve_zones(topology)?;
        let region_label = self
            .config
            .region_label
            .as_deref()
            .unwrap_or(&topology.region);

        let mut graph = AlarmGraph::new();
        let mut rules = Vec::new();
        let mut operations = IndexMap::new();

        for operation in &topology.operations {
            let operation_zones = operation_zones(operation, &zones)?;
            let pass = OperationPass {
                engine: self,
                topology,
                operation,
                zones: &operation_zones,
                region_label,
                logger,
            };
            let alarms = pass.compose(&mut graph, &mut rules)?;
            operations.insert(operation.name.clone(), alarms);
        }

        let infrastructure = InfrastructureComposer {
            config: &self.config,
            outlier: &self.outlier,
            topology,
            zones: &zones,
            logger,
        }
        .compose(&mut graph)?;

        let service_alarms = self.compose_service(
            &mut graph,
            topology,
            &zones,
            &operations,
            region_label,
            logger,
        )?;

        let fingerprint = graph.fingerprint();
        Ok(Synthesis {
            service: topology.name.clone(),
            region: topology.region.clone(),
            zones,
            graph,
            rules,
            operations,
            infrastructure,
            service_alarms,
            fingerprint,
            generated_at: Utc::now(),
        })
    }

    fn resolve_zones(&self, topology: &ServiceTopology) -> Result<IndexMap<String, ZoneId>> {
        if topology.zones.is_empty() {
            return Err(SynthesisError::NoZones(topology.name.clone()));
        }

        let mut zones = IndexMap::with_capacity(topology.zones.len());
        for name in &topology.zones {
            let id = self.resolver.require(name)?;
            if zones.contains_key(name) || zones.values().any(|existing| *existing == id) {
                return Err(SynthesisError::DuplicateZone(name.clone()));
            }
            zones.insert(name.clone(), id);
        }
        Ok(zones)
    }

    fn compose_service(
        &self,
        graph: &mut AlarmGraph,
        topology: &ServiceTopology,
        zones: &IndexMap<String, ZoneId>,
        operations: &IndexMap<String, OperationAlarms>,
        region_label: &str,
        logger: &StructuredLogger,
    ) -> Result<ServiceAlarms> {
        let critical: Vec<&Operation> = topology.critical_operations().collect();
        if critical.is_empty() {
            logger.log_family_skipped(region_label, "service", "no critical operations");
            return Ok(ServiceAlarms::default());
        }
        let service = topology.name.to_lowercase();
        let critical_alarms: Vec<&OperationAlarms> = critical
            .iter()
            .filter_map(|op| operations.get(&op.name))
            .collect();

        let mut zone_alarms = IndexMap::new();
        for zone in zones.values() {
            let children: Vec<NodeId> = critical_alarms
                .iter()
                .filter_map(|alarms| alarms.zones.get(zone).copied())
                .collect();
            if children.is_empty() {
                continue;
            }
            let node = graph.any_of(
                format!("{zone}-{service}-isolated-impact-aggregate-alarm"),
                children,
            )?;
            zone_alarms.insert(zone.clone(), node);
        }

        // One pass for the whole sum keeps its closure free of rebinding
        let mut builder = MetricExpressionBuilder::new(topology.period_secs);
        let mut per_operation = Vec::new();
        for operation in &critical {
            let details = &operation.server_side.availability;
            let mut counts = IndexMap::new();
            for zone in operation_zones(operation, zones)? {
                let count = zonal_fault_count(
                    &mut builder,
                    details,
                    &zone,
                    &topology.region,
                    &operation.name,
                )?;
                counts.insert(zone, count);
            }
            per_operation.push(builder.aggregate_region(
                format!("{} {} fault count", topology.region, operation.name),
                &counts,
            )?);
        }
        let total = builder.sum(
            format!("{} {} fault count", topology.region, topology.name),
            &per_operation,
        )?;

        let fault_count = ImpactThresholdEvaluator::new(
            topology.fault_count_threshold,
            ComparisonOperator::GreaterThanThreshold,
            EvaluationWindow::fixed(),
        )?;
        let regional_fault_count = graph.add_leaf(fault_count.exceeds_absolute_impact(
            format!("{region_label}-{service}-fault-count"),
            format!(
                "Faults across critical operations exceed {}",
                topology.fault_count_threshold
            ),
            total,
        ))?;

        let server_side: Vec<NodeId> = critical_alarms
            .iter()
            .map(|alarms| alarms.server_side.customer_experience)
            .collect();
        let server_side_regional = graph.any_of(
            format!("{region_label}-{service}-server-side-aggregate-alarm"),
            server_side,
        )?;

        let canary: Vec<NodeId> = critical_alarms
            .iter()
            .filter_map(|alarms| alarms.canary.as_ref())
            .map(|canary| canary.customer_experience)
            .collect();
        let canary_regional = if canary.is_empty() {
            None
        } else {
            Some(graph.any_of(
                format!("{region_label}-{service}-canary-aggregate-alarm"),
                canary,
            )?)
        };

        Ok(ServiceAlarms {
            zones: zone_alarms,
            regional_fault_count: Some(regional_fault_count),
            server_side_regional: Some(server_side_regional),
            canary_regional,
        })
    }
}

/// Zones an operation is served from, in topology order
fn operation_zones(operation: &Operation, zones: &IndexMap<String, ZoneId>) -> Result<Vec<ZoneId>> {
    let Some(names) = &operation.zones else {
        return Ok(zones.values().cloned().collect());
    };

    if let Some(unknown) = names.iter().find(|name| !zones.contains_key(*name)) {
        return Err(SynthesisError::ZoneNotInTopology {
            operation: operation.name.clone(),
            zone: unknown.clone(),
        });
    }

    Ok(zones
        .iter()
        .filter(|(name, _)| names.contains(name))
        .map(|(_, id)| id.clone())
        .collect())
}

fn window_of(details: &MetricDetails) -> Result<EvaluationWindow> {
    EvaluationWindow::new(details.evaluation_periods, details.datapoints_to_alarm)
}

fn counters(
    details: &MetricDetails,
    dimensions: &BTreeMap<String, String>,
) -> (Vec<MetricRef>, Vec<MetricRef>) {
    (
        details.series(&details.success_metric_names, dimensions, &details.alarm_statistic),
        details.series(&details.fault_metric_names, dimensions, &details.alarm_statistic),
    )
}

/// Zone aggregate of one operation's fault counters
fn zonal_fault_count(
    builder: &mut MetricExpressionBuilder,
    details: &MetricDetails,
    zone: &ZoneId,
    region: &str,
    operation: &str,
) -> Result<Arc<Expression>> {
    let dimensions = details.dimensions.zonal_dimensions(zone, region);
    let (successes, faults) = counters(details, &dimensions);
    let entity = builder.availability(
        format!("{zone} {operation} faults"),
        &successes,
        &faults,
        AvailabilityMetricType::FaultCount,
    )?;
    builder.aggregate_zone(zone, &format!("{operation} fault count"), &[entity])
}

/// Series of one zone for one signal source
struct ZoneSeries {
    zone: ZoneId,
    success_rate: Arc<Expression>,
    fault_count: Arc<Expression>,
    latency: Arc<Expression>,
    high_latency_count: Arc<Expression>,
}

struct OperationPass<'a> {
    engine: &'a AlarmCompositionEngine,
    topology: &'a ServiceTopology,
    operation: &'a Operation,
    zones: &'a [ZoneId],
    region_label: &'a str,
    logger: &'a StructuredLogger,
}

impl OperationPass<'_> {
    fn compose(
        &self,
        graph: &mut AlarmGraph,
        rules: &mut Vec<ContributorRule>,
    ) -> Result<OperationAlarms> {
        let name = self.operation.name.to_lowercase();

        let server_side = self.compose_source(
            graph,
            rules,
            &self.operation.server_side,
            SignalSourceKind::ServerSide,
        )?;
        let canary = self
            .operation
            .canary
            .as_ref()
            .map(|source| self.compose_source(graph, rules, source, SignalSourceKind::Canary))
            .transpose()?;

        let mut zones = IndexMap::new();
        for zone in self.zones {
            let children: Vec<NodeId> = [Some(&server_side), canary.as_ref()]
                .into_iter()
                .flatten()
                .filter_map(|source| source.zones.get(zone))
                .map(|alarms| alarms.isolated_impact)
                .collect();
            let node = graph.any_of(format!("{zone}-{name}-aggregate-isolated-az-impact"), children)?;
            zones.insert(zone.clone(), node);
        }

        let regional_children: Vec<NodeId> = [Some(&server_side), canary.as_ref()]
            .into_iter()
            .flatten()
            .map(|source| source.customer_experience)
            .collect();
        let regional = graph.any_of(
            format!("{}-{name}-aggregate-alarm", self.region_label),
            regional_children,
        )?;

        Ok(OperationAlarms {
            server_side,
            canary,
            zones,
            regional,
        })
    }

    fn compose_source(
        &self,
        graph: &mut AlarmGraph,
        rules: &mut Vec<ContributorRule>,
        source: &SignalSource,
        kind: SignalSourceKind,
    ) -> Result<SourceAlarms> {
        let operation = &self.operation.name;
        let lowered = operation.to_lowercase();
        let suffix = kind.suffix();
        let region = &self.topology.region;
        let availability = &source.availability;
        let latency = &source.latency;
        let availability_window = window_of(availability)?;
        let latency_window = window_of(latency)?;

        // Availability and latency are separate passes with their own builders
        let mut availability_pass = MetricExpressionBuilder::new(availability.period_secs);
        let mut latency_pass = MetricExpressionBuilder::new(latency.period_secs);

        let latency_names: Vec<String> = latency
            .success_metric_names
            .iter()
            .chain(&latency.fault_metric_names)
            .take(1)
            .cloned()
            .collect();
        let high_latency_statistic = format!("TC({}:)", latency.success_alarm_threshold);

        let mut series = Vec::new();
        let mut fault_counts = IndexMap::new();
        let mut high_latency_counts = IndexMap::new();
        for zone in self.zones {
            let dimensions = availability.dimensions.zonal_dimensions(zone, region);
            let (successes, faults) = counters(availability, &dimensions);
            let success_rate = availability_pass.availability(
                format!("{zone} {operation} success rate"),
                &successes,
                &faults,
                AvailabilityMetricType::SuccessRate,
            )?;
            let fault_count = zonal_fault_count(
                &mut availability_pass,
                availability,
                zone,
                region,
                operation,
            )?;

            let dimensions = latency.dimensions.zonal_dimensions(zone, region);
            let zone_latency = latency_pass.aggregate_entity(
                format!("{zone} {operation} latency"),
                latency.series(&latency_names, &dimensions, &latency.alarm_statistic),
            )?;
            let high_latency = latency_pass.aggregate_entity(
                format!("{zone} {operation} high latency requests"),
                latency.series(&latency_names, &dimensions, &high_latency_statistic),
            )?;
            let high_latency_count = latency_pass.aggregate_zone(
                zone,
                &format!("{operation} high latency requests"),
                &[high_latency],
            )?;

            fault_counts.insert(zone.clone(), Arc::clone(&fault_count));
            high_latency_counts.insert(zone.clone(), Arc::clone(&high_latency_count));
            series.push(ZoneSeries {
                zone: zone.clone(),
                success_rate,
                fault_count,
                latency: zone_latency,
                high_latency_count,
            });
        }

        let region_faults = availability_pass
            .aggregate_region(format!("{region} {operation} fault count"), &fault_counts)?;
        let region_high_latency = latency_pass.aggregate_region(
            format!("{region} {operation} high latency requests"),
            &high_latency_counts,
        )?;

        let (successes, faults) =
            counters(availability, &availability.dimensions.regional_dimensions(region));
        let regional_success_rate = availability_pass.availability(
            format!("{region} {operation} success rate"),
            &successes,
            &faults,
            AvailabilityMetricType::SuccessRate,
        )?;
        let regional_latency = latency_pass.aggregate_entity(
            format!("{region} {operation} latency"),
            latency.series(
                &latency_names,
                &latency.dimensions.regional_dimensions(region),
                &latency.alarm_statistic,
            ),
        )?;

        let availability_impact = ImpactThresholdEvaluator::new(
            availability.success_alarm_threshold,
            ComparisonOperator::LessThanThreshold,
            availability_window,
        )?
        .with_missing_data(MissingDataPolicy::Ignore);
        let latency_impact = ImpactThresholdEvaluator::new(
            latency.success_alarm_threshold,
            ComparisonOperator::GreaterThanThreshold,
            latency_window,
        )?;

        let contributor_details = match kind {
            SignalSourceKind::ServerSide => self.operation.contributor_rules.as_ref(),
            SignalSourceKind::Canary => None,
        };
        if kind == SignalSourceKind::ServerSide && contributor_details.is_none() {
            self.logger.log_family_skipped(
                self.region_label,
                "contributor-breadth",
                &format!("operation {operation} has no contributor rule details"),
            );
        }
        let contributor_threshold = self.engine.config.contributor_threshold();
        let fault_breadth =
            ContributorBreadthEvaluator::new(contributor_threshold, availability_window)?;
        let latency_breadth = ContributorBreadthEvaluator::new(contributor_threshold, latency_window)?;

        let mut zones = IndexMap::new();
        for zone_series in &series {
            let zone = &zone_series.zone;
            let prefix = format!("{zone}-{lowered}");
            debug!(zone = %zone, operation = %operation, source = suffix, "Composing zone signals");

            let availability_leaf = graph.add_leaf(availability_impact.exceeds_absolute_impact(
                format!("{prefix}-success-rate-{suffix}"),
                format!(
                    "{zone} success rate below {}",
                    availability.success_alarm_threshold
                ),
                Arc::clone(&zone_series.success_rate),
            ))?;
            let latency_leaf = graph.add_leaf(latency_impact.exceeds_absolute_impact(
                format!("{prefix}-success-latency-{suffix}"),
                format!(
                    "{zone} {} latency above {}",
                    latency.alarm_statistic, latency.success_alarm_threshold
                ),
                Arc::clone(&zone_series.latency),
            ))?;
            let availability_or_latency = graph.any_of(
                format!("{prefix}-impact-aggregate-alarm-{suffix}"),
                vec![availability_leaf, latency_leaf],
            )?;

            let fault_outlier = graph.add_leaf(self.engine.outlier.is_outlier(
                &mut availability_pass,
                format!("{prefix}-majority-errors-impact-{suffix}"),
                OutlierInput {
                    zone,
                    zone_metric: &zone_series.fault_count,
                    region_total: &region_faults,
                    breakdown: &fault_counts,
                },
                availability_window,
            )?)?;
            let latency_outlier = graph.add_leaf(self.engine.outlier.is_outlier(
                &mut latency_pass,
                format!("{prefix}-majority-high-latency-impact-{suffix}"),
                OutlierInput {
                    zone,
                    zone_metric: &zone_series.high_latency_count,
                    region_total: &region_high_latency,
                    breakdown: &high_latency_counts,
                },
                latency_window,
            )?)?;

            let (fault_contributors, latency_contributors) = match contributor_details {
                Some(details) => {
                    let rule_set = ContributorRuleSet::for_zone(
                        zone,
                        operation,
                        details,
                        latency.success_alarm_threshold,
                        suffix,
                    );
                    let faults = graph.add_leaf(fault_breadth.multiple_contributors(
                        &mut availability_pass,
                        format!("{prefix}-multiple-instances-faults-{suffix}"),
                        &rule_set.faults,
                        &rule_set.instances,
                    ))?;
                    let high_latency = graph.add_leaf(latency_breadth.multiple_contributors(
                        &mut latency_pass,
                        format!("{prefix}-multiple-instances-high-latency-{suffix}"),
                        &rule_set.high_latency,
                        &rule_set.instances,
                    ))?;
                    rules.extend(rule_set.into_vec());
                    (Some(faults), Some(high_latency))
                }
                None => (None, None),
            };

            let availability_signal = graph.all_of(
                format!("{prefix}-isolated-availability-impact-{suffix}"),
                [fault_outlier, availability_leaf]
                    .into_iter()
                    .chain(fault_contributors)
                    .collect(),
            )?;
            let latency_signal = graph.all_of(
                format!("{prefix}-isolated-latency-impact-{suffix}"),
                [latency_outlier, latency_leaf]
                    .into_iter()
                    .chain(latency_contributors)
                    .collect(),
            )?;
            let isolated_impact = graph.any_of(
                format!("{prefix}-isolated-impact-alarm-{suffix}"),
                vec![availability_signal, latency_signal],
            )?;

            zones.insert(
                zone.clone(),
                ZoneSourceAlarms {
                    availability: availability_leaf,
                    latency: latency_leaf,
                    availability_or_latency,
                    fault_outlier,
                    latency_outlier,
                    multiple_fault_contributors: fault_contributors,
                    multiple_latency_contributors: latency_contributors,
                    availability_signal,
                    latency_signal,
                    isolated_impact,
                },
            );
        }

        let region_prefix = format!("{}-{lowered}", self.region_label);
        let regional_availability = graph.add_leaf(availability_impact.exceeds_absolute_impact(
            format!("{region_prefix}-success-rate-{suffix}"),
            format!(
                "{region} success rate below {}",
                availability.success_alarm_threshold
            ),
            regional_success_rate,
        ))?;
        let regional_latency = graph.add_leaf(latency_impact.exceeds_absolute_impact(
            format!("{region_prefix}-success-latency-{suffix}"),
            format!(
                "{region} {} latency above {}",
                latency.alarm_statistic, latency.success_alarm_threshold
            ),
            regional_latency,
        ))?;
        let customer_experience = graph.any_of(
            format!("{region_prefix}-customer-experience-impact-{suffix}"),
            vec![regional_availability, regional_latency],
        )?;

        if let Some(details) = contributor_details {
            rules.push(ContributorRule::regional_fault_contributors(
                format!("{region_prefix}-per-instance-faults-{suffix}"),
                operation,
                details,
            ));
            rules.push(ContributorRule::regional_high_latency_contributors(
                format!("{region_prefix}-per-instance-high-latency-{suffix}"),
                operation,
                details,
                latency.success_alarm_threshold,
            ));
        }

        Ok(SourceAlarms {
            kind,
            zones,
            regional_availability,
            regional_latency,
            customer_experience,
        })
    }
}
