//! Infrastructure signal families
//!
//! Zone decisions for services observed only through their load balancers
//! and NAT gateways. Each family is one expression pass over every zone.

use super::graph::{AlarmGraph, ComparisonOperator, EvaluationWindow, NodeId};
use crate::config::EngineConfig;
use crate::detection::{ImpactThresholdEvaluator, OutlierDetector, OutlierInput};
use crate::error::{Result, SynthesisError};
use crate::expression::{Expression, MetricExpressionBuilder};
use crate::models::{LoadBalancer, MetricRef, NatGateway, ServiceTopology, ZoneId};
use crate::observability::StructuredLogger;
use indexmap::IndexMap;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

const ALB_NAMESPACE: &str = "AWS/ApplicationELB";
const TARGET_5XX: &str = "HTTPCode_Target_5XX_Count";
const ELB_5XX: &str = "HTTPCode_ELB_5XX_Count";
const TARGET_2XX: &str = "HTTPCode_Target_2XX_Count";
const TARGET_3XX: &str = "HTTPCode_Target_3XX_Count";
const ELB_3XX: &str = "HTTPCode_ELB_3XX_Count";

const NAT_NAMESPACE: &str = "AWS/NATGateway";
const PACKETS_DROPPED: &str = "PacketsDropCount";
const PACKETS_FROM_SOURCE: &str = "PacketsInFromSource";
const PACKETS_FROM_DESTINATION: &str = "PacketsInFromDestination";

/// Signal of one infrastructure family in one zone
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FamilyZoneAlarms {
    /// One absolute-impact leaf per entity in the zone
    pub entity_impact: Vec<NodeId>,
    /// `ANY` over the entity leaves
    pub impact: NodeId,
    pub outlier: NodeId,
    /// `ALL(outlier, impact)`
    pub signal: NodeId,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZoneInfrastructureAlarms {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_balancer: Option<FamilyZoneAlarms>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nat_gateway: Option<FamilyZoneAlarms>,
    /// `ANY` over the families present in the zone
    pub isolated_impact: NodeId,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InfrastructureAlarms {
    pub zones: IndexMap<ZoneId, ZoneInfrastructureAlarms>,
}

/// Per-entity expressions of one family in one zone
struct EntitySeries {
    name: String,
    count: Arc<Expression>,
    rate: Arc<Expression>,
}

/// Expressions and impact leaves of one family across every zone
struct FamilyPass {
    builder: MetricExpressionBuilder,
    counts: IndexMap<ZoneId, Arc<Expression>>,
    entities: IndexMap<ZoneId, Vec<EntitySeries>>,
}

pub(crate) struct InfrastructureComposer<'a> {
    pub config: &'a EngineConfig,
    pub outlier: &'a OutlierDetector,
    pub topology: &'a ServiceTopology,
    /// Zone name to identity, in topology order
    pub zones: &'a IndexMap<String, ZoneId>,
    pub logger: &'a StructuredLogger,
}

impl InfrastructureComposer<'_> {
    /// Add the infrastructure families to the graph
    ///
    /// Returns `None` when the topology has neither load balancers nor
    /// NAT gateways.
    pub fn compose(&self, graph: &mut AlarmGraph) -> Result<Option<InfrastructureAlarms>> {
        let window = self.config.infrastructure_window()?;

        let load_balancers = self.load_balancer_pass()?;
        let gateways = self.nat_gateway_pass()?;
        if load_balancers.is_none() && gateways.is_none() {
            return Ok(None);
        }

        let lb_impact = ImpactThresholdEvaluator::new(
            self.config.load_balancer_fault_rate_threshold,
            ComparisonOperator::GreaterThanThreshold,
            window,
        )?;
        let nat_impact = ImpactThresholdEvaluator::new(
            self.config.nat_gateway_drop_threshold,
            ComparisonOperator::GreaterThanThreshold,
            window,
        )?;

        let mut load_balancers = load_balancers
            .map(|pass| self.region_total(pass, "fault count"))
            .transpose()?;
        let mut gateways = gateways
            .map(|pass| self.region_total(pass, "dropped packets"))
            .transpose()?;

        let mut zones = IndexMap::new();
        for zone in self.zones.values() {
            let load_balancer = match load_balancers.as_mut() {
                Some((pass, region)) => self.family_zone(
                    graph,
                    pass,
                    region,
                    zone,
                    &lb_impact,
                    window,
                    FamilyNames {
                        entity_suffix: "fault-rate",
                        impact: format!("{zone}-load-balancer-impact"),
                        outlier: format!("{zone}-fault-count-outlier"),
                        signal: format!("{zone}-isolated-fault-count-impact"),
                    },
                )?,
                None => None,
            };
            let nat_gateway = match gateways.as_mut() {
                Some((pass, region)) => self.family_zone(
                    graph,
                    pass,
                    region,
                    zone,
                    &nat_impact,
                    window,
                    FamilyNames {
                        entity_suffix: "packet-drop-impact",
                        impact: format!("{zone}-natgw-impact"),
                        outlier: format!("{zone}-dropped-packets-outlier"),
                        signal: format!("{zone}-isolated-natgw-impact"),
                    },
                )?,
                None => None,
            };

            let children: Vec<NodeId> = [load_balancer.as_ref(), nat_gateway.as_ref()]
                .into_iter()
                .flatten()
                .map(|family| family.signal)
                .collect();
            if children.is_empty() {
                self.logger.log_family_skipped(
                    zone.as_str(),
                    "infrastructure",
                    "no load balancer or NAT gateway in zone",
                );
                continue;
            }

            let isolated_impact =
                graph.any_of(format!("{zone}-aggregate-isolated-impact"), children)?;
            zones.insert(
                zone.clone(),
                ZoneInfrastructureAlarms {
                    load_balancer,
                    nat_gateway,
                    isolated_impact,
                },
            );
        }

        Ok(Some(InfrastructureAlarms { zones }))
    }

    fn zone_of(&self, zone_name: &str, entity: &str) -> Result<ZoneId> {
        self.zones
            .get(zone_name)
            .cloned()
            .ok_or_else(|| SynthesisError::ZoneNotInTopology {
                operation: entity.to_string(),
                zone: zone_name.to_string(),
            })
    }

    fn load_balancer_pass(&self) -> Result<Option<FamilyPass>> {
        if self.topology.load_balancers.is_empty() {
            return Ok(None);
        }

        let mut builder = MetricExpressionBuilder::new(self.topology.period_secs);
        let mut by_zone: IndexMap<ZoneId, Vec<(&str, &LoadBalancer)>> = IndexMap::new();
        for lb in &self.topology.load_balancers {
            for zone_name in &lb.zones {
                let zone = self.zone_of(zone_name, &lb.name)?;
                by_zone.entry(zone).or_default().push((zone_name.as_str(), lb));
            }
        }

        let mut entities = IndexMap::new();
        for zone in self.zones.values() {
            let Some(members) = by_zone.get(zone) else {
                continue;
            };
            let mut series = Vec::new();
            for (zone_name, lb) in members {
                let metric = |name: &str| {
                    MetricRef::new(ALB_NAMESPACE, name)
                        .with_dimension("AvailabilityZone", *zone_name)
                        .with_dimension("LoadBalancer", &lb.name)
                        .with_period(self.topology.period_secs)
                };
                let faults = vec![metric(TARGET_5XX), metric(ELB_5XX)];
                let requests = vec![
                    metric(TARGET_2XX),
                    metric(TARGET_3XX),
                    metric(ELB_3XX),
                    metric(TARGET_5XX),
                    metric(ELB_5XX),
                ];

                let count =
                    builder.aggregate_entity(format!("{zone} {} fault count", lb.name), faults.clone())?;
                let rate = builder.rate(
                    format!("{zone} {} fault rate", lb.name),
                    &faults,
                    &requests,
                    true,
                )?;
                series.push(EntitySeries {
                    name: lb.name.clone(),
                    count,
                    rate,
                });
            }
            entities.insert(zone.clone(), series);
        }

        Self::zone_totals(builder, entities, "fault count")
    }

    fn nat_gateway_pass(&self) -> Result<Option<FamilyPass>> {
        if self.topology.nat_gateways.values().all(Vec::is_empty) {
            return Ok(None);
        }

        let mut by_zone: IndexMap<ZoneId, &[NatGateway]> = IndexMap::new();
        for (zone_name, gateways) in &self.topology.nat_gateways {
            if gateways.is_empty() {
                continue;
            }
            let zone = self.zone_of(zone_name, "nat gateways")?;
            by_zone.insert(zone, gateways.as_slice());
        }

        let mut builder = MetricExpressionBuilder::new(self.topology.period_secs);
        let mut entities = IndexMap::new();
        for zone in self.zones.values() {
            let Some(gateways) = by_zone.get(zone) else {
                continue;
            };
            let mut series = Vec::new();
            for gateway in gateways.iter() {
                let metric = |name: &str| {
                    MetricRef::new(NAT_NAMESPACE, name)
                        .with_dimension("NatGatewayId", &gateway.id)
                        .with_period(self.topology.period_secs)
                };
                let dropped = vec![metric(PACKETS_DROPPED)];
                let received = vec![metric(PACKETS_FROM_SOURCE), metric(PACKETS_FROM_DESTINATION)];

                let count = builder
                    .aggregate_entity(format!("{zone} {} packet drops", gateway.id), dropped.clone())?;
                let rate = builder.rate(
                    format!("{zone} {} packet drop rate", gateway.id),
                    &dropped,
                    &received,
                    true,
                )?;
                series.push(EntitySeries {
                    name: gateway.id.clone(),
                    count,
                    rate,
                });
            }
            entities.insert(zone.clone(), series);
        }

        Self::zone_totals(builder, entities, "dropped packets")
    }

    fn zone_totals(
        mut builder: MetricExpressionBuilder,
        entities: IndexMap<ZoneId, Vec<EntitySeries>>,
        suffix: &str,
    ) -> Result<Option<FamilyPass>> {
        if entities.is_empty() {
            return Ok(None);
        }

        let mut counts = IndexMap::new();
        for (zone, series) in &entities {
            let members: Vec<Arc<Expression>> = series.iter().map(|s| Arc::clone(&s.count)).collect();
            counts.insert(zone.clone(), builder.aggregate_zone(zone, suffix, &members)?);
        }
        Ok(Some(FamilyPass {
            builder,
            counts,
            entities,
        }))
    }

    fn region_total(
        &self,
        mut pass: FamilyPass,
        suffix: &str,
    ) -> Result<(FamilyPass, Arc<Expression>)> {
        let region = pass
            .builder
            .aggregate_region(format!("{} {suffix}", self.topology.region), &pass.counts)?;
        Ok((pass, region))
    }

    #[allow(clippy::too_many_arguments)]
    fn family_zone(
        &self,
        graph: &mut AlarmGraph,
        pass: &mut FamilyPass,
        region: &Arc<Expression>,
        zone: &ZoneId,
        impact: &ImpactThresholdEvaluator,
        window: EvaluationWindow,
        names: FamilyNames,
    ) -> Result<Option<FamilyZoneAlarms>> {
        let (Some(series), Some(zone_count)) = (pass.entities.get(zone), pass.counts.get(zone))
        else {
            return Ok(None);
        };
        debug!(zone = %zone, family = %names.signal, entities = series.len(), "Composing infrastructure family");

        let mut entity_impact = Vec::new();
        for entity in series {
            let leaf = impact.exceeds_absolute_impact(
                format!("{zone}-{}-{}", entity.name, names.entity_suffix),
                format!("{} in {zone} exceeds {}", entity.name, impact.threshold()),
                Arc::clone(&entity.rate),
            );
            entity_impact.push(graph.add_leaf(leaf)?);
        }
        let impact_node = impact.zone_has_impact(graph, names.impact, entity_impact.clone())?;

        let outlier_leaf = self.outlier.is_outlier(
            &mut pass.builder,
            names.outlier,
            OutlierInput {
                zone,
                zone_metric: zone_count,
                region_total: region,
                breakdown: &pass.counts,
            },
            window,
        )?;
        let outlier = graph.add_leaf(outlier_leaf)?;
        let signal = graph.all_of(names.signal, vec![outlier, impact_node])?;

        Ok(Some(FamilyZoneAlarms {
            entity_impact,
            impact: impact_node,
            outlier,
            signal,
        }))
    }
}

struct FamilyNames {
    entity_suffix: &'static str,
    impact: String,
    outlier: String,
    signal: String,
}
