use super::*;
use crate::config::EngineConfig;
use crate::detection::{ContributionFilter, NamedOutlierFunction, OutlierAlgorithm};
use crate::error::SynthesisError;
use crate::expression::Term;
use crate::models::{
    ContributorRuleDetails, DimensionTemplate, LoadBalancer, MetricDetails, NatGateway, Operation,
    ServiceTopology, SignalSource, Unit, ZoneId,
};
use crate::zones::StaticZoneMap;
use std::sync::Arc;

const ZONES: [&str; 3] = ["use1-az1", "use1-az2", "use1-az3"];

fn zone_map() -> Arc<StaticZoneMap> {
    Arc::new(
        StaticZoneMap::new()
            .with_zone("us-east-1a", "use1-az1")
            .with_zone("us-east-1b", "use1-az2")
            .with_zone("us-east-1c", "use1-az3"),
    )
}

fn details(namespace: &str, success: &str, fault: &str, statistic: &str, threshold: f64) -> MetricDetails {
    MetricDetails {
        namespace: namespace.to_string(),
        success_metric_names: vec![success.to_string()],
        fault_metric_names: vec![fault.to_string()],
        alarm_statistic: statistic.to_string(),
        unit: Unit::Count,
        period_secs: 60,
        evaluation_periods: 5,
        datapoints_to_alarm: 3,
        success_alarm_threshold: threshold,
        fault_alarm_threshold: 1.0,
        dimensions: DimensionTemplate::default().with_static("Operation", "Ride"),
    }
}

fn source(namespace: &str) -> SignalSource {
    SignalSource {
        availability: details(namespace, "Success", "Fault", "Sum", 99.0),
        latency: details(namespace, "SuccessLatency", "FaultLatency", "p99", 200.0),
    }
}

fn contributor_details() -> ContributorRuleDetails {
    ContributorRuleDetails {
        log_groups: vec!["/wildrydes/frontend".to_string()],
        success_latency_json_path: "$.SuccessLatency".to_string(),
        fault_json_path: "$.Fault".to_string(),
        operation_name_json_path: "$.Operation".to_string(),
        zone_id_json_path: "$.AZ-ID".to_string(),
        instance_id_json_path: "$.InstanceId".to_string(),
    }
}

fn operation(name: &str) -> Operation {
    Operation {
        name: name.to_string(),
        critical: true,
        zones: None,
        server_side: source("wildrydes/frontend"),
        canary: None,
        contributor_rules: Some(contributor_details()),
    }
}

fn topology(operations: Vec<Operation>) -> ServiceTopology {
    ServiceTopology {
        name: "WildRydes".to_string(),
        region: "us-east-1".to_string(),
        zones: vec![
            "us-east-1a".to_string(),
            "us-east-1b".to_string(),
            "us-east-1c".to_string(),
        ],
        fault_count_threshold: 50.0,
        period_secs: 60,
        operations,
        load_balancers: Vec::new(),
        nat_gateways: Default::default(),
    }
}

fn static_engine(threshold: f64) -> AlarmCompositionEngine {
    let config = EngineConfig {
        outlier_algorithm: OutlierAlgorithm::Static,
        outlier_threshold: threshold,
        ..EngineConfig::default()
    };
    AlarmCompositionEngine::new(config, zone_map()).unwrap()
}

/// One datapoint of traffic per zone, indexed like `ZONES`
struct Traffic {
    successes: [f64; 3],
    faults: [f64; 3],
    latency_ms: [f64; 3],
    slow_requests: [f64; 3],
    instances: f64,
    faulting_instances: [f64; 3],
    slow_instances: [f64; 3],
}

impl Traffic {
    fn healthy() -> Self {
        Self {
            successes: [1000.0; 3],
            faults: [0.0; 3],
            latency_ms: [50.0; 3],
            slow_requests: [0.0; 3],
            instances: 4.0,
            faulting_instances: [0.0; 3],
            slow_instances: [0.0; 3],
        }
    }

    fn value(&self, term: &Term) -> Option<f64> {
        match term {
            Term::Metric(metric) => {
                let per_zone = match (metric.name.as_str(), metric.statistic.as_str()) {
                    ("Success", _) => self.successes,
                    ("Fault", _) => self.faults,
                    ("SuccessLatency", "p99") => self.latency_ms,
                    ("SuccessLatency", _) => self.slow_requests,
                    _ => return None,
                };
                match metric.dimensions.get("AZ-ID") {
                    Some(zone) => ZONES
                        .iter()
                        .position(|z| *z == zone.as_str())
                        .map(|i| per_zone[i]),
                    None if metric.statistic == "p99" => {
                        Some(per_zone.iter().copied().fold(0.0, f64::max))
                    }
                    None => Some(per_zone.iter().sum()),
                }
            }
            Term::Contributors(count) => {
                let i = ZONES.iter().position(|z| count.rule_name.starts_with(*z))?;
                if count.rule_name.contains("instances-in-the-az") {
                    Some(self.instances)
                } else if count.rule_name.contains("per-instance-faults") {
                    Some(self.faulting_instances[i])
                } else {
                    Some(self.slow_instances[i])
                }
            }
            Term::Expression(nested) => nested.evaluate(&|t: &Term| self.value(t)),
        }
    }

    fn state(&self, graph: &AlarmGraph, id: NodeId) -> bool {
        graph
            .resolve(id, &|leaf: &LeafAlarm| {
                leaf.breaches(leaf.expression.evaluate(&|t: &Term| self.value(t)))
            })
            .unwrap()
    }
}

fn zone(index: usize) -> ZoneId {
    ZoneId::new(ZONES[index])
}

fn decisions(synthesis: &Synthesis, traffic: &Traffic) -> Vec<bool> {
    (0..3)
        .map(|i| {
            let id = synthesis.zone_decision(&zone(i)).unwrap();
            traffic.state(&synthesis.graph, id)
        })
        .collect()
}

#[test]
fn test_single_zone_fault_isolation() {
    let synthesis = static_engine(0.5).synthesize(&topology(vec![operation("Ride")])).unwrap();

    let traffic = Traffic {
        faults: [10.0, 10.0, 80.0],
        faulting_instances: [1.0, 1.0, 3.0],
        ..Traffic::healthy()
    };

    assert_eq!(decisions(&synthesis, &traffic), vec![false, false, true]);

    let az3 = &synthesis.operations["Ride"].server_side.zones[&zone(2)];
    assert!(traffic.state(&synthesis.graph, az3.fault_outlier));
    assert!(traffic.state(&synthesis.graph, az3.availability));
    assert!(traffic.state(&synthesis.graph, az3.availability_signal));
    assert!(!traffic.state(&synthesis.graph, az3.latency_signal));

    let az1 = &synthesis.operations["Ride"].server_side.zones[&zone(0)];
    assert!(!traffic.state(&synthesis.graph, az1.fault_outlier));
}

#[test]
fn test_outlier_without_impact_does_not_isolate() {
    let synthesis = static_engine(0.5).synthesize(&topology(vec![operation("Ride")])).unwrap();

    // All faults in one zone, but far above the success-rate floor
    let traffic = Traffic {
        faults: [0.0, 0.0, 5.0],
        faulting_instances: [0.0, 0.0, 3.0],
        ..Traffic::healthy()
    };

    let az3 = &synthesis.operations["Ride"].server_side.zones[&zone(2)];
    assert!(traffic.state(&synthesis.graph, az3.fault_outlier));
    assert!(!traffic.state(&synthesis.graph, az3.availability));
    assert_eq!(decisions(&synthesis, &traffic), vec![false, false, false]);
}

#[test]
fn test_broad_impact_is_regional_not_zonal() {
    let synthesis = static_engine(0.5).synthesize(&topology(vec![operation("Ride")])).unwrap();

    let traffic = Traffic {
        faults: [80.0, 80.0, 80.0],
        faulting_instances: [4.0, 4.0, 4.0],
        ..Traffic::healthy()
    };

    assert_eq!(decisions(&synthesis, &traffic), vec![false, false, false]);

    let ride = &synthesis.operations["Ride"];
    assert!(traffic.state(&synthesis.graph, ride.server_side.customer_experience));
    assert!(traffic.state(&synthesis.graph, ride.regional));

    let fault_count = synthesis.service_alarms.regional_fault_count.unwrap();
    assert!(traffic.state(&synthesis.graph, fault_count));
}

#[test]
fn test_single_instance_faults_do_not_isolate() {
    let synthesis = static_engine(0.5).synthesize(&topology(vec![operation("Ride")])).unwrap();

    let traffic = Traffic {
        faults: [10.0, 10.0, 80.0],
        faulting_instances: [1.0, 1.0, 1.0],
        ..Traffic::healthy()
    };

    assert_eq!(decisions(&synthesis, &traffic), vec![false, false, false]);
}

#[test]
fn test_latency_isolation() {
    let synthesis = static_engine(0.5).synthesize(&topology(vec![operation("Ride")])).unwrap();

    let traffic = Traffic {
        latency_ms: [50.0, 50.0, 450.0],
        slow_requests: [2.0, 3.0, 95.0],
        slow_instances: [0.0, 1.0, 4.0],
        ..Traffic::healthy()
    };

    assert_eq!(decisions(&synthesis, &traffic), vec![false, false, true]);
    let az3 = &synthesis.operations["Ride"].server_side.zones[&zone(2)];
    assert!(traffic.state(&synthesis.graph, az3.latency_signal));
    assert!(!traffic.state(&synthesis.graph, az3.availability_signal));
}

#[test]
fn test_zone_signal_rules() {
    let synthesis = static_engine(0.7).synthesize(&topology(vec![operation("Ride")])).unwrap();
    let graph = &synthesis.graph;
    let az1 = &synthesis.operations["Ride"].server_side.zones[&zone(0)];

    assert_eq!(
        graph.rule(az1.isolated_impact).unwrap(),
        "ALARM(\"use1-az1-ride-isolated-availability-impact-server\") OR \
         ALARM(\"use1-az1-ride-isolated-latency-impact-server\")"
    );
    assert_eq!(
        graph.rule(az1.availability_signal).unwrap(),
        "ALARM(\"use1-az1-ride-majority-errors-impact-server\") AND \
         ALARM(\"use1-az1-ride-success-rate-server\") AND \
         ALARM(\"use1-az1-ride-multiple-instances-faults-server\")"
    );
}

#[test]
fn test_composites_only_reference_existing_nodes() {
    let mut ride = operation("Ride");
    ride.canary = Some(source("wildrydes/canary"));
    let synthesis = static_engine(0.7)
        .synthesize(&topology(vec![ride, operation("Pay")]))
        .unwrap();
    let graph = &synthesis.graph;

    for (id, node) in graph.iter() {
        if let AlarmNode::Composite(composite) = node {
            assert!(!composite.children.is_empty(), "{} has no children", composite.name);
            let rule = graph.rule(id).unwrap();
            for child in &composite.children {
                let name = graph.name_of(*child).unwrap();
                assert!(rule.contains(&format!("ALARM(\"{name}\")")));
                assert!(child.index() < id.index());
            }
        }
    }
}

#[test]
fn test_leaf_expressions_are_well_formed() {
    let synthesis = static_engine(0.7).synthesize(&topology(vec![operation("Ride")])).unwrap();

    for (_, node) in synthesis.graph.iter() {
        if let AlarmNode::Leaf(leaf) = node {
            assert!(leaf.expression.has_consistent_bindings(), "{}", leaf.name);
            assert_eq!(leaf.window.evaluation_periods, 5);
            assert_eq!(leaf.window.datapoints_to_alarm, 3);
        }
    }
}

#[test]
fn test_expected_alarm_names() {
    let synthesis = static_engine(0.7).synthesize(&topology(vec![operation("Ride")])).unwrap();
    let graph = &synthesis.graph;

    for name in [
        "use1-az2-ride-success-rate-server",
        "use1-az2-ride-success-latency-server",
        "use1-az2-ride-impact-aggregate-alarm-server",
        "use1-az2-ride-majority-errors-impact-server",
        "use1-az2-ride-majority-high-latency-impact-server",
        "use1-az2-ride-multiple-instances-faults-server",
        "use1-az2-ride-multiple-instances-high-latency-server",
        "use1-az2-ride-isolated-impact-alarm-server",
        "use1-az2-ride-aggregate-isolated-az-impact",
        "us-east-1-ride-success-rate-server",
        "us-east-1-ride-success-latency-server",
        "us-east-1-ride-customer-experience-impact-server",
        "us-east-1-ride-aggregate-alarm",
        "use1-az2-wildrydes-isolated-impact-aggregate-alarm",
        "us-east-1-wildrydes-fault-count",
        "us-east-1-wildrydes-server-side-aggregate-alarm",
    ] {
        assert!(graph.find(name).is_some(), "missing {name}");
    }

    let rule_names: Vec<&str> = synthesis.rules.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(rule_names.len(), 11);
    assert!(rule_names.contains(&"use1-az3-ride-per-instance-high-latency-server"));
    assert!(rule_names.contains(&"us-east-1-ride-per-instance-faults-server"));
    assert!(rule_names.contains(&"us-east-1-ride-per-instance-high-latency-server"));

    // Region-wide rules filter on the operation only
    let regional = synthesis
        .rules
        .iter()
        .find(|rule| rule.name == "us-east-1-ride-per-instance-faults-server")
        .unwrap();
    assert!(regional
        .filters
        .iter()
        .all(|filter| !matches!(filter, ContributionFilter::In { path, .. } if path == "$.AZ-ID")));
}

#[test]
fn test_synthesis_is_deterministic() {
    let topology = topology(vec![operation("Ride"), operation("Pay")]);
    let first = static_engine(0.7).synthesize(&topology).unwrap();
    let second = static_engine(0.7).synthesize(&topology).unwrap();

    assert_eq!(first.fingerprint, second.fingerprint);
    assert_eq!(
        serde_json::to_string(&first.graph).unwrap(),
        serde_json::to_string(&second.graph).unwrap()
    );
    assert_eq!(first.rules, second.rules);
}

#[test]
fn test_contributors_omitted_without_rule_details() {
    let mut ride = operation("Ride");
    ride.contributor_rules = None;
    let synthesis = static_engine(0.5).synthesize(&topology(vec![ride])).unwrap();

    assert!(synthesis.rules.is_empty());
    let az1 = &synthesis.operations["Ride"].server_side.zones[&zone(0)];
    assert!(az1.multiple_fault_contributors.is_none());
    assert_eq!(synthesis.graph.children(az1.availability_signal).len(), 2);

    // Outlier and impact alone still isolate
    let traffic = Traffic {
        faults: [10.0, 10.0, 80.0],
        ..Traffic::healthy()
    };
    assert_eq!(decisions(&synthesis, &traffic), vec![false, false, true]);
}

#[test]
fn test_canary_source_composition() {
    let mut ride = operation("Ride");
    ride.canary = Some(source("wildrydes/canary"));
    let synthesis = static_engine(0.7).synthesize(&topology(vec![ride])).unwrap();
    let graph = &synthesis.graph;

    let alarms = &synthesis.operations["Ride"];
    let canary = alarms.canary.as_ref().unwrap();
    let az1 = &canary.zones[&zone(0)];
    assert!(az1.multiple_fault_contributors.is_none());
    assert_eq!(graph.children(az1.availability_signal).len(), 2);

    let zone_node = alarms.zones[&zone(0)];
    assert_eq!(
        graph.rule(zone_node).unwrap(),
        "ALARM(\"use1-az1-ride-isolated-impact-alarm-server\") OR \
         ALARM(\"use1-az1-ride-isolated-impact-alarm-canary\")"
    );
    assert!(synthesis.service_alarms.canary_regional.is_some());
    assert!(graph.find("us-east-1-wildrydes-canary-aggregate-alarm").is_some());
}

#[test]
fn test_infrastructure_families() {
    let mut topology = topology(vec![operation("Ride")]);
    topology.load_balancers = vec![LoadBalancer {
        name: "app/wildrydes/1234".to_string(),
        zones: vec!["us-east-1a".to_string(), "us-east-1b".to_string()],
    }];
    topology.nat_gateways.insert(
        "us-east-1a".to_string(),
        vec![NatGateway {
            id: "nat-0abc".to_string(),
        }],
    );

    let synthesis = static_engine(0.7).synthesize(&topology).unwrap();
    let graph = &synthesis.graph;
    let infrastructure = synthesis.infrastructure.as_ref().unwrap();

    let az1 = &infrastructure.zones[&zone(0)];
    assert!(az1.load_balancer.is_some());
    assert!(az1.nat_gateway.is_some());
    assert_eq!(graph.children(az1.isolated_impact).len(), 2);

    let az2 = &infrastructure.zones[&zone(1)];
    assert!(az2.nat_gateway.is_none());
    assert!(!infrastructure.zones.contains_key(&zone(2)));

    for name in [
        "use1-az1-app/wildrydes/1234-fault-rate",
        "use1-az1-fault-count-outlier",
        "use1-az1-isolated-fault-count-impact",
        "use1-az1-nat-0abc-packet-drop-impact",
        "use1-az1-dropped-packets-outlier",
        "use1-az1-isolated-natgw-impact",
        "use1-az1-aggregate-isolated-impact",
    ] {
        assert!(graph.find(name).is_some(), "missing {name}");
    }

    // Infrastructure impact is reported beside, not inside, the service decision
    let service_az1 = synthesis.zone_decision(&zone(0)).unwrap();
    assert!(!graph.references(service_az1, az1.isolated_impact));
}

#[test]
fn test_infrastructure_zone_keeps_only_present_families() {
    let mut topology = topology(vec![operation("Ride")]);
    topology.load_balancers = vec![LoadBalancer {
        name: "app/wildrydes/1234".to_string(),
        zones: vec!["us-east-1a".to_string(), "us-east-1b".to_string()],
    }];
    for (zone_name, id) in [("us-east-1a", "nat-0abc"), ("us-east-1c", "nat-0def")] {
        topology
            .nat_gateways
            .insert(zone_name.to_string(), vec![NatGateway { id: id.to_string() }]);
    }

    let synthesis = static_engine(0.7).synthesize(&topology).unwrap();
    let graph = &synthesis.graph;
    let infrastructure = synthesis.infrastructure.as_ref().unwrap();

    let family_nodes = |pick: fn(&ZoneInfrastructureAlarms) -> Option<&FamilyZoneAlarms>| {
        infrastructure
            .zones
            .values()
            .filter_map(pick)
            .flat_map(|family| {
                family
                    .entity_impact
                    .iter()
                    .copied()
                    .chain([family.impact, family.outlier, family.signal])
            })
            .collect::<Vec<NodeId>>()
    };
    let lb_nodes = family_nodes(|zone| zone.load_balancer.as_ref());
    let nat_nodes = family_nodes(|zone| zone.nat_gateway.as_ref());
    assert!(!lb_nodes.is_empty());
    assert!(!nat_nodes.is_empty());

    // Gateway data only
    let az3 = &infrastructure.zones[&zone(2)];
    assert!(az3.load_balancer.is_none());
    let nat = az3.nat_gateway.as_ref().unwrap();
    assert_eq!(graph.children(az3.isolated_impact).to_vec(), vec![nat.signal]);
    assert!(lb_nodes
        .iter()
        .all(|lb| !graph.references(az3.isolated_impact, *lb)));
    assert_eq!(
        graph.rule(az3.isolated_impact).unwrap(),
        "ALARM(\"use1-az3-isolated-natgw-impact\")"
    );

    // Load balancer data only
    let az2 = &infrastructure.zones[&zone(1)];
    assert!(az2.nat_gateway.is_none());
    let lb = az2.load_balancer.as_ref().unwrap();
    assert_eq!(graph.children(az2.isolated_impact).to_vec(), vec![lb.signal]);
    assert!(nat_nodes
        .iter()
        .all(|nat| !graph.references(az2.isolated_impact, *nat)));
}

#[test]
fn test_no_infrastructure_without_entities() {
    let synthesis = static_engine(0.7).synthesize(&topology(vec![operation("Ride")])).unwrap();
    assert!(synthesis.infrastructure.is_none());
}

#[test]
fn test_z_score_is_rejected() {
    let config = EngineConfig {
        outlier_algorithm: OutlierAlgorithm::ZScore,
        ..EngineConfig::default()
    };
    let engine = AlarmCompositionEngine::new(config, zone_map()).unwrap();

    let result = engine.synthesize(&topology(vec![operation("Ride")]));
    assert_eq!(
        result.unwrap_err(),
        SynthesisError::UnsupportedAlgorithm(OutlierAlgorithm::ZScore)
    );
}

#[test]
fn test_chi_squared_requires_function() {
    let config = EngineConfig {
        outlier_algorithm: OutlierAlgorithm::ChiSquared,
        outlier_threshold: 0.05,
        ..EngineConfig::default()
    };
    let engine = AlarmCompositionEngine::new(config, zone_map()).unwrap();

    let result = engine.synthesize(&topology(vec![operation("Ride")]));
    assert_eq!(
        result.unwrap_err(),
        SynthesisError::MissingOutlierFunction(OutlierAlgorithm::ChiSquared)
    );
}

#[test]
fn test_chi_squared_with_function() {
    let config = EngineConfig {
        outlier_algorithm: OutlierAlgorithm::ChiSquared,
        outlier_threshold: 0.05,
        ..EngineConfig::default()
    };
    let engine = AlarmCompositionEngine::new(config, zone_map())
        .unwrap()
        .with_outlier_function(Arc::new(NamedOutlierFunction::new("chi-squared")));

    let synthesis = engine.synthesize(&topology(vec![operation("Ride")])).unwrap();
    let id = synthesis
        .graph
        .find("use1-az2-ride-majority-errors-impact-server")
        .unwrap();
    let Some(AlarmNode::Leaf(leaf)) = synthesis.graph.get(id) else {
        panic!("outlier is not a leaf");
    };

    assert!(leaf
        .expression
        .render()
        .starts_with("LAMBDA(\"chi-squared\", 0.05, \"use1-az2\", \"use1-az1\", "));
    assert_eq!(leaf.threshold, 1.0);
    assert_eq!(leaf.comparison, ComparisonOperator::GreaterThanOrEqualToThreshold);
}

#[test]
fn test_configured_outlier_function_name() {
    let config = EngineConfig {
        outlier_algorithm: OutlierAlgorithm::ChiSquared,
        outlier_threshold: 0.05,
        outlier_function_name: Some("chi".to_string()),
        ..EngineConfig::default()
    };
    let engine = AlarmCompositionEngine::new(config, zone_map()).unwrap();
    assert!(engine.synthesize(&topology(vec![operation("Ride")])).is_ok());
}

#[test]
fn test_duplicate_operation_is_rejected() {
    let result = static_engine(0.7).synthesize(&topology(vec![operation("Ride"), operation("ride")]));
    assert!(matches!(result, Err(SynthesisError::DuplicateAlarmName(_))));
}

#[test]
fn test_operation_zone_outside_topology() {
    let mut ride = operation("Ride");
    ride.zones = Some(vec!["us-east-1a".to_string(), "us-east-1d".to_string()]);

    let result = static_engine(0.7).synthesize(&topology(vec![ride]));
    assert_eq!(
        result.unwrap_err(),
        SynthesisError::ZoneNotInTopology {
            operation: "Ride".to_string(),
            zone: "us-east-1d".to_string(),
        }
    );
}

#[test]
fn test_unresolvable_zone() {
    let mut topology = topology(vec![operation("Ride")]);
    topology.zones.push("us-east-1f".to_string());

    let result = static_engine(0.7).synthesize(&topology);
    assert_eq!(
        result.unwrap_err(),
        SynthesisError::UnknownZone("us-east-1f".to_string())
    );
}

#[test]
fn test_zone_listed_twice() {
    let mut topology = topology(vec![operation("Ride")]);
    topology.zones.push("us-east-1b".to_string());

    let result = static_engine(0.7).synthesize(&topology);
    assert_eq!(
        result.unwrap_err(),
        SynthesisError::DuplicateZone("us-east-1b".to_string())
    );
}

#[test]
fn test_zone_names_sharing_an_identity() {
    let engine = AlarmCompositionEngine::new(
        EngineConfig::default(),
        Arc::new(
            StaticZoneMap::new()
                .with_zone("us-east-1a", "use1-az1")
                .with_zone("us-east-1b", "use1-az2")
                .with_zone("us-east-1c", "use1-az1"),
        ),
    )
    .unwrap();

    let result = engine.synthesize(&topology(vec![operation("Ride")]));
    assert_eq!(
        result.unwrap_err(),
        SynthesisError::DuplicateZone("us-east-1c".to_string())
    );
}

#[test]
fn test_service_without_zones() {
    let mut topology = topology(vec![operation("Ride")]);
    topology.zones.clear();

    let result = static_engine(0.7).synthesize(&topology);
    assert!(matches!(result, Err(SynthesisError::NoZones(_))));
}

#[test]
fn test_operation_served_from_zone_subset() {
    let mut ride = operation("Ride");
    ride.zones = Some(vec!["us-east-1a".to_string(), "us-east-1b".to_string()]);
    let synthesis = static_engine(0.7).synthesize(&topology(vec![ride])).unwrap();

    assert_eq!(synthesis.operations["Ride"].zones.len(), 2);
    assert!(synthesis.zone_decision(&zone(2)).is_none());
    assert!(synthesis.graph.find("use1-az3-ride-success-rate-server").is_none());
}

#[test]
fn test_no_critical_operations() {
    let mut ride = operation("Ride");
    ride.critical = false;
    let synthesis = static_engine(0.7).synthesize(&topology(vec![ride])).unwrap();

    assert!(synthesis.service_alarms.zones.is_empty());
    assert!(synthesis.service_alarms.regional_fault_count.is_none());
    assert!(synthesis.graph.find("us-east-1-ride-aggregate-alarm").is_some());
}

#[test]
fn test_service_zone_decision_spans_critical_operations() {
    let mut browse = operation("Browse");
    browse.critical = false;
    let synthesis = static_engine(0.7)
        .synthesize(&topology(vec![operation("Ride"), operation("Pay"), browse]))
        .unwrap();

    let decision = synthesis.zone_decision(&zone(0)).unwrap();
    assert_eq!(
        synthesis.graph.rule(decision).unwrap(),
        "ALARM(\"use1-az1-ride-aggregate-isolated-az-impact\") OR \
         ALARM(\"use1-az1-pay-aggregate-isolated-az-impact\")"
    );
}

#[test]
fn test_region_label_override() {
    let config = EngineConfig {
        region_label: Some("iad".to_string()),
        ..EngineConfig::default()
    };
    let engine = AlarmCompositionEngine::new(config, zone_map()).unwrap();
    let synthesis = engine.synthesize(&topology(vec![operation("Ride")])).unwrap();

    assert!(synthesis.graph.find("iad-ride-aggregate-alarm").is_some());
    assert!(synthesis.graph.find("iad-wildrydes-fault-count").is_some());
    assert_eq!(synthesis.region, "us-east-1");
}

#[test]
fn test_invalid_catalog_window_is_rejected() {
    let mut ride = operation("Ride");
    ride.server_side.latency.datapoints_to_alarm = 9;

    let result = static_engine(0.7).synthesize(&topology(vec![ride]));
    assert!(matches!(result, Err(SynthesisError::OutOfRange { .. })));
}
