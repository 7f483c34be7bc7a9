//! Decision tree inspection command

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;
use std::path::Path;
use zonal_lib::alarm::{AlarmGraph, AlarmNode, NodeId};

use crate::output::{color_operator, format_condition, print_json, print_warning, OutputFormat};
use crate::topology::synthesize;

/// One node of the flattened decision tree
#[derive(Debug, Serialize)]
struct TreeNode {
    depth: usize,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    operator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    condition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    expression: Option<String>,
}

fn flatten(graph: &AlarmGraph, root: NodeId) -> Vec<TreeNode> {
    graph
        .walk(root)
        .into_iter()
        .filter_map(|(depth, id)| {
            let node = match graph.get(id)? {
                AlarmNode::Composite(composite) => TreeNode {
                    depth,
                    name: composite.name.clone(),
                    operator: Some(format!("{:?}", composite.operator).to_uppercase()),
                    condition: None,
                    expression: None,
                },
                AlarmNode::Leaf(leaf) => TreeNode {
                    depth,
                    name: leaf.name.clone(),
                    operator: None,
                    condition: Some(format_condition(leaf.comparison, leaf.threshold)),
                    expression: Some(leaf.expression.render().to_string()),
                },
            };
            Some(node)
        })
        .collect()
}

/// Print the service-level isolated-impact tree of one zone
pub fn run(topology: &Path, config: Option<&Path>, zone: &str, format: OutputFormat) -> Result<()> {
    let synthesis = synthesize(topology, config)?;

    let zone_id = synthesis
        .zones
        .iter()
        .find(|(name, id)| name.as_str() == zone || id.as_str() == zone)
        .map(|(_, id)| id.clone())
        .with_context(|| format!("Zone {} is not part of service {}", zone, synthesis.service))?;

    let Some(root) = synthesis.zone_decision(&zone_id) else {
        print_warning(&format!(
            "No critical operation is served from {}, nothing to explain",
            zone_id
        ));
        return Ok(());
    };

    let graph = &synthesis.graph;
    match format {
        OutputFormat::Json => print_json(&flatten(graph, root))?,
        OutputFormat::Table => {
            println!("{} {}", "Isolated impact decision for".bold(), zone_id.to_string().cyan());
            println!("{}", "=".repeat(60));
            for (depth, id) in graph.walk(root) {
                let indent = "  ".repeat(depth);
                match graph.get(id) {
                    Some(AlarmNode::Composite(composite)) => {
                        println!("{}{} {}", indent, color_operator(composite.operator), composite.name);
                    }
                    Some(AlarmNode::Leaf(leaf)) => {
                        println!(
                            "{}{} {} {}",
                            indent,
                            leaf.name,
                            format_condition(leaf.comparison, leaf.threshold).yellow(),
                            leaf.expression.render().dimmed()
                        );
                    }
                    None => {}
                }
            }
        }
    }

    Ok(())
}
