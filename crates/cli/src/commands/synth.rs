//! Graph synthesis command

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;
use tabled::Tabled;
use zonal_lib::Synthesis;

use crate::output::{print_info, print_json, print_success, print_warning, OutputFormat};
use crate::topology::synthesize;

/// Row for the zone summary table
#[derive(Tabled)]
struct ZoneRow {
    #[tabled(rename = "Zone")]
    name: String,
    #[tabled(rename = "Zone ID")]
    zone_id: String,
    #[tabled(rename = "Isolated Impact")]
    decision: String,
    #[tabled(rename = "Infrastructure")]
    infrastructure: String,
}

fn zone_rows(synthesis: &Synthesis) -> Vec<ZoneRow> {
    let graph = &synthesis.graph;
    synthesis
        .zones
        .iter()
        .map(|(name, zone)| {
            let decision = synthesis
                .zone_decision(zone)
                .and_then(|id| graph.name_of(id))
                .unwrap_or("-");
            let infrastructure = synthesis
                .infrastructure
                .as_ref()
                .and_then(|infra| infra.zones.get(zone))
                .and_then(|alarms| graph.name_of(alarms.isolated_impact))
                .unwrap_or("-");
            ZoneRow {
                name: name.clone(),
                zone_id: zone.to_string(),
                decision: decision.to_string(),
                infrastructure: infrastructure.to_string(),
            }
        })
        .collect()
}

/// Synthesize the graph and print a summary or the full report
pub fn run(
    topology: &Path,
    config: Option<&Path>,
    output: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let synthesis = synthesize(topology, config)?;

    if let Some(path) = output {
        let json = serde_json::to_string_pretty(&synthesis)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
    }

    match format {
        OutputFormat::Json => print_json(&synthesis)?,
        OutputFormat::Table => {
            let graph = &synthesis.graph;
            println!("{}", "Zonal Isolation Alarm Graph".bold());
            println!("{}", "=".repeat(60));
            println!("Service:      {}", synthesis.service.cyan());
            println!("Region:       {}", synthesis.region.cyan());
            println!("Operations:   {}", synthesis.operations.len());
            println!("Leaf alarms:  {}", graph.leaf_count());
            println!("Composites:   {}", graph.composite_count());
            println!("Rules:        {}", synthesis.rules.len());
            println!("Fingerprint:  {}", synthesis.fingerprint.dimmed());
            println!();

            let table = tabled::Table::new(zone_rows(&synthesis))
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);

            if synthesis.service_alarms.zones.is_empty() {
                print_warning("No critical operations, so no service-level zone decisions");
            }
            if let Some(id) = synthesis.service_alarms.regional_fault_count {
                print_info(&format!(
                    "Regional fault count alarm: {}",
                    graph.name_of(id).unwrap_or("-")
                ));
            }
            if let Some(path) = output {
                print_success(&format!("Report written to {}", path.display()));
            }
        }
    }

    Ok(())
}
