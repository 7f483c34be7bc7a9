//! Topology documents
//!
//! A topology document pairs the service topology with the zone name to
//! zone identity table of the account it is deployed in:
//!
//! ```json
//! { "zone_ids": { "us-east-1a": "use1-az4" }, "service": { ... } }
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;
use zonal_lib::{AlarmCompositionEngine, EngineConfig, ServiceTopology, StaticZoneMap, Synthesis};

#[derive(Debug, Deserialize)]
pub struct TopologyDocument {
    pub zone_ids: StaticZoneMap,
    pub service: ServiceTopology,
}

impl TopologyDocument {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read topology file {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse topology file {}", path.display()))
    }
}

/// Load the topology and configuration, then synthesize the graph
pub fn synthesize(topology: &Path, config: Option<&Path>) -> Result<Synthesis> {
    let document = TopologyDocument::load(topology)?;
    let config = EngineConfig::load(config)?;
    debug!(
        service = %document.service.name,
        algorithm = %config.outlier_algorithm,
        zones = document.zone_ids.len(),
        "Loaded topology"
    );

    let engine = AlarmCompositionEngine::new(config, Arc::new(document.zone_ids))
        .context("Invalid engine configuration")?;
    engine
        .synthesize(&document.service)
        .with_context(|| format!("Failed to synthesize alarm graph for {}", document.service.name))
}
