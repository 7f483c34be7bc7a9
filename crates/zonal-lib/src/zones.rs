//! Zone identity resolution
//!
//! Zone names are account relative (`us-east-1a`); the graph is keyed by the
//! stable zone identity (`use1-az1`). The mapping is owned by the caller.

use crate::error::{Result, SynthesisError};
use crate::models::ZoneId;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Maps an account-relative zone name to its stable identity
pub trait ZoneIdentityResolver: Send + Sync {
    fn resolve(&self, zone_name: &str) -> Option<ZoneId>;

    /// Resolve or fail with `UnknownZone`
    fn require(&self, zone_name: &str) -> Result<ZoneId> {
        self.resolve(zone_name)
            .ok_or_else(|| SynthesisError::UnknownZone(zone_name.to_string()))
    }
}

/// Fixed name-to-identity table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StaticZoneMap {
    zones: IndexMap<String, ZoneId>,
}

impl StaticZoneMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_zone(mut self, name: impl Into<String>, id: impl Into<String>) -> Self {
        self.zones.insert(name.into(), ZoneId::new(id));
        self
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}

impl FromIterator<(String, ZoneId)> for StaticZoneMap {
    fn from_iter<T: IntoIterator<Item = (String, ZoneId)>>(iter: T) -> Self {
        Self {
            zones: iter.into_iter().collect(),
        }
    }
}

impl ZoneIdentityResolver for StaticZoneMap {
    fn resolve(&self, zone_name: &str) -> Option<ZoneId> {
        self.zones.get(zone_name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_map_resolves() {
        let zones = StaticZoneMap::new()
            .with_zone("us-east-1a", "use1-az4")
            .with_zone("us-east-1b", "use1-az6");

        assert_eq!(zones.resolve("us-east-1b"), Some(ZoneId::new("use1-az6")));
        assert_eq!(zones.len(), 2);
    }

    #[test]
    fn test_require_unknown_zone() {
        let zones = StaticZoneMap::new();
        assert_eq!(
            zones.require("us-east-1c"),
            Err(SynthesisError::UnknownZone("us-east-1c".to_string()))
        );
    }

    #[test]
    fn test_deserializes_from_plain_object() {
        let zones: StaticZoneMap =
            serde_json::from_str(r#"{"us-east-1a": "use1-az4"}"#).unwrap();
        assert_eq!(zones.resolve("us-east-1a"), Some(ZoneId::new("use1-az4")));
    }
}
