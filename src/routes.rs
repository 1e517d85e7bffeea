//! Device routing table.
//!
//! Maps a TTN device id to the SensorThings Locations URL and display name
//! used for that tracker. Loaded once at startup and read-only afterwards.

use crate::error::{BridgeError, BridgeResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Destination for one device's location updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteEntry {
    /// SensorThings Locations endpoint the update is POSTed to.
    pub url: String,
    /// Display name attached to every update for this device.
    pub name: String,
}

/// Static device-id → destination mapping.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: HashMap<String, RouteEntry>,
}

impl RouteTable {
    /// Load the route document (`{dev_id: {url, name}}`) from a JSON file.
    pub fn load(path: &Path) -> BridgeResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let routes: HashMap<String, RouteEntry> = serde_json::from_str(&content).map_err(|e| {
            BridgeError::Config(format!("invalid route document {}: {}", path.display(), e))
        })?;
        Ok(Self { routes })
    }

    /// Build a table from in-memory entries.
    pub fn from_entries(entries: impl IntoIterator<Item = (String, RouteEntry)>) -> Self {
        Self {
            routes: entries.into_iter().collect(),
        }
    }

    /// Look up the route for a device. Unknown ids are not an error; the
    /// caller decides how to treat them.
    pub fn lookup(&self, device_id: &str) -> Option<&RouteEntry> {
        self.routes.get(device_id)
    }

    /// Number of routed devices.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Serialize the table for the startup journal dump.
    pub fn dump(&self) -> String {
        serde_json::to_string(&self.routes).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_route_document() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            br#"{
                "tracker-1": { "url": "https://frost.example.org/v1.0/Things(1)/Locations", "name": "Tracker 1" },
                "tracker-2": { "url": "https://frost.example.org/v1.0/Things(2)/Locations", "name": "Tracker 2" }
            }"#,
        )
        .unwrap();

        let table = RouteTable::load(file.path()).unwrap();
        assert_eq!(table.len(), 2);

        let entry = table.lookup("tracker-1").unwrap();
        assert_eq!(entry.name, "Tracker 1");
        assert!(entry.url.ends_with("Things(1)/Locations"));
    }

    #[test]
    fn unknown_device_is_none() {
        let table = RouteTable::from_entries([(
            "tracker-1".to_string(),
            RouteEntry {
                url: "https://frost.example.org/v1.0/Things(1)/Locations".to_string(),
                name: "Tracker 1".to_string(),
            },
        )]);

        assert!(table.lookup("tracker-1").is_some());
        assert!(table.lookup("unknown-device").is_none());
    }

    #[test]
    fn invalid_document_fails_the_load() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"tracker-1": "not an object"}"#).unwrap();

        let result = RouteTable::load(file.path());
        assert!(matches!(result, Err(BridgeError::Config(_))));
    }

    #[test]
    fn dump_round_trips_through_json() {
        let table = RouteTable::from_entries([(
            "tracker-1".to_string(),
            RouteEntry {
                url: "https://frost.example.org/v1.0/Things(1)/Locations".to_string(),
                name: "Tracker 1".to_string(),
            },
        )]);

        let dumped = table.dump();
        let parsed: HashMap<String, RouteEntry> = serde_json::from_str(&dumped).unwrap();
        assert_eq!(parsed["tracker-1"].name, "Tracker 1");
    }
}
