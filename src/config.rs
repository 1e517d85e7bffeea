//! Typed startup configuration for the bridge.
//!
//! Two JSON documents are loaded once at startup: the secrets document
//! (TTN application identity plus optional Keycloak credentials) and the
//! device route document (see [`crate::routes`]). Runtime knobs live in
//! [`Settings`] with environment-variable overrides.

use crate::error::{BridgeError, BridgeResult};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default TTN MQTT broker host (EU region handler).
pub const DEFAULT_MQTT_HOST: &str = "eu.thethings.network";

/// Default TTN MQTT broker port.
pub const DEFAULT_MQTT_PORT: u16 = 1883;

/// Default path of the persisted refresh token.
pub const DEFAULT_TOKEN_FILE: &str = "refresh_token.txt";

/// Secrets document.
///
/// A missing `ttn` block fails the load, which is fatal to startup. A
/// missing `keycloak` block is the explicit degraded mode: the bridge
/// runs, but outbound writes carry no authorization header.
#[derive(Debug, Clone, Deserialize)]
pub struct Secrets {
    /// Keycloak identity-provider credentials (optional).
    #[serde(default)]
    pub keycloak: Option<KeycloakConfig>,
    /// TTN application identity (required).
    pub ttn: TtnConfig,
}

/// Credentials for the Keycloak token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct KeycloakConfig {
    /// Token endpoint URL.
    pub url: String,
    /// OAuth2 client id.
    pub id_client: String,
    /// OAuth2 client secret.
    pub id_secret: String,
    /// Resource-owner username for the initial password grant.
    pub username: String,
    /// Resource-owner password for the initial password grant.
    pub password: String,
}

/// TTN application identity used as MQTT credentials.
#[derive(Debug, Clone, Deserialize)]
pub struct TtnConfig {
    /// Application id (MQTT username).
    pub app_id: String,
    /// Application access key (MQTT password).
    pub app_key: String,
}

impl Secrets {
    /// Load the secrets document from a JSON file.
    pub fn load(path: &Path) -> BridgeResult<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            BridgeError::Config(format!("invalid secrets document {}: {}", path.display(), e))
        })
    }
}

/// Runtime settings with defaults and environment overrides.
#[derive(Debug, Clone)]
pub struct Settings {
    /// MQTT broker host.
    pub mqtt_host: String,
    /// MQTT broker port.
    pub mqtt_port: u16,
    /// Path of the persisted refresh token.
    pub token_file: PathBuf,
    /// Directory the diagnostic journal is written to.
    pub journal_dir: PathBuf,
}

impl Settings {
    /// Build settings from defaults, then apply environment overrides.
    pub fn new() -> Self {
        let mqtt_host =
            std::env::var("BRIDGE_MQTT_HOST").unwrap_or_else(|_| DEFAULT_MQTT_HOST.to_string());

        let mqtt_port = std::env::var("BRIDGE_MQTT_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_MQTT_PORT);

        let token_file = std::env::var("BRIDGE_TOKEN_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_TOKEN_FILE));

        let journal_dir = std::env::var("BRIDGE_LOG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."));

        Self {
            mqtt_host,
            mqtt_port,
            token_file,
            journal_dir,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new()
    }
}
