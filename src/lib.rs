//! TTN-to-SensorThings location bridge.
//!
//! A long-running daemon that receives LoRaWAN GPS uplinks from The
//! Things Network over MQTT, decodes the 11-byte tracker payload, and
//! forwards each reading as a GeoJSON location update to an OGC
//! SensorThings endpoint, authenticating against Keycloak via an OAuth2
//! refresh-token flow.
//!
//! # Core Invariants
//!
//! 1. **Contained Failures**: per-message failures (bad payload, unknown
//!    device, failed POST) are logged and dropped; only startup-time
//!    failures terminate the process
//! 2. **One Write Per Reading**: exactly one HTTP POST per successfully
//!    decoded and routed uplink, no retries
//! 3. **Single Token Owner**: the token manager is the only reader and
//!    writer of the refresh-token file, and every outbound write carries
//!    the most recently obtained access token
//! 4. **Read-Only Routing**: the device route table never changes after
//!    startup
//!
//! # Architecture
//!
//! ```text
//! TTN MQTT -> UplinkSource -> UplinkForwarder -> SensorThings sink
//!                                  |    ^
//!                          Journal |    | bearer
//!                                  v    |
//!                              log file TokenManager <-> Keycloak
//! ```

pub mod config;
pub mod error;
pub mod forwarder;
pub mod journal;
pub mod payload;
pub mod routes;
pub mod token;
pub mod uplink;

#[cfg(test)]
mod tests;

pub use config::{KeycloakConfig, Secrets, Settings, TtnConfig};
pub use error::{BridgeError, BridgeResult};
pub use forwarder::{ForwardOutcome, UplinkForwarder};
pub use journal::Journal;
pub use payload::{decode, DecodeError, GpsReading};
pub use routes::{RouteEntry, RouteTable};
pub use token::TokenManager;
pub use uplink::{UplinkMessage, UplinkSource};
