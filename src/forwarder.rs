//! Uplink-to-HTTP forwarding pipeline.
//!
//! One invocation per inbound uplink: journal the raw message, decode the
//! payload, look up the device route, and POST a GeoJSON location update
//! to the sink. Every per-message failure is contained here; nothing
//! propagates to the ingestion loop.

use crate::journal::Journal;
use crate::payload::{self, DecodeError, GpsReading};
use crate::routes::RouteTable;
use crate::token::TokenManager;
use crate::uplink::UplinkMessage;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Fixed description attached to every outbound location update.
const LOCATION_DESCRIPTION: &str = "Continuously updated GPS location of tracker device";

/// What happened to one uplink. Informational only; no outcome is an
/// error to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardOutcome {
    /// The sink accepted the location update (2xx).
    Forwarded(u16),
    /// The sink answered with a non-2xx status; the message is lost.
    SinkRejected(u16),
    /// The POST failed at the transport level; the message is lost.
    SinkUnreachable,
    /// No route is configured for the device id.
    UnknownDevice,
    /// The payload was not valid base64 or not 11 bytes.
    InvalidPayload,
    /// No access token could be obtained for the write.
    AuthUnavailable,
}

/// Forwards decoded uplinks to the per-device sink endpoint.
pub struct UplinkForwarder {
    http: reqwest::Client,
    routes: RouteTable,
    tokens: Option<Arc<TokenManager>>,
    journal: Arc<Journal>,
}

impl UplinkForwarder {
    /// Create a forwarder. `tokens` is `None` in degraded mode; writes
    /// then carry no authorization header.
    pub fn new(routes: RouteTable, tokens: Option<Arc<TokenManager>>, journal: Arc<Journal>) -> Self {
        Self {
            http: reqwest::Client::new(),
            routes,
            tokens,
            journal,
        }
    }

    /// Handle one uplink message.
    pub async fn handle(&self, msg: &UplinkMessage) -> ForwardOutcome {
        debug!(
            device_id = %msg.device_id,
            time = ?msg.time,
            raw = %msg.payload_raw,
            "uplink received"
        );
        self.journal.append(&msg.raw);

        let reading = match decode_payload(&msg.payload_raw) {
            Ok(reading) => reading,
            Err(e) => {
                warn!(device_id = %msg.device_id, error = %e, "dropping undecodable uplink");
                return ForwardOutcome::InvalidPayload;
            }
        };
        info!(
            device_id = %msg.device_id,
            lat = reading.latitude,
            lon = reading.longitude,
            alt = reading.altitude,
            sat = reading.satellites,
            "decoded reading"
        );

        let route = match self.routes.lookup(&msg.device_id) {
            Some(route) => route,
            None => {
                warn!(device_id = %msg.device_id, "no route for device, dropping uplink");
                return ForwardOutcome::UnknownDevice;
            }
        };

        let body = location_update(&route.name, &reading);
        let mut request = self.http.post(&route.url).json(&body);

        if let Some(tokens) = &self.tokens {
            match tokens.bearer().await {
                Ok(bearer) => request = request.header("Authorization", bearer),
                Err(e) => {
                    error!(
                        device_id = %msg.device_id,
                        error = %e,
                        "could not obtain access token, dropping uplink"
                    );
                    return ForwardOutcome::AuthUnavailable;
                }
            }
        }

        match request.send().await {
            Ok(response) => {
                let status = response.status();
                info!(
                    device_id = %msg.device_id,
                    url = %route.url,
                    status = status.as_u16(),
                    "location update posted"
                );
                if status.is_success() {
                    ForwardOutcome::Forwarded(status.as_u16())
                } else {
                    ForwardOutcome::SinkRejected(status.as_u16())
                }
            }
            Err(e) => {
                warn!(
                    device_id = %msg.device_id,
                    url = %route.url,
                    error = %e,
                    "location update failed"
                );
                ForwardOutcome::SinkUnreachable
            }
        }
    }
}

fn decode_payload(payload_raw: &str) -> Result<GpsReading, DecodeError> {
    let buf = BASE64.decode(payload_raw)?;
    payload::decode(&buf)
}

/// Build the SensorThings location update body.
fn location_update(name: &str, reading: &GpsReading) -> serde_json::Value {
    serde_json::json!({
        "name": name,
        "description": LOCATION_DESCRIPTION,
        "encodingType": "application/vnd.geo+json",
        "location": {
            "type": "Feature",
            "geometry": {
                "type": "Point",
                "coordinates": [reading.longitude, reading.latitude]
            }
        }
    })
}
