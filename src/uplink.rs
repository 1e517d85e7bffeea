//! TTN MQTT ingestion loop.
//!
//! Owns the subscribe-side connection for the process lifetime. The MQTT
//! client's transport internals (TLS, reconnect backoff) stay inside
//! rumqttc; this module only subscribes to the uplink topic, parses the
//! TTN uplink document, and hands each message to the forwarder.

use crate::config::{Settings, TtnConfig};
use crate::error::BridgeResult;
use crate::forwarder::UplinkForwarder;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Topic filter for TTN v2 uplinks (`<app_id>/devices/<dev_id>/up`).
const UPLINK_TOPIC: &str = "+/devices/+/up";

/// Delay before polling again after a connection error.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// One inbound uplink, alive for the duration of a single handler call.
#[derive(Debug, Clone)]
pub struct UplinkMessage {
    /// TTN device id.
    pub device_id: String,
    /// Gateway arrival time, when the metadata carried one.
    pub time: Option<String>,
    /// Raw base64-encoded binary payload.
    pub payload_raw: String,
    /// Full message text as received, for the diagnostic journal.
    pub raw: String,
}

/// TTN v2 uplink document, as published on the uplink topic.
#[derive(Debug, Deserialize)]
struct TtnUplink {
    dev_id: String,
    payload_raw: String,
    #[serde(default)]
    metadata: Option<TtnMetadata>,
}

#[derive(Debug, Deserialize)]
struct TtnMetadata {
    #[serde(default)]
    time: Option<String>,
}

/// Subscribe-side MQTT connection to the TTN broker.
pub struct UplinkSource {
    client: AsyncClient,
    eventloop: EventLoop,
}

impl UplinkSource {
    /// Build the MQTT client for the TTN broker. The application id and
    /// access key are the broker credentials.
    pub fn new(settings: &Settings, ttn: &TtnConfig) -> Self {
        let client_id = format!("bridge-{}", ttn.app_id);
        let mut options = MqttOptions::new(client_id, &settings.mqtt_host, settings.mqtt_port);
        options.set_credentials(&ttn.app_id, &ttn.app_key);
        options.set_keep_alive(Duration::from_secs(30));

        let (client, eventloop) = AsyncClient::new(options, 16);
        info!(
            host = %settings.mqtt_host,
            port = settings.mqtt_port,
            app_id = %ttn.app_id,
            "uplink source configured"
        );

        Self { client, eventloop }
    }

    /// Drive the event loop until the process is terminated, handing every
    /// uplink to the forwarder. Per-message failures never surface here;
    /// connection errors are logged and retried.
    pub async fn run(mut self, forwarder: Arc<UplinkForwarder>) -> BridgeResult<()> {
        loop {
            match self.eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    info!(topic = UPLINK_TOPIC, "connected to broker, subscribing");
                    // Subscriptions do not survive a reconnect, so renew
                    // on every ConnAck.
                    self.client.subscribe(UPLINK_TOPIC, QoS::AtMostOnce).await?;
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    if let Some(message) = parse_uplink(&publish.topic, &publish.payload) {
                        forwarder.handle(&message).await;
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, "MQTT connection error, retrying");
                    tokio::time::sleep(RECONNECT_DELAY).await;
                }
            }
        }
    }
}

/// Parse one published uplink. Malformed messages are logged and skipped.
fn parse_uplink(topic: &str, payload: &[u8]) -> Option<UplinkMessage> {
    let text = match std::str::from_utf8(payload) {
        Ok(text) => text,
        Err(e) => {
            warn!(topic = %topic, error = %e, "non-UTF-8 uplink, skipping");
            return None;
        }
    };

    match serde_json::from_str::<TtnUplink>(text) {
        Ok(uplink) => Some(UplinkMessage {
            device_id: uplink.dev_id,
            time: uplink.metadata.and_then(|m| m.time),
            payload_raw: uplink.payload_raw,
            raw: text.to_string(),
        }),
        Err(e) => {
            warn!(topic = %topic, error = %e, "malformed uplink document, skipping");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ttn_uplink_document() {
        let doc = r#"{
            "app_id": "trackers",
            "dev_id": "tracker-1",
            "payload_raw": "AAAACgAAAAUAZAc=",
            "metadata": { "time": "2019-05-01T12:00:00.123Z", "frequency": 868.1 }
        }"#;

        let message = parse_uplink("trackers/devices/tracker-1/up", doc.as_bytes()).unwrap();
        assert_eq!(message.device_id, "tracker-1");
        assert_eq!(message.payload_raw, "AAAACgAAAAUAZAc=");
        assert_eq!(message.time.as_deref(), Some("2019-05-01T12:00:00.123Z"));
        assert_eq!(message.raw, doc);
    }

    #[test]
    fn missing_metadata_is_tolerated() {
        let doc = r#"{ "dev_id": "tracker-1", "payload_raw": "AAAA" }"#;
        let message = parse_uplink("trackers/devices/tracker-1/up", doc.as_bytes()).unwrap();
        assert!(message.time.is_none());
    }

    #[test]
    fn malformed_document_is_skipped() {
        assert!(parse_uplink("t/devices/d/up", b"{ not json").is_none());
        assert!(parse_uplink("t/devices/d/up", br#"{"dev_id": "d"}"#).is_none());
    }

    #[test]
    fn non_utf8_payload_is_skipped() {
        assert!(parse_uplink("t/devices/d/up", &[0xff, 0xfe, 0x00]).is_none());
    }
}
