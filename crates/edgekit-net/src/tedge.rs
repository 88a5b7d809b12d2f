//! Publishing alarms, events and measurements on thin-edge.io topics.

use crate::error::Result;
use crate::mqtt::{MqttClient, QoS};
use chrono::{DateTime, SecondsFormat, Utc};
use edgekit_concurrent::SafeQueue;
use edgekit_core::TedgeConfig;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value as JsonValue};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlarmSeverity {
    Critical,
    Major,
    Minor,
    Warning,
}

impl AlarmSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlarmSeverity::Critical => "critical",
            AlarmSeverity::Major => "major",
            AlarmSeverity::Minor => "minor",
            AlarmSeverity::Warning => "warning",
        }
    }
}

impl fmt::Display for AlarmSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message for a thin-edge device, ready to be published or queued.
#[derive(Debug, Clone, PartialEq)]
pub enum TedgeMessage {
    Alarm {
        alarm_type: String,
        severity: AlarmSeverity,
        text: String,
    },
    Event {
        event_type: String,
        text: String,
    },
    Measurement {
        group: String,
        values: BTreeMap<String, f64>,
    },
}

impl TedgeMessage {
    pub fn topic(&self, device_id: &str) -> String {
        match self {
            TedgeMessage::Alarm { alarm_type, .. } => {
                format!("te/device/{}/alarm/{}", device_id, alarm_type)
            }
            TedgeMessage::Event { event_type, .. } => {
                format!("te/device/{}/event/{}", device_id, event_type)
            }
            TedgeMessage::Measurement { .. } => format!("te/device/{}/measurements", device_id),
        }
    }

    pub fn payload(&self) -> JsonValue {
        self.payload_at(Utc::now())
    }

    pub fn payload_at(&self, time: DateTime<Utc>) -> JsonValue {
        let time = time.to_rfc3339_opts(SecondsFormat::Secs, true);
        match self {
            TedgeMessage::Alarm { severity, text, .. } => json!({
                "text": text,
                "severity": severity,
                "time": time,
            }),
            TedgeMessage::Event { text, .. } => json!({
                "text": text,
                "time": time,
            }),
            TedgeMessage::Measurement { group, values } => {
                let series: Map<String, JsonValue> = values
                    .iter()
                    .map(|(name, value)| (name.clone(), json!({ "value": value })))
                    .collect();
                let mut payload = Map::new();
                payload.insert("time".to_string(), JsonValue::String(time));
                payload.insert(group.clone(), JsonValue::Object(series));
                JsonValue::Object(payload)
            }
        }
    }
}

/// Publisher bound to one device on the local thin-edge broker.
pub struct TedgePublisher {
    client: MqttClient,
    device_id: String,
}

impl TedgePublisher {
    pub async fn connect(config: &TedgeConfig) -> Result<Self> {
        let client = MqttClient::connect(&config.mqtt()).await?;
        Ok(Self {
            client,
            device_id: config.device_id.clone(),
        })
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub async fn publish_alarm(
        &self,
        alarm_type: &str,
        severity: AlarmSeverity,
        text: &str,
    ) -> Result<()> {
        self.publish_message(&TedgeMessage::Alarm {
            alarm_type: alarm_type.to_string(),
            severity,
            text: text.to_string(),
        })
        .await
    }

    pub async fn publish_event(&self, event_type: &str, text: &str) -> Result<()> {
        self.publish_message(&TedgeMessage::Event {
            event_type: event_type.to_string(),
            text: text.to_string(),
        })
        .await
    }

    pub async fn publish_measurement(
        &self,
        group: &str,
        measurements: &BTreeMap<String, f64>,
    ) -> Result<()> {
        self.publish_message(&TedgeMessage::Measurement {
            group: group.to_string(),
            values: measurements.clone(),
        })
        .await
    }

    pub async fn publish_message(&self, message: &TedgeMessage) -> Result<()> {
        let topic = message.topic(&self.device_id);
        let payload = serde_json::to_vec(&message.payload())?;
        self.client
            .publish(&topic, payload, QoS::AtMostOnce, false)
            .await
    }

    /// Publish queued messages until the queue reports empty.
    ///
    /// Returns the number published. On error the failing message is lost and
    /// the rest stay queued.
    pub async fn flush(&self, queue: &SafeQueue<TedgeMessage>) -> Result<usize> {
        let mut published = 0;
        while let Ok(message) = queue.dequeue() {
            self.publish_message(&message).await?;
            published += 1;
        }
        debug!("Flushed {} queued tedge messages", published);
        Ok(published)
    }

    pub async fn disconnect(self) {
        self.client.disconnect().await
    }
}
