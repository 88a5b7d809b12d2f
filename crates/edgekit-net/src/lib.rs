//! Network helpers for edgekit
//!
//! - `http`: buffered request helpers over a shared reqwest client
//! - `mqtt`: connect/publish/subscribe over rumqttc
//! - `tedge`: alarms, events and measurements on thin-edge.io topics

pub mod error;
pub mod http;
pub mod mqtt;
pub mod tedge;

pub use error::{NetError, Result};
pub use http::{HttpClient, HttpResponse};
pub use mqtt::{topic_matches, MqttClient, QoS};
pub use tedge::{AlarmSeverity, TedgeMessage, TedgePublisher};
