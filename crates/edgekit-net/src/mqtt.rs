//! Thin async MQTT client over rumqttc.
//!
//! The event loop runs on its own tokio task. `connect` resolves once the
//! broker has accepted the session, and incoming publishes are dispatched to
//! the handlers registered through `subscribe`. `subscribe` and QoS 1/2
//! `publish` wait for the broker's SUBACK, PUBACK or PUBCOMP. There is no
//! reconnection: once the connection drops the event loop stops.

use crate::error::{NetError, Result};
use edgekit_core::MqttConfig;
use parking_lot::{Mutex, RwLock};
use rumqttc::{
    AsyncClient, ConnectReturnCode, ConnectionError, Event, EventLoop, MqttOptions, Outgoing,
    Packet, SubscribeReasonCode,
};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

pub use rumqttc::QoS;

const DEFAULT_PORT: u16 = 1883;
// rumqttc rejects keep-alive intervals below five seconds.
const MIN_KEEP_ALIVE_SECS: u64 = 5;

pub type MessageHandler = Arc<dyn Fn(&str, &[u8]) + Send + Sync>;

struct Subscription {
    filter: String,
    handler: MessageHandler,
}

type Subscriptions = Arc<RwLock<Vec<Subscription>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ack {
    Accepted,
    Rejected,
}

type AckSender = oneshot::Sender<Ack>;

/// Callers waiting on broker acknowledgements.
///
/// Packet ids are assigned inside the event loop and only surface through
/// `Outgoing::Publish` / `Outgoing::Subscribe`, which follow request order.
/// Waiters therefore queue in request order and move into the id maps once
/// their packet has been written.
#[derive(Default)]
struct PendingAcks {
    // One entry per publish request; `None` for QoS 0.
    queued_publishes: VecDeque<Option<AckSender>>,
    queued_subscribes: VecDeque<AckSender>,
    publishes: HashMap<u16, AckSender>,
    subscribes: HashMap<u16, AckSender>,
}

impl PendingAcks {
    fn publish_sent(&mut self, pkid: u16) {
        if let Some(Some(tx)) = self.queued_publishes.pop_front() {
            self.publishes.insert(pkid, tx);
        }
    }

    fn subscribe_sent(&mut self, pkid: u16) {
        if let Some(tx) = self.queued_subscribes.pop_front() {
            self.subscribes.insert(pkid, tx);
        }
    }

    fn resolve_publish(&mut self, pkid: u16) {
        if let Some(tx) = self.publishes.remove(&pkid) {
            let _ = tx.send(Ack::Accepted);
        }
    }

    fn resolve_subscribe(&mut self, pkid: u16, accepted: bool) {
        if let Some(tx) = self.subscribes.remove(&pkid) {
            let _ = tx.send(if accepted { Ack::Accepted } else { Ack::Rejected });
        }
    }
}

type Acks = Arc<Mutex<PendingAcks>>;

/// Connected MQTT client.
pub struct MqttClient {
    client: AsyncClient,
    subscriptions: Subscriptions,
    acks: Acks,
    // Held while queueing a waiter and sending its request so both orders agree.
    request_order: tokio::sync::Mutex<()>,
    event_loop: JoinHandle<()>,
    disconnect_timeout: Duration,
    ack_timeout: Duration,
}

impl MqttClient {
    /// Connect and wait for the broker's CONNACK.
    pub async fn connect(config: &MqttConfig) -> Result<Self> {
        let (host, port) = parse_broker_url(&config.broker_url)?;

        let mut options = MqttOptions::new(config.client_id.clone(), host.clone(), port);
        options.set_clean_session(config.clean_session);
        options.set_keep_alive(Duration::from_secs(
            config.keep_alive_secs.max(MIN_KEEP_ALIVE_SECS),
        ));

        let (client, event_loop) = AsyncClient::new(options, config.channel_capacity.max(1));
        let subscriptions: Subscriptions = Arc::new(RwLock::new(Vec::new()));
        let acks: Acks = Arc::new(Mutex::new(PendingAcks::default()));
        let (connack_tx, connack_rx) = oneshot::channel();
        let task = tokio::spawn(run_event_loop(
            event_loop,
            subscriptions.clone(),
            acks.clone(),
            connack_tx,
        ));

        let timeout = Duration::from_secs(config.connect_timeout_secs);
        match tokio::time::timeout(timeout, connack_rx).await {
            Ok(Ok(Ok(()))) => {
                info!("Connected to MQTT broker {}:{} as {}", host, port, config.client_id);
                Ok(Self {
                    client,
                    subscriptions,
                    acks,
                    request_order: tokio::sync::Mutex::new(()),
                    event_loop: task,
                    disconnect_timeout: Duration::from_millis(config.disconnect_timeout_ms),
                    ack_timeout: Duration::from_secs(config.ack_timeout_secs),
                })
            }
            Ok(Ok(Err(e))) => Err(e),
            Ok(Err(_)) => Err(NetError::ConnectionRefused(
                "event loop stopped before CONNACK".to_string(),
            )),
            Err(_) => {
                task.abort();
                Err(NetError::ConnectTimeout(timeout))
            }
        }
    }

    /// Publish a message.
    ///
    /// QoS 0 returns once the event loop has taken the request. QoS 1 waits for
    /// PUBACK and QoS 2 for PUBCOMP, up to the configured ack timeout.
    pub async fn publish(
        &self,
        topic: &str,
        payload: impl Into<Vec<u8>>,
        qos: QoS,
        retain: bool,
    ) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        let waiter = (qos != QoS::AtMostOnce).then_some(tx);
        {
            let _order = self.request_order.lock().await;
            self.acks.lock().queued_publishes.push_back(waiter);
            if let Err(e) = self.client.publish(topic, qos, retain, payload).await {
                self.acks.lock().queued_publishes.pop_back();
                return Err(e.into());
            }
        }

        match qos {
            QoS::AtMostOnce => {}
            QoS::AtLeastOnce => {
                self.wait_for_ack(rx, "PUBACK").await?;
            }
            QoS::ExactlyOnce => {
                self.wait_for_ack(rx, "PUBCOMP").await?;
            }
        }
        debug!("Published to {}", topic);
        Ok(())
    }

    /// Register `callback` for messages matching `filter`, send SUBSCRIBE and
    /// wait for SUBACK.
    ///
    /// The callback is removed again if the broker rejects the filter or never
    /// answers.
    pub async fn subscribe<F>(&self, filter: &str, qos: QoS, callback: F) -> Result<()>
    where
        F: Fn(&str, &[u8]) + Send + Sync + 'static,
    {
        let handler: MessageHandler = Arc::new(callback);
        self.subscriptions.write().push(Subscription {
            filter: filter.to_string(),
            handler: handler.clone(),
        });

        let (tx, rx) = oneshot::channel();
        let sent = {
            let _order = self.request_order.lock().await;
            self.acks.lock().queued_subscribes.push_back(tx);
            let sent = self.client.subscribe(filter, qos).await;
            if sent.is_err() {
                self.acks.lock().queued_subscribes.pop_back();
            }
            sent
        };

        let outcome: Result<()> = match sent {
            Err(e) => Err(e.into()),
            Ok(()) => match self.wait_for_ack(rx, "SUBACK").await {
                Ok(Ack::Accepted) => Ok(()),
                Ok(Ack::Rejected) => Err(NetError::SubscriptionRejected(filter.to_string())),
                Err(e) => Err(e),
            },
        };
        if let Err(e) = outcome {
            self.subscriptions
                .write()
                .retain(|s| !Arc::ptr_eq(&s.handler, &handler));
            return Err(e);
        }

        debug!("Subscribed to {}", filter);
        Ok(())
    }

    async fn wait_for_ack(&self, rx: oneshot::Receiver<Ack>, packet: &'static str) -> Result<Ack> {
        match tokio::time::timeout(self.ack_timeout, rx).await {
            Ok(Ok(ack)) => Ok(ack),
            Ok(Err(_)) => Err(NetError::ConnectionClosed),
            Err(_) => Err(NetError::AckTimeout {
                packet,
                timeout: self.ack_timeout,
            }),
        }
    }

    /// Send DISCONNECT and stop the event loop.
    pub async fn disconnect(mut self) {
        if let Err(e) = self.client.disconnect().await {
            warn!("Failed to request MQTT disconnect: {}", e);
        }
        if tokio::time::timeout(self.disconnect_timeout, &mut self.event_loop)
            .await
            .is_err()
        {
            self.event_loop.abort();
        }
        info!("Disconnected from MQTT broker");
    }
}

async fn run_event_loop(
    mut event_loop: EventLoop,
    subscriptions: Subscriptions,
    acks: Acks,
    connack: oneshot::Sender<Result<()>>,
) {
    let mut connack = Some(connack);
    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                let result = if ack.code == ConnectReturnCode::Success {
                    Ok(())
                } else {
                    Err(NetError::ConnectionRefused(format!("{:?}", ack.code)))
                };
                let refused = result.is_err();
                if let Some(tx) = connack.take() {
                    let _ = tx.send(result);
                }
                if refused {
                    break;
                }
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                dispatch(&subscriptions, &publish.topic, &publish.payload);
            }
            Ok(Event::Incoming(Packet::PubAck(ack))) => acks.lock().resolve_publish(ack.pkid),
            Ok(Event::Incoming(Packet::PubComp(comp))) => acks.lock().resolve_publish(comp.pkid),
            Ok(Event::Incoming(Packet::SubAck(ack))) => {
                let accepted = ack
                    .return_codes
                    .iter()
                    .all(|code| !matches!(code, SubscribeReasonCode::Failure));
                if !accepted {
                    warn!("Broker rejected subscription (packet id {})", ack.pkid);
                }
                acks.lock().resolve_subscribe(ack.pkid, accepted);
            }
            Ok(Event::Outgoing(Outgoing::Publish(pkid))) => acks.lock().publish_sent(pkid),
            Ok(Event::Outgoing(Outgoing::Subscribe(pkid))) => acks.lock().subscribe_sent(pkid),
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                debug!("MQTT event loop finished after DISCONNECT");
                break;
            }
            Ok(_) => {}
            Err(ConnectionError::RequestsDone) => break,
            Err(e) => {
                match connack.take() {
                    Some(tx) => {
                        let _ = tx.send(Err(NetError::ConnectionRefused(e.to_string())));
                    }
                    None => warn!("MQTT connection lost: {}", e),
                }
                break;
            }
        }
    }

    // Dropping the senders wakes every remaining waiter with `ConnectionClosed`.
    *acks.lock() = PendingAcks::default();
}

fn dispatch(subscriptions: &Subscriptions, topic: &str, payload: &[u8]) {
    let handlers: Vec<MessageHandler> = subscriptions
        .read()
        .iter()
        .filter(|s| topic_matches(&s.filter, topic))
        .map(|s| s.handler.clone())
        .collect();
    if handlers.is_empty() {
        debug!("No handler for message on {}", topic);
    }
    for handler in handlers {
        handler(topic, payload);
    }
}

/// MQTT topic filter matching with `+` and `#` wildcards.
///
/// Wildcards in the first level never match topics starting with `$`.
pub fn topic_matches(filter: &str, topic: &str) -> bool {
    if topic.starts_with('$') && (filter.starts_with('+') || filter.starts_with('#')) {
        return false;
    }
    let mut levels = filter.split('/');
    let mut topic_levels = topic.split('/');
    loop {
        match (levels.next(), topic_levels.next()) {
            (Some("#"), _) => return true,
            (Some("+"), Some(_)) => {}
            (Some(f), Some(t)) if f == t => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}

/// Accepts `tcp://host:port`, `mqtt://host:port` or bare `host:port`.
pub fn parse_broker_url(broker_url: &str) -> Result<(String, u16)> {
    let with_scheme = if broker_url.contains("://") {
        broker_url.to_string()
    } else {
        format!("tcp://{}", broker_url)
    };
    let url = Url::parse(&with_scheme)
        .map_err(|e| NetError::InvalidBrokerUrl(format!("{}: {}", broker_url, e)))?;

    match url.scheme() {
        "tcp" | "mqtt" => {}
        other => {
            return Err(NetError::InvalidBrokerUrl(format!(
                "{}: unsupported scheme {}",
                broker_url, other
            )))
        }
    }
    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| NetError::InvalidBrokerUrl(format!("{}: missing host", broker_url)))?;

    Ok((host.to_string(), url.port().unwrap_or(DEFAULT_PORT)))
}
