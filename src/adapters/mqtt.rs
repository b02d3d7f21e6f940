//! MQTT broker session adapter.
//!
//! Implements [`TransportPort`].  Inbound messages are delivered by the
//! client on its own task; they are copied into a bounded
//! [`InboundQueue`] and only handed to the domain inside
//! [`poll_incoming`](TransportPort::poll_incoming), on the cycle task.
//!
//! ```text
//!  esp-mqtt task ──push──▶ InboundQueue (Mutex<Deque>) ──drain──▶ poll_incoming ──▶ CommandProcessor
//! ```
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `esp_idf_svc::mqtt::client::EspMqttClient`.
//! - **all other targets**: an in-memory broker double with scripted
//!   failures, recorded publishes and injectable inbound messages.

use core::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use heapless::{Deque, String as HString, Vec as HVec};
use log::{info, warn};

use crate::app::ports::TransportPort;
use crate::config::CHANNEL_CAP;
use crate::error::CommsError;

#[cfg(target_os = "espidf")]
use core::sync::atomic::AtomicBool;
#[cfg(target_os = "espidf")]
use esp_idf_hal::delay::FreeRtos;
#[cfg(target_os = "espidf")]
use esp_idf_svc::mqtt::client::{EspMqttClient, EventPayload, MqttClientConfiguration, QoS};

/// Pending inbound messages kept between two drains.
pub const INBOUND_CAP: usize = 16;
/// Longest inbound payload kept; longer payloads are truncated.
pub const PAYLOAD_CAP: usize = 64;

/// One buffered inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub channel: HString<CHANNEL_CAP>,
    pub payload: HVec<u8, PAYLOAD_CAP>,
}

impl InboundMessage {
    pub fn new(channel: &str, payload: &[u8]) -> Self {
        let mut c = HString::new();
        for ch in channel.chars() {
            if c.push(ch).is_err() {
                break;
            }
        }
        let keep = payload.len().min(PAYLOAD_CAP);
        let mut p = HVec::new();
        let _ = p.extend_from_slice(&payload[..keep]);
        Self { channel: c, payload: p }
    }
}

// ───────────────────────────────────────────────────────────────
// Inbound queue
// ───────────────────────────────────────────────────────────────

/// Bounded FIFO between the client task and the cycle task.
/// When full, new messages are dropped and counted.
pub struct InboundQueue {
    inner: Mutex<Deque<InboundMessage, INBOUND_CAP>>,
    dropped: AtomicU32,
}

impl Default for InboundQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl InboundQueue {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Deque::new()),
            dropped: AtomicU32::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Deque<InboundMessage, INBOUND_CAP>> {
        // A panicking producer cannot leave the deque half-written.
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Returns `false` when the message was dropped.
    pub fn push(&self, channel: &str, payload: &[u8]) -> bool {
        if payload.len() > PAYLOAD_CAP {
            warn!("MQTT: {}-byte payload on '{}' truncated", payload.len(), channel);
        }
        let msg = InboundMessage::new(channel, payload);
        if self.lock().push_back(msg).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            warn!("MQTT: inbound queue full, message on '{}' dropped", channel);
            return false;
        }
        true
    }

    /// Take everything queued so far, oldest first.  The lock is released
    /// before the caller handles the batch.
    pub fn take_all(&self) -> Deque<InboundMessage, INBOUND_CAP> {
        core::mem::replace(&mut *self.lock(), Deque::new())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }
}

fn dispatch(queue: &InboundQueue, handler: &mut dyn FnMut(&str, &[u8])) {
    let mut batch = queue.take_all();
    while let Some(msg) = batch.pop_front() {
        handler(&msg.channel, &msg.payload);
    }
}

// ───────────────────────────────────────────────────────────────
// MQTT transport (ESP-IDF)
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
#[derive(Default)]
struct Shared {
    connected: AtomicBool,
    epoch: AtomicU32,
    inbound: InboundQueue,
}

#[cfg(target_os = "espidf")]
pub struct MqttTransport {
    broker_url: String,
    session_wait_ms: u32,
    client: Option<EspMqttClient<'static>>,
    shared: Arc<Shared>,
}

#[cfg(target_os = "espidf")]
impl MqttTransport {
    const WAIT_STEP_MS: u32 = 50;

    pub fn new(broker_url: String, session_wait_ms: u32) -> Self {
        Self {
            broker_url,
            session_wait_ms,
            client: None,
            shared: Arc::new(Shared::default()),
        }
    }

    fn create_client(&mut self, client_id: &str) -> Result<(), CommsError> {
        let conf = MqttClientConfiguration {
            client_id: Some(client_id),
            ..Default::default()
        };
        let shared = Arc::clone(&self.shared);
        let client = EspMqttClient::new_cb(&self.broker_url, &conf, move |event| {
            match event.payload() {
                EventPayload::Connected(_) => {
                    // Epoch first: a reader that sees `connected` also sees the new session.
                    shared.epoch.fetch_add(1, Ordering::AcqRel);
                    shared.connected.store(true, Ordering::Release);
                }
                EventPayload::Disconnected => shared.connected.store(false, Ordering::Release),
                EventPayload::Received { topic, data, .. } => {
                    shared.inbound.push(topic.unwrap_or(""), data);
                }
                _ => {}
            }
        })
        .map_err(|e| {
            warn!("MQTT: client init failed: {e}");
            CommsError::MqttConnectFailed
        })?;
        self.client = Some(client);
        Ok(())
    }

    /// Messages dropped because the inbound queue was full.
    pub fn dropped(&self) -> u32 {
        self.shared.inbound.dropped()
    }
}

#[cfg(target_os = "espidf")]
impl TransportPort for MqttTransport {
    fn connect(&mut self, client_id: &str) -> Result<(), CommsError> {
        // The IDF client reconnects by itself once created; later calls
        // only wait for it.
        if self.client.is_none() {
            info!("MQTT: connecting to {} as '{}'", self.broker_url, client_id);
            self.create_client(client_id)?;
        }
        let mut waited = 0;
        while !self.shared.connected.load(Ordering::Acquire) {
            if waited >= self.session_wait_ms {
                return Err(CommsError::MqttConnectFailed);
            }
            FreeRtos::delay_ms(Self::WAIT_STEP_MS);
            waited += Self::WAIT_STEP_MS;
        }
        info!("MQTT: session up");
        Ok(())
    }

    fn is_session_live(&self) -> bool {
        self.client.is_some() && self.shared.connected.load(Ordering::Acquire)
    }

    fn session_epoch(&self) -> u32 {
        self.shared.epoch.load(Ordering::Acquire)
    }

    fn subscribe(&mut self, channel: &str) -> Result<(), CommsError> {
        let client = self.client.as_mut().ok_or(CommsError::MqttNotConnected)?;
        client
            .subscribe(channel, QoS::AtMostOnce)
            .map(|_| ())
            .map_err(|e| {
                warn!("MQTT: subscribe '{channel}' failed: {e}");
                CommsError::MqttSubscribeFailed
            })
    }

    fn publish(&mut self, channel: &str, payload: &[u8]) -> Result<(), CommsError> {
        if !self.shared.connected.load(Ordering::Acquire) {
            return Err(CommsError::MqttNotConnected);
        }
        let client = self.client.as_mut().ok_or(CommsError::MqttNotConnected)?;
        client
            .publish(channel, QoS::AtMostOnce, false, payload)
            .map(|_| ())
            .map_err(|_| CommsError::MqttPublishFailed)
    }

    fn poll_incoming(&mut self, handler: &mut dyn FnMut(&str, &[u8])) {
        dispatch(&self.shared.inbound, handler);
    }
}

// ───────────────────────────────────────────────────────────────
// MQTT transport (host simulation)
// ───────────────────────────────────────────────────────────────

/// In-memory broker double.
#[cfg(not(target_os = "espidf"))]
#[derive(Default)]
pub struct MqttTransport {
    live: bool,
    epoch: u32,
    connects: u32,
    fail_connects: u32,
    fail_subscribes: u32,
    fail_publishes: bool,
    client_id: String,
    subscriptions: Vec<String>,
    published: Vec<(String, Vec<u8>)>,
    inbound: Arc<InboundQueue>,
}

#[cfg(not(target_os = "espidf"))]
impl MqttTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` connect attempts.
    pub fn sim_fail_connects(&mut self, n: u32) {
        self.fail_connects = n;
    }

    /// Fail the next `n` subscribe calls.
    pub fn sim_fail_subscribes(&mut self, n: u32) {
        self.fail_subscribes = n;
    }

    pub fn sim_fail_publishes(&mut self, fail: bool) {
        self.fail_publishes = fail;
    }

    /// Broker-side session loss; subscriptions go with it.
    pub fn sim_drop_session(&mut self) {
        info!("MQTT(sim): session dropped");
        self.live = false;
        self.subscriptions.clear();
    }

    /// Session lost and re-established by the client without a
    /// `connect()` call; the broker forgets the subscriptions.
    pub fn sim_auto_reconnect(&mut self) {
        info!("MQTT(sim): client reconnected on its own");
        self.subscriptions.clear();
        self.epoch = self.epoch.wrapping_add(1);
        self.live = true;
    }

    /// Queue an inbound message as if the broker delivered it.
    pub fn inject(&self, channel: &str, payload: &[u8]) -> bool {
        self.inbound.push(channel, payload)
    }

    /// Producer handle for feeding the queue from another thread.
    pub fn inbound(&self) -> Arc<InboundQueue> {
        Arc::clone(&self.inbound)
    }

    pub fn published(&self) -> &[(String, Vec<u8>)] {
        &self.published
    }

    pub fn take_published(&mut self) -> Vec<(String, Vec<u8>)> {
        core::mem::take(&mut self.published)
    }

    pub fn subscriptions(&self) -> &[String] {
        &self.subscriptions
    }

    pub fn connects(&self) -> u32 {
        self.connects
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }
}

#[cfg(not(target_os = "espidf"))]
impl TransportPort for MqttTransport {
    fn connect(&mut self, client_id: &str) -> Result<(), CommsError> {
        self.connects += 1;
        if self.fail_connects > 0 {
            self.fail_connects -= 1;
            return Err(CommsError::MqttConnectFailed);
        }
        client_id.clone_into(&mut self.client_id);
        self.epoch = self.epoch.wrapping_add(1);
        self.live = true;
        info!("MQTT(sim): session up as '{}'", client_id);
        Ok(())
    }

    fn is_session_live(&self) -> bool {
        self.live
    }

    fn session_epoch(&self) -> u32 {
        self.epoch
    }

    fn subscribe(&mut self, channel: &str) -> Result<(), CommsError> {
        if !self.live {
            return Err(CommsError::MqttNotConnected);
        }
        if self.fail_subscribes > 0 {
            self.fail_subscribes -= 1;
            return Err(CommsError::MqttSubscribeFailed);
        }
        if !self.subscriptions.iter().any(|s| s == channel) {
            self.subscriptions.push(channel.to_owned());
        }
        Ok(())
    }

    fn publish(&mut self, channel: &str, payload: &[u8]) -> Result<(), CommsError> {
        if !self.live {
            return Err(CommsError::MqttNotConnected);
        }
        if self.fail_publishes {
            return Err(CommsError::MqttPublishFailed);
        }
        self.published.push((channel.to_owned(), payload.to_vec()));
        Ok(())
    }

    fn poll_incoming(&mut self, handler: &mut dyn FnMut(&str, &[u8])) {
        dispatch(&self.inbound, handler);
    }
}
