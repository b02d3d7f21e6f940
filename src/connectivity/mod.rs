//! Connectivity supervisor.
//!
//! Keeps the network link and the broker session alive.  The telemetry
//! cycle calls [`ConnectivitySupervisor::ensure_ready`] at the top of every
//! iteration; it returns only once both layers are up (or a bounded retry
//! policy gives up).
//!
//! ```text
//!             link down                      session down
//!   ┌──────────────┐ ◀────────── ┌─────────────┐ ◀────────── ┌───────┐
//!   │ NetworkDown  │             │ SessionDown │             │ Ready │
//!   └──────────────┘ ──────────▶ └─────────────┘ ──────────▶ └───────┘
//!                     link up                 connect+subscribe
//! ```
//!
//! ## Retry semantics
//!
//! - Link: `begin()` once, then poll `is_up()` sleeping `link_poll_ms`
//!   between polls.  No attempt cap by default.
//! - Session: `connect()` + `subscribe(cmd)`; on failure sleep
//!   `session_retry_ms` and try again.  No attempt cap by default.  The
//!   command subscription is re-issued on every new session, including
//!   ones the broker client re-establishes by itself (seen as a change of
//!   [`TransportPort::session_epoch`]).
//! - If the link drops while the session is being retried, the supervisor
//!   falls back to the link step.
//!
//! The first time the link comes up after boot the output is forced Off.

pub mod retry;

use embedded_hal::delay::DelayNs;
use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::output::{OutputController, OutputState};
use crate::app::ports::{ActuatorPort, EventSink, LinkPort, TransportPort};
use crate::config::{ChannelName, DeviceConfig};
use crate::error::CommsError;

pub use retry::{Backoff, RetryPolicy};

/// Process-wide connectivity state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityState {
    /// No network link.
    NetworkDown,
    /// Link up, no broker session.
    SessionDown,
    /// Link up and session live with the command subscription in place.
    Ready,
}

/// Result of one pass of the session step.
enum SessionOutcome {
    Established,
    LinkLost,
}

pub struct ConnectivitySupervisor<L: LinkPort> {
    link: L,
    state: ConnectivityState,
    client_id: String,
    command_channel: ChannelName,
    link_policy: RetryPolicy,
    session_policy: RetryPolicy,
    /// Session epoch the command subscription was issued on.
    subscribed_epoch: Option<u32>,
    /// First-link safe reset already applied.
    safe_reset_done: bool,
    sessions_established: u32,
}

impl<L: LinkPort> ConnectivitySupervisor<L> {
    /// Supervisor with the default unlimited fixed-interval policies.
    pub fn new(link: L, config: &DeviceConfig) -> Self {
        Self::with_policies(
            link,
            config,
            RetryPolicy::forever_fixed(config.link_poll_ms),
            RetryPolicy::forever_fixed(config.session_retry_ms),
        )
    }

    pub fn with_policies(
        link: L,
        config: &DeviceConfig,
        link_policy: RetryPolicy,
        session_policy: RetryPolicy,
    ) -> Self {
        Self {
            link,
            state: ConnectivityState::NetworkDown,
            client_id: config.client_id.clone(),
            command_channel: config.channels().command,
            link_policy,
            session_policy,
            subscribed_epoch: None,
            safe_reset_done: false,
            sessions_established: 0,
        }
    }

    /// Block until link and session are both up.
    ///
    /// Returns immediately, without side effects, when already `Ready`.
    /// With the default policies this only returns `Ok`.
    pub fn ensure_ready(
        &mut self,
        transport: &mut impl TransportPort,
        output: &mut OutputController,
        hw: &mut impl ActuatorPort,
        delay: &mut impl DelayNs,
        sink: &mut impl EventSink,
    ) -> Result<(), CommsError> {
        if self.state == ConnectivityState::Ready
            && self.link.is_up()
            && transport.is_session_live()
            && self.subscription_current(transport)
        {
            return Ok(());
        }

        loop {
            if !self.link.is_up() {
                self.transition(ConnectivityState::NetworkDown, sink);
                self.bring_up_link(delay, sink)?;
            }

            if !self.safe_reset_done {
                output.set(OutputState::Off, hw);
                self.safe_reset_done = true;
                info!("Connectivity: first link, output forced Off");
                sink.emit(&AppEvent::OutputForcedOff);
            }

            if transport.is_session_live() && self.subscription_current(transport) {
                break;
            }
            if transport.is_session_live() && self.subscribed_epoch.is_some() {
                info!("Connectivity: broker session was re-established, subscription lost");
            }
            self.subscribed_epoch = None;
            self.transition(ConnectivityState::SessionDown, sink);

            match self.establish_session(transport, delay, sink)? {
                SessionOutcome::Established => break,
                SessionOutcome::LinkLost => {
                    warn!("Connectivity: link lost while connecting to broker");
                }
            }
        }

        self.transition(ConnectivityState::Ready, sink);
        Ok(())
    }

    fn bring_up_link(
        &mut self,
        delay: &mut impl DelayNs,
        sink: &mut impl EventSink,
    ) -> Result<(), CommsError> {
        info!("Connectivity: joining network");
        let mut begun = false;
        let mut polls: u32 = 0;

        loop {
            if !begun {
                match self.link.begin() {
                    Ok(()) => begun = true,
                    Err(e) => warn!("Connectivity: link start failed ({e})"),
                }
            }
            if self.link.is_up() {
                break;
            }
            polls = polls.saturating_add(1);
            match self.link_policy.delay_after(polls) {
                Some(ms) => delay.delay_ms(ms),
                None => {
                    warn!("Connectivity: link still down after {polls} polls, giving up");
                    return Err(CommsError::RetriesExhausted);
                }
            }
        }

        let ip = self.link.ip_address();
        match ip {
            Some([a, b, c, d]) => info!("Connectivity: link up after {polls} polls, ip={a}.{b}.{c}.{d}"),
            None => info!("Connectivity: link up after {polls} polls"),
        }
        sink.emit(&AppEvent::LinkUp(ip));
        self.transition(ConnectivityState::SessionDown, sink);
        Ok(())
    }

    fn establish_session(
        &mut self,
        transport: &mut impl TransportPort,
        delay: &mut impl DelayNs,
        sink: &mut impl EventSink,
    ) -> Result<SessionOutcome, CommsError> {
        let mut attempt: u32 = 0;
        loop {
            if !self.link.is_up() {
                return Ok(SessionOutcome::LinkLost);
            }
            attempt = attempt.saturating_add(1);
            info!("Connectivity: connecting to broker as '{}' (attempt {attempt})", self.client_id);

            let result = if transport.is_session_live() {
                Ok(())
            } else {
                transport.connect(&self.client_id)
            }
            .and_then(|()| transport.subscribe(&self.command_channel));

            match result {
                Ok(()) => {
                    self.subscribed_epoch = Some(transport.session_epoch());
                    self.sessions_established = self.sessions_established.wrapping_add(1);
                    info!("Connectivity: broker session up, subscribed to '{}'", self.command_channel);
                    return Ok(SessionOutcome::Established);
                }
                Err(e) => {
                    sink.emit(&AppEvent::SessionAttemptFailed { attempt });
                    match self.session_policy.delay_after(attempt) {
                        Some(ms) => {
                            warn!("Connectivity: broker session failed ({e}), retrying in {ms}ms");
                            delay.delay_ms(ms);
                        }
                        None => {
                            warn!("Connectivity: broker session failed ({e}), giving up after {attempt} attempts");
                            return Err(CommsError::RetriesExhausted);
                        }
                    }
                }
            }
        }
    }

    /// The command subscription was made on the session that is live now.
    fn subscription_current(&self, transport: &impl TransportPort) -> bool {
        self.subscribed_epoch == Some(transport.session_epoch())
    }

    fn transition(&mut self, to: ConnectivityState, sink: &mut impl EventSink) {
        if self.state != to {
            let from = self.state;
            self.state = to;
            info!("Connectivity: {:?} -> {:?}", from, to);
            sink.emit(&AppEvent::ConnectivityChanged { from, to });
        }
    }

    pub fn state(&self) -> ConnectivityState {
        self.state
    }

    /// Broker sessions established since boot.
    pub fn sessions_established(&self) -> u32 {
        self.sessions_established
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }
}
