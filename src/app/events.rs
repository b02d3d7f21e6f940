//! Outbound application events.
//!
//! The telemetry cycle, connectivity supervisor and command processor emit
//! these through the [`EventSink`](super::ports::EventSink) port.  Adapters
//! on the other side decide what to do with them.

use crate::connectivity::ConnectivityState;
use crate::display::AlertFlags;

use super::commands::Command;
use super::output::OutputState;

/// Structured events emitted by the application core.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// The node finished bootstrap and is entering the cycle loop.
    Started,

    /// The connectivity state machine moved.
    ConnectivityChanged {
        from: ConnectivityState,
        to: ConnectivityState,
    },

    /// The network link came up (address when known).
    LinkUp(Option<[u8; 4]>),

    /// The first-link safe reset drove the output Off.
    OutputForcedOff,

    /// A broker session attempt failed; `attempt` counts from 1.
    SessionAttemptFailed { attempt: u32 },

    /// A matched inbound command was applied.
    CommandApplied { command: Command, state: OutputState },

    /// An inbound payload matched neither command.
    CommandIgnored,

    /// A publish was not delivered; not retried this cycle.
    PublishFailed { channel: heapless::String<64> },

    /// One full cycle finished.
    CycleCompleted(CycleReport),
}

/// Summary of one cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CycleReport {
    /// 1-based cycle number since boot.
    pub iteration: u64,
    /// Whether connectivity was Ready when publishing started.
    pub ready: bool,
    pub publishes_attempted: u8,
    pub publishes_failed: u8,
    pub commands_applied: u8,
    pub commands_ignored: u8,
    pub output: OutputState,
    pub alerts: AlertFlags,
}
