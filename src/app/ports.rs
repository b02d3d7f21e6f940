//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ TelemetryCycle (domain)
//! ```
//!
//! Driven adapters (Wi-Fi, broker client, ADC/DHT readers, the output pin,
//! the TFT, event sinks) implement these traits.  The
//! [`TelemetryCycle`](super::service::TelemetryCycle) and the
//! [`ConnectivitySupervisor`](crate::connectivity::ConnectivitySupervisor)
//! consume them via generics, so the domain core never touches hardware
//! directly.

use crate::error::CommsError;
use crate::sensors::ClimateReading;

// ───────────────────────────────────────────────────────────────
// Link port (network interface)
// ───────────────────────────────────────────────────────────────

/// The network link underneath the broker session (Wi-Fi station).
pub trait LinkPort {
    /// Start (or restart) joining the network.  Returns as soon as the
    /// request is issued; completion is observed through [`is_up`](Self::is_up).
    fn begin(&mut self) -> Result<(), CommsError>;

    /// Whether the link is associated and has an address.
    fn is_up(&self) -> bool;

    /// IPv4 address as dotted quad, when the link exposes one.
    fn ip_address(&self) -> Option<[u8; 4]> {
        None
    }
}

// ───────────────────────────────────────────────────────────────
// Transport port (broker session)
// ───────────────────────────────────────────────────────────────

/// Broker session: connect / publish / subscribe / poll.
pub trait TransportPort {
    /// Attempt to establish a session under `client_id`.
    fn connect(&mut self, client_id: &str) -> Result<(), CommsError>;

    /// Whether the broker session is currently live.
    fn is_session_live(&self) -> bool;

    /// Counter bumped every time a new broker session comes up, including
    /// reconnects the client performs on its own.  Subscriptions belong to
    /// one session; a changed value means they are gone.
    fn session_epoch(&self) -> u32;

    fn subscribe(&mut self, channel: &str) -> Result<(), CommsError>;

    /// Best-effort publish.  Callers treat an `Err` as "not delivered this
    /// cycle"; it is never retried.
    fn publish(&mut self, channel: &str, payload: &[u8]) -> Result<(), CommsError>;

    /// Hand every buffered inbound message to `handler`, in arrival order,
    /// then return.  Must not block waiting for new messages.
    fn poll_incoming(&mut self, handler: &mut dyn FnMut(&str, &[u8]));
}

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Raw sensor readers.  Range mapping happens in the domain.
pub trait SensorPort {
    /// Raw 12-bit light reading (0–4095).
    fn read_luminosity_raw(&mut self) -> u16;

    /// Raw 12-bit voltage sensor reading (0–4095).
    fn read_voltage_raw(&mut self) -> u16;

    /// Temperature and humidity; NaN fields on a failed read.
    fn read_climate(&mut self) -> ClimateReading;
}

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// The single digital output.
pub trait ActuatorPort {
    /// Drive the output pin HIGH (`true`) or LOW.
    fn write_output(&mut self, high: bool) -> Result<(), crate::error::ActuatorError>;
}

// ───────────────────────────────────────────────────────────────
// Display port
// ───────────────────────────────────────────────────────────────

/// Text colours the status screen uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Black,
    White,
    Red,
}


/// Text-level drawing primitives of the status screen.
pub trait DisplayPort {
    /// Fill the whole screen with the background colour.
    fn clear(&mut self);

    /// Draw `text` with its top-left corner at (`x`, `y`).
    fn draw_text(&mut self, x: u16, y: u16, size: u8, color: Color, text: &str);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}
