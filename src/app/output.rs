//! Output controller: the binary actuator state and its physical write.
//!
//! `OutputController` is the only owner of [`OutputState`].  It is mutated
//! by the command processor (matched inbound command) and by the boot /
//! first-link safe reset; the telemetry cycle only reads it.  Every
//! mutation performs the pin write before returning, so the state is
//! always a synchronous reflection of the last applied command.

use log::{info, warn};

use super::ports::ActuatorPort;

/// Binary actuator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputState {
    #[default]
    Off,
    On,
}

impl OutputState {
    /// Status-channel encoding.
    pub const fn status_payload(self) -> &'static str {
        match self {
            Self::On => "s|on",
            Self::Off => "s|off",
        }
    }

    /// Inverse of [`status_payload`](Self::status_payload).
    pub fn from_status_payload(payload: &str) -> Option<Self> {
        match payload {
            "s|on" => Some(Self::On),
            "s|off" => Some(Self::Off),
            _ => None,
        }
    }

    pub const fn is_on(self) -> bool {
        matches!(self, Self::On)
    }
}

/// Owns the actuator state and applies it through [`ActuatorPort`].
#[derive(Debug, Default)]
pub struct OutputController {
    state: OutputState,
    writes: u32,
}

impl OutputController {
    /// Starts `Off`; no hardware write until [`init`](Self::init).
    pub fn new() -> Self {
        Self::default()
    }

    /// Boot-time write: drive the pin LOW to match the initial state.
    pub fn init(&mut self, hw: &mut impl ActuatorPort) {
        self.set(OutputState::Off, hw);
        info!("Output: initialised Off");
    }

    /// Set the state and write the pin.  The state is updated even when
    /// the write fails: the status channel reports the commanded value.
    pub fn set(&mut self, state: OutputState, hw: &mut impl ActuatorPort) {
        if let Err(e) = hw.write_output(state.is_on()) {
            warn!("Output: pin write failed ({e}), state recorded as {state:?}");
        }
        self.state = state;
        self.writes = self.writes.wrapping_add(1);
    }

    pub fn get(&self) -> OutputState {
        self.state
    }

    /// Total writes since boot (diagnostics).
    pub fn write_count(&self) -> u32 {
        self.writes
    }
}
