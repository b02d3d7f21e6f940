//! Inbound command processing.
//!
//! The broker delivers raw payloads on the command channel.  Exactly two
//! payloads are recognised, built from the configured device id:
//! `<id>@on|` and `<id>@off|`.  Matching is byte-for-byte; anything else
//! (partial matches, whitespace, different casing) is observed in the log
//! and otherwise ignored.

use core::fmt::Write as _;

use heapless::String as HString;
use log::{debug, info, warn};

use super::events::AppEvent;
use super::output::{OutputController, OutputState};
use super::ports::{ActuatorPort, EventSink};

/// Capacity of one command pattern (`<id>@off|`).
pub const PATTERN_CAP: usize = 48;

/// Longest device id whose patterns fit in [`PATTERN_CAP`].
pub const MAX_DEVICE_ID_LEN: usize = PATTERN_CAP - "@off|".len();

/// A recognised remote command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    TurnOn,
    TurnOff,
}

impl Command {
    /// The output state this command drives to.
    pub const fn target(self) -> OutputState {
        match self {
            Self::TurnOn => OutputState::On,
            Self::TurnOff => OutputState::Off,
        }
    }
}

/// The two fixed command patterns for one device id.
///
/// A pattern that does not fit in [`PATTERN_CAP`] is left out entirely
/// and never matches; `DeviceConfig::validate` rejects such ids.
#[derive(Debug, Clone)]
pub struct CommandMatcher {
    on: Option<HString<PATTERN_CAP>>,
    off: Option<HString<PATTERN_CAP>>,
}

fn pattern(device_id: &str, verb: &str) -> Option<HString<PATTERN_CAP>> {
    let mut p = HString::new();
    match write!(p, "{device_id}@{verb}|") {
        Ok(()) => Some(p),
        Err(_) => {
            warn!("Command: id '{device_id}' too long for the '{verb}' pattern, command disabled");
            None
        }
    }
}

impl CommandMatcher {
    pub fn new(device_id: &str) -> Self {
        Self {
            on: pattern(device_id, "on"),
            off: pattern(device_id, "off"),
        }
    }

    /// Byte-exact match against the two patterns.
    pub fn parse(&self, payload: &[u8]) -> Option<Command> {
        let hit = |p: &Option<HString<PATTERN_CAP>>| p.as_ref().is_some_and(|p| payload == p.as_bytes());
        if hit(&self.on) {
            Some(Command::TurnOn)
        } else if hit(&self.off) {
            Some(Command::TurnOff)
        } else {
            None
        }
    }

    pub fn on_pattern(&self) -> Option<&str> {
        self.on.as_deref()
    }

    pub fn off_pattern(&self) -> Option<&str> {
        self.off.as_deref()
    }
}

/// Routes inbound messages to the output controller.
#[derive(Debug, Clone)]
pub struct CommandProcessor {
    matcher: CommandMatcher,
    applied: u32,
    ignored: u32,
}

impl CommandProcessor {
    pub fn new(device_id: &str) -> Self {
        Self {
            matcher: CommandMatcher::new(device_id),
            applied: 0,
            ignored: 0,
        }
    }

    /// Handle one inbound message.
    ///
    /// On a match, sets the output state and writes the pin before
    /// returning the new state.  Unrecognised payloads return `None` and
    /// leave the state untouched.  Never touches the network.
    pub fn on_message(
        &mut self,
        channel: &str,
        payload: &[u8],
        output: &mut OutputController,
        hw: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) -> Option<OutputState> {
        info!(
            "Message received on '{}': {}",
            channel,
            String::from_utf8_lossy(payload)
        );

        match self.matcher.parse(payload) {
            Some(cmd) => {
                let state = cmd.target();
                output.set(state, hw);
                self.applied = self.applied.wrapping_add(1);
                sink.emit(&AppEvent::CommandApplied { command: cmd, state });
                Some(state)
            }
            None => {
                debug!("Command: payload not recognised, ignored");
                self.ignored = self.ignored.wrapping_add(1);
                sink.emit(&AppEvent::CommandIgnored);
                None
            }
        }
    }

    pub fn matcher(&self) -> &CommandMatcher {
        &self.matcher
    }

    /// Commands applied since boot.
    pub fn applied_count(&self) -> u32 {
        self.applied
    }

    /// Payloads ignored since boot.
    pub fn ignored_count(&self) -> u32 {
        self.ignored
    }
}
