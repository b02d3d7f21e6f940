//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing one structured line per
//! application event to the logger (UART on the device).

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started => {
                info!("START | entering telemetry loop");
            }
            AppEvent::ConnectivityChanged { from, to } => {
                info!("CONN  | {:?} -> {:?}", from, to);
            }
            AppEvent::LinkUp(Some([a, b, c, d])) => {
                info!("CONN  | link up, ip={a}.{b}.{c}.{d}");
            }
            AppEvent::LinkUp(None) => {
                info!("CONN  | link up");
            }
            AppEvent::OutputForcedOff => {
                info!("OUT   | forced Off on first link");
            }
            AppEvent::SessionAttemptFailed { attempt } => {
                warn!("CONN  | broker session attempt {} failed", attempt);
            }
            AppEvent::CommandApplied { command, state } => {
                info!("CMD   | {:?} -> output {:?}", command, state);
            }
            AppEvent::CommandIgnored => {
                info!("CMD   | unrecognised payload ignored");
            }
            AppEvent::PublishFailed { channel } => {
                warn!("PUB   | '{}' not delivered", channel);
            }
            AppEvent::CycleCompleted(r) => {
                info!(
                    "CYCLE | #{} | ready={} | pub={}/{} | cmd={}+{}ign | out={:?} | \
                     alerts light={} volt={} temp={} hum={}",
                    r.iteration,
                    r.ready,
                    r.publishes_attempted - r.publishes_failed,
                    r.publishes_attempted,
                    r.commands_applied,
                    r.commands_ignored,
                    r.output,
                    r.alerts.low_light,
                    r.alerts.low_voltage,
                    r.alerts.high_temperature,
                    r.alerts.high_humidity,
                );
            }
        }
    }
}
