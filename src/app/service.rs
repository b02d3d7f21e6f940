//! Telemetry cycle: the hexagonal core.
//!
//! [`TelemetryCycle`] owns the application state (output, latest readings,
//! connectivity) together with the adapters it drives.  Every iteration
//! runs the same fixed sequence:
//!
//! ```text
//!  1 ensure_ready ─▶ 2 status + pacing ─▶ 3 luminosity ─▶ 4 temperature, humidity
//!       ─▶ 5 voltage ─▶ 6 render ─▶ 7 drain inbound commands
//! ```
//!
//! Publishes are fire-and-forget.  A failed publish is counted and logged;
//! the next iteration's `ensure_ready` repairs the session.

use core::fmt::Write as _;

use embedded_hal::delay::DelayNs;
use heapless::String as HString;
use log::{debug, info, warn};

use crate::config::{ChannelName, Channels, DeviceConfig};
use crate::connectivity::{ConnectivityState, ConnectivitySupervisor};
use crate::display::{AlertFlags, DisplayRenderer, DisplaySnapshot};
use crate::sensors::{self, ClimateReading, Decimal};

use super::commands::CommandProcessor;
use super::events::{AppEvent, CycleReport};
use super::output::{OutputController, OutputState};
use super::ports::{ActuatorPort, DisplayPort, EventSink, LinkPort, SensorPort, TransportPort};

/// Numeric payloads are short; anything longer is truncated.
const PAYLOAD_CAP: usize = 24;

/// The most recent reading of each kind.  Superseded every cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatestReadings {
    pub luminosity_pct: u8,
    pub voltage: u16,
    pub climate: ClimateReading,
}

impl Default for LatestReadings {
    fn default() -> Self {
        Self {
            luminosity_pct: 0,
            voltage: 0,
            climate: ClimateReading::FAILED,
        }
    }
}

impl LatestReadings {
    pub fn snapshot(&self) -> DisplaySnapshot {
        DisplaySnapshot {
            luminosity_pct: self.luminosity_pct,
            voltage: self.voltage,
            temperature_c: self.climate.temperature_c,
            humidity_pct: self.climate.humidity_pct,
        }
    }
}

// ───────────────────────────────────────────────────────────────
// TelemetryCycle
// ───────────────────────────────────────────────────────────────

pub struct TelemetryCycle<L, T, H, D, Y>
where
    L: LinkPort,
    T: TransportPort,
    H: SensorPort + ActuatorPort,
    D: DisplayPort,
    Y: DelayNs,
{
    supervisor: ConnectivitySupervisor<L>,
    transport: T,
    hw: H,
    display: D,
    delay: Y,
    output: OutputController,
    commands: CommandProcessor,
    renderer: DisplayRenderer,
    channels: Channels,
    latest: LatestReadings,
    pacing_ms: u32,
    boot_settle_ms: u32,
    iteration: u64,
}

impl<L, T, H, D, Y> TelemetryCycle<L, T, H, D, Y>
where
    L: LinkPort,
    T: TransportPort,
    H: SensorPort + ActuatorPort,
    D: DisplayPort,
    Y: DelayNs,
{
    pub fn new(
        config: &DeviceConfig,
        supervisor: ConnectivitySupervisor<L>,
        transport: T,
        hw: H,
        display: D,
        delay: Y,
    ) -> Self {
        Self {
            supervisor,
            transport,
            hw,
            display,
            delay,
            output: OutputController::new(),
            commands: CommandProcessor::new(&config.device_id),
            renderer: DisplayRenderer::new(),
            channels: config.channels(),
            latest: LatestReadings::default(),
            pacing_ms: config.cycle_pacing_ms,
            boot_settle_ms: config.boot_settle_ms,
            iteration: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Boot sequence: output Off, let the peripherals settle.
    pub fn init(&mut self, sink: &mut impl EventSink) {
        self.output.init(&mut self.hw);
        info!("Boot: settling for {}ms", self.boot_settle_ms);
        self.delay.delay_ms(self.boot_settle_ms);
        sink.emit(&AppEvent::Started);
    }

    /// The main control loop.
    pub fn run_forever(mut self, sink: &mut impl EventSink) -> ! {
        loop {
            self.run_cycle(sink);
        }
    }

    // ── Per-cycle orchestration ───────────────────────────────

    /// Run one full iteration.
    ///
    /// When a bounded retry policy gives up, the publishes of this
    /// iteration are skipped; sampling, pacing, rendering and the command
    /// drain still run.
    pub fn run_cycle(&mut self, sink: &mut impl EventSink) -> CycleReport {
        self.iteration = self.iteration.wrapping_add(1);
        let mut report = CycleReport {
            iteration: self.iteration,
            ..CycleReport::default()
        };

        // 1. Connectivity
        report.ready = match self.supervisor.ensure_ready(
            &mut self.transport,
            &mut self.output,
            &mut self.hw,
            &mut self.delay,
            sink,
        ) {
            Ok(()) => true,
            Err(e) => {
                warn!("Cycle {}: not connected ({e}), skipping publishes", self.iteration);
                false
            }
        };

        // 2. Status, then the pacing tick
        let status = self.output.get().status_payload();
        publish(&mut self.transport, &self.channels.status, status.as_bytes(), &mut report, sink);
        self.delay.delay_ms(self.pacing_ms);

        // 3. Luminosity
        let luminosity = sensors::luminosity_percent(self.hw.read_luminosity_raw());
        self.latest.luminosity_pct = luminosity;
        let payload = format_payload(format_args!("{luminosity}"));
        publish(&mut self.transport, &self.channels.luminosity, payload.as_bytes(), &mut report, sink);

        // 4. Temperature + humidity
        let climate = self.hw.read_climate();
        self.latest.climate = climate;
        let payload = format_payload(format_args!("{}", Decimal(climate.temperature_c, 2)));
        publish(&mut self.transport, &self.channels.temperature, payload.as_bytes(), &mut report, sink);
        let payload = format_payload(format_args!("{}", Decimal(climate.humidity_pct, 1)));
        publish(&mut self.transport, &self.channels.humidity, payload.as_bytes(), &mut report, sink);

        // 5. Voltage
        let voltage = sensors::voltage_scaled(self.hw.read_voltage_raw());
        self.latest.voltage = voltage;
        let payload = format_payload(format_args!("{voltage}"));
        publish(&mut self.transport, &self.channels.voltage, payload.as_bytes(), &mut report, sink);

        // 6. Display
        report.alerts = self.renderer.render(&self.latest.snapshot(), &mut self.display);

        // 7. Inbound commands, in arrival order
        let applied_before = self.commands.applied_count();
        let ignored_before = self.commands.ignored_count();
        {
            let commands = &mut self.commands;
            let output = &mut self.output;
            let hw = &mut self.hw;
            self.transport.poll_incoming(&mut |channel: &str, payload: &[u8]| {
                commands.on_message(channel, payload, output, hw, sink);
            });
        }
        report.commands_applied = count_u8(self.commands.applied_count().wrapping_sub(applied_before));
        report.commands_ignored = count_u8(self.commands.ignored_count().wrapping_sub(ignored_before));

        report.output = self.output.get();
        debug!(
            "Cycle {}: published {}/{}, output={:?}",
            report.iteration,
            report.publishes_attempted - report.publishes_failed,
            report.publishes_attempted,
            report.output
        );
        sink.emit(&AppEvent::CycleCompleted(report));
        report
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn output_state(&self) -> OutputState {
        self.output.get()
    }

    pub fn connectivity(&self) -> ConnectivityState {
        self.supervisor.state()
    }

    pub fn latest(&self) -> &LatestReadings {
        &self.latest
    }

    pub fn alerts(&self) -> AlertFlags {
        self.latest.snapshot().alerts()
    }

    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    pub fn channels(&self) -> &Channels {
        &self.channels
    }

    pub fn supervisor(&self) -> &ConnectivitySupervisor<L> {
        &self.supervisor
    }

    pub fn supervisor_mut(&mut self) -> &mut ConnectivitySupervisor<L> {
        &mut self.supervisor
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn hw(&self) -> &H {
        &self.hw
    }

    pub fn hw_mut(&mut self) -> &mut H {
        &mut self.hw
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn delay(&self) -> &Y {
        &self.delay
    }
}

/// Fire-and-forget publish, skipped entirely while not connected.
fn publish(
    transport: &mut impl TransportPort,
    channel: &ChannelName,
    payload: &[u8],
    report: &mut CycleReport,
    sink: &mut impl EventSink,
) {
    if !report.ready {
        return;
    }
    report.publishes_attempted = report.publishes_attempted.saturating_add(1);
    if let Err(e) = transport.publish(channel, payload) {
        report.publishes_failed = report.publishes_failed.saturating_add(1);
        warn!("Publish to '{channel}' failed ({e}); not retried this cycle");
        sink.emit(&AppEvent::PublishFailed {
            channel: channel.clone(),
        });
    }
}

fn format_payload(args: core::fmt::Arguments<'_>) -> HString<PAYLOAD_CAP> {
    let mut s = HString::new();
    let _ = s.write_fmt(args);
    s
}

fn count_u8(n: u32) -> u8 {
    n.min(u32::from(u8::MAX)) as u8
}
