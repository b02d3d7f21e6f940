//! LampNode Firmware: Main Entry Point
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                   Adapters (outer ring)                    │
//! │                                                            │
//! │  WifiAdapter   MqttTransport   HardwareAdapter   LogDisplay│
//! │  (LinkPort)    (TransportPort) (Sensor+Actuator) (Display) │
//! │                                                            │
//! │  ──────────────── Port Trait Boundary ───────────────────  │
//! │                                                            │
//! │  ┌──────────────────────────────────────────────────────┐  │
//! │  │  TelemetryCycle (pure logic)                         │  │
//! │  │  ConnectivitySupervisor · CommandProcessor · Display │  │
//! │  └──────────────────────────────────────────────────────┘  │
//! └────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use esp_idf_hal::gpio::{PinDriver, Pull};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::EspWifi;
use log::{info, warn};

use lampnode::adapters::display::LogDisplay;
use lampnode::adapters::hardware::HardwareAdapter;
use lampnode::adapters::log_sink::LogEventSink;
use lampnode::adapters::mqtt::MqttTransport;
use lampnode::adapters::time::SystemDelay;
use lampnode::adapters::wifi::WifiAdapter;
use lampnode::app::service::TelemetryCycle;
use lampnode::config::DeviceConfig;
use lampnode::connectivity::ConnectivitySupervisor;
use lampnode::drivers::hw_init;
use lampnode::drivers::output::DigitalOutput;
use lampnode::error::Error;
use lampnode::sensors::climate::Dht22;
use lampnode::sensors::light::LightSensor;
use lampnode::sensors::voltage::VoltageSensor;
use lampnode::sensors::SensorBank;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("LampNode v{}", env!("CARGO_PKG_VERSION"));

    // ── 2. Configuration ──────────────────────────────────────
    let config = DeviceConfig::default();
    config.validate()?;
    let mut shown = config.clone();
    shown.wifi_password = "***".into();
    match serde_json::to_string(&shown) {
        Ok(json) => info!("Config: {json}"),
        Err(e) => warn!("Config: dump failed ({e})"),
    }

    // ── 3. Peripherals ────────────────────────────────────────
    hw_init::init_peripherals()?;
    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    // GPIO numbers in `config` document the wiring; the typed pins below
    // must match them (see `pins`).
    let output_pin = PinDriver::output(peripherals.pins.gpio2)?;
    let mut dht_pin = PinDriver::input_output_od(peripherals.pins.gpio15)?;
    dht_pin.set_pull(Pull::Up)?;
    dht_pin.set_high()?;

    // ── 4. Adapters ───────────────────────────────────────────
    let wifi = EspWifi::new(peripherals.modem, sysloop, Some(nvs))?;
    let link = WifiAdapter::new(wifi, &config.wifi_ssid, &config.wifi_password).map_err(Error::from)?;
    let transport = MqttTransport::new(config.broker_url(), config.session_wait_ms);

    let sensors = SensorBank::new(
        LightSensor::new(config.light_adc_gpio),
        VoltageSensor::new(config.voltage_adc_gpio),
        Dht22::new(dht_pin, SystemDelay::new()),
    );
    let hw = HardwareAdapter::new(sensors, DigitalOutput::new(output_pin));

    // ── 5. Telemetry cycle ────────────────────────────────────
    let supervisor = ConnectivitySupervisor::new(link, &config);
    let mut cycle = TelemetryCycle::new(
        &config,
        supervisor,
        transport,
        hw,
        LogDisplay::new(),
        SystemDelay::new(),
    );
    let mut sink = LogEventSink::new();

    cycle.init(&mut sink);
    info!("System ready. Entering telemetry loop.");
    cycle.run_forever(&mut sink)
}
