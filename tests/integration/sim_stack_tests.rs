//! The real host adapters wired together: simulated Wi-Fi station,
//! in-memory broker, sensor bank on the simulation statics, a test pin
//! behind `DigitalOutput`, and the log-backed display.

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, OutputPin};

use crate::mock_hw::{FakeDelay, RecordingSink, journal};

use lampnode::adapters::display::LogDisplay;
use lampnode::adapters::hardware::HardwareAdapter;
use lampnode::adapters::mqtt::{INBOUND_CAP, MqttTransport};
use lampnode::adapters::wifi::WifiAdapter;
use lampnode::app::ports::Color;
use lampnode::app::service::TelemetryCycle;
use lampnode::config::DeviceConfig;
use lampnode::connectivity::{ConnectivityState, ConnectivitySupervisor};
use lampnode::drivers::output::DigitalOutput;
use lampnode::sensors::SensorBank;
use lampnode::sensors::climate::{SimClimate, sim_set_climate, sim_set_climate_failure};
use lampnode::sensors::light::{LightSensor, sim_set_light_adc};
use lampnode::sensors::voltage::{VoltageSensor, sim_set_voltage_adc};

#[derive(Default)]
struct TestPin;

impl ErrorType for TestPin {
    type Error = Infallible;
}

impl OutputPin for TestPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        Ok(())
    }
}

type SimCycle =
    TelemetryCycle<WifiAdapter, MqttTransport, HardwareAdapter<SimClimate, TestPin>, LogDisplay, FakeDelay>;

fn sim_cycle(link_up_after_polls: u32) -> SimCycle {
    let config = DeviceConfig::default();
    let link = WifiAdapter::new(&config.wifi_ssid, link_up_after_polls);
    let sensors = SensorBank::new(
        LightSensor::new(config.light_adc_gpio),
        VoltageSensor::new(config.voltage_adc_gpio),
        SimClimate,
    );
    TelemetryCycle::new(
        &config,
        ConnectivitySupervisor::new(link, &config),
        MqttTransport::new(),
        HardwareAdapter::new(sensors, DigitalOutput::new(TestPin)),
        LogDisplay::new(),
        FakeDelay::new(journal()),
    )
}

fn published(cycle: &mut SimCycle) -> Vec<(String, String)> {
    cycle
        .transport_mut()
        .take_published()
        .into_iter()
        .map(|(c, p)| (c, String::from_utf8_lossy(&p).into_owned()))
        .collect()
}

// The only test in this binary that writes the simulation statics.
#[test]
fn end_to_end_on_simulated_hardware() {
    sim_set_light_adc(4095);
    sim_set_voltage_adc(1365);
    sim_set_climate(21.5, 55.0);
    sim_set_climate_failure(false);

    let mut cycle = sim_cycle(2);
    let mut sink = RecordingSink::new();
    cycle.init(&mut sink);

    let report = cycle.run_cycle(&mut sink);
    assert!(report.ready);
    assert_eq!(cycle.transport().client_id(), "fiware_003");
    assert_eq!(cycle.transport().subscriptions(), ["/TEF/lamp003/cmd".to_owned()]);
    assert_eq!(
        published(&mut cycle),
        vec![
            ("/TEF/lamp003/attrs".to_owned(), "s|off".to_owned()),
            ("/TEF/lamp003/attrs/l".to_owned(), "100".to_owned()),
            ("/TEF/DHT001/attrs/t".to_owned(), "21.50".to_owned()),
            ("/TEF/DHT001/attrs/h".to_owned(), "55.0".to_owned()),
            ("/TEF/POT001/attrs/v".to_owned(), "100".to_owned()),
        ]
    );
    let texts: Vec<&str> = cycle.display().frame().iter().map(|l| l.text.as_str()).collect();
    assert_eq!(
        texts,
        vec![
            "Temperature: 21.50 C",
            "Humidity: 55.00 %",
            "Luminosity: 100 lx",
            "Voltage: 100 V",
        ]
    );

    // Command arrives from the broker task; applied at the end of the next cycle.
    assert!(cycle.transport().inbound().push("/TEF/lamp003/cmd", b"lamp003@on|"));
    cycle.run_cycle(&mut sink);
    assert_eq!(cycle.hw().output().level(), Some(true));
    published(&mut cycle);
    cycle.run_cycle(&mut sink);
    assert_eq!(published(&mut cycle)[0].1, "s|on");

    // Sensor fault and low readings.
    sim_set_climate_failure(true);
    sim_set_light_adc(0);
    let report = cycle.run_cycle(&mut sink);
    let out = published(&mut cycle);
    assert_eq!(out[1].1, "0");
    assert_eq!(out[2].1, "nan");
    assert_eq!(out[3].1, "nan");
    assert!(report.alerts.low_light);
    assert!(!report.alerts.high_temperature && !report.alerts.high_humidity);
    let frame = cycle.display().frame();
    assert_eq!(frame.last().map(|l| (l.y, l.color)), Some((200, Color::Red)));
    assert_eq!(cycle.hw().sensors().climate_failures(), 1);

    sim_set_climate_failure(false);
}

#[test]
fn broker_session_loss_resubscribes() {
    let mut cycle = sim_cycle(0);
    let mut sink = RecordingSink::new();
    cycle.run_cycle(&mut sink);

    cycle.transport_mut().sim_drop_session();
    assert!(cycle.transport().subscriptions().is_empty());
    let report = cycle.run_cycle(&mut sink);

    assert!(report.ready);
    assert_eq!(cycle.transport().connects(), 2);
    assert_eq!(cycle.transport().subscriptions(), ["/TEF/lamp003/cmd".to_owned()]);
    assert_eq!(cycle.supervisor().sessions_established(), 2);
}

#[test]
fn wifi_begin_failure_is_retried() {
    let mut cycle = sim_cycle(0);
    cycle.supervisor_mut().link_mut().sim_fail_begins(1);
    let mut sink = RecordingSink::new();

    let report = cycle.run_cycle(&mut sink);

    assert!(report.ready);
    assert_eq!(cycle.supervisor().link().begins(), 2);
    assert_eq!(cycle.connectivity(), ConnectivityState::Ready);
}

#[test]
fn link_drop_rejoins_network() {
    let mut cycle = sim_cycle(1);
    let mut sink = RecordingSink::new();
    cycle.run_cycle(&mut sink);

    cycle.supervisor_mut().link_mut().sim_drop();
    let report = cycle.run_cycle(&mut sink);

    assert!(report.ready);
    assert_eq!(cycle.supervisor().link().begins(), 2);
    // The session survived the drop on the broker side.
    assert_eq!(cycle.transport().connects(), 1);
}

#[test]
fn inbound_overflow_drops_newest() {
    let mut cycle = sim_cycle(0);
    let mut sink = RecordingSink::new();
    cycle.run_cycle(&mut sink);

    for _ in 0..INBOUND_CAP {
        assert!(cycle.transport().inject("/TEF/lamp003/cmd", b"noise"));
    }
    assert!(!cycle.transport().inject("/TEF/lamp003/cmd", b"lamp003@on|"));
    assert_eq!(cycle.transport().inbound().dropped(), 1);

    let report = cycle.run_cycle(&mut sink);
    assert_eq!(usize::from(report.commands_ignored), INBOUND_CAP);
    assert_eq!(report.commands_applied, 0);
    assert!(cycle.transport().inbound().is_empty());
}

#[test]
fn client_reconnect_restores_command_subscription() {
    let mut cycle = sim_cycle(0);
    let mut sink = RecordingSink::new();
    cycle.run_cycle(&mut sink);

    cycle.transport_mut().sim_auto_reconnect();
    assert!(cycle.transport().subscriptions().is_empty());
    cycle.run_cycle(&mut sink);

    assert_eq!(cycle.transport().subscriptions(), ["/TEF/lamp003/cmd".to_owned()]);
    assert_eq!(cycle.transport().connects(), 1);
}
