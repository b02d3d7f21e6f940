//! Telemetry cycle: publish order, payload formats, pacing, rendering and
//! the end-of-cycle command drain.

use crate::mock_hw::{Rig, Trace};

use lampnode::app::events::AppEvent;
use lampnode::app::output::OutputState;
use lampnode::app::ports::Color;
use lampnode::sensors::ClimateReading;

fn ready_rig() -> Rig {
    let mut rig = Rig::new(0);
    rig.run_cycle();
    rig.take_journal();
    rig.sink.events.clear();
    rig
}

#[test]
fn publishes_in_fixed_order_with_wire_formats() {
    let mut rig = ready_rig();
    {
        let hw = rig.cycle.hw_mut();
        hw.luminosity_raw = 2048;
        hw.voltage_raw = 4095;
        hw.climate = ClimateReading {
            temperature_c: 23.456,
            humidity_pct: 55.55,
        };
    }

    let report = rig.run_cycle();
    let trace = rig.take_journal();

    assert_eq!(
        Rig::publishes(&trace),
        vec![
            ("/TEF/lamp003/attrs".to_owned(), "s|off".to_owned()),
            ("/TEF/lamp003/attrs/l".to_owned(), "50".to_owned()),
            ("/TEF/DHT001/attrs/t".to_owned(), "23.46".to_owned()),
            ("/TEF/DHT001/attrs/h".to_owned(), "55.5".to_owned()),
            ("/TEF/POT001/attrs/v".to_owned(), "300".to_owned()),
        ]
    );
    assert!(report.ready);
    assert_eq!(report.publishes_attempted, 5);
    assert_eq!(report.publishes_failed, 0);
}

#[test]
fn pacing_delay_follows_status_publish() {
    let mut rig = ready_rig();
    rig.run_cycle();
    let trace = rig.take_journal();

    let status = trace
        .iter()
        .position(|t| matches!(t, Trace::Publish { payload, .. } if payload == "s|off"))
        .expect("status published");
    assert_eq!(trace[status + 1], Trace::Delay(1000));
    assert_eq!(trace.iter().filter(|t| matches!(t, Trace::Delay(_))).count(), 1);
}

#[test]
fn already_ready_cycle_has_no_connectivity_side_effects() {
    let mut rig = ready_rig();
    rig.run_cycle();
    let trace = rig.take_journal();
    assert!(!trace.iter().any(|t| matches!(
        t,
        Trace::LinkBegin | Trace::Connect { .. } | Trace::Subscribe { .. } | Trace::PinWrite(_)
    )));
}

#[test]
fn on_then_off_in_one_drain_leaves_output_off() {
    let mut rig = ready_rig();
    rig.cycle.transport_mut().inject("/TEF/lamp003/cmd", b"lamp003@on|");
    rig.cycle.transport_mut().inject("/TEF/lamp003/cmd", b"lamp003@off|");

    let report = rig.run_cycle();
    let trace = rig.take_journal();

    assert_eq!(report.commands_applied, 2);
    assert_eq!(report.output, OutputState::Off);
    assert_eq!(rig.cycle.output_state(), OutputState::Off);
    let writes: Vec<bool> = trace
        .iter()
        .filter_map(|t| match t {
            Trace::PinWrite(h) => Some(*h),
            _ => None,
        })
        .collect();
    assert_eq!(writes, vec![true, false]);
    assert!(!rig.cycle.hw().pin_high);
}

#[test]
fn command_drained_after_publishes_shows_next_cycle() {
    let mut rig = ready_rig();
    rig.cycle.transport_mut().inject("/TEF/lamp003/cmd", b"lamp003@on|");

    rig.run_cycle();
    let trace = rig.take_journal();
    // Drain happens last, so this cycle still reported Off.
    assert_eq!(Rig::publishes(&trace)[0].1, "s|off");
    assert_eq!(trace.last(), Some(&Trace::PinWrite(true)));

    rig.run_cycle();
    let trace = rig.take_journal();
    assert_eq!(Rig::publishes(&trace)[0].1, "s|on");
}

#[test]
fn unrecognised_payload_is_ignored() {
    let mut rig = ready_rig();
    rig.cycle.transport_mut().inject("/TEF/lamp003/cmd", b"lamp003@ON|");
    rig.cycle.transport_mut().inject("/TEF/lamp003/cmd", b"hello");

    let report = rig.run_cycle();
    assert_eq!(report.commands_applied, 0);
    assert_eq!(report.commands_ignored, 2);
    assert_eq!(rig.cycle.output_state(), OutputState::Off);
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::CommandIgnored)), 2);
}

#[test]
fn all_four_alerts_render_in_fixed_order() {
    let mut rig = ready_rig();
    {
        let hw = rig.cycle.hw_mut();
        hw.luminosity_raw = 410; // 10 %
        hw.voltage_raw = 683; // 50
        hw.climate = ClimateReading {
            temperature_c: 70.0,
            humidity_pct: 80.0,
        };
    }

    let report = rig.run_cycle();
    let frame = &rig.cycle.display().frame;

    assert!(report.alerts.low_light && report.alerts.low_voltage);
    assert!(report.alerts.high_temperature && report.alerts.high_humidity);
    assert_eq!(frame.len(), 8);
    let alerts: Vec<(u16, &str)> = frame[4..].iter().map(|d| (d.y, d.text.as_str())).collect();
    assert_eq!(
        alerts,
        vec![
            (200, "ALERT: Low light!"),
            (225, "ALERT: Voltage drop!"),
            (250, "ALERT: High temperature!"),
            (275, "ALERT: High humidity!"),
        ]
    );
    assert!(frame[4..].iter().all(|d| d.color == Color::Red));
    assert_eq!(frame[2].text, "Luminosity: 10 lx");
    assert_eq!(frame[3].text, "Voltage: 50 V");
}

#[test]
fn threshold_values_do_not_alert() {
    let mut rig = ready_rig();
    {
        let hw = rig.cycle.hw_mut();
        hw.luminosity_raw = 1434; // 35 %
        hw.voltage_raw = 1365; // 100
        hw.climate = ClimateReading {
            temperature_c: 60.0,
            humidity_pct: 70.0,
        };
    }
    let report = rig.run_cycle();
    assert_eq!(rig.cycle.latest().luminosity_pct, 35);
    assert_eq!(rig.cycle.latest().voltage, 100);
    assert!(!report.alerts.any());
    assert_eq!(rig.cycle.display().frame.len(), 4);
}

#[test]
fn failed_climate_read_publishes_nan() {
    let mut rig = ready_rig();
    rig.cycle.hw_mut().climate = ClimateReading::FAILED;

    rig.run_cycle();
    let published = Rig::publishes(&rig.take_journal());

    assert_eq!(published[2], ("/TEF/DHT001/attrs/t".to_owned(), "nan".to_owned()));
    assert_eq!(published[3], ("/TEF/DHT001/attrs/h".to_owned(), "nan".to_owned()));
    assert_eq!(rig.cycle.display().frame[0].text, "Temperature: nan C");
    assert!(!rig.cycle.alerts().high_temperature);
}

#[test]
fn publish_failures_are_not_retried_within_cycle() {
    let mut rig = ready_rig();
    rig.cycle.transport_mut().fail_publishes = true;

    let report = rig.run_cycle();
    let trace = rig.take_journal();

    assert_eq!(Rig::publishes(&trace).len(), 5);
    assert_eq!(report.publishes_attempted, 5);
    assert_eq!(report.publishes_failed, 5);
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::PublishFailed { .. })), 5);
    // Rendering and the drain still ran.
    assert!(trace.contains(&Trace::Clear));
}

#[test]
fn dropped_session_is_repaired_next_cycle() {
    let mut rig = ready_rig();
    rig.cycle.transport_mut().live = false;

    let report = rig.run_cycle();
    let trace = rig.take_journal();

    assert!(report.ready);
    let connect = trace.iter().position(|t| *t == Trace::Connect { ok: true }).unwrap();
    let subscribe = trace
        .iter()
        .position(|t| matches!(t, Trace::Subscribe { channel, ok: true } if channel == "/TEF/lamp003/cmd"))
        .unwrap();
    let first_publish = trace.iter().position(|t| matches!(t, Trace::Publish { .. })).unwrap();
    assert!(connect < subscribe && subscribe < first_publish);
}

#[test]
fn cycle_reports_are_numbered_and_emitted() {
    let mut rig = Rig::new(0);
    let r1 = rig.run_cycle();
    let r2 = rig.run_cycle();
    assert_eq!((r1.iteration, r2.iteration), (1, 2));
    assert_eq!(rig.cycle.iteration(), 2);
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::CycleCompleted(_))), 2);
    assert!(matches!(rig.sink.events.last(), Some(AppEvent::CycleCompleted(r)) if *r == r2));
}

#[test]
fn init_forces_off_then_settles() {
    let mut rig = Rig::new(0);
    rig.cycle.init(&mut rig.sink);
    assert_eq!(rig.take_journal(), vec![Trace::PinWrite(false), Trace::Delay(5000)]);
    assert!(matches!(rig.sink.events.as_slice(), [AppEvent::Started]));
}
