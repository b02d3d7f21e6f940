//! Connectivity supervisor: boot sequencing, retries, safe reset and
//! idempotence, driven through the telemetry cycle and directly.

use crate::mock_hw::{FakeDelay, MockHardware, MockLink, MockTransport, RecordingSink, Rig, Trace, journal};

use lampnode::app::events::AppEvent;
use lampnode::app::output::{OutputController, OutputState};
use lampnode::config::DeviceConfig;
use lampnode::connectivity::{ConnectivityState, ConnectivitySupervisor, RetryPolicy};
use lampnode::error::CommsError;

#[test]
fn boot_with_link_down_for_three_polls() {
    let mut rig = Rig::new(3);
    let report = rig.run_cycle();
    let trace = rig.take_journal();

    assert!(report.ready);
    assert_eq!(rig.cycle.connectivity(), ConnectivityState::Ready);

    // begin, three 100 ms polls, then the safe reset and the session.
    assert_eq!(
        &trace[..7],
        &[
            Trace::LinkBegin,
            Trace::Delay(100),
            Trace::Delay(100),
            Trace::Delay(100),
            Trace::PinWrite(false),
            Trace::Connect { ok: true },
            Trace::Subscribe {
                channel: "/TEF/lamp003/cmd".into(),
                ok: true
            },
        ]
    );

    // Nothing is published before the session is Ready.
    let first_publish = trace.iter().position(|t| matches!(t, Trace::Publish { .. })).unwrap();
    assert_eq!(first_publish, 7);

    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::OutputForcedOff)), 1);
    assert_eq!(rig.cycle.output_state(), OutputState::Off);
}

#[test]
fn state_transitions_are_emitted_in_order() {
    let mut rig = Rig::new(1);
    rig.run_cycle();

    let transitions: Vec<(ConnectivityState, ConnectivityState)> = rig
        .sink
        .events
        .iter()
        .filter_map(|e| match e {
            AppEvent::ConnectivityChanged { from, to } => Some((*from, *to)),
            _ => None,
        })
        .collect();
    assert_eq!(
        transitions,
        vec![
            (ConnectivityState::NetworkDown, ConnectivityState::SessionDown),
            (ConnectivityState::SessionDown, ConnectivityState::Ready),
        ]
    );
    assert!(rig.sink.events.iter().any(|e| matches!(e, AppEvent::LinkUp(Some([192, 168, 1, 50])))));
}

#[test]
fn session_failures_retry_every_two_seconds() {
    let mut rig = Rig::new(0);
    rig.cycle.transport_mut().fail_connects = 2;

    let report = rig.run_cycle();
    let trace = rig.take_journal();

    assert!(report.ready);
    let session: Vec<&Trace> = trace
        .iter()
        .filter(|t| matches!(t, Trace::Connect { .. } | Trace::Delay(2000)))
        .collect();
    assert_eq!(
        session,
        vec![
            &Trace::Connect { ok: false },
            &Trace::Delay(2000),
            &Trace::Connect { ok: false },
            &Trace::Delay(2000),
            &Trace::Connect { ok: true },
        ]
    );
    let attempts: Vec<u32> = rig
        .sink
        .events
        .iter()
        .filter_map(|e| match e {
            AppEvent::SessionAttemptFailed { attempt } => Some(*attempt),
            _ => None,
        })
        .collect();
    assert_eq!(attempts, vec![1, 2]);
    assert_eq!(rig.cycle.supervisor().sessions_established(), 1);
}

#[test]
fn failed_subscribe_counts_as_failed_attempt() {
    let mut rig = Rig::new(0);
    rig.cycle.transport_mut().fail_subscribes = 1;

    rig.run_cycle();
    let trace = rig.take_journal();

    let subs: Vec<bool> = trace
        .iter()
        .filter_map(|t| match t {
            Trace::Subscribe { ok, .. } => Some(*ok),
            _ => None,
        })
        .collect();
    assert_eq!(subs, vec![false, true]);
    // Session already live on the retry: no second connect.
    assert_eq!(trace.iter().filter(|t| matches!(t, Trace::Connect { .. })).count(), 1);
    assert!(trace.contains(&Trace::Delay(2000)));
}

#[test]
fn ensure_ready_is_idempotent() {
    let j = journal();
    let config = DeviceConfig::default();
    let mut sup = ConnectivitySupervisor::new(MockLink::new(j.clone(), 0), &config);
    let mut transport = MockTransport::new(j.clone());
    let mut hw = MockHardware::new(j.clone());
    let mut delay = FakeDelay::new(j.clone());
    let mut output = OutputController::new();
    let mut sink = RecordingSink::new();

    sup.ensure_ready(&mut transport, &mut output, &mut hw, &mut delay, &mut sink)
        .unwrap();
    j.borrow_mut().clear();
    let events_before = sink.events.len();

    sup.ensure_ready(&mut transport, &mut output, &mut hw, &mut delay, &mut sink)
        .unwrap();
    assert!(j.borrow().is_empty());
    assert_eq!(sink.events.len(), events_before);
    assert_eq!(sup.state(), ConnectivityState::Ready);
}

#[test]
fn safe_reset_happens_once_across_reconnects() {
    let mut rig = Rig::new(0);
    rig.run_cycle();

    rig.cycle.supervisor_mut().link_mut().drop_link();
    rig.cycle.transport_mut().live = false;
    let report = rig.run_cycle();

    assert!(report.ready);
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::OutputForcedOff)), 1);
    let trace = rig.take_journal();
    assert_eq!(trace.iter().filter(|t| **t == Trace::LinkBegin).count(), 2);
    assert_eq!(trace.iter().filter(|t| matches!(t, Trace::Subscribe { .. })).count(), 2);
}

#[test]
fn reconnect_keeps_commanded_output() {
    let mut rig = Rig::new(0);
    rig.cycle.transport_mut().inject("/TEF/lamp003/cmd", b"lamp003@on|");
    rig.run_cycle();
    assert_eq!(rig.cycle.output_state(), OutputState::On);

    rig.cycle.supervisor_mut().link_mut().drop_link();
    rig.run_cycle();
    assert_eq!(rig.cycle.output_state(), OutputState::On);
    assert!(rig.cycle.hw().pin_high);
}

#[test]
fn bounded_session_policy_gives_up() {
    let mut rig = Rig::with_supervisor(0, |link, config| {
        ConnectivitySupervisor::with_policies(
            link,
            config,
            RetryPolicy::forever_fixed(config.link_poll_ms),
            RetryPolicy::bounded_fixed(3, config.session_retry_ms),
        )
    });
    rig.cycle.transport_mut().fail_connects = 10;

    let report = rig.run_cycle();
    let trace = rig.take_journal();

    assert!(!report.ready);
    assert_eq!(report.publishes_attempted, 0);
    assert!(Rig::publishes(&trace).is_empty());
    assert_eq!(trace.iter().filter(|t| matches!(t, Trace::Connect { ok: false })).count(), 3);
    assert_eq!(rig.cycle.connectivity(), ConnectivityState::SessionDown);
    // Pacing and rendering still happen.
    assert!(trace.contains(&Trace::Delay(1000)));
    assert!(trace.contains(&Trace::Clear));

    // Next cycle tries again with a fresh budget.
    rig.cycle.transport_mut().fail_connects = 0;
    assert!(rig.run_cycle().ready);
}

#[test]
fn bounded_link_policy_reports_exhaustion() {
    let j = journal();
    let config = DeviceConfig::default();
    let mut sup = ConnectivitySupervisor::with_policies(
        MockLink::new(j.clone(), 100),
        &config,
        RetryPolicy::bounded_fixed(5, 100),
        RetryPolicy::forever_fixed(2000),
    );
    let mut transport = MockTransport::new(j.clone());
    let mut hw = MockHardware::new(j.clone());
    let mut delay = FakeDelay::new(j.clone());
    let mut output = OutputController::new();
    let mut sink = RecordingSink::new();

    let res = sup.ensure_ready(&mut transport, &mut output, &mut hw, &mut delay, &mut sink);
    assert_eq!(res, Err(CommsError::RetriesExhausted));
    assert_eq!(sup.state(), ConnectivityState::NetworkDown);
    assert_eq!(j.borrow().iter().filter(|t| **t == Trace::Delay(100)).count(), 4);
    assert!(sink.events.is_empty());
}

#[test]
fn client_side_reconnect_resubscribes() {
    let mut rig = Rig::new(0);
    rig.run_cycle();
    rig.take_journal();

    // Session healed between two cycles; the broker forgot the subscription.
    rig.cycle.transport_mut().reconnect_on_its_own();
    let report = rig.run_cycle();
    let trace = rig.take_journal();

    assert!(report.ready);
    assert!(!trace.iter().any(|t| matches!(t, Trace::Connect { .. })));
    let subscribe = trace
        .iter()
        .position(|t| matches!(t, Trace::Subscribe { channel, ok: true } if channel == "/TEF/lamp003/cmd"))
        .expect("command channel subscribed again");
    let first_publish = trace.iter().position(|t| matches!(t, Trace::Publish { .. })).unwrap();
    assert!(subscribe < first_publish);
    assert_eq!(rig.cycle.supervisor().sessions_established(), 2);

    // The following cycle is quiet again.
    rig.run_cycle();
    assert!(!rig.take_journal().iter().any(|t| matches!(t, Trace::Subscribe { .. })));
}
