//! Retry budgets per transport, observed through the public command API.

use sark110_client::{
    CommError, LEGACY_COMM_ERROR, LEGACY_DEVICE_ERROR, RetryPolicy, Sark110, SarkError,
    SessionConfig, legacy_status,
};
use sark110_protocol::{Calibration, Response};
use sark110_transport::TransportKind;
use sark110_transport::mock::{Event, ScriptedTransport, Step};

fn config() -> SessionConfig {
    SessionConfig::default().with_retry(RetryPolicy {
        ble_reconnect_delay_ms: 0,
        ..RetryPolicy::default()
    })
}

fn connect(kind: TransportKind) -> Result<(Sark110, ScriptedTransport), SarkError> {
    let script = ScriptedTransport::new(kind);
    let device = Sark110::connect(Box::new(script.clone()), &config())?;
    Ok((device, script))
}

fn sends(script: &ScriptedTransport) -> usize {
    script.count(|e| matches!(e, Event::Send(_)))
}

fn opens(script: &ScriptedTransport) -> usize {
    script.count(|e| matches!(e, Event::Open))
}

fn closes(script: &ScriptedTransport) -> usize {
    script.count(|e| matches!(e, Event::Close))
}

#[test]
fn test_first_attempt_success_on_every_transport() -> Result<(), SarkError> {
    for kind in [TransportKind::Hid, TransportKind::Ble, TransportKind::Socket] {
        let (device, script) = connect(kind)?;
        script.push_reply(*Response::ok().as_bytes());
        device.get_key()?;
        assert_eq!(sends(&script), 1, "{kind}");
    }
    Ok(())
}

#[test]
fn test_hid_recovers_on_fifth_attempt() -> Result<(), SarkError> {
    let (device, script) = connect(TransportKind::Hid)?;
    script
        .push_repeated(Step::ReceiveFails, 4)
        .push_reply(*Response::ok().as_bytes());

    device.battery_status()?;
    assert_eq!(sends(&script), 5);
    assert_eq!(opens(&script), 1);
    Ok(())
}

#[test]
fn test_hid_gives_up_after_five_attempts() -> Result<(), SarkError> {
    let (device, script) = connect(TransportKind::Hid)?;
    script.push_repeated(Step::SendFails, 5);

    let result = device.battery_status();
    assert_eq!(legacy_status(&result), LEGACY_COMM_ERROR);
    assert!(matches!(
        result,
        Err(SarkError::Comm(CommError::Exhausted {
            kind: TransportKind::Hid,
            attempts: 5,
            ..
        }))
    ));
    assert_eq!(sends(&script), 5);
    Ok(())
}

#[test]
fn test_ble_reconnects_between_rounds() -> Result<(), SarkError> {
    let (device, script) = connect(TransportKind::Ble)?;
    script.push_repeated(Step::Reply([b'?'; 18]), 10);

    let result = device.measure_vector(10_000_000);
    assert!(matches!(
        result,
        Err(SarkError::Comm(CommError::Exhausted { attempts: 10, .. }))
    ));
    assert_eq!(sends(&script), 10);
    // Four reconnects on top of the initial open.
    assert_eq!(opens(&script), 5);
    assert_eq!(closes(&script), 4);
    Ok(())
}

#[test]
fn test_ble_version_query_fails_fast() -> Result<(), SarkError> {
    let (device, script) = connect(TransportKind::Ble)?;

    assert!(device.version().is_err());
    assert_eq!(sends(&script), 2);
    assert_eq!(opens(&script), 1);
    assert_eq!(closes(&script), 0);
    Ok(())
}

#[test]
fn test_ble_success_after_reconnect() -> Result<(), SarkError> {
    let (device, script) = connect(TransportKind::Ble)?;
    script
        .push_repeated(Step::ReceiveFails, 2)
        .push_reply(*Response::ok().as_bytes());

    device.get_key()?;
    assert_eq!(sends(&script), 3);
    assert_eq!(opens(&script), 2);
    Ok(())
}

#[test]
fn test_socket_makes_one_attempt() -> Result<(), SarkError> {
    let (device, script) = connect(TransportKind::Socket)?;
    script.push(Step::ReceiveFails);

    let result = device.get_key();
    assert!(matches!(
        result,
        Err(SarkError::Comm(CommError::Receive(_)))
    ));
    assert_eq!(sends(&script), 1);
    Ok(())
}

#[test]
fn test_device_error_is_never_retried() -> Result<(), SarkError> {
    for kind in [TransportKind::Hid, TransportKind::Ble, TransportKind::Socket] {
        let (device, script) = connect(kind)?;
        script.push_repeated(Step::Reply(*Response::device_error().as_bytes()), 10);

        let result = device.measure_rx(14_000_000, Calibration::Calibrated, 1);
        assert_eq!(legacy_status(&result), LEGACY_DEVICE_ERROR, "{kind}");
        assert!(result.is_err_and(|e| e.is_device_error()));
        assert_eq!(sends(&script), 1, "{kind}");
    }
    Ok(())
}

#[test]
fn test_out_of_range_device_is_a_comm_error() -> Result<(), SarkError> {
    let (device, script) = connect(TransportKind::Hid)?;
    let missing = device.with_device(3);
    assert_eq!(missing.device_index(), 3);

    let result = missing.get_key();
    assert!(result.is_err_and(|e| e.is_comm_error()));
    // The transport refuses the index on every attempt; nothing is consumed.
    assert_eq!(script.remaining_steps(), 0);
    assert_eq!(sends(&script), 5);
    Ok(())
}

#[test]
fn test_connect_failure_is_a_comm_error() {
    let script = ScriptedTransport::new(TransportKind::Ble);
    script.fail_opens(1);
    let result = Sark110::connect(Box::new(script), &config());
    assert!(matches!(
        result,
        Err(SarkError::Comm(CommError::Connect {
            kind: TransportKind::Ble,
            ..
        }))
    ));
}
