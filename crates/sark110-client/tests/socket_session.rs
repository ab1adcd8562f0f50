//! End-to-end command exchange against a loopback TCP peer.

use sark110_client::{Sark110, SessionConfig, SessionState};
use sark110_protocol::catalog::layout;
use sark110_protocol::{Calibration, FRAME_LEN, Response};
use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread::JoinHandle;

type Frames = Vec<[u8; FRAME_LEN]>;

/// Accept one client, answer every frame with `reply`, and collect what was
/// received until the client hangs up or sends the disconnect frame.
fn spawn_peer(
    listener: TcpListener,
    reply: [u8; FRAME_LEN],
) -> JoinHandle<std::io::Result<Frames>> {
    std::thread::spawn(move || {
        let (mut peer, _) = listener.accept()?;
        let mut seen = Vec::new();
        loop {
            let mut frame = [0u8; FRAME_LEN];
            if peer.read_exact(&mut frame).is_err() {
                break;
            }
            seen.push(frame);
            if frame == [0xFF; FRAME_LEN] {
                // Hang up without answering.
                break;
            }
            peer.write_all(&reply)?;
        }
        Ok(seen)
    })
}

fn config_for(listener: &TcpListener) -> std::io::Result<SessionConfig> {
    let port = listener.local_addr()?.port();
    let mut config = SessionConfig::new().with_server("127.0.0.1");
    config.socket.port = port;
    Ok(config)
}

#[test]
fn test_measure_rx_round_trip_and_disconnect_notice() -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let config = config_for(&listener)?;

    let mut reply = Response::ok();
    reply
        .set(layout::meas_rx::R, 50.0)?
        .set(layout::meas_rx::X, -10.0)?;
    let peer = spawn_peer(listener, *reply.as_bytes());

    let analyzer = Sark110::connect_socket(&config)?;
    let z = analyzer.measure_rx(14_000_000, Calibration::Calibrated, 1)?;
    assert!((z.r - 50.0).abs() < f32::EPSILON);
    assert!((z.x + 10.0).abs() < f32::EPSILON);

    analyzer.close();
    assert_eq!(analyzer.session().state(), SessionState::Disconnected);

    let seen = peer.join().map_err(|_| "peer thread panicked")??;
    let mut expected = [0u8; FRAME_LEN];
    expected
        .iter_mut()
        .zip([2, 0x80, 0x9F, 0xD5, 0x00, 1, 1])
        .for_each(|(slot, byte)| *slot = byte);
    assert_eq!(seen, vec![expected, [0xFF; FRAME_LEN]]);
    Ok(())
}

#[test]
fn test_close_tolerates_vanished_peer() -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let config = config_for(&listener)?;
    let peer = std::thread::spawn(move || listener.accept().map(|_| ()));

    let analyzer = Sark110::connect_socket(&config)?;
    peer.join().map_err(|_| "peer thread panicked")??;

    analyzer.close();
    assert_eq!(analyzer.session().state(), SessionState::Disconnected);
    assert!(analyzer.get_key().is_err_and(|e| e.is_comm_error()));
    Ok(())
}

#[test]
fn test_connect_refused_is_reported() -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let config = config_for(&listener)?;
    drop(listener);

    let result = Sark110::connect_socket(&config);
    assert!(result.is_err_and(|e| e.is_comm_error()));
    Ok(())
}
