//! Every transport variant honours the same frame contract when driven
//! through `Box<dyn Transport>`.

use sark110_protocol::FRAME_LEN;
use sark110_transport::mock::{MockGattLink, MockHidDevice, MockHidPort};
use sark110_transport::{
    BleConfig, BleTransport, HidConfig, HidDeviceInfo, HidTransport, SocketConfig,
    SocketTransport, Transport, TransportError, TransportKind,
};
use std::io::{Read, Write};
use std::net::TcpListener;

fn reply(tag: u8) -> [u8; FRAME_LEN] {
    let mut frame = [0u8; FRAME_LEN];
    frame[0] = b'O';
    frame[1] = tag;
    frame
}

fn exchange(transport: &mut dyn Transport, tag: u8) -> Result<[u8; FRAME_LEN], TransportError> {
    let mut request = [0u8; FRAME_LEN];
    request[0] = tag;
    transport.send(0, &request)?;
    let mut response = [0u8; FRAME_LEN];
    transport.receive(0, &mut response)?;
    Ok(response)
}

#[test]
fn test_hid_contract() -> Result<(), TransportError> {
    let device = MockHidDevice::new(HidDeviceInfo::sark110("/dev/hidraw0"));
    device.queue_read(reply(1).to_vec());
    let mut port = MockHidPort::new();
    port.add_device(device.clone());

    let mut transport: Box<dyn Transport> =
        Box::new(HidTransport::new(port, HidConfig::default()));
    assert_eq!(transport.kind(), TransportKind::Hid);
    assert_eq!(transport.open()?, 1);
    assert_eq!(exchange(transport.as_mut(), 1)?, reply(1));

    transport.close();
    assert!(!transport.is_open());
    assert!(matches!(
        exchange(transport.as_mut(), 1),
        Err(TransportError::NotOpen)
    ));
    Ok(())
}

#[test]
fn test_ble_contract() -> Result<(), TransportError> {
    let link = MockGattLink::new();
    link.queue_reply(reply(2).to_vec());
    let config = BleConfig {
        settle_delay_ms: 0,
        receive_timeout_ms: 20,
        ..BleConfig::default()
    };

    let mut transport: Box<dyn Transport> = Box::new(BleTransport::new(link.clone(), config));
    assert_eq!(transport.kind(), TransportKind::Ble);
    assert_eq!(transport.open()?, 1);
    assert_eq!(exchange(transport.as_mut(), 2)?, reply(2));

    // No queued reply: the wait is bounded.
    assert!(matches!(
        exchange(transport.as_mut(), 2),
        Err(TransportError::Timeout { timeout_ms: 20 })
    ));

    transport.close();
    assert_eq!(link.disconnects(), 1);
    Ok(())
}

#[test]
fn test_socket_contract() -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let port = listener.local_addr()?.port();
    let server = std::thread::spawn(move || -> std::io::Result<()> {
        let (mut peer, _) = listener.accept()?;
        let mut request = [0u8; FRAME_LEN];
        peer.read_exact(&mut request)?;
        peer.write_all(&reply(request[0]))?;
        Ok(())
    });

    let mut transport: Box<dyn Transport> = Box::new(SocketTransport::new(
        SocketConfig::new("127.0.0.1").with_port(port),
    ));
    assert_eq!(transport.kind(), TransportKind::Socket);
    assert_eq!(transport.open()?, 1);
    assert_eq!(exchange(transport.as_mut(), 3)?, reply(3));
    server.join().map_err(|_| "server thread panicked")??;
    transport.close();
    Ok(())
}

#[test]
fn test_config_serde_defaults() -> Result<(), serde_json::Error> {
    let hid: HidConfig = serde_json::from_str(r#"{"max_devices": 3}"#)?;
    assert_eq!(hid.max_devices, 3);
    assert_eq!(hid.receive_timeout_ms, 220);

    let ble: BleConfig = serde_json::from_str("{}")?;
    assert_eq!(ble, BleConfig::default());

    let socket: SocketConfig = serde_json::from_str(r#"{"host": "sark.local"}"#)?;
    assert_eq!(socket.endpoint(), "sark.local:8888");
    Ok(())
}
