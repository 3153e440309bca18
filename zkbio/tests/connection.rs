//! Connection lifecycle against a mocked transport

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::BytesMut;
use mockall::mock;
use parking_lot::Mutex;

use zkbio::{Command, Connection, DeviceConfig, Error, Packet, SessionState};
use zkbio_transport::{Error as TransportError, Result as TransportResult, Transport};

mock! {
    pub Link {}

    #[async_trait]
    impl Transport for Link {
        async fn connect(&mut self) -> TransportResult<()>;
        async fn disconnect(&mut self) -> TransportResult<()>;
        fn is_connected(&self) -> bool;
        async fn send(&mut self, data: &[u8]) -> TransportResult<()>;
        async fn receive_exact(&mut self, len: usize) -> TransportResult<BytesMut>;
        fn remote_addr(&self) -> String;
    }
}

/// Serve `frames` back to back through `receive_exact`
fn serve(link: &mut MockLink, frames: &[Packet]) {
    let mut bytes: VecDeque<u8> = VecDeque::new();
    for frame in frames {
        bytes.extend(frame.encode().iter());
    }
    let bytes = Arc::new(Mutex::new(bytes));

    link.expect_receive_exact().returning(move |len| {
        let mut bytes = bytes.lock();
        if bytes.len() < len {
            return Err(TransportError::ConnectionClosed);
        }
        let mut out = BytesMut::with_capacity(len);
        out.extend(bytes.drain(..len));
        Ok(out)
    });
}

fn config() -> DeviceConfig {
    DeviceConfig::new("mock", 4370)
}

#[tokio::test]
async fn test_disconnect_swallows_farewell_failure() {
    let mut link = MockLink::new();
    let sends = Arc::new(AtomicUsize::new(0));
    let closes = Arc::new(AtomicUsize::new(0));

    link.expect_remote_addr().return_const("mock:4370".to_string());
    link.expect_is_connected().return_const(true);
    link.expect_connect().times(1).returning(|| Ok(()));

    let counter = sends.clone();
    link.expect_send().returning(move |_| {
        if counter.fetch_add(1, Ordering::SeqCst) == 0 {
            Ok(())
        } else {
            Err(TransportError::ConnectionClosed)
        }
    });

    let counter = closes.clone();
    link.expect_disconnect().returning(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    serve(&mut link, &[Packet::new(Command::Ack, 0x5555, 0)]);

    let mut conn = Connection::new(Box::new(link), &config());
    conn.connect().await.unwrap();
    assert_eq!(conn.session().session_key(), 0x5555);

    conn.disconnect().await.unwrap();

    assert_eq!(conn.state(), SessionState::Disconnected);
    assert_eq!(sends.load(Ordering::SeqCst), 2);
    assert!(closes.load(Ordering::SeqCst) >= 1);
}

#[tokio::test]
async fn test_connect_failure_leaves_session_closed() {
    let mut link = MockLink::new();
    link.expect_remote_addr().return_const("mock:4370".to_string());
    link.expect_is_connected().return_const(false);
    link.expect_connect()
        .times(1)
        .returning(|| Err(TransportError::ConnectionTimeout));
    link.expect_send().never();

    let mut conn = Connection::new(Box::new(link), &config());
    let result = conn.connect().await;

    assert!(matches!(result, Err(Error::Transport(TransportError::ConnectionTimeout))));
    assert_eq!(conn.state(), SessionState::Disconnected);
}

#[tokio::test]
async fn test_corrupt_reply_is_invalid_packet() {
    let mut link = MockLink::new();
    link.expect_remote_addr().return_const("mock:4370".to_string());
    link.expect_is_connected().return_const(true);
    link.expect_connect().returning(|| Ok(()));
    link.expect_disconnect().returning(|| Ok(()));
    link.expect_send().returning(|_| Ok(()));

    // Flip the checksum on the wire
    let mut corrupt = Packet::new(Command::Ack, 1, 0).encode().to_vec();
    corrupt[10] ^= 0xFF;
    let corrupt = Arc::new(Mutex::new(VecDeque::from(corrupt)));
    link.expect_receive_exact().returning(move |len| {
        let mut bytes = corrupt.lock();
        let mut out = BytesMut::with_capacity(len);
        let n = len.min(bytes.len());
        out.extend(bytes.drain(..n));
        Ok(out)
    });

    let mut conn = Connection::new(Box::new(link), &config());
    let result = conn.connect().await;

    assert!(matches!(
        result,
        Err(Error::Core(zkbio_core::Error::InvalidPacket(_)))
    ));
    assert_eq!(conn.state(), SessionState::Disconnected);
}

#[tokio::test]
async fn test_oversized_frame_is_rejected() {
    let mut link = MockLink::new();
    link.expect_remote_addr().return_const("mock:4370".to_string());
    link.expect_is_connected().return_const(true);
    link.expect_connect().returning(|| Ok(()));
    link.expect_disconnect().returning(|| Ok(()));
    link.expect_send().returning(|_| Ok(()));
    link.expect_receive_exact()
        .times(1)
        .returning(|_| Ok(BytesMut::from(&[0x50, 0x50, 0x82, 0x7D, 0xFF, 0xFF, 0xFF, 0x7F][..])));

    let mut conn = Connection::new(Box::new(link), &config());
    let result = conn.connect().await;

    assert!(matches!(
        result,
        Err(Error::Core(zkbio_core::Error::InvalidPacket(_)))
    ));
}
