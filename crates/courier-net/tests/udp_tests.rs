//! Tests for the tokio UDP transport and a tokio-backed session over loopback.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use courier_net::udp::{EPHEMERAL_PORTS, TokioUdpTransport, UdpDescriptor, UdpEvents, UdpTransport};
use courier_net::{
    ClientSettings, NetworkError, Reply, SessionCallbacks, SessionConfig, SessionState, UdpSession,
};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;

/// Bind a loopback echo server and return its address.
async fn echo_server() -> SocketAddr {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();

    tokio::spawn(async move {
        let mut buf = vec![0u8; 1500];
        loop {
            let Ok((n, source)) = socket.recv_from(&mut buf).await else {
                break;
            };
            let mut reply = b"echo:".to_vec();
            reply.extend_from_slice(&buf[..n]);
            let _ = socket.send_to(&reply, source).await;
        }
    });

    addr
}

/// Bind a loopback socket that never answers.
async fn silent_server() -> (UdpSocket, SocketAddr) {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();
    (socket, addr)
}

fn loopback(port: u16, remote: SocketAddr) -> UdpDescriptor {
    UdpDescriptor::new(port, remote).local_addr(SocketAddr::from(([127, 0, 0, 1], port)))
}

#[tokio::test]
async fn test_allocate_port_in_ephemeral_range() {
    let transport = TokioUdpTransport::new().unwrap();
    for _ in 0..100 {
        assert!(EPHEMERAL_PORTS.contains(&transport.allocate_port()));
    }
}

#[test]
fn test_transport_requires_runtime() {
    assert!(matches!(
        TokioUdpTransport::new(),
        Err(NetworkError::UdpSocket(_))
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_channel_send_and_receive() {
    let server = echo_server().await;
    let transport = TokioUdpTransport::new().unwrap();

    let (sent_tx, mut sent_rx) = mpsc::unbounded_channel();
    let (recv_tx, mut recv_rx) = mpsc::unbounded_channel();
    let events = UdpEvents {
        on_sent: Arc::new(move || {
            let _ = sent_tx.send(());
        }),
        on_received: Arc::new(move |datagram| {
            let _ = recv_tx.send(datagram);
        }),
        ..UdpEvents::ignored()
    };

    let channel = transport.open(loopback(0, server), events).unwrap();
    assert_ne!(channel.local_port(), 0);

    channel.send(Bytes::from_static(b"hello")).unwrap();

    tokio::time::timeout(Duration::from_secs(2), sent_rx.recv())
        .await
        .expect("sent notification")
        .unwrap();
    let datagram = tokio::time::timeout(Duration::from_secs(2), recv_rx.recv())
        .await
        .expect("echo reply")
        .unwrap();

    assert_eq!(&datagram.data[..], b"echo:hello");
    assert_eq!(datagram.source, server);

    channel.close();
    channel.close();
    assert!(matches!(
        channel.send(Bytes::from_static(b"again")),
        Err(NetworkError::SendFailed(_))
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_port_in_use_falls_back() {
    let (_occupied, addr) = silent_server().await;
    let transport = TokioUdpTransport::new().unwrap();

    let channel = transport
        .open(loopback(addr.port(), addr), UdpEvents::ignored())
        .unwrap();
    assert_ne!(channel.local_port(), addr.port());
}

fn tokio_session() -> (UdpSession, mpsc::UnboundedReceiver<Reply>) {
    let session = UdpSession::with_tokio(&ClientSettings::default()).unwrap();
    let (tx, rx) = mpsc::unbounded_channel();
    session.set_callbacks(SessionCallbacks::new().on_data_ready(move |reply| {
        let _ = tx.send(reply.clone());
    }));
    (session, rx)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_session_round_trip() {
    let server = echo_server().await;
    let (session, mut replies) = tokio_session();

    session.initialize(
        SessionConfig::literal("127.0.0.1", server.port()).reply_timeout(Duration::from_secs(2)),
    );
    session.resolve(|_| {}).unwrap();
    assert_eq!(session.state(), SessionState::Resolved);

    session.send(&b"ping"[..]).unwrap();
    let reply = tokio::time::timeout(Duration::from_secs(3), replies.recv())
        .await
        .expect("reply or timeout")
        .unwrap();

    assert_eq!(reply.payload().map(|p| &p[..]), Some(&b"echo:ping"[..]));
    assert_eq!(reply.source(), Some(server));
    assert_eq!(session.state(), SessionState::Resolved);
    assert!(session.local_port().is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_session_reply_timeout() {
    let (_silent, server) = silent_server().await;
    let (session, mut replies) = tokio_session();

    let config = SessionConfig::literal("127.0.0.1", server.port())
        .reply_timeout(Duration::from_millis(200));
    session.initialize(config);
    session.resolve(|_| {}).unwrap();
    session.send(&b"ping"[..]).unwrap();

    let reply = tokio::time::timeout(Duration::from_secs(3), replies.recv())
        .await
        .expect("timeout outcome")
        .unwrap();
    assert_eq!(reply, Reply::Timeout);
    assert_eq!(session.state(), SessionState::Resolved);

    // Exactly one outcome per send.
    let extra = tokio::time::timeout(Duration::from_millis(500), replies.recv()).await;
    assert!(extra.is_err());
}
