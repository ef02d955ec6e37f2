use std::{
    io,
    net::SocketAddr,
    sync::mpsc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use tokio::{net::UdpSocket, time::timeout};

use crate::common::{
    config::{EndpointConfig, StartBarrier},
    error::{EndpointError, TransportOp},
    role::Role,
    state::EndpointState,
    token::{Token, TOKEN_FROM_A, TOKEN_FROM_B},
};

use super::{
    barrier::{pass, ready_channel, BarrierOutcome},
    endpoint::{serve, Endpoint},
    launcher::{collect_outcomes, spawn_context, LaunchError},
    transport::Transport,
};

fn addr(port: u16) -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], port))
}

fn fast_config(role: Role, local: u16, peer: u16, rounds: u32) -> EndpointConfig {
    EndpointConfig::new(role, addr(local), addr(peer), rounds)
        .unwrap()
        .with_work_duration(Duration::from_millis(5))
        .with_barrier(StartBarrier::Immediate)
}

#[tokio::test]
async fn delay_barrier_gives_up_when_peer_fails() {
    let (notifier, watcher) = ready_channel();
    drop(notifier);

    let outcome = timeout(
        Duration::from_secs(1),
        pass(Role::Initiator, StartBarrier::Delay(Duration::from_secs(10)), Some(watcher)),
    )
    .await
    .expect("barrier must not wait for the whole delay");

    assert_eq!(outcome, BarrierOutcome::PeerFailed);
}

#[tokio::test]
async fn delay_barrier_serves_full_delay() {
    let (notifier, watcher) = ready_channel();
    notifier.notify();

    let delay = Duration::from_millis(100);
    let start = Instant::now();
    let outcome = pass(Role::Initiator, StartBarrier::Delay(delay), Some(watcher)).await;

    assert_eq!(outcome, BarrierOutcome::Proceed);
    assert!(start.elapsed() >= delay);
}

#[tokio::test]
async fn signal_barrier_waits_for_notify() {
    let (notifier, watcher) = ready_channel();

    let waiting = tokio::spawn(pass(Role::Initiator, StartBarrier::Signal, Some(watcher)));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!waiting.is_finished());

    notifier.notify();
    assert_eq!(waiting.await.unwrap(), BarrierOutcome::Proceed);

    let (notifier, watcher) = ready_channel();
    drop(notifier);
    assert_eq!(
        pass(Role::Initiator, StartBarrier::Signal, Some(watcher)).await,
        BarrierOutcome::PeerFailed
    );

    assert_eq!(
        pass(Role::Initiator, StartBarrier::Signal, None).await,
        BarrierOutcome::Proceed
    );
}

#[tokio::test]
async fn responder_replies_to_initiator_token() {
    let peer = UdpSocket::bind(addr(19201)).await.unwrap();

    let responder = tokio::spawn(serve(fast_config(Role::Responder, 19202, 19201, 1), None, None));

    // Let the responder bind.
    tokio::time::sleep(Duration::from_millis(50)).await;
    peer.send_to(TOKEN_FROM_A.as_bytes(), addr(19202)).await.unwrap();

    let mut buf = [0u8; 64];
    let (len, from) = peer.recv_from(&mut buf).await.unwrap();
    assert_eq!(&buf[..len], TOKEN_FROM_B.as_bytes());
    assert_eq!(from, addr(19202));

    let report = responder.await.unwrap().unwrap();
    assert_eq!(report.sent, 1);
    assert_eq!(report.received, 1);
    assert_eq!(report.completed, 1);
    assert_eq!(report.last_token, Some(Token::of(Role::Initiator)));
    assert_eq!(report.state, EndpointState::Done);
}

#[tokio::test]
async fn initiator_accepts_any_reply() {
    let peer = UdpSocket::bind(addr(19212)).await.unwrap();

    let initiator = tokio::spawn(serve(fast_config(Role::Initiator, 19211, 19212, 2), None, None));

    let mut buf = [0u8; 64];
    for reply in [&b"hello"[..], TOKEN_FROM_B.as_bytes()] {
        let (len, from) = peer.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..len], TOKEN_FROM_A.as_bytes());
        peer.send_to(reply, from).await.unwrap();
    }

    let report = initiator.await.unwrap().unwrap();
    assert_eq!(report.sent, 2);
    assert_eq!(report.received, 2);
    assert_eq!(report.last_token.unwrap().to_string(), TOKEN_FROM_B);
}

#[tokio::test]
async fn zero_rounds_exchange_nothing() {
    let peer = UdpSocket::bind(addr(19222)).await.unwrap();

    let initiator = serve(fast_config(Role::Initiator, 19221, 19222, 0), None, None);
    let report = timeout(Duration::from_secs(1), initiator)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(report.sent, 0);
    assert_eq!(report.received, 0);
    assert_eq!(report.state, EndpointState::Done);

    let mut buf = [0u8; 64];
    assert!(peer.try_recv_from(&mut buf).is_err());
}

#[tokio::test]
async fn bind_failure_is_reported() {
    let _occupied = UdpSocket::bind(addr(19231)).await.unwrap();

    let (notifier, watcher) = ready_channel();
    let result = serve(
        fast_config(Role::Responder, 19231, 19232, 1),
        Some(notifier),
        None,
    )
    .await;

    match result {
        Err(EndpointError::Transport(err)) => {
            assert_eq!(err.op, TransportOp::Bind);
            assert_eq!(err.role, Role::Responder);
        }
        other => panic!("expected bind failure, got {:?}", other),
    }

    // Notifier was dropped unfired.
    assert_eq!(
        pass(Role::Initiator, StartBarrier::Signal, Some(watcher)).await,
        BarrierOutcome::PeerFailed
    );
}

#[tokio::test]
async fn socket_is_closed_after_run() {
    let config = fast_config(Role::Responder, 19241, 19242, 0);

    let endpoint = Endpoint::bind(config.clone()).await.unwrap();
    endpoint.run().await.unwrap();

    // Port can be bound again.
    let endpoint = Endpoint::bind(config).await.unwrap();
    endpoint.run().await.unwrap();
}

/// Transport on which every send and receive fails.
struct BrokenTransport {
    local: SocketAddr,
}

#[async_trait]
impl Transport for BrokenTransport {
    async fn send_to(&mut self, _payload: &[u8], _to: SocketAddr) -> io::Result<usize> {
        Err(io::Error::from(io::ErrorKind::ConnectionRefused))
    }

    async fn recv_from(&mut self, _buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        Err(io::Error::from(io::ErrorKind::ConnectionReset))
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        Ok(self.local)
    }
}

#[tokio::test]
async fn send_and_receive_failures_are_reported() {
    let initiator = Endpoint::new(
        fast_config(Role::Initiator, 19251, 19252, 3),
        BrokenTransport { local: addr(19251) },
    );
    let err = initiator.run().await.unwrap_err();
    assert_eq!(err.op(), Some(TransportOp::Send));
    match err {
        EndpointError::Transport(err) => {
            assert_eq!(err.role, Role::Initiator);
            assert_eq!(err.source.kind(), io::ErrorKind::ConnectionRefused);
        }
        other => panic!("expected send failure, got {:?}", other),
    }

    let responder = Endpoint::new(
        fast_config(Role::Responder, 19252, 19251, 3),
        BrokenTransport { local: addr(19252) },
    );
    let err = responder.run().await.unwrap_err();
    assert_eq!(err.op(), Some(TransportOp::Receive));
    match err {
        EndpointError::Transport(err) => {
            assert_eq!(err.role, Role::Responder);
            assert_eq!(err.source.kind(), io::ErrorKind::ConnectionReset);
        }
        other => panic!("expected receive failure, got {:?}", other),
    }
}

#[test]
fn panicked_thread_is_reported_while_peer_blocks() {
    let (outcomes, receiver) = mpsc::channel();

    // Responder stays blocked until the end of the test.
    let (_release, blocked) = mpsc::channel::<()>();
    spawn_context(
        Role::Responder,
        move || {
            let _ = blocked.recv();
            Err(EndpointError::StartAborted(Role::Responder))
        },
        outcomes.clone(),
    )
    .unwrap();

    spawn_context(Role::Initiator, || panic!("endpoint bug"), outcomes).unwrap();

    match collect_outcomes(&receiver) {
        Err(LaunchError::Panicked(role)) => assert_eq!(role, Role::Initiator),
        other => panic!("expected panicked initiator, got {:?}", other),
    }
}
