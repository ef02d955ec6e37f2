//! Definition of the [`Transport`] trait and its datagram implementations.

use std::{
    io,
    net::SocketAddr,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use tokio::net::UdpSocket;

use crate::common::role::Role;

////////////////////////////////////////////////////////////////////////////////

/// Specifies connectionless transport, which is used by the [endpoint][super::endpoint::Endpoint].
///
/// Every call to [`send_to`][Transport::send_to] emits exactly one datagram,
/// every call to [`recv_from`][Transport::recv_from] blocks until exactly one datagram arrives.
#[async_trait]
pub trait Transport: Send {
    /// Sends one datagram to the specified address.
    async fn send_to(&mut self, payload: &[u8], to: SocketAddr) -> io::Result<usize>;

    /// Receives one datagram into `buf`.
    /// Returns the number of received bytes and the source address.
    async fn recv_from(&mut self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)>;

    /// Returns the bound local address.
    fn local_addr(&self) -> io::Result<SocketAddr>;
}

////////////////////////////////////////////////////////////////////////////////

/// UDP socket bound for the whole life of an endpoint.
///
/// Socket is closed when the transport is dropped.
pub struct UdpTransport {
    /// Bound socket.
    socket: UdpSocket,
}

impl UdpTransport {
    /// Creates the socket and binds it to `addr`.
    pub async fn bind(addr: SocketAddr) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr).await?;
        Ok(Self { socket })
    }
}

#[async_trait]
impl Transport for UdpTransport {
    async fn send_to(&mut self, payload: &[u8], to: SocketAddr) -> io::Result<usize> {
        self.socket.send_to(payload, to).await
    }

    async fn recv_from(&mut self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        self.socket.recv_from(buf).await
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}

////////////////////////////////////////////////////////////////////////////////

/// One datagram observed on the wire.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WireEvent {
    /// Role of the sending endpoint.
    pub from: Role,
    /// Destination address.
    pub to: SocketAddr,
    /// Sent bytes.
    pub payload: Vec<u8>,
}

/// Shared log of [wire events][WireEvent].
pub type WireLog = Arc<Mutex<Vec<WireEvent>>>;

/// Wraps another transport and records every sent datagram to the [`WireLog`].
///
/// Event is recorded before the datagram leaves, so the peer can not
/// record its reply ahead of it. Two endpoints sharing one log
/// produce the global order of datagrams on the wire.
pub struct RecordingTransport<T> {
    /// Wrapped transport.
    inner: T,
    /// Role of the endpoint owning the transport.
    role: Role,
    /// Log shared with the peer.
    log: WireLog,
}

impl<T: Transport> RecordingTransport<T> {
    /// Wraps `inner` of the endpoint with specified role.
    pub fn new(inner: T, role: Role, log: WireLog) -> Self {
        Self { inner, role, log }
    }

    /// Appends sent datagram to the log.
    fn record(&self, payload: &[u8], to: SocketAddr) {
        // Poisoned log means some recording endpoint panicked, keep recording anyway.
        let mut log = self.log.lock().unwrap_or_else(|e| e.into_inner());
        log.push(WireEvent {
            from: self.role,
            to,
            payload: payload.to_vec(),
        });
    }
}

#[async_trait]
impl<T: Transport> Transport for RecordingTransport<T> {
    async fn send_to(&mut self, payload: &[u8], to: SocketAddr) -> io::Result<usize> {
        self.record(payload, to);
        self.inner.send_to(payload, to).await
    }

    async fn recv_from(&mut self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
        self.inner.recv_from(buf).await
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner.local_addr()
    }
}
