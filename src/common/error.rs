//! Errors of the exchange.

use std::{fmt, io, net::SocketAddr};

use thiserror::Error;

use super::role::Role;

/// Operation on the transport, which can fail.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TransportOp {
    /// Creating the execution runtime for the endpoint.
    Runtime,
    /// Creating the socket and binding it to the local address.
    Bind,
    /// Sending a token.
    Send,
    /// Receiving a token.
    Receive,
}

impl fmt::Display for TransportOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransportOp::Runtime => "runtime",
            TransportOp::Bind => "bind",
            TransportOp::Send => "send",
            TransportOp::Receive => "receive",
        };
        f.write_str(name)
    }
}

/// Transport operation failed.
///
/// There is only one category of failure, distinguished by the operation
/// and the underlying system error. None of them is recoverable.
#[derive(Debug, Error)]
#[error("[{role}] {op} failed: {source}")]
pub struct TransportError {
    /// Role of the failed endpoint.
    pub role: Role,
    /// Operation which failed.
    pub op: TransportOp,
    /// Underlying system error.
    #[source]
    pub source: io::Error,
}

impl TransportError {
    /// Creates error of `op` failed on the endpoint of `role`.
    pub(crate) fn new(role: Role, op: TransportOp, source: io::Error) -> Self {
        Self { role, op, source }
    }
}

/// Error returned from the endpoint routine.
#[derive(Debug, Error)]
pub enum EndpointError {
    /// Transport operation failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Endpoint config is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Initiator gave up before the first round, because the peer failed to come up.
    #[error("[{0}] start aborted: peer endpoint failed before the first round")]
    StartAborted(Role),
}

impl EndpointError {
    /// Returns the failed transport operation, if any.
    pub fn op(&self) -> Option<TransportOp> {
        match self {
            EndpointError::Transport(err) => Some(err.op),
            EndpointError::Config(_) | EndpointError::StartAborted(_) => None,
        }
    }
}

/// Invalid endpoint or launcher config.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Endpoint would send tokens to itself.
    #[error("local and peer address are the same: {0}")]
    SameAddress(SocketAddr),

    /// Receive buffer can not hold the peer token.
    #[error("buffer size {buffer_size} is less than token size {need}")]
    BufferTooSmall {
        /// Requested buffer size.
        buffer_size: usize,
        /// Size of the token which must fit.
        need: usize,
    },

    /// Endpoint config was given to the wrong launcher slot.
    #[error("expected {expected} config, got {got}")]
    WrongRole {
        /// Role expected in the slot.
        expected: Role,
        /// Role of the given config.
        got: Role,
    },

    /// Endpoints do not address each other.
    #[error("endpoints are not mirrored: {0} sends to {1}")]
    NotMirrored(SocketAddr, SocketAddr),

    /// Endpoints disagree on the number of rounds.
    #[error("round counts differ: initiator {0}, responder {1}")]
    RoundsMismatch(u32, u32),
}
