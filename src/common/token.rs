//! Definition of [`Token`] which is passed between endpoints.

use std::fmt;

use bytes::Bytes;

use super::role::Role;

/// Payload sent by the [initiator][Role::Initiator].
pub const TOKEN_FROM_A: &str = "TOKEN_FROM_A";

/// Payload sent by the [responder][Role::Responder].
pub const TOKEN_FROM_B: &str = "TOKEN_FROM_B";

/// Represents one token, which is exactly one datagram on the wire.
///
/// Token carries no envelope, sequence number or length prefix.
/// The datagram boundary is the message boundary, so received token
/// is just the bytes reported by the transport.
/// Content and origin are never validated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    /// Datagram payload.
    bytes: Bytes,
}

impl Token {
    /// Returns the token which is sent by specified role.
    pub fn of(role: Role) -> Self {
        Self {
            bytes: Bytes::from_static(role.token().as_bytes()),
        }
    }

    /// Creates token from the received datagram.
    ///
    /// Only the first `len` bytes of `buf` are taken,
    /// `len` is clamped to the buffer length.
    pub fn from_datagram(buf: &[u8], len: usize) -> Self {
        let len = len.min(buf.len());
        Self {
            bytes: Bytes::copy_from_slice(&buf[..len]),
        }
    }

    /// Raw token bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Length of the token in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` for the empty datagram.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.bytes))
    }
}
