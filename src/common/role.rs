//! Definition of endpoint [`Role`].

use std::fmt;

use super::config::{PORT_A, PORT_B};
use super::token::{TOKEN_FROM_A, TOKEN_FROM_B};

/// Specifies which side of the exchange an endpoint plays.
///
/// Both roles run the same endpoint routine and differ only
/// in the initial [state][super::state::EndpointState], the fixed port and the token they send.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    /// Speaks first in every round ("Process A").
    Initiator,
    /// Only replies to received tokens ("Process B").
    Responder,
}

impl Role {
    /// Returns the opposite role.
    pub fn peer(self) -> Self {
        match self {
            Role::Initiator => Role::Responder,
            Role::Responder => Role::Initiator,
        }
    }

    /// Returns the literal token this role puts on the wire.
    pub fn token(self) -> &'static str {
        match self {
            Role::Initiator => TOKEN_FROM_A,
            Role::Responder => TOKEN_FROM_B,
        }
    }

    /// Returns the fixed local port of the role.
    pub fn default_port(self) -> u16 {
        match self {
            Role::Initiator => PORT_A,
            Role::Responder => PORT_B,
        }
    }

    /// Human-readable label used in progress output.
    pub fn label(self) -> &'static str {
        match self {
            Role::Initiator => "Process A",
            Role::Responder => "Process B",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
