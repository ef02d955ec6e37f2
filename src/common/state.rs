//! Definition of the endpoint state machine.

use std::fmt;

use super::role::Role;

/// Represents possible states of an endpoint during the exchange.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EndpointState {
    /// Endpoint is about to do local work.
    Ready,
    /// Endpoint emits its token to the peer.
    Sending,
    /// Endpoint is blocked until a token arrives.
    Waiting,
    /// All rounds are completed.
    Done,
}

impl EndpointState {
    /// Returns the state in which endpoint of specified role starts.
    ///
    /// With zero rounds there is nothing to exchange, so endpoint starts in [`EndpointState::Done`].
    pub fn initial(role: Role, rounds: u32) -> Self {
        if rounds == 0 {
            return EndpointState::Done;
        }
        match role {
            Role::Initiator => EndpointState::Ready,
            Role::Responder => EndpointState::Waiting,
        }
    }

    /// Returns the state following `self`.
    ///
    /// `completed` is the number of rounds completed so far,
    /// including the one finished by leaving `self`.
    /// Initiator completes a round on receive, responder completes a round on send.
    pub fn next(self, role: Role, completed: u32, rounds: u32) -> Self {
        let finished = completed >= rounds;
        match (role, self) {
            (_, EndpointState::Done) => EndpointState::Done,
            (_, EndpointState::Ready) => EndpointState::Sending,

            (Role::Initiator, EndpointState::Sending) => EndpointState::Waiting,
            (Role::Initiator, EndpointState::Waiting) if finished => EndpointState::Done,
            (Role::Initiator, EndpointState::Waiting) => EndpointState::Ready,

            (Role::Responder, EndpointState::Waiting) => EndpointState::Ready,
            (Role::Responder, EndpointState::Sending) if finished => EndpointState::Done,
            (Role::Responder, EndpointState::Sending) => EndpointState::Waiting,
        }
    }

    /// Checks if the state is terminal.
    pub fn is_done(self) -> bool {
        self == EndpointState::Done
    }
}

impl fmt::Display for EndpointState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EndpointState::Ready => "READY",
            EndpointState::Sending => "SENDING",
            EndpointState::Waiting => "WAITING",
            EndpointState::Done => "DONE",
        };
        f.write_str(name)
    }
}
