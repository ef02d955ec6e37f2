//! Fixed exchange parameters and [`EndpointConfig`].

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use super::error::ConfigError;
use super::role::Role;

/// Host both endpoints live on.
pub const HOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

/// Port of the [initiator][Role::Initiator].
pub const PORT_A: u16 = 9001;

/// Port of the [responder][Role::Responder].
pub const PORT_B: u16 = 9002;

/// Number of rounds in one run.
pub const MAX_ITERATIONS: u32 = 10;

/// Size of the receive buffer.
pub const BUFFER_SIZE: usize = 1024;

/// Duration of the simulated work done in every round.
pub const WORK_DURATION: Duration = Duration::from_secs(1);

/// Delay the initiator waits before the first round.
pub const STARTUP_DELAY: Duration = Duration::from_secs(1);

////////////////////////////////////////////////////////////////////////////////

/// Specifies what the initiator waits on before its first round.
///
/// The responder ignores the barrier, it always starts by waiting for a token.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StartBarrier {
    /// Start the first round right after bind.
    Immediate,
    /// Sleep a fixed delay and hope the peer is listening by then.
    Delay(Duration),
    /// Wait until the peer reports that its socket is bound.
    Signal,
}

/// Parameters of one endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EndpointConfig {
    /// Role of the endpoint.
    pub role: Role,
    /// Address the endpoint socket is bound to.
    pub local: SocketAddr,
    /// Address tokens are sent to.
    pub peer: SocketAddr,
    /// Number of rounds to complete.
    pub rounds: u32,
    /// Duration of the simulated work.
    pub work: Duration,
    /// What the initiator waits on before the first round.
    pub barrier: StartBarrier,
    /// Size of the receive buffer, set only through [`EndpointConfig::with_buffer_size`].
    buffer_size: usize,
}

impl EndpointConfig {
    /// Creates config with default timing and buffer size.
    ///
    /// Local and peer addresses must differ.
    pub fn new(
        role: Role,
        local: SocketAddr,
        peer: SocketAddr,
        rounds: u32,
    ) -> Result<Self, ConfigError> {
        if local == peer {
            return Err(ConfigError::SameAddress(local));
        }

        Ok(Self::build(role, local, peer, rounds))
    }

    /// Creates config without validation.
    fn build(role: Role, local: SocketAddr, peer: SocketAddr, rounds: u32) -> Self {
        Self {
            role,
            local,
            peer,
            rounds,
            work: WORK_DURATION,
            barrier: match role {
                Role::Initiator => StartBarrier::Delay(STARTUP_DELAY),
                Role::Responder => StartBarrier::Immediate,
            },
            buffer_size: BUFFER_SIZE,
        }
    }

    /// Config of the initiator exactly as in the fixed setup.
    pub fn initiator() -> Self {
        Self::fixed(Role::Initiator)
    }

    /// Config of the responder exactly as in the fixed setup.
    pub fn responder() -> Self {
        Self::fixed(Role::Responder)
    }

    /// Config of `role` on its fixed port, addressing the fixed peer port.
    fn fixed(role: Role) -> Self {
        Self::build(
            role,
            SocketAddr::new(HOST, role.default_port()),
            SocketAddr::new(HOST, role.peer().default_port()),
            MAX_ITERATIONS,
        )
    }

    /// Overrides duration of the simulated work.
    pub fn with_work_duration(mut self, work: Duration) -> Self {
        self.work = work;
        self
    }

    /// Overrides the start barrier.
    pub fn with_barrier(mut self, barrier: StartBarrier) -> Self {
        self.barrier = barrier;
        self
    }

    /// Overrides size of the receive buffer.
    ///
    /// Buffer must be able to hold the peer token.
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Result<Self, ConfigError> {
        let need = self.role.peer().token().len();
        if buffer_size < need {
            return Err(ConfigError::BufferTooSmall { buffer_size, need });
        }
        self.buffer_size = buffer_size;
        Ok(self)
    }

    /// Size of the receive buffer.
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }
}
