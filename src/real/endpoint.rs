//! Definition of [`Endpoint`], which drives one side of the exchange.

use std::net::{IpAddr, SocketAddr};

use log::{debug, info};

use crate::common::{
    config::{EndpointConfig, HOST},
    error::{EndpointError, TransportError, TransportOp},
    role::Role,
    state::EndpointState,
    token::Token,
};

use super::{
    barrier::{self, BarrierOutcome, ReadyNotifier, ReadyWatcher},
    transport::{Transport, UdpTransport},
};

////////////////////////////////////////////////////////////////////////////////

/// Summary of one finished endpoint run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExchangeReport {
    /// Role of the endpoint.
    pub role: Role,
    /// Configured number of rounds.
    pub rounds: u32,
    /// Number of completed rounds.
    pub completed: u32,
    /// Number of sent tokens.
    pub sent: u32,
    /// Number of received tokens.
    pub received: u32,
    /// The last received token, if any.
    pub last_token: Option<Token>,
    /// State the endpoint ended in.
    pub state: EndpointState,
}

impl ExchangeReport {
    /// Creates empty report of the endpoint before the first round.
    fn new(role: Role, rounds: u32) -> Self {
        Self {
            role,
            rounds,
            completed: 0,
            sent: 0,
            received: 0,
            last_token: None,
            state: EndpointState::initial(role, rounds),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Represents one side of the exchange.
///
/// Endpoint exclusively owns its [transport][Transport] from bind until
/// [`run`][Endpoint::run] returns, then the transport is dropped and the socket is closed.
///
/// Both roles share one routine. Role decides only the initial state,
/// which token is sent and at which transition a round is counted.
pub struct Endpoint<T: Transport> {
    /// Endpoint parameters.
    config: EndpointConfig,
    /// Bound transport, owned until the run ends.
    transport: T,
    /// Fired right before the endpoint starts its rounds.
    notifier: Option<ReadyNotifier>,
    /// Observed by the start barrier of the initiator.
    watcher: Option<ReadyWatcher>,
}

impl Endpoint<UdpTransport> {
    /// Creates UDP socket bound to the configured local address.
    pub async fn bind(config: EndpointConfig) -> Result<Self, TransportError> {
        let transport = UdpTransport::bind(config.local)
            .await
            .map_err(|e| TransportError::new(config.role, TransportOp::Bind, e))?;

        Ok(Self::new(config, transport))
    }
}

impl<T: Transport> Endpoint<T> {
    /// Creates endpoint over already bound transport.
    pub fn new(config: EndpointConfig, transport: T) -> Self {
        Self {
            config,
            transport,
            notifier: None,
            watcher: None,
        }
    }

    /// Sets notifier which is fired once the endpoint is about to start.
    pub fn with_notifier(mut self, notifier: ReadyNotifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Sets watcher which the [start barrier][crate::common::config::StartBarrier] observes.
    pub fn with_watcher(mut self, watcher: ReadyWatcher) -> Self {
        self.watcher = Some(watcher);
        self
    }

    /// Maps I/O error of `op` into [`TransportError`] of this endpoint role.
    fn transport_err(&self, op: TransportOp) -> impl FnOnce(std::io::Error) -> TransportError {
        let role = self.config.role;
        move |e| TransportError::new(role, op, e)
    }

    /// Runs all configured rounds.
    ///
    /// Returns after the last round or on the first transport failure.
    /// There is no timeout: if the peer never answers, the call never returns.
    pub async fn run(mut self) -> Result<ExchangeReport, EndpointError> {
        let role = self.config.role;
        let rounds = self.config.rounds;
        let peer = self.config.peer;
        let token = Token::of(role);

        let port = self
            .transport
            .local_addr()
            .map(|addr| addr.port())
            .unwrap_or(self.config.local.port());
        info!("[{}] Initialized. Port: {}", role, port);

        if let Some(notifier) = self.notifier.take() {
            notifier.notify();
        }

        if role == Role::Initiator {
            let outcome = barrier::pass(role, self.config.barrier, self.watcher.take()).await;
            if outcome == BarrierOutcome::PeerFailed {
                return Err(EndpointError::StartAborted(role));
            }
        }

        let mut buf = vec![0u8; self.config.buffer_size()];
        let mut report = ExchangeReport::new(role, rounds);
        let mut state = report.state;

        info!("[{}] Initial state: {}", role, state);

        while !state.is_done() {
            match state {
                EndpointState::Ready => {
                    if role == Role::Initiator {
                        info!("");
                        info!("--- Iteration {} ({}) ---", report.completed + 1, role);
                    }
                    info!("[{}] Working ({})...", role, state);
                    tokio::time::sleep(self.config.work).await;
                }

                EndpointState::Sending => {
                    info!("[{}] Sending token to {}...", role, role.peer());
                    self.transport
                        .send_to(token.as_bytes(), peer)
                        .await
                        .map_err(self.transport_err(TransportOp::Send))?;

                    report.sent += 1;
                    if role == Role::Responder {
                        report.completed += 1;
                    }
                }

                EndpointState::Waiting => {
                    info!("[{}] {} (waiting for a token from {})...", role, state, role.peer());
                    let (len, from) = self
                        .transport
                        .recv_from(&mut buf)
                        .await
                        .map_err(self.transport_err(TransportOp::Receive))?;

                    // Source is not checked against the peer address.
                    debug!("[{}] Received {} bytes from {}", role, len, from);
                    let received = Token::from_datagram(&buf, len);

                    report.received += 1;
                    if role == Role::Responder {
                        info!("");
                        info!("--- Iteration {} ({}) ---", report.completed + 1, role);
                    }
                    info!("[{}] Token received! Message '{}'.", role, received);
                    if role == Role::Initiator {
                        report.completed += 1;
                    }
                    report.last_token = Some(received);
                }

                EndpointState::Done => {}
            }

            let next = state.next(role, report.completed, rounds);
            debug!("[{}] {} -> {}", role, state, next);
            state = next;
        }

        report.state = state;
        info!("[{}] Finished.", role);

        Ok(report)
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Binds UDP endpoint by `config` and runs it to completion.
///
/// `notifier` is dropped unfired if bind fails, which tells the watching peer to give up.
pub async fn serve(
    config: EndpointConfig,
    notifier: Option<ReadyNotifier>,
    watcher: Option<ReadyWatcher>,
) -> Result<ExchangeReport, EndpointError> {
    let mut endpoint = Endpoint::bind(config).await?;
    endpoint.notifier = notifier;
    endpoint.watcher = watcher;
    endpoint.run().await
}

/// Runs endpoint by `config` on the calling thread, blocking it until the endpoint finishes.
pub fn run_blocking(
    config: EndpointConfig,
    notifier: Option<ReadyNotifier>,
    watcher: Option<ReadyWatcher>,
) -> Result<ExchangeReport, EndpointError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_io()
        .enable_time()
        .build()
        .map_err(|e| TransportError::new(config.role, TransportOp::Runtime, e))?;

    runtime.block_on(serve(config, notifier, watcher))
}

/// Runs endpoint of `role` bound to `local_port` on the loopback host,
/// exchanging `rounds` tokens with the peer at `peer_address:peer_port`.
///
/// Uses the fixed work duration and start delay.
/// Blocks until all rounds complete or the first transport failure.
pub fn run(
    role: Role,
    local_port: u16,
    peer_port: u16,
    peer_address: IpAddr,
    rounds: u32,
) -> Result<ExchangeReport, EndpointError> {
    let config = EndpointConfig::new(
        role,
        SocketAddr::new(HOST, local_port),
        SocketAddr::new(peer_address, peer_port),
        rounds,
    )?;

    run_blocking(config, None, None)
}
