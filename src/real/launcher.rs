//! Launcher of the two-endpoint exchange.
//!
//! Launcher spawns the responder and the initiator in two separate threads,
//! each driving its own runtime, and waits for both of them to finish.
//! After spawn the threads share nothing except the [start barrier][super::barrier] channel,
//! all interaction goes through the datagrams.

use std::{
    io,
    net::SocketAddr,
    panic::{self, AssertUnwindSafe},
    sync::mpsc::{self, Receiver, Sender},
    thread::{self, JoinHandle},
    time::Duration,
};

use log::info;
use thiserror::Error;

use crate::common::{
    config::{EndpointConfig, StartBarrier, HOST},
    error::{ConfigError, EndpointError},
    role::Role,
};

use super::{
    barrier::{ready_channel, ReadyNotifier, ReadyWatcher},
    endpoint::{run_blocking, ExchangeReport},
};

////////////////////////////////////////////////////////////////////////////////

/// Configs of both endpoints.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LauncherConfig {
    /// Config of the initiator.
    pub initiator: EndpointConfig,
    /// Config of the responder.
    pub responder: EndpointConfig,
}

impl Default for LauncherConfig {
    /// Fixed setup: ports 9001 and 9002 on loopback, 10 rounds, one second of work
    /// and one second of startup delay.
    fn default() -> Self {
        Self {
            initiator: EndpointConfig::initiator(),
            responder: EndpointConfig::responder(),
        }
    }
}

impl LauncherConfig {
    /// Creates launcher config from two endpoint configs.
    ///
    /// Configs must have matching roles, address each other and agree on the number of rounds.
    pub fn new(initiator: EndpointConfig, responder: EndpointConfig) -> Result<Self, ConfigError> {
        if initiator.role != Role::Initiator {
            return Err(ConfigError::WrongRole {
                expected: Role::Initiator,
                got: initiator.role,
            });
        }
        if responder.role != Role::Responder {
            return Err(ConfigError::WrongRole {
                expected: Role::Responder,
                got: responder.role,
            });
        }
        if initiator.peer != responder.local {
            return Err(ConfigError::NotMirrored(initiator.local, initiator.peer));
        }
        if responder.peer != initiator.local {
            return Err(ConfigError::NotMirrored(responder.local, responder.peer));
        }
        if initiator.rounds != responder.rounds {
            return Err(ConfigError::RoundsMismatch(initiator.rounds, responder.rounds));
        }

        Ok(Self {
            initiator,
            responder,
        })
    }

    /// Creates mirrored configs on the loopback host with specified ports and number of rounds.
    pub fn loopback(
        initiator_port: u16,
        responder_port: u16,
        rounds: u32,
    ) -> Result<Self, ConfigError> {
        let initiator_addr = SocketAddr::new(HOST, initiator_port);
        let responder_addr = SocketAddr::new(HOST, responder_port);

        Self::new(
            EndpointConfig::new(Role::Initiator, initiator_addr, responder_addr, rounds)?,
            EndpointConfig::new(Role::Responder, responder_addr, initiator_addr, rounds)?,
        )
    }

    /// Overrides duration of the simulated work of both endpoints.
    pub fn with_work_duration(mut self, work: Duration) -> Self {
        self.initiator.work = work;
        self.responder.work = work;
        self
    }

    /// Overrides the start barrier of the initiator.
    pub fn with_barrier(mut self, barrier: StartBarrier) -> Self {
        self.initiator.barrier = barrier;
        self
    }
}

////////////////////////////////////////////////////////////////////////////////

/// Reports of both endpoints after a successful run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LaunchReport {
    /// Report of the initiator.
    pub initiator: ExchangeReport,
    /// Report of the responder.
    pub responder: ExchangeReport,
}

/// Error of the launch.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// One of the endpoints failed.
    #[error(transparent)]
    Endpoint(#[from] EndpointError),

    /// Execution context for the endpoint could not be created.
    #[error("can not spawn {0} thread: {1}")]
    Spawn(Role, #[source] io::Error),

    /// Endpoint thread panicked.
    #[error("{0} thread panicked")]
    Panicked(Role),
}

/// Result of one endpoint thread, `Err` if the thread panicked.
pub(crate) type Outcome = (Role, thread::Result<Result<ExchangeReport, EndpointError>>);

/// Spawns named thread of `role` running `body` and reporting its outcome to `outcomes`.
///
/// Outcome is reported even if `body` panics, so the launcher never waits for a dead thread.
pub(crate) fn spawn_context<F>(
    role: Role,
    body: F,
    outcomes: Sender<Outcome>,
) -> Result<JoinHandle<()>, LaunchError>
where
    F: FnOnce() -> Result<ExchangeReport, EndpointError> + Send + 'static,
{
    thread::Builder::new()
        .name(role.label().to_owned())
        .spawn(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(body));
            // Launcher returns on the first failure and may not listen anymore.
            let _ = outcomes.send((role, outcome));
        })
        .map_err(|e| LaunchError::Spawn(role, e))
}

/// Spawns thread running endpoint by `config`.
fn spawn_endpoint(
    config: EndpointConfig,
    notifier: Option<ReadyNotifier>,
    watcher: Option<ReadyWatcher>,
    outcomes: Sender<Outcome>,
) -> Result<JoinHandle<()>, LaunchError> {
    let role = config.role;
    spawn_context(role, move || run_blocking(config, notifier, watcher), outcomes)
}

/// Waits for outcomes of both endpoint threads.
///
/// Returns on the first failure or panic, without waiting for the other thread,
/// which may be blocked on receive forever.
pub(crate) fn collect_outcomes(
    outcomes: &Receiver<Outcome>,
) -> Result<(ExchangeReport, ExchangeReport), LaunchError> {
    let mut initiator_report = None;
    let mut responder_report = None;
    let mut aborted = None;

    for _ in 0..2 {
        // Disconnected channel means both threads are gone.
        let Ok((role, outcome)) = outcomes.recv() else {
            break;
        };

        match outcome {
            Err(_) => return Err(LaunchError::Panicked(role)),
            Ok(Ok(report)) => match role {
                Role::Initiator => initiator_report = Some(report),
                Role::Responder => responder_report = Some(report),
            },
            // The cause is reported by the responder.
            Ok(Err(EndpointError::StartAborted(role))) => aborted = Some(role),
            Ok(Err(err)) => return Err(err.into()),
        }
    }

    if let Some(role) = aborted {
        return Err(EndpointError::StartAborted(role).into());
    }

    Ok((
        initiator_report.ok_or(LaunchError::Panicked(Role::Initiator))?,
        responder_report.ok_or(LaunchError::Panicked(Role::Responder))?,
    ))
}

/// Joins finished endpoint thread.
fn join(handle: JoinHandle<()>, role: Role) -> Result<(), LaunchError> {
    handle.join().map_err(|_| LaunchError::Panicked(role))
}

/// Runs the exchange described by `config`.
///
/// Blocks until both endpoints finish all rounds and both threads are joined.
///
/// Returns on the first endpoint failure or panic. The other endpoint can not learn about it
/// and may stay blocked on receive, so the caller is expected to terminate the process then.
/// The only exception is the responder failing before it is bound: the initiator observes it
/// through the start barrier and gives up before sending anything.
pub fn launch(config: LauncherConfig) -> Result<LaunchReport, LaunchError> {
    info!("=== Starting token passing over UDP ===");
    info!(
        "Host: {}, Port A: {}, Port B: {}",
        config.initiator.local.ip(),
        config.initiator.local.port(),
        config.responder.local.port()
    );
    info!("");

    // Create start barrier between the responder and the initiator.
    let (notifier, watcher) = ready_channel();

    // Create channel to receive endpoint outcomes.
    let (outcome_sender, outcome_receiver) = mpsc::channel();

    // Spawn responder, it starts by waiting for the first token.
    let responder = spawn_endpoint(
        config.responder,
        Some(notifier),
        None,
        outcome_sender.clone(),
    )?;

    // Spawn initiator, it passes the start barrier before the first round.
    let initiator = spawn_endpoint(config.initiator, None, Some(watcher), outcome_sender)?;

    // Wait for both endpoints to finish.
    let (initiator_report, responder_report) = collect_outcomes(&outcome_receiver)?;

    // Reap both threads.
    join(initiator, Role::Initiator)?;
    join(responder, Role::Responder)?;

    info!("");
    info!("=== Token passing finished ===");

    Ok(LaunchReport {
        initiator: initiator_report,
        responder: responder_report,
    })
}
