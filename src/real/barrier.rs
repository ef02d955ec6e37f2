//! Start barrier between the responder and the initiator.
//!
//! The responder must be listening before the first token leaves the initiator,
//! otherwise the token is lost and both endpoints block forever.
//! By default the initiator just sleeps [a fixed delay][crate::common::config::STARTUP_DELAY],
//! which is fragile under scheduling pressure.
//! [`ready_channel`] lets the responder report that its socket is bound:
//! with [`StartBarrier::Signal`] the initiator waits for that report instead of sleeping,
//! with [`StartBarrier::Delay`] the report is only used to give up early if the responder failed.

use log::{debug, warn};
use tokio::sync::oneshot;

use crate::common::{config::StartBarrier, role::Role};

/// Creates connected pair of [`ReadyNotifier`] and [`ReadyWatcher`].
pub fn ready_channel() -> (ReadyNotifier, ReadyWatcher) {
    let (sender, receiver) = oneshot::channel();
    (ReadyNotifier { sender }, ReadyWatcher { receiver })
}

/// Responder side of the start barrier.
///
/// Dropping the notifier without calling [`notify`][ReadyNotifier::notify]
/// means the responder failed to come up.
pub struct ReadyNotifier {
    /// Dropped unfired if the responder fails.
    sender: oneshot::Sender<()>,
}

impl ReadyNotifier {
    /// Reports that the socket is bound and the endpoint is about to wait for tokens.
    pub fn notify(self) {
        // Watcher may be gone already, nobody to tell then.
        let _ = self.sender.send(());
    }
}

/// Initiator side of the start barrier.
pub struct ReadyWatcher {
    /// Resolves on notify or on the notifier drop.
    receiver: oneshot::Receiver<()>,
}

/// Outcome of waiting on the barrier.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BarrierOutcome {
    /// The first round can start.
    Proceed,
    /// The peer failed before it was ready.
    PeerFailed,
}

/// Waits on the `barrier` before the first round of `role`.
///
/// `watcher` is optional: without it [`StartBarrier::Signal`] can not be observed
/// and the endpoint starts immediately.
pub async fn pass(role: Role, barrier: StartBarrier, watcher: Option<ReadyWatcher>) -> BarrierOutcome {
    match (barrier, watcher) {
        (StartBarrier::Immediate, _) => BarrierOutcome::Proceed,

        (StartBarrier::Delay(delay), None) => {
            debug!("[{}] Sleeping {:?} before the first round", role, delay);
            tokio::time::sleep(delay).await;
            BarrierOutcome::Proceed
        }

        (StartBarrier::Delay(delay), Some(mut watcher)) => {
            debug!("[{}] Sleeping {:?} before the first round", role, delay);
            let sleep = tokio::time::sleep(delay);
            tokio::pin!(sleep);

            let mut peer_reported = false;
            loop {
                tokio::select! {
                    _ = &mut sleep => return BarrierOutcome::Proceed,
                    status = &mut watcher.receiver, if !peer_reported => {
                        if status.is_err() {
                            return BarrierOutcome::PeerFailed;
                        }
                        // Peer is ready, but the delay is still served in full.
                        peer_reported = true;
                    }
                }
            }
        }

        (StartBarrier::Signal, Some(watcher)) => {
            debug!("[{}] Waiting for the peer readiness signal", role);
            match watcher.receiver.await {
                Ok(()) => BarrierOutcome::Proceed,
                Err(_) => BarrierOutcome::PeerFailed,
            }
        }

        (StartBarrier::Signal, None) => {
            warn!("[{}] Readiness signal requested without watcher, starting immediately", role);
            BarrierOutcome::Proceed
        }
    }
}
