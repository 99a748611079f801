//! Coordinated shutdown.
//!
//! The first SHUTDOWN moves the registry to `Draining`, which makes every later
//! CREATE/SEND/RECEIVE fail with 503. With a positive timeout the pending waiters of all queues are
//! then canceled, racing the deadline. Whichever side finishes first decides the answer, a drain
//! that lost is told to stop and leaves the remaining waiters to their own timers.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::BrokerError;
use crate::registry::{QueueRegistry, State};

/// Result of a SHUTDOWN that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Drain {
    /// Every waiter was canceled, or a previous shutdown already got there (200)
    Completed,
    /// No drain was asked for, or the deadline passed first (204)
    Pending,
}

impl QueueRegistry {
    pub async fn shutdown(self: &Arc<Self>, timeout: Duration) -> Result<Drain, BrokerError> {
        match self.begin_draining() {
            State::Drained => return Ok(Drain::Completed),
            State::Running => log::info!("shutdown requested, draining {} queues", self.len()),
            State::Draining => log::debug!("shutdown requested while draining"),
        }

        if timeout.is_zero() {
            return Ok(Drain::Pending);
        }

        let stop = CancellationToken::new();
        let drain = {
            let registry = self.clone();
            let stop = stop.clone();
            tokio::task::spawn_blocking(move || registry.drain(&stop))
        };

        tokio::select! {
            biased;
            res = drain => {
                res?;
                Ok(Drain::Completed)
            }
            _ = tokio::time::sleep(timeout) => {
                stop.cancel();
                log::info!("shutdown deadline of {timeout:?} passed before the drain finished");
                Ok(Drain::Pending)
            }
        }
    }

    /// Clears every queue, the set is fixed because membership changes are rejected once
    /// draining. Records `Drained` only when the pass ran to the end.
    fn drain(&self, stop: &CancellationToken) {
        for queue in self.snapshot() {
            if !queue.clear(stop) {
                log::debug!("drain stopped at {}", queue.path());
                return;
            }
        }
        if !stop.is_cancelled() {
            self.set_drained();
            log::info!("drain completed");
        }
    }
}
