//! One pending RECEIVE.
//!
//! Three parties race to resolve a waiter: a SEND delivering a message, its timer firing and a
//! shutdown drain. Each of them must win [`Waiter::try_claim`] before touching the result slot, so
//! exactly one of them resolves it and the others back off.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::task::AbortHandle;

pub type WaiterId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelCause {
    Timeout,
    Shutdown,
}

/// How a RECEIVE ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Delivered(T),
    /// Nothing buffered and the caller asked not to wait
    Empty,
    Canceled(CancelCause),
}

pub struct Waiter<T> {
    id: WaiterId,
    claimed: AtomicBool,
    slot: Mutex<Option<oneshot::Sender<Outcome<T>>>>,
    timer: Mutex<Option<AbortHandle>>,
}

impl<T> fmt::Debug for Waiter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Waiter {{ id: {}, claimed: {} }}", self.id, self.is_claimed())
    }
}

impl<T> Waiter<T> {
    pub(crate) fn new(id: WaiterId) -> (Self, oneshot::Receiver<Outcome<T>>) {
        let (tx, rx) = oneshot::channel();
        let w = Waiter { id, claimed: AtomicBool::new(false), slot: Mutex::new(Some(tx)), timer: Mutex::new(None) };
        (w, rx)
    }

    #[inline]
    pub fn id(&self) -> WaiterId {
        self.id
    }

    /// One-way `unclaimed -> claimed`, true only for the single caller that flipped it.
    #[inline]
    pub fn try_claim(&self) -> bool {
        self.claimed.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).is_ok()
    }

    #[inline]
    pub fn is_claimed(&self) -> bool {
        self.claimed.load(Ordering::Acquire)
    }

    #[inline]
    pub(crate) fn set_timer(&self, timer: AbortHandle) {
        *self.timer.lock() = Some(timer);
    }

    /// Stops the timer task, if it has not fired yet.
    #[inline]
    pub(crate) fn disarm(&self) {
        if let Some(timer) = self.timer.lock().take() {
            timer.abort();
        }
    }

    /// Hands `msg` over, the caller must hold the claim.
    ///
    /// Gives the message back when the receiving side is already gone.
    pub(crate) fn deliver(&self, msg: T) -> Result<(), T> {
        debug_assert!(self.is_claimed());
        let Some(tx) = self.slot.lock().take() else {
            return Err(msg);
        };
        match tx.send(Outcome::Delivered(msg)) {
            Err(Outcome::Delivered(msg)) => Err(msg),
            _ => Ok(()),
        }
    }

    /// Resolves the waiter as canceled, the caller must hold the claim.
    pub(crate) fn cancel(&self, cause: CancelCause) {
        debug_assert!(self.is_claimed());
        if let Some(tx) = self.slot.lock().take() {
            let _ = tx.send(Outcome::Canceled(cause));
        }
    }
}
