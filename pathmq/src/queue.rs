use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use scopeguard::ScopeGuard;
use tokio_util::sync::CancellationToken;

use crate::error::BrokerError;
use crate::waiter::{CancelCause, Outcome, Waiter, WaiterId};

/// Buffered messages and pending receivers of one path.
///
/// At most one of the two FIFOs is non-empty whenever the lock is released: a send first serves
/// the oldest waiter, a receive first takes the oldest buffered message.
pub struct NamedQueue<T> {
    path: String,
    inner: Mutex<Inner<T>>,
    waiter_id: AtomicU64,
}

struct Inner<T> {
    buffer: VecDeque<T>,
    waiters: VecDeque<Arc<Waiter<T>>>,
    // set by the first clear, no waiter is registered afterwards
    closed: bool,
}

impl<T> fmt::Debug for NamedQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        write!(f, "NamedQueue {{ path: {}, buffered: {}, waiting: {} }}", self.path, inner.buffer.len(), inner.waiters.len())
    }
}

impl<T> NamedQueue<T>
where
    T: Send + 'static,
{
    pub fn new<P: Into<String>>(path: P) -> Self {
        Self {
            path: path.into(),
            inner: Mutex::new(Inner { buffer: VecDeque::new(), waiters: VecDeque::new(), closed: false }),
            waiter_id: AtomicU64::new(1),
        }
    }

    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Delivers to the oldest waiter that can still take a message, otherwise buffers. Never blocks.
    pub fn send(&self, msg: T) {
        let mut msg = msg;
        let mut inner = self.inner.lock();
        while let Some(waiter) = inner.waiters.pop_front() {
            //lost to its timer or to a drain, which resolve it themselves
            if !waiter.try_claim() {
                continue;
            }
            waiter.disarm();
            match waiter.deliver(msg) {
                Ok(()) => return,
                Err(m) => {
                    log::debug!("{} waiter {} went away, passing the message on", self.path, waiter.id());
                    msg = m;
                }
            }
        }
        inner.buffer.push_back(msg);
    }

    /// Takes the oldest buffered message, or waits up to `timeout` for one.
    ///
    /// A zero `timeout` never waits and yields [`Outcome::Empty`] on an empty buffer. Once the queue
    /// was cleared an empty buffer yields `Canceled(Shutdown)` instead of waiting. Dropping the
    /// returned future withdraws the waiter.
    pub async fn receive(self: &Arc<Self>, timeout: Duration) -> Result<Outcome<T>, BrokerError> {
        let (waiter, rx) = {
            let mut inner = self.inner.lock();
            if let Some(msg) = inner.buffer.pop_front() {
                return Ok(Outcome::Delivered(msg));
            }
            if timeout.is_zero() {
                return Ok(Outcome::Empty);
            }
            if inner.closed {
                return Ok(Outcome::Canceled(CancelCause::Shutdown));
            }

            let (waiter, rx) = Waiter::new(self.waiter_id.fetch_add(1, Ordering::Relaxed));
            let waiter = Arc::new(waiter);
            let timer = {
                let queue = self.clone();
                let waiter = waiter.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(timeout).await;
                    queue.expire(&waiter, CancelCause::Timeout);
                })
            };
            waiter.set_timer(timer.abort_handle());
            inner.waiters.push_back(waiter.clone());
            (waiter, rx)
        };

        let guard = scopeguard::guard(waiter, |waiter| self.withdraw(&waiter));
        let res = rx.await;
        let _ = ScopeGuard::into_inner(guard);
        res.map_err(|_| BrokerError::Internal(format!("waiter on {} dropped unresolved", self.path)))
    }

    /// Closes the queue to new waiters and cancels every pending one, oldest first.
    ///
    /// Returns false when `stop` interrupted the pass, the remaining waiters then resolve through
    /// their own timers.
    pub fn clear(&self, stop: &CancellationToken) -> bool {
        let mut inner = self.inner.lock();
        inner.closed = true;
        while let Some(waiter) = inner.waiters.pop_front() {
            if stop.is_cancelled() {
                inner.waiters.push_front(waiter);
                return false;
            }
            if waiter.try_claim() {
                waiter.disarm();
                waiter.cancel(CancelCause::Shutdown);
            }
        }
        true
    }

    #[inline]
    pub fn buffered(&self) -> usize {
        self.inner.lock().buffer.len()
    }

    #[inline]
    pub fn waiting(&self) -> usize {
        self.inner.lock().waiters.len()
    }

    #[cfg(test)]
    pub(crate) fn hold_lock(&self) -> impl Sized + '_ {
        self.inner.lock()
    }

    fn expire(&self, waiter: &Waiter<T>, cause: CancelCause) {
        if waiter.try_claim() {
            self.remove_waiter(waiter.id());
            waiter.cancel(cause);
        }
    }

    fn withdraw(&self, waiter: &Waiter<T>) {
        if waiter.try_claim() {
            waiter.disarm();
            self.remove_waiter(waiter.id());
        }
    }

    #[inline]
    fn remove_waiter(&self, id: WaiterId) {
        self.inner.lock().waiters.retain(|w| w.id() != id);
    }
}
