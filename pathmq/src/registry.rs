use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use crate::error::BrokerError;
use crate::queue::NamedQueue;
use crate::types::{HashMap, Message};
use crate::waiter::Outcome;

pub type Queue = NamedQueue<Message>;

/// Lifecycle of the broker, moves forward only
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum State {
    Running = 0,
    Draining = 1,
    Drained = 2,
}

impl State {
    #[inline]
    fn from_u8(v: u8) -> State {
        match v {
            0 => State::Running,
            1 => State::Draining,
            _ => State::Drained,
        }
    }
}

/// Path to queue map plus the broker lifecycle.
///
/// The map lock only covers lookups and inserts. A queue is cloned out of the map before any of
/// its own operations run, so the two locks are never held together.
pub struct QueueRegistry {
    queues: RwLock<HashMap<String, Arc<Queue>>>,
    state: AtomicU8,
}

impl Default for QueueRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for QueueRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QueueRegistry {{ state: {:?}, queues: {} }}", self.state(), self.len())
    }
}

impl QueueRegistry {
    pub fn new() -> Self {
        Self { queues: RwLock::new(HashMap::default()), state: AtomicU8::new(State::Running as u8) }
    }

    #[inline]
    pub fn state(&self) -> State {
        State::from_u8(self.state.load(Ordering::Acquire))
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.state() == State::Running
    }

    /// Idempotent, an existing queue keeps its buffered messages and waiters.
    pub fn create(&self, path: &str) -> Result<(), BrokerError> {
        self.check_running()?;
        if self.queues.read().contains_key(path) {
            return Ok(());
        }
        self.queues.write().entry(path.to_owned()).or_insert_with(|| {
            log::debug!("create queue {path}");
            Arc::new(Queue::new(path))
        });
        Ok(())
    }

    pub fn send(&self, path: &str, msg: Message) -> Result<(), BrokerError> {
        self.check_running()?;
        self.get(path)?.send(msg);
        Ok(())
    }

    /// `Ok(None)` when no message arrived in time, or the wait was canceled by a shutdown.
    pub async fn receive(&self, path: &str, timeout: Duration) -> Result<Option<Message>, BrokerError> {
        self.check_running()?;
        let queue = self.get(path)?;
        match queue.receive(timeout).await? {
            Outcome::Delivered(msg) => Ok(Some(msg)),
            Outcome::Empty => Ok(None),
            Outcome::Canceled(cause) => {
                log::debug!("receive on {path} canceled, {cause:?}");
                Ok(None)
            }
        }
    }

    #[inline]
    pub fn get(&self, path: &str) -> Result<Arc<Queue>, BrokerError> {
        self.queues.read().get(path).cloned().ok_or(BrokerError::NotFound)
    }

    #[inline]
    pub fn contains(&self, path: &str) -> bool {
        self.queues.read().contains_key(path)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.queues.read().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub(crate) fn snapshot(&self) -> Vec<Arc<Queue>> {
        self.queues.read().values().cloned().collect()
    }

    /// `Running -> Draining`, later calls leave the state alone.
    #[inline]
    pub(crate) fn begin_draining(&self) -> State {
        match self.state.compare_exchange(
            State::Running as u8,
            State::Draining as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => State::Running,
            Err(prev) => State::from_u8(prev),
        }
    }

    #[inline]
    pub(crate) fn set_drained(&self) {
        self.state.store(State::Drained as u8, Ordering::Release);
    }

    #[inline]
    fn check_running(&self) -> Result<(), BrokerError> {
        if self.is_running() {
            Ok(())
        } else {
            Err(BrokerError::ServiceUnavailable)
        }
    }
}
