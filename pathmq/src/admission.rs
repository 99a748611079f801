use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use pathmq_utils::Counter;

use crate::error::BrokerError;

/// Bounds the number of connections handled at once.
///
/// A permit is taken before a connection is accepted, so excess clients queue in the listen
/// backlog instead of being refused.
pub struct Admission {
    limit: usize,
    permits: Arc<Semaphore>,
    active: Counter,
}

impl Admission {
    pub fn new(limit: usize) -> Arc<Self> {
        let limit = limit.max(1);
        Arc::new(Self { limit, permits: Arc::new(Semaphore::new(limit)), active: Counter::new() })
    }

    pub async fn acquire(self: &Arc<Self>) -> Result<Permit, BrokerError> {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| BrokerError::Internal(format!("admission closed, {e}")))?;
        self.active.inc();
        Ok(Permit { _permit: permit, admission: self.clone() })
    }

    #[inline]
    pub fn limit(&self) -> usize {
        self.limit
    }

    #[inline]
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Connections being handled now, and the highest count seen.
    #[inline]
    pub fn active(&self) -> &Counter {
        &self.active
    }
}

/// Released on drop, whatever way the connection ended
pub struct Permit {
    _permit: OwnedSemaphorePermit,
    admission: Arc<Admission>,
}

impl Drop for Permit {
    fn drop(&mut self) {
        self.admission.active.dec();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn bounded() {
        let a = Admission::new(2);
        let p1 = a.acquire().await.unwrap();
        let _p2 = a.acquire().await.unwrap();
        assert_eq!(a.available(), 0);
        assert_eq!(a.active().count(), 2);

        let third = tokio::spawn({
            let a = a.clone();
            async move { a.acquire().await.map(|_| ()) }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!third.is_finished());

        drop(p1);
        third.await.unwrap().unwrap();
        assert_eq!(a.active().max(), 2);
    }

    #[tokio::test]
    async fn released_on_panic() {
        let a = Admission::new(1);
        let p = a.acquire().await.unwrap();
        let task = tokio::spawn(async move {
            let _p = p;
            panic!("connection task failed");
        });
        assert!(task.await.is_err());
        assert_eq!(a.available(), 1);
        assert_eq!(a.active().count(), 0);
    }

    #[test]
    fn zero_limit_admits_one() {
        assert_eq!(Admission::new(0).limit(), 1);
    }
}
