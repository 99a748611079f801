use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::registry::QueueRegistry;
use crate::types::ConnectionId;

/// State shared by every connection of a broker
#[derive(Clone)]
pub struct ServerContext {
    inner: Arc<ServerContextInner>,
}

pub struct ServerContextInner {
    pub registry: Arc<QueueRegistry>,
    conn_ids: AtomicU64,
}

impl Deref for ServerContext {
    type Target = ServerContextInner;
    #[inline]
    fn deref(&self) -> &Self::Target {
        self.inner.as_ref()
    }
}

impl ServerContext {
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> ServerContextBuilder {
        ServerContextBuilder::default()
    }

    /// Ids start at 1 and are never reused.
    #[inline]
    pub fn next_conn_id(&self) -> ConnectionId {
        self.conn_ids.fetch_add(1, Ordering::Relaxed)
    }
}

impl fmt::Debug for ServerContext {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ServerContext {{ registry: {:?} }}", self.registry)
    }
}

#[derive(Default)]
pub struct ServerContextBuilder {
    registry: Option<Arc<QueueRegistry>>,
}

impl ServerContextBuilder {
    /// Shares an existing registry, e.g. to drive a shutdown from outside the connections.
    pub fn registry(mut self, registry: Arc<QueueRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn build(self) -> ServerContext {
        let registry = self.registry.unwrap_or_default();
        ServerContext { inner: Arc::new(ServerContextInner { registry, conn_ids: AtomicU64::new(1) }) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_ids_increase() {
        let scx = ServerContext::new().build();
        assert_eq!(scx.next_conn_id(), 1);
        assert_eq!(scx.clone().next_conn_id(), 2);
    }

    #[test]
    fn shared_registry() {
        let registry = Arc::new(QueueRegistry::new());
        let scx = ServerContext::new().registry(registry.clone()).build();
        scx.registry.create("/a").unwrap();
        assert!(registry.contains("/a"));
    }
}
