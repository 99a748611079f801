//! Accept loop of the broker
//!
//! ```rust,no_run
//! use pathmq::context::ServerContext;
//! use pathmq::net::{Builder, Result};
//! use pathmq::server::BrokerServer;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let scx = ServerContext::new().build();
//!     let listener = Builder::new().name("external/tcp").laddr(([127, 0, 0, 1], 8081).into()).bind()?;
//!     BrokerServer::new(scx, listener).run().await?;
//!     Ok(())
//! }
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use pathmq_net::{Listener, Result};

use crate::admission::Admission;
use crate::connection;
use crate::context::ServerContext;

pub struct BrokerServer {
    scx: ServerContext,
    listener: Listener,
    admission: Arc<Admission>,
}

impl BrokerServer {
    /// Admits at most `listener.cfg.max_connections` connections at a time.
    pub fn new(scx: ServerContext, listener: Listener) -> Self {
        let admission = Admission::new(listener.cfg.max_connections);
        Self { scx, listener, admission }
    }

    #[inline]
    pub fn local_addr(&self) -> SocketAddr {
        self.listener.local_addr()
    }

    #[inline]
    pub fn admission(&self) -> &Arc<Admission> {
        &self.admission
    }

    #[inline]
    pub fn context(&self) -> &ServerContext {
        &self.scx
    }

    /// Runs the accept loop in a background task.
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            if let Err(e) = self.run().await {
                log::error!("Failed to run the broker! {e}");
            }
        })
    }

    pub async fn run(self) -> Result<()> {
        let name = &self.listener.cfg.name;
        log::info!("{name} serving at most {} connections", self.admission.limit());
        loop {
            let permit = self.admission.acquire().await?;
            let acceptor = match self.listener.accept().await {
                Ok(a) => a,
                Err(e) => {
                    log::info!("{name} accept error: {e:?}");
                    drop(permit);
                    tokio::time::sleep(Duration::from_millis(1000)).await;
                    continue;
                }
            };

            let scx = self.scx.clone();
            let id = scx.next_conn_id();
            let active = self.admission.active().count();
            tokio::spawn(async move {
                let _permit = permit;
                let remote_addr = acceptor.remote_addr;
                log::debug!("[{id}] connection from {remote_addr}, active: {active}");
                if let Err(e) = connection::process(scx, acceptor.json(), id).await {
                    log::debug!("[{id}] {remote_addr} connection error: {e}");
                }
                log::debug!("[{id}] {remote_addr} done");
            });
        }
    }
}
