#![deny(unsafe_code)]

//! # pathmq
//!
//! A broker for path-addressed JSON message queues. Clients connect over TCP and exchange JSON
//! objects: `CREATE` a queue, `SEND` a payload into it, `RECEIVE` from it with a bounded wait, and
//! `SHUTDOWN` the broker with a drain deadline.
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
//!     BrokerServer::new(scx, listener).run().await
//! }
//! ```

pub mod admission; // Connection admission gate
pub mod connection; // Per-connection request loop
pub mod context; // Shared broker state
pub mod error;
pub mod logger; // Async slog sink behind the log facade
pub mod queue; // Buffer and waiter FIFOs of one path
pub mod registry; // Path to queue map and broker lifecycle
pub mod router; // Method dispatch
pub mod server; // Accept loop
pub mod shutdown; // Drain racing a deadline
pub mod types;
pub mod waiter; // Exactly-once resolution of a pending receive

pub use pathmq_codec as codec;
pub use pathmq_conf as conf;
pub use pathmq_net as net;
pub use pathmq_utils as utils;

pub use error::BrokerError;
pub use net::{Error, Result};
pub use registry::{QueueRegistry, State};
pub use shutdown::Drain;
