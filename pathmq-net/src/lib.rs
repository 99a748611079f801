#![deny(unsafe_code)]

mod client;
mod error;
mod server;
mod stream;

pub use client::Client;
pub use error::NetError;
pub use server::{Acceptor, Builder, Listener, DEFAULT_PORT};
pub use stream::JsonStream;

pub use pathmq_codec as codec;

pub type Error = anyhow::Error;
pub type Result<T> = anyhow::Result<T, Error>;
