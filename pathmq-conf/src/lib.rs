#![deny(unsafe_code)]

//! Broker settings, layered from configuration files, `PATHMQ_*` environment variables and the
//! command line.
//!
//! Sources, lowest priority first:
//! 1. `/etc/pathmq/pathmq.toml`
//! 2. `./pathmq.toml`
//! 3. the file given with `-f/--config`
//! 4. environment, e.g. `PATHMQ_LISTENER__ADDR=0.0.0.0:8081`, `PATHMQ_LOG__LEVEL=debug`
//! 5. command line options (`--laddr`, `--max-connections`)

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use config::{Config, File};
use once_cell::sync::OnceCell;
use serde::Deserialize;

use pathmq_net::Result;
use pathmq_utils::*;

use self::logging::Log;

pub use self::listener::Listener;
pub use self::options::Options;

pub mod listener;
pub mod logging;
pub mod options;

static SETTINGS: OnceCell<Settings> = OnceCell::new();

#[derive(Clone)]
pub struct Settings(Arc<Inner>);

#[derive(Debug, Clone, Deserialize)]
pub struct Inner {
    #[serde(default)]
    pub listener: Listener,
    #[serde(default)]
    pub log: Log,
    #[serde(default)]
    pub broker: Broker,
    #[serde(default, skip)]
    pub opts: Options,
}

impl Deref for Settings {
    type Target = Inner;
    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

impl Settings {
    fn new(opts: Options) -> Result<Self> {
        let mut builder = Config::builder()
            .add_source(File::with_name("/etc/pathmq/pathmq").required(false))
            .add_source(File::with_name("pathmq").required(false));

        if let Some(cfg) = opts.cfg_name.as_ref() {
            builder = builder.add_source(File::with_name(cfg).required(true));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("pathmq").prefix_separator("_").separator("__").try_parsing(true),
        );

        Self::from_config(builder.build()?, opts)
    }

    fn from_config(cfg: Config, opts: Options) -> Result<Self> {
        let mut inner: Inner = cfg.try_deserialize()?;

        //Command line configuration overriding file configuration
        if let Some(laddr) = opts.laddr {
            inner.listener.addr = laddr;
        }
        if let Some(max_connections) = opts.max_connections {
            inner.listener.max_connections = max_connections;
        }

        inner.opts = opts;
        Ok(Self(Arc::new(inner)))
    }

    #[inline]
    pub fn instance() -> &'static Self {
        match SETTINGS.get() {
            Some(c) => c,
            None => {
                unreachable!("Settings not initialized");
            }
        }
    }

    #[inline]
    pub fn init(opts: Options) -> Result<&'static Self> {
        SETTINGS.set(Settings::new(opts)?).map_err(|_| anyhow!("Settings init failed"))?;
        SETTINGS.get().ok_or_else(|| anyhow!("Settings init failed"))
    }

    #[inline]
    pub fn logs() {
        let cfg = Self::instance();
        log::debug!("Config info is {:?}", cfg.0);
        log::info!("listener.addr is {}", cfg.listener.addr);
        log::info!("listener.max_connections is {}", cfg.listener.max_connections);
        log::info!("listener.max_frame_size is {:?}", cfg.listener.max_frame_size);
        log::info!("broker.shutdown_timeout is {:?}", cfg.broker.shutdown_timeout);
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Settings ...")?;
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Broker {
    //Drain deadline used by a SHUTDOWN triggered from the process (Ctrl-C)
    #[serde(default = "Broker::shutdown_timeout_default", deserialize_with = "deserialize_duration")]
    pub shutdown_timeout: Duration,
}

impl Default for Broker {
    #[inline]
    fn default() -> Self {
        Self { shutdown_timeout: Self::shutdown_timeout_default() }
    }
}

impl Broker {
    fn shutdown_timeout_default() -> Duration {
        Duration::from_secs(5)
    }
}
