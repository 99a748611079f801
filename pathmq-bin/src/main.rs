#![deny(unsafe_code)]

use std::process;
use std::sync::Arc;

use structopt::StructOpt;

use pathmq::conf::{Options, Settings};
use pathmq::context::ServerContext;
use pathmq::logger::{config_logger, logger_init};
use pathmq::server::BrokerServer;
use pathmq::{Drain, QueueRegistry, Result};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("pathmqd failed to start! {e:?}");
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    //init config
    let settings = Settings::init(Options::from_args())?;

    //init log
    logger_init(config_logger(&settings.log)?, settings.log.level)?;
    Settings::logs();

    let registry = Arc::new(QueueRegistry::new());
    let scx = ServerContext::new().registry(registry.clone()).build();
    let server = BrokerServer::new(scx, settings.listener.builder().bind()?);

    tokio::select! {
        res = server.run() => res,
        res = tokio::signal::ctrl_c() => {
            res?;
            let timeout = settings.broker.shutdown_timeout;
            log::info!("Ctrl-C received, shutting down within {timeout:?}");
            match registry.shutdown(timeout).await {
                Ok(Drain::Completed) => log::info!("all pending receives canceled"),
                Ok(Drain::Pending) => log::warn!("shutdown deadline passed with receives still pending"),
                Err(e) => log::error!("shutdown failed, {e}"),
            }
            Ok(())
        }
    }
}
