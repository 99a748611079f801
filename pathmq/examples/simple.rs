use std::time::Duration;

use pathmq::context::ServerContext;
use pathmq::net::{Builder, Client, Result};
use pathmq::server::BrokerServer;
use serde_json::json;
use simple_logger::SimpleLogger;

#[tokio::main]
async fn main() -> Result<()> {
    SimpleLogger::new().with_level(log::LevelFilter::Debug).init()?;

    let scx = ServerContext::new().build();
    let listener = Builder::new().name("external/tcp").laddr(([127, 0, 0, 1], 0).into()).bind()?;
    let addr = listener.local_addr();
    BrokerServer::new(scx, listener).start();

    let mut consumer = Client::connect(addr).await?;
    let mut producer = Client::connect(addr).await?;
    producer.create("/greetings").await?;

    let waiting = tokio::spawn(async move { consumer.receive("/greetings", 5000).await });
    tokio::time::sleep(Duration::from_millis(100)).await;
    producer.send("/greetings", json!({"msg": "hello"}).as_object().cloned()).await?;
    log::info!("consumer got {}", waiting.await??);

    log::info!("shutdown: {}", producer.shutdown(1000).await?);
    Ok(())
}
