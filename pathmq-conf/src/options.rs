use std::net::SocketAddr;

use structopt::StructOpt;

#[derive(StructOpt, Debug, Clone, Default)]
#[structopt(name = "pathmqd", about = "Path-addressed JSON message queue broker")]
pub struct Options {
    /// Config filename
    #[structopt(name = "config", short = "f", long)]
    pub cfg_name: Option<String>,

    /// Listen address, overrides listener.addr
    #[structopt(name = "laddr", long)]
    pub laddr: Option<SocketAddr>,

    /// Connections served concurrently, 0 means one per processing unit
    #[structopt(name = "max-connections", long)]
    pub max_connections: Option<usize>,
}
