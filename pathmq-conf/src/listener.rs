use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;

use serde::Deserialize;

use pathmq_net::{Builder, DEFAULT_PORT};

use super::{deserialize_addr, deserialize_duration, Bytesize};

#[derive(Debug, Clone, Deserialize)]
pub struct Listener {
    #[serde(default = "Listener::name_default")]
    pub name: String,
    #[serde(default = "Listener::addr_default", deserialize_with = "deserialize_addr")]
    pub addr: SocketAddr,
    #[serde(default = "Listener::backlog_default")]
    pub backlog: i32,
    #[serde(default = "Listener::nodelay_default")]
    pub nodelay: bool,
    #[serde(default = "Listener::reuseaddr_default")]
    pub reuseaddr: Option<bool>,
    #[serde(default)]
    pub reuseport: Option<bool>,
    //0 means one per available processing unit
    #[serde(default)]
    pub max_connections: usize,
    #[serde(default = "Listener::max_frame_size_default")]
    pub max_frame_size: Bytesize,
    #[serde(default = "Listener::send_timeout_default", deserialize_with = "deserialize_duration")]
    pub send_timeout: Duration,
}

impl Default for Listener {
    #[inline]
    fn default() -> Self {
        Self {
            name: Self::name_default(),
            addr: Self::addr_default(),
            backlog: Self::backlog_default(),
            nodelay: Self::nodelay_default(),
            reuseaddr: Self::reuseaddr_default(),
            reuseport: None,
            max_connections: 0,
            max_frame_size: Self::max_frame_size_default(),
            send_timeout: Self::send_timeout_default(),
        }
    }
}

impl Listener {
    fn name_default() -> String {
        "external/tcp".into()
    }
    fn addr_default() -> SocketAddr {
        SocketAddr::from(SocketAddrV4::new(Ipv4Addr::LOCALHOST, DEFAULT_PORT))
    }
    fn backlog_default() -> i32 {
        512
    }
    fn nodelay_default() -> bool {
        true
    }
    fn reuseaddr_default() -> Option<bool> {
        Some(true)
    }
    fn max_frame_size_default() -> Bytesize {
        Bytesize::from("1M")
    }
    fn send_timeout_default() -> Duration {
        Duration::from_secs(10)
    }

    /// Network builder carrying this section's values, ready to `bind()`.
    pub fn builder(&self) -> Builder {
        Builder::new()
            .name(self.name.as_str())
            .laddr(self.addr)
            .backlog(self.backlog)
            .nodelay(self.nodelay)
            .reuseaddr(self.reuseaddr)
            .reuseport(self.reuseport)
            .max_connections(self.max_connections)
            .max_frame_size(self.max_frame_size.as_usize())
            .send_timeout(self.send_timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_carries_values() {
        let l = Listener {
            addr: ([127, 0, 0, 1], 9000).into(),
            max_connections: 7,
            max_frame_size: Bytesize::from("64K"),
            ..Default::default()
        };
        let b = l.builder();
        assert_eq!(b.name, "external/tcp");
        assert_eq!(b.laddr.port(), 9000);
        assert_eq!(b.max_connections, 7);
        assert_eq!(b.max_frame_size, 65536);
        assert_eq!(b.send_timeout, Duration::from_secs(10));
    }

    #[test]
    fn zero_connections_follow_parallelism() {
        let b = Listener::default().builder();
        assert_eq!(b.max_connections, pathmq_utils::available_parallelism());
        assert_eq!(b.laddr, "127.0.0.1:8081".parse().unwrap());
    }
}
