use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::Arc;
use std::time::Duration;

use socket2::{Domain, SockAddr, Socket, Type};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};

use crate::stream::JsonStream;
use crate::{Error, Result};

/// Default port, loopback only
pub const DEFAULT_PORT: u16 = 8081;

#[derive(Clone, Debug)]
pub struct Builder {
    /// The name of the listener, used in logs.
    pub name: String,
    ///The local address the server listens on.
    pub laddr: SocketAddr,
    ///The maximum length of the pending connection queue.
    ///Connections waiting for admission wait here.
    pub backlog: i32,
    ///Sets the value of the TCP_NODELAY option on accepted sockets.
    pub nodelay: bool,
    ///Whether to enable the SO_REUSEADDR option.
    pub reuseaddr: Option<bool>,
    ///Whether to enable the SO_REUSEPORT option.
    pub reuseport: Option<bool>,
    ///The maximum number of connections served concurrently.
    ///Default: the number of available processing units
    pub max_connections: usize,
    ///Maximum size of one JSON object, in bytes. 0 means unlimited, default: 1M
    pub max_frame_size: usize,
    ///Response write timeout, zero disables it.
    pub send_timeout: Duration,
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder {
    pub fn new() -> Builder {
        Builder {
            name: Default::default(),
            laddr: SocketAddr::from(SocketAddrV4::new(Ipv4Addr::LOCALHOST, DEFAULT_PORT)),
            backlog: 512,
            nodelay: false,
            reuseaddr: None,
            reuseport: None,
            max_connections: pathmq_utils::available_parallelism(),
            max_frame_size: 1024 * 1024,
            send_timeout: Duration::from_secs(10),
        }
    }

    pub fn name<N: Into<String>>(mut self, name: N) -> Self {
        self.name = name.into();
        self
    }

    pub fn laddr(mut self, laddr: SocketAddr) -> Self {
        self.laddr = laddr;
        self
    }

    pub fn backlog(mut self, backlog: i32) -> Self {
        self.backlog = backlog;
        self
    }

    pub fn nodelay(mut self, nodelay: bool) -> Self {
        self.nodelay = nodelay;
        self
    }

    pub fn reuseaddr(mut self, reuseaddr: Option<bool>) -> Self {
        self.reuseaddr = reuseaddr;
        self
    }

    pub fn reuseport(mut self, reuseport: Option<bool>) -> Self {
        self.reuseport = reuseport;
        self
    }

    /// 0 falls back to the number of available processing units.
    pub fn max_connections(mut self, max_connections: usize) -> Self {
        self.max_connections =
            if max_connections == 0 { pathmq_utils::available_parallelism() } else { max_connections };
        self
    }

    pub fn max_frame_size(mut self, max_frame_size: usize) -> Self {
        self.max_frame_size = max_frame_size;
        self
    }

    pub fn send_timeout(mut self, send_timeout: Duration) -> Self {
        self.send_timeout = send_timeout;
        self
    }

    pub fn bind(self) -> Result<Listener> {
        let builder = match self.laddr {
            SocketAddr::V4(_) => Socket::new(Domain::IPV4, Type::STREAM, None)?,
            SocketAddr::V6(_) => Socket::new(Domain::IPV6, Type::STREAM, None)?,
        };

        builder.set_nonblocking(true)?;

        if let Some(reuseaddr) = self.reuseaddr {
            builder.set_reuse_address(reuseaddr)?;
        }

        #[cfg(not(windows))]
        if let Some(reuseport) = self.reuseport {
            builder.set_reuse_port(reuseport)?;
        }

        builder.bind(&SockAddr::from(self.laddr))?;
        builder.listen(self.backlog)?;
        let tcp_listener = TcpListener::from_std(std::net::TcpListener::from(builder))?;
        let local_addr = tcp_listener.local_addr()?;
        log::info!("Broker listening on {} {}", self.name, local_addr);
        Ok(Listener { cfg: Arc::new(self), tcp_listener, local_addr })
    }
}

pub struct Listener {
    pub cfg: Arc<Builder>,
    tcp_listener: TcpListener,
    local_addr: SocketAddr,
}

impl Listener {
    /// Bound address, resolves a port 0 request to the real port.
    #[inline]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub async fn accept(&self) -> Result<Acceptor<TcpStream>> {
        let (socket, remote_addr) = self.tcp_listener.accept().await?;
        if let Err(e) = socket.set_nodelay(self.cfg.nodelay) {
            return Err(Error::from(e));
        }
        Ok(Acceptor { socket, remote_addr, cfg: self.cfg.clone() })
    }
}

pub struct Acceptor<S> {
    pub(crate) socket: S,
    pub remote_addr: SocketAddr,
    pub cfg: Arc<Builder>,
}

impl<S> Acceptor<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    #[inline]
    pub fn json(self) -> JsonStream<S> {
        JsonStream::new(self.socket, self.remote_addr, self.cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_max_connections_uses_parallelism() {
        let b = Builder::new().max_connections(0);
        assert_eq!(b.max_connections, pathmq_utils::available_parallelism());
        assert_eq!(Builder::new().max_connections(3).max_connections, 3);
    }

    #[tokio::test]
    async fn bind_ephemeral_port() {
        let listener = Builder::new().name("test/tcp").laddr(([127, 0, 0, 1], 0).into()).bind().unwrap();
        assert_ne!(listener.local_addr().port(), 0);
        assert_eq!(listener.cfg.name, "test/tcp");
    }
}
