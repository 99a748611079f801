use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;

use pathmq_codec::{Request, Response, ServerCodec};

use crate::error::NetError;
use crate::Builder;

/// Broker side of one client connection
pub struct JsonStream<Io> {
    pub io: Framed<Io, ServerCodec>,
    pub remote_addr: SocketAddr,
    pub cfg: Arc<Builder>,
}

impl<Io> JsonStream<Io>
where
    Io: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(io: Io, remote_addr: SocketAddr, cfg: Arc<Builder>) -> Self {
        let codec = ServerCodec::new(cfg.max_frame_size);
        JsonStream { io: Framed::new(io, codec), remote_addr, cfg }
    }

    /// Next request, `Ok(None)` once the peer closed its side between two requests.
    #[inline]
    pub async fn recv(&mut self) -> Result<Option<Request>, NetError> {
        match self.io.next().await {
            Some(Ok(req)) => Ok(Some(req)),
            Some(Err(e)) => Err(NetError::Decode(e)),
            None => Ok(None),
        }
    }

    #[inline]
    pub async fn send(&mut self, resp: Response) -> Result<(), NetError> {
        send(&mut self.io, resp, self.cfg.send_timeout).await
    }

    #[inline]
    pub async fn close(&mut self) -> Result<(), NetError> {
        let send_timeout = self.cfg.send_timeout;
        if send_timeout.is_zero() {
            return Ok(SinkExt::<Response>::close(&mut self.io).await?);
        }
        match tokio::time::timeout(send_timeout, SinkExt::<Response>::close(&mut self.io)).await {
            Ok(res) => Ok(res?),
            Err(_) => Err(NetError::CloseTimeout),
        }
    }
}

#[inline]
async fn send<Io>(io: &mut Framed<Io, ServerCodec>, resp: Response, send_timeout: Duration) -> Result<(), NetError>
where
    Io: AsyncWrite + Unpin,
{
    if send_timeout.is_zero() {
        io.send(resp).await?;
        Ok(())
    } else {
        match tokio::time::timeout(send_timeout, io.send(resp)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(NetError::Encode(e)),
            Err(_) => Err(NetError::WriteTimeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    fn stream(io: tokio::io::DuplexStream) -> JsonStream<tokio::io::DuplexStream> {
        JsonStream::new(io, ([127, 0, 0, 1], 9).into(), Arc::new(Builder::new()))
    }

    #[tokio::test]
    async fn recv_until_clean_close() {
        let (mut client, server) = tokio::io::duplex(1024);
        let mut s = stream(server);
        client.write_all(b"{\"Method\":\"CREATE\",\"Path\":\"/a\"}\n  ").await.unwrap();
        client.shutdown().await.unwrap();
        drop(client);
        assert_eq!(s.recv().await.unwrap(), Some(Request::new("CREATE").path("/a")));
        assert_eq!(s.recv().await.unwrap(), None);
    }

    #[tokio::test]
    async fn malformed_input() {
        let (mut client, server) = tokio::io::duplex(1024);
        let mut s = stream(server);
        client.write_all(b"{oops}").await.unwrap();
        let err = s.recv().await.unwrap_err();
        assert!(err.is_malformed(), "{err:?}");
    }
}
