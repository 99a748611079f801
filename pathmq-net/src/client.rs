use futures::{SinkExt, StreamExt};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio_util::codec::Framed;

use pathmq_codec::{ClientCodec, Payload, Request, Response};

use crate::error::NetError;
use crate::Result;

/// Blocking-style request/response client, one command in flight at a time
pub struct Client {
    io: Framed<TcpStream, ClientCodec>,
}

impl Client {
    pub async fn connect<A: ToSocketAddrs>(addr: A) -> Result<Client> {
        let socket = TcpStream::connect(addr).await?;
        socket.set_nodelay(true)?;
        Ok(Client { io: Framed::new(socket, ClientCodec::default()) })
    }

    /// Sends `req` and waits for its response.
    pub async fn call(&mut self, req: Request) -> Result<Response> {
        self.io.send(req).await.map_err(NetError::from)?;
        self.next_response().await
    }

    pub async fn create<P: Into<String>>(&mut self, path: P) -> Result<Response> {
        self.call(Request::new("CREATE").path(path)).await
    }

    pub async fn send<P: Into<String>>(&mut self, path: P, payload: Option<Payload>) -> Result<Response> {
        let mut req = Request::new("SEND").path(path);
        req.payload = payload;
        self.call(req).await
    }

    /// `timeout` in milliseconds, 0 asks for an immediate answer.
    pub async fn receive<P: Into<String>>(&mut self, path: P, timeout: i32) -> Result<Response> {
        self.call(Request::new("RECEIVE").path(path).header("timeout", timeout)).await
    }

    pub async fn shutdown(&mut self, timeout: i32) -> Result<Response> {
        self.call(Request::new("SHUTDOWN").header("timeout", timeout)).await
    }

    /// Writes raw bytes, bypassing the encoder.
    pub async fn send_raw(&mut self, data: &[u8]) -> Result<()> {
        self.io.get_mut().write_all(data).await?;
        Ok(())
    }

    /// Next response frame, `NetError::Disconnected` once the broker closed the connection.
    pub async fn next_response(&mut self) -> Result<Response> {
        match self.io.next().await {
            Some(Ok(resp)) => Ok(resp),
            Some(Err(e)) => Err(NetError::Decode(e).into()),
            None => Err(NetError::Disconnected.into()),
        }
    }

    pub async fn close(mut self) -> Result<()> {
        SinkExt::<Request>::close(&mut self.io).await.map_err(NetError::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pathmq_codec::{ServerCodec, Status};
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn call_and_disconnect() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut io = Framed::new(socket, ServerCodec::default());
            let req = io.next().await.unwrap().unwrap();
            assert_eq!(req, Request::new("RECEIVE").path("/q").header("timeout", 5));
            io.send(Response::no_content()).await.unwrap();
        });

        let mut c = Client::connect(addr).await.unwrap();
        let resp = c.receive("/q", 5).await.unwrap();
        assert_eq!(resp.status, Status::NoContent);
        server.await.unwrap();

        let err = c.next_response().await.unwrap_err();
        assert!(matches!(err.downcast_ref::<NetError>(), Some(NetError::Disconnected)));
    }
}
