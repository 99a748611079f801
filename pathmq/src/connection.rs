use tokio::io::{AsyncRead, AsyncWrite};

use pathmq_net::{JsonStream, NetError};

use crate::context::ServerContext;
use crate::error::JSON_ERROR;
use crate::router;
use crate::types::{ConnectionId, Response};

/// Serves one connection until the peer closes it or sends something undecodable.
///
/// Requests are handled strictly one after the other. Malformed JSON gets a single 400 before the
/// connection is closed, any other decode failure closes it without an answer.
pub async fn process<Io>(scx: ServerContext, mut stream: JsonStream<Io>, id: ConnectionId) -> Result<(), NetError>
where
    Io: AsyncRead + AsyncWrite + Unpin,
{
    loop {
        let req = match stream.recv().await {
            Ok(Some(req)) => req,
            Ok(None) => {
                log::debug!("[{id}] {} closed the connection", stream.remote_addr);
                return Ok(());
            }
            Err(e) if e.is_malformed() => {
                log::debug!("[{id}] {e}");
                stream.send(Response::bad_request(JSON_ERROR)).await?;
                stream.close().await?;
                return Ok(());
            }
            Err(e) => {
                log::debug!("[{id}] dropping connection, {e}");
                return Err(e);
            }
        };

        log::debug!("[{id}] request {req}");
        let resp = router::dispatch(&scx.registry, req).await;
        log::debug!("[{id}] response {resp}");
        stream.send(resp).await?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

    use pathmq_net::Builder;

    fn serve(scx: &ServerContext) -> (DuplexStream, tokio::task::JoinHandle<Result<(), NetError>>) {
        let (client, server) = tokio::io::duplex(4096);
        let stream = JsonStream::new(server, ([127, 0, 0, 1], 9).into(), Arc::new(Builder::new()));
        (client, tokio::spawn(process(scx.clone(), stream, 1)))
    }

    async fn read_all(mut client: DuplexStream) -> String {
        let mut out = String::new();
        client.read_to_string(&mut out).await.unwrap();
        out
    }

    #[tokio::test]
    async fn answers_in_order() {
        let scx = ServerContext::new().build();
        let (mut client, task) = serve(&scx);
        client
            .write_all(
                br#"{"Method":"CREATE","Path":"/a"} {"Method":"SEND","Path":"/a","Payload":{"n":1}}
                {"Method":"RECEIVE","Path":"/a","Headers":{"timeout":"100"}}"#,
            )
            .await
            .unwrap();
        client.shutdown().await.unwrap();
        let out = read_all(client).await;
        assert_eq!(out, "{\"Status\":200}\n{\"Status\":200}\n{\"Status\":200,\"Payload\":{\"n\":1}}\n");
        assert!(task.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn malformed_json_is_answered_then_closed() {
        let scx = ServerContext::new().build();
        let (mut client, task) = serve(&scx);
        client.write_all(b"{\"Method\":\"CREATE\",\"Path\":\"/a\"}{\"Method\" nope").await.unwrap();
        let out = read_all(client).await;
        assert_eq!(out, "{\"Status\":200}\n{\"Status\":400,\"Headers\":{\"StatusMessage\":\"JSON error.\"}}\n");
        assert!(task.await.unwrap().is_ok());
        assert!(scx.registry.contains("/a"));
    }

    #[tokio::test]
    async fn invalid_frame_closes_silently() {
        let scx = ServerContext::new().build();
        let (mut client, task) = serve(&scx);
        client.write_all(b"{\"Path\":\"/a\"}").await.unwrap();
        let out = read_all(client).await;
        assert_eq!(out, "");
        assert!(task.await.unwrap().is_err());
    }
}
