use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::error::{BrokerError, INVALID_METHOD, INVALID_PATH, INVALID_TIMEOUT};
use crate::registry::QueueRegistry;
use crate::shutdown::Drain;
use crate::types::{Request, Response};

pub const CREATE: &str = "CREATE";
pub const SEND: &str = "SEND";
pub const RECEIVE: &str = "RECEIVE";
pub const SHUTDOWN: &str = "SHUTDOWN";

/// Header carrying the RECEIVE/SHUTDOWN wait, in milliseconds
pub const TIMEOUT: &str = "timeout";

/// Runs one command and builds its response, every failure becomes a response.
pub async fn dispatch(registry: &Arc<QueueRegistry>, req: Request) -> Response {
    match route(registry, req).await {
        Ok(resp) => resp,
        Err(e) => e.into(),
    }
}

async fn route(registry: &Arc<QueueRegistry>, req: Request) -> Result<Response, BrokerError> {
    match req.method.as_str() {
        CREATE => {
            registry.create(path(&req)?)?;
            Ok(Response::ok())
        }
        SEND => {
            let Request { path, payload, .. } = req;
            let path = path.ok_or_else(|| BrokerError::bad_request(INVALID_PATH))?;
            registry.send(&path, payload)?;
            Ok(Response::ok())
        }
        RECEIVE => {
            let path = path(&req)?;
            let timeout = to_wait(timeout(&req)?);
            match registry.receive(path, timeout).await? {
                Some(msg) => Ok(Response::ok().payload(msg)),
                None => Ok(Response::no_content()),
            }
        }
        SHUTDOWN => {
            let timeout = to_wait(timeout(&req)?);
            match registry.shutdown(timeout).await? {
                Drain::Completed => Ok(Response::ok()),
                Drain::Pending => Ok(Response::no_content()),
            }
        }
        _ => Err(BrokerError::bad_request(INVALID_METHOD)),
    }
}

#[inline]
fn path(req: &Request) -> Result<&str, BrokerError> {
    req.path.as_deref().ok_or_else(|| BrokerError::bad_request(INVALID_PATH))
}

/// Milliseconds from the `timeout` header, 0 when it is absent or null.
///
/// Accepts a JSON integer or a string holding one, both within `i32`.
pub fn timeout(req: &Request) -> Result<i32, BrokerError> {
    let invalid = || BrokerError::bad_request(INVALID_TIMEOUT);
    match req.get_header(TIMEOUT) {
        None => Ok(0),
        Some(Value::Number(n)) => n.as_i64().and_then(|n| i32::try_from(n).ok()).ok_or_else(invalid),
        Some(Value::String(s)) => s.trim().parse::<i32>().map_err(|_| invalid()),
        Some(_) => Err(invalid()),
    }
}

#[inline]
fn to_wait(ms: i32) -> Duration {
    if ms <= 0 {
        Duration::ZERO
    } else {
        Duration::from_millis(ms as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::State;
    use crate::types::Status;
    use serde_json::json;

    fn registry() -> Arc<QueueRegistry> {
        Arc::new(QueueRegistry::new())
    }

    #[test]
    fn timeout_header() {
        let req = |v: Value| Request::new(RECEIVE).header(TIMEOUT, v);
        assert_eq!(timeout(&Request::new(RECEIVE)), Ok(0));
        assert_eq!(timeout(&req(Value::Null)), Ok(0));
        assert_eq!(timeout(&req(json!(250))), Ok(250));
        assert_eq!(timeout(&req(json!(-5))), Ok(-5));
        assert_eq!(timeout(&req(json!(" 100 "))), Ok(100));
        for bad in [json!("abc"), json!(1.5), json!(true), json!(3_000_000_000i64), json!({})] {
            assert_eq!(timeout(&req(bad)), Err(BrokerError::bad_request(INVALID_TIMEOUT)));
        }
    }

    #[tokio::test]
    async fn methods() {
        let r = registry();
        assert_eq!(dispatch(&r, Request::new(CREATE).path("/a")).await.status, Status::Ok);
        let payload = json!({"msg": "x"}).as_object().cloned().unwrap();
        let send = Request::new(SEND).path("/a").payload(payload.clone());
        assert_eq!(dispatch(&r, send).await.status, Status::Ok);

        let resp = dispatch(&r, Request::new(RECEIVE).path("/a").header(TIMEOUT, 1000)).await;
        assert_eq!(resp, Response::ok().payload(Some(payload)));

        let resp = dispatch(&r, Request::new(RECEIVE).path("/a")).await;
        assert_eq!(resp.status, Status::NoContent);
    }

    #[tokio::test]
    async fn bad_requests() {
        let r = registry();
        let resp = dispatch(&r, Request::new("create").path("/a")).await;
        assert_eq!(resp.get_status_message(), Some(INVALID_METHOD));
        assert!(r.is_empty());

        let resp = dispatch(&r, Request::new(CREATE)).await;
        assert_eq!(resp.status, Status::BadRequest);
        assert_eq!(resp.get_status_message(), Some(INVALID_PATH));

        r.create("/a").unwrap();
        let resp = dispatch(&r, Request::new(RECEIVE).path("/a").header(TIMEOUT, "soon")).await;
        assert_eq!(resp.get_status_message(), Some(INVALID_TIMEOUT));

        let resp = dispatch(&r, Request::new(SHUTDOWN).header(TIMEOUT, json!([1]))).await;
        assert_eq!(resp.get_status_message(), Some(INVALID_TIMEOUT));
        assert_eq!(r.state(), State::Running);
    }

    #[tokio::test]
    async fn not_found_and_unavailable() {
        let r = registry();
        let resp = dispatch(&r, Request::new(RECEIVE).path("/x").header(TIMEOUT, 10)).await;
        assert_eq!(resp.status, Status::NotFound);
        assert!(!r.contains("/x"));

        let resp = dispatch(&r, Request::new(SHUTDOWN)).await;
        assert_eq!(resp.status, Status::NoContent);
        let resp = dispatch(&r, Request::new(CREATE).path("/x")).await;
        assert_eq!(resp.status, Status::ServiceUnavailable);
    }
}
