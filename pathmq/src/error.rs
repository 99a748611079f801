use pathmq_codec::{Response, Status};
use thiserror::Error;

pub const JSON_ERROR: &str = "JSON error.";
pub const INVALID_METHOD: &str = "Invalid method.";
pub const INVALID_TIMEOUT: &str = "Invalid timeout.";
pub const INVALID_PATH: &str = "Invalid path.";

/// Failures a command reports back on its own connection
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BrokerError {
    #[error("bad request, {0}")]
    BadRequest(String),
    #[error("queue not found")]
    NotFound,
    #[error("service unavailable")]
    ServiceUnavailable,
    #[error("internal error, {0}")]
    Internal(String),
}

impl BrokerError {
    #[inline]
    pub fn bad_request<M: Into<String>>(msg: M) -> Self {
        BrokerError::BadRequest(msg.into())
    }

    #[inline]
    pub fn status(&self) -> Status {
        match self {
            BrokerError::BadRequest(_) => Status::BadRequest,
            BrokerError::NotFound => Status::NotFound,
            BrokerError::ServiceUnavailable => Status::ServiceUnavailable,
            BrokerError::Internal(_) => Status::InternalError,
        }
    }
}

impl From<BrokerError> for Response {
    #[inline]
    fn from(e: BrokerError) -> Self {
        match e {
            BrokerError::BadRequest(msg) => Response::bad_request(msg),
            e => Response::new(e.status()),
        }
    }
}

impl From<tokio::task::JoinError> for BrokerError {
    #[inline]
    fn from(e: tokio::task::JoinError) -> Self {
        BrokerError::Internal(e.to_string())
    }
}
