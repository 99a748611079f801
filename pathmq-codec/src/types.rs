use std::fmt;

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub type Headers = serde_json::Map<String, Value>;
pub type Payload = serde_json::Map<String, Value>;

/// Response header carrying the reason of a `400`
pub const STATUS_MESSAGE: &str = "StatusMessage";

/// One command sent by a client
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Request {
    #[serde(rename = "Method", alias = "method")]
    pub method: String,
    #[serde(rename = "Path", alias = "path", default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(rename = "Headers", alias = "headers", default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<Headers>,
    #[serde(rename = "Payload", alias = "payload", default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Payload>,
}

impl Request {
    pub fn new<M: Into<String>>(method: M) -> Self {
        Self { method: method.into(), ..Default::default() }
    }

    pub fn path<P: Into<String>>(mut self, path: P) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn header<K: Into<String>, V: Into<Value>>(mut self, key: K, value: V) -> Self {
        self.headers.get_or_insert_with(Headers::new).insert(key.into(), value.into());
        self
    }

    pub fn payload(mut self, payload: Payload) -> Self {
        self.payload = Some(payload);
        self
    }

    /// A header that is absent, or explicitly `null`, reads as `None`.
    #[inline]
    pub fn get_header(&self, key: &str) -> Option<&Value> {
        self.headers.as_ref().and_then(|h| h.get(key)).filter(|v| !v.is_null())
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Method: {}, Path: {:?}, Headers: {:?}, Payload: {:?}",
            self.method, self.path, self.headers, self.payload
        )
    }
}

/// Outcome of a command, as written back on the connection
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Response {
    #[serde(rename = "Status", alias = "status")]
    pub status: Status,
    #[serde(rename = "Headers", alias = "headers", default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<Headers>,
    #[serde(rename = "Payload", alias = "payload", default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Payload>,
}

impl Response {
    #[inline]
    pub fn new(status: Status) -> Self {
        Self { status, headers: None, payload: None }
    }

    #[inline]
    pub fn ok() -> Self {
        Self::new(Status::Ok)
    }

    #[inline]
    pub fn no_content() -> Self {
        Self::new(Status::NoContent)
    }

    #[inline]
    pub fn bad_request<M: Into<String>>(msg: M) -> Self {
        Self::new(Status::BadRequest).status_message(msg)
    }

    pub fn status_message<M: Into<String>>(mut self, msg: M) -> Self {
        self.headers.get_or_insert_with(Headers::new).insert(STATUS_MESSAGE.into(), Value::String(msg.into()));
        self
    }

    pub fn payload(mut self, payload: Option<Payload>) -> Self {
        self.payload = payload;
        self
    }

    #[inline]
    pub fn get_status_message(&self) -> Option<&str> {
        self.headers.as_ref().and_then(|h| h.get(STATUS_MESSAGE)).and_then(|v| v.as_str())
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Status: {}, Headers: {:?}, Payload: {:?}", self.status, self.headers, self.payload)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Status {
    Ok,
    NoContent,
    BadRequest,
    NotFound,
    InternalError,
    ServiceUnavailable,
}

impl Status {
    #[inline]
    pub fn code(&self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::NoContent => 204,
            Status::BadRequest => 400,
            Status::NotFound => 404,
            Status::InternalError => 500,
            Status::ServiceUnavailable => 503,
        }
    }

    #[inline]
    pub fn from_code(code: u16) -> Option<Self> {
        Some(match code {
            200 => Status::Ok,
            204 => Status::NoContent,
            400 => Status::BadRequest,
            404 => Status::NotFound,
            500 => Status::InternalError,
            503 => Status::ServiceUnavailable,
            _ => return None,
        })
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl Serialize for Status {
    #[inline]
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u16(self.code())
    }
}

impl<'de> Deserialize<'de> for Status {
    #[inline]
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let code = u16::deserialize(deserializer)?;
        Status::from_code(code).ok_or_else(|| de::Error::custom(format!("unknown status code {code}")))
    }
}
