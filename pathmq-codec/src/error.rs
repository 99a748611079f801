use std::io;

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The byte stream is not valid JSON, the reader position cannot be trusted any more
    #[error("Malformed JSON: {0}")]
    MalformedJson(String),
    /// Well-formed JSON object that does not describe a frame
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),
    #[error("Max size exceeded")]
    MaxSizeExceeded,
    #[error("io error, {:?}", _0)]
    Io(io::Error),
}

impl DecodeError {
    /// Only malformed JSON is answered before the connection is dropped.
    #[inline]
    pub fn is_malformed(&self) -> bool {
        matches!(self, DecodeError::MalformedJson(_))
    }
}

impl From<io::Error> for DecodeError {
    fn from(e: io::Error) -> DecodeError {
        DecodeError::Io(e)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("Serialize error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error, {:?}", _0)]
    Io(io::Error),
}

impl From<io::Error> for EncodeError {
    fn from(e: io::Error) -> EncodeError {
        EncodeError::Io(e)
    }
}
