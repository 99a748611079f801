use pathmq_codec::{DecodeError, EncodeError};

#[derive(Debug, thiserror::Error)]
pub enum NetError {
    #[error("Decoding error: {0}")]
    Decode(#[from] DecodeError),
    #[error("Encoding error: {0}")]
    Encode(#[from] EncodeError),
    /// Write timeout
    #[error("Write timeout")]
    WriteTimeout,
    /// Close timeout
    #[error("Close timeout")]
    CloseTimeout,
    #[error("Connection closed by peer")]
    Disconnected,
}

impl NetError {
    /// True when the peer sent bytes that are not JSON.
    #[inline]
    pub fn is_malformed(&self) -> bool {
        matches!(self, NetError::Decode(e) if e.is_malformed())
    }
}
