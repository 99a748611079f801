#![deny(unsafe_code)]

//! JSON framing for the pathmq wire protocol
//!
//! A connection carries a stream of back-to-back JSON objects, separated by arbitrary whitespace.
//! Clients write [`Request`] objects and the broker answers each one with a [`Response`] object.
//!
//! [`JsonCodec`] plugs into `tokio_util::codec::Framed`:
//! - decoding skips whitespace and every token before the next object start: array brackets,
//!   separators and scalars, so an object nested in an array is still decoded
//! - a partial object waits for more bytes, end-of-stream between objects is a clean close
//! - a syntax error, or an object truncated by end-of-stream, is [`DecodeError::MalformedJson`]

use std::marker::PhantomData;

use bytes::{Buf, BufMut, BytesMut};
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Serialize;

pub mod error;
pub mod types;

pub use error::{DecodeError, EncodeError};
pub use types::{Headers, Payload, Request, Response, Status, STATUS_MESSAGE};

/// Codec used by the broker side of a connection
pub type ServerCodec = JsonCodec<Request>;

/// Codec used by the client side of a connection
pub type ClientCodec = JsonCodec<Response>;

/// Decodes a stream of JSON objects into `T`, encodes any serializable value
#[derive(Debug)]
pub struct JsonCodec<T> {
    max_size: usize,
    _item: PhantomData<fn() -> T>,
}

impl<T> Clone for JsonCodec<T> {
    fn clone(&self) -> Self {
        Self::new(self.max_size)
    }
}

impl<T> Default for JsonCodec<T> {
    fn default() -> Self {
        Self::new(0)
    }
}

impl<T> JsonCodec<T> {
    /// `max_size` bounds a single object in bytes, 0 means unlimited.
    #[inline]
    pub fn new(max_size: usize) -> Self {
        Self { max_size, _item: PhantomData }
    }

    #[inline]
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    #[inline]
    fn check_size(&self, len: usize) -> Result<(), DecodeError> {
        if self.max_size > 0 && len > self.max_size {
            Err(DecodeError::MaxSizeExceeded)
        } else {
            Ok(())
        }
    }
}

impl<T> JsonCodec<T>
where
    T: DeserializeOwned,
{
    fn decode_object(&mut self, src: &mut BytesMut, eof: bool) -> Result<Option<T>, DecodeError> {
        loop {
            let Some(start) = src.iter().position(|b| !b.is_ascii_whitespace()) else {
                src.clear();
                return Ok(None);
            };
            src.advance(start);

            let first = src[0];
            if matches!(first, b'[' | b']' | b',' | b':') {
                src.advance(1);
                continue;
            }

            // IgnoredAny only validates and measures, the item is built once its bytes are complete
            let mut values = serde_json::Deserializer::from_slice(&src[..]).into_iter::<IgnoredAny>();
            match values.next() {
                None => return Ok(None),
                Some(Ok(_)) => {}
                Some(Err(e)) if e.is_eof() => {
                    if eof {
                        return Err(DecodeError::MalformedJson(e.to_string()));
                    }
                    self.check_size(src.len())?;
                    return Ok(None);
                }
                Some(Err(e)) => return Err(DecodeError::MalformedJson(e.to_string())),
            }
            let consumed = values.byte_offset();

            if first == b'{' {
                self.check_size(consumed)?;
                let item = serde_json::from_slice::<T>(&src[..consumed])
                    .map_err(|e| DecodeError::InvalidFrame(e.to_string()));
                src.advance(consumed);
                return item.map(Some);
            }

            // a number that ends the buffer may still be growing
            if matches!(first, b'-' | b'0'..=b'9') && consumed == src.len() && !eof {
                return Ok(None);
            }
            log::trace!("skipping {consumed} bytes of non-object JSON");
            src.advance(consumed);
        }
    }
}

impl<T> tokio_util::codec::Decoder for JsonCodec<T>
where
    T: DeserializeOwned,
{
    type Item = T;
    type Error = DecodeError;

    /// Decodes the next object, `Ok(None)` means more bytes are needed
    ///
    /// ```
    /// use bytes::BytesMut;
    /// use pathmq_codec::{Request, ServerCodec};
    /// use tokio_util::codec::Decoder;
    ///
    /// let mut codec = ServerCodec::default();
    /// let mut buf = BytesMut::from(&b" {\"Method\":\"CREATE\",\"Path\":\"/a\"} {\"Meth"[..]);
    /// assert_eq!(codec.decode(&mut buf).unwrap(), Some(Request::new("CREATE").path("/a")));
    /// assert_eq!(codec.decode(&mut buf).unwrap(), None);
    /// ```
    #[inline]
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        self.decode_object(src, false)
    }

    #[inline]
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        self.decode_object(src, true)
    }
}

impl<T, E> tokio_util::codec::Encoder<E> for JsonCodec<T>
where
    E: Serialize,
{
    type Error = EncodeError;

    #[inline]
    fn encode(&mut self, item: E, dst: &mut BytesMut) -> Result<(), Self::Error> {
        serde_json::to_writer(dst.writer(), &item)?;
        dst.put_u8(b'\n');
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio_util::codec::{Decoder, Encoder};

    fn buf(s: &str) -> BytesMut {
        BytesMut::from(s.as_bytes())
    }

    #[test]
    fn decodes_back_to_back_objects() {
        let mut codec = ServerCodec::default();
        let mut src = buf("{\"Method\":\"CREATE\",\"Path\":\"/a\"}{\"Method\":\"SEND\",\"Path\":\"/a\",\"Payload\":{\"msg\":\"x\"}}\n\t ");
        assert_eq!(codec.decode(&mut src).unwrap(), Some(Request::new("CREATE").path("/a")));
        let send = codec.decode(&mut src).unwrap().unwrap();
        assert_eq!(send.method, "SEND");
        assert_eq!(send.payload, json!({"msg": "x"}).as_object().cloned());
        assert_eq!(codec.decode(&mut src).unwrap(), None);
        assert!(src.is_empty());
    }

    #[test]
    fn waits_for_partial_object() {
        let mut codec = ServerCodec::default();
        let mut src = buf("{\"Method\":\"REC");
        assert_eq!(codec.decode(&mut src).unwrap(), None);
        src.extend_from_slice(b"EIVE\",\"Path\":\"/q\"}");
        assert_eq!(codec.decode(&mut src).unwrap(), Some(Request::new("RECEIVE").path("/q")));
    }

    #[test]
    fn skips_tokens_until_object() {
        let mut codec = ServerCodec::default();
        let mut src = buf("42 \"noise\" [1, {\"Method\":\"X\"}] true {\"Method\":\"SHUTDOWN\"}");
        assert_eq!(codec.decode(&mut src).unwrap(), Some(Request::new("X")));
        assert_eq!(codec.decode(&mut src).unwrap(), Some(Request::new("SHUTDOWN")));
        assert_eq!(codec.decode(&mut src).unwrap(), None);
        assert!(src.is_empty());
    }

    #[test]
    fn decodes_objects_inside_arrays() {
        let mut codec = ServerCodec::default();
        let mut src = buf("[{\"Method\":\"CREATE\",\"Path\":\"/a\"}, {\"Method\":\"SEND\",\"Path\":\"/a\"}] ");
        assert_eq!(codec.decode(&mut src).unwrap(), Some(Request::new("CREATE").path("/a")));
        assert_eq!(codec.decode(&mut src).unwrap(), Some(Request::new("SEND").path("/a")));
        assert_eq!(codec.decode(&mut src).unwrap(), None);
        assert!(src.is_empty());

        let mut src = buf("[{\"Method\":\"CREATE\",\"Path\":\"/a\"}] ");
        assert_eq!(codec.decode(&mut src).unwrap(), Some(Request::new("CREATE").path("/a")));
    }

    #[test]
    fn partial_object_keeps_buffer_intact() {
        let mut codec = ServerCodec::default();
        let mut src = buf("[{\"Method\":\"SEND\",\"Payload\":{\"big\":\"");
        for _ in 0..4 {
            assert_eq!(codec.decode(&mut src).unwrap(), None);
            src.extend_from_slice(b"xxxxxxxx");
        }
        assert!(src.starts_with(b"{\"Method\""));
        src.extend_from_slice(b"\"}}]");
        let req = codec.decode(&mut src).unwrap().unwrap();
        assert_eq!(req.payload, json!({"big": "x".repeat(32)}).as_object().cloned());
    }

    #[test]
    fn trailing_number_waits_until_eof() {
        let mut codec = ServerCodec::default();
        let mut src = buf("12");
        assert_eq!(codec.decode(&mut src).unwrap(), None);
        assert_eq!(src.len(), 2);
        assert_eq!(codec.decode_eof(&mut src).unwrap(), None);
        assert!(src.is_empty());
    }

    #[test]
    fn syntax_error_is_malformed() {
        let mut codec = ServerCodec::default();
        let mut src = buf("{\"Method\" \"CREATE\"}");
        let err = codec.decode(&mut src).unwrap_err();
        assert!(err.is_malformed(), "{err:?}");

        let mut src = buf("hello");
        assert!(codec.decode(&mut src).unwrap_err().is_malformed());
    }

    #[test]
    fn eof_between_objects_is_clean() {
        let mut codec = ServerCodec::default();
        let mut src = buf("  \r\n ");
        assert_eq!(codec.decode_eof(&mut src).unwrap(), None);
    }

    #[test]
    fn truncated_object_at_eof_is_malformed() {
        let mut codec = ServerCodec::default();
        let mut src = buf("{\"Method\":\"CREATE\"");
        assert!(codec.decode_eof(&mut src).unwrap_err().is_malformed());
    }

    #[test]
    fn object_that_is_not_a_request() {
        let mut codec = ServerCodec::default();
        let mut src = buf("{\"Path\":\"/a\"}");
        let err = codec.decode(&mut src).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidFrame(_)), "{err:?}");
        assert!(!err.is_malformed());

        let mut src = buf("{\"Method\":\"SEND\",\"Payload\":\"text\"}");
        assert!(matches!(codec.decode(&mut src), Err(DecodeError::InvalidFrame(_))));
    }

    #[test]
    fn max_size() {
        let mut codec = ServerCodec::new(16);
        let mut src = buf("{\"Method\":\"CREATE\",\"Path\":\"/a\"}");
        assert!(matches!(codec.decode(&mut src), Err(DecodeError::MaxSizeExceeded)));

        let mut src = buf("{\"Method\":\"CREATE\",\"Pa");
        assert!(matches!(codec.decode(&mut src), Err(DecodeError::MaxSizeExceeded)));

        let mut codec = ServerCodec::new(64);
        let mut src = buf("{\"Method\":\"CREATE\"}");
        assert!(codec.decode(&mut src).unwrap().is_some());
    }

    #[test]
    fn encodes_response_for_client() {
        let mut server = ServerCodec::default();
        let mut client = ClientCodec::default();
        let mut dst = BytesMut::new();
        let resp = Response::ok().payload(json!({"msg": "x"}).as_object().cloned());
        server.encode(resp.clone(), &mut dst).unwrap();
        server.encode(Response::no_content(), &mut dst).unwrap();
        assert_eq!(client.decode(&mut dst).unwrap(), Some(resp));
        assert_eq!(client.decode(&mut dst).unwrap(), Some(Response::no_content()));
    }
}
