pub use pathmq_codec::{Headers, Payload, Request, Response, Status};

/// What a SEND stores and a RECEIVE hands back, `None` when the SEND carried no payload
pub type Message = Option<Payload>;

pub type ConnectionId = u64;

pub type HashMap<K, V> = std::collections::HashMap<K, V, ahash::RandomState>;
