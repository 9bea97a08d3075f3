//! Published messages.
//!
//! A [`Message`] pairs a topic with a payload. The payload travels in its
//! wire form and is decoded into [`Data`] on first access; the decoded value
//! is cached for the lifetime of the message.

use crate::codec::{self, Decoder, DEFAULT_MAX_DEPTH};
use crate::convert::FromData;
use crate::data::Data;
use crate::error::CodecError;
use crate::topic::Topic;

use bytes::Bytes;
use once_cell::sync::OnceCell;
use std::fmt;

/// A topic plus a lazily decoded payload.
///
/// # Examples
///
/// ```
/// use skein_core::data::Data;
/// use skein_core::message::Message;
///
/// let msg = Message::new("/topic/test", Data::Count(42));
/// assert_eq!(msg.topic(), "/topic/test");
/// assert_eq!(msg.get::<u64>().unwrap(), 42);
/// assert!(msg == ("/topic/test", Data::Count(42)));
/// ```
#[derive(Clone)]
pub struct Message {
    topic: Topic,
    payload: Bytes,
    decoded: OnceCell<Data>,
    max_depth: usize,
}

impl Message {
    /// Build a message from an already typed value.
    pub fn new(topic: impl Into<Topic>, data: Data) -> Self {
        let payload = codec::encode(&data);
        Self {
            topic: topic.into(),
            payload,
            decoded: OnceCell::with_value(data),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Wrap a received wire payload; decoding happens on first access.
    #[must_use]
    pub fn from_wire(topic: Topic, payload: Bytes) -> Self {
        Self {
            topic,
            payload,
            decoded: OnceCell::new(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Override the nesting limit used by the lazy decode.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    #[inline]
    #[must_use]
    pub fn topic(&self) -> &str {
        self.topic.as_str()
    }

    #[inline]
    #[must_use]
    pub fn topic_ref(&self) -> &Topic {
        &self.topic
    }

    /// The wire form of the payload.
    #[inline]
    #[must_use]
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// The payload as typed data, decoding it once.
    pub fn data(&self) -> Result<&Data, CodecError> {
        self.decoded
            .get_or_try_init(|| Decoder::new(self.max_depth).decode(&self.payload))
    }

    /// Decode and convert the payload into a native value.
    pub fn get<T: FromData>(&self) -> Result<T, CodecError> {
        Ok(T::from_data(self.data()?)?)
    }

    /// Whether the payload has been decoded already.
    #[must_use]
    pub fn is_decoded(&self) -> bool {
        self.decoded.get().is_some()
    }

    /// Split into topic and typed payload.
    pub fn into_parts(self) -> Result<(Topic, Data), CodecError> {
        let data = match self.decoded.into_inner() {
            Some(data) => data,
            None => Decoder::new(self.max_depth).decode(&self.payload)?,
        };
        Ok((self.topic, data))
    }
}

impl PartialEq for Message {
    fn eq(&self, other: &Self) -> bool {
        self.topic == other.topic && self.payload == other.payload
    }
}

impl Eq for Message {}

impl PartialEq<(&str, Data)> for Message {
    fn eq(&self, other: &(&str, Data)) -> bool {
        self.topic == *other.0 && self.data().is_ok_and(|d| *d == other.1)
    }
}

impl PartialEq<(String, Data)> for Message {
    fn eq(&self, other: &(String, Data)) -> bool {
        self.topic == *other.0 && self.data().is_ok_and(|d| *d == other.1)
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Message");
        s.field("topic", &self.topic.as_str());
        match self.data() {
            Ok(d) => s.field("data", &format_args!("{d}")),
            Err(e) => s.field("data", &format_args!("<{e}>")),
        };
        s.finish()
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.data() {
            Ok(d) => write!(f, "({}, {d})", self.topic),
            Err(e) => write!(f, "({}, <{e}>)", self.topic),
        }
    }
}
