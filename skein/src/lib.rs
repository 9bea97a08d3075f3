//! # Skein
//!
//! Typed publish/subscribe messaging between peered endpoints.
//!
//! ## Architecture
//!
//! - **`skein-core`**: typed values, native conversion, wire codec, topics,
//!   messages and statuses, pollable mailboxes
//! - **`skein-engine`**: contexts, endpoints, peering, routing and stores
//! - **`skein`**: public API surface (this crate)
//!
//! ## Quick Start
//!
//! ```rust
//! use skein::prelude::*;
//! use std::time::Duration;
//!
//! # fn main() -> skein::Result<()> {
//! let ctx = Context::new();
//! let server = ctx.endpoint()?;
//! let client = ctx.endpoint()?;
//!
//! let inbox = server.make_subscriber(["/sensors"])?;
//! let port = server.listen("127.0.0.1", 0)?;
//! assert!(client.peer("127.0.0.1", port, Duration::from_secs(1))?);
//!
//! client.publish("/sensors/temp", 21.5)?;
//! let msg = inbox.get()?;
//! assert_eq!(msg.topic(), "/sensors/temp");
//! assert_eq!(msg.get::<f64>()?, 21.5);
//! # Ok(())
//! # }
//! ```
//!
//! ## Typed values
//!
//! Every payload is a [`Data`](skein_core::data::Data) value. Native values
//! convert through [`IntoData`](skein_core::convert::IntoData) on the way in
//! and [`FromData`](skein_core::convert::FromData) on the way out; both
//! directions fail loudly instead of guessing.
//!
//! ## Delivery modes
//!
//! - Blocking: [`Subscriber::get`], `get_timeout`, `poll`, plus a unix
//!   descriptor for readiness loops
//! - Async: [`Subscriber::recv_async`] and [`Subscriber::stream`]
//! - Callbacks: [`Endpoint::subscribe`] and [`Endpoint::on_status`]

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod dev_tracing;

pub use bytes::Bytes;
/// Date/time types accepted by the timestamp and timespan conversions.
pub use time;

pub use skein_core::{codec, convert, data, message, status, topic, vector};
pub use skein_engine::{
    Backend, BackendOptions, Context, Endpoint, EndpointConfig, EndpointState, Error, Frontend,
    MemoryBackend, PeerInfo, PeerStatus, Publisher, Result, StatusSubscriber, Store, StoreBackend,
    Subscriber,
};

/// Everything needed for typical endpoint code.
pub mod prelude {
    pub use skein_core::prelude::*;
    pub use skein_engine::{
        Backend, BackendOptions, Context, Endpoint, EndpointConfig, EndpointState, Error, Frontend,
        PeerInfo, PeerStatus, Publisher, StatusSubscriber, Store, Subscriber,
    };
}
