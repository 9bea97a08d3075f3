//! # Skein Engine
//!
//! Endpoints, peering and message routing on top of `skein-core`.
//!
//! ## Overview
//!
//! - **Context**: owns the listener registry endpoints peer through
//! - **Endpoint**: one core thread per endpoint; publish, subscribe, peer
//! - **Subscriber / StatusSubscriber**: blocking, pollable and async receive
//! - **Publisher**: topic-bound publishing handle
//! - **Store**: master/clone key-value stores shared across peers
//!
//! Publications travel one hop: from the publishing endpoint to each peer
//! whose subscriptions match the topic.

#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::match_same_arms)]

mod hub;
mod registry;

pub mod config;
pub mod context;
pub mod endpoint;
pub mod error;
pub mod publisher;
pub mod store;
pub mod subscriber;

pub use crate::hub::{PeerInfo, PeerStatus};
pub use config::EndpointConfig;
pub use context::Context;
pub use endpoint::{Endpoint, EndpointState};
pub use error::{Error, Result};
pub use publisher::Publisher;
pub use store::{Backend, BackendOptions, Frontend, MemoryBackend, Store, StoreBackend};
pub use subscriber::{StatusSubscriber, Subscriber};
