//! Skein Core
//!
//! This crate contains the engine-agnostic building blocks:
//! - Typed, self-describing values (`data`)
//! - Native value conversion in both directions (`convert`)
//! - Binary wire encoding of values (`codec`)
//! - Topics and the prefix subscription index (`topic`, `pubsub`)
//! - Message and status envelopes (`message`, `status`)
//! - Pollable delivery queues (`mailbox`, `flare`)
//! - Error types (`error`)

#![deny(unsafe_code)]
// Allow some pedantic lints that are intentional in this crate
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::match_same_arms)]
pub mod codec;
pub mod convert;
pub mod data;
pub mod error;
pub mod mailbox;
pub mod message;
pub mod status;
pub mod topic;

#[cfg(unix)]
pub mod flare;

pub mod pubsub {
    pub mod index;
}

// A small prelude to make downstream crates ergonomic.
pub mod prelude {
    pub use crate::convert::{from_data, to_data, FromData, IntoData};
    pub use crate::data::{
        Address, Data, DataType, DataVisitor, EnumValue, Family, Port, Protocol, Set, Subnet,
        Table, Timespan, Timestamp, Vector,
    };
    pub use crate::error::{CodecError, ConversionError};
    pub use crate::message::Message;
    pub use crate::status::{
        Code, EndpointId, EndpointInfo, ErrorCode, NetworkInfo, Status, StatusCode,
    };
    pub use crate::topic::{topics, Topic};
    pub use crate::vector;
}
