//! Endpoint configuration
//!
//! Options that control how an endpoint queues deliveries, retries peerings
//! and decodes payloads.

use skein_core::codec::DEFAULT_MAX_DEPTH;
use std::time::Duration;

/// Endpoint configuration options.
///
/// # Examples
///
/// ```
/// use skein_engine::config::EndpointConfig;
/// use std::time::Duration;
///
/// let cfg = EndpointConfig::default()
///     .with_retry_interval(Duration::from_millis(200))
///     .with_mailbox_capacity(1024);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    /// Suppress all status and error notifications.
    pub disable_notifications: bool,

    /// Capacity of each subscriber mailbox.
    ///
    /// - `None`: unbounded (default)
    /// - `Some(n)`: messages arriving at a full mailbox are dropped
    pub mailbox_capacity: Option<usize>,

    /// Delay between attempts of a blocking `peer` call.
    ///
    /// - Default: 1 second
    pub retry_interval: Duration,

    /// Time a dialed endpoint has to answer before the attempt fails.
    ///
    /// - Default: 10 seconds
    pub handshake_timeout: Duration,

    /// Time to wait for store lookups on peers.
    ///
    /// - Default: 1 second
    pub store_timeout: Duration,

    /// Nesting limit when decoding received payloads.
    ///
    /// - Default: 64
    pub max_nesting_depth: usize,

    /// Create a pollable descriptor per subscriber (unix only).
    ///
    /// - Default: true
    pub enable_flare: bool,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            disable_notifications: false,
            mailbox_capacity: None,
            retry_interval: Duration::from_secs(1),
            handshake_timeout: Duration::from_secs(10),
            store_timeout: Duration::from_secs(1),
            max_nesting_depth: DEFAULT_MAX_DEPTH,
            enable_flare: true,
        }
    }
}

impl EndpointConfig {
    /// Create a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn with_disable_notifications(mut self, disable: bool) -> Self {
        self.disable_notifications = disable;
        self
    }

    /// Bound every subscriber mailbox to `capacity` messages.
    #[must_use]
    pub const fn with_mailbox_capacity(mut self, capacity: usize) -> Self {
        self.mailbox_capacity = Some(capacity);
        self
    }

    #[must_use]
    pub const fn with_unbounded_mailboxes(mut self) -> Self {
        self.mailbox_capacity = None;
        self
    }

    #[must_use]
    pub const fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    #[must_use]
    pub const fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn with_max_nesting_depth(mut self, depth: usize) -> Self {
        self.max_nesting_depth = depth;
        self
    }

    #[must_use]
    pub const fn with_flare(mut self, enable: bool) -> Self {
        self.enable_flare = enable;
        self
    }
}
