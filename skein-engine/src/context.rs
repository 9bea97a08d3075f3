//! Endpoint factory and owner of the listener registry.

use crate::config::EndpointConfig;
use crate::endpoint::Endpoint;
use crate::error::Result;
use crate::registry::Registry;

use std::sync::Arc;

#[derive(Debug, Default)]
struct ContextInner {
    registry: Arc<Registry>,
    config: EndpointConfig,
}

/// A group of endpoints that can peer with each other.
///
/// Cloning is cheap; clones share the same registry. Endpoints of two
/// unrelated contexts cannot see each other's listeners.
///
/// # Examples
///
/// ```
/// use skein_engine::context::Context;
/// use std::time::Duration;
///
/// let ctx = Context::new();
/// let a = ctx.endpoint().unwrap();
/// let b = ctx.endpoint().unwrap();
/// let port = a.listen("127.0.0.1", 0).unwrap();
/// assert!(b.peer("127.0.0.1", port, Duration::from_secs(1)).unwrap());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Context {
    inner: Arc<ContextInner>,
}

impl Context {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `config` for every endpoint spawned by [`endpoint`](Self::endpoint).
    #[must_use]
    pub fn with_config(config: EndpointConfig) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                registry: Arc::default(),
                config,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &EndpointConfig {
        &self.inner.config
    }

    /// Spawn an endpoint with the context's configuration.
    pub fn endpoint(&self) -> Result<Endpoint> {
        self.endpoint_with(self.inner.config.clone())
    }

    /// Spawn an endpoint with its own configuration.
    pub fn endpoint_with(&self, config: EndpointConfig) -> Result<Endpoint> {
        Endpoint::spawn(self.inner.registry.clone(), config)
    }

    /// Bound `(address, port)` pairs across all endpoints.
    #[must_use]
    pub fn listeners(&self) -> Vec<(String, u16)> {
        self.inner.registry.list()
    }
}
