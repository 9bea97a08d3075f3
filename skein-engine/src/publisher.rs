//! Topic-bound publisher handle.

use crate::hub::{HubCmd, HubHandle};
use crate::error::Result;

use skein_core::codec;
use skein_core::convert::IntoData;
use skein_core::topic::Topic;
use std::fmt;
use tracing::trace;

/// Publishes values under one fixed topic.
///
/// Publications from one publisher arrive at each peer in the order they
/// were made.
pub struct Publisher {
    topic: Topic,
    core: HubHandle,
}

impl fmt::Debug for Publisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Publisher")
            .field("endpoint", &self.core.shared.id)
            .field("topic", &self.topic)
            .finish()
    }
}

impl Publisher {
    pub(crate) fn new(topic: Topic, core: HubHandle) -> Self {
        Self { topic, core }
    }

    #[must_use]
    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    /// Convert `value` and send it to every matching peer.
    pub fn publish(&self, value: impl IntoData) -> Result<()> {
        let data = value.into_data()?;
        self.core.send(HubCmd::Publish {
            topic: self.topic.clone(),
            payload: codec::encode(&data),
        })
    }

    /// Convert all values first, then send them as one batch.
    ///
    /// Nothing is sent when any conversion fails.
    pub fn publish_batch<I>(&self, values: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: IntoData,
    {
        let batch = values
            .into_iter()
            .map(|v| Ok((self.topic.clone(), codec::encode(&v.into_data()?))))
            .collect::<Result<Vec<_>>>()?;
        trace!(topic = %self.topic, "[PUB] Batch of {}", batch.len());
        self.core.send(HubCmd::PublishBatch(batch))
    }
}
