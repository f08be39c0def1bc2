//! Batch dispatcher: sends a set of stored posts to one channel.
//!
//! Lookup failures abort the whole batch before any send. Once posts are
//! resolved, every post gets an entry in the [`DispatchReport`], success or
//! failure; one bad send never stops the others.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::StreamExt;
use serde::Serialize;
use tracing::{info, warn};

use crate::channels::{Channel, ChannelResult, OutboundMessage};
use crate::error::GatewayError;
use crate::store::{Post, PostStore};

/// Per-post outcomes of one batch, keyed by post id.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DispatchReport {
    entries: BTreeMap<i64, ChannelResult>,
}

impl DispatchReport {
    pub fn get(&self, post_id: i64) -> Option<&ChannelResult> {
        self.entries.get(&post_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (i64, &ChannelResult)> {
        self.entries.iter().map(|(id, result)| (*id, result))
    }

    /// Number of entries whose send failed.
    pub fn failed(&self) -> usize {
        self.entries.values().filter(|r| !r.ok).count()
    }
}

impl FromIterator<(i64, ChannelResult)> for DispatchReport {
    fn from_iter<I: IntoIterator<Item = (i64, ChannelResult)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Applies one channel client to every post of a batch.
pub struct Dispatcher {
    store: Arc<dyn PostStore>,
    channel: Arc<dyn Channel>,
    publisher_endpoint: String,
    concurrency: usize,
}

impl Dispatcher {
    pub fn new(
        store: Arc<dyn PostStore>,
        channel: Arc<dyn Channel>,
        publisher_endpoint: impl Into<String>,
    ) -> Self {
        Self {
            store,
            channel,
            publisher_endpoint: publisher_endpoint.into(),
            concurrency: 1,
        }
    }

    /// Allow up to `n` sends in flight at once. Values below 1 mean sequential.
    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    /// Resolve `post_ids` and send each post, collecting one entry per post.
    pub async fn dispatch(&self, post_ids: &[i64]) -> Result<DispatchReport, GatewayError> {
        if post_ids.is_empty() {
            return Err(GatewayError::Validation("`posts` can not be empty".into()));
        }

        let posts = self.store.list(post_ids).await?;
        let channel = self.channel.kind();
        info!(%channel, posts = posts.len(), "Dispatching batch");

        let report: DispatchReport = futures::stream::iter(posts)
            .map(|post| async move { self.dispatch_one(&post).await })
            .buffer_unordered(self.concurrency)
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .collect();

        let failed = report.failed();
        if failed > 0 {
            warn!(%channel, failed, total = report.len(), "Batch finished with failed sends");
        } else {
            info!(%channel, total = report.len(), "Batch finished");
        }

        Ok(report)
    }

    async fn dispatch_one(&self, post: &Post) -> (i64, ChannelResult) {
        let Some(destination) = self
            .channel
            .destination_for(post, &self.publisher_endpoint)
        else {
            return (
                post.id,
                ChannelResult::failure(format!(
                    "post {} has no {} destination configured",
                    post.id,
                    self.channel.kind()
                )),
            );
        };

        let message = OutboundMessage {
            content: post.content.clone(),
            destination,
        };
        (post.id, self.channel.send(&message).await)
    }
}
