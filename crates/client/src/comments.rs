//! Per-product comment thread cache.
//!
//! Threads are fetched on first use and then served from memory. There is no
//! expiry: a cached thread reflects the remote store as of its last fetch or
//! the last local mutation, and only local writes invalidate it.
//!
//! Completions are ordered per product by a [`Sequencer`]: a fetch that was
//! issued before a later fetch or post has been applied is discarded, so a
//! slow response can never overwrite newer state. Deletes do not discard
//! fetches in flight; their comments are filtered out of those responses.

use std::collections::HashMap;
use std::sync::Arc;

use moka::future::Cache;
use souq_core::{CommentId, CommentThread, ProductId, UserId};
use tokio::sync::Mutex;
use tracing::{debug, error, instrument, warn};

use crate::error::{ClientError, Result};
use crate::notify::{NotificationSink, messages};
use crate::remote::{RemoteDataService, RemoteError};
use crate::sequencer::Sequencer;

/// What a successful comment insert does to the cached thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WritePolicy {
    /// Drop the cached thread and refetch it right away, so the new comment
    /// shows with its server timestamp and author snapshot.
    #[default]
    InvalidateAndRefetch,
    /// Drop the cached thread; the next `ensure_loaded` refetches it.
    Invalidate,
}

/// Lazily populated, invalidate-on-write comment threads keyed by product.
pub struct CommentThreadCache {
    remote: Arc<dyn RemoteDataService>,
    notifications: NotificationSink,
    threads: Cache<ProductId, CommentThread>,
    order: Mutex<FetchOrder>,
    policy: WritePolicy,
}

/// Ticket bookkeeping for fetches in flight.
struct FetchOrder {
    sequencer: Sequencer<ProductId>,
    /// Comments deleted while a fetch was in flight, with the stamp of the
    /// delete. Fetches issued before the stamp may still contain them.
    deleted: HashMap<ProductId, Vec<(u64, CommentId)>>,
}

impl FetchOrder {
    fn new() -> Self {
        Self {
            sequencer: Sequencer::new(),
            deleted: HashMap::new(),
        }
    }

    /// Hand back a fetch ticket. Returns the comments to filter out of its
    /// response, or `None` if the response is stale.
    fn finish(&mut self, product_id: ProductId, ticket: u64) -> Option<Vec<CommentId>> {
        let fresh = self.sequencer.finish(product_id, ticket);
        let filtered = fresh.then(|| {
            self.deleted
                .get(&product_id)
                .map(|deleted| {
                    deleted
                        .iter()
                        .filter(|(stamp, _)| *stamp > ticket)
                        .map(|(_, id)| *id)
                        .collect()
                })
                .unwrap_or_default()
        });

        if self.sequencer.is_tracking(product_id) {
            // Older fetches can no longer apply; their deletes are settled.
            if let Some(deleted) = self.deleted.get_mut(&product_id) {
                deleted.retain(|(stamp, _)| *stamp > ticket);
            }
        } else {
            self.deleted.remove(&product_id);
        }
        filtered
    }

    fn record_delete(&mut self, product_id: ProductId, comment_id: CommentId) {
        if let Some(stamp) = self.sequencer.stamp(product_id) {
            self.deleted
                .entry(product_id)
                .or_default()
                .push((stamp, comment_id));
        }
    }
}

impl CommentThreadCache {
    #[must_use]
    pub fn new(
        remote: Arc<dyn RemoteDataService>,
        notifications: NotificationSink,
        capacity: u64,
    ) -> Self {
        Self {
            remote,
            notifications,
            threads: Cache::builder().max_capacity(capacity).build(),
            order: Mutex::new(FetchOrder::new()),
            policy: WritePolicy::default(),
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: WritePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The cached thread for `product_id`, without fetching.
    pub async fn cached(&self, product_id: ProductId) -> Option<CommentThread> {
        self.threads.get(&product_id).await
    }

    /// Return the thread for `product_id`, fetching it only if not cached.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Network` if the fetch fails; nothing is cached.
    #[instrument(skip(self))]
    pub async fn ensure_loaded(&self, product_id: ProductId) -> Result<CommentThread> {
        if let Some(thread) = self.threads.get(&product_id).await {
            debug!(comments = thread.len(), "Comment thread cache hit");
            return Ok(thread);
        }
        self.fetch(product_id).await
    }

    /// Drop the cached thread and discard any fetch still in flight for it.
    pub async fn invalidate(&self, product_id: ProductId) {
        let mut order = self.order.lock().await;
        order.sequencer.fence(product_id);
        self.threads.invalidate(&product_id).await;
    }

    /// Post a comment as `author_id`.
    ///
    /// Blank text is rejected before any remote call and raises no
    /// notification. After the insert the thread is refreshed according to
    /// the cache's [`WritePolicy`]. While a refetch is in flight the previous
    /// thread stays cached.
    ///
    /// # Errors
    ///
    /// - `ClientError::Validation` if `text` is blank
    /// - `ClientError::Network` if the insert fails (an error notification is raised)
    #[instrument(skip(self, text))]
    pub async fn add(&self, product_id: ProductId, author_id: UserId, text: &str) -> Result<()> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ClientError::Validation(
                "comment text is empty".to_string(),
            ));
        }

        if let Err(e) = self.remote.insert_comment(product_id, author_id, text).await {
            error!(error = %e, "Failed to insert comment");
            self.notifications.error(messages::COMMENT_ADD_FAILED);
            return Err(e.into());
        }

        match self.policy {
            WritePolicy::Invalidate => self.invalidate(product_id).await,
            WritePolicy::InvalidateAndRefetch => {
                // Fetches issued before the insert may lack the new comment.
                self.order.lock().await.sequencer.fence(product_id);
                if let Err(e) = self.fetch(product_id).await {
                    // The comment exists remotely either way.
                    warn!(error = %e, "Comment posted but thread refetch failed");
                    self.invalidate(product_id).await;
                }
            }
        }

        self.notifications.success(messages::COMMENT_ADDED);
        Ok(())
    }

    /// Delete a comment from the cached thread of `product_id`.
    ///
    /// Only the comment's author may delete it. This check is a courtesy to
    /// the user; the remote service enforces its own access rules.
    ///
    /// # Errors
    ///
    /// - `ClientError::NotFound` if the comment is not in the cached thread
    /// - `ClientError::NotCommentAuthor` if `requester_id` did not write it
    /// - `ClientError::NotFound` if it was already deleted remotely (it is
    ///   dropped from the cache too)
    /// - `ClientError::Network` if the delete fails (an error notification is raised)
    #[instrument(skip(self))]
    pub async fn remove(
        &self,
        comment_id: CommentId,
        product_id: ProductId,
        requester_id: UserId,
    ) -> Result<()> {
        let thread = self
            .threads
            .get(&product_id)
            .await
            .ok_or_else(|| ClientError::comment_missing(comment_id))?;
        let comment = thread
            .find(comment_id)
            .ok_or_else(|| ClientError::comment_missing(comment_id))?;

        if comment.author_id != requester_id {
            debug!(author_id = %comment.author_id, "Rejected delete of another user's comment");
            return Err(ClientError::NotCommentAuthor(comment_id));
        }

        match self.remote.delete_comment(comment_id).await {
            Ok(()) => {}
            Err(RemoteError::NotFound(what)) => {
                warn!(comment_id = %comment_id, "Comment already deleted remotely");
                self.drop_comment(product_id, comment_id).await;
                self.notifications.error(messages::COMMENT_DELETE_FAILED);
                return Err(ClientError::NotFound(what));
            }
            Err(e) => {
                error!(error = %e, "Failed to delete comment");
                self.notifications.error(messages::COMMENT_DELETE_FAILED);
                return Err(e.into());
            }
        }

        self.drop_comment(product_id, comment_id).await;
        self.notifications.success(messages::COMMENT_DELETED);
        Ok(())
    }

    /// Fetch and cache the thread unless a newer operation got there first.
    async fn fetch(&self, product_id: ProductId) -> Result<CommentThread> {
        let ticket = self.order.lock().await.sequencer.issue(product_id);

        let result = self.remote.list_comments(product_id).await;

        let mut order = self.order.lock().await;
        let filtered = order.finish(product_id, ticket);
        let comments = result.map_err(|e| {
            warn!(error = %e, "Failed to fetch comment thread");
            ClientError::from(e)
        })?;
        let mut thread = CommentThread::new(product_id, comments);

        if let Some(deleted) = filtered {
            for comment_id in deleted {
                thread = thread.without(comment_id);
            }
            self.threads.insert(product_id, thread.clone()).await;
            debug!(comments = thread.len(), ticket, "Cached comment thread");
            Ok(thread)
        } else {
            debug!(ticket, "Discarding stale comment thread");
            Ok(self.threads.get(&product_id).await.unwrap_or(thread))
        }
    }

    /// Filter a deleted comment out of the cached thread and out of any
    /// fetch still in flight.
    ///
    /// Deletion does not reorder the rest, so no refetch is needed.
    async fn drop_comment(&self, product_id: ProductId, comment_id: CommentId) {
        let mut order = self.order.lock().await;
        order.record_delete(product_id, comment_id);
        if let Some(thread) = self.threads.get(&product_id).await {
            self.threads
                .insert(product_id, thread.without(comment_id))
                .await;
        }
    }
}
