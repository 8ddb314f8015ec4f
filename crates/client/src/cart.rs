//! The signed-in user's cart.
//!
//! Loads replace the whole list (no merging). Removal is optimistic: the item
//! leaves the list before the remote delete resolves and is put back if the
//! delete fails.

use std::collections::HashMap;
use std::sync::Arc;

use souq_core::cart::sort_newest_first;
use souq_core::{CartItem, CartItemId, Identity};
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

use crate::error::{ClientError, Result};
use crate::notify::{NotificationSink, messages};
use crate::remote::{RemoteDataService, RemoteError};

/// Cart load state.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CartState {
    #[default]
    Idle,
    Loading,
    /// Entries newest first by `added_at`.
    Loaded(Vec<CartItem>),
    /// The last load failed; no items are retained.
    Failed(String),
}

impl CartState {
    /// Loaded entries, or an empty slice in any other state.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        match self {
            Self::Loaded(items) => items,
            _ => &[],
        }
    }
}

#[derive(Debug, Default)]
struct CartInner {
    state: CartState,
    /// Bumped by every load; only the newest load may apply its result.
    generation: u64,
    /// Items removed locally whose remote delete has not resolved yet.
    pending_removals: HashMap<CartItemId, PendingRemoval>,
}

#[derive(Debug)]
struct PendingRemoval {
    item: CartItem,
    /// Newest load whose list held the item. A failed delete restores the
    /// item only while that load's list is still the current one.
    generation: u64,
}

/// Loads and mutates the current user's cart.
pub struct CartStore {
    remote: Arc<dyn RemoteDataService>,
    notifications: NotificationSink,
    inner: Mutex<CartInner>,
}

impl CartStore {
    #[must_use]
    pub fn new(remote: Arc<dyn RemoteDataService>, notifications: NotificationSink) -> Self {
        Self {
            remote,
            notifications,
            inner: Mutex::new(CartInner::default()),
        }
    }

    pub async fn state(&self) -> CartState {
        self.inner.lock().await.state.clone()
    }

    pub async fn items(&self) -> Vec<CartItem> {
        self.inner.lock().await.state.items().to_vec()
    }

    /// Load the cart of `identity`, replacing whatever was loaded before.
    ///
    /// If another load is started before this one completes, this one's
    /// result is discarded and the current items are returned instead.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Network` if the fetch fails; the state becomes
    /// `Failed` and previously loaded items are dropped.
    #[instrument(skip(self), fields(user_id = %identity.user_id))]
    pub async fn load(&self, identity: Identity) -> Result<Vec<CartItem>> {
        let generation = {
            let mut inner = self.inner.lock().await;
            inner.generation += 1;
            inner.state = CartState::Loading;
            inner.generation
        };

        let result = self.remote.list_cart_items(identity.user_id).await;

        let mut inner = self.inner.lock().await;
        if inner.generation != generation {
            debug!(generation, current = inner.generation, "Discarding stale cart load");
            return Ok(inner.state.items().to_vec());
        }

        match result {
            Ok(mut items) => {
                sort_newest_first(&mut items);
                // Deletes still in flight must not reappear, but this list is
                // where they go back to if the delete fails.
                items.retain(|item| match inner.pending_removals.get_mut(&item.id) {
                    Some(pending) => {
                        pending.item = item.clone();
                        pending.generation = generation;
                        false
                    }
                    None => true,
                });
                info!(items = items.len(), "Cart loaded");
                inner.state = CartState::Loaded(items.clone());
                Ok(items)
            }
            Err(e) => {
                error!(error = %e, "Failed to load cart");
                inner.state = CartState::Failed(e.to_string());
                Err(e.into())
            }
        }
    }

    /// Put the cart in `Failed` without a remote call, e.g. when no user is
    /// signed in. Loads still in flight are discarded.
    pub async fn fail(&self, reason: impl Into<String> + Send) {
        let mut inner = self.inner.lock().await;
        inner.generation += 1;
        inner.state = CartState::Failed(reason.into());
    }

    /// Remove an entry from the cart.
    ///
    /// The entry disappears from the loaded list immediately. If the remote
    /// delete fails an error notification is raised and the entry is restored
    /// at its `added_at` position, unless a newer load that no longer
    /// contained it has replaced the list.
    ///
    /// # Errors
    ///
    /// - `ClientError::NotFound` if the entry is not in the loaded list
    ///   (no remote call is made)
    /// - `ClientError::NotFound` if it was already deleted remotely (it
    ///   stays removed)
    /// - `ClientError::Network` if the delete fails
    #[instrument(skip(self))]
    pub async fn remove(&self, item_id: CartItemId) -> Result<()> {
        {
            let mut inner = self.inner.lock().await;
            let CartState::Loaded(items) = &mut inner.state else {
                return Err(ClientError::cart_item_missing(item_id));
            };
            let position = items
                .iter()
                .position(|item| item.id == item_id)
                .ok_or_else(|| ClientError::cart_item_missing(item_id))?;
            let item = items.remove(position);
            let generation = inner.generation;
            inner
                .pending_removals
                .insert(item_id, PendingRemoval { item, generation });
        }

        let result = self.remote.delete_cart_item(item_id).await;

        let mut inner = self.inner.lock().await;
        let removed = inner.pending_removals.remove(&item_id);
        match result {
            Ok(()) => {
                debug!("Cart item removal committed");
                self.notifications.success(messages::CART_ITEM_REMOVED);
                Ok(())
            }
            Err(RemoteError::NotFound(what)) => {
                warn!("Cart item was already deleted remotely");
                self.notifications.error(messages::CART_ITEM_REMOVE_FAILED);
                Err(ClientError::NotFound(what))
            }
            Err(e) => {
                error!(error = %e, "Failed to remove cart item");
                let current = inner.generation;
                if let (Some(PendingRemoval { item, generation }), CartState::Loaded(items)) =
                    (removed, &mut inner.state)
                    && generation == current
                    && !items.iter().any(|i| i.id == item_id)
                {
                    debug!("Restoring cart item");
                    let position = items
                        .iter()
                        .position(|i| i.added_at < item.added_at)
                        .unwrap_or(items.len());
                    items.insert(position, item);
                }
                self.notifications.error(messages::CART_ITEM_REMOVE_FAILED);
                Err(e.into())
            }
        }
    }
}
