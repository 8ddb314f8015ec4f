//! The consolidated marketplace store.
//!
//! One store owns the session, cart, comment cache, selection, drafts and
//! notifications. The presentation layer raises intents through its methods
//! and renders [`StoreView`]; it never mutates the parts directly.

use std::collections::HashMap;
use std::sync::Arc;

use souq_core::{CartItem, CartItemId, Comment, CommentId, CommentThread, Identity, ProductId, Selection};
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use crate::cart::{CartState, CartStore};
use crate::comments::CommentThreadCache;
use crate::config::{ClientConfig, DEFAULT_COMMENT_CACHE_CAPACITY, NotificationConfig};
use crate::error::Result;
use crate::modal::ModalController;
use crate::notify::{Notification, NotificationSink};
use crate::remote::RemoteDataService;
use crate::session::SessionGate;

/// Everything the presentation layer renders, read at one point in time.
#[derive(Debug, Clone)]
pub struct StoreView {
    pub identity: Option<Identity>,
    pub cart: CartState,
    pub selection: Selection,
    /// Thread of the selected product, once loaded.
    pub visible_thread: Option<CommentThread>,
    pub notification: Option<Notification>,
}

/// Cart and comment orchestration for the signed-in user.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct MarketplaceStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    session: SessionGate,
    cart: CartStore,
    comments: CommentThreadCache,
    modal: Mutex<ModalController>,
    drafts: Mutex<HashMap<ProductId, String>>,
    notifications: NotificationSink,
}

impl MarketplaceStore {
    /// Create a store over `remote` with the configured cache size and
    /// notification intervals.
    #[must_use]
    pub fn new(remote: Arc<dyn RemoteDataService>, config: &ClientConfig) -> Self {
        Self::with_settings(remote, config.comment_cache_capacity, config.notifications)
    }

    /// Create a store with default settings.
    #[must_use]
    pub fn with_defaults(remote: Arc<dyn RemoteDataService>) -> Self {
        Self::with_settings(
            remote,
            DEFAULT_COMMENT_CACHE_CAPACITY,
            NotificationConfig::default(),
        )
    }

    fn with_settings(
        remote: Arc<dyn RemoteDataService>,
        comment_cache_capacity: u64,
        notification_config: NotificationConfig,
    ) -> Self {
        let notifications = NotificationSink::new(notification_config);
        Self {
            inner: Arc::new(StoreInner {
                session: SessionGate::new(Arc::clone(&remote)),
                cart: CartStore::new(Arc::clone(&remote), notifications.clone()),
                comments: CommentThreadCache::new(
                    remote,
                    notifications.clone(),
                    comment_cache_capacity,
                ),
                modal: Mutex::new(ModalController::new()),
                drafts: Mutex::new(HashMap::new()),
                notifications,
            }),
        }
    }

    /// The notification sink, for subscribing to new messages.
    #[must_use]
    pub fn notifications(&self) -> &NotificationSink {
        &self.inner.notifications
    }

    /// Snapshot of everything currently visible.
    pub async fn view(&self) -> StoreView {
        let selection = self.inner.modal.lock().await.selection();
        let visible_thread = match selection.product() {
            Some(product_id) => self.inner.comments.cached(product_id).await,
            None => None,
        };
        StoreView {
            identity: self.inner.session.current(),
            cart: self.inner.cart.state().await,
            selection,
            visible_thread,
            notification: self.inner.notifications.current(),
        }
    }

    // =========================================================================
    // Cart
    // =========================================================================

    /// Resolve the user and load their cart.
    ///
    /// # Errors
    ///
    /// - `ClientError::Unauthenticated` if nobody is signed in; the cart
    ///   becomes `Failed` and the caller should redirect to sign-in
    /// - `ClientError::Network` if the cart fetch fails
    #[instrument(skip(self))]
    pub async fn start(&self) -> Result<Vec<CartItem>> {
        let identity = match self.inner.session.resolve().await {
            Ok(identity) => identity,
            Err(e) => {
                self.inner.cart.fail(e.to_string()).await;
                return Err(e);
            }
        };
        self.inner.cart.load(identity).await
    }

    /// Load the cart again, discarding any load still in flight.
    ///
    /// # Errors
    ///
    /// Same as [`Self::start`].
    pub async fn reload_cart(&self) -> Result<Vec<CartItem>> {
        self.start().await
    }

    /// Remove an entry from the cart (optimistic).
    ///
    /// # Errors
    ///
    /// See [`CartStore::remove`].
    pub async fn remove_cart_item(&self, item_id: CartItemId) -> Result<()> {
        self.inner.cart.remove(item_id).await
    }

    // =========================================================================
    // Comments
    // =========================================================================

    /// Show the comment thread of `product_id`, loading it if needed.
    ///
    /// Returns `None` if the selection changed while the thread was loading;
    /// the thread is still cached for when it is reopened.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Network` if the thread cannot be fetched. The
    /// selection stays open with no visible thread.
    #[instrument(skip(self))]
    pub async fn open_comments(&self, product_id: ProductId) -> Result<Option<CommentThread>> {
        let ticket = self.inner.modal.lock().await.open(product_id);
        let thread = self.inner.comments.ensure_loaded(product_id).await?;

        if self.inner.modal.lock().await.is_current(&ticket) {
            Ok(Some(thread))
        } else {
            debug!("Selection changed while loading comments");
            Ok(None)
        }
    }

    pub async fn close_comments(&self) {
        self.inner.modal.lock().await.close();
    }

    pub async fn selection(&self) -> Selection {
        self.inner.modal.lock().await.selection()
    }

    /// Replace the unsent comment text for `product_id`.
    pub async fn set_draft(&self, product_id: ProductId, text: impl Into<String> + Send) {
        self.inner.drafts.lock().await.insert(product_id, text.into());
    }

    /// The unsent comment text for `product_id`.
    pub async fn draft(&self, product_id: ProductId) -> String {
        self.inner
            .drafts
            .lock()
            .await
            .get(&product_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Whether the draft for `product_id` may be sent.
    pub async fn can_post(&self, product_id: ProductId) -> bool {
        self.inner
            .drafts
            .lock()
            .await
            .get(&product_id)
            .is_some_and(|text| !text.trim().is_empty())
    }

    /// Post `text` on `product_id` as the signed-in user.
    ///
    /// # Errors
    ///
    /// - `ClientError::Unauthenticated` if nobody is signed in
    /// - see [`CommentThreadCache::add`]
    pub async fn post_comment(&self, product_id: ProductId, text: &str) -> Result<()> {
        let identity = self.inner.session.resolve().await?;
        self.inner
            .comments
            .add(product_id, identity.user_id, text)
            .await
    }

    /// Post the draft for `product_id` and clear it once posted.
    ///
    /// The draft is kept if the post fails or if it was edited meanwhile.
    ///
    /// # Errors
    ///
    /// See [`Self::post_comment`].
    pub async fn submit_draft(&self, product_id: ProductId) -> Result<()> {
        let text = self.draft(product_id).await;
        self.post_comment(product_id, &text).await?;

        let mut drafts = self.inner.drafts.lock().await;
        if drafts.get(&product_id) == Some(&text) {
            drafts.remove(&product_id);
        }
        Ok(())
    }

    /// Delete one of the signed-in user's comments.
    ///
    /// # Errors
    ///
    /// - `ClientError::Unauthenticated` if nobody is signed in
    /// - see [`CommentThreadCache::remove`]
    pub async fn delete_comment(&self, comment_id: CommentId, product_id: ProductId) -> Result<()> {
        let identity = self.inner.session.resolve().await?;
        self.inner
            .comments
            .remove(comment_id, product_id, identity.user_id)
            .await
    }

    /// Whether the signed-in user may delete `comment`.
    #[must_use]
    pub fn can_delete(&self, comment: &Comment) -> bool {
        self.inner
            .session
            .current()
            .is_some_and(|identity| identity.user_id == comment.author_id)
    }

    /// The signed-in identity, resolving it if needed.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Unauthenticated` if nobody is signed in.
    pub async fn identity(&self) -> Result<Identity> {
        self.inner.session.resolve().await
    }
}

impl std::fmt::Debug for MarketplaceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketplaceStore")
            .field("identity", &self.inner.session.current())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};
    use souq_core::UserId;

    use super::*;
    use crate::error::ClientError;
    use crate::testing::{InMemoryRemote, Operation};

    fn signed_in() -> (Arc<InMemoryRemote>, MarketplaceStore, Identity) {
        let remote = Arc::new(InMemoryRemote::new());
        let identity = Identity::new(UserId::random());
        remote.sign_in(identity);
        let store = MarketplaceStore::with_defaults(remote.clone());
        (remote, store, identity)
    }

    #[tokio::test]
    async fn test_start_without_session_fails_cart() {
        let remote = Arc::new(InMemoryRemote::new());
        let store = MarketplaceStore::with_defaults(remote.clone());

        let err = store.start().await.unwrap_err();

        assert!(matches!(err, ClientError::Unauthenticated));
        assert!(matches!(store.view().await.cart, CartState::Failed(_)));
        assert_eq!(remote.calls(Operation::ListCartItems), 0);
    }

    #[tokio::test]
    async fn test_view_shows_selected_thread() {
        let (remote, store, identity) = signed_in();
        let product = remote.add_product(&remote.add_profile("seller"), "rug", 900);
        remote.seed_comment(
            product.id,
            identity.user_id,
            "soft",
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        );

        assert!(store.open_comments(product.id).await.unwrap().is_some());
        let view = store.view().await;
        assert_eq!(view.selection, Selection::Open(product.id));
        assert_eq!(view.visible_thread.unwrap().len(), 1);

        store.close_comments().await;
        let view = store.view().await;
        assert_eq!(view.selection, Selection::Closed);
        assert!(view.visible_thread.is_none());
    }

    #[tokio::test]
    async fn test_open_result_discarded_after_close() {
        let (remote, store, _) = signed_in();
        let product = remote.add_product(&remote.add_profile("seller"), "lamp", 120);
        let gate = remote.hold(Operation::ListComments);

        let opening = {
            let store = store.clone();
            tokio::spawn(async move { store.open_comments(product.id).await })
        };
        gate.entered().await;
        store.close_comments().await;
        gate.release();

        assert!(opening.await.unwrap().unwrap().is_none());
        assert_eq!(store.selection().await, Selection::Closed);
    }

    #[tokio::test]
    async fn test_submit_draft_clears_it() {
        let (remote, store, _) = signed_in();
        let product = remote.add_product(&remote.add_profile("seller"), "kettle", 75);
        store.open_comments(product.id).await.unwrap();

        store.set_draft(product.id, "   ").await;
        assert!(!store.can_post(product.id).await);

        store.set_draft(product.id, "does it whistle?").await;
        assert!(store.can_post(product.id).await);
        store.submit_draft(product.id).await.unwrap();

        assert_eq!(store.draft(product.id).await, "");
        let thread = store.view().await.visible_thread.unwrap();
        assert_eq!(thread.head().unwrap().content, "does it whistle?");
    }

    #[tokio::test]
    async fn test_failed_post_keeps_draft() {
        let (remote, store, _) = signed_in();
        let product = remote.add_product(&remote.add_profile("seller"), "mirror", 40);
        remote.fail(Operation::InsertComment);

        store.set_draft(product.id, "keep me").await;
        store.submit_draft(product.id).await.unwrap_err();

        assert_eq!(store.draft(product.id).await, "keep me");
    }

    #[tokio::test]
    async fn test_can_delete_only_own_comments() {
        let (remote, store, identity) = signed_in();
        let other = remote.add_profile("neighbour");
        let product = remote.add_product(&other, "chair", 60);
        let at = Utc.with_ymd_and_hms(2025, 2, 2, 0, 0, 0).unwrap();
        remote.seed_comment(product.id, identity.user_id, "mine", at);
        remote.seed_comment(product.id, other.id, "theirs", at);
        store.identity().await.unwrap();

        let thread = store.open_comments(product.id).await.unwrap().unwrap();
        let allowed: Vec<bool> = thread.iter().map(|c| store.can_delete(c)).collect();
        assert_eq!(allowed.iter().filter(|&&a| a).count(), 1);
    }
}
