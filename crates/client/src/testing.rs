//! In-memory remote data service for tests.
//!
//! Counts calls per operation, injects failures, and can hold an operation
//! in flight until the test releases it.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use souq_core::{
    CartItem, CartItemId, Comment, CommentId, Identity, OwnerProfile, Price, ProductId,
    ProductSnapshot, UserId,
};
use tokio::sync::{Notify, Semaphore};

use crate::remote::{RemoteDataService, RemoteError};

/// Remote operations, for call counting and failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListCartItems,
    DeleteCartItem,
    ListComments,
    InsertComment,
    DeleteComment,
    CurrentSession,
}

/// Holds calls of one operation until released.
#[derive(Debug)]
pub struct Gate {
    permits: Semaphore,
    entered: Notify,
}

impl Default for Gate {
    fn default() -> Self {
        Self {
            permits: Semaphore::new(0),
            entered: Notify::new(),
        }
    }
}

impl Gate {
    /// Wait until a held call has reached the gate.
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    /// Let one held call proceed.
    pub fn release(&self) {
        self.permits.add_permits(1);
    }

    async fn pass(&self) {
        self.entered.notify_one();
        if let Ok(permit) = self.permits.acquire().await {
            permit.forget();
        }
    }
}

#[derive(Debug)]
struct StoredCartItem {
    id: CartItemId,
    user_id: UserId,
    product_id: ProductId,
    added_at: DateTime<Utc>,
}

#[derive(Debug)]
struct StoredComment {
    id: CommentId,
    product_id: ProductId,
    content: String,
    created_at: DateTime<Utc>,
    author_id: UserId,
}

#[derive(Debug, Default)]
struct RemoteState {
    session: Option<Identity>,
    profiles: HashMap<UserId, OwnerProfile>,
    products: HashMap<ProductId, ProductSnapshot>,
    cart: Vec<StoredCartItem>,
    comments: Vec<StoredComment>,
    calls: HashMap<Operation, usize>,
    failing: HashSet<Operation>,
    gates: HashMap<Operation, Arc<Gate>>,
    clock_ticks: i64,
}

/// In-memory [`RemoteDataService`].
#[derive(Debug, Default)]
pub struct InMemoryRemote {
    state: Mutex<RemoteState>,
}

impl InMemoryRemote {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RemoteState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn sign_in(&self, identity: Identity) {
        self.lock().session = Some(identity);
    }

    pub fn sign_out(&self) {
        self.lock().session = None;
    }

    /// Register a user profile.
    pub fn add_profile(&self, display_name: &str) -> OwnerProfile {
        let profile = OwnerProfile {
            id: UserId::random(),
            display_name: Some(display_name.to_string()),
            avatar_url: Some(format!("https://cdn.souq.test/avatars/{display_name}.png")),
        };
        self.lock().profiles.insert(profile.id, profile.clone());
        profile
    }

    /// Register a product listed by `owner`.
    pub fn add_product(&self, owner: &OwnerProfile, name: &str, price: i64) -> ProductSnapshot {
        let product = ProductSnapshot {
            id: ProductId::random(),
            name: name.to_string(),
            price: Price::local(Decimal::from(price)),
            image_url: Some(format!("https://cdn.souq.test/products/{name}.jpg")),
            description: None,
            owner_id: owner.id,
            owner: owner.clone(),
        };
        self.lock().products.insert(product.id, product.clone());
        product
    }

    /// Put `product` in `user_id`'s cart.
    pub fn add_to_cart(
        &self,
        user_id: UserId,
        product: &ProductSnapshot,
        added_at: DateTime<Utc>,
    ) -> CartItemId {
        let id = CartItemId::random();
        self.lock().cart.push(StoredCartItem {
            id,
            user_id,
            product_id: product.id,
            added_at,
        });
        id
    }

    /// Delete a cart entry directly, as another client would.
    pub fn drop_cart_item(&self, item_id: CartItemId) {
        self.lock().cart.retain(|i| i.id != item_id);
    }

    /// Store a comment directly, as another client would.
    pub fn seed_comment(
        &self,
        product_id: ProductId,
        author_id: UserId,
        content: &str,
        created_at: DateTime<Utc>,
    ) -> CommentId {
        let id = CommentId::random();
        self.lock().comments.push(StoredComment {
            id,
            product_id,
            content: content.to_string(),
            created_at,
            author_id,
        });
        id
    }

    /// Make every later call of `op` fail.
    pub fn fail(&self, op: Operation) {
        self.lock().failing.insert(op);
    }

    pub fn recover(&self, op: Operation) {
        self.lock().failing.remove(&op);
    }

    /// Hold every later call of `op` at a gate until released.
    pub fn hold(&self, op: Operation) -> Arc<Gate> {
        Arc::clone(self.lock().gates.entry(op).or_default())
    }

    /// Number of calls of `op` so far.
    pub fn calls(&self, op: Operation) -> usize {
        self.lock().calls.get(&op).copied().unwrap_or(0)
    }

    /// Number of comments stored for `product_id`.
    pub fn comment_count(&self, product_id: ProductId) -> usize {
        self.lock()
            .comments
            .iter()
            .filter(|c| c.product_id == product_id)
            .count()
    }

    pub fn cart_contains(&self, item_id: CartItemId) -> bool {
        self.lock().cart.iter().any(|i| i.id == item_id)
    }

    /// Count the call, run `effect` unless a failure is injected, then wait
    /// at the gate if `op` is held. A held call has already taken effect; only
    /// its response is delayed.
    async fn call<T>(
        &self,
        op: Operation,
        effect: impl FnOnce(&mut RemoteState) -> Result<T, RemoteError>,
    ) -> Result<T, RemoteError> {
        let (result, gate) = {
            let mut state = self.lock();
            *state.calls.entry(op).or_insert(0) += 1;
            let result = if state.failing.contains(&op) {
                Err(RemoteError::Status {
                    status: 503,
                    body: format!("injected failure for {op:?}"),
                })
            } else {
                effect(&mut state)
            };
            (result, state.gates.get(&op).cloned())
        };
        if let Some(gate) = gate {
            gate.pass().await;
        }
        result
    }
}

impl RemoteState {
    fn profile(&self, id: UserId) -> OwnerProfile {
        self.profiles
            .get(&id)
            .cloned()
            .unwrap_or_else(|| OwnerProfile::unresolved(id))
    }

    /// Server-assigned timestamps, later than any seeded fixture.
    fn now(&mut self) -> DateTime<Utc> {
        self.clock_ticks += 1;
        Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).single().unwrap_or_default()
            + Duration::seconds(self.clock_ticks)
    }
}

#[async_trait]
impl RemoteDataService for InMemoryRemote {
    async fn list_cart_items(&self, user_id: UserId) -> Result<Vec<CartItem>, RemoteError> {
        self.call(Operation::ListCartItems, |state| {
            // Insertion order; callers are responsible for sorting.
            Ok(state
                .cart
                .iter()
                .filter(|i| i.user_id == user_id)
                .filter_map(|i| {
                    state.products.get(&i.product_id).map(|product| CartItem {
                        id: i.id,
                        product_id: i.product_id,
                        added_at: i.added_at,
                        product: product.clone(),
                    })
                })
                .collect())
        })
        .await
    }

    async fn delete_cart_item(&self, item_id: CartItemId) -> Result<(), RemoteError> {
        self.call(Operation::DeleteCartItem, |state| {
            let before = state.cart.len();
            state.cart.retain(|i| i.id != item_id);
            if state.cart.len() == before {
                return Err(RemoteError::NotFound(format!("cart_items {item_id}")));
            }
            Ok(())
        })
        .await
    }

    async fn list_comments(&self, product_id: ProductId) -> Result<Vec<Comment>, RemoteError> {
        self.call(Operation::ListComments, |state| {
            let mut comments: Vec<Comment> = state
                .comments
                .iter()
                .filter(|c| c.product_id == product_id)
                .map(|c| Comment {
                    id: c.id,
                    content: c.content.clone(),
                    created_at: c.created_at,
                    author_id: c.author_id,
                    author: state.profile(c.author_id),
                })
                .collect();
            comments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(comments)
        })
        .await
    }

    async fn insert_comment(
        &self,
        product_id: ProductId,
        user_id: UserId,
        text: &str,
    ) -> Result<(), RemoteError> {
        let content = text.to_string();
        self.call(Operation::InsertComment, move |state| {
            let created_at = state.now();
            state.comments.push(StoredComment {
                id: CommentId::random(),
                product_id,
                content,
                created_at,
                author_id: user_id,
            });
            Ok(())
        })
        .await
    }

    async fn delete_comment(&self, comment_id: CommentId) -> Result<(), RemoteError> {
        self.call(Operation::DeleteComment, |state| {
            let before = state.comments.len();
            state.comments.retain(|c| c.id != comment_id);
            if state.comments.len() == before {
                return Err(RemoteError::NotFound(format!("comments {comment_id}")));
            }
            Ok(())
        })
        .await
    }

    async fn current_session(&self) -> Result<Option<Identity>, RemoteError> {
        self.call(Operation::CurrentSession, |state| Ok(state.session))
            .await
    }
}
