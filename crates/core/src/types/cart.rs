//! Cart entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CartItemId, ProductId, ProductSnapshot};

/// One entry of a user's cart, enriched with the product it points at.
///
/// Unique per (user, product) by convention of the remote store; this is not
/// enforced locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub product_id: ProductId,
    pub added_at: DateTime<Utc>,
    pub product: ProductSnapshot,
}

/// Sort cart entries newest first by `added_at`.
///
/// The sort is stable, so entries added at the same instant keep the order
/// the remote returned them in.
pub fn sort_newest_first(items: &mut [CartItem]) {
    items.sort_by(|a, b| b.added_at.cmp(&a.added_at));
}
