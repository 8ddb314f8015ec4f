//! Product and owner snapshots.
//!
//! Both are denormalized, point-in-time copies taken when the cart or a
//! comment thread is fetched. They are never live-updated.

use serde::{Deserialize, Serialize};

use super::{Price, ProductId, UserId};

/// Public profile of a user, embedded on products and comments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerProfile {
    pub id: UserId,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

impl OwnerProfile {
    /// A profile known only by id, used when the joined profile row is missing.
    #[must_use]
    pub const fn unresolved(id: UserId) -> Self {
        Self {
            id,
            display_name: None,
            avatar_url: None,
        }
    }

    /// Whether the profile row was present when the snapshot was taken.
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        self.display_name.is_some() || self.avatar_url.is_some()
    }
}

/// A product listing as of fetch time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    pub image_url: Option<String>,
    pub description: Option<String>,
    pub owner_id: UserId,
    pub owner: OwnerProfile,
}

impl ProductSnapshot {
    /// The first `max_words` words of the name, with `...` appended when cut.
    ///
    /// Listing cards show the first four words of a product name.
    #[must_use]
    pub fn short_name(&self, max_words: usize) -> String {
        let words: Vec<&str> = self.name.split_whitespace().collect();
        if words.len() <= max_words {
            return words.join(" ");
        }
        let mut short = words
            .iter()
            .take(max_words)
            .copied()
            .collect::<Vec<_>>()
            .join(" ");
        short.push_str("...");
        short
    }
}
