//! Which product's comment thread is visible.

use serde::{Deserialize, Serialize};

use super::ProductId;

/// The comment view selection. At most one thread is open at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Selection {
    #[default]
    Closed,
    Open(ProductId),
}

impl Selection {
    /// The selected product, if a thread is open.
    #[must_use]
    pub const fn product(&self) -> Option<ProductId> {
        match self {
            Self::Closed => None,
            Self::Open(product_id) => Some(*product_id),
        }
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(self, Self::Open(_))
    }
}
