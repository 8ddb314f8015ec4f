//! The resolved authenticated user.

use serde::{Deserialize, Serialize};

use super::UserId;

/// Resolved user reference scoping every cart and comment operation.
///
/// Resolved once per session and never changed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: UserId,
}

impl Identity {
    #[must_use]
    pub const fn new(user_id: UserId) -> Self {
        Self { user_id }
    }
}
