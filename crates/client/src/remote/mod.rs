//! Remote data service contract.
//!
//! # Architecture
//!
//! - The remote service is the source of truth for carts, products,
//!   profiles and comments; the client only keeps a transient reflection
//! - [`RemoteDataService`] is the seam the stores are written against
//! - [`SupabaseClient`] implements it over the hosted REST and auth APIs
//!
//! # Example
//!
//! ```rust,ignore
//! use souq_client::remote::{RemoteDataService, SupabaseClient};
//!
//! let remote = SupabaseClient::new(&config.remote)?;
//! let identity = remote.current_session().await?;
//! ```

mod rows;
mod supabase;

pub use rows::{CartItemRow, CommentRow, NewComment, ProductRow, ProfileRow};
pub use supabase::SupabaseClient;

use async_trait::async_trait;
use souq_core::{CartItem, CartItemId, Comment, CommentId, Identity, ProductId, UserId};
use thiserror::Error;

/// Errors that can occur when talking to the remote service.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// HTTP request failed or timed out.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// An endpoint URL could not be built.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The targeted row does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The session is missing, expired, or not allowed to do this.
    #[error("Unauthorized")]
    Unauthorized,

    /// Rate limited by the service.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),
}

/// Operations the orchestration layer needs from the remote service.
#[async_trait]
pub trait RemoteDataService: Send + Sync {
    /// Cart entries of `user_id`, each with its product and owner snapshot.
    ///
    /// Implementations should return them newest first; callers sort anyway.
    async fn list_cart_items(&self, user_id: UserId) -> Result<Vec<CartItem>, RemoteError>;

    async fn delete_cart_item(&self, item_id: CartItemId) -> Result<(), RemoteError>;

    /// Comments on `product_id`, newest first, with author snapshots.
    async fn list_comments(&self, product_id: ProductId) -> Result<Vec<Comment>, RemoteError>;

    async fn insert_comment(
        &self,
        product_id: ProductId,
        user_id: UserId,
        text: &str,
    ) -> Result<(), RemoteError>;

    async fn delete_comment(&self, comment_id: CommentId) -> Result<(), RemoteError>;

    /// The identity behind the current session, if any.
    async fn current_session(&self) -> Result<Option<Identity>, RemoteError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_error_display() {
        let err = RemoteError::NotFound("comment 42".to_string());
        assert_eq!(err.to_string(), "Not found: comment 42");

        let err = RemoteError::Status {
            status: 500,
            body: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 500: boom");
    }
}
