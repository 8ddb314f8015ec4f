//! Unified error handling for cart and comment operations.
//!
//! Every store operation returns `Result<T, ClientError>`. [`ErrorKind`]
//! groups the variants into the categories the presentation layer reacts to.

use souq_core::{CartItemId, CommentId};
use thiserror::Error;

use crate::remote::RemoteError;

/// Client-level error type.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Input rejected before any remote call (e.g., blank comment text).
    #[error("Validation failed: {0}")]
    Validation(String),

    /// No resolved identity.
    #[error("Not signed in")]
    Unauthenticated,

    /// A remote call failed or timed out.
    #[error("Remote error: {0}")]
    Network(RemoteError),

    /// Target row is absent locally or remotely.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The requester does not own the comment it tried to delete.
    #[error("Comment {0} belongs to another user")]
    NotCommentAuthor(CommentId),
}

/// Error categories surfaced to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Auth,
    Network,
    NotFound,
}

impl ClientError {
    /// The category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Unauthenticated | Self::NotCommentAuthor(_) => ErrorKind::Auth,
            Self::Network(RemoteError::NotFound(_)) | Self::NotFound(_) => ErrorKind::NotFound,
            Self::Network(RemoteError::Unauthorized) => ErrorKind::Auth,
            Self::Network(_) => ErrorKind::Network,
        }
    }

    pub(crate) fn cart_item_missing(item_id: CartItemId) -> Self {
        Self::NotFound(format!("cart item {item_id}"))
    }

    pub(crate) fn comment_missing(comment_id: CommentId) -> Self {
        Self::NotFound(format!("comment {comment_id}"))
    }
}

impl From<RemoteError> for ClientError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::NotFound(what) => Self::NotFound(what),
            RemoteError::Unauthorized => Self::Unauthenticated,
            other => Self::Network(other),
        }
    }
}

/// Result type alias for `ClientError`.
pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_not_found_maps_to_not_found() {
        let err = ClientError::from(RemoteError::NotFound("comment 1".to_string()));
        assert!(matches!(err, ClientError::NotFound(_)));
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_remote_unauthorized_maps_to_auth() {
        let err = ClientError::from(RemoteError::Unauthorized);
        assert_eq!(err.kind(), ErrorKind::Auth);
    }

    #[test]
    fn test_rate_limit_is_network() {
        let err = ClientError::from(RemoteError::RateLimited(3));
        assert_eq!(err.kind(), ErrorKind::Network);
        assert_eq!(
            err.to_string(),
            "Remote error: Rate limited, retry after 3 seconds"
        );
    }

    #[test]
    fn test_validation_display() {
        let err = ClientError::Validation("comment text is empty".to_string());
        assert_eq!(err.to_string(), "Validation failed: comment text is empty");
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
