//! Comments and per-product comment threads.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CommentId, OwnerProfile, ProductId, UserId};

/// A comment on a product, with its author snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub author_id: UserId,
    pub author: OwnerProfile,
}

/// The comments on one product, newest first by `created_at`.
///
/// Cheap to clone; the comment list is shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentThread {
    product_id: ProductId,
    comments: Arc<[Comment]>,
}

impl CommentThread {
    /// Build a thread, ordering the comments newest first.
    #[must_use]
    pub fn new(product_id: ProductId, mut comments: Vec<Comment>) -> Self {
        comments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Self {
            product_id,
            comments: comments.into(),
        }
    }

    #[must_use]
    pub fn empty(product_id: ProductId) -> Self {
        Self::new(product_id, Vec::new())
    }

    #[must_use]
    pub const fn product_id(&self) -> ProductId {
        self.product_id
    }

    #[must_use]
    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Comment> {
        self.comments.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.comments.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.comments.is_empty()
    }

    /// The newest comment.
    #[must_use]
    pub fn head(&self) -> Option<&Comment> {
        self.comments.first()
    }

    #[must_use]
    pub fn find(&self, comment_id: CommentId) -> Option<&Comment> {
        self.comments.iter().find(|c| c.id == comment_id)
    }

    /// A copy of the thread without `comment_id`, other comments keep their order.
    #[must_use]
    pub fn without(&self, comment_id: CommentId) -> Self {
        Self {
            product_id: self.product_id,
            comments: self
                .comments
                .iter()
                .filter(|c| c.id != comment_id)
                .cloned()
                .collect(),
        }
    }
}

impl<'a> IntoIterator for &'a CommentThread {
    type Item = &'a Comment;
    type IntoIter = std::slice::Iter<'a, Comment>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn comment(content: &str, minute: u32) -> Comment {
        let author_id = UserId::random();
        Comment {
            id: CommentId::random(),
            content: content.to_string(),
            created_at: Utc.with_ymd_and_hms(2025, 3, 1, 12, minute, 0).unwrap(),
            author_id,
            author: OwnerProfile::unresolved(author_id),
        }
    }

    #[test]
    fn test_new_orders_newest_first() {
        let thread = CommentThread::new(
            ProductId::random(),
            vec![comment("first", 1), comment("third", 3), comment("second", 2)],
        );
        let contents: Vec<&str> = thread.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, ["third", "second", "first"]);
        assert_eq!(thread.head().map(|c| c.content.as_str()), Some("third"));
    }

    #[test]
    fn test_without_preserves_order() {
        let middle = comment("b", 2);
        let middle_id = middle.id;
        let thread = CommentThread::new(
            ProductId::random(),
            vec![comment("a", 3), middle, comment("c", 1)],
        );

        let filtered = thread.without(middle_id);
        let contents: Vec<&str> = filtered.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, ["a", "c"]);
        assert!(filtered.find(middle_id).is_none());
        assert_eq!(thread.len(), 3);
    }

    #[test]
    fn test_empty_thread() {
        let thread = CommentThread::empty(ProductId::random());
        assert!(thread.is_empty());
        assert!(thread.head().is_none());
    }
}
