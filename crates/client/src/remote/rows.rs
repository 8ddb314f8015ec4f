//! Wire rows returned by the REST API and their conversion to domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use souq_core::{
    CartItem, CartItemId, Comment, CommentId, OwnerProfile, Price, ProductId, ProductSnapshot,
    UserId,
};
use tracing::warn;

/// `cart_items` row with the nested product join.
#[derive(Debug, Clone, Deserialize)]
pub struct CartItemRow {
    pub id: CartItemId,
    pub product_id: ProductId,
    pub added_at: DateTime<Utc>,
    /// Null when the product was deleted after being added.
    pub products: Option<ProductRow>,
}

/// `products` row with the owner profile join.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductRow {
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    pub image_url: Option<String>,
    pub description: Option<String>,
    pub owner_id: UserId,
    pub profiles: Option<ProfileRow>,
}

/// `profiles` row.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileRow {
    pub id: UserId,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
}

/// `comments` row with the author profile join.
#[derive(Debug, Clone, Deserialize)]
pub struct CommentRow {
    pub id: CommentId,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub user_id: UserId,
    pub profiles: Option<ProfileRow>,
}

/// Body of a comment insert.
#[derive(Debug, Clone, Serialize)]
pub struct NewComment<'a> {
    pub content: &'a str,
    pub product_id: ProductId,
    pub user_id: UserId,
}

impl From<ProfileRow> for OwnerProfile {
    fn from(row: ProfileRow) -> Self {
        Self {
            id: row.id,
            display_name: row.full_name,
            avatar_url: row.avatar_url,
        }
    }
}

fn profile_or_unresolved(profile: Option<ProfileRow>, id: UserId) -> OwnerProfile {
    profile.map_or_else(|| OwnerProfile::unresolved(id), OwnerProfile::from)
}

impl From<ProductRow> for ProductSnapshot {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            price: Price::local(row.price),
            image_url: row.image_url,
            description: row.description,
            owner_id: row.owner_id,
            owner: profile_or_unresolved(row.profiles, row.owner_id),
        }
    }
}

impl CartItemRow {
    /// Convert to a cart entry; `None` if the product no longer exists.
    #[must_use]
    pub fn into_cart_item(self) -> Option<CartItem> {
        let Some(product) = self.products else {
            warn!(cart_item_id = %self.id, product_id = %self.product_id, "Cart item without product, skipping");
            return None;
        };
        Some(CartItem {
            id: self.id,
            product_id: self.product_id,
            added_at: self.added_at,
            product: product.into(),
        })
    }
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Self {
            id: row.id,
            content: row.content,
            created_at: row.created_at,
            author_id: row.user_id,
            author: profile_or_unresolved(row.profiles, row.user_id),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const CART_JSON: &str = r#"[
        {
            "id": "11111111-1111-4111-8111-111111111111",
            "product_id": "22222222-2222-4222-8222-222222222222",
            "added_at": "2025-04-02T10:15:30.123456+00:00",
            "products": {
                "id": "22222222-2222-4222-8222-222222222222",
                "name": "Olive wood bowl",
                "price": 240.5,
                "image_url": "https://cdn.example.com/bowl.jpg",
                "description": null,
                "owner_id": "33333333-3333-4333-8333-333333333333",
                "profiles": {
                    "id": "33333333-3333-4333-8333-333333333333",
                    "full_name": "Mona",
                    "avatar_url": null
                }
            }
        },
        {
            "id": "44444444-4444-4444-8444-444444444444",
            "product_id": "55555555-5555-4555-8555-555555555555",
            "added_at": "2025-04-01T09:00:00+00:00",
            "products": null
        }
    ]"#;

    #[test]
    fn test_cart_rows_convert_and_skip_missing_products() {
        let rows: Vec<CartItemRow> = serde_json::from_str(CART_JSON).unwrap();
        let items: Vec<CartItem> = rows
            .into_iter()
            .filter_map(CartItemRow::into_cart_item)
            .collect();

        assert_eq!(items.len(), 1);
        let item = &items[0];
        assert_eq!(item.product.name, "Olive wood bowl");
        assert_eq!(item.product.price.to_string(), "240.5 EGP");
        assert_eq!(item.product.owner.display_name.as_deref(), Some("Mona"));
        assert_eq!(item.product.owner.id, item.product.owner_id);
    }

    #[test]
    fn test_comment_row_without_profile_keeps_author_id() {
        let json = r#"{
            "id": "66666666-6666-4666-8666-666666666666",
            "content": "Still available?",
            "created_at": "2025-04-03T08:00:00Z",
            "user_id": "77777777-7777-4777-8777-777777777777",
            "profiles": null
        }"#;
        let comment: Comment = serde_json::from_str::<CommentRow>(json).unwrap().into();
        assert_eq!(comment.author.id, comment.author_id);
        assert!(!comment.author.is_resolved());
    }

    #[test]
    fn test_new_comment_body() {
        let product_id = ProductId::random();
        let user_id = UserId::random();
        let body = serde_json::to_value(NewComment {
            content: "nice",
            product_id,
            user_id,
        })
        .unwrap();
        assert_eq!(body["content"], "nice");
        assert_eq!(body["product_id"], product_id.to_string());
        assert_eq!(body["user_id"], user_id.to_string());
    }
}
