//! Core types for Souq.
//!
//! This module provides type-safe wrappers and snapshots for the marketplace domain.

pub mod cart;
pub mod comment;
pub mod id;
pub mod identity;
pub mod price;
pub mod product;
pub mod selection;

pub use cart::CartItem;
pub use comment::{Comment, CommentThread};
pub use id::*;
pub use identity::Identity;
pub use price::{CurrencyCode, Price};
pub use product::{OwnerProfile, ProductSnapshot};
pub use selection::Selection;
