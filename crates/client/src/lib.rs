//! Souq client library.
//!
//! Orchestrates the signed-in user's cart and the per-product comment threads
//! on top of a remote data service. The presentation layer drives everything
//! through [`store::MarketplaceStore`] and renders its [`store::StoreView`].
//!
//! # Modules
//!
//! - [`session`] - Resolves the current identity (fail-closed)
//! - [`cart`] - Cart loading and optimistic removal
//! - [`comments`] - Lazily populated, invalidate-on-write comment thread cache
//! - [`modal`] - Which product's comment thread is open
//! - [`notify`] - Transient success/error messages
//! - [`remote`] - The remote data service contract and its HTTP implementation

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod comments;
pub mod config;
pub mod error;
pub mod modal;
pub mod notify;
pub mod remote;
mod sequencer;
pub mod session;
pub mod store;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::{ClientError, ErrorKind, Result};
pub use store::{MarketplaceStore, StoreView};
