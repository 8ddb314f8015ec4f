//! Integration tests for Souq.
//!
//! The tests drive [`souq_client::MarketplaceStore`] end to end against the
//! in-memory remote from `souq_client::testing`, so they need no network or
//! Supabase project.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p souq-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart_flow` - Cart loading, ordering and optimistic removal
//! - `comment_threads` - Comment caching, posting and deletion
