//! Souq Core - Shared domain types.
//!
//! This crate provides the types shared by every Souq component:
//! - `client` - Cart and comment-thread orchestration over the remote service
//! - `cli` - Command-line driver for the client
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no caches.
//! Every entity here is a point-in-time snapshot of remote state.
//!
//! # Modules
//!
//! - [`types`] - Type-safe IDs, prices, and the cart/comment snapshots

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
