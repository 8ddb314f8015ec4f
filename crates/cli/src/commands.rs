//! Command implementations.

use std::str::FromStr;
use std::sync::Arc;

use souq_client::config::{ClientConfig, ConfigError};
use souq_client::remote::{RemoteError, SupabaseClient};
use souq_client::{ClientError, MarketplaceStore};
use thiserror::Error;

pub mod cart;
pub mod comments;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The remote client could not be built.
    #[error("Could not create remote client: {0}")]
    Remote(#[from] RemoteError),

    /// The operation failed.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// An argument is not a valid ID.
    #[error("Invalid {kind} ID: {value}")]
    InvalidId { kind: &'static str, value: String },
}

/// Build a store from the environment.
pub fn connect() -> Result<MarketplaceStore, CommandError> {
    let config = ClientConfig::from_env()?;
    let remote = SupabaseClient::new(&config.remote)?;
    Ok(MarketplaceStore::new(Arc::new(remote), &config))
}

fn parse_id<T: FromStr>(kind: &'static str, value: &str) -> Result<T, CommandError> {
    value.parse().map_err(|_| CommandError::InvalidId {
        kind,
        value: value.to_owned(),
    })
}
