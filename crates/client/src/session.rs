//! Resolves the signed-in user before any cart or comment operation.

use std::sync::Arc;

use souq_core::Identity;
use tokio::sync::OnceCell;
use tracing::{info, instrument, warn};

use crate::error::{ClientError, Result};
use crate::remote::RemoteDataService;

/// Resolves the current identity, failing closed.
///
/// The first successful resolution is kept for the lifetime of the gate.
/// Failures are not cached and are never retried internally; the caller
/// decides when to try again (e.g., after the user signs in).
pub struct SessionGate {
    remote: Arc<dyn RemoteDataService>,
    identity: OnceCell<Identity>,
}

impl SessionGate {
    #[must_use]
    pub fn new(remote: Arc<dyn RemoteDataService>) -> Self {
        Self {
            remote,
            identity: OnceCell::new(),
        }
    }

    /// The resolved identity, if any, without I/O.
    #[must_use]
    pub fn current(&self) -> Option<Identity> {
        self.identity.get().copied()
    }

    /// Resolve the current identity.
    ///
    /// The gate performs no redirect; on `Unauthenticated` the presentation
    /// layer sends the user to sign in.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Unauthenticated` if there is no session or the
    /// identity service cannot be reached.
    #[instrument(skip(self))]
    pub async fn resolve(&self) -> Result<Identity> {
        if let Some(identity) = self.current() {
            return Ok(identity);
        }

        let identity = match self.remote.current_session().await {
            Ok(Some(identity)) => identity,
            Ok(None) => {
                info!("No active session");
                return Err(ClientError::Unauthenticated);
            }
            Err(e) => {
                warn!(error = %e, "Identity service unreachable, treating as signed out");
                return Err(ClientError::Unauthenticated);
            }
        };

        // A concurrent resolve may have won; both read the same session.
        let _ = self.identity.set(identity);
        Ok(self.current().unwrap_or(identity))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use souq_core::UserId;

    use super::*;
    use crate::testing::{InMemoryRemote, Operation};

    #[tokio::test]
    async fn test_resolves_and_memoises_identity() {
        let remote = Arc::new(InMemoryRemote::new());
        let identity = Identity::new(UserId::random());
        remote.sign_in(identity);
        let gate = SessionGate::new(remote.clone());

        assert_eq!(gate.resolve().await.unwrap(), identity);
        assert_eq!(gate.resolve().await.unwrap(), identity);
        assert_eq!(gate.current(), Some(identity));
        assert_eq!(remote.calls(Operation::CurrentSession), 1);
    }

    #[tokio::test]
    async fn test_no_session_is_unauthenticated() {
        let remote = Arc::new(InMemoryRemote::new());
        let gate = SessionGate::new(remote);

        let err = gate.resolve().await.unwrap_err();
        assert!(matches!(err, ClientError::Unauthenticated));
        assert!(gate.current().is_none());
    }

    #[tokio::test]
    async fn test_signed_out_session_is_unauthenticated() {
        let remote = Arc::new(InMemoryRemote::new());
        remote.sign_in(Identity::new(UserId::random()));
        remote.sign_out();
        let gate = SessionGate::new(remote);

        assert!(matches!(
            gate.resolve().await.unwrap_err(),
            ClientError::Unauthenticated
        ));
    }

    #[tokio::test]
    async fn test_unreachable_service_fails_closed_without_retry() {
        let remote = Arc::new(InMemoryRemote::new());
        remote.sign_in(Identity::new(UserId::random()));
        remote.fail(Operation::CurrentSession);
        let gate = SessionGate::new(remote.clone());

        let err = gate.resolve().await.unwrap_err();
        assert!(matches!(err, ClientError::Unauthenticated));
        assert_eq!(remote.calls(Operation::CurrentSession), 1);

        remote.recover(Operation::CurrentSession);
        assert!(gate.resolve().await.is_ok());
    }
}
