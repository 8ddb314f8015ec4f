//! Transient success/error messages for the presentation layer.
//!
//! Only the most recent message is kept. It stays visible until its kind's
//! dismiss interval elapses or a newer message replaces it. Messages are
//! translation keys; rendering and localisation belong to the presentation
//! layer.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::config::NotificationConfig;

/// Translation keys for the messages this crate raises.
pub mod messages {
    pub const CART_ITEM_REMOVED: &str = "Theproducthasbeenremovedfromthecart";
    pub const CART_ITEM_REMOVE_FAILED: &str = "Couldnotremovetheproduct";
    pub const COMMENT_ADDED: &str = "Yourcommenthasbeenadded";
    pub const COMMENT_ADD_FAILED: &str = "Couldnotaddthecomment";
    pub const COMMENT_DELETED: &str = "Thecommenthasbeendeleted";
    pub const COMMENT_DELETE_FAILED: &str = "Couldnotdeletethecomment";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    Success,
    Error,
}

/// A message raised by a mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
    pub expires_at: Instant,
}

impl Notification {
    #[must_use]
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Publishes notifications to the presentation layer.
///
/// Clones share the same current message.
#[derive(Clone)]
pub struct NotificationSink {
    inner: Arc<NotificationSinkInner>,
}

struct NotificationSinkInner {
    config: NotificationConfig,
    sender: watch::Sender<Option<Notification>>,
}

impl NotificationSink {
    #[must_use]
    pub fn new(config: NotificationConfig) -> Self {
        let (sender, _) = watch::channel(None);
        Self {
            inner: Arc::new(NotificationSinkInner { config, sender }),
        }
    }

    /// How long a message of `kind` stays visible.
    #[must_use]
    pub fn dismiss_after(&self, kind: NotificationKind) -> Duration {
        match kind {
            NotificationKind::Success => self.inner.config.success_ttl,
            NotificationKind::Error => self.inner.config.error_ttl,
        }
    }

    /// Replace the current message.
    pub fn notify(&self, kind: NotificationKind, message: impl Into<String>) {
        let message = message.into();
        match kind {
            NotificationKind::Success => info!(message = %message, "Notify success"),
            NotificationKind::Error => warn!(message = %message, "Notify error"),
        }
        let notification = Notification {
            kind,
            message,
            expires_at: Instant::now() + self.dismiss_after(kind),
        };
        self.inner.sender.send_replace(Some(notification));
    }

    pub fn success(&self, message: impl Into<String>) {
        self.notify(NotificationKind::Success, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.notify(NotificationKind::Error, message);
    }

    /// The visible message, if one is raised and not yet dismissed.
    #[must_use]
    pub fn current(&self) -> Option<Notification> {
        let now = Instant::now();
        self.inner
            .sender
            .borrow()
            .as_ref()
            .filter(|n| !n.is_expired(now))
            .cloned()
    }

    /// Hide the current message early.
    pub fn dismiss(&self) {
        self.inner.sender.send_replace(None);
    }

    /// Receiver that wakes on every new message.
    ///
    /// Expiry is not pushed; check [`Notification::expires_at`].
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<Notification>> {
        self.inner.sender.subscribe()
    }
}

impl Default for NotificationSink {
    fn default() -> Self {
        Self::new(NotificationConfig::default())
    }
}
