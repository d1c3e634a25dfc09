//! User-facing notifications
//!
//! The core never surfaces errors to the rendering layer directly; it hands a
//! one-line [`Notice`] to whatever [`Notifier`] the host installed.

use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// One-line failure message
    Error(String),
    /// One-line confirmation
    Success(String),
    /// A write was attempted without an identity; send the user to sign in
    /// and bring them back to `return_to` afterwards
    SignInRequired { return_to: Option<String> },
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Notifier that only logs; the default when the host renders nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: Notice) {
        match notice {
            Notice::Error(message) => warn!(%message, "User notice"),
            Notice::Success(message) => info!(%message, "User notice"),
            Notice::SignInRequired { return_to } => {
                info!(return_to = ?return_to, "Sign-in required")
            }
        }
    }
}
