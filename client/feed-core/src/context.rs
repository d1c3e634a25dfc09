//! Per-view dependency bundle
//!
//! Built once by [`crate::FeedSession`] and cloned into every component that
//! talks to a collaborator. Nothing here is a process-wide singleton.

use std::sync::Arc;

use crate::cache::EntityCache;
use crate::gateway::{FeedGateway, IdentityProvider};
use crate::network::NetworkClient;
use crate::notify::{Notice, Notifier};
use crate::scope::ViewScope;
use crate::stats::StatsCollector;

#[derive(Clone)]
pub struct FeedContext {
    pub gateway: Arc<dyn FeedGateway>,
    pub identity: Arc<dyn IdentityProvider>,
    pub notifier: Arc<dyn Notifier>,
    pub network: NetworkClient,
    pub cache: EntityCache,
    pub stats: StatsCollector,
    pub scope: ViewScope,
    /// Route the sign-in prompt sends the user back to
    pub return_to: Option<String>,
}

impl FeedContext {
    pub(crate) fn prompt_sign_in(&self) {
        self.notifier.notify(Notice::SignInRequired {
            return_to: self.return_to.clone(),
        });
    }

    pub(crate) fn notify_error(&self, message: String) {
        self.notifier.notify(Notice::Error(message));
    }
}
