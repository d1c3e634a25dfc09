//! Single exit point for every collaborator call
//!
//! Wraps `resilience::guarded_call` with the feed's presets, an online flag
//! and the mapping onto [`FeedError`].

use resilience::{
    feed_read_config, feed_write_config, guarded_call, media_upload_config, ServiceConfig,
    TransportError,
};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{FeedError, FeedResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Read,
    Write,
    Upload,
}

#[derive(Clone)]
pub struct NetworkClient {
    read: ServiceConfig,
    write: ServiceConfig,
    upload: ServiceConfig,
    online: Arc<AtomicBool>,
}

impl NetworkClient {
    /// Reads and writes share the caller's deadline; uploads never get less.
    pub fn new(request_timeout: Duration) -> Self {
        let upload = media_upload_config();
        let upload_timeout = upload.timeout.duration.max(request_timeout);
        Self {
            read: feed_read_config().with_timeout(request_timeout),
            write: feed_write_config().with_timeout(request_timeout),
            upload: upload.with_timeout(upload_timeout),
            online: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Track connectivity reported by the host platform
    pub fn set_online(&self, online: bool) {
        let was = self.online.swap(online, Ordering::SeqCst);
        if was != online {
            info!(online, "Network status changed");
        }
    }

    pub fn timeout(&self, kind: CallKind) -> Duration {
        self.preset(kind).timeout.duration
    }

    fn preset(&self, kind: CallKind) -> &ServiceConfig {
        match kind {
            CallKind::Read => &self.read,
            CallKind::Write => &self.write,
            CallKind::Upload => &self.upload,
        }
    }

    /// Run one collaborator call. `make_call` is not invoked while offline.
    pub async fn call<F, Fut, T>(
        &self,
        kind: CallKind,
        operation: &'static str,
        make_call: F,
    ) -> FeedResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, TransportError>>,
    {
        if !self.is_online() {
            debug!(operation, "Offline; call not dispatched");
            return Err(FeedError::Network("offline".to_string()));
        }

        debug!(operation, kind = ?kind, "Dispatching collaborator call");
        guarded_call(self.preset(kind), make_call())
            .await
            .map_err(FeedError::from)
    }
}
