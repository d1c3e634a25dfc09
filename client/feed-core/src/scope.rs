//! View lifecycle token
//!
//! Completions that resolve after their view was torn down must not touch
//! the cache. Every async path checks its [`ViewScope`] after the await.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct ViewScope {
    closed: Arc<AtomicBool>,
}

impl ViewScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
