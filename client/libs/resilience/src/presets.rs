/// Preset configurations for feed collaborator calls
use crate::timeout::TimeoutConfig;
use std::time::Duration;

/// Configuration bundle for one class of collaborator call
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Label used in logs and metrics
    pub name: &'static str,
    pub timeout: TimeoutConfig,
}

impl ServiceConfig {
    /// Same preset with a caller-supplied deadline
    pub fn with_timeout(mut self, duration: Duration) -> Self {
        self.timeout = TimeoutConfig { duration };
        self
    }
}

/// Page fetches, single-post and profile reads
///
/// - Timeout: 10s
pub fn feed_read_config() -> ServiceConfig {
    ServiceConfig {
        name: "feed_read",
        timeout: TimeoutConfig {
            duration: Duration::from_secs(10),
        },
    }
}

/// Likes, follows, comments and deletes
///
/// - Timeout: 10s
pub fn feed_write_config() -> ServiceConfig {
    ServiceConfig {
        name: "feed_write",
        timeout: TimeoutConfig {
            duration: Duration::from_secs(10),
        },
    }
}

/// Post creation (carries an image body)
///
/// - Timeout: 60s
pub fn media_upload_config() -> ServiceConfig {
    ServiceConfig {
        name: "media_upload",
        timeout: TimeoutConfig {
            duration: Duration::from_secs(60),
        },
    }
}
