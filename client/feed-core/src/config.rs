/// Configuration management for the feed client
///
/// Loads configuration from environment variables.
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedConfig {
    /// REST collaborator settings
    pub api: ApiConfig,
    /// Paging settings
    pub paging: PagingConfig,
    /// Touch/keyboard gesture thresholds
    pub gestures: GestureConfig,
    /// Pre-flight content limits
    pub limits: ContentLimits,
    /// Log output settings
    pub logging: LoggingConfig,
}

/// REST collaborator settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL the `/api/*` routes hang off
    pub base_url: String,
    /// Per-request deadline in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

/// Paging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PagingConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

/// Gesture thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GestureConfig {
    /// Two taps closer than this are one double tap
    #[serde(default = "default_double_tap_window_ms")]
    pub double_tap_window_ms: u64,
    /// Minimum travel, in pixels, for a swipe to count
    #[serde(default = "default_swipe_threshold_px")]
    pub swipe_threshold_px: f32,
    /// Vertical travel must exceed horizontal travel times this ratio
    #[serde(default = "default_vertical_swipe_ratio")]
    pub vertical_swipe_ratio: f32,
}

/// Content limits checked before any mutation is attempted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentLimits {
    #[serde(default = "default_caption_max_chars")]
    pub caption_max_chars: usize,
    #[serde(default = "default_comment_max_chars")]
    pub comment_max_chars: usize,
    #[serde(default = "default_max_media_bytes")]
    pub max_media_bytes: usize,
}

/// Log output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Emit JSON lines instead of human-readable text
    pub json: bool,
    /// Filter used when `RUST_LOG` is unset
    pub default_filter: String,
}

// Default values
fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_page_size() -> usize {
    10
}

fn default_double_tap_window_ms() -> u64 {
    300
}

fn default_swipe_threshold_px() -> f32 {
    100.0
}

fn default_vertical_swipe_ratio() -> f32 {
    0.5
}

fn default_caption_max_chars() -> usize {
    2200
}

fn default_comment_max_chars() -> usize {
    2200
}

fn default_max_media_bytes() -> usize {
    5 * 1024 * 1024
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("{} has an invalid value: {:?}", name, raw)),
        Err(_) => Ok(None),
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: "http://localhost:3000".to_string(),
                request_timeout_ms: default_request_timeout_ms(),
            },
            paging: PagingConfig {
                page_size: default_page_size(),
            },
            gestures: GestureConfig {
                double_tap_window_ms: default_double_tap_window_ms(),
                swipe_threshold_px: default_swipe_threshold_px(),
                vertical_swipe_ratio: default_vertical_swipe_ratio(),
            },
            limits: ContentLimits {
                caption_max_chars: default_caption_max_chars(),
                comment_max_chars: default_comment_max_chars(),
                max_media_bytes: default_max_media_bytes(),
            },
            logging: LoggingConfig {
                json: false,
                default_filter: "info".to_string(),
            },
        }
    }
}

impl FeedConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = FeedConfig::default();

        let api = ApiConfig {
            base_url: std::env::var("FEED_API_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.api.base_url),
            request_timeout_ms: parse_var("FEED_REQUEST_TIMEOUT_MS")?
                .unwrap_or_else(default_request_timeout_ms),
        };

        let page_size: usize =
            parse_var("FEED_PAGE_SIZE")?.unwrap_or_else(default_page_size);
        if page_size == 0 {
            anyhow::bail!("FEED_PAGE_SIZE must be greater than zero");
        }
        let paging = PagingConfig { page_size };

        let gestures = GestureConfig {
            double_tap_window_ms: parse_var("FEED_DOUBLE_TAP_WINDOW_MS")?
                .unwrap_or_else(default_double_tap_window_ms),
            swipe_threshold_px: parse_var("FEED_SWIPE_THRESHOLD_PX")?
                .unwrap_or_else(default_swipe_threshold_px),
            vertical_swipe_ratio: parse_var("FEED_VERTICAL_SWIPE_RATIO")?
                .unwrap_or_else(default_vertical_swipe_ratio),
        };

        let limits = ContentLimits {
            caption_max_chars: parse_var("FEED_CAPTION_MAX_CHARS")?
                .unwrap_or_else(default_caption_max_chars),
            comment_max_chars: parse_var("FEED_COMMENT_MAX_CHARS")?
                .unwrap_or_else(default_comment_max_chars),
            max_media_bytes: parse_var("FEED_MAX_MEDIA_BYTES")?
                .unwrap_or_else(default_max_media_bytes),
        };

        let logging = LoggingConfig {
            json: std::env::var("LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
            default_filter: defaults.logging.default_filter,
        };

        Ok(FeedConfig {
            api,
            paging,
            gestures,
            limits,
            logging,
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.api.request_timeout_ms)
    }

    pub fn double_tap_window(&self) -> Duration {
        Duration::from_millis(self.gestures.double_tap_window_ms)
    }
}
