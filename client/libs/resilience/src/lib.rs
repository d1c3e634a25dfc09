/// Resilience patterns for feed collaborator calls
///
/// This library provides the transport-level half of the feed client's
/// network wrapper:
/// - **Timeout**: Every call is bounded; on expiry the in-flight future is dropped
/// - **Classification**: Failures are one of `Timeout`, `Network` or `Http { status }`
/// - **Preset Configurations**: Pre-tuned settings for feed reads, writes and uploads
///
/// Nothing here retries. A failed call is reported once and the caller decides
/// what the user sees.
///
/// # Example: Guarded Write
///
/// ```rust,no_run
/// use resilience::{guarded_call, presets, TransportError};
///
/// #[tokio::main]
/// async fn main() {
///     let config = presets::feed_write_config();
///
///     let result = guarded_call(&config, async {
///         // Your collaborator call here
///         Ok::<_, TransportError>(())
///     })
///     .await;
///
///     if let Err(e) = result {
///         eprintln!("write failed: {}", e);
///     }
/// }
/// ```

pub mod classify;
pub mod metrics;
pub mod presets;
pub mod timeout;

// Re-export main types for convenience
pub use classify::{guarded_call, FailureClass, RequestError, TransportError};
pub use presets::{feed_read_config, feed_write_config, media_upload_config, ServiceConfig};
pub use timeout::{with_timeout, TimeoutConfig, TimeoutError};
