/// Failure classification for collaborator calls
///
/// Collaborators report what they saw on the wire (`TransportError`). The
/// guarded call adds the timeout outcome and produces a `RequestError`, which
/// is always exactly one of three classes: the deadline passed, the server was
/// never reached, or the server answered with a non-2xx status.
use crate::metrics::RequestMetrics;
use crate::presets::ServiceConfig;
use crate::timeout::{with_timeout, TimeoutError};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// What a collaborator observed while performing a request
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Connection never established (DNS, refused, offline)
    #[error("Network error: {0}")]
    Network(String),
    /// Server responded with a non-2xx status
    #[error("HTTP {status}")]
    Http {
        status: u16,
        message: Option<String>,
    },
    /// Server responded 2xx but the body could not be decoded
    #[error("Malformed response: {0}")]
    Malformed(String),
}

/// Classified outcome of a guarded call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
    #[error("Network error: {0}")]
    Network(String),
    #[error("HTTP {status}")]
    Http {
        status: u16,
        message: Option<String>,
    },
    #[error("Malformed response: {0}")]
    Malformed(String),
}

/// Coarse failure class, used for metrics labels and user messaging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    Timeout,
    Network,
    ClientError,
    ServerError,
    Malformed,
}

impl FailureClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureClass::Timeout => "timeout",
            FailureClass::Network => "network",
            FailureClass::ClientError => "client_error",
            FailureClass::ServerError => "server_error",
            FailureClass::Malformed => "malformed",
        }
    }
}

impl RequestError {
    pub fn class(&self) -> FailureClass {
        match self {
            RequestError::Timeout(_) => FailureClass::Timeout,
            RequestError::Network(_) => FailureClass::Network,
            RequestError::Http { status, .. } if *status >= 500 => FailureClass::ServerError,
            RequestError::Http { .. } => FailureClass::ClientError,
            RequestError::Malformed(_) => FailureClass::Malformed,
        }
    }

    /// Status code when the server answered
    pub fn status(&self) -> Option<u16> {
        match self {
            RequestError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<TransportError> for RequestError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Network(msg) => RequestError::Network(msg),
            TransportError::Http { status, message } => RequestError::Http { status, message },
            TransportError::Malformed(msg) => RequestError::Malformed(msg),
        }
    }
}

impl From<TimeoutError> for RequestError {
    fn from(err: TimeoutError) -> Self {
        match err {
            TimeoutError::Elapsed(duration) => RequestError::Timeout(duration),
        }
    }
}

/// Run one collaborator call under the preset's deadline and classify the result.
///
/// The call is attempted exactly once.
pub async fn guarded_call<F, T>(config: &ServiceConfig, future: F) -> Result<T, RequestError>
where
    F: Future<Output = Result<T, TransportError>>,
{
    let outcome = match with_timeout(config.timeout.duration, future).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(transport)) => Err(RequestError::from(transport)),
        Err(elapsed) => Err(RequestError::from(elapsed)),
    };

    match &outcome {
        Ok(_) => {
            debug!(preset = config.name, "Guarded call succeeded");
            RequestMetrics::record_outcome(config.name, "success");
        }
        Err(e) => {
            warn!(preset = config.name, class = e.class().as_str(), error = %e, "Guarded call failed");
            RequestMetrics::record_outcome(config.name, e.class().as_str());
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presets::feed_read_config;

    #[test]
    fn test_http_class_split() {
        let client = RequestError::Http {
            status: 404,
            message: None,
        };
        let server = RequestError::Http {
            status: 503,
            message: None,
        };
        assert_eq!(client.class(), FailureClass::ClientError);
        assert_eq!(server.class(), FailureClass::ServerError);
        assert_eq!(server.status(), Some(503));
    }

    #[test]
    fn test_transport_conversion_keeps_message() {
        let err: RequestError = TransportError::Http {
            status: 403,
            message: Some("Forbidden".to_string()),
        }
        .into();
        assert_eq!(
            err,
            RequestError::Http {
                status: 403,
                message: Some("Forbidden".to_string())
            }
        );
    }

    #[tokio::test]
    async fn test_guarded_call_passes_value_through() {
        let config = feed_read_config();
        let result = guarded_call(&config, async { Ok::<_, TransportError>(7) }).await;
        assert_eq!(result, Ok(7));
    }

    #[tokio::test]
    async fn test_guarded_call_network_failure() {
        let config = feed_read_config();
        let result: Result<(), _> = guarded_call(&config, async {
            Err(TransportError::Network("connection refused".to_string()))
        })
        .await;
        assert_eq!(
            result,
            Err(RequestError::Network("connection refused".to_string()))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_guarded_call_timeout_is_distinct() {
        let config = feed_read_config();
        let result: Result<(), _> = guarded_call(&config, async {
            tokio::time::sleep(config.timeout.duration * 2).await;
            Ok(())
        })
        .await;
        assert_eq!(result, Err(RequestError::Timeout(config.timeout.duration)));
        assert_eq!(result.unwrap_err().class(), FailureClass::Timeout);
    }
}
