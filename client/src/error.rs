use celebi_dex::RecordError;
use celebi_protocol::UpstreamError;
use thiserror::Error;

/// Failure that will not go away by retrying
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PermanentError {
    #[error("Record not found")]
    NotFound,

    #[error("Malformed record: {0}")]
    Malformed(String),
}

/// Outcome of a failed [`ResilientClient::fetch`](crate::ResilientClient::fetch).
///
/// Cloneable so one result can be handed to every coalesced waiter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Upstream kept failing transiently until the attempt ceiling
    #[error("Upstream unavailable after {attempts} attempt(s): {reason}")]
    Transient { attempts: u32, reason: String },

    #[error(transparent)]
    Permanent(#[from] PermanentError),

    /// Calls are short-circuited while upstream is considered unhealthy
    #[error("Upstream circuit is open")]
    CircuitOpen,
}

impl From<RecordError> for PermanentError {
    fn from(err: RecordError) -> Self {
        PermanentError::Malformed(err.to_string())
    }
}

/// Split upstream errors into retryable and final ones
pub(crate) enum Classified {
    Transient(String),
    Permanent(PermanentError),
}

impl From<&UpstreamError> for Classified {
    fn from(err: &UpstreamError) -> Self {
        match err {
            UpstreamError::NotFound => Classified::Permanent(PermanentError::NotFound),
            UpstreamError::Malformed(reason) => {
                Classified::Permanent(PermanentError::Malformed(reason.clone()))
            }
            UpstreamError::RateLimited { .. } | UpstreamError::Unavailable(_) => {
                Classified::Transient(err.to_string())
            }
        }
    }
}
