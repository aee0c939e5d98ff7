use std::time::Duration;

use thiserror::Error;

pub mod key;
pub mod pokeapi;
pub mod raw;

pub use key::{CanonicalKey, EntityKind};
pub use raw::{RawAttributes, RawRecord, RawRelation};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid key format: {0}")]
    InvalidKey(String),

    #[error("Unknown entity kind: {0}")]
    UnknownKind(String),

    #[error("Empty key")]
    EmptyKey,
}

/// Failure reported by the upstream data service for a single record request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UpstreamError {
    #[error("Record not found upstream")]
    NotFound,

    #[error("Rate limited by upstream")]
    RateLimited {
        /// Server-provided hint for when to try again
        retry_after: Option<Duration>,
    },

    #[error("Upstream unavailable: {0}")]
    Unavailable(String),

    #[error("Malformed upstream response: {0}")]
    Malformed(String),
}

impl UpstreamError {
    /// Whether retrying the same request later may succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            UpstreamError::RateLimited { .. } | UpstreamError::Unavailable(_)
        )
    }
}
