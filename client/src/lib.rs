//! Resilient async access to the Pokemon data service.
//!
//! [`ResilientClient`] wraps any [`Upstream`] with retries (exponential
//! backoff with jitter) and a circuit breaker shared across keys.
//! [`PokeApiClient`] is the HTTP transport for the public PokeAPI.
//!
//! ```ignore
//! use std::sync::Arc;
//! use celebi_client::{BreakerConfig, PokeApiClient, ResilientClient, RetryPolicy};
//!
//! let client = ResilientClient::new(
//!     Arc::new(PokeApiClient::new()),
//!     RetryPolicy::default(),
//!     BreakerConfig::default(),
//! );
//! let record = client.fetch(&CanonicalKey::species("pikachu")).await?;
//! ```

mod breaker;
mod error;
pub mod http;
mod resilient;
mod retry;
mod upstream;

pub use breaker::{BreakerConfig, BreakerState, CircuitBreaker, Permit};
pub use error::{FetchError, PermanentError};
pub use http::PokeApiClient;
pub use resilient::ResilientClient;
pub use retry::{Backoff, RetryPolicy};
pub use upstream::Upstream;

pub use async_trait::async_trait;
pub use celebi_protocol::{CanonicalKey, EntityKind, RawRecord, UpstreamError};
