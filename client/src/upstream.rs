use async_trait::async_trait;
use celebi_protocol::{CanonicalKey, RawRecord, UpstreamError};

/// The remote data source, one logical call per key.
///
/// Implement this trait to plug a transport into [`ResilientClient`](crate::ResilientClient).
/// The PokeAPI implementation is [`PokeApiClient`](crate::PokeApiClient).
///
/// # Example
///
/// ```ignore
/// struct Fixtures(HashMap<CanonicalKey, RawRecord>);
///
/// #[async_trait]
/// impl Upstream for Fixtures {
///     async fn fetch_record(&self, key: &CanonicalKey) -> Result<RawRecord, UpstreamError> {
///         self.0.get(key).cloned().ok_or(UpstreamError::NotFound)
///     }
/// }
/// ```
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Fetch the raw record for `key`.
    async fn fetch_record(&self, key: &CanonicalKey) -> Result<RawRecord, UpstreamError>;
}
