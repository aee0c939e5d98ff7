//! Query service for Pokemon data: fuzzy name resolution in front of a
//! coalescing cache and a resilient upstream client.
//!
//! ```text
//! text ──> FuzzyResolver ──> CacheLayer ──> ResilientClient ──> Upstream
//!                                │
//!                                └──> RelationshipGraph (edges of fetched records)
//! ```
//!
//! # Example Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use celebi_client::PokeApiClient;
//! use celebi_service::{Config, QueryResult};
//!
//! let upstream = PokeApiClient::new();
//! let index = upstream.name_index(&EntityKind::ALL).await?;
//! let service = celebi_service::build(&Config::default(), index, Arc::new(upstream))?;
//!
//! if let QueryResult::Resolved { record, .. } = service.answer("pikchu", None).await {
//!     println!("{}", record.name);
//! }
//! ```

use std::sync::Arc;

use celebi_client::{ResilientClient, Upstream};
use celebi_dex::{FuzzyResolver, NameIndex, RelationshipGraph};

pub mod cache;
pub mod config;
pub mod query;

pub use cache::{CacheConfig, CacheLayer, CacheStats};
pub use config::{Config, ConfigError};
pub use query::{QueryResult, QueryService, RelationQuery, UnavailableReason};

/// Wire a [`QueryService`] from configuration, a name index and an upstream
///
/// The cache sweeper is not started; call
/// [`CacheLayer::spawn_sweeper`] on `service.cache()` if wanted.
pub fn build(
    config: &Config,
    index: NameIndex,
    upstream: Arc<dyn Upstream>,
) -> Result<QueryService, ConfigError> {
    config.validate()?;

    let resolver = Arc::new(FuzzyResolver::new(Arc::new(index), config.resolver_config()));
    let client = Arc::new(ResilientClient::new(
        upstream,
        config.retry_policy(),
        config.breaker_config(),
    ));
    let graph = Arc::new(RelationshipGraph::new());
    let cache = CacheLayer::new(config.cache_config(), client, Arc::clone(&graph));

    Ok(QueryService::new(resolver, cache, graph, config.relation_limit))
}
