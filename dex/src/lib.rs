//! Name resolution, typed records and the relationship graph for Pokemon data.
//!
//! Everything in this crate is synchronous and free of I/O; the network and
//! caching layers live in `celebi-client` and `celebi-service`.
//!
//! # Overview
//!
//! ```text
//! celebi-protocol (keys + wire payloads)
//!        │
//!        ▼
//! celebi-dex (index, resolver, records, graph) ← THIS CRATE
//!        │
//!        ├─> celebi-client (resilient upstream fetches)
//!        └─> celebi-service (cache + query orchestration)
//! ```
//!
//! # Main Types
//!
//! - [`NameIndex`] - immutable dictionary of canonical names and aliases
//! - [`FuzzyResolver`] - free text to [`CanonicalKey`], or a ranked ambiguity
//! - [`Record`] - validated record with typed attributes and relations
//! - [`RelationshipGraph`] - append-only graph of observed relations
//! - [`Type`] - Pokemon types with effectiveness chart
//!
//! # Example Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use celebi_dex::{FuzzyResolver, NameIndex, ResolverConfig};
//!
//! let index = Arc::new(NameIndex::from_json(&std::fs::read_to_string("names.json")?)?);
//! let resolver = FuzzyResolver::new(index, ResolverConfig::default());
//!
//! match resolver.resolve("pikchu") {
//!     Ok(hit) => println!("{} ({:.0})", hit.key, hit.score),
//!     Err(e) => println!("{e}"),
//! }
//! ```

pub mod format;
pub mod graph;
pub mod index;
pub mod query;
pub mod resolve;
pub mod types;

pub use graph::{Direction, GraphError, RelationshipGraph, Traversal};
pub use index::{IndexError, NameEntry, NameIndex, normalize};
pub use resolve::{
    Candidate, FuzzyResolver, Resolution, ResolutionError, ResolutionResult, ResolverConfig,
};
pub use types::{
    AbilityInfo, Attributes, DamageClass, MoveInfo, Record, RecordError, Relation, RelationKind,
    SpeciesInfo, TYPE_CHART, Type,
};

pub use celebi_protocol::{CanonicalKey, EntityKind};
