//! Text query orchestration: resolve, fetch, traverse

use std::sync::Arc;

use celebi_client::{FetchError, PermanentError};
use celebi_dex::{
    Candidate, CanonicalKey, Direction, EntityKind, FuzzyResolver, Record, RelationKind,
    RelationshipGraph, ResolutionError,
};
use serde::Serialize;

use crate::cache::CacheLayer;

/// A relation to follow from the resolved record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RelationQuery {
    pub kind: RelationKind,
    pub direction: Direction,
}

impl RelationQuery {
    pub fn new(kind: RelationKind, direction: Direction) -> Self {
        Self { kind, direction }
    }
}

impl From<RelationKind> for RelationQuery {
    fn from(kind: RelationKind) -> Self {
        Self::new(kind, Direction::Outgoing)
    }
}

/// Why an otherwise valid query could not be answered right now
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "cause", rename_all = "snake_case")]
pub enum UnavailableReason {
    /// Upstream kept failing until retries ran out
    Upstream { attempts: u32, detail: String },
    /// Upstream is being given a rest
    CircuitOpen,
    /// Upstream answered with something unusable
    BadRecord { detail: String },
}

/// Final answer to a text query
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum QueryResult {
    Resolved {
        record: Arc<Record>,
        /// Present when a relation was requested; the record itself is not listed
        #[serde(skip_serializing_if = "Option::is_none")]
        relations: Option<Vec<CanonicalKey>>,
    },
    AmbiguousInput {
        candidates: Vec<Candidate>,
    },
    NotFound,
    Unavailable {
        reason: UnavailableReason,
    },
}

/// A resolved entry that upstream does not have is `NotFound`; every other
/// fetch failure leaves the query unanswerable for now
impl From<FetchError> for QueryResult {
    fn from(err: FetchError) -> Self {
        let reason = match err {
            FetchError::Permanent(PermanentError::NotFound) => return QueryResult::NotFound,
            FetchError::Permanent(PermanentError::Malformed(detail)) => {
                UnavailableReason::BadRecord { detail }
            }
            FetchError::Transient { attempts, reason } => UnavailableReason::Upstream {
                attempts,
                detail: reason,
            },
            FetchError::CircuitOpen => UnavailableReason::CircuitOpen,
        };
        QueryResult::Unavailable { reason }
    }
}

/// Answers free-text queries from the resolver, the cache and the graph
pub struct QueryService {
    resolver: Arc<FuzzyResolver>,
    cache: CacheLayer,
    graph: Arc<RelationshipGraph>,
    relation_limit: usize,
}

impl QueryService {
    pub fn new(
        resolver: Arc<FuzzyResolver>,
        cache: CacheLayer,
        graph: Arc<RelationshipGraph>,
        relation_limit: usize,
    ) -> Self {
        Self {
            resolver,
            cache,
            graph,
            relation_limit,
        }
    }

    pub fn resolver(&self) -> &FuzzyResolver {
        &self.resolver
    }

    pub fn cache(&self) -> &CacheLayer {
        &self.cache
    }

    /// Answer `text` against every entity kind
    pub async fn answer(&self, text: &str, relation: Option<RelationQuery>) -> QueryResult {
        self.answer_with(text, None, relation).await
    }

    /// Answer `text`, only considering entities of `kind`
    pub async fn answer_kind(
        &self,
        kind: EntityKind,
        text: &str,
        relation: Option<RelationQuery>,
    ) -> QueryResult {
        self.answer_with(text, Some(kind), relation).await
    }

    /// Ranked completions for a partial query
    pub fn suggest(&self, text: &str, kind: Option<EntityKind>) -> Vec<Candidate> {
        self.resolver
            .suggest(text, kind, self.resolver.config().suggestion_limit)
    }

    async fn answer_with(
        &self,
        text: &str,
        kind: Option<EntityKind>,
        relation: Option<RelationQuery>,
    ) -> QueryResult {
        let resolved = match kind {
            Some(kind) => self.resolver.resolve_kind(text, kind),
            None => self.resolver.resolve(text),
        };

        let hit = match resolved {
            Ok(hit) => hit,
            Err(ResolutionError::NotFound) => {
                tracing::debug!(query = %text, "No match");
                return QueryResult::NotFound;
            }
            Err(ResolutionError::Ambiguous(candidates)) => {
                tracing::debug!(query = %text, candidates = candidates.len(), "Ambiguous query");
                return QueryResult::AmbiguousInput { candidates };
            }
        };

        tracing::debug!(query = %text, key = %hit.key, score = hit.score, "Resolved query");

        let record = match self.cache.get_or_fetch(&hit.key).await {
            Ok(record) => record,
            Err(e) => {
                tracing::debug!(key = %hit.key, error = %e, "Record not answered");
                return e.into();
            }
        };

        let relations = relation.map(|q| {
            self.graph
                .traverse(&record.key, q.kind, q.direction)
                .skip(1)
                .take(self.relation_limit)
                .collect()
        });

        QueryResult::Resolved { record, relations }
    }
}
