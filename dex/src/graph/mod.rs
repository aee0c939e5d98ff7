//! Relationship graph built from fetched records
//!
//! Nodes live in an arena indexed by [`CanonicalKey`]; edges refer to nodes
//! by index, so cyclic data (A evolves into B evolves into A) needs no
//! special ownership. The graph only reflects what has been fetched so far.
//!
//! Writers take a write lock and copy-on-write the arena; every traversal
//! clones the current `Arc` and walks that snapshot without holding a lock.

mod traversal;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use celebi_protocol::CanonicalKey;
use parking_lot::RwLock;
use thiserror::Error;

use crate::types::{Record, RelationKind};

pub use traversal::Traversal;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Unrecognized relation {kind:?} -> {target:?} on {record}")]
    UnrecognizedRelation {
        record: CanonicalKey,
        kind: String,
        target: String,
    },
}

/// Which edges to follow during traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// From source to target
    Outgoing,
    /// From target back to source
    Incoming,
}

pub(crate) type NodeId = usize;

#[derive(Debug, Clone, Default)]
pub(crate) struct Arena {
    nodes: Vec<CanonicalKey>,
    ids: HashMap<CanonicalKey, NodeId>,
    outgoing: Vec<Vec<(RelationKind, NodeId)>>,
    incoming: Vec<Vec<(RelationKind, NodeId)>>,
    edges: HashSet<(NodeId, RelationKind, NodeId)>,
}

impl Arena {
    fn node(&mut self, key: &CanonicalKey) -> NodeId {
        if let Some(&id) = self.ids.get(key) {
            return id;
        }
        let id = self.nodes.len();
        self.nodes.push(key.clone());
        self.ids.insert(key.clone(), id);
        self.outgoing.push(Vec::new());
        self.incoming.push(Vec::new());
        id
    }

    fn add_edge(&mut self, from: NodeId, kind: RelationKind, to: NodeId) -> bool {
        if !self.edges.insert((from, kind, to)) {
            return false;
        }
        self.outgoing[from].push((kind, to));
        self.incoming[to].push((kind, from));
        true
    }

    pub(crate) fn id(&self, key: &CanonicalKey) -> Option<NodeId> {
        self.ids.get(key).copied()
    }

    pub(crate) fn key(&self, id: NodeId) -> &CanonicalKey {
        &self.nodes[id]
    }

    pub(crate) fn neighbors(
        &self,
        id: NodeId,
        direction: Direction,
    ) -> &[(RelationKind, NodeId)] {
        match direction {
            Direction::Outgoing => &self.outgoing[id],
            Direction::Incoming => &self.incoming[id],
        }
    }
}

#[derive(Debug, Default)]
pub struct RelationshipGraph {
    arena: RwLock<Arc<Arena>>,
}

impl RelationshipGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `(kind, target)` edges leaving `source`
    ///
    /// Re-adding an existing edge is a no-op. The source becomes a node even
    /// when it has no edges. Returns the number of new edges.
    pub fn add_edges<I>(&self, source: &CanonicalKey, edges: I) -> usize
    where
        I: IntoIterator<Item = (RelationKind, CanonicalKey)>,
    {
        let mut guard = self.arena.write();
        let arena = Arc::make_mut(&mut guard);

        let from = arena.node(source);
        let mut added = 0;
        for (kind, target) in edges {
            let to = arena.node(&target);
            if arena.add_edge(from, kind, to) {
                added += 1;
            }
        }
        added
    }

    /// Register a record's recognized edges
    ///
    /// Quarantined relations are skipped and reported back to the caller.
    pub fn add_record(&self, record: &Record) -> Vec<GraphError> {
        self.add_edges(
            &record.key,
            record.edges().map(|(kind, target)| (kind, target.clone())),
        );

        record
            .unrecognized()
            .map(|(kind, target)| GraphError::UnrecognizedRelation {
                record: record.key.clone(),
                kind: kind.to_string(),
                target: target.to_string(),
            })
            .collect()
    }

    /// Breadth-first walk from `start` over edges of one kind
    ///
    /// Yields `start` first (if it is known), then every reachable node once
    /// in discovery order. Unknown keys yield nothing.
    pub fn traverse(
        &self,
        start: &CanonicalKey,
        kind: RelationKind,
        direction: Direction,
    ) -> Traversal {
        let snapshot = Arc::clone(&self.arena.read());
        Traversal::new(snapshot, start, kind, direction)
    }

    pub fn contains(&self, key: &CanonicalKey) -> bool {
        self.arena.read().ids.contains_key(key)
    }

    pub fn node_count(&self) -> usize {
        self.arena.read().nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.arena.read().edges.len()
    }
}
