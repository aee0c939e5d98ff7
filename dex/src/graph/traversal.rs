//! Lazy breadth-first traversal over a graph snapshot

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use celebi_protocol::CanonicalKey;

use super::{Arena, Direction, NodeId};
use crate::types::RelationKind;

/// Breadth-first walk produced by
/// [`RelationshipGraph::traverse`](super::RelationshipGraph::traverse)
///
/// Finite and single use: once exhausted, call `traverse` again to re-run it.
#[derive(Debug)]
pub struct Traversal {
    arena: Arc<Arena>,
    kind: RelationKind,
    direction: Direction,
    queue: VecDeque<(NodeId, usize)>,
    visited: HashSet<NodeId>,
}

impl Traversal {
    pub(super) fn new(
        arena: Arc<Arena>,
        start: &CanonicalKey,
        kind: RelationKind,
        direction: Direction,
    ) -> Self {
        let mut queue = VecDeque::new();
        let mut visited = HashSet::new();
        if let Some(id) = arena.id(start) {
            queue.push_back((id, 0));
            visited.insert(id);
        }

        Self {
            arena,
            kind,
            direction,
            queue,
            visited,
        }
    }

    /// Next node together with its hop distance from the start
    pub fn next_with_depth(&mut self) -> Option<(CanonicalKey, usize)> {
        let (id, depth) = self.queue.pop_front()?;

        for &(kind, next) in self.arena.neighbors(id, self.direction) {
            if kind == self.kind && self.visited.insert(next) {
                self.queue.push_back((next, depth + 1));
            }
        }

        Some((self.arena.key(id).clone(), depth))
    }
}

impl Iterator for Traversal {
    type Item = CanonicalKey;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_with_depth().map(|(key, _)| key)
    }
}
