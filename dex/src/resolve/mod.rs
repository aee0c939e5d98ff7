//! Fuzzy resolution of free text to canonical keys

mod similarity;

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use celebi_protocol::{CanonicalKey, EntityKind};
use serde::Serialize;
use thiserror::Error;

use crate::index::{NameEntry, NameIndex, normalize};

pub use similarity::{partial_ratio, ratio, score, token_sort_ratio};

/// Matching policy knobs
#[derive(Debug, Clone, PartialEq)]
pub struct ResolverConfig {
    /// Minimum score (0-100) for an entry to be considered at all
    pub match_threshold: f64,

    /// Minimum lead the best match needs over the runner-up
    pub tie_break_margin: f64,

    /// Candidates reported with an ambiguous result
    pub max_candidates: usize,

    /// Default number of autocomplete suggestions
    pub suggestion_limit: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            match_threshold: 70.0,
            tie_break_margin: 5.0,
            max_candidates: 5,
            suggestion_limit: 10,
        }
    }
}

/// A ranked match
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub key: CanonicalKey,
    pub name: String,
    pub score: f64,
}

impl Candidate {
    fn from_entry(entry: &NameEntry, score: f64) -> Self {
        Self {
            key: entry.key.clone(),
            name: entry.name.clone(),
            score,
        }
    }
}

/// Successful, unambiguous resolution
pub type Resolution = Candidate;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResolutionError {
    #[error("No entry matches the query")]
    NotFound,

    #[error("Query matches {} entries", .0.len())]
    Ambiguous(Vec<Candidate>),
}

pub type ResolutionResult = Result<Resolution, ResolutionError>;

/// Resolves user text against a [`NameIndex`]
///
/// Resolution is a pure function of the index and the input.
#[derive(Debug, Clone)]
pub struct FuzzyResolver {
    index: Arc<NameIndex>,
    config: ResolverConfig,
}

impl FuzzyResolver {
    pub fn new(index: Arc<NameIndex>, config: ResolverConfig) -> Self {
        Self { index, config }
    }

    pub fn index(&self) -> &NameIndex {
        &self.index
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolve across every entity kind
    pub fn resolve(&self, text: &str) -> ResolutionResult {
        self.resolve_filtered(text, None)
    }

    /// Resolve among entries of one kind only
    pub fn resolve_kind(&self, text: &str, kind: EntityKind) -> ResolutionResult {
        self.resolve_filtered(text, Some(kind))
    }

    /// Ranked matches for autocompletion
    ///
    /// Unlike [`resolve`](Self::resolve) this never reports ambiguity, and
    /// prefix matches count as strong matches while the user is typing.
    pub fn suggest(&self, text: &str, kind: Option<EntityKind>, limit: usize) -> Vec<Candidate> {
        let query = normalize(text);
        if query.is_empty() {
            return Vec::new();
        }

        let mut ranked = self.rank(&query, kind, |q, term| {
            score(q, term).max(partial_ratio(q, term))
        });
        ranked.truncate(limit);
        ranked
    }

    fn resolve_filtered(&self, text: &str, kind: Option<EntityKind>) -> ResolutionResult {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(ResolutionError::NotFound);
        }

        if let Ok(number) = trimmed.parse::<u32>() {
            return self.resolve_number(number, kind);
        }

        let query = normalize(trimmed);
        if query.is_empty() {
            return Err(ResolutionError::NotFound);
        }

        let mut ranked = self.rank(&query, kind, score);

        match ranked.len() {
            0 => Err(ResolutionError::NotFound),
            1 => Ok(ranked.swap_remove(0)),
            _ => {
                let lead = ranked[0].score - ranked[1].score;
                if lead >= self.config.tie_break_margin {
                    Ok(ranked.swap_remove(0))
                } else {
                    ranked.truncate(self.config.max_candidates);
                    Err(ResolutionError::Ambiguous(ranked))
                }
            }
        }
    }

    fn resolve_number(&self, number: u32, kind: Option<EntityKind>) -> ResolutionResult {
        let mut hits: Vec<Candidate> = self
            .index
            .by_number(number)
            .filter(|e| kind.is_none_or(|k| e.key.kind() == k))
            .map(|e| Candidate::from_entry(e, 100.0))
            .collect();

        match hits.len() {
            0 => Err(ResolutionError::NotFound),
            1 => Ok(hits.swap_remove(0)),
            _ => {
                hits.sort_by(compare_candidates);
                hits.truncate(self.config.max_candidates);
                Err(ResolutionError::Ambiguous(hits))
            }
        }
    }

    /// Every entry scoring at or above the threshold, best score per key,
    /// sorted by score then name
    fn rank(
        &self,
        query: &str,
        kind: Option<EntityKind>,
        scorer: impl Fn(&str, &str) -> f64,
    ) -> Vec<Candidate> {
        let mut best: HashMap<usize, f64> = HashMap::new();

        for term in self.index.terms() {
            let entry = self.index.entry_at(term.entry);
            if kind.is_some_and(|k| entry.key.kind() != k) {
                continue;
            }

            let s = scorer(query, &term.text);
            if s < self.config.match_threshold {
                continue;
            }

            best.entry(term.entry)
                .and_modify(|prev| *prev = prev.max(s))
                .or_insert(s);
        }

        let mut ranked: Vec<Candidate> = best
            .into_iter()
            .map(|(idx, s)| Candidate::from_entry(self.index.entry_at(idx), s))
            .collect();
        ranked.sort_by(compare_candidates);
        ranked
    }
}

fn compare_candidates(a: &Candidate, b: &Candidate) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.name.cmp(&b.name))
        .then_with(|| a.key.cmp(&b.key))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> FuzzyResolver {
        let index = NameIndex::new([
            NameEntry::new(CanonicalKey::species("pikachu"), "Pikachu").with_number(25),
            NameEntry::new(CanonicalKey::species("raichu"), "Raichu").with_number(26),
            NameEntry::new(CanonicalKey::species("mr-mime"), "Mr. Mime").with_number(122),
            NameEntry::new(CanonicalKey::species("nidoran-f"), "Nidoran♀").with_number(29),
            NameEntry::new(CanonicalKey::species("nidoran-m"), "Nidoran♂").with_number(32),
            NameEntry::new(CanonicalKey::species("ponyta-galar"), "Galarian Ponyta"),
            NameEntry::new(CanonicalKey::move_("thunderbolt"), "Thunderbolt")
                .with_aliases(["tbolt"]),
            NameEntry::new(CanonicalKey::ability("static"), "Static"),
            NameEntry::new(CanonicalKey::move_("tackle"), "Tackle").with_number(33),
        ])
        .unwrap();
        FuzzyResolver::new(Arc::new(index), ResolverConfig::default())
    }

    #[test]
    fn test_exact_match_case_insensitive() {
        let resolved = resolver().resolve("pikachu").unwrap();
        assert_eq!(resolved.key, CanonicalKey::species("pikachu"));
        assert_eq!(resolved.score, 100.0);

        let resolved = resolver().resolve("  PIKACHU ").unwrap();
        assert_eq!(resolved.key, CanonicalKey::species("pikachu"));
    }

    #[test]
    fn test_single_deletion_beats_runner_up() {
        let resolved = resolver().resolve("pikchu").unwrap();
        assert_eq!(resolved.key, CanonicalKey::species("pikachu"));
        assert!(resolved.score > 90.0);
    }

    #[test]
    fn test_gibberish_not_found() {
        assert_eq!(resolver().resolve("xqzvwk"), Err(ResolutionError::NotFound));
        assert_eq!(resolver().resolve("   "), Err(ResolutionError::NotFound));
        assert_eq!(resolver().resolve("..."), Err(ResolutionError::NotFound));
    }

    #[test]
    fn test_ambiguous_returns_ranked_candidates() {
        let err = resolver().resolve("nidoran").unwrap_err();
        match err {
            ResolutionError::Ambiguous(candidates) => {
                let keys: Vec<_> = candidates.iter().map(|c| c.key.slug()).collect();
                assert_eq!(keys.len(), 2);
                assert!(keys.contains(&"nidoran-f"));
                assert!(keys.contains(&"nidoran-m"));
                assert!(candidates[0].score >= candidates[1].score);
            }
            other => panic!("Expected ambiguity, got {:?}", other),
        }
    }

    #[test]
    fn test_tie_break_margin_is_configurable() {
        let config = ResolverConfig {
            tie_break_margin: 0.0,
            ..ResolverConfig::default()
        };
        let eager = FuzzyResolver::new(resolver().index, config);

        // With no margin the best-ranked candidate always wins
        assert!(eager.resolve("nidoran").is_ok());
    }

    #[test]
    fn test_ambiguous_candidates_are_bounded() {
        let entries = (0..10).map(|i| {
            NameEntry::new(
                CanonicalKey::move_(format!("hidden-power-{i}")),
                format!("Hidden Power {i}"),
            )
        });
        let index = Arc::new(NameIndex::new(entries).unwrap());
        let resolver = FuzzyResolver::new(index, ResolverConfig::default());

        match resolver.resolve("hidden power") {
            Err(ResolutionError::Ambiguous(candidates)) => assert_eq!(candidates.len(), 5),
            other => panic!("Expected ambiguity, got {:?}", other),
        }
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let r = resolver();
        for query in ["nidoran", "pikchu", "raichoo", "galar ponyta", "xqzvwk"] {
            assert_eq!(r.resolve(query), r.resolve(query));
        }
    }

    #[test]
    fn test_normalized_forms_resolve() {
        let r = resolver();
        assert_eq!(r.resolve("mr mime").unwrap().key, CanonicalKey::species("mr-mime"));
        assert_eq!(
            r.resolve("galarian ponyta").unwrap().key,
            CanonicalKey::species("ponyta-galar")
        );
        assert_eq!(r.resolve("tbolt").unwrap().key, CanonicalKey::move_("thunderbolt"));
    }

    #[test]
    fn test_numeric_lookup() {
        let r = resolver();
        assert_eq!(r.resolve("25").unwrap().key, CanonicalKey::species("pikachu"));
        assert_eq!(r.resolve("9999"), Err(ResolutionError::NotFound));
    }

    #[test]
    fn test_numeric_lookup_restricted_by_kind() {
        let index = Arc::new(
            NameIndex::new([
                NameEntry::new(CanonicalKey::species("bulbasaur"), "Bulbasaur").with_number(1),
                NameEntry::new(CanonicalKey::move_("pound"), "Pound").with_number(1),
            ])
            .unwrap(),
        );
        let r = FuzzyResolver::new(index, ResolverConfig::default());

        assert!(matches!(r.resolve("1"), Err(ResolutionError::Ambiguous(_))));
        assert_eq!(
            r.resolve_kind("1", EntityKind::Species).unwrap().key,
            CanonicalKey::species("bulbasaur")
        );
    }

    #[test]
    fn test_resolve_kind_filters_entries() {
        let r = resolver();
        assert_eq!(
            r.resolve_kind("static", EntityKind::Species),
            Err(ResolutionError::NotFound)
        );
        assert_eq!(
            r.resolve_kind("static", EntityKind::Ability).unwrap().key,
            CanonicalKey::ability("static")
        );
    }

    #[test]
    fn test_suggest_prefix_matches() {
        let r = resolver();
        let suggestions = r.suggest("pika", Some(EntityKind::Species), 10);
        assert_eq!(suggestions[0].key, CanonicalKey::species("pikachu"));

        let suggestions = r.suggest("thun", None, 10);
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].name, "Thunderbolt");

        assert!(r.suggest("", None, 10).is_empty());
    }

    #[test]
    fn test_suggest_respects_limit() {
        let r = resolver();
        let suggestions = r.suggest("nidoran", None, 1);
        assert_eq!(suggestions.len(), 1);
    }
}
