//! Reference dictionary of canonical names
//!
//! A [`NameIndex`] is built once at startup and never mutated afterwards, so
//! it can be shared freely (`Arc<NameIndex>`) without locking.

mod normalize;

use std::collections::{HashMap, HashSet};

use anyhow::{Context, Result};
use celebi_protocol::pokeapi::NamedResource;
use celebi_protocol::{CanonicalKey, EntityKind};
use serde::Deserialize;
use thiserror::Error;

pub use normalize::normalize;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    #[error("Duplicate key in name index: {0}")]
    DuplicateKey(CanonicalKey),

    #[error("Entry {0} has an empty primary name")]
    EmptyName(CanonicalKey),
}

/// One canonical entity and the names it is known by
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NameEntry {
    pub key: CanonicalKey,

    /// Preferred display name
    pub name: String,

    /// Alternative spellings, in priority order
    #[serde(default)]
    pub aliases: Vec<String>,

    /// National dex number (species only)
    #[serde(default)]
    pub number: Option<u32>,
}

impl NameEntry {
    pub fn new(key: CanonicalKey, name: impl Into<String>) -> Self {
        Self {
            key,
            name: name.into(),
            aliases: Vec::new(),
            number: None,
        }
    }

    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases.extend(aliases.into_iter().map(Into::into));
        self
    }

    pub fn with_number(mut self, number: u32) -> Self {
        self.number = Some(number);
        self
    }
}

/// A normalized searchable term pointing back at its entry
#[derive(Debug, Clone)]
pub(crate) struct Term {
    pub text: String,
    pub entry: usize,
}

#[derive(Debug, Clone, Default)]
pub struct NameIndex {
    entries: Vec<NameEntry>,
    by_key: HashMap<CanonicalKey, usize>,
    by_number: HashMap<u32, Vec<usize>>,
    terms: Vec<Term>,
}

impl NameIndex {
    /// Build an index, rejecting duplicate keys
    pub fn new(entries: impl IntoIterator<Item = NameEntry>) -> Result<Self, IndexError> {
        let mut index = NameIndex::default();

        for entry in entries {
            if entry.name.trim().is_empty() {
                return Err(IndexError::EmptyName(entry.key));
            }
            if index.by_key.contains_key(&entry.key) {
                return Err(IndexError::DuplicateKey(entry.key));
            }

            let idx = index.entries.len();
            index.by_key.insert(entry.key.clone(), idx);
            if let Some(number) = entry.number {
                index.by_number.entry(number).or_default().push(idx);
            }

            // The slug is always searchable, then the names in priority order
            let mut seen: Vec<String> = Vec::new();
            let names = std::iter::once(entry.key.slug())
                .chain(std::iter::once(entry.name.as_str()))
                .chain(entry.aliases.iter().map(String::as_str));
            for name in names {
                let text = normalize(name);
                if text.is_empty() || seen.contains(&text) {
                    continue;
                }
                seen.push(text.clone());
                index.terms.push(Term { text, entry: idx });
            }

            index.entries.push(entry);
        }

        Ok(index)
    }

    /// Load a JSON array of [`NameEntry`] documents
    pub fn from_json(json: &str) -> Result<Self> {
        let entries: Vec<NameEntry> =
            serde_json::from_str(json).context("Failed to parse name index document")?;
        Self::new(entries).context("Invalid name index")
    }

    /// Build entries from an upstream resource listing
    ///
    /// Numbers are taken from the trailing id in each resource url
    /// (`.../pokemon-species/25/`), display names from the slug.
    pub fn from_resources(
        kind: EntityKind,
        resources: &[NamedResource],
    ) -> Result<Self, IndexError> {
        Self::new(resources.iter().map(|r| resource_entry(kind, r)))
    }

    /// Build species entries from the species listing plus the pokemon
    /// listing, so that regional and alternate forms (`ponyta-galar`) are
    /// searchable next to their species
    ///
    /// A pokemon whose name is also a species name is that species' default
    /// variety and adds nothing. Forms carry no dex number of their own.
    pub fn from_species_listing(
        species: &[NamedResource],
        pokemon: &[NamedResource],
    ) -> Result<Self, IndexError> {
        let species_names: HashSet<&str> = species.iter().map(|r| r.name.as_str()).collect();

        let forms = pokemon
            .iter()
            .filter(|p| !species_names.contains(p.name.as_str()))
            .map(|p| {
                NameEntry::new(CanonicalKey::species(&p.name), form_name(&p.name, &species_names))
            });

        Self::new(
            species
                .iter()
                .map(|r| resource_entry(EntityKind::Species, r))
                .chain(forms),
        )
    }

    /// Merge several indexes (e.g. species, moves and abilities)
    pub fn merge(indexes: impl IntoIterator<Item = NameIndex>) -> Result<Self, IndexError> {
        Self::new(indexes.into_iter().flat_map(|i| i.entries))
    }

    pub fn get(&self, key: &CanonicalKey) -> Option<&NameEntry> {
        self.by_key.get(key).map(|&idx| &self.entries[idx])
    }

    pub fn by_number(&self, number: u32) -> impl Iterator<Item = &NameEntry> {
        self.by_number
            .get(&number)
            .into_iter()
            .flatten()
            .map(|&idx| &self.entries[idx])
    }

    pub fn entries(&self) -> &[NameEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn terms(&self) -> &[Term] {
        &self.terms
    }

    pub(crate) fn entry_at(&self, idx: usize) -> &NameEntry {
        &self.entries[idx]
    }
}

fn resource_entry(kind: EntityKind, resource: &NamedResource) -> NameEntry {
    let mut entry = NameEntry::new(
        CanonicalKey::new(kind, &resource.name),
        title_case(&resource.name),
    );
    if kind == EntityKind::Species {
        entry.number = trailing_id(&resource.url);
    }
    entry
}

/// "ponyta-galar" -> "Ponyta (Galar)", splitting at the longest species
/// name that prefixes the form
fn form_name(name: &str, species_names: &HashSet<&str>) -> String {
    name.match_indices('-')
        .rev()
        .map(|(i, _)| (&name[..i], &name[i + 1..]))
        .find(|(base, suffix)| !suffix.is_empty() && species_names.contains(base))
        .map(|(base, suffix)| format!("{} ({})", title_case(base), title_case(suffix)))
        .unwrap_or_else(|| title_case(name))
}

fn trailing_id(url: &str) -> Option<u32> {
    url.trim_end_matches('/').rsplit('/').next()?.parse().ok()
}

fn title_case(slug: &str) -> String {
    slug.split('-')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
