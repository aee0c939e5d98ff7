//! Canonical entity keys

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ParseError;

/// The kinds of entity the data service knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Species,
    Move,
    Ability,
}

impl EntityKind {
    pub const ALL: [EntityKind; 3] = [EntityKind::Species, EntityKind::Move, EntityKind::Ability];

    /// Short name used in key strings
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Species => "species",
            EntityKind::Move => "move",
            EntityKind::Ability => "ability",
        }
    }

    /// PokeAPI endpoint segment for this kind
    pub fn endpoint(&self) -> &'static str {
        match self {
            EntityKind::Species => "pokemon-species",
            EntityKind::Move => "move",
            EntityKind::Ability => "ability",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "species" | "pokemon-species" | "pokemon" => Ok(EntityKind::Species),
            "move" => Ok(EntityKind::Move),
            "ability" => Ok(EntityKind::Ability),
            other => Err(ParseError::UnknownKind(other.to_string())),
        }
    }
}

/// Stable identifier for one entity, written as `kind/slug`
///
/// The slug is the upstream's lowercase hyphenated resource name
/// (`species/mr-mime`, `move/thunderbolt`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CanonicalKey {
    kind: EntityKind,
    slug: String,
}

impl CanonicalKey {
    pub fn new(kind: EntityKind, slug: impl Into<String>) -> Self {
        Self {
            kind,
            slug: slug.into(),
        }
    }

    pub fn species(slug: impl Into<String>) -> Self {
        Self::new(EntityKind::Species, slug)
    }

    pub fn move_(slug: impl Into<String>) -> Self {
        Self::new(EntityKind::Move, slug)
    }

    pub fn ability(slug: impl Into<String>) -> Self {
        Self::new(EntityKind::Ability, slug)
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }
}

impl fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.slug)
    }
}

impl FromStr for CanonicalKey {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ParseError::EmptyKey);
        }

        let (kind, slug) = s
            .split_once('/')
            .ok_or_else(|| ParseError::InvalidKey(s.to_string()))?;

        if slug.is_empty() || slug.contains('/') || slug.chars().any(char::is_whitespace) {
            return Err(ParseError::InvalidKey(s.to_string()));
        }

        Ok(Self::new(kind.parse()?, slug))
    }
}

impl TryFrom<String> for CanonicalKey {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CanonicalKey> for String {
    fn from(key: CanonicalKey) -> Self {
        key.to_string()
    }
}
