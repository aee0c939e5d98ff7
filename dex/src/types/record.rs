//! Typed records built from raw upstream data

use std::fmt;
use std::str::FromStr;

use celebi_protocol::pokeapi::{
    EVOLVES_FROM, EVOLVES_TO, FORM_OF, HAS_ABILITY, HELD_BY, LEARNED_BY,
};
use celebi_protocol::{CanonicalKey, EntityKind, RawAttributes, RawRecord, RawRelation};
use serde::Serialize;
use thiserror::Error;

use super::pokemon_type::Type;
use crate::query;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    #[error("Record {key} carries {found} attributes")]
    KindMismatch { key: CanonicalKey, found: EntityKind },

    #[error("Record {got} returned for request {expected}")]
    KeyMismatch {
        expected: CanonicalKey,
        got: CanonicalKey,
    },

    #[error("Unknown type {0:?}")]
    UnknownType(String),

    #[error("Unknown damage class {0:?}")]
    UnknownDamageClass(String),

    #[error("Invalid measurement {field}: {value}")]
    InvalidMeasure { field: &'static str, value: f64 },
}

/// Directed relationship kinds between entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    /// Species -> its pre-evolution
    EvolvesFrom,
    /// Species -> a direct evolution
    EvolvesTo,
    /// Regional or alternate form -> the species it belongs to
    FormOf,
    /// Species -> one of its abilities
    HasAbility,
    /// Ability -> a species that can have it
    HeldBy,
    /// Move -> a species that can learn it
    LearnedBy,
}

impl RelationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::EvolvesFrom => EVOLVES_FROM,
            RelationKind::EvolvesTo => EVOLVES_TO,
            RelationKind::FormOf => FORM_OF,
            RelationKind::HasAbility => HAS_ABILITY,
            RelationKind::HeldBy => HELD_BY,
            RelationKind::LearnedBy => LEARNED_BY,
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            EVOLVES_FROM => Ok(RelationKind::EvolvesFrom),
            EVOLVES_TO => Ok(RelationKind::EvolvesTo),
            FORM_OF => Ok(RelationKind::FormOf),
            HAS_ABILITY => Ok(RelationKind::HasAbility),
            HELD_BY => Ok(RelationKind::HeldBy),
            LEARNED_BY => Ok(RelationKind::LearnedBy),
            other => Err(other.to_string()),
        }
    }
}

/// A relationship reference carried by a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Relation {
    /// Recognized kind and well-formed target; enters the relationship graph
    Edge {
        kind: RelationKind,
        target: CanonicalKey,
    },
    /// Quarantined: kept for inspection, never added to the graph
    Unrecognized { kind: String, target: String },
}

impl From<RawRelation> for Relation {
    fn from(raw: RawRelation) -> Self {
        match (raw.kind.parse::<RelationKind>(), raw.target.parse::<CanonicalKey>()) {
            (Ok(kind), Ok(target)) => Relation::Edge { kind, target },
            _ => Relation::Unrecognized {
                kind: raw.kind,
                target: raw.target,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DamageClass {
    Physical,
    Special,
    Status,
}

impl FromStr for DamageClass {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "physical" => Ok(DamageClass::Physical),
            "special" => Ok(DamageClass::Special),
            "status" => Ok(DamageClass::Status),
            other => Err(RecordError::UnknownDamageClass(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeciesInfo {
    /// Category, e.g. "Mouse Pokémon"
    pub genus: Option<String>,

    /// Types of the default variety, in slot order
    pub types: Vec<Type>,

    pub height_m: Option<f64>,
    pub weight_kg: Option<f64>,

    /// Distinct pokedex entries
    pub flavor_text: Vec<String>,

    /// Pokedex color name
    pub color: Option<String>,

    pub legendary: bool,
    pub mythical: bool,
    pub generation: Option<String>,
}

impl SpeciesInfo {
    /// Attacking types that hit this species super effectively
    pub fn weaknesses(&self) -> Vec<Type> {
        query::weaknesses(&self.types)
    }

    pub fn resistances(&self) -> Vec<Type> {
        query::resistances(&self.types)
    }

    pub fn immunities(&self) -> Vec<Type> {
        query::immunities(&self.types)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoveInfo {
    pub move_type: Option<Type>,
    pub power: Option<u16>,
    pub accuracy: Option<u8>,
    pub pp: Option<u8>,
    pub damage_class: Option<DamageClass>,
    pub effect: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AbilityInfo {
    pub effect: Option<String>,
    pub generation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Attributes {
    Species(SpeciesInfo),
    Move(MoveInfo),
    Ability(AbilityInfo),
}

/// The full, validated payload for one canonical key
///
/// Records are immutable once built; a refetch produces a new record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub key: CanonicalKey,
    pub id: u32,

    /// Localized name, falling back to the slug
    pub name: String,

    pub attributes: Attributes,
    pub relations: Vec<Relation>,
}

impl Record {
    /// Validate a raw record into a typed one
    pub fn from_raw(raw: RawRecord) -> Result<Self, RecordError> {
        let found = raw.attribute_kind();
        if found != raw.key.kind() {
            return Err(RecordError::KindMismatch {
                key: raw.key,
                found,
            });
        }

        let attributes = match raw.attributes {
            RawAttributes::Species {
                genus,
                types,
                height_m,
                weight_kg,
                flavor_text,
                color,
                legendary,
                mythical,
                generation,
            } => Attributes::Species(SpeciesInfo {
                genus,
                types: types
                    .iter()
                    .map(|t| parse_type(t))
                    .collect::<Result<_, _>>()?,
                height_m: positive("height_m", height_m)?,
                weight_kg: positive("weight_kg", weight_kg)?,
                flavor_text,
                color,
                legendary,
                mythical,
                generation,
            }),
            RawAttributes::Move {
                move_type,
                power,
                accuracy,
                pp,
                damage_class,
                effect,
            } => Attributes::Move(MoveInfo {
                move_type: move_type.as_deref().map(parse_type).transpose()?,
                power,
                accuracy,
                pp,
                damage_class: damage_class
                    .as_deref()
                    .map(str::parse::<DamageClass>)
                    .transpose()?,
                effect,
            }),
            RawAttributes::Ability { effect, generation } => {
                Attributes::Ability(AbilityInfo { effect, generation })
            }
        };

        let name = raw
            .display_name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| raw.key.slug().to_string());

        Ok(Self {
            id: raw.id,
            name,
            attributes,
            relations: raw.relations.into_iter().map(Relation::from).collect(),
            key: raw.key,
        })
    }

    /// Like [`Record::from_raw`], but also checks the record answers `expected`
    pub fn from_raw_for(expected: &CanonicalKey, raw: RawRecord) -> Result<Self, RecordError> {
        if &raw.key != expected {
            return Err(RecordError::KeyMismatch {
                expected: expected.clone(),
                got: raw.key,
            });
        }
        Self::from_raw(raw)
    }

    /// Recognized relationship edges
    pub fn edges(&self) -> impl Iterator<Item = (RelationKind, &CanonicalKey)> {
        self.relations.iter().filter_map(|r| match r {
            Relation::Edge { kind, target } => Some((*kind, target)),
            Relation::Unrecognized { .. } => None,
        })
    }

    /// Quarantined relations as `(kind, target)` strings
    pub fn unrecognized(&self) -> impl Iterator<Item = (&str, &str)> {
        self.relations.iter().filter_map(|r| match r {
            Relation::Unrecognized { kind, target } => Some((kind.as_str(), target.as_str())),
            Relation::Edge { .. } => None,
        })
    }

    pub fn species(&self) -> Option<&SpeciesInfo> {
        match &self.attributes {
            Attributes::Species(info) => Some(info),
            _ => None,
        }
    }
}

fn parse_type(name: &str) -> Result<Type, RecordError> {
    Type::from_name(name).ok_or_else(|| RecordError::UnknownType(name.to_string()))
}

fn positive(field: &'static str, value: Option<f64>) -> Result<Option<f64>, RecordError> {
    match value {
        Some(v) if !(v.is_finite() && v > 0.0) => {
            Err(RecordError::InvalidMeasure { field, value: v })
        }
        other => Ok(other),
    }
}
