//! Raw records as delivered by an upstream source
//!
//! These are deliberately loose: type names and relation kinds are plain
//! strings so that unexpected upstream values survive deserialization and
//! can be validated (or quarantined) by the domain layer.

use serde::{Deserialize, Serialize};

use crate::key::{CanonicalKey, EntityKind};

/// One record fetched for a canonical key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub key: CanonicalKey,

    /// Upstream numeric id (national dex number for species)
    pub id: u32,

    /// Localized display name, if the upstream had one
    #[serde(default)]
    pub display_name: Option<String>,

    pub attributes: RawAttributes,

    #[serde(default)]
    pub relations: Vec<RawRelation>,
}

impl RawRecord {
    /// Kind implied by the attribute payload
    pub fn attribute_kind(&self) -> EntityKind {
        match self.attributes {
            RawAttributes::Species { .. } => EntityKind::Species,
            RawAttributes::Move { .. } => EntityKind::Move,
            RawAttributes::Ability { .. } => EntityKind::Ability,
        }
    }
}

/// Kind-specific attributes, tagged by `kind`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RawAttributes {
    Species {
        #[serde(default)]
        genus: Option<String>,
        #[serde(default)]
        types: Vec<String>,
        #[serde(default)]
        height_m: Option<f64>,
        #[serde(default)]
        weight_kg: Option<f64>,
        #[serde(default)]
        flavor_text: Vec<String>,
        #[serde(default)]
        color: Option<String>,
        #[serde(default)]
        legendary: bool,
        #[serde(default)]
        mythical: bool,
        #[serde(default)]
        generation: Option<String>,
    },
    Move {
        #[serde(default)]
        move_type: Option<String>,
        #[serde(default)]
        power: Option<u16>,
        #[serde(default)]
        accuracy: Option<u8>,
        #[serde(default)]
        pp: Option<u8>,
        #[serde(default)]
        damage_class: Option<String>,
        #[serde(default)]
        effect: Option<String>,
    },
    Ability {
        #[serde(default)]
        effect: Option<String>,
        #[serde(default)]
        generation: Option<String>,
    },
}

/// A relationship reference to another entity, e.g. `("evolves_to", "species/raichu")`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRelation {
    pub kind: String,
    pub target: String,
}

impl RawRelation {
    pub fn new(kind: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            target: target.into(),
        }
    }
}
