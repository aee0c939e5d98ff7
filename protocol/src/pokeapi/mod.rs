//! PokeAPI payload shapes and their conversion into [`RawRecord`]s
//!
//! Only the fields the data core actually consumes are modelled; serde
//! ignores everything else in the (very large) upstream documents.


use anyhow::{Context, Result};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::key::{CanonicalKey, EntityKind};
use crate::raw::{RawAttributes, RawRecord, RawRelation};

/// Relation kind names as they appear in raw records
pub const EVOLVES_FROM: &str = "evolves_from";
pub const FORM_OF: &str = "form_of";
pub const EVOLVES_TO: &str = "evolves_to";
pub const HAS_ABILITY: &str = "has_ability";
pub const HELD_BY: &str = "held_by";
pub const LEARNED_BY: &str = "learned_by";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NamedResource {
    pub name: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ApiResource {
    pub url: String,
}

/// Paginated resource listing (`/pokemon-species?limit=...`)
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ResourceList {
    pub count: u32,
    #[serde(default)]
    pub next: Option<String>,
    pub results: Vec<NamedResource>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LocalizedName {
    pub name: String,
    pub language: NamedResource,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Genus {
    pub genus: String,
    pub language: NamedResource,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FlavorTextEntry {
    pub flavor_text: String,
    pub language: NamedResource,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EffectEntry {
    pub effect: String,
    #[serde(default)]
    pub short_effect: Option<String>,
    pub language: NamedResource,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Variety {
    pub is_default: bool,
    pub pokemon: NamedResource,
}

/// `/pokemon-species/{name}`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SpeciesPayload {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub names: Vec<LocalizedName>,
    #[serde(default)]
    pub genera: Vec<Genus>,
    #[serde(default)]
    pub flavor_text_entries: Vec<FlavorTextEntry>,
    #[serde(default)]
    pub evolves_from_species: Option<NamedResource>,
    #[serde(default)]
    pub evolution_chain: Option<ApiResource>,
    #[serde(default)]
    pub color: Option<NamedResource>,
    #[serde(default)]
    pub generation: Option<NamedResource>,
    #[serde(default)]
    pub is_legendary: bool,
    #[serde(default)]
    pub is_mythical: bool,
    #[serde(default)]
    pub varieties: Vec<Variety>,
}

impl SpeciesPayload {
    /// Name of the default pokemon variety, falling back to the species name
    pub fn default_variety(&self) -> &str {
        self.varieties
            .iter()
            .find(|v| v.is_default)
            .map(|v| v.pokemon.name.as_str())
            .unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TypeSlot {
    pub slot: u8,
    #[serde(rename = "type")]
    pub type_: NamedResource,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AbilitySlot {
    pub ability: NamedResource,
    #[serde(default)]
    pub is_hidden: bool,
    pub slot: u8,
}

/// `/pokemon/{name}`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PokemonPayload {
    pub id: u32,
    pub name: String,
    /// Species this variety belongs to
    #[serde(default)]
    pub species: Option<NamedResource>,
    /// Decimetres
    #[serde(default)]
    pub height: u32,
    /// Hectograms
    #[serde(default)]
    pub weight: u32,
    #[serde(default)]
    pub types: Vec<TypeSlot>,
    #[serde(default)]
    pub abilities: Vec<AbilitySlot>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChainLink {
    pub species: NamedResource,
    #[serde(default)]
    pub evolves_to: Vec<ChainLink>,
}

/// `/evolution-chain/{id}`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EvolutionChainPayload {
    pub id: u32,
    pub chain: ChainLink,
}

impl EvolutionChainPayload {
    /// Species that `species` evolves into directly
    pub fn successors(&self, species: &str) -> Vec<&str> {
        let mut stack = vec![&self.chain];
        while let Some(link) = stack.pop() {
            if link.species.name == species {
                return link
                    .evolves_to
                    .iter()
                    .map(|next| next.species.name.as_str())
                    .collect();
            }
            stack.extend(link.evolves_to.iter());
        }
        Vec::new()
    }
}

/// `/move/{name}`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MovePayload {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub names: Vec<LocalizedName>,
    #[serde(default, rename = "type")]
    pub type_: Option<NamedResource>,
    #[serde(default)]
    pub power: Option<u16>,
    #[serde(default)]
    pub accuracy: Option<u8>,
    #[serde(default)]
    pub pp: Option<u8>,
    #[serde(default)]
    pub damage_class: Option<NamedResource>,
    #[serde(default)]
    pub effect_entries: Vec<EffectEntry>,
    #[serde(default)]
    pub learned_by_pokemon: Vec<NamedResource>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AbilityHolder {
    pub pokemon: NamedResource,
    #[serde(default)]
    pub is_hidden: bool,
}

/// `/ability/{name}`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AbilityPayload {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub names: Vec<LocalizedName>,
    #[serde(default)]
    pub effect_entries: Vec<EffectEntry>,
    #[serde(default)]
    pub generation: Option<NamedResource>,
    #[serde(default)]
    pub pokemon: Vec<AbilityHolder>,
}

/// Decode a PokeAPI JSON body
pub fn parse_payload<T: DeserializeOwned>(body: &str) -> Result<T> {
    serde_json::from_str(body).with_context(|| {
        format!(
            "Failed to parse {} payload",
            std::any::type_name::<T>().rsplit("::").next().unwrap_or("PokeAPI")
        )
    })
}

fn localized<'a>(names: &'a [LocalizedName], language: &str) -> Option<&'a str> {
    names
        .iter()
        .find(|n| n.language.name == language)
        .map(|n| n.name.as_str())
}

fn effect_text(entries: &[EffectEntry], language: &str) -> Option<String> {
    entries
        .iter()
        .find(|e| e.language.name == language)
        .map(|e| e.short_effect.clone().unwrap_or_else(|| e.effect.clone()))
}

fn key_string(kind: EntityKind, slug: &str) -> String {
    CanonicalKey::new(kind, slug).to_string()
}

fn flavor_text(species: &SpeciesPayload, language: &str) -> Vec<String> {
    let mut texts: Vec<String> = Vec::new();
    for entry in species
        .flavor_text_entries
        .iter()
        .filter(|e| e.language.name == language)
    {
        if !texts.contains(&entry.flavor_text) {
            texts.push(entry.flavor_text.clone());
        }
    }
    texts
}

fn genus(species: &SpeciesPayload, language: &str) -> Option<String> {
    species
        .genera
        .iter()
        .find(|g| g.language.name == language)
        .map(|g| g.genus.clone())
}

/// Types and measurements that belong to a pokemon variety
#[derive(Debug, Default)]
struct VarietyTraits {
    types: Vec<String>,
    height_m: Option<f64>,
    weight_kg: Option<f64>,
}

/// Read the variety's traits, appending its abilities to `relations`
fn variety_traits(pokemon: &PokemonPayload, relations: &mut Vec<RawRelation>) -> VarietyTraits {
    let mut slots: Vec<&TypeSlot> = pokemon.types.iter().collect();
    slots.sort_by_key(|s| s.slot);

    let mut abilities: Vec<&AbilitySlot> = pokemon.abilities.iter().collect();
    abilities.sort_by_key(|a| a.slot);
    for slot in abilities {
        relations.push(RawRelation::new(
            HAS_ABILITY,
            key_string(EntityKind::Ability, &slot.ability.name),
        ));
    }

    VarietyTraits {
        types: slots.iter().map(|s| s.type_.name.clone()).collect(),
        height_m: (pokemon.height > 0).then(|| f64::from(pokemon.height) / 10.0),
        weight_kg: (pokemon.weight > 0).then(|| f64::from(pokemon.weight) / 10.0),
    }
}

/// "Ponyta" + "galar" -> "Ponyta (Galar)"
fn form_name(base: &str, suffix: &str) -> String {
    let label: Vec<String> = suffix
        .split('-')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect();
    format!("{base} ({})", label.join(" "))
}

/// Assemble a species record from its species document, its default
/// pokemon variety and its evolution chain
pub fn species_record(
    species: &SpeciesPayload,
    pokemon: Option<&PokemonPayload>,
    chain: Option<&EvolutionChainPayload>,
    language: &str,
) -> RawRecord {
    let mut relations = Vec::new();
    if let Some(from) = &species.evolves_from_species {
        relations.push(RawRelation::new(
            EVOLVES_FROM,
            key_string(EntityKind::Species, &from.name),
        ));
    }
    if let Some(chain) = chain {
        for next in chain.successors(&species.name) {
            relations.push(RawRelation::new(
                EVOLVES_TO,
                key_string(EntityKind::Species, next),
            ));
        }
    }

    let traits = pokemon.map(|p| variety_traits(p, &mut relations)).unwrap_or_default();

    RawRecord {
        key: CanonicalKey::species(&species.name),
        id: species.id,
        display_name: localized(&species.names, language).map(str::to_string),
        attributes: RawAttributes::Species {
            genus: genus(species, language),
            types: traits.types,
            height_m: traits.height_m,
            weight_kg: traits.weight_kg,
            flavor_text: flavor_text(species, language),
            color: species.color.as_ref().map(|c| c.name.clone()),
            legendary: species.is_legendary,
            mythical: species.is_mythical,
            generation: species.generation.as_ref().map(|g| g.name.clone()),
        },
        relations,
    }
}

/// Assemble the record of a non-default variety (a regional or alternate
/// form) from its pokemon document and the species it belongs to
///
/// The record is keyed by the variety name under `species/` and points back
/// at its species through a `form_of` relation. Evolutions stay on the
/// species record.
pub fn form_record(
    species: &SpeciesPayload,
    pokemon: &PokemonPayload,
    language: &str,
) -> RawRecord {
    let mut relations = vec![RawRelation::new(
        FORM_OF,
        key_string(EntityKind::Species, &species.name),
    )];
    let traits = variety_traits(pokemon, &mut relations);

    let display_name = pokemon
        .name
        .strip_prefix(species.name.as_str())
        .and_then(|rest| rest.strip_prefix('-'))
        .filter(|suffix| !suffix.is_empty())
        .and_then(|suffix| localized(&species.names, language).map(|b| form_name(b, suffix)));

    RawRecord {
        key: CanonicalKey::species(&pokemon.name),
        id: species.id,
        display_name,
        attributes: RawAttributes::Species {
            genus: genus(species, language),
            types: traits.types,
            height_m: traits.height_m,
            weight_kg: traits.weight_kg,
            flavor_text: flavor_text(species, language),
            color: species.color.as_ref().map(|c| c.name.clone()),
            legendary: species.is_legendary,
            mythical: species.is_mythical,
            generation: species.generation.as_ref().map(|g| g.name.clone()),
        },
        relations,
    }
}

pub fn move_record(payload: &MovePayload, language: &str) -> RawRecord {
    let relations = payload
        .learned_by_pokemon
        .iter()
        .map(|p| RawRelation::new(LEARNED_BY, key_string(EntityKind::Species, &p.name)))
        .collect();

    RawRecord {
        key: CanonicalKey::move_(&payload.name),
        id: payload.id,
        display_name: localized(&payload.names, language).map(str::to_string),
        attributes: RawAttributes::Move {
            move_type: payload.type_.as_ref().map(|t| t.name.clone()),
            power: payload.power,
            accuracy: payload.accuracy,
            pp: payload.pp,
            damage_class: payload.damage_class.as_ref().map(|d| d.name.clone()),
            effect: effect_text(&payload.effect_entries, language),
        },
        relations,
    }
}

pub fn ability_record(payload: &AbilityPayload, language: &str) -> RawRecord {
    let relations = payload
        .pokemon
        .iter()
        .map(|h| RawRelation::new(HELD_BY, key_string(EntityKind::Species, &h.pokemon.name)))
        .collect();

    RawRecord {
        key: CanonicalKey::ability(&payload.name),
        id: payload.id,
        display_name: localized(&payload.names, language).map(str::to_string),
        attributes: RawAttributes::Ability {
            effect: effect_text(&payload.effect_entries, language),
            generation: payload.generation.as_ref().map(|g| g.name.clone()),
        },
        relations,
    }
}
