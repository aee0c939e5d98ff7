//! Shared fixtures: a scripted in-memory upstream and a small name index

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;

use celebi_client::{CanonicalKey, RawRecord, Upstream, UpstreamError, async_trait};
use celebi_dex::{NameEntry, NameIndex};
use celebi_protocol::{RawAttributes, RawRelation};
use parking_lot::Mutex;

/// In-memory upstream that counts calls per key
pub struct MockUpstream {
    records: HashMap<CanonicalKey, RawRecord>,
    failures: Mutex<HashMap<CanonicalKey, VecDeque<UpstreamError>>>,
    panics: Mutex<HashSet<CanonicalKey>>,
    latency: Duration,
    calls: Mutex<HashMap<CanonicalKey, usize>>,
}

impl MockUpstream {
    pub fn new(records: impl IntoIterator<Item = RawRecord>) -> Self {
        Self {
            records: records.into_iter().map(|r| (r.key.clone(), r)).collect(),
            failures: Mutex::new(HashMap::new()),
            panics: Mutex::new(HashSet::new()),
            latency: Duration::ZERO,
            calls: Mutex::new(HashMap::new()),
        }
    }

    /// Every call sleeps this long before answering
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Answer the next calls for `key` with `errors`, in order
    pub fn fail_next(&self, key: &CanonicalKey, errors: impl IntoIterator<Item = UpstreamError>) {
        self.failures
            .lock()
            .entry(key.clone())
            .or_default()
            .extend(errors);
    }

    /// Panic on the next call for `key`
    pub fn panic_next(&self, key: &CanonicalKey) {
        self.panics.lock().insert(key.clone());
    }

    pub fn calls(&self, key: &CanonicalKey) -> usize {
        self.calls.lock().get(key).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().values().sum()
    }
}

#[async_trait]
impl Upstream for MockUpstream {
    async fn fetch_record(&self, key: &CanonicalKey) -> Result<RawRecord, UpstreamError> {
        *self.calls.lock().entry(key.clone()).or_default() += 1;

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let panic = self.panics.lock().remove(key);
        if panic {
            panic!("upstream handler crashed for {key}");
        }

        let failure = self.failures.lock().get_mut(key).and_then(VecDeque::pop_front);
        if let Some(err) = failure {
            return Err(err);
        }

        self.records.get(key).cloned().ok_or(UpstreamError::NotFound)
    }
}

pub fn species_key(slug: &str) -> CanonicalKey {
    CanonicalKey::species(slug)
}

fn relations(pairs: &[(&str, &str)]) -> Vec<RawRelation> {
    pairs
        .iter()
        .map(|(kind, target)| RawRelation::new(*kind, *target))
        .collect()
}

pub fn species(slug: &str, id: u32, name: &str, relation_pairs: &[(&str, &str)]) -> RawRecord {
    RawRecord {
        key: CanonicalKey::species(slug),
        id,
        display_name: Some(name.to_string()),
        attributes: RawAttributes::Species {
            genus: Some("Mouse Pokémon".to_string()),
            types: vec!["electric".to_string()],
            height_m: Some(0.4),
            weight_kg: Some(6.0),
            flavor_text: Vec::new(),
            color: Some("yellow".to_string()),
            legendary: false,
            mythical: false,
            generation: Some("generation-i".to_string()),
        },
        relations: relations(relation_pairs),
    }
}

pub fn ability(slug: &str, id: u32, name: &str, relation_pairs: &[(&str, &str)]) -> RawRecord {
    RawRecord {
        key: CanonicalKey::ability(slug),
        id,
        display_name: Some(name.to_string()),
        attributes: RawAttributes::Ability {
            effect: Some("Contact with the Pokémon may cause paralysis.".to_string()),
            generation: Some("generation-iii".to_string()),
        },
        relations: relations(relation_pairs),
    }
}

/// The Pikachu line, the Nidoran pair, Ponyta, two regional forms and the
/// Static ability
pub fn records() -> Vec<RawRecord> {
    vec![
        species(
            "pichu",
            172,
            "Pichu",
            &[("evolves_to", "species/pikachu"), ("has_ability", "ability/static")],
        ),
        species(
            "pikachu",
            25,
            "Pikachu",
            &[
                ("evolves_from", "species/pichu"),
                ("evolves_to", "species/raichu"),
                ("has_ability", "ability/static"),
                ("gigantamax", "species/pikachu-gmax"),
            ],
        ),
        species(
            "raichu",
            26,
            "Raichu",
            &[("evolves_from", "species/pikachu"), ("has_ability", "ability/static")],
        ),
        species("nidoran-f", 29, "Nidoran♀", &[]),
        species("nidoran-m", 32, "Nidoran♂", &[]),
        species("ponyta", 77, "Ponyta", &[]),
        species(
            "ponyta-galar",
            77,
            "Ponyta (Galar)",
            &[("form_of", "species/ponyta")],
        ),
        species(
            "raichu-alola",
            26,
            "Raichu (Alola)",
            &[("form_of", "species/raichu"), ("has_ability", "ability/static")],
        ),
        ability(
            "static",
            9,
            "Static",
            &[
                ("held_by", "species/pichu"),
                ("held_by", "species/pikachu"),
                ("held_by", "species/raichu"),
                ("held_by", "species/raichu-alola"),
            ],
        ),
    ]
}

/// Names for every fixture record, plus Mew, which upstream does not have
pub fn index() -> NameIndex {
    let species = [
        ("pichu", "Pichu", 172),
        ("pikachu", "Pikachu", 25),
        ("raichu", "Raichu", 26),
        ("nidoran-f", "Nidoran♀", 29),
        ("nidoran-m", "Nidoran♂", 32),
        ("ponyta", "Ponyta", 77),
        ("mew", "Mew", 151),
    ];
    let forms = [
        ("ponyta-galar", "Ponyta (Galar)"),
        ("raichu-alola", "Raichu (Alola)"),
    ];

    let mut entries: Vec<NameEntry> = species
        .into_iter()
        .map(|(slug, name, number)| {
            NameEntry::new(CanonicalKey::species(slug), name).with_number(number)
        })
        .chain(
            forms
                .into_iter()
                .map(|(slug, name)| NameEntry::new(CanonicalKey::species(slug), name)),
        )
        .collect();
    entries.push(NameEntry::new(CanonicalKey::ability("static"), "Static"));

    NameIndex::new(entries).unwrap()
}
