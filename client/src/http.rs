//! PokeAPI transport over HTTP

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use celebi_dex::NameIndex;
use celebi_protocol::pokeapi::{
    self, AbilityPayload, EvolutionChainPayload, MovePayload, NamedResource, PokemonPayload,
    ResourceList, SpeciesPayload,
};
use celebi_protocol::{CanonicalKey, EntityKind, RawRecord, UpstreamError};
use reqwest::StatusCode;
use reqwest::header::{HeaderValue, RETRY_AFTER};
use serde::de::DeserializeOwned;

use crate::upstream::Upstream;

pub const POKEAPI_URL: &str = "https://pokeapi.co/api/v2";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Large enough to list every resource of a kind in one page
const LIST_LIMIT: u32 = 100_000;

/// Varieties (default and alternate forms) live here, not under the species
const POKEMON_ENDPOINT: &str = "pokemon";

/// [`Upstream`] backed by the public PokeAPI
#[derive(Debug, Clone)]
pub struct PokeApiClient {
    http: reqwest::Client,
    base_url: String,
    language: String,
    timeout: Duration,
}

impl PokeApiClient {
    pub fn new() -> Self {
        Self::with_base_url(POKEAPI_URL)
    }

    /// Point at a mirror or a local test server
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            language: "en".to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Language used for names, genus, flavor text and effects
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Every resource of one kind, as listed by the API
    pub async fn list(&self, kind: EntityKind) -> Result<Vec<NamedResource>> {
        self.list_endpoint(kind.endpoint()).await
    }

    async fn list_endpoint(&self, endpoint: &str) -> Result<Vec<NamedResource>> {
        let url = format!("{}/{}?limit={}", self.base_url, endpoint, LIST_LIMIT);
        let list: ResourceList = self
            .get_json(&url)
            .await
            .with_context(|| format!("Failed to list {endpoint} resources"))?;
        tracing::info!(endpoint, count = list.results.len(), "Listed upstream resources");
        Ok(list.results)
    }

    /// Build a [`NameIndex`] over the listed resources of `kinds`
    ///
    /// Species also index their non-default varieties (`ponyta-galar`),
    /// which [`fetch_record`](Upstream::fetch_record) serves as forms.
    pub async fn name_index(&self, kinds: &[EntityKind]) -> Result<NameIndex> {
        let mut indexes = Vec::with_capacity(kinds.len());
        for &kind in kinds {
            let resources = self.list(kind).await?;
            let index = match kind {
                EntityKind::Species => {
                    let varieties = self.list_endpoint(POKEMON_ENDPOINT).await?;
                    NameIndex::from_species_listing(&resources, &varieties)?
                }
                _ => NameIndex::from_resources(kind, &resources)?,
            };
            indexes.push(index);
        }
        Ok(NameIndex::merge(indexes)?)
    }

    fn resource_url(&self, endpoint: &str, slug: &str) -> String {
        format!("{}/{}/{}", self.base_url, endpoint, slug)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, UpstreamError> {
        tracing::debug!(url = %url, "GET");

        let response = self
            .http
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| UpstreamError::Unavailable(e.to_string()))?;

        if let Some(err) = status_error(response.status(), response.headers().get(RETRY_AFTER)) {
            return Err(err);
        }

        let body = response
            .text()
            .await
            .map_err(|e| UpstreamError::Unavailable(e.to_string()))?;

        pokeapi::parse_payload(&body).map_err(|e| UpstreamError::Malformed(format!("{e:#}")))
    }

    /// Like `get_json`, but a 404 is an absent optional document
    async fn get_optional<T: DeserializeOwned>(
        &self,
        url: &str,
    ) -> Result<Option<T>, UpstreamError> {
        match self.get_json(url).await {
            Ok(payload) => Ok(Some(payload)),
            Err(UpstreamError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// A slug that is not a species may still name one of its varieties
    async fn fetch_species(&self, slug: &str) -> Result<RawRecord, UpstreamError> {
        let species: Option<SpeciesPayload> = self
            .get_optional(&self.resource_url(EntityKind::Species.endpoint(), slug))
            .await?;

        match species {
            Some(species) => self.assemble_species(species).await,
            None => self.fetch_form(slug).await,
        }
    }

    async fn assemble_species(&self, species: SpeciesPayload) -> Result<RawRecord, UpstreamError> {
        let pokemon: Option<PokemonPayload> = self
            .get_optional(&self.resource_url(POKEMON_ENDPOINT, species.default_variety()))
            .await?;

        let chain: Option<EvolutionChainPayload> = match &species.evolution_chain {
            Some(chain) => self.get_optional(&chain.url).await?,
            None => None,
        };

        Ok(pokeapi::species_record(
            &species,
            pokemon.as_ref(),
            chain.as_ref(),
            &self.language,
        ))
    }

    async fn fetch_form(&self, slug: &str) -> Result<RawRecord, UpstreamError> {
        let pokemon: PokemonPayload = self
            .get_json(&self.resource_url(POKEMON_ENDPOINT, slug))
            .await?;

        let Some(owner) = &pokemon.species else {
            return Err(UpstreamError::Malformed(format!(
                "pokemon {slug} does not name its species"
            )));
        };
        let species: SpeciesPayload = self
            .get_json(&self.resource_url(EntityKind::Species.endpoint(), &owner.name))
            .await?;

        tracing::debug!(form = %slug, species = %species.name, "Fetched form of species");
        Ok(pokeapi::form_record(&species, &pokemon, &self.language))
    }
}

impl Default for PokeApiClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Upstream for PokeApiClient {
    async fn fetch_record(&self, key: &CanonicalKey) -> Result<RawRecord, UpstreamError> {
        let url = self.resource_url(key.kind().endpoint(), key.slug());
        match key.kind() {
            EntityKind::Species => self.fetch_species(key.slug()).await,
            EntityKind::Move => {
                let payload: MovePayload = self.get_json(&url).await?;
                Ok(pokeapi::move_record(&payload, &self.language))
            }
            EntityKind::Ability => {
                let payload: AbilityPayload = self.get_json(&url).await?;
                Ok(pokeapi::ability_record(&payload, &self.language))
            }
        }
    }
}

/// Map a non-success status to an upstream error
fn status_error(status: StatusCode, retry_after: Option<&HeaderValue>) -> Option<UpstreamError> {
    if status.is_success() {
        return None;
    }

    Some(match status {
        StatusCode::NOT_FOUND => UpstreamError::NotFound,
        StatusCode::TOO_MANY_REQUESTS => UpstreamError::RateLimited {
            retry_after: retry_after.and_then(parse_retry_after),
        },
        StatusCode::REQUEST_TIMEOUT => UpstreamError::Unavailable(format!("HTTP {status}")),
        s if s.is_server_error() => UpstreamError::Unavailable(format!("HTTP {s}")),
        s => UpstreamError::Malformed(format!("unexpected HTTP {s}")),
    })
}

/// Only the delta-seconds form is understood
fn parse_retry_after(value: &HeaderValue) -> Option<Duration> {
    value
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}
