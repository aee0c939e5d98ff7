//! Look up Pokemon data from the command line.
//!
//! ```text
//! cargo run --example lookup -- pikchu "galarian ponyta" pichu:evolves_to
//! ```
//!
//! `CELEBI_CONFIG` may point at a JSON configuration file.

use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use celebi_client::PokeApiClient;
use celebi_dex::{Attributes, EntityKind, Record, RelationKind, format};
use celebi_service::{Config, QueryResult, RelationQuery};
use tokio_util::sync::CancellationToken;

fn load_config() -> Result<Config> {
    match std::env::var("CELEBI_CONFIG") {
        Ok(path) => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {path}"))?;
            Ok(Config::from_json(&json)?)
        }
        Err(_) => Ok(Config::default()),
    }
}

/// `text` or `text:relation_kind`
fn parse_arg(arg: &str) -> Result<(&str, Option<RelationQuery>)> {
    match arg.rsplit_once(':') {
        Some((text, kind)) => {
            let kind: RelationKind = kind
                .parse()
                .map_err(|k| anyhow!("Unknown relation kind: {k}"))?;
            Ok((text, Some(kind.into())))
        }
        None => Ok((arg, None)),
    }
}

fn print_record(record: &Record) -> Result<()> {
    println!("#{} {}", record.id, format::display_name(&record.name, false));

    match &record.attributes {
        Attributes::Species(info) => {
            if let Some(genus) = &info.genus {
                println!("  {genus}");
            }
            let types: Vec<_> = info.types.iter().map(|t| t.as_str()).collect();
            println!("  Type: {}", types.join("/"));
            if let Some(h) = info.height_m {
                println!("  Height: {}", format::height(h)?);
            }
            if let Some(w) = info.weight_kg {
                println!("  Weight: {}", format::weight(w)?);
            }
            if let Some(text) = info.flavor_text.first() {
                println!("  {}", format::sanitize_flavor_text(text));
            }
            println!("  Weak to: {:?}", info.weaknesses());
        }
        Attributes::Move(info) => {
            println!(
                "  Power: {:?}  Accuracy: {:?}  PP: {:?}",
                info.power, info.accuracy, info.pp
            );
            if let Some(effect) = &info.effect {
                println!("  {effect}");
            }
        }
        Attributes::Ability(info) => {
            if let Some(effect) = &info.effect {
                println!("  {effect}");
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let config = load_config()?;
    let upstream = PokeApiClient::new();

    println!("Building name index...");
    let index = upstream.name_index(&EntityKind::ALL).await?;
    println!("Indexed {} names", index.len());

    let service = celebi_service::build(&config, index, Arc::new(upstream))?;
    let cancel = CancellationToken::new();
    let sweeper = service.cache().spawn_sweeper(cancel.clone());

    for arg in std::env::args().skip(1) {
        let (text, relation) = parse_arg(&arg)?;
        println!("\n=== {text} ===");

        match service.answer(text, relation).await {
            QueryResult::Resolved { record, relations } => {
                print_record(&record)?;
                if let Some(keys) = relations {
                    let keys: Vec<_> = keys.iter().map(|k| k.to_string()).collect();
                    println!("  Related: {}", keys.join(", "));
                }
            }
            QueryResult::AmbiguousInput { candidates } => {
                println!("Did you mean:");
                for c in candidates {
                    println!("  {} ({:.0})", c.name, c.score);
                }
            }
            QueryResult::NotFound => println!("No match"),
            QueryResult::Unavailable { reason } => println!("Unavailable: {reason:?}"),
        }
    }

    println!("\nCache: {:?}", service.cache().stats());

    cancel.cancel();
    sweeper.await?;
    Ok(())
}
