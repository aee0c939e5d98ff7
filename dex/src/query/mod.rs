//! Type matchup queries for resolved species

mod matchup;

pub use matchup::{immunities, resistances, weaknesses};
