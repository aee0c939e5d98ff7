//! User-facing text helpers for records
//!
//! Measurements are formatted the way Bulbapedia shows them, imperial first.

use thiserror::Error;

const INCHES_PER_METER: f64 = 1000.0 / 25.4;
const INCHES_PER_FOOT: i64 = 12;
const POUNDS_PER_KILOGRAM: f64 = 1.0 / 0.453_592_37;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormatError {
    #[error("{what} must be positive, got {value}")]
    NonPositive { what: &'static str, value: f64 },
}

/// Display name with gender symbols spelled out and an optional shiny marker
pub fn display_name(name: &str, shiny: bool) -> String {
    let name = name.replace('♂', " M").replace('♀', " F");
    if shiny {
        format!("{name} (Shiny)")
    } else {
        name
    }
}

/// `5'03" (1.6 m)`
pub fn height(meters: f64) -> Result<String, FormatError> {
    if !(meters > 0.0) {
        return Err(FormatError::NonPositive {
            what: "Height",
            value: meters,
        });
    }

    let total_inches = (meters * INCHES_PER_METER).round_ties_even() as i64;
    let feet = total_inches / INCHES_PER_FOOT;
    let inches = total_inches % INCHES_PER_FOOT;

    Ok(format!("{feet}'{inches:02}\" ({meters:.1} m)"))
}

/// `13.2 lbs. (6.0 kg)`, or `lb.` for exactly one pound
pub fn weight(kilograms: f64) -> Result<String, FormatError> {
    if !(kilograms > 0.0) {
        return Err(FormatError::NonPositive {
            what: "Weight",
            value: kilograms,
        });
    }

    // Round first so that 0.9999 pounds prints as "1.0 lb."
    let pounds = (kilograms * POUNDS_PER_KILOGRAM * 10.0).round_ties_even() / 10.0;
    let unit = if pounds == 1.0 { "lb" } else { "lbs" };

    Ok(format!("{pounds:.1} {unit}. ({kilograms:.1} kg)"))
}

/// Clean up pokedex flavor text, which still carries the line breaks and
/// soft hyphens of the in-game text boxes
pub fn sanitize_flavor_text(text: &str) -> String {
    // Order matters
    text.replace("-\n", "-")
        .replace("\u{ad}\u{c}", "")
        .replace("\u{ad}\n", "")
        .replace('\n', " ")
        .replace('\u{c}', " ")
        .replace("--", "\u{2014}")
        .replace('\u{2019}', "'")
}
