//! Domain types for fetched records

mod pokemon_type;
mod record;

pub use pokemon_type::{TYPE_CHART, Type};
pub use record::{
    AbilityInfo, Attributes, DamageClass, MoveInfo, Record, RecordError, Relation, RelationKind,
    SpeciesInfo,
};
