//! Defensive type matchups

use crate::types::Type;

fn attacking_types_where(defender_types: &[Type], pred: impl Fn(f32) -> bool) -> Vec<Type> {
    if defender_types.is_empty() {
        return Vec::new();
    }
    Type::all()
        .iter()
        .copied()
        .filter(|t| pred(t.effectiveness_multi(defender_types)))
        .collect()
}

/// Attacking types that deal more than neutral damage
pub fn weaknesses(defender_types: &[Type]) -> Vec<Type> {
    attacking_types_where(defender_types, |eff| eff > 1.0)
}

/// Attacking types that deal reduced, but not zero, damage
pub fn resistances(defender_types: &[Type]) -> Vec<Type> {
    attacking_types_where(defender_types, |eff| eff > 0.0 && eff < 1.0)
}

/// Attacking types that deal no damage
pub fn immunities(defender_types: &[Type]) -> Vec<Type> {
    attacking_types_where(defender_types, |eff| eff == 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weaknesses_single_type() {
        let weak = weaknesses(&[Type::Steel]);
        assert_eq!(weak, vec![Type::Fire, Type::Fighting, Type::Ground]);
    }

    #[test]
    fn test_weaknesses_dual_type() {
        // Swampert is only weak to Grass
        assert_eq!(weaknesses(&[Type::Water, Type::Ground]), vec![Type::Grass]);
    }

    #[test]
    fn test_resistances_exclude_immunities() {
        let resists = resistances(&[Type::Ghost]);
        assert!(resists.contains(&Type::Poison));
        assert!(resists.contains(&Type::Bug));
        assert!(!resists.contains(&Type::Normal));
    }

    #[test]
    fn test_immunities() {
        assert_eq!(immunities(&[Type::Ghost]), vec![Type::Normal, Type::Fighting]);
        assert_eq!(immunities(&[Type::Electric]), Vec::<Type>::new());
    }

    #[test]
    fn test_unknown_types_have_no_matchups() {
        assert!(weaknesses(&[]).is_empty());
        assert!(immunities(&[]).is_empty());
    }
}
