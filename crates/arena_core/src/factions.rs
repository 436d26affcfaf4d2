//! Faction definitions and attack eligibility.

use serde::{Deserialize, Serialize};

/// Allegiance of an entity or projectile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Faction {
    /// Unaligned; attacks and is attacked by everything else.
    #[default]
    None,
    /// The player character.
    Player,
    /// Friendly to the player.
    Ally,
    /// Hostile entities.
    Enemy,
    /// Enemy fire that has been turned back on its owners.
    ReflectedEnemy,
    /// Environmental damage sources.
    Hazard,
    /// Hazard fire that has been turned back.
    ReflectedHazard,
}

impl Faction {
    /// Whether this faction is on the player's side.
    #[must_use]
    pub const fn is_friendly(self) -> bool {
        matches!(self, Self::Player | Self::Ally)
    }

    /// Faction a projectile takes on after being reflected.
    #[must_use]
    pub const fn reflected(self) -> Self {
        match self {
            Self::None => Self::None,
            Self::Player | Self::Ally => Self::Enemy,
            Self::Enemy => Self::ReflectedEnemy,
            Self::ReflectedEnemy => Self::Enemy,
            Self::Hazard => Self::ReflectedHazard,
            Self::ReflectedHazard => Self::Hazard,
        }
    }

    /// Get the display name for this faction.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Player => "Player",
            Self::Ally => "Ally",
            Self::Enemy => "Enemy",
            Self::ReflectedEnemy => "Reflected Enemy",
            Self::Hazard => "Hazard",
            Self::ReflectedHazard => "Reflected Hazard",
        }
    }
}

/// Whether `attacker` may damage `defender`.
///
/// The player and allies never damage each other. Any other pair can
/// attack exactly when the factions differ.
#[must_use]
pub fn can_attack(attacker: Faction, defender: Faction) -> bool {
    if attacker.is_friendly() && defender.is_friendly() {
        return false;
    }
    attacker != defender
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attack_matrix() {
        assert!(!can_attack(Faction::Player, Faction::Ally));
        assert!(!can_attack(Faction::Ally, Faction::Player));
        assert!(can_attack(Faction::Player, Faction::Enemy));
        assert!(!can_attack(Faction::Enemy, Faction::Enemy));
        assert!(can_attack(Faction::Hazard, Faction::Player));
        assert!(can_attack(Faction::ReflectedEnemy, Faction::Enemy));
        assert!(!can_attack(Faction::Player, Faction::Player));
    }

    #[test]
    fn test_reflection_round_trip() {
        for faction in [
            Faction::Enemy,
            Faction::ReflectedEnemy,
            Faction::Hazard,
            Faction::ReflectedHazard,
        ] {
            assert_eq!(faction.reflected().reflected(), faction);
        }
        assert_eq!(Faction::Player.reflected(), Faction::Enemy);
        assert_eq!(Faction::None.reflected(), Faction::None);
    }

    #[test]
    fn test_reflected_enemy_fire_hurts_enemies() {
        let reflected = Faction::Enemy.reflected();
        assert!(can_attack(reflected, Faction::Enemy));
        assert!(can_attack(reflected, Faction::Player));
    }
}
