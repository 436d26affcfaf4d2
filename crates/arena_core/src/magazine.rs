//! Ammunition handling.

use serde::{Deserialize, Serialize};

use crate::factions::Faction;
use crate::projectile::ProjectileSpec;

/// Ammo pool that hands out projectile specs.
///
/// Current ammo always stays within `[0, max]`.
pub trait Magazine {
    /// Stamp the owner's faction onto the bullets and fill the magazine.
    fn initialize(&mut self, faction: Faction);

    /// Whether at least one round is loaded.
    fn can_fire(&self) -> bool;

    /// Number of pellets fired per trigger pull.
    fn bullets_per_shot(&self) -> u32;

    /// Next bullet to fire; `consume` takes a round. `None` when empty.
    fn next_bullet(&mut self, consume: bool) -> Option<ProjectileSpec>;

    /// Every bullet this magazine can produce.
    fn all_bullets(&self) -> Vec<&ProjectileSpec>;

    /// `(current, max)` ammo.
    fn ammo(&self) -> (u32, u32);

    /// Refill completely. Returns `false` if already full.
    fn reload(&mut self) -> bool;

    /// Add up to `rounds`. Returns `false` if already full.
    fn reload_by(&mut self, rounds: u32) -> bool;
}

/// Magazine with a single bullet type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimpleMag {
    /// Bullet prototype.
    pub bullet: ProjectileSpec,
    /// Pellets per trigger pull.
    pub bullets_per_shot: u32,
    /// Capacity.
    pub mag_size: u32,
    /// Loaded rounds.
    pub current: u32,
}

impl Default for SimpleMag {
    fn default() -> Self {
        Self {
            bullet: ProjectileSpec::default(),
            bullets_per_shot: 1,
            mag_size: 30,
            current: 0,
        }
    }
}

impl SimpleMag {
    /// Empty magazine of `mag_size` rounds of `bullet`.
    #[must_use]
    pub fn new(bullet: ProjectileSpec, mag_size: u32) -> Self {
        Self {
            bullet,
            mag_size,
            ..Self::default()
        }
    }

    /// Builder: pellets per shot.
    #[must_use]
    pub fn with_bullets_per_shot(mut self, bullets_per_shot: u32) -> Self {
        self.bullets_per_shot = bullets_per_shot;
        self
    }
}

impl Magazine for SimpleMag {
    fn initialize(&mut self, faction: Faction) {
        self.bullet.stats.faction = faction;
        self.current = self.mag_size;
    }

    fn can_fire(&self) -> bool {
        self.current > 0
    }

    fn bullets_per_shot(&self) -> u32 {
        self.bullets_per_shot
    }

    fn next_bullet(&mut self, consume: bool) -> Option<ProjectileSpec> {
        if self.current == 0 {
            return None;
        }
        if consume {
            self.current -= 1;
        }
        Some(self.bullet.clone())
    }

    fn all_bullets(&self) -> Vec<&ProjectileSpec> {
        vec![&self.bullet]
    }

    fn ammo(&self) -> (u32, u32) {
        (self.current, self.mag_size)
    }

    fn reload(&mut self) -> bool {
        if self.current >= self.mag_size {
            return false;
        }
        self.current = self.mag_size;
        true
    }

    fn reload_by(&mut self, rounds: u32) -> bool {
        if self.current >= self.mag_size {
            return false;
        }
        self.current = self.current.saturating_add(rounds).min(self.mag_size);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mag(size: u32) -> SimpleMag {
        let mut mag = SimpleMag::new(ProjectileSpec::default(), size);
        mag.initialize(Faction::Player);
        mag
    }

    #[test]
    fn test_initialize_stamps_faction_and_fills() {
        let mag = mag(5);
        assert_eq!(mag.ammo(), (5, 5));
        assert_eq!(mag.bullet.stats.faction, Faction::Player);
        assert!(mag.can_fire());
    }

    #[test]
    fn test_next_bullet_never_underflows() {
        let mut mag = mag(1);
        assert!(mag.next_bullet(false).is_some());
        assert_eq!(mag.ammo().0, 1);
        assert!(mag.next_bullet(true).is_some());
        assert_eq!(mag.ammo().0, 0);
        assert!(mag.next_bullet(true).is_none());
        assert_eq!(mag.ammo().0, 0);
        assert!(!mag.can_fire());
    }

    #[test]
    fn test_reload_when_full_fails() {
        let mut mag = mag(3);
        assert!(!mag.reload());
        assert!(!mag.reload_by(1));
    }

    #[test]
    fn test_partial_reload_clamps() {
        let mut mag = mag(4);
        for _ in 0..3 {
            mag.next_bullet(true);
        }
        assert!(mag.reload_by(2));
        assert_eq!(mag.ammo(), (3, 4));
        assert!(mag.reload_by(10));
        assert_eq!(mag.ammo(), (4, 4));
    }

    #[test]
    fn test_full_reload() {
        let mut mag = mag(4);
        mag.next_bullet(true);
        assert!(mag.reload());
        assert_eq!(mag.ammo(), (4, 4));
    }

    #[test]
    fn test_all_bullets() {
        let mag = mag(2);
        assert_eq!(mag.all_bullets().len(), 1);
    }
}
