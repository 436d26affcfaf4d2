//! Weapon slots held by an entity.

use serde::{Deserialize, Serialize};

use crate::data::WeaponCatalog;
use crate::error::{GameError, Result};
use crate::factions::Faction;
use crate::math::Fixed;
use crate::weapon::{Gun, GunContext, Weapon};

/// Default number of weapon slots.
pub const DEFAULT_MAX_WEAPONS: usize = 2;

/// Weapon inventory with one active slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Equipment {
    weapons: Vec<Gun>,
    max_weapons: usize,
    active: Option<usize>,
}

impl Default for Equipment {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_WEAPONS)
    }
}

impl Equipment {
    /// Empty inventory with `max_weapons` slots.
    #[must_use]
    pub fn new(max_weapons: usize) -> Self {
        Self {
            weapons: Vec::new(),
            max_weapons: max_weapons.max(1),
            active: None,
        }
    }

    /// Held weapons in slot order.
    #[must_use]
    pub fn weapons(&self) -> &[Gun] {
        &self.weapons
    }

    /// Slot capacity.
    #[must_use]
    pub const fn max_weapons(&self) -> usize {
        self.max_weapons
    }

    /// Index of the active slot.
    #[must_use]
    pub const fn active_index(&self) -> Option<usize> {
        self.active
    }

    /// Whether a weapon is in hand.
    #[must_use]
    pub fn is_holding_weapon(&self) -> bool {
        self.active_weapon().is_some()
    }

    /// The weapon in hand.
    #[must_use]
    pub fn active_weapon(&self) -> Option<&Gun> {
        self.active.and_then(|i| self.weapons.get(i))
    }

    /// The weapon in hand, mutably.
    pub fn active_weapon_mut(&mut self) -> Option<&mut Gun> {
        self.active.and_then(|i| self.weapons.get_mut(i))
    }

    /// Whether a weapon with `id` is held.
    #[must_use]
    pub fn has_weapon(&self, id: &str) -> bool {
        self.weapons.iter().any(|w| w.id() == id)
    }

    /// Take the weapon `id` from `catalog`.
    ///
    /// Returns `Ok(false)` when it is already held. With every slot full the
    /// active weapon is dropped and replaced.
    pub fn pickup_weapon(
        &mut self,
        catalog: &WeaponCatalog,
        id: &str,
        faction: Faction,
        now: Fixed,
    ) -> Result<bool> {
        let config = catalog
            .get(id)
            .ok_or_else(|| GameError::UnknownWeapon(id.to_string()))?;
        if self.has_weapon(id) {
            return Ok(false);
        }

        let mut gun = Gun::new(config.clone());
        gun.validate();
        gun.initialize(faction);

        match self.active {
            Some(slot) if self.weapons.len() >= self.max_weapons => {
                if let Some(old) = self.weapons.get_mut(slot) {
                    old.put_away();
                    tracing::debug!(dropped = %old.id(), picked = %id, "Weapon replaced");
                    *old = gun;
                    old.equip(now);
                }
            }
            _ => {
                self.weapons.push(gun);
                if self.active.is_none() {
                    self.equip_weapon(self.weapons.len() - 1, now);
                }
            }
        }
        Ok(true)
    }

    /// Switch to slot `index`. Returns `false` if the slot is empty or
    /// already active.
    pub fn equip_weapon(&mut self, index: usize, now: Fixed) -> bool {
        if index >= self.weapons.len() || self.active == Some(index) {
            return false;
        }
        if let Some(current) = self.active_weapon_mut() {
            current.put_away();
        }
        self.active = Some(index);
        self.weapons[index].equip(now);
        true
    }

    /// Switch to the next slot, wrapping around.
    pub fn equip_next(&mut self, now: Fixed) -> bool {
        let len = self.weapons.len();
        match self.active {
            Some(i) if len > 1 => self.equip_weapon((i + 1) % len, now),
            None if len > 0 => self.equip_weapon(0, now),
            _ => false,
        }
    }

    /// Switch to the previous slot, wrapping around.
    pub fn equip_previous(&mut self, now: Fixed) -> bool {
        let len = self.weapons.len();
        match self.active {
            Some(i) if len > 1 => self.equip_weapon((i + len - 1) % len, now),
            None if len > 0 => self.equip_weapon(len - 1, now),
            _ => false,
        }
    }

    /// Forward the primary action to the weapon in hand.
    pub fn trigger_action1(&mut self, pressed: bool, ctx: &mut GunContext<'_>) {
        if let Some(gun) = self.active_weapon_mut() {
            gun.action1(pressed, ctx);
        }
    }

    /// Forward the secondary action to the weapon in hand.
    pub fn trigger_action2(&mut self, pressed: bool, ctx: &mut GunContext<'_>) {
        if let Some(gun) = self.active_weapon_mut() {
            gun.action2(pressed, ctx);
        }
    }

    /// Advance the weapon in hand. Stowed weapons are frozen.
    pub fn update(&mut self, ctx: &mut GunContext<'_>) {
        if let Some(gun) = self.active_weapon_mut() {
            gun.update(ctx);
        }
    }

    /// Cancel every action of the weapon in hand.
    pub fn interrupt(&mut self) {
        if let Some(gun) = self.active_weapon_mut() {
            gun.interrupt_actions();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{GunStats, WeaponConfig};
    use crate::magazine::SimpleMag;
    use crate::projectile::ProjectileSpec;
    use crate::weapon::GunState;

    fn catalog() -> WeaponCatalog {
        let make = |id: &str| {
            WeaponConfig::new(id, GunStats::default(), SimpleMag::new(ProjectileSpec::default(), 8))
        };
        WeaponCatalog::from(vec![make("pistol"), make("rifle"), make("shotgun")])
    }

    #[test]
    fn test_first_pickup_equips() {
        let mut eq = Equipment::new(2);
        assert!(!eq.is_holding_weapon());
        assert!(eq.pickup_weapon(&catalog(), "pistol", Faction::Player, Fixed::ZERO).unwrap());
        assert_eq!(eq.active_index(), Some(0));
        let gun = eq.active_weapon().unwrap();
        assert_eq!(gun.state(), GunState::Switching);
        assert_eq!(gun.ammo(), (8, 8));
    }

    #[test]
    fn test_pickup_rejects_unknown_and_duplicate() {
        let mut eq = Equipment::new(2);
        let cat = catalog();
        assert!(matches!(
            eq.pickup_weapon(&cat, "railgun", Faction::Player, Fixed::ZERO),
            Err(GameError::UnknownWeapon(_))
        ));
        assert!(eq.pickup_weapon(&cat, "pistol", Faction::Player, Fixed::ZERO).unwrap());
        assert!(!eq.pickup_weapon(&cat, "pistol", Faction::Player, Fixed::ZERO).unwrap());
        assert_eq!(eq.weapons().len(), 1);
    }

    #[test]
    fn test_full_inventory_replaces_active() {
        let mut eq = Equipment::new(2);
        let cat = catalog();
        eq.pickup_weapon(&cat, "pistol", Faction::Player, Fixed::ZERO).unwrap();
        eq.pickup_weapon(&cat, "rifle", Faction::Player, Fixed::ZERO).unwrap();
        assert_eq!(eq.active_index(), Some(0));

        eq.pickup_weapon(&cat, "shotgun", Faction::Player, Fixed::ZERO).unwrap();
        let ids: Vec<&str> = eq.weapons().iter().map(Gun::id).collect();
        assert_eq!(ids, vec!["shotgun", "rifle"]);
        assert!(eq.weapons()[0].is_active());
    }

    #[test]
    fn test_cycle_wraps() {
        let mut eq = Equipment::new(3);
        let cat = catalog();
        for id in ["pistol", "rifle", "shotgun"] {
            eq.pickup_weapon(&cat, id, Faction::Player, Fixed::ZERO).unwrap();
        }
        assert!(eq.equip_previous(Fixed::ONE));
        assert_eq!(eq.active_index(), Some(2));
        assert!(eq.equip_next(Fixed::ONE));
        assert_eq!(eq.active_index(), Some(0));
        assert!(!eq.weapons()[2].is_active());
        assert!(!eq.equip_weapon(0, Fixed::ONE));
        assert!(!eq.equip_weapon(7, Fixed::ONE));
    }
}
