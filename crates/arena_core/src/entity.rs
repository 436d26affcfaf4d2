//! Combat entities and their storage.
//!
//! An entity bundles a faction, a stat block, a controller and an
//! equipment inventory. It owns the damage protocol: damage is only ever
//! applied through [`Entity::damage`], which routes break and death
//! callbacks to the entity's controller.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::controller::Controller;
use crate::damage::{DamageOutcome, DamageResolver, DeathHandling};
use crate::equipment::Equipment;
use crate::factions::{can_attack, Faction};
use crate::math::{fixed_serde, Fixed, Vec2Fixed};
use crate::physics::Body;
use crate::stats::{Element, StatBlock};

/// Unique identifier for an entity.
pub type EntityId = u64;

/// Where an entity is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LifeState {
    /// Takes damage and acts normally.
    #[default]
    Alive,
    /// Killed, with the controller running its own death sequence.
    ControllerOwned,
    /// Killed; removed at the end of the tick.
    Dead,
}

/// A combatant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Unique identifier, assigned by storage.
    pub id: EntityId,
    /// Team.
    pub faction: Faction,
    /// Health, armor and shields.
    pub stats: StatBlock,
    /// Brain.
    pub controller: Controller,
    /// Weapon inventory.
    pub equipment: Equipment,
    /// World position.
    pub position: Vec2Fixed,
    /// Unit aim direction.
    pub aim: Vec2Fixed,
    /// Unit movement direction for the current tick.
    pub move_dir: Vec2Fixed,
    /// Movement speed in units per second.
    #[serde(with = "fixed_serde")]
    pub speed: Fixed,
    /// Collider radius.
    #[serde(with = "fixed_serde")]
    pub radius: Fixed,
    /// Life state.
    pub life: LifeState,
}

impl Entity {
    /// Create an entity with default components.
    #[must_use]
    pub fn new(id: EntityId) -> Self {
        Self {
            id,
            faction: Faction::None,
            stats: StatBlock::default(),
            controller: Controller::Inert,
            equipment: Equipment::default(),
            position: Vec2Fixed::ZERO,
            aim: Vec2Fixed::RIGHT,
            move_dir: Vec2Fixed::ZERO,
            speed: Fixed::ZERO,
            radius: Fixed::from_num(0.5),
            life: LifeState::Alive,
        }
    }

    /// Whether the entity is alive and targetable.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.life == LifeState::Alive
    }

    /// Whether `attacker` may damage this entity.
    #[must_use]
    pub fn attackable_by(&self, attacker: Faction) -> bool {
        self.is_alive() && can_attack(attacker, self.faction)
    }

    /// Apply damage, notifying the controller of breaks and death.
    ///
    /// Entities that are already dying ignore further damage.
    pub fn damage(&mut self, amount: Fixed, element: Element) -> DamageOutcome {
        if !self.is_alive() {
            tracing::warn!(entity = self.id, life = ?self.life, "Damage applied to a dead entity");
            return DamageOutcome::default();
        }

        let outcome = DamageResolver::damage(&mut self.stats, &mut self.controller, amount, element);
        if let Some(death) = outcome.death {
            self.life = match death {
                DeathHandling::Default => LifeState::Dead,
                DeathHandling::ControllerOwned => LifeState::ControllerOwned,
            };
            tracing::info!(entity = self.id, faction = ?self.faction, handling = ?death, "Entity killed");
        }
        outcome
    }

    /// Muzzle position of the weapon in hand.
    #[must_use]
    pub fn barrel_tip(&self) -> Vec2Fixed {
        let offset = self
            .equipment
            .active_weapon()
            .map_or(Fixed::ZERO, |gun| gun.barrel_offset());
        self.position + self.aim.normalize() * (self.radius + offset)
    }

    /// Physics body, for living entities.
    #[must_use]
    pub fn body(&self) -> Option<Body> {
        self.is_alive().then_some(Body {
            entity: self.id,
            position: self.position,
            radius: self.radius,
        })
    }
}

/// Parameters for spawning a new entity.
#[derive(Debug, Clone, Default)]
pub struct EntitySpawnParams {
    /// Team.
    pub faction: Faction,
    /// Initial position.
    pub position: Vec2Fixed,
    /// Stats; pools start full unless their current value is set.
    pub stats: StatBlock,
    /// Brain.
    pub controller: Controller,
    /// Movement speed.
    pub speed: Fixed,
    /// Collider radius; defaults to 0.5.
    pub radius: Option<Fixed>,
    /// Initial aim direction; defaults to +x.
    pub aim: Option<Vec2Fixed>,
    /// Number of weapon slots; defaults to two.
    pub max_weapons: Option<usize>,
}

/// Storage for all entities in the simulation.
///
/// Uses a `HashMap` for O(1) lookup by ID, with deterministic iteration via
/// sorted keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityStorage {
    entities: HashMap<EntityId, Entity>,
    next_id: EntityId,
}

impl EntityStorage {
    /// Create empty entity storage.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entities: HashMap::new(),
            next_id: 1,
        }
    }

    /// Insert a new entity and return its ID.
    pub fn insert(&mut self, mut entity: Entity) -> EntityId {
        let id = self.next_id.max(1);
        self.next_id = id + 1;
        entity.id = id;
        self.entities.insert(id, entity);
        id
    }

    /// Remove an entity by ID.
    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        self.entities.remove(&id)
    }

    /// Get an entity by ID.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Get a mutable reference to an entity by ID.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// Check if an entity exists.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Get the number of entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Check if storage is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Get sorted entity IDs for deterministic iteration.
    #[must_use]
    pub fn sorted_ids(&self) -> Vec<EntityId> {
        let mut ids: Vec<_> = self.entities.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Iterate over entities in ID order.
    pub fn iter_sorted(&self) -> impl Iterator<Item = &Entity> {
        self.sorted_ids()
            .into_iter()
            .filter_map(move |id| self.entities.get(&id))
    }

    /// Physics bodies of living entities, in ID order.
    #[must_use]
    pub fn bodies(&self) -> Vec<Body> {
        self.iter_sorted().filter_map(Entity::body).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::ShieldController;
    use crate::stats::PoolKind;

    fn soldier(faction: Faction) -> Entity {
        let mut entity = Entity::new(0);
        entity.faction = faction;
        entity.stats = StatBlock::with_health(Fixed::from_num(50));
        entity
    }

    #[test]
    fn test_default_death_marks_dead() {
        let mut entity = soldier(Faction::Enemy);
        let outcome = entity.damage(Fixed::from_num(60), Element::None);
        assert!(outcome.killed);
        assert_eq!(entity.life, LifeState::Dead);
        assert!(entity.body().is_none());
    }

    #[test]
    fn test_dead_entities_ignore_damage() {
        let mut entity = soldier(Faction::Enemy);
        entity.damage(Fixed::from_num(60), Element::None);
        let again = entity.damage(Fixed::from_num(10), Element::None);
        assert!(!again.killed);
        assert_eq!(again.dealt, Fixed::ZERO);
    }

    #[test]
    fn test_controller_owned_death() {
        let mut entity = soldier(Faction::Hazard);
        entity.stats = StatBlock::with_health(Fixed::from_num(10))
            .shields(Fixed::from_num(20))
            .critical(PoolKind::Shields);
        entity.controller = Controller::Shield(ShieldController::default());

        let outcome = entity.damage(Fixed::from_num(25), Element::None);
        assert!(outcome.killed);
        assert_eq!(entity.life, LifeState::ControllerOwned);
        assert_eq!(entity.stats.health.current(), Fixed::from_num(10));
        assert!(!entity.attackable_by(Faction::Player));
    }

    #[test]
    fn test_attackable_by_faction() {
        let entity = soldier(Faction::Enemy);
        assert!(entity.attackable_by(Faction::Player));
        assert!(!entity.attackable_by(Faction::Enemy));
        assert!(entity.attackable_by(Faction::ReflectedEnemy));
    }

    #[test]
    fn test_barrel_tip_without_weapon() {
        let mut entity = soldier(Faction::Player);
        entity.position = Vec2Fixed::from_num(1, 1);
        entity.aim = Vec2Fixed::from_num(0, 2);
        assert_eq!(entity.barrel_tip(), Vec2Fixed::from_num(1, 1.5));
    }

    #[test]
    fn test_storage_ids_are_sequential_and_sorted() {
        let mut storage = EntityStorage::new();
        let a = storage.insert(soldier(Faction::Player));
        let b = storage.insert(soldier(Faction::Enemy));
        let c = storage.insert(soldier(Faction::Enemy));
        assert_eq!((a, b, c), (1, 2, 3));
        storage.remove(b);
        assert_eq!(storage.sorted_ids(), vec![1, 3]);
        assert_eq!(storage.bodies().len(), 2);
        assert_eq!(storage.get(c).map(|e| e.faction), Some(Faction::Enemy));
    }
}
