//! Core simulation loop.
//!
//! The simulation runs at a fixed tick rate and owns every piece of combat
//! state: entities, the physics world, live projectiles, the weapon catalog
//! and the random stream.
//!
//! # Determinism
//!
//! All operations in this module are fully deterministic:
//! - No floating-point math (uses fixed-point via [`Fixed`])
//! - One seeded random stream ([`SimRng`])
//! - Consistent iteration order (sorted entity IDs, oldest projectile first)
//! - Timers are deadlines compared against the tick clock
//!
//! # Example
//!
//! ```
//! use arena_core::controller::{Controller, Intent, PlayerController};
//! use arena_core::data::{GunStats, WeaponCatalog, WeaponConfig};
//! use arena_core::entity::EntitySpawnParams;
//! use arena_core::factions::Faction;
//! use arena_core::magazine::SimpleMag;
//! use arena_core::math::{Fixed, Vec2Fixed};
//! use arena_core::projectile::ProjectileSpec;
//! use arena_core::simulation::Simulation;
//! use arena_core::stats::StatBlock;
//!
//! let catalog = WeaponCatalog::from(vec![WeaponConfig::new(
//!     "pistol",
//!     GunStats::default(),
//!     SimpleMag::new(ProjectileSpec::default(), 12),
//! )]);
//! let mut sim = Simulation::new(catalog, 42);
//!
//! let player = sim.spawn_entity(EntitySpawnParams {
//!     faction: Faction::Player,
//!     stats: StatBlock::with_health(Fixed::from_num(100)),
//!     controller: Controller::Player(PlayerController::default()),
//!     ..Default::default()
//! });
//! sim.pickup_weapon(player, "pistol").unwrap();
//! sim.set_intent(player, Intent { action1: true, ..Intent::default() }).unwrap();
//!
//! for _ in 0..50 {
//!     sim.tick();
//! }
//! assert_eq!(sim.get_tick(), 50);
//! ```

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::controller::{
    Controller, ControllerView, DummyController, EntityController, EquipRequest, Intent,
    PlayerController, ShieldController,
};
use crate::data::{ControllerData, ScenarioData, WeaponCatalog};
use crate::entity::{Entity, EntityId, EntitySpawnParams, EntityStorage, LifeState};
use crate::equipment::Equipment;
use crate::error::{GameError, Result};
use crate::math::{Fixed, Vec2Fixed};
use crate::physics::{ArenaPhysics, Wall};
use crate::pool::PoolHandle;
use crate::projectile::{Projectile, ReflectionType};
use crate::rng::SimRng;
use crate::simulator::{CombatEvent, ProjectileSimulator, StepContext};
use crate::weapon::{GunContext, ShotRequest};

/// Ticks per second for the simulation.
pub const TICK_RATE: u32 = 50;

/// Length of one tick in seconds.
#[must_use]
pub fn tick_delta() -> Fixed {
    Fixed::ONE / Fixed::from_num(TICK_RATE)
}

/// Events generated during a simulation tick.
///
/// These events can be used by a presentation layer to trigger effects,
/// sounds, animations, etc.
#[derive(Debug, Clone, Default)]
pub struct TickEvents {
    /// Projectile lifecycle and damage events, in the order they happened.
    pub combat: Vec<CombatEvent>,
    /// Entities killed this tick.
    pub deaths: Vec<EntityId>,
    /// Entities removed from the simulation this tick.
    pub despawned: Vec<EntityId>,
    /// Projectiles fired this tick.
    pub shots_fired: usize,
}

/// The combat simulation.
///
/// # System Execution Order
///
/// Each tick, systems run in this order:
/// 1. **Physics sync** - Living entities become collision bodies
/// 2. **Controllers** - Each living entity's controller produces an intent
/// 3. **Intents** - Aim, movement, weapon switching, triggers and weapon timers
/// 4. **Spawning** - Requested shots enter the projectile pool
/// 5. **Projectiles** - Sweep, collide and resolve damage
/// 6. **Despawn** - Dead entities and finished controller-owned deaths leave
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Simulation {
    /// Current simulation tick.
    tick: u64,
    /// All entities in the simulation.
    entities: EntityStorage,
    /// Map geometry and entity bodies.
    physics: ArenaPhysics,
    /// Live projectiles.
    projectiles: ProjectileSimulator,
    /// Weapons that can be picked up.
    catalog: WeaponCatalog,
    /// Random stream.
    rng: SimRng,
}

impl Simulation {
    /// Create an empty simulation.
    #[must_use]
    pub fn new(catalog: WeaponCatalog, seed: u64) -> Self {
        Self {
            tick: 0,
            entities: EntityStorage::new(),
            physics: ArenaPhysics::default(),
            projectiles: ProjectileSimulator::default(),
            catalog,
            rng: SimRng::new(seed),
        }
    }

    /// Build a simulation from a scenario.
    ///
    /// Entities spawn in list order, pick up their weapons and have their
    /// dummy targets resolved to entity IDs.
    ///
    /// # Errors
    ///
    /// Returns an error if the scenario references unknown entities or
    /// weapons.
    pub fn from_scenario(scenario: &ScenarioData, catalog: WeaponCatalog) -> Result<Self> {
        let errors = scenario.validate();
        if !errors.is_empty() {
            return Err(GameError::InvalidState(format!(
                "Scenario '{}' is invalid: {}",
                scenario.name,
                errors.join("; ")
            )));
        }

        let mut sim = Self::new(catalog, scenario.seed);

        let mut walls: Vec<Wall> = scenario
            .arena
            .room
            .map(|room| ArenaPhysics::room(room.min, room.max).walls().to_vec())
            .unwrap_or_default();
        walls.extend(scenario.arena.walls.iter().map(|w| Wall::new(w.start, w.end)));
        sim.physics = ArenaPhysics::new(walls);

        let mut ids = Vec::with_capacity(scenario.entities.len());
        for data in &scenario.entities {
            let controller = match data.controller {
                ControllerData::Inert => Controller::Inert,
                ControllerData::Player => Controller::Player(PlayerController::default()),
                ControllerData::Dummy {
                    hold_trigger,
                    move_in_circles,
                    ..
                } => Controller::Dummy(DummyController {
                    hold_trigger,
                    move_in_circles,
                    target: None,
                }),
                ControllerData::Shield { duration } => Controller::Shield(
                    duration.map_or_else(ShieldController::default, ShieldController::with_duration),
                ),
            };
            ids.push(sim.spawn_entity(EntitySpawnParams {
                faction: data.faction,
                position: data.position,
                stats: data.stats,
                controller,
                speed: data.speed,
                radius: data.radius,
                aim: None,
                max_weapons: data.max_weapons,
            }));
        }

        for (data, &id) in scenario.entities.iter().zip(&ids) {
            if let ControllerData::Dummy {
                target: Some(index),
                ..
            } = data.controller
            {
                if let Some(Controller::Dummy(dummy)) =
                    sim.entities.get_mut(id).map(|e| &mut e.controller)
                {
                    dummy.target = ids.get(index).copied();
                }
            }
            for weapon in &data.weapons {
                sim.pickup_weapon(id, weapon)?;
            }
        }

        tracing::info!(
            scenario = %scenario.name,
            entities = ids.len(),
            seed = scenario.seed,
            "Scenario loaded"
        );
        Ok(sim)
    }

    /// Get the current tick number.
    #[must_use]
    pub const fn get_tick(&self) -> u64 {
        self.tick
    }

    /// Simulation clock in seconds.
    #[must_use]
    pub fn time(&self) -> Fixed {
        Fixed::from_num(self.tick) / Fixed::from_num(TICK_RATE)
    }

    /// Seed of the random stream.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.rng.seed()
    }

    /// Get a reference to the entity storage.
    #[must_use]
    pub fn entities(&self) -> &EntityStorage {
        &self.entities
    }

    /// Get an entity by ID.
    #[must_use]
    pub fn get_entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    /// Map geometry.
    #[must_use]
    pub const fn physics(&self) -> &ArenaPhysics {
        &self.physics
    }

    /// Replace the map geometry.
    pub fn set_walls(&mut self, walls: Vec<Wall>) {
        self.physics = ArenaPhysics::new(walls);
    }

    /// Weapon catalog.
    #[must_use]
    pub const fn catalog(&self) -> &WeaponCatalog {
        &self.catalog
    }

    /// Live projectiles.
    #[must_use]
    pub const fn projectiles(&self) -> &ProjectileSimulator {
        &self.projectiles
    }

    /// Spawn a new entity.
    pub fn spawn_entity(&mut self, params: EntitySpawnParams) -> EntityId {
        let mut entity = Entity::new(0);
        entity.faction = params.faction;
        entity.position = params.position;
        entity.stats = params.stats;
        entity.controller = params.controller;
        entity.speed = params.speed;
        if let Some(radius) = params.radius {
            entity.radius = radius;
        }
        if let Some(aim) = params.aim.filter(|aim| !aim.is_zero()) {
            entity.aim = aim.normalize();
        }
        if let Some(slots) = params.max_weapons {
            entity.equipment = Equipment::new(slots);
        }

        let id = self.entities.insert(entity);
        tracing::debug!(entity = id, faction = ?params.faction, "Entity spawned");
        id
    }

    /// Remove an entity immediately.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity does not exist.
    pub fn despawn_entity(&mut self, id: EntityId) -> Result<()> {
        self.entities
            .remove(id)
            .map(|_| ())
            .ok_or(GameError::EntityNotFound(id))
    }

    /// Give an entity a weapon from the catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity or weapon does not exist.
    pub fn pickup_weapon(&mut self, id: EntityId, weapon: &str) -> Result<bool> {
        let now = self.time();
        let entity = self
            .entities
            .get_mut(id)
            .ok_or(GameError::EntityNotFound(id))?;
        entity
            .equipment
            .pickup_weapon(&self.catalog, weapon, entity.faction, now)
    }

    /// Set the intent of a player-controlled entity.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity does not exist or is not driven by a
    /// [`PlayerController`].
    pub fn set_intent(&mut self, id: EntityId, intent: Intent) -> Result<()> {
        let entity = self
            .entities
            .get_mut(id)
            .ok_or(GameError::EntityNotFound(id))?;
        let player = entity.controller.as_player_mut().ok_or_else(|| {
            GameError::InvalidState(format!("Entity {id} is not player controlled"))
        })?;
        player.set_intent(intent);
        Ok(())
    }

    /// Fire a projectile directly, bypassing weapons.
    pub fn spawn_projectile(&mut self, shot: ShotRequest) -> (PoolHandle, Vec<CombatEvent>) {
        let mut events = Vec::new();
        let now = self.time();
        let mut ctx = StepContext {
            physics: &self.physics,
            entities: &mut self.entities,
            rng: &mut self.rng,
            now,
            events: &mut events,
        };
        let handle = self.projectiles.spawn(shot, &mut ctx);
        (handle, events)
    }

    /// Borrow a live projectile.
    #[must_use]
    pub fn get_projectile(&self, handle: PoolHandle) -> Option<&Projectile> {
        self.projectiles.get(handle)
    }

    /// Reflect a live projectile. Returns `false` for stale handles.
    pub fn reflect_projectile(&mut self, handle: PoolHandle, kind: ReflectionType) -> bool {
        let mut events = Vec::new();
        let now = self.time();
        let mut ctx = StepContext {
            physics: &self.physics,
            entities: &mut self.entities,
            rng: &mut self.rng,
            now,
            events: &mut events,
        };
        self.projectiles.reflect(handle, kind, &mut ctx)
    }

    /// Reflect a live projectile toward `target`.
    pub fn reflect_projectile_towards(&mut self, handle: PoolHandle, target: Vec2Fixed) -> bool {
        let mut events = Vec::new();
        let now = self.time();
        let mut ctx = StepContext {
            physics: &self.physics,
            entities: &mut self.entities,
            rng: &mut self.rng,
            now,
            events: &mut events,
        };
        self.projectiles.reflect_towards(handle, target, &mut ctx)
    }

    /// Advance the simulation by one tick.
    ///
    /// Runs all systems in deterministic order and increments the tick
    /// counter. Returns events generated during this tick.
    pub fn tick(&mut self) -> TickEvents {
        let mut events = TickEvents::default();
        let now = self.time();
        let delta = tick_delta();

        // 1. Physics sync
        self.physics.sync_bodies(self.entities.bodies());

        // 2. Controllers
        let intents = self.run_controllers(now);

        // 3. Intents, weapons
        let shots = self.apply_intents(&intents, now, delta);

        // 4. Spawning
        events.shots_fired = shots.len();
        let mut ctx = StepContext {
            physics: &self.physics,
            entities: &mut self.entities,
            rng: &mut self.rng,
            now,
            events: &mut events.combat,
        };
        for shot in shots {
            self.projectiles.spawn(shot, &mut ctx);
        }

        // 5. Projectiles
        self.projectiles.step(delta, &mut ctx);

        events.deaths = events
            .combat
            .iter()
            .filter_map(|event| match event {
                CombatEvent::Damaged {
                    target,
                    killed: true,
                    ..
                } => Some(*target),
                _ => None,
            })
            .collect();

        // 6. Despawn
        events.despawned = self.run_despawn(now);

        #[cfg(feature = "debug-validation")]
        self.check_invariants();

        self.tick += 1;
        tracing::debug!(tick = self.tick, hash = self.state_hash(), "Tick complete");
        events
    }

    fn run_controllers(&mut self, now: Fixed) -> Vec<(EntityId, Intent)> {
        let mut intents = Vec::new();
        for id in self.entities.sorted_ids() {
            let target_position = self
                .entities
                .get(id)
                .and_then(|e| e.controller.target())
                .and_then(|target| self.entities.get(target))
                .filter(|target| target.is_alive())
                .map(|target| target.position);

            let Some(entity) = self.entities.get_mut(id) else {
                continue;
            };
            if !entity.is_alive() {
                continue;
            }
            let view = ControllerView {
                now,
                position: entity.position,
                target_position,
            };
            intents.push((id, entity.controller.think(&view)));
        }
        intents
    }

    fn apply_intents(
        &mut self,
        intents: &[(EntityId, Intent)],
        now: Fixed,
        delta: Fixed,
    ) -> Vec<ShotRequest> {
        let mut shots = Vec::new();
        for &(id, intent) in intents {
            let Some(entity) = self.entities.get_mut(id) else {
                continue;
            };

            if let Some(aim) = intent.aim.filter(|aim| !aim.is_zero()) {
                entity.aim = aim.normalize();
            }
            entity.move_dir = intent.movement.normalize();
            entity.position += entity.move_dir * (entity.speed * delta);

            match intent.equip {
                Some(EquipRequest::Slot(slot)) => {
                    entity.equipment.equip_weapon(slot, now);
                }
                Some(EquipRequest::Next) => {
                    entity.equipment.equip_next(now);
                }
                Some(EquipRequest::Previous) => {
                    entity.equipment.equip_previous(now);
                }
                None => {}
            }

            let mut ctx = GunContext {
                now,
                barrel: entity.barrel_tip(),
                aim: entity.aim,
                source: Some(id),
                physics: &self.physics,
                rng: &mut self.rng,
                shots: &mut shots,
            };
            entity.equipment.trigger_action1(intent.action1, &mut ctx);
            entity.equipment.trigger_action2(intent.action2, &mut ctx);
            entity.equipment.update(&mut ctx);
        }
        shots
    }

    fn run_despawn(&mut self, now: Fixed) -> Vec<EntityId> {
        let mut despawned = Vec::new();
        for id in self.entities.sorted_ids() {
            let Some(entity) = self.entities.get_mut(id) else {
                continue;
            };
            let leaving = match entity.life {
                LifeState::Dead => true,
                LifeState::Alive | LifeState::ControllerOwned => {
                    entity.controller.poll_despawn(now)
                }
            };
            if leaving {
                self.entities.remove(id);
                tracing::debug!(entity = id, "Entity despawned");
                despawned.push(id);
            }
        }
        despawned
    }

    #[cfg(feature = "debug-validation")]
    fn check_invariants(&self) {
        use crate::stats::PoolKind;

        for entity in self.entities.iter_sorted() {
            for kind in PoolKind::DAMAGE_ORDER {
                let pool = entity.stats.pool(kind);
                debug_assert!(
                    pool.current() >= Fixed::ZERO && pool.current() <= pool.max(),
                    "entity {} {kind:?} pool out of range",
                    entity.id
                );
            }
        }
        for (handle, projectile) in self.projectiles.iter() {
            debug_assert!(
                projectile.range_left.map_or(true, |left| left >= Fixed::ZERO),
                "projectile {handle:?} overran its range"
            );
        }
    }

    /// Calculate a hash of the current simulation state.
    ///
    /// Two simulations with identical state will produce identical hashes.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        // Hash tick
        self.tick.hash(&mut hasher);

        // Hash entities in deterministic order
        let ids = self.entities.sorted_ids();
        ids.len().hash(&mut hasher);

        for entity in self.entities.iter_sorted() {
            entity.id.hash(&mut hasher);
            entity.faction.hash(&mut hasher);
            entity.position.hash(&mut hasher);
            entity.aim.hash(&mut hasher);
            entity.stats.hash(&mut hasher);
            entity.life.hash(&mut hasher);

            entity.equipment.active_index().hash(&mut hasher);
            for gun in entity.equipment.weapons() {
                gun.state().hash(&mut hasher);
                gun.burst_index().hash(&mut hasher);
                gun.ammo().hash(&mut hasher);
            }
        }

        // Hash projectiles, oldest first
        self.projectiles.len().hash(&mut hasher);
        for (handle, projectile) in self.projectiles.iter() {
            handle.hash(&mut hasher);
            projectile.position.hash(&mut hasher);
            projectile.velocity.hash(&mut hasher);
            projectile.faction().hash(&mut hasher);
            projectile.last_event.hash(&mut hasher);
            projectile.range_left.hash(&mut hasher);
            projectile.spec.modifiers.kinds().hash(&mut hasher);
        }

        hasher.finish()
    }

    /// Serialize the simulation state for snapshots and replays.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| GameError::Serialization(format!("Failed to serialize simulation: {e}")))
    }

    /// Deserialize simulation state from bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails.
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data).map_err(|e| {
            GameError::Serialization(format!("Failed to deserialize simulation: {e}"))
        })
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new(WeaponCatalog::default(), 0)
    }
}
