//! Test fixtures and helpers.
//!
//! Pre-built weapons, targets and scenarios for consistent testing.

use arena_core::controller::{Controller, PlayerController};
use arena_core::data::{GunStats, ScenarioData, WeaponCatalog, WeaponConfig};
use arena_core::entity::{EntityId, EntitySpawnParams};
use arena_core::factions::Faction;
use arena_core::magazine::SimpleMag;
use arena_core::math::Vec2Fixed;
use arena_core::modifier::{Modifier, ModifierChain};
use arena_core::projectile::{ProjectileSpec, ProjectileStats};
use arena_core::simulation::Simulation;
use arena_core::stats::StatBlock;
use fixed::types::I32F32;
use serde::de::DeserializeOwned;

/// Weapon catalog shipped with the game.
pub const WEAPONS_RON: &str = include_str!("../../../assets/data/weapons.ron");

/// Duel scenario shipped with the game.
pub const DUEL_RON: &str = include_str!("../../../assets/scenarios/duel.ron");

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real simulation code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a vector from float components.
#[must_use]
pub fn vec2(x: f64, y: f64) -> Vec2Fixed {
    Vec2Fixed::new(fixed_f(x), fixed_f(y))
}

/// Parse an inline RON snippet.
///
/// # Panics
///
/// Panics if the text does not parse.
#[must_use]
pub fn parse_ron<T: DeserializeOwned>(text: &str) -> T {
    match ron::from_str(text) {
        Ok(value) => value,
        Err(e) => panic!("Invalid test RON: {e}\n{text}"),
    }
}

/// Bullet prototype with no spread in speed or range.
#[must_use]
pub fn bullet(damage: f64, speed: f64, range: f64) -> ProjectileSpec {
    ProjectileSpec {
        stats: ProjectileStats {
            damage: fixed_f(damage),
            speed: fixed_f(speed),
            range: fixed_f(range),
            ..ProjectileStats::default()
        },
        ..ProjectileSpec::default()
    }
}

/// Attach modifiers to a bullet prototype.
#[must_use]
pub fn with_modifiers(mut spec: ProjectileSpec, modifiers: Vec<Modifier>) -> ProjectileSpec {
    spec.modifiers = ModifierChain::from(modifiers);
    spec
}

/// Perfectly accurate automatic weapon that equips instantly.
#[must_use]
pub fn test_weapon(id: &str, spec: ProjectileSpec, mag_size: u32) -> WeaponConfig {
    let stats = GunStats {
        spread: I32F32::ZERO,
        equip_delay: I32F32::ZERO,
        ..GunStats::default()
    };
    WeaponConfig::new(id, stats, SimpleMag::new(spec, mag_size))
}

/// Catalog with a single accurate rifle named `"rifle"`.
#[must_use]
pub fn rifle_catalog() -> WeaponCatalog {
    WeaponCatalog::from(vec![test_weapon("rifle", bullet(10.0, 50.0, 40.0), 30)])
}

/// The shipped weapon catalog.
///
/// # Panics
///
/// Panics if the shipped catalog does not parse.
#[must_use]
pub fn asset_catalog() -> WeaponCatalog {
    match WeaponCatalog::from_ron(WEAPONS_RON, "assets/data/weapons.ron") {
        Ok(catalog) => catalog,
        Err(e) => panic!("{e}"),
    }
}

/// The shipped duel scenario.
///
/// # Panics
///
/// Panics if the shipped scenario does not parse.
#[must_use]
pub fn duel_scenario() -> ScenarioData {
    match ScenarioData::from_ron(DUEL_RON, "assets/scenarios/duel.ron") {
        Ok(scenario) => scenario,
        Err(e) => panic!("{e}"),
    }
}

/// Simulation built from the shipped duel scenario and catalog.
///
/// # Panics
///
/// Panics if the scenario cannot be built.
#[must_use]
pub fn duel_simulation() -> Simulation {
    match Simulation::from_scenario(&duel_scenario(), asset_catalog()) {
        Ok(sim) => sim,
        Err(e) => panic!("{e}"),
    }
}

/// Spawn a player holding `weapon`.
///
/// # Panics
///
/// Panics if the weapon is not in the simulation's catalog.
pub fn spawn_player(sim: &mut Simulation, position: Vec2Fixed, weapon: &str) -> EntityId {
    let id = sim.spawn_entity(EntitySpawnParams {
        faction: Faction::Player,
        position,
        stats: StatBlock::with_health(fixed(100)),
        controller: Controller::Player(PlayerController::default()),
        ..Default::default()
    });
    if let Err(e) = sim.pickup_weapon(id, weapon) {
        panic!("{e}");
    }
    id
}

/// Spawn a brainless enemy with the given stats.
pub fn spawn_target(sim: &mut Simulation, position: Vec2Fixed, stats: StatBlock) -> EntityId {
    sim.spawn_entity(EntitySpawnParams {
        faction: Faction::Enemy,
        position,
        stats,
        ..Default::default()
    })
}
