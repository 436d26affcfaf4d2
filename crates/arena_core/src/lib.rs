//! # Arena Core
//!
//! Deterministic combat core for a top-down arena shooter.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No file loading (configuration arrives as RON text)
//! - No system randomness (one seeded stream)
//! - No floating-point math (uses fixed-point)
//!
//! This separation enables:
//! - Headless scenario runs
//! - Replay systems
//! - Determinism testing
//!
//! ## Crate Structure
//!
//! - [`stats`] and [`damage`] - Damage pools, resistances and layered mitigation
//! - [`weapon`], [`magazine`], [`equipment`] - Guns and the slots that hold them
//! - [`projectile`], [`modifier`], [`simulator`] - Projectiles in flight
//! - [`controller`] and [`entity`] - Who fights and who decides
//! - [`simulation`] - Core simulation loop
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod controller;
pub mod damage;
pub mod data;
pub mod entity;
pub mod equipment;
pub mod error;
pub mod factions;
pub mod magazine;
pub mod math;
pub mod modifier;
pub mod physics;
pub mod pool;
pub mod projectile;
pub mod replay;
pub mod rng;
pub mod simulation;
pub mod simulator;
pub mod stats;
pub mod validate;
pub mod weapon;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::controller::{
        Controller, DummyController, EntityController, EquipRequest, Intent, PlayerController,
        ShieldController,
    };
    pub use crate::damage::{DamageListener, DamageOutcome, DamageResolver};
    pub use crate::data::{GunStats, ScenarioData, WeaponCatalog, WeaponConfig};
    pub use crate::entity::{Entity, EntityId, EntitySpawnParams, LifeState};
    pub use crate::error::{GameError, Result};
    pub use crate::factions::{can_attack, Faction};
    pub use crate::math::{Fixed, Vec2Fixed};
    pub use crate::modifier::{Fate, Modifier, ModifierChain, ModifierKind};
    pub use crate::physics::{ArenaPhysics, LayerMask, PhysicsQuery, Wall};
    pub use crate::projectile::{LifecycleEvent, ProjectileSpec, ProjectileStats, ReflectionType};
    pub use crate::simulation::{Simulation, TickEvents, TICK_RATE};
    pub use crate::simulator::CombatEvent;
    pub use crate::stats::{Element, PoolKind, ResistanceLevel, StatBlock};
    pub use crate::weapon::{Gun, GunState, Weapon};
}
