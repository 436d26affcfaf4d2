//! Data structures for weapon and scenario configuration.
//!
//! This module contains pure data structures. All structs are designed to
//! be deserialized from RON files; decimal numbers are converted to
//! [`Fixed`](crate::math::Fixed) on load.
//!
//! **Note:** This module contains no IO - it only parses text handed to it.
//! File loading is handled by `arena_tools`.

mod scenario_data;
mod weapon_data;

pub use scenario_data::{ArenaData, ControllerData, EntityData, RoomData, ScenarioData, WallData};
pub use weapon_data::{FiringType, GunStats, WeaponCatalog, WeaponConfig};
