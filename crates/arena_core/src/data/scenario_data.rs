//! Scenario data: the arena and who starts in it.

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::factions::Faction;
use crate::math::{decimal_serde, decimal_vec_serde, option_decimal_serde, Fixed, Vec2Fixed};
use crate::stats::StatBlock;

/// A headless combat scenario.
///
/// # Example RON
///
/// ```ron
/// ScenarioData(
///     name: "duel",
///     seed: 7,
///     ticks: 500,
///     arena: (room: Some((min: (-20.0, -20.0), max: (20.0, 20.0)))),
///     entities: [
///         (faction: Player, position: (-5.0, 0.0), stats: (health: (max: 100.0)),
///          controller: Player, weapons: ["FAMAS"]),
///         (faction: Enemy, position: (5.0, 0.0), stats: (health: (max: 50.0)),
///          controller: Dummy(hold_trigger: true, target: Some(0)), weapons: ["MarinePistol"]),
///     ],
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioData {
    /// Scenario name, recorded in replays.
    pub name: String,

    /// Random seed.
    #[serde(default)]
    pub seed: u64,

    /// Ticks a headless run lasts.
    #[serde(default = "default_ticks")]
    pub ticks: u64,

    /// Map geometry.
    #[serde(default)]
    pub arena: ArenaData,

    /// Entities present at tick zero, in spawn order.
    #[serde(default)]
    pub entities: Vec<EntityData>,
}

const fn default_ticks() -> u64 {
    500
}

/// Map geometry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArenaData {
    /// Four walls enclosing a rectangle.
    #[serde(default)]
    pub room: Option<RoomData>,

    /// Free-standing wall segments.
    #[serde(default)]
    pub walls: Vec<WallData>,
}

/// Rectangular room corners.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoomData {
    /// Lower-left corner.
    #[serde(with = "decimal_vec_serde")]
    pub min: Vec2Fixed,
    /// Upper-right corner.
    #[serde(with = "decimal_vec_serde")]
    pub max: Vec2Fixed,
}

/// A wall segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WallData {
    /// First endpoint.
    #[serde(with = "decimal_vec_serde")]
    pub start: Vec2Fixed,
    /// Second endpoint.
    #[serde(with = "decimal_vec_serde")]
    pub end: Vec2Fixed,
}

/// Authoring form of an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityData {
    /// Team.
    pub faction: Faction,

    /// Spawn position.
    #[serde(with = "decimal_vec_serde")]
    pub position: Vec2Fixed,

    /// Pools and resistances.
    #[serde(default)]
    pub stats: StatBlock,

    /// Brain.
    #[serde(default)]
    pub controller: ControllerData,

    /// Weapon ids picked up at spawn, in slot order.
    #[serde(default)]
    pub weapons: Vec<String>,

    /// Weapon slots; defaults to two.
    #[serde(default)]
    pub max_weapons: Option<usize>,

    /// Movement speed.
    #[serde(default, with = "decimal_serde")]
    pub speed: Fixed,

    /// Collider radius; defaults to 0.5.
    #[serde(default, with = "option_decimal_serde")]
    pub radius: Option<Fixed>,
}

/// Authoring form of a controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum ControllerData {
    /// No brain.
    #[default]
    Inert,
    /// Driven by recorded or live intents.
    Player,
    /// Target practice.
    Dummy {
        /// Keep the trigger held.
        #[serde(default)]
        hold_trigger: bool,
        /// Walk in circles.
        #[serde(default)]
        move_in_circles: bool,
        /// Index into the scenario's entity list.
        #[serde(default)]
        target: Option<usize>,
    },
    /// Destructible shield.
    Shield {
        /// Lifetime in seconds.
        #[serde(default, with = "option_decimal_serde")]
        duration: Option<Fixed>,
    },
}

impl ScenarioData {
    /// Parse a scenario from RON text. `path` is only used in errors.
    pub fn from_ron(text: &str, path: &str) -> Result<Self> {
        ron::from_str(text).map_err(|e| GameError::DataParseError {
            path: path.to_string(),
            message: e.to_string(),
        })
    }

    /// Check references between entities.
    ///
    /// Returns a list of problems; an empty list means the scenario can be
    /// built.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        for (index, entity) in self.entities.iter().enumerate() {
            if let ControllerData::Dummy {
                target: Some(target),
                ..
            } = entity.controller
            {
                if target >= self.entities.len() {
                    errors.push(format!("Entity {index} targets unknown entity {target}"));
                } else if target == index {
                    errors.push(format!("Entity {index} targets itself"));
                }
            }
            if entity.max_weapons == Some(0) {
                errors.push(format!("Entity {index} has no weapon slots"));
            }
        }
        errors
    }
}
