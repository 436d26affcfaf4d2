//! Weapon data structures for data-driven gun definitions.

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::magazine::SimpleMag;
use crate::math::{decimal_serde, Fixed};

/// How a held trigger behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FiringType {
    /// Keeps firing while the trigger is held.
    #[default]
    Automatic,
    /// One trigger pull per burst.
    SemiAuto,
}

/// Timing and spread of a gun. All times are in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GunStats {
    /// Minimum time between burst starts.
    #[serde(with = "decimal_serde")]
    pub burst_delay: Fixed,
    /// Time between shots inside a burst.
    #[serde(with = "decimal_serde")]
    pub fire_delay: Fixed,
    /// Shots per burst. 0 fires single shots, negative fires until released.
    pub burst_count: i32,
    /// Maximum deviation in degrees.
    #[serde(with = "decimal_serde")]
    pub spread: Fixed,
    /// 0 to 1; higher values concentrate shots near the aim line.
    #[serde(with = "decimal_serde")]
    pub accuracy: Fixed,
    /// Time to reload.
    #[serde(with = "decimal_serde")]
    pub reload_delay: Fixed,
    /// Time to equip.
    #[serde(with = "decimal_serde")]
    pub equip_delay: Fixed,
}

impl Default for GunStats {
    fn default() -> Self {
        Self {
            burst_delay: Fixed::from_num(0.4),
            fire_delay: Fixed::ZERO,
            burst_count: 0,
            spread: Fixed::from_num(5),
            accuracy: Fixed::ONE,
            reload_delay: Fixed::ONE,
            equip_delay: Fixed::from_num(0.5),
        }
    }
}

/// Data-driven gun definition.
///
/// # Example RON
///
/// ```ron
/// WeaponConfig(
///     id: "FAMAS",
///     stats: (burst_delay: 0.35, fire_delay: 0.07, burst_count: 3, spread: 3.0, accuracy: 0.8),
///     magazine: (mag_size: 30, bullet: (stats: (damage: 12.0, speed: 40.0))),
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeaponConfig {
    /// Unique weapon identifier.
    pub id: String,

    /// Held-trigger behaviour.
    #[serde(default)]
    pub firing_type: FiringType,

    /// Timing and spread.
    #[serde(default)]
    pub stats: GunStats,

    /// Magazine and bullet prototype.
    #[serde(default)]
    pub magazine: SimpleMag,

    /// The secondary action reloads.
    #[serde(default = "default_true")]
    pub action2_is_reload: bool,

    /// Pulling the trigger on an empty magazine starts a reload.
    #[serde(default = "default_true")]
    pub reload_on_empty_fire: bool,

    /// Rounds added per reload; `None` refills completely.
    #[serde(default)]
    pub reload_partial: Option<u32>,

    /// Muzzle distance beyond the holder's collider.
    #[serde(default = "default_barrel_offset", with = "decimal_serde")]
    pub barrel_offset: Fixed,
}

const fn default_true() -> bool {
    true
}

fn default_barrel_offset() -> Fixed {
    Fixed::from_num(0.3)
}

impl WeaponConfig {
    /// Config with default stats and the given magazine.
    #[must_use]
    pub fn new(id: impl Into<String>, stats: GunStats, magazine: SimpleMag) -> Self {
        Self {
            id: id.into(),
            firing_type: FiringType::Automatic,
            stats,
            magazine,
            action2_is_reload: true,
            reload_on_empty_fire: true,
            reload_partial: None,
            barrel_offset: default_barrel_offset(),
        }
    }
}

/// Every weapon known to a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeaponCatalog {
    weapons: Vec<WeaponConfig>,
}

impl From<Vec<WeaponConfig>> for WeaponCatalog {
    fn from(weapons: Vec<WeaponConfig>) -> Self {
        Self { weapons }
    }
}

impl WeaponCatalog {
    /// Parse a catalog from RON text. `path` is only used in errors.
    pub fn from_ron(text: &str, path: &str) -> Result<Self> {
        ron::from_str(text).map_err(|e| GameError::DataParseError {
            path: path.to_string(),
            message: e.to_string(),
        })
    }

    /// Find a weapon by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&WeaponConfig> {
        self.weapons.iter().find(|w| w.id == id)
    }

    /// All weapons in file order.
    pub fn iter(&self) -> impl Iterator<Item = &WeaponConfig> {
        self.weapons.iter()
    }

    /// Number of weapons.
    #[must_use]
    pub fn len(&self) -> usize {
        self.weapons.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.weapons.is_empty()
    }

    /// Ids that appear more than once.
    #[must_use]
    pub fn duplicate_ids(&self) -> Vec<&str> {
        let mut seen = std::collections::BTreeSet::new();
        let mut duplicates = Vec::new();
        for weapon in &self.weapons {
            if !seen.insert(weapon.id.as_str()) && !duplicates.contains(&weapon.id.as_str()) {
                duplicates.push(weapon.id.as_str());
            }
        }
        duplicates
    }
}
