//! Startup self-tests for configuration data.
//!
//! Each test counts cases and infractions the same way: one case per item
//! checked, one infraction per item with at least one problem. Problems are
//! repaired or the item disabled; nothing here aborts.

use serde::{Deserialize, Serialize};

use crate::data::WeaponCatalog;
use crate::error::GameError;
use crate::magazine::Magazine;
use crate::math::Fixed;
use crate::modifier::test_modifier_types;
use crate::weapon::Gun;

/// Result of a self-test.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Items with at least one problem.
    pub infractions: usize,
    /// Items checked.
    pub total_cases: usize,
    /// Human readable problems.
    pub messages: Vec<String>,
}

impl ValidationReport {
    /// Whether every case passed.
    #[must_use]
    pub const fn passed(&self) -> bool {
        self.infractions == 0
    }

    /// Fold another report into this one.
    pub fn merge(&mut self, other: Self) {
        self.infractions += other.infractions;
        self.total_cases += other.total_cases;
        self.messages.extend(other.messages);
    }

    /// Turn a failed report into an error.
    pub fn into_result(self) -> crate::error::Result<Self> {
        if self.passed() {
            Ok(self)
        } else {
            Err(GameError::ValidationFailed {
                infractions: self.infractions,
                total_cases: self.total_cases,
            })
        }
    }
}

/// Build every weapon in `catalog` and check it.
///
/// Runs [`Gun::validate`] on each weapon and additionally flags duplicate
/// ids and bullets that cannot travel or heal their target.
#[must_use]
pub fn test_all_weapons(catalog: &WeaponCatalog) -> ValidationReport {
    let mut report = ValidationReport {
        total_cases: catalog.len(),
        ..ValidationReport::default()
    };
    let duplicates = catalog.duplicate_ids();

    for config in catalog.iter() {
        let mut gun = Gun::new(config.clone());
        let mut problems = gun.validate();

        if duplicates.contains(&config.id.as_str()) {
            problems.push(format!("Weapon id '{}' is used more than once", config.id));
        }
        for bullet in gun.config().magazine.all_bullets() {
            if bullet.stats.speed <= Fixed::ZERO {
                problems.push(format!("Bullet of '{}' has no speed", config.id));
            }
            if bullet.stats.damage < Fixed::ZERO {
                problems.push(format!("Bullet of '{}' has negative damage", config.id));
            }
        }

        if !problems.is_empty() {
            report.infractions += 1;
            report.messages.extend(problems);
        }
    }

    if report.passed() {
        tracing::info!(cases = report.total_cases, "Weapons set-up passed");
    } else {
        tracing::warn!(
            infractions = report.infractions,
            cases = report.total_cases,
            "Weapons set-up failed"
        );
    }
    report
}

/// Check every modifier kind.
#[must_use]
pub fn test_modifiers() -> ValidationReport {
    let modifiers = test_modifier_types();
    let report = ValidationReport {
        infractions: modifiers.infractions,
        total_cases: modifiers.total_cases,
        messages: modifiers.messages,
    };
    if report.passed() {
        tracing::info!(cases = report.total_cases, "Modifier set-up passed");
    }
    report
}

/// Run every self-test.
#[must_use]
pub fn test_all(catalog: &WeaponCatalog) -> ValidationReport {
    let mut report = test_all_weapons(catalog);
    report.merge(test_modifiers());
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{GunStats, WeaponConfig};
    use crate::magazine::SimpleMag;
    use crate::modifier::ModifierKind;
    use crate::projectile::ProjectileSpec;

    fn weapon(id: &str, stats: GunStats) -> WeaponConfig {
        WeaponConfig::new(id, stats, SimpleMag::new(ProjectileSpec::default(), 10))
    }

    #[test]
    fn test_clean_catalog_passes() {
        let catalog = WeaponCatalog::from(vec![
            weapon("pistol", GunStats::default()),
            weapon("rifle", GunStats::default()),
        ]);
        let report = test_all_weapons(&catalog);
        assert!(report.passed(), "{:?}", report.messages);
        assert_eq!(report.total_cases, 2);
        assert!(report.into_result().is_ok());
    }

    #[test]
    fn test_infractions_counted_per_weapon() {
        let bad_burst = GunStats {
            burst_count: 1,
            burst_delay: Fixed::ZERO,
            ..GunStats::default()
        };
        let mut slow = weapon("slow", GunStats::default());
        slow.magazine.bullet.stats.speed = Fixed::ZERO;
        slow.magazine.mag_size = 0;

        let catalog = WeaponCatalog::from(vec![
            weapon("burst", bad_burst),
            slow,
            weapon("fine", GunStats::default()),
            weapon("fine", GunStats::default()),
        ]);
        let report = test_all_weapons(&catalog);
        assert_eq!(report.total_cases, 4);
        assert_eq!(report.infractions, 4);
        assert!(report.messages.iter().any(|m| m.contains("no speed")));
        assert!(report.messages.iter().any(|m| m.contains("more than once")));
        assert!(matches!(
            report.into_result(),
            Err(GameError::ValidationFailed { infractions: 4, total_cases: 4 })
        ));
    }

    #[test]
    fn test_all_includes_modifiers() {
        let report = test_all(&WeaponCatalog::default());
        assert!(report.passed());
        assert_eq!(report.total_cases, ModifierKind::ALL.len());
    }
}
