//! Data validation utilities.

use std::path::Path;

use arena_core::data::{ScenarioData, WeaponCatalog};
use arena_core::validate::{test_all, ValidationReport};

use crate::{read_text, Result};

/// Load a weapon catalog from a RON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_catalog(path: &Path) -> Result<WeaponCatalog> {
    let text = read_text(path)?;
    Ok(WeaponCatalog::from_ron(&text, &path.display().to_string())?)
}

/// Load a scenario from a RON file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_scenario(path: &Path) -> Result<ScenarioData> {
    let text = read_text(path)?;
    Ok(ScenarioData::from_ron(&text, &path.display().to_string())?)
}

/// Check a scenario against the catalog it will be run with.
///
/// One case per scenario; every unresolvable reference is reported.
#[must_use]
pub fn test_scenario(scenario: &ScenarioData, catalog: &WeaponCatalog) -> ValidationReport {
    let mut problems = scenario.validate();
    for (index, entity) in scenario.entities.iter().enumerate() {
        for weapon in &entity.weapons {
            if catalog.get(weapon).is_none() {
                problems.push(format!("Entity {index} picks up unknown weapon '{weapon}'"));
            }
        }
    }

    for message in &problems {
        tracing::warn!(scenario = %scenario.name, %message, "Scenario infraction");
    }
    ValidationReport {
        infractions: usize::from(!problems.is_empty()),
        total_cases: 1,
        messages: problems,
    }
}

/// Run the full self-test: every weapon, every modifier kind and every
/// given scenario file.
///
/// Parse failures are errors; content problems are counted as infractions.
///
/// # Errors
///
/// Returns an error if a file cannot be read or parsed.
pub fn validate_files(catalog_path: &Path, scenarios: &[impl AsRef<Path>]) -> Result<ValidationReport> {
    let catalog = load_catalog(catalog_path)?;
    let mut report = test_all(&catalog);

    for path in scenarios {
        let scenario = load_scenario(path.as_ref())?;
        report.merge(test_scenario(&scenario, &catalog));
    }

    tracing::info!(
        infractions = report.infractions,
        cases = report.total_cases,
        "Self-test complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena_test_utils::fixtures::{duel_scenario, DUEL_RON, WEAPONS_RON};
    use std::path::PathBuf;

    fn write(dir: &Path, name: &str, text: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn test_shipped_data_passes() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = write(dir.path(), "weapons.ron", WEAPONS_RON);
        let duel = write(dir.path(), "duel.ron", DUEL_RON);

        let report = validate_files(&catalog, &[duel]).unwrap();
        assert!(report.passed(), "{:?}", report.messages);
        // Four weapons, every modifier kind, one scenario.
        assert_eq!(
            report.total_cases,
            4 + arena_core::modifier::ModifierKind::ALL.len() + 1
        );
    }

    #[test]
    fn test_unknown_weapon_is_an_infraction() {
        let mut scenario = duel_scenario();
        scenario.entities[0].weapons.push("Railgun".to_string());
        let catalog = WeaponCatalog::from_ron(WEAPONS_RON, "weapons.ron").unwrap();

        let report = test_scenario(&scenario, &catalog);
        assert_eq!(report.infractions, 1);
        assert!(report.messages[0].contains("Railgun"));
    }

    #[test]
    fn test_missing_file_names_path() {
        let err = load_catalog(Path::new("does/not/exist.ron")).unwrap_err();
        assert!(err.to_string().contains("does/not/exist.ron"));
    }

    #[test]
    fn test_broken_catalog_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = write(dir.path(), "weapons.ron", "[(id: )]");
        let scenarios: [PathBuf; 0] = [];
        assert!(matches!(
            validate_files(&catalog, &scenarios),
            Err(crate::ToolError::Game(arena_core::error::GameError::DataParseError { .. }))
        ));
    }
}
