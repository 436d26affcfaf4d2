//! Headless scenario runner.
//!
//! Runs a scenario to completion without any presentation and summarises
//! what happened. Optionally records the run as a replay.

use std::path::Path;

use arena_core::data::{ScenarioData, WeaponCatalog};
use arena_core::entity::EntityId;
use arena_core::replay::{Replay, ReplayPlayer};
use arena_core::simulation::Simulation;
use arena_core::simulator::CombatEvent;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Options for a headless run.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Tick count override; defaults to the scenario's.
    pub ticks: Option<u64>,
    /// Seed override; defaults to the scenario's.
    pub seed: Option<u64>,
}

/// Final state of an entity that survived the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurvivorSummary {
    /// Entity id.
    pub id: EntityId,
    /// Faction name.
    pub faction: String,
    /// Remaining health.
    pub health: f64,
    /// Remaining armor.
    pub armor: f64,
    /// Remaining shields.
    pub shields: f64,
}

/// Summary of one headless run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Scenario name.
    pub scenario: String,
    /// Random seed used.
    pub seed: u64,
    /// Ticks simulated.
    pub ticks: u64,
    /// Projectiles fired.
    pub shots_fired: usize,
    /// Damage events, including explosions.
    pub hits: usize,
    /// Total damage removed from pools.
    pub damage_dealt: f64,
    /// Damage absorbed by resistances.
    pub damage_resisted: f64,
    /// Explosions.
    pub explosions: usize,
    /// Entities that died, in order.
    pub deaths: Vec<EntityId>,
    /// Entities still present at the end.
    pub survivors: Vec<SurvivorSummary>,
    /// Final simulation state hash (for determinism validation).
    pub final_state_hash: u64,
}

impl RunSummary {
    fn record(&mut self, event: &CombatEvent) {
        match event {
            CombatEvent::Damaged {
                dealt, resisted, ..
            } => {
                self.hits += 1;
                self.damage_dealt += dealt.to_num::<f64>();
                self.damage_resisted += resisted.to_num::<f64>();
            }
            CombatEvent::Exploded { .. } => self.explosions += 1,
            _ => {}
        }
    }
}

/// Run `scenario` headless and return the finished simulation with its
/// summary.
///
/// # Errors
///
/// Returns an error if the scenario cannot be built.
pub fn run_scenario(
    scenario: &ScenarioData,
    catalog: WeaponCatalog,
    options: &RunOptions,
) -> Result<(Simulation, RunSummary)> {
    let mut scenario = scenario.clone();
    if let Some(seed) = options.seed {
        scenario.seed = seed;
    }
    let ticks = options.ticks.unwrap_or(scenario.ticks);

    let mut sim = Simulation::from_scenario(&scenario, catalog)?;
    let mut summary = RunSummary {
        scenario: scenario.name.clone(),
        seed: scenario.seed,
        ticks,
        ..RunSummary::default()
    };

    tracing::info!(scenario = %scenario.name, seed = scenario.seed, ticks, "Running scenario");
    for _ in 0..ticks {
        let events = sim.tick();
        summary.shots_fired += events.shots_fired;
        for event in &events.combat {
            summary.record(event);
        }
        for id in &events.deaths {
            tracing::info!(tick = sim.get_tick(), entity = id, "Entity died");
        }
        summary.deaths.extend(events.deaths);
    }

    summary.survivors = sim
        .entities()
        .iter_sorted()
        .map(|entity| SurvivorSummary {
            id: entity.id,
            faction: format!("{:?}", entity.faction),
            health: entity.stats.health.current().to_num(),
            armor: entity.stats.armor.current().to_num(),
            shields: entity.stats.shields.current().to_num(),
        })
        .collect();
    summary.final_state_hash = sim.state_hash();
    Ok((sim, summary))
}

/// Run `scenario` headless and save the run as a replay at `path`.
///
/// # Errors
///
/// Returns an error if the scenario cannot be built or the replay cannot be
/// written.
pub fn record_scenario(
    scenario: &ScenarioData,
    catalog: WeaponCatalog,
    options: &RunOptions,
    path: &Path,
) -> Result<RunSummary> {
    let mut initial = scenario.clone();
    if let Some(seed) = options.seed {
        initial.seed = seed;
    }
    let start = Simulation::from_scenario(&initial, catalog.clone())?;
    let mut replay = Replay::new(scenario.name.clone(), &start)?;

    let (sim, summary) = run_scenario(scenario, catalog, options)?;
    replay.finalize(&sim);
    replay.save(path)?;
    tracing::info!(path = %path.display(), ticks = replay.duration(), "Replay saved");
    Ok(summary)
}

/// Load a replay and check that playback reproduces its final hash.
///
/// # Errors
///
/// Returns an error if the replay cannot be loaded or playback diverges.
pub fn verify_replay(path: &Path) -> Result<u64> {
    let replay = Replay::load(path)?;
    let mut player = ReplayPlayer::new(replay)?;
    let hash = player.verify()?;
    tracing::info!(path = %path.display(), hash, "Replay verified");
    Ok(hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena_test_utils::fixtures::{asset_catalog, duel_scenario};

    #[test]
    fn test_run_duel() {
        let options = RunOptions {
            ticks: Some(200),
            ..RunOptions::default()
        };
        let (sim, summary) = run_scenario(&duel_scenario(), asset_catalog(), &options).unwrap();

        assert_eq!(summary.scenario, "duel");
        assert_eq!(summary.ticks, 200);
        assert_eq!(sim.get_tick(), 200);
        // The dummy holds its trigger for the whole run.
        assert!(summary.shots_fired > 0);
        assert_eq!(summary.final_state_hash, sim.state_hash());
        // The player never pulls the trigger, so the dummy survives.
        assert!(summary.survivors.iter().any(|s| s.faction == "Enemy"));
    }

    #[test]
    fn test_runs_are_reproducible() {
        let options = RunOptions {
            ticks: Some(150),
            seed: Some(99),
        };
        let (_, a) = run_scenario(&duel_scenario(), asset_catalog(), &options).unwrap();
        let (_, b) = run_scenario(&duel_scenario(), asset_catalog(), &options).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.seed, 99);
    }

    #[test]
    fn test_record_and_verify_replay() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("duel.replay");
        let options = RunOptions {
            ticks: Some(120),
            ..RunOptions::default()
        };

        let summary = record_scenario(&duel_scenario(), asset_catalog(), &options, &path).unwrap();
        assert_eq!(verify_replay(&path).unwrap(), summary.final_state_hash);
    }
}
