//! Replay system for recording and playing back combat sessions.
//!
//! Replays store the initial simulation state and the stream of player
//! intents issued during the session. Everything else is derived from the
//! seed, so playback recreates the session exactly.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::controller::Intent;
use crate::entity::EntityId;
use crate::error::{GameError, Result};
use crate::simulation::Simulation;

/// A single intent record for replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayIntent {
    /// Simulation tick when the intent was issued.
    pub tick: u64,
    /// Player-controlled entity.
    pub entity: EntityId,
    /// The intent that was issued.
    pub intent: Intent,
}

/// Replay file format version for compatibility.
pub const REPLAY_VERSION: u32 = 1;

/// Complete replay data structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Replay {
    /// Replay format version.
    pub version: u32,
    /// Scenario identifier or name.
    pub scenario_id: String,
    /// Random seed used for the session.
    pub seed: u64,
    /// Serialized initial simulation state.
    pub initial_state: Vec<u8>,
    /// Stream of intents in tick order.
    pub intents: Vec<ReplayIntent>,
    /// Final tick when the session ended.
    pub final_tick: u64,
    /// Final state hash for verification.
    pub final_hash: u64,
}

impl Replay {
    /// Create a new replay from a simulation's initial state.
    pub fn new(scenario_id: impl Into<String>, initial_state: &Simulation) -> Result<Self> {
        Ok(Self {
            version: REPLAY_VERSION,
            scenario_id: scenario_id.into(),
            seed: initial_state.seed(),
            initial_state: initial_state.serialize()?,
            intents: Vec::new(),
            final_tick: initial_state.get_tick(),
            final_hash: initial_state.state_hash(),
        })
    }

    /// Record an intent for replay.
    pub fn record_intent(&mut self, tick: u64, entity: EntityId, intent: Intent) {
        self.intents.push(ReplayIntent {
            tick,
            entity,
            intent,
        });
    }

    /// Finalize the replay with end-of-session state.
    pub fn finalize(&mut self, simulation: &Simulation) {
        self.final_tick = simulation.get_tick();
        self.final_hash = simulation.state_hash();
    }

    /// Encode the replay.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| GameError::Serialization(format!("Failed to serialize replay: {e}")))
    }

    /// Decode a replay, rejecting other format versions.
    ///
    /// # Errors
    /// Returns an error if deserialization fails or the version differs.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let replay: Self = bincode::deserialize(bytes)
            .map_err(|e| GameError::Serialization(format!("Failed to deserialize replay: {e}")))?;

        // Version check
        if replay.version != REPLAY_VERSION {
            return Err(GameError::InvalidState(format!(
                "Replay version mismatch: expected {}, got {}",
                REPLAY_VERSION, replay.version
            )));
        }

        Ok(replay)
    }

    /// Save the replay to a file.
    ///
    /// # Errors
    /// Returns an error if serialization or file writing fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = self.to_bytes()?;
        std::fs::write(path.as_ref(), bytes)
            .map_err(|e| GameError::InvalidState(format!("Failed to write replay file: {e}")))
    }

    /// Load a replay from a file.
    ///
    /// # Errors
    /// Returns an error if file reading or deserialization fails.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())
            .map_err(|e| GameError::InvalidState(format!("Failed to read replay file: {e}")))?;
        Self::from_bytes(&bytes)
    }

    /// Get the initial simulation state for playback.
    ///
    /// # Errors
    /// Returns an error if state deserialization fails.
    pub fn restore_initial_state(&self) -> Result<Simulation> {
        Simulation::deserialize(&self.initial_state)
    }

    /// Get intents for a specific tick.
    #[must_use]
    pub fn intents_at_tick(&self, tick: u64) -> Vec<&ReplayIntent> {
        self.intents.iter().filter(|i| i.tick == tick).collect()
    }

    /// Get the total duration of the replay in ticks.
    #[must_use]
    pub const fn duration(&self) -> u64 {
        self.final_tick
    }

    /// Get the total number of recorded intents.
    #[must_use]
    pub fn intent_count(&self) -> usize {
        self.intents.len()
    }
}

/// Replay playback controller.
#[derive(Debug)]
pub struct ReplayPlayer {
    replay: Replay,
    simulation: Simulation,
    start_tick: u64,
    intent_index: usize,
    /// Whether playback is paused.
    pub paused: bool,
}

impl ReplayPlayer {
    /// Create a new replay player from a replay.
    ///
    /// # Errors
    /// Returns an error if the initial state cannot be restored.
    pub fn new(replay: Replay) -> Result<Self> {
        let simulation = replay.restore_initial_state()?;
        Ok(Self {
            start_tick: simulation.get_tick(),
            replay,
            simulation,
            intent_index: 0,
            paused: false,
        })
    }

    /// Advance the replay by one tick.
    ///
    /// Returns true if there are more ticks to play.
    pub fn advance(&mut self) -> bool {
        if self.paused || self.is_finished() {
            return !self.is_finished();
        }
        self.step();
        !self.is_finished()
    }

    fn step(&mut self) {
        let tick = self.simulation.get_tick();
        while let Some(record) = self.replay.intents.get(self.intent_index) {
            if record.tick > tick {
                break;
            }
            if let Err(e) = self.simulation.set_intent(record.entity, record.intent) {
                tracing::warn!(tick = record.tick, entity = record.entity, error = %e, "Replay intent rejected");
            }
            self.intent_index += 1;
        }
        self.simulation.tick();
    }

    /// Seek to a specific tick.
    ///
    /// # Errors
    /// Returns an error if state restoration fails.
    pub fn seek(&mut self, target_tick: u64) -> Result<()> {
        // Reset to initial state
        self.simulation = self.replay.restore_initial_state()?;
        self.intent_index = 0;

        while self.simulation.get_tick() < target_tick && !self.is_finished() {
            self.step();
        }
        Ok(())
    }

    /// Get the current tick.
    #[must_use]
    pub const fn current_tick(&self) -> u64 {
        self.simulation.get_tick()
    }

    /// Get a reference to the current simulation state.
    #[must_use]
    pub const fn simulation(&self) -> &Simulation {
        &self.simulation
    }

    /// Get the replay being played.
    #[must_use]
    pub const fn replay(&self) -> &Replay {
        &self.replay
    }

    /// Check if the replay has finished.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.simulation.get_tick() >= self.replay.final_tick
    }

    /// Toggle pause state.
    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    /// Fraction of the replay played, from 0 to 1.
    #[must_use]
    pub fn progress(&self) -> f64 {
        let total = self.replay.final_tick.saturating_sub(self.start_tick);
        if total == 0 {
            return 1.0;
        }
        let played = self.simulation.get_tick().saturating_sub(self.start_tick);
        played as f64 / total as f64
    }

    /// Play the whole replay and compare the final state hash.
    ///
    /// # Errors
    /// Returns [`GameError::ReplayDiverged`] if playback does not reproduce
    /// the recorded hash.
    pub fn verify(&mut self) -> Result<u64> {
        self.seek(self.replay.final_tick)?;
        let actual = self.simulation.state_hash();
        if actual == self.replay.final_hash {
            Ok(actual)
        } else {
            Err(GameError::ReplayDiverged {
                tick: self.simulation.get_tick(),
                expected: self.replay.final_hash,
                actual,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{Controller, PlayerController};
    use crate::data::{GunStats, WeaponCatalog, WeaponConfig};
    use crate::entity::EntitySpawnParams;
    use crate::factions::Faction;
    use crate::magazine::SimpleMag;
    use crate::math::{Fixed, Vec2Fixed};
    use crate::projectile::ProjectileSpec;
    use crate::stats::StatBlock;

    fn create_test_simulation() -> (Simulation, EntityId) {
        let catalog = WeaponCatalog::from(vec![WeaponConfig::new(
            "smg",
            GunStats {
                burst_delay: Fixed::from_num(0.1),
                spread: Fixed::from_num(10),
                accuracy: Fixed::from_num(0.5),
                equip_delay: Fixed::ZERO,
                ..GunStats::default()
            },
            SimpleMag::new(ProjectileSpec::default(), 20),
        )]);
        let mut sim = Simulation::new(catalog, 12345);
        let player = sim.spawn_entity(EntitySpawnParams {
            faction: Faction::Player,
            stats: StatBlock::with_health(Fixed::from_num(100)),
            controller: Controller::Player(PlayerController::default()),
            speed: Fixed::from_num(3),
            ..Default::default()
        });
        sim.spawn_entity(EntitySpawnParams {
            faction: Faction::Enemy,
            position: Vec2Fixed::from_num(8, 1),
            stats: StatBlock::with_health(Fixed::from_num(40)),
            ..Default::default()
        });
        sim.pickup_weapon(player, "smg").unwrap();
        (sim, player)
    }

    fn record_session() -> Replay {
        let (mut sim, player) = create_test_simulation();
        let mut replay = Replay::new("test_scenario", &sim).unwrap();

        for tick in 0..120_u64 {
            if tick % 30 == 0 {
                let intent = Intent {
                    action1: tick % 60 == 0,
                    movement: Vec2Fixed::from_num(0, 1),
                    aim: Some(Vec2Fixed::from_num(8, 1)),
                    ..Intent::default()
                };
                sim.set_intent(player, intent).unwrap();
                replay.record_intent(sim.get_tick(), player, intent);
            }
            sim.tick();
        }
        replay.finalize(&sim);
        replay
    }

    #[test]
    fn test_replay_create() {
        let (sim, _) = create_test_simulation();
        let replay = Replay::new("test_scenario", &sim).unwrap();
        assert_eq!(replay.version, REPLAY_VERSION);
        assert_eq!(replay.scenario_id, "test_scenario");
        assert_eq!(replay.seed, 12345);
        assert!(replay.intents.is_empty());
    }

    #[test]
    fn test_replay_record_intents() {
        let replay = record_session();
        assert_eq!(replay.intent_count(), 4);
        assert_eq!(replay.intents_at_tick(30).len(), 1);
        assert_eq!(replay.intents_at_tick(31).len(), 0);
        assert_eq!(replay.duration(), 120);
    }

    #[test]
    fn test_replay_verify_matches() {
        let replay = record_session();
        let expected = replay.final_hash;
        let mut player = ReplayPlayer::new(replay).unwrap();
        assert_eq!(player.verify().unwrap(), expected);
        assert!(player.is_finished());
        assert!((player.progress() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_replay_detects_divergence() {
        let mut replay = record_session();
        replay.intents.pop();
        let mut player = ReplayPlayer::new(replay).unwrap();
        assert!(matches!(
            player.verify(),
            Err(GameError::ReplayDiverged { tick: 120, .. })
        ));
    }

    #[test]
    fn test_replay_save_load() {
        let replay = record_session();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.replay");

        replay.save(&path).unwrap();
        let loaded = Replay::load(&path).unwrap();
        assert_eq!(loaded.scenario_id, "test_scenario");
        assert_eq!(loaded.intents, replay.intents);
        assert_eq!(loaded.final_hash, replay.final_hash);
    }

    #[test]
    fn test_replay_version_mismatch() {
        let mut replay = record_session();
        replay.version = REPLAY_VERSION + 1;
        let bytes = replay.to_bytes().unwrap();
        assert!(matches!(
            Replay::from_bytes(&bytes),
            Err(GameError::InvalidState(_))
        ));
    }

    #[test]
    fn test_replay_player_pause_and_seek() {
        let replay = record_session();
        let mut player = ReplayPlayer::new(replay).unwrap();
        player.toggle_pause();
        assert!(player.advance());
        assert_eq!(player.current_tick(), 0);

        player.toggle_pause();
        assert!(player.advance());
        assert_eq!(player.current_tick(), 1);

        player.seek(60).unwrap();
        assert_eq!(player.current_tick(), 60);
        assert_eq!(player.replay().duration(), 120);
        assert!(!player.is_finished());
    }
}
