//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the simulation
//! produces identical results given identical inputs.
//!
//! # Testing Strategy
//!
//! Replays and headless scenario runs are only useful if a seed and an intent
//! log reproduce a session exactly. Sources of non-determinism include:
//!
//! - **Floating-point math**: Different CPUs can produce different results.
//!   We use fixed-point arithmetic via [`arena_core::math::Fixed`] throughout.
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   We always iterate in sorted entity ID order.
//!
//! - **System randomness**: Spread, speed flux and reflections draw from the
//!   simulation's own seeded stream.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: Individual stages (damage, weapons, projectiles)
//! 2. **Property tests**: Random inputs must still produce deterministic outputs
//! 3. **Integration tests**: Full scenarios are reproducible
//! 4. **Parallel tests**: Running N simulations in parallel all match

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use arena_core::simulation::Simulation;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for deterministic simulation).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the simulation was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the simulation produced different hashes across runs.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Simulation is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a simulation multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the simulation
/// * `ticks` - Number of ticks to simulate per run
/// * `setup` - Function to create initial simulation state
/// * `step` - Function to advance simulation by one tick
/// * `hash` - Function to compute state hash
///
/// # Example
///
/// ```ignore
/// use arena_test_utils::determinism::verify_determinism;
/// use arena_test_utils::fixtures::duel_simulation;
///
/// let result = verify_determinism(
///     5,   // Run 5 times
///     100, // 100 ticks each
///     duel_simulation,
///     |sim| { sim.tick(); },
///     |sim| sim.state_hash(),
/// );
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..ticks {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Simplified determinism verification for [`Simulation`].
///
/// Runs the simulation twice with identical setup and verifies the final
/// state hashes match exactly.
pub fn verify_simulation_determinism<F>(setup_fn: F, num_ticks: u64) -> bool
where
    F: Fn() -> Simulation,
{
    let result = verify_determinism(
        2,
        num_ticks,
        &setup_fn,
        |sim| {
            sim.tick();
        },
        Simulation::state_hash,
    );
    result.is_deterministic
}

/// Run N simulations on scoped threads and collect final hashes.
///
/// Catches non-determinism that only shows up under thread scheduling or
/// memory layout differences.
///
/// # Panics
///
/// Panics if a simulation thread panics.
pub fn run_parallel_simulations<F>(setup_fn: F, num_sims: usize, num_ticks: u64) -> DeterminismResult
where
    F: Fn() -> Simulation + Sync,
{
    let hashes: Vec<u64> = thread::scope(|s| {
        let handles: Vec<_> = (0..num_sims)
            .map(|_| {
                s.spawn(|| {
                    let mut sim = setup_fn();
                    for _ in 0..num_ticks {
                        sim.tick();
                    }
                    sim.state_hash()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| match h.join() {
                Ok(hash) => hash,
                Err(_) => panic!("Simulation thread panicked"),
            })
            .collect()
    });

    DeterminismResult {
        is_deterministic: hashes.windows(2).all(|w| w[0] == w[1]),
        hashes,
        ticks: num_ticks,
    }
}

/// Compare two simulation runs tick-by-tick, finding first divergence.
///
/// # Returns
///
/// `None` if simulations are deterministic, `Some(tick)` if they diverge
/// at that tick.
pub fn find_first_divergence<F>(setup_fn: F, num_ticks: u64) -> Option<u64>
where
    F: Fn() -> Simulation,
{
    let mut sim1 = setup_fn();
    let mut sim2 = setup_fn();

    if sim1.state_hash() != sim2.state_hash() {
        return Some(0);
    }

    for tick in 1..=num_ticks {
        sim1.tick();
        sim2.tick();

        if sim1.state_hash() != sim2.state_hash() {
            tracing::debug!(tick, "Simulations diverged");
            return Some(tick);
        }
    }

    None
}

/// Verify that serialization round-trip preserves simulation state exactly,
/// and that the restored copy keeps tracking the original.
pub fn verify_serialization_determinism<F>(setup_fn: F, num_ticks: u64) -> bool
where
    F: Fn() -> Simulation,
{
    let mut sim = setup_fn();

    for _ in 0..num_ticks {
        sim.tick();
    }

    let Ok(bytes) = sim.serialize() else {
        return false;
    };
    let Ok(mut restored) = Simulation::deserialize(&bytes) else {
        return false;
    };

    if restored.state_hash() != sim.state_hash() {
        return false;
    }

    for _ in 0..num_ticks {
        sim.tick();
        restored.tick();
    }
    restored.state_hash() == sim.state_hash()
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for determinism testing.
///
/// These strategies generate random but reproducible inputs for
/// property-based testing of simulation determinism.
pub mod strategies {
    use arena_core::controller::{EquipRequest, Intent};
    use arena_core::math::{Fixed, Vec2Fixed};
    use arena_core::stats::{Element, ResistanceLevel, Resistances, StatBlock};
    use proptest::prelude::*;

    /// Generate a fixed-point coordinate inside a typical arena.
    ///
    /// Range: -20 to 20
    pub fn arb_fixed_position() -> impl Strategy<Value = Fixed> {
        (-2000i32..2000i32).prop_map(|n| Fixed::from_num(n) / Fixed::from_num(100))
    }

    /// Generate a fixed-point 2D vector for positions.
    pub fn arb_vec2_position() -> impl Strategy<Value = Vec2Fixed> {
        (arb_fixed_position(), arb_fixed_position()).prop_map(|(x, y)| Vec2Fixed::new(x, y))
    }

    /// Generate a unit direction from a whole-degree angle.
    pub fn arb_direction() -> impl Strategy<Value = Vec2Fixed> {
        (0i32..360i32).prop_map(|deg| Vec2Fixed::from_angle_deg(Fixed::from_num(deg)))
    }

    /// Generate damage amounts (0-200, in hundredths).
    pub fn arb_damage() -> impl Strategy<Value = Fixed> {
        (0i32..20_000i32).prop_map(|n| Fixed::from_num(n) / Fixed::from_num(100))
    }

    /// Generate pool capacities (0-200).
    pub fn arb_pool_max() -> impl Strategy<Value = Fixed> {
        (0i32..200i32).prop_map(Fixed::from_num)
    }

    /// Generate any element.
    pub fn arb_element() -> impl Strategy<Value = Element> {
        proptest::sample::select(Element::ALL.to_vec())
    }

    /// Generate any resistance level.
    pub fn arb_resistance_level() -> impl Strategy<Value = ResistanceLevel> {
        prop_oneof![
            Just(ResistanceLevel::VeryWeak),
            Just(ResistanceLevel::Weak),
            Just(ResistanceLevel::None),
            Just(ResistanceLevel::Resistant),
            Just(ResistanceLevel::VeryResistant),
        ]
    }

    /// Generate resistances for the elements the tests care about most.
    pub fn arb_resistances() -> impl Strategy<Value = Resistances> {
        (
            arb_resistance_level(),
            arb_resistance_level(),
            arb_resistance_level(),
            arb_resistance_level(),
        )
            .prop_map(|(basic, fire, plasma, electric)| Resistances {
                basic,
                fire,
                plasma,
                electric,
                ..Resistances::default()
            })
    }

    /// Generate a stat block with at least one point of health.
    pub fn arb_stat_block() -> impl Strategy<Value = StatBlock> {
        (
            (1i32..200i32).prop_map(Fixed::from_num),
            arb_pool_max(),
            arb_pool_max(),
            arb_resistances(),
        )
            .prop_map(|(health, armor, shields, resistances)| {
                StatBlock::with_health(health)
                    .armor(armor)
                    .shields(shields)
                    .resistances(resistances)
            })
    }

    /// Generate a player intent.
    pub fn arb_intent() -> impl Strategy<Value = Intent> {
        (
            any::<bool>(),
            any::<bool>(),
            proptest::option::of(arb_direction()),
            prop_oneof![Just(Vec2Fixed::ZERO), arb_direction()],
            proptest::option::of(prop_oneof![
                Just(EquipRequest::Next),
                Just(EquipRequest::Previous),
                (0usize..3).prop_map(EquipRequest::Slot),
            ]),
        )
            .prop_map(|(action1, action2, aim, movement, equip)| Intent {
                action1,
                action2,
                aim,
                movement,
                equip,
            })
    }

    /// Generate a sequence of `(tick offset, intent)` pairs.
    pub fn arb_intent_sequence(max_len: usize) -> impl Strategy<Value = Vec<(u64, Intent)>> {
        proptest::collection::vec((0u64..20u64, arb_intent()), 0..max_len)
    }
}

#[cfg(test)]
mod tests {
    use super::strategies::*;
    use super::*;
    use crate::fixtures::{duel_simulation, rifle_catalog, spawn_player, spawn_target, vec2};
    use arena_core::math::Fixed;
    use arena_core::stats::StatBlock;
    use proptest::prelude::*;

    fn firing_range() -> Simulation {
        let mut sim = Simulation::new(rifle_catalog(), 11);
        let player = spawn_player(&mut sim, vec2(-5.0, 0.0), "rifle");
        for y in [-1.0, 0.0, 1.0] {
            spawn_target(&mut sim, vec2(6.0, y), StatBlock::with_health(Fixed::from_num(25)));
        }
        let intent = arena_core::controller::Intent {
            action1: true,
            ..Default::default()
        };
        sim.set_intent(player, intent).unwrap();
        sim
    }

    #[test]
    fn test_verify_determinism_simple() {
        let result = verify_determinism(3, 100, || 0u64, |n| *n += 1, |n| *n);

        assert!(result.is_deterministic);
        assert_eq!(result.hashes, vec![100, 100, 100]);
        assert_eq!(result.unique_hashes(), vec![100]);
    }

    #[test]
    #[should_panic(expected = "non-deterministic")]
    fn test_assert_deterministic_panics_on_mismatch() {
        DeterminismResult {
            is_deterministic: false,
            hashes: vec![1, 2],
            ticks: 1,
        }
        .assert_deterministic();
    }

    #[test]
    fn test_empty_simulation_determinism() {
        assert!(verify_simulation_determinism(Simulation::default, 100));
    }

    #[test]
    fn test_firing_range_determinism() {
        assert!(verify_simulation_determinism(firing_range, 200));
        assert!(find_first_divergence(firing_range, 200).is_none());
    }

    #[test]
    fn test_duel_determinism() {
        let result = verify_determinism(
            3,
            300,
            duel_simulation,
            |sim| {
                sim.tick();
            },
            Simulation::state_hash,
        );
        result.assert_deterministic();
    }

    #[test]
    fn test_parallel_duels_match() {
        run_parallel_simulations(duel_simulation, 4, 200).assert_deterministic();
    }

    #[test]
    fn test_serialization_preserves_state() {
        assert!(verify_serialization_determinism(Simulation::default, 0));
        assert!(verify_serialization_determinism(firing_range, 40));
        assert!(verify_serialization_determinism(duel_simulation, 120));
    }

    #[test]
    fn test_compute_hash_stable() {
        assert_eq!(compute_hash(&(1u64, "a")), compute_hash(&(1u64, "a")));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_intent_sequences_are_deterministic(intents in arb_intent_sequence(12)) {
            let run = || {
                let mut sim = firing_range();
                let player = 1;
                for (wait, intent) in &intents {
                    sim.set_intent(player, *intent).unwrap();
                    for _ in 0..*wait {
                        sim.tick();
                    }
                }
                sim.state_hash()
            };
            prop_assert_eq!(run(), run());
        }
    }
}
