//! Reproducibility testing utilities.
//!
//! Provides a harness for verifying that an encounter produces identical
//! results given identical inputs.
//!
//! # Testing Strategy
//!
//! Encounters are reproducible for a given seed. Sources of divergence:
//!
//! - **Floating-point math**: we use fixed-point arithmetic via
//!   [`arena_core::math::Fixed`] throughout.
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   Sessions always iterate combatants in sorted id order.
//!
//! - **System randomness**: every roll comes from the session's seeded
//!   `ChaCha8Rng`.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: individual archetype behaviour
//! 2. **Property tests**: random damage sequences keep invariants
//! 3. **Integration tests**: scripted encounters are reproducible

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use arena_core::prelude::*;

use crate::fixtures::frame_dt;

/// Result of a reproducibility test.
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
    /// Get all unique hashes (should be 1 for a reproducible encounter).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that every run matched, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Encounter is not reproducible!\n\
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

/// Run a setup several times and verify every run ends in the same state.
///
/// # Arguments
///
/// * `runs` - Number of times to run
/// * `ticks` - Number of ticks per run
/// * `setup` - Function to create the initial state
/// * `step` - Function to advance by one tick (receives the tick index)
/// * `hash` - Function to compute the state hash
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S, u64),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for tick in 0..ticks {
            step(&mut state, tick);
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

/// Simplified check for an [`EncounterSession`] against a stationary player.
///
/// Runs the session twice with identical setup and compares final hashes.
///
/// # Example
///
/// ```
/// use arena_test_utils::determinism::verify_session_determinism;
/// use arena_test_utils::fixtures::{manop_session, player_at};
///
/// assert!(verify_session_determinism(|| manop_session(3).0, &player_at(0, 200), 200));
/// ```
pub fn verify_session_determinism<F>(setup_fn: F, player: &PlayerSnapshot, num_ticks: u64) -> bool
where
    F: Fn() -> EncounterSession,
{
    let result = verify_determinism(
        2,
        num_ticks,
        &setup_fn,
        |session, _| {
            session.tick(frame_dt(), player, &mut NullHooks);
        },
        EncounterSession::state_hash,
    );
    result.is_deterministic
}

/// Compare two runs tick-by-tick, finding the first divergence.
///
/// # Returns
///
/// `None` if the runs match, `Some(tick)` if they diverge at that tick.
pub fn find_first_divergence<F>(setup_fn: F, player: &PlayerSnapshot, num_ticks: u64) -> Option<u64>
where
    F: Fn() -> EncounterSession,
{
    let mut a = setup_fn();
    let mut b = setup_fn();

    if a.state_hash() != b.state_hash() {
        return Some(0);
    }

    for tick in 1..=num_ticks {
        a.tick(frame_dt(), player, &mut NullHooks);
        b.tick(frame_dt(), player, &mut NullHooks);

        if a.state_hash() != b.state_hash() {
            return Some(tick);
        }
    }

    None
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for encounter testing.
pub mod strategies {
    use arena_core::prelude::*;
    use proptest::prelude::*;

    /// Raw damage values as a host might send them, including garbage.
    pub fn arb_raw_damage() -> impl Strategy<Value = f64> {
        prop_oneof![
            8 => 0.0f64..3000.0,
            1 => -500.0f64..0.0,
            1 => Just(f64::NAN),
            1 => Just(f64::INFINITY),
            1 => Just(f64::NEG_INFINITY),
        ]
    }

    /// A frame's worth of damage calls.
    pub fn arb_damage_burst() -> impl Strategy<Value = Vec<f64>> {
        prop::collection::vec(arb_raw_damage(), 0..4)
    }

    /// Damage bursts interleaved with frames.
    pub fn arb_damage_script(frames: usize) -> impl Strategy<Value = Vec<Vec<f64>>> {
        prop::collection::vec(arb_damage_burst(), 1..frames.max(2))
    }

    /// Player position within a typical arena.
    pub fn arb_player() -> impl Strategy<Value = PlayerSnapshot> {
        (-800i32..800, -800i32..800, any::<bool>()).prop_map(|(x, y, hidden)| PlayerSnapshot {
            hidden,
            ..PlayerSnapshot::at(Vec2Fixed::from_ints(x, y))
        })
    }

    /// Difficulty scalar between 1/3 and 3.
    pub fn arb_difficulty() -> impl Strategy<Value = Fixed> {
        (1i32..=9).prop_map(|thirds| Fixed::from_num(thirds) / Fixed::from_num(3))
    }

    /// Any archetype that can lead an encounter.
    pub fn arb_primary_kind() -> impl Strategy<Value = ArchetypeKind> {
        prop_oneof![Just(ArchetypeKind::KruManop), Just(ArchetypeKind::KruFirst)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{manop_session, player_at};

    #[test]
    fn test_compute_hash_stable() {
        assert_eq!(compute_hash(&42u64), compute_hash(&42u64));
        assert_ne!(compute_hash(&1u64), compute_hash(&2u64));
    }

    #[test]
    fn test_identical_sessions_do_not_diverge() {
        assert_eq!(find_first_divergence(|| manop_session(4).0, &player_at(0, 250), 300), None);
    }

    #[test]
    fn test_plain_counter_is_reproducible() {
        let result = verify_determinism(
            2,
            1,
            || 0u64,
            |state, _| *state += 1,
            |state| *state,
        );
        result.assert_deterministic();
        assert_eq!(result.unique_hashes().len(), 1);
    }
}
