//! HP-gated phase transitions.
//!
//! A combatant starts in phase 1. Each configured gate moves it to a higher
//! phase the first time `hp / max_hp` drops strictly below the gate's
//! threshold. Phases never go back down, even if the combatant heals.

use serde::{Deserialize, Serialize};

use crate::config::PhaseGateConfig;
use crate::math::Fixed;

/// Which phases may be entered. Phase 1 is always enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhaseFlags(u8);

impl PhaseFlags {
    /// Only phase 1.
    pub const BASE: Self = Self(0b1);

    /// Every phase up to 8.
    pub const ALL: Self = Self(u8::MAX);

    /// Enable or disable `phase` (1..=8). Phase 1 cannot be disabled.
    #[must_use]
    pub fn with(self, phase: u8, enabled: bool) -> Self {
        let Some(bit) = Self::bit(phase) else {
            return self;
        };
        let bits = if enabled { self.0 | bit } else { self.0 & !bit };
        Self(bits | 0b1)
    }

    /// Whether `phase` may be entered.
    #[must_use]
    pub fn is_enabled(self, phase: u8) -> bool {
        Self::bit(phase).is_some_and(|bit| self.0 & bit != 0)
    }

    /// Flags taken from the gates' configured defaults.
    #[must_use]
    pub fn from_gates(gates: &[PhaseGateConfig]) -> Self {
        gates
            .iter()
            .fold(Self::BASE, |flags, gate| flags.with(gate.phase, gate.enabled))
    }

    fn bit(phase: u8) -> Option<u8> {
        if (1..=8).contains(&phase) {
            Some(1 << (phase - 1))
        } else {
            None
        }
    }
}

impl Default for PhaseFlags {
    fn default() -> Self {
        Self::BASE
    }
}

/// One HP gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseGate {
    /// Phase entered when the gate crosses.
    pub phase: u8,
    /// HP ratio the gate compares against (strictly below crosses).
    pub threshold: Fixed,
}

/// Tracks a combatant's phase against its HP gates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseController {
    current: u8,
    gates: Vec<PhaseGate>,
    flags: PhaseFlags,
}

impl PhaseController {
    /// Build a controller in phase 1. Gates are evaluated in ascending phase order.
    #[must_use]
    pub fn new(mut gates: Vec<PhaseGate>, flags: PhaseFlags) -> Self {
        gates.sort_by_key(|gate| gate.phase);
        Self {
            current: 1,
            gates,
            flags,
        }
    }

    /// Build a controller from balance gates.
    #[must_use]
    pub fn from_config(gates: &[PhaseGateConfig], flags: PhaseFlags) -> Self {
        Self::new(
            gates
                .iter()
                .map(|gate| PhaseGate {
                    phase: gate.phase,
                    threshold: gate.threshold,
                })
                .collect(),
            flags,
        )
    }

    /// Current phase (starts at 1).
    #[must_use]
    pub fn current(&self) -> u8 {
        self.current
    }

    /// Enablement flags.
    #[must_use]
    pub fn flags(&self) -> PhaseFlags {
        self.flags
    }

    /// Compare the HP ratio against every gate above the current phase.
    ///
    /// Returns the phases entered by this call in ascending order; each phase
    /// appears at most once over the controller's lifetime. Disabled gates are
    /// skipped without being compared.
    ///
    /// # Example
    ///
    /// ```
    /// use arena_core::math::Fixed;
    /// use arena_core::phase::{PhaseController, PhaseFlags, PhaseGate};
    ///
    /// let gates = vec![
    ///     PhaseGate { phase: 2, threshold: Fixed::from_num(0.5) },
    ///     PhaseGate { phase: 3, threshold: Fixed::from_num(0.25) },
    /// ];
    /// let mut phases = PhaseController::new(gates, PhaseFlags::ALL);
    ///
    /// // One big hit crosses both gates.
    /// let entered = phases.evaluate(Fixed::from_num(10), Fixed::from_num(100));
    /// assert_eq!(entered, vec![2, 3]);
    /// assert!(phases.evaluate(Fixed::from_num(100), Fixed::from_num(100)).is_empty());
    /// assert_eq!(phases.current(), 3);
    /// ```
    pub fn evaluate(&mut self, hp: Fixed, max_hp: Fixed) -> Vec<u8> {
        let mut entered = Vec::new();
        if max_hp <= Fixed::ZERO {
            return entered;
        }
        let hp_ratio = hp / max_hp;

        for gate in &self.gates {
            if gate.phase <= self.current || !self.flags.is_enabled(gate.phase) {
                continue;
            }
            if hp_ratio < gate.threshold {
                self.current = gate.phase;
                entered.push(gate.phase);
            }
        }
        entered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::ratio;

    fn two_gates(flags: PhaseFlags) -> PhaseController {
        PhaseController::new(
            vec![
                PhaseGate {
                    phase: 3,
                    threshold: ratio(1, 4),
                },
                PhaseGate {
                    phase: 2,
                    threshold: ratio(1, 2),
                },
            ],
            flags,
        )
    }

    fn hp(n: i32) -> Fixed {
        Fixed::from_num(n)
    }

    #[test]
    fn test_threshold_is_strict() {
        let mut phases = two_gates(PhaseFlags::ALL);
        assert!(phases.evaluate(hp(50), hp(100)).is_empty());
        assert_eq!(phases.evaluate(hp(49), hp(100)), vec![2]);
    }

    #[test]
    fn test_phase_never_decreases_after_heal() {
        let mut phases = two_gates(PhaseFlags::ALL);
        phases.evaluate(hp(40), hp(100));
        assert_eq!(phases.current(), 2);
        assert!(phases.evaluate(hp(100), hp(100)).is_empty());
        assert_eq!(phases.current(), 2);
        // Dropping below the same gate again does not re-fire it.
        assert!(phases.evaluate(hp(30), hp(100)).is_empty());
    }

    #[test]
    fn test_disabled_gate_is_inert() {
        let flags = PhaseFlags::BASE.with(2, true).with(3, false);
        let mut phases = two_gates(flags);
        assert_eq!(phases.evaluate(hp(1), hp(100)), vec![2]);
        assert_eq!(phases.current(), 2);
        assert!(phases.evaluate(hp(0), hp(100)).is_empty());
    }

    #[test]
    fn test_multi_gate_hit_enters_in_ascending_order() {
        let mut phases = two_gates(PhaseFlags::ALL);
        assert_eq!(phases.evaluate(hp(5), hp(100)), vec![2, 3]);
    }

    #[test]
    fn test_flags_keep_phase_one() {
        let flags = PhaseFlags::ALL.with(1, false);
        assert!(flags.is_enabled(1));
        assert!(!PhaseFlags::BASE.is_enabled(2));
        assert!(!PhaseFlags::ALL.is_enabled(9));
    }

    #[test]
    fn test_zero_max_hp_is_ignored() {
        let mut phases = two_gates(PhaseFlags::ALL);
        assert!(phases.evaluate(Fixed::ZERO, Fixed::ZERO).is_empty());
        assert_eq!(phases.current(), 1);
    }
}
