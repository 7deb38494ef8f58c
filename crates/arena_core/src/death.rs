//! Terminal-state handling.
//!
//! Several damage calls can land on a combatant within one frame. The first
//! call that takes HP to zero closes the [`TerminalLatch`] before any reward or
//! cleanup work runs; every later call sees the closed latch and does nothing.

use serde::{Deserialize, Serialize};

use crate::archetypes::{ArchetypeKind, Role};
use crate::combatant::CombatantId;
use crate::math::{Fixed, Vec2Fixed};

/// One-shot guard around a combatant's death sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TerminalLatch {
    locked: bool,
}

impl TerminalLatch {
    /// An open latch.
    #[must_use]
    pub const fn new() -> Self {
        Self { locked: false }
    }

    /// Close the latch. Returns `true` only for the call that closed it.
    pub fn try_lock(&mut self) -> bool {
        if self.locked {
            return false;
        }
        self.locked = true;
        true
    }

    /// Whether the latch has been closed.
    #[must_use]
    pub const fn is_locked(&self) -> bool {
        self.locked
    }
}

/// What a damage call did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DamageOutcome {
    /// Nothing happened: non-positive amount, unknown target or already defeated.
    Ignored,
    /// Target was invulnerable; the hit was thrown away with feedback.
    Discarded,
    /// HP was reduced and the target survived.
    Applied {
        /// HP left after the hit.
        #[serde(with = "crate::math::decimal_serde")]
        remaining: Fixed,
    },
    /// This hit defeated the target.
    Defeated(DefeatReport),
}

impl DamageOutcome {
    /// Whether HP changed.
    #[must_use]
    pub fn landed(&self) -> bool {
        matches!(self, Self::Applied { .. } | Self::Defeated(_))
    }
}

/// Produced once per defeated combatant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefeatReport {
    /// Who fell.
    pub id: CombatantId,
    /// Archetype.
    pub kind: ArchetypeKind,
    /// Primary or auxiliary.
    pub role: Role,
    /// Where it fell.
    pub position: Vec2Fixed,
    /// Reward dispatched (`base_reward × difficulty`).
    #[serde(with = "crate::math::decimal_serde")]
    pub reward: Fixed,
    /// Whether this defeat hands control to wave progression.
    pub advances_wave: bool,
}

/// Turn a raw damage value into a safe fixed-point amount.
///
/// Non-finite and non-positive inputs become zero; values beyond the
/// fixed-point range saturate.
///
/// ```
/// use arena_core::death::sanitize_damage;
/// use arena_core::math::Fixed;
///
/// assert_eq!(sanitize_damage(f64::NAN), Fixed::ZERO);
/// assert_eq!(sanitize_damage(-5.0), Fixed::ZERO);
/// assert_eq!(sanitize_damage(12.5), Fixed::from_num(12.5));
/// assert_eq!(sanitize_damage(1e300), Fixed::MAX);
/// ```
#[must_use]
pub fn sanitize_damage(raw: f64) -> Fixed {
    if !raw.is_finite() || raw <= 0.0 {
        return Fixed::ZERO;
    }
    Fixed::saturating_from_num(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latch_closes_once() {
        let mut latch = TerminalLatch::new();
        assert!(!latch.is_locked());
        assert!(latch.try_lock());
        assert!(!latch.try_lock());
        assert!(!latch.try_lock());
        assert!(latch.is_locked());
    }

    #[test]
    fn test_sanitize_rejects_garbage() {
        assert_eq!(sanitize_damage(f64::INFINITY), Fixed::ZERO);
        assert_eq!(sanitize_damage(f64::NEG_INFINITY), Fixed::ZERO);
        assert_eq!(sanitize_damage(0.0), Fixed::ZERO);
        assert_eq!(sanitize_damage(-0.0), Fixed::ZERO);
    }

    #[test]
    fn test_outcome_landed() {
        assert!(!DamageOutcome::Ignored.landed());
        assert!(!DamageOutcome::Discarded.landed());
        assert!(DamageOutcome::Applied {
            remaining: Fixed::ONE
        }
        .landed());
    }
}
