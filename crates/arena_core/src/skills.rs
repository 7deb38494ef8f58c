//! Per-skill cooldown bank.
//!
//! A bank holds one slot per skill in declared order. Selection walks the
//! slots in that order and picks the first ready skill that passes its own
//! chance roll, so declared order is the only tie-break. Cooldowns restart at
//! selection time, not when the skill finishes.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::{SkillConfig, DEFAULT_SKILL_COOLDOWN};
use crate::math::Fixed;

/// Named, independently cooled special attacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SkillId {
    /// Kru Manop: expanding shockwave around the boss.
    EquationSlam,
    /// Kru Manop: line attack toward the player.
    DeadlyGraph,
    /// Kru Manop: invulnerable heal into an attack bonus.
    Log457,
    /// Kru Manop (rider): knock-back cone.
    Bark,
    /// Kru Manop phase 3: summons goldfish.
    GoldfishSwarm,
    /// Kru Manop phase 3: slowing bubbles.
    BubblePrison,
    /// Kru First: leap onto a marked spot.
    FreeFall,
    /// Kru First: homing sandwich.
    SandwichToss,
    /// Kru First: grounding pulse.
    EmpPulse,
    /// Boss Dog: short dash.
    Lunge,
}

impl SkillId {
    /// Stable small integer for hashing.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }
}

/// Roll an independent chance. `chance >= 1` always passes, `chance <= 0` never does.
pub fn roll(rng: &mut impl RngCore, chance: Fixed) -> bool {
    Fixed::from_bits(i64::from(rng.next_u32())) < chance
}

/// Cooldown state for one skill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillSlot {
    /// Which skill.
    pub id: SkillId,
    /// Seconds until ready; zero means ready.
    pub remaining: Fixed,
    /// Full cooldown before scaling.
    pub max: Fixed,
    /// Independent selection chance.
    pub chance: Fixed,
    /// Locked skills are skipped entirely.
    pub enabled: bool,
}

impl SkillSlot {
    /// Whether the cooldown has elapsed.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.remaining <= Fixed::ZERO
    }
}

/// Ordered set of skill cooldowns for one combatant.
///
/// # Example
///
/// ```
/// use arena_core::math::Fixed;
/// use arena_core::skills::{SkillCooldownBank, SkillId};
/// use rand::SeedableRng;
/// use rand_chacha::ChaCha8Rng;
///
/// let mut bank = SkillCooldownBank::default();
/// bank.push(SkillId::Lunge, Fixed::from_num(4), Fixed::ONE);
///
/// let mut rng = ChaCha8Rng::seed_from_u64(7);
/// assert_eq!(bank.select(&mut rng, |_| true), Some(SkillId::Lunge));
/// assert_eq!(bank.select(&mut rng, |_| true), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillCooldownBank {
    slots: Vec<SkillSlot>,
    cooldown_scale: Fixed,
}

impl Default for SkillCooldownBank {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            cooldown_scale: Fixed::ONE,
        }
    }
}

impl SkillCooldownBank {
    /// Build a bank from balance entries, all skills starting ready.
    ///
    /// Entries without a cooldown get [`DEFAULT_SKILL_COOLDOWN`].
    #[must_use]
    pub fn from_config(entries: &[SkillConfig]) -> Self {
        let mut bank = Self::default();
        for entry in entries {
            let max = entry.cooldown.unwrap_or_else(|| {
                warn!(skill = ?entry.id, "skill has no cooldown configured, using default");
                DEFAULT_SKILL_COOLDOWN
            });
            bank.push(entry.id, max, entry.chance);
            bank.enable(entry.id, entry.enabled);
        }
        bank
    }

    /// Append a ready, enabled skill at the lowest priority.
    pub fn push(&mut self, id: SkillId, max: Fixed, chance: Fixed) {
        self.slots.push(SkillSlot {
            id,
            remaining: Fixed::ZERO,
            max: max.max(Fixed::ZERO),
            chance,
            enabled: true,
        });
    }

    /// Count every cooldown down by `dt`, floored at zero.
    pub fn tick(&mut self, dt: Fixed) {
        for slot in &mut self.slots {
            slot.remaining = (slot.remaining - dt).max(Fixed::ZERO);
        }
    }

    /// Pick at most one skill.
    ///
    /// Walks slots in declared order; a slot is eligible when enabled, ready
    /// and `precondition(id)` holds. Each eligible slot rolls its own chance and
    /// the first success wins. The winner's cooldown restarts immediately.
    pub fn select(
        &mut self,
        rng: &mut impl RngCore,
        mut precondition: impl FnMut(SkillId) -> bool,
    ) -> Option<SkillId> {
        let scale = self.cooldown_scale;
        for slot in &mut self.slots {
            if !slot.enabled || !slot.is_ready() || !precondition(slot.id) {
                continue;
            }
            if roll(rng, slot.chance) {
                slot.remaining = slot.max * scale;
                return Some(slot.id);
            }
        }
        None
    }

    /// Change a skill's selection chance.
    pub fn set_chance(&mut self, id: SkillId, chance: Fixed) {
        if let Some(slot) = self.slot_mut(id) {
            slot.chance = chance;
        }
    }

    /// Lock or unlock a skill.
    pub fn enable(&mut self, id: SkillId, enabled: bool) {
        if let Some(slot) = self.slot_mut(id) {
            slot.enabled = enabled;
        }
    }

    /// Scale applied to cooldowns restarted from now on.
    pub fn set_cooldown_scale(&mut self, scale: Fixed) {
        self.cooldown_scale = scale.max(Fixed::ZERO);
    }

    /// Current cooldown scale.
    #[must_use]
    pub fn cooldown_scale(&self) -> Fixed {
        self.cooldown_scale
    }

    /// Overwrite a skill's remaining cooldown.
    pub fn set_remaining(&mut self, id: SkillId, remaining: Fixed) {
        if let Some(slot) = self.slot_mut(id) {
            slot.remaining = remaining.max(Fixed::ZERO);
        }
    }

    /// Seconds until a skill is ready, `None` if the bank lacks it.
    #[must_use]
    pub fn remaining(&self, id: SkillId) -> Option<Fixed> {
        self.slot(id).map(|slot| slot.remaining)
    }

    /// Look up a slot.
    #[must_use]
    pub fn slot(&self, id: SkillId) -> Option<&SkillSlot> {
        self.slots.iter().find(|slot| slot.id == id)
    }

    fn slot_mut(&mut self, id: SkillId) -> Option<&mut SkillSlot> {
        self.slots.iter_mut().find(|slot| slot.id == id)
    }

    /// Slots in declared order.
    pub fn iter(&self) -> impl Iterator<Item = &SkillSlot> {
        self.slots.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::ratio;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(42)
    }

    fn bank(entries: &[(SkillId, i32, Fixed)]) -> SkillCooldownBank {
        let mut bank = SkillCooldownBank::default();
        for &(id, cd, chance) in entries {
            bank.push(id, Fixed::from_num(cd), chance);
        }
        bank
    }

    #[test]
    fn test_roll_extremes() {
        let mut rng = rng();
        for _ in 0..200 {
            assert!(roll(&mut rng, Fixed::ONE));
            assert!(!roll(&mut rng, Fixed::ZERO));
        }
    }

    #[test]
    fn test_declared_order_wins_ties() {
        let mut bank = bank(&[
            (SkillId::Log457, 26, Fixed::ONE),
            (SkillId::EquationSlam, 16, Fixed::ONE),
        ]);
        let mut rng = rng();
        assert_eq!(bank.select(&mut rng, |_| true), Some(SkillId::Log457));
        assert_eq!(bank.select(&mut rng, |_| true), Some(SkillId::EquationSlam));
        assert_eq!(bank.select(&mut rng, |_| true), None);
    }

    #[test]
    fn test_cooldown_restarts_at_selection() {
        let mut bank = bank(&[(SkillId::DeadlyGraph, 18, Fixed::ONE)]);
        let mut rng = rng();
        bank.select(&mut rng, |_| true);
        assert_eq!(bank.remaining(SkillId::DeadlyGraph), Some(Fixed::from_num(18)));
    }

    #[test]
    fn test_cooldown_gating_near_zero() {
        let mut bank = bank(&[(SkillId::EquationSlam, 5, Fixed::ONE)]);
        bank.set_remaining(SkillId::EquationSlam, ratio(1, 100));
        let mut rng = rng();

        let dt = ratio(1, 200);
        let mut picks = 0;
        for _ in 0..4 {
            bank.tick(dt);
            if bank.select(&mut rng, |_| true).is_some() {
                picks += 1;
            }
        }
        assert_eq!(picks, 1);
    }

    #[test]
    fn test_tick_floors_at_zero() {
        let mut bank = bank(&[(SkillId::Lunge, 1, Fixed::ONE)]);
        bank.set_remaining(SkillId::Lunge, ratio(1, 2));
        bank.tick(Fixed::from_num(3));
        assert_eq!(bank.remaining(SkillId::Lunge), Some(Fixed::ZERO));
    }

    #[test]
    fn test_precondition_and_locks_skip_without_rolling() {
        let mut bank = bank(&[
            (SkillId::Bark, 3, Fixed::ONE),
            (SkillId::GoldfishSwarm, 5, Fixed::ONE),
            (SkillId::EquationSlam, 16, Fixed::ONE),
        ]);
        bank.enable(SkillId::GoldfishSwarm, false);
        let mut rng = rng();
        let picked = bank.select(&mut rng, |id| id != SkillId::Bark);
        assert_eq!(picked, Some(SkillId::EquationSlam));
        assert_eq!(bank.remaining(SkillId::Bark), Some(Fixed::ZERO));
    }

    #[test]
    fn test_cooldown_scale_applies_on_next_selection() {
        let mut bank = bank(&[(SkillId::FreeFall, 10, Fixed::ONE)]);
        bank.set_cooldown_scale(ratio(1, 2));
        let mut rng = rng();
        bank.select(&mut rng, |_| true);
        assert_eq!(bank.remaining(SkillId::FreeFall), Some(Fixed::from_num(5)));
    }

    #[test]
    fn test_missing_cooldown_falls_back() {
        let entries = [SkillConfig {
            id: SkillId::Lunge,
            cooldown: None,
            chance: Fixed::ONE,
            enabled: true,
        }];
        let mut bank = SkillCooldownBank::from_config(&entries);
        let mut rng = rng();
        bank.select(&mut rng, |_| true);
        assert_eq!(bank.remaining(SkillId::Lunge), Some(DEFAULT_SKILL_COOLDOWN));
    }

    #[test]
    fn test_zero_chance_never_selected() {
        let mut bank = bank(&[(SkillId::EmpPulse, 1, Fixed::ZERO)]);
        let mut rng = rng();
        for _ in 0..100 {
            assert_eq!(bank.select(&mut rng, |_| true), None);
        }
    }
}
