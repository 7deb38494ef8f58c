//! Adversary archetypes.
//!
//! The set is closed: every combatant carries a [`Brain`] variant chosen by
//! its [`ArchetypeKind`] tag, and each variant implements [`Archetype`].

mod dog;
mod first;
mod goldfish;
mod manop;
#[cfg(test)]
pub(crate) mod testing;

use std::hash::Hasher;

use serde::{Deserialize, Serialize};

use crate::combatant::{Body, StateLabel};
use crate::config::EncounterConfig;
use crate::context::EncounterContext;
use crate::math::Fixed;

pub use dog::DogBrain;
pub use first::FirstBrain;
pub use goldfish::GoldfishBrain;
pub use manop::ManopBrain;

/// Archetype tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ArchetypeKind {
    /// Kru Manop, math teacher and dog rider.
    KruManop,
    /// Kru First, physics teacher.
    KruFirst,
    /// Summoned dog.
    BossDog,
    /// Kamikaze goldfish.
    Goldfish,
}

impl ArchetypeKind {
    /// Every archetype.
    pub const ALL: [Self; 4] = [Self::KruManop, Self::KruFirst, Self::BossDog, Self::Goldfish];

    /// Field name in [`EncounterConfig`].
    #[must_use]
    pub const fn config_key(self) -> &'static str {
        match self {
            Self::KruManop => "manop",
            Self::KruFirst => "first",
            Self::BossDog => "dog",
            Self::Goldfish => "goldfish",
        }
    }

    /// Name shown on the boss bar.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::KruManop => "KRU MANOP",
            Self::KruFirst => "KRU FIRST",
            Self::BossDog => "BOSS DOG",
            Self::Goldfish => "GOLDFISH",
        }
    }

    /// Stable small integer for hashing.
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }
}

/// Whether a combatant leads its encounter or was summoned into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// The boss; its defeat advances the wave.
    Primary,
    /// Summoned mid-fight; dismissed with its summoner.
    Auxiliary,
}

/// Behaviour of one archetype.
pub trait Archetype {
    /// Label of the current state.
    fn label(&self) -> StateLabel;

    /// Seconds in the current state.
    fn state_timer(&self) -> Fixed;

    /// One-time setup after the body is built.
    fn on_spawn(&mut self, _body: &mut Body) {}

    /// Advance one frame. Phases and cooldowns have already been updated.
    fn tick(&mut self, body: &mut Body, ctx: &mut EncounterContext<'_>);

    /// Apply the one-shot effect of entering `phase`.
    fn on_phase_entered(&mut self, _phase: u8, _body: &mut Body, _ctx: &mut EncounterContext<'_>) {}

    /// Counter-mechanic: force the disabled state. Returns `false` if resisted.
    fn stagger(&mut self, _body: &mut Body, _ctx: &mut EncounterContext<'_>) -> bool {
        false
    }

    /// Death cosmetics. The latch is already closed and the reward dispatched.
    fn on_defeated(&mut self, _body: &mut Body, _ctx: &mut EncounterContext<'_>) {}

    /// Feed archetype-private state into a reproducibility hash.
    fn hash_state(&self, state: &mut dyn Hasher);
}

/// Archetype state, dispatched by tag.
#[derive(Debug, Clone)]
pub enum Brain {
    /// Kru Manop.
    Manop(ManopBrain),
    /// Kru First.
    First(FirstBrain),
    /// Boss Dog.
    Dog(DogBrain),
    /// Goldfish.
    Goldfish(GoldfishBrain),
}

impl Brain {
    /// Fresh brain for `kind`.
    #[must_use]
    pub fn new(kind: ArchetypeKind, config: &EncounterConfig) -> Self {
        let interval = config.session.chase_eval_interval;
        match kind {
            ArchetypeKind::KruManop => Self::Manop(ManopBrain::new(interval)),
            ArchetypeKind::KruFirst => Self::First(FirstBrain::new(interval)),
            ArchetypeKind::BossDog => Self::Dog(DogBrain::new(interval)),
            ArchetypeKind::Goldfish => Self::Goldfish(GoldfishBrain::new()),
        }
    }

    /// Shared view of the variant.
    #[must_use]
    pub fn archetype(&self) -> &dyn Archetype {
        match self {
            Self::Manop(brain) => brain,
            Self::First(brain) => brain,
            Self::Dog(brain) => brain,
            Self::Goldfish(brain) => brain,
        }
    }

    /// Mutable view of the variant.
    pub fn archetype_mut(&mut self) -> &mut dyn Archetype {
        match self {
            Self::Manop(brain) => brain,
            Self::First(brain) => brain,
            Self::Dog(brain) => brain,
            Self::Goldfish(brain) => brain,
        }
    }
}

/// Shared pursuit-state timing: evaluate skills every interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct EvalClock {
    interval: Fixed,
    next_at: Fixed,
}

impl EvalClock {
    pub(crate) fn new(interval: Fixed) -> Self {
        Self {
            interval,
            next_at: interval,
        }
    }

    /// Whether a pursuit timer of `elapsed` has reached the next evaluation.
    pub(crate) fn due(&self, elapsed: Fixed) -> bool {
        elapsed >= self.next_at
    }

    /// Schedule the next evaluation one interval out, plus `extra`.
    pub(crate) fn rearm(&mut self, extra: Fixed) {
        self.next_at = self.interval + extra.max(Fixed::ZERO);
    }

    pub(crate) fn next_at(&self) -> Fixed {
        self.next_at
    }
}
