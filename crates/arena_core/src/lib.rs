//! # Arena Core
//!
//! Boss encounter engine for Chalk Arena.
//!
//! This crate contains **only** encounter logic:
//! - No rendering
//! - No IO
//! - No wall clock (time advances through `tick(dt)`)
//! - No system randomness (each session owns a seeded generator)
//! - No floating-point state (uses fixed-point)
//!
//! Everything the engine wants to happen in the outside world (projectiles,
//! particles, floating text, rewards, pickups) is requested through the
//! [`context::EncounterHooks`] trait, whose methods all default to no-ops.
//!
//! ## Crate Structure
//!
//! - [`skills`] - Per-skill cooldown bank and selection
//! - [`state_machine`] - State timers and staged skill timelines
//! - [`phase`] - HP-gated phase transitions
//! - [`death`] - Terminal latch and damage outcomes
//! - [`archetypes`] - Kru Manop, Kru First, Boss Dog, Goldfish
//! - [`encounter`] - The encounter session (tick / damage entry points)
//! - [`wave`] - Wave progression consuming boss defeats
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod archetypes;
pub mod combatant;
pub mod config;
pub mod context;
pub mod death;
pub mod encounter;
pub mod error;
pub mod math;
pub mod phase;
pub mod scheduler;
pub mod skills;
pub mod state_machine;
pub mod wave;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::archetypes::{ArchetypeKind, Role};
    pub use crate::combatant::{CombatantId, CombatantView, StateLabel};
    pub use crate::config::EncounterConfig;
    pub use crate::context::{
        AudioCue, EncounterHooks, NullHooks, PlayerSnapshot, PlayerStatus, ProjectileSpec,
        ProjectileVisual, Team,
    };
    pub use crate::death::{DamageOutcome, DefeatReport};
    pub use crate::encounter::{EncounterEvents, EncounterSession, SpawnSpec};
    pub use crate::error::{EncounterError, Result};
    pub use crate::math::{Fixed, Vec2Fixed};
    pub use crate::skills::SkillId;
    pub use crate::wave::{EncounterPlan, WaveOutcome, WaveProgression};
}
