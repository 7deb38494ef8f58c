//! Wave progression.
//!
//! Consumes the deferred wave advance an encounter schedules when its boss
//! falls. Every `boss_every`-th wave is a boss wave; the boss encounter count
//! decides whether Kru Manop rides the dog and whether phase 3 is enabled.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::archetypes::ArchetypeKind;
use crate::config::WaveConfig;
use crate::encounter::SpawnSpec;
use crate::math::{decimal_serde, Fixed};
use crate::phase::PhaseFlags;

/// What a boss wave spawns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncounterPlan {
    /// 1-based boss encounter number.
    pub encounter: u32,
    /// Wave the boss appears on.
    pub wave: u32,
    /// HP and reward scalar (`wave / boss_every`).
    #[serde(with = "decimal_serde")]
    pub difficulty: Fixed,
    /// Kru Manop rides the dog.
    pub rider: bool,
    /// Phase 3 gate enabled.
    pub phase3: bool,
}

impl EncounterPlan {
    /// Spawn request for this plan's primary.
    #[must_use]
    pub fn spawn_spec(&self) -> SpawnSpec {
        let flags = PhaseFlags::BASE.with(2, true).with(3, self.phase3);
        SpawnSpec::primary(ArchetypeKind::KruManop)
            .with_difficulty(self.difficulty)
            .with_rider(self.rider)
            .with_phase_flags(flags)
    }
}

/// Result of advancing past a wave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaveOutcome {
    /// The run continues on this wave.
    NextWave(u32),
    /// The last wave was cleared.
    Victory,
}

/// Wave counter for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaveProgression {
    wave: u32,
    boss_encounters: u32,
    finished: bool,
    config: WaveConfig,
}

impl WaveProgression {
    /// Start at wave 1.
    #[must_use]
    pub fn new(config: WaveConfig) -> Self {
        Self {
            wave: 1,
            boss_encounters: 0,
            finished: false,
            config,
        }
    }

    /// Current wave, 1-based.
    #[must_use]
    pub fn wave(&self) -> u32 {
        self.wave
    }

    /// Boss encounters planned so far.
    #[must_use]
    pub fn boss_encounters(&self) -> u32 {
        self.boss_encounters
    }

    /// Whether the run was won.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Whether the current wave is a boss wave.
    #[must_use]
    pub fn is_boss_wave(&self) -> bool {
        let every = self.config.boss_every.max(1);
        !self.finished && self.wave % every == 0
    }

    /// Plan the boss for the current wave and count the encounter.
    ///
    /// Returns `None` on regular waves.
    pub fn plan_boss(&mut self) -> Option<EncounterPlan> {
        if !self.is_boss_wave() {
            return None;
        }
        self.boss_encounters += 1;
        let encounter = self.boss_encounters;
        let every = self.config.boss_every.max(1);
        let plan = EncounterPlan {
            encounter,
            wave: self.wave,
            difficulty: Fixed::from_num(self.wave) / Fixed::from_num(every),
            rider: encounter >= self.config.rider_from_encounter,
            phase3: encounter >= self.config.phase3_from_encounter,
        };
        debug!(?plan, "boss encounter planned");
        Some(plan)
    }

    /// Move past the current wave.
    pub fn advance(&mut self) -> WaveOutcome {
        if self.finished || self.wave >= self.config.max_waves {
            self.finished = true;
            info!(wave = self.wave, "final wave cleared");
            return WaveOutcome::Victory;
        }
        self.wave += 1;
        debug!(wave = self.wave, "wave advanced");
        WaveOutcome::NextWave(self.wave)
    }
}
