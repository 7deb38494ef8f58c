//! JSON lines emitted by the headless runner.
//!
//! Every line on stdout is one [`Frame`]; logs go to stderr.
//!
//! # Example Session
//!
//! ```text
//! <- {"type":"ready","version":"1.0","scenario":"Kru Manop Duel","seed":1}
//! <- {"type":"events","tick":1,"events":{"spawned":[1],...}}
//! <- {"type":"state","tick":60,"elapsed":1.0,"player":{...},"combatants":[...],"hash":...}
//! <- {"type":"events","tick":842,"events":{"phase_changes":[{"id":1,"phase":2}],...}}
//! <- {"type":"finished","report":{"outcome":"boss_defeated",...}}
//! ```

use std::collections::BTreeMap;

use arena_core::prelude::{CombatantView, EncounterEvents, SkillId};
use arena_core::wave::EncounterPlan;
use serde::{Deserialize, Serialize};

/// Protocol version written in the ready frame.
pub const PROTOCOL_VERSION: &str = "1.0";

/// One line of runner output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frame {
    /// Runner is about to start.
    Ready {
        version: String,
        scenario: String,
        seed: u64,
    },

    /// Wave progression picked a boss.
    BossPlanned { tick: u64, plan: EncounterPlan },

    /// A wave without a boss was skipped.
    WaveCleared { tick: u64, wave: u32 },

    /// Something happened this tick.
    Events { tick: u64, events: EncounterEvents },

    /// Periodic snapshot.
    State {
        tick: u64,
        elapsed: f64,
        player: PlayerState,
        combatants: Vec<CombatantView>,
        hash: u64,
    },

    /// The run is over.
    Finished { report: DuelReport },

    /// The run could not start.
    Error { message: String },
}

/// Scripted player as seen in state frames.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub x: f64,
    pub y: f64,
    pub hp: f64,
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuelOutcome {
    /// The duel's boss fell.
    BossDefeated,
    /// Every wave was cleared.
    Victory,
    /// The player ran out of HP.
    PlayerDefeated,
    /// `max_ticks` elapsed first.
    Timeout,
}

/// Summary of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuelReport {
    pub scenario: String,
    pub seed: u64,
    pub outcome: DuelOutcome,
    pub ticks: u64,
    pub elapsed_seconds: f64,
    pub player_hp_left: f64,
    pub damage_dealt: f64,
    pub damage_taken: f64,
    /// Hits thrown away by invulnerability.
    pub hits_discarded: u32,
    pub staggers_landed: u32,
    pub phase_changes: u32,
    pub defeats: u32,
    pub spawns: u32,
    pub self_destructs: u32,
    pub skills_used: BTreeMap<SkillId, u32>,
    pub projectiles_fired: u32,
    pub projectiles_hit: u32,
    pub statuses_applied: u32,
    pub knockbacks: u32,
    pub rewards: f64,
    pub pickups: u32,
    pub boss_encounters: u32,
    pub final_wave: u32,
    pub final_hash: u64,
    /// State hash after every tick, when requested.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hash_trace: Vec<u64>,
}

impl DuelReport {
    /// Empty report for a run about to start.
    pub fn new(scenario: &str, seed: u64) -> Self {
        Self {
            scenario: scenario.to_string(),
            seed,
            outcome: DuelOutcome::Timeout,
            ticks: 0,
            elapsed_seconds: 0.0,
            player_hp_left: 0.0,
            damage_dealt: 0.0,
            damage_taken: 0.0,
            hits_discarded: 0,
            staggers_landed: 0,
            phase_changes: 0,
            defeats: 0,
            spawns: 0,
            self_destructs: 0,
            skills_used: BTreeMap::new(),
            projectiles_fired: 0,
            projectiles_hit: 0,
            statuses_applied: 0,
            knockbacks: 0,
            rewards: 0.0,
            pickups: 0,
            boss_encounters: 0,
            final_wave: 0,
            final_hash: 0,
            hash_trace: Vec::new(),
        }
    }

    /// Fold one tick's events into the totals.
    pub fn record(&mut self, events: &EncounterEvents) {
        self.phase_changes += events.phase_changes.len() as u32;
        self.defeats += events.defeated.len() as u32;
        self.spawns += events.spawned.len() as u32;
        self.self_destructs += events.self_destructed.len() as u32;
        for used in &events.skills_used {
            *self.skills_used.entry(used.skill).or_default() += 1;
        }
    }

    /// Whether the player came out on top.
    pub fn player_won(&self) -> bool {
        matches!(self.outcome, DuelOutcome::BossDefeated | DuelOutcome::Victory)
    }
}

impl Frame {
    /// Create a ready frame.
    pub fn ready(scenario: &str, seed: u64) -> Self {
        Self::Ready {
            version: PROTOCOL_VERSION.to_string(),
            scenario: scenario.to_string(),
            seed,
        }
    }

    /// Create an error frame.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Serialize to JSON line (with newline).
    pub fn to_json_line(&self) -> String {
        let mut json = serde_json::to_string(self).unwrap_or_else(|e| {
            format!(
                r#"{{"type":"error","message":"Serialization failed: {}"}}"#,
                e
            )
        });
        json.push('\n');
        json
    }

    /// Parse from a JSON line.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
