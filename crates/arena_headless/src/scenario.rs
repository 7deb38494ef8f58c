//! Scenario loading and configuration.
//!
//! A scenario describes one scripted duel: which boss (or a whole wave run),
//! how the scripted player behaves, how long to run, and optionally a balance
//! file overriding the shipped tables.

use std::path::{Path, PathBuf};

use arena_core::archetypes::ArchetypeKind;
use arena_core::config::EncounterConfig;
use arena_core::error::EncounterError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// Balance data or a spawn request was rejected by the engine.
    #[error("Encounter error: {0}")]
    Encounter(#[from] EncounterError),
    /// Scenario parsed but cannot be run.
    #[error("Invalid scenario: {0}")]
    Invalid(String),
}

/// Scenarios compiled into the binary, addressable by name.
const BUILTIN: &[(&str, &str)] = &[
    ("manop_duel", include_str!("../scenarios/manop_duel.ron")),
    ("rider_duel", include_str!("../scenarios/rider_duel.ron")),
    ("first_duel", include_str!("../scenarios/first_duel.ron")),
    ("wave_run", include_str!("../scenarios/wave_run.ron")),
];

/// What the session fights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EncounterSetup {
    /// A single boss.
    Duel {
        /// Boss archetype.
        boss: ArchetypeKind,
        /// HP and reward scalar.
        #[serde(default = "default_difficulty")]
        difficulty: f64,
        /// Kru Manop rides the dog.
        #[serde(default)]
        rider: bool,
        /// Enable the phase 3 gate.
        #[serde(default)]
        phase3: bool,
    },
    /// Regular waves are cleared instantly; every boss wave spawns the planned boss.
    Waves,
}

fn default_difficulty() -> f64 {
    1.0
}

impl Default for EncounterSetup {
    fn default() -> Self {
        Self::Duel {
            boss: ArchetypeKind::KruManop,
            difficulty: default_difficulty(),
            rider: false,
            phase3: false,
        }
    }
}

/// How the scripted player behaves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerScript {
    /// Anchor position.
    pub position: (i32, i32),
    /// Starting HP.
    pub hp: f64,
    /// Collision radius.
    pub radius: f64,
    /// Damage of each hit.
    pub hit_damage: f64,
    /// Ticks between hits.
    pub hit_interval: u32,
    /// Ticks between stagger attempts on the boss (0 = never).
    pub stagger_interval: u32,
    /// Sideways strafe amplitude around the anchor (0 = stand still).
    pub strafe: i32,
    /// Hit summoned auxiliaries before the boss.
    pub focus_auxiliaries: bool,
}

impl Default for PlayerScript {
    fn default() -> Self {
        Self {
            position: (0, 0),
            hp: 400.0,
            radius: 20.0,
            hit_damage: 40.0,
            hit_interval: 30,
            stagger_interval: 0,
            strafe: 0,
            focus_auxiliaries: false,
        }
    }
}

/// A complete scenario configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// What to fight.
    pub encounter: EncounterSetup,
    /// Scripted player.
    pub player: PlayerScript,
    /// Simulation ticks per second.
    pub tick_rate: u32,
    /// Give up after this many ticks.
    pub max_ticks: u64,
    /// Seed used when the command line does not give one.
    pub seed: u64,
    /// Balance file overriding the shipped tables.
    pub balance: Option<PathBuf>,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            name: "Default Duel".to_string(),
            description: "Kru Manop against a stationary player".to_string(),
            encounter: EncounterSetup::default(),
            player: PlayerScript::default(),
            tick_rate: 60,
            max_ticks: 60 * 60 * 5,
            seed: 0,
            balance: None,
        }
    }
}

impl Scenario {
    /// Load a scenario from a RON file.
    ///
    /// A relative `balance` path is resolved against the scenario's directory.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        let mut scenario = Self::from_ron_str(&contents)?;
        if let (Some(balance), Some(dir)) = (&scenario.balance, path.parent()) {
            if balance.is_relative() {
                scenario.balance = Some(dir.join(balance));
            }
        }
        Ok(scenario)
    }

    /// Load from a RON string (useful for embedded scenarios).
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = ron::from_str(ron)?;
        Ok(scenario)
    }

    /// A built-in scenario by name.
    pub fn builtin(name: &str) -> Option<Result<Self, ScenarioError>> {
        BUILTIN
            .iter()
            .find(|(builtin, _)| *builtin == name)
            .map(|(_, text)| Self::from_ron_str(text))
    }

    /// Names of the built-in scenarios.
    pub fn builtin_names() -> impl Iterator<Item = &'static str> {
        BUILTIN.iter().map(|(name, _)| *name)
    }

    /// Resolve a command-line argument: an existing file, else a built-in name.
    pub fn resolve(arg: &str) -> Result<Self, ScenarioError> {
        let path = Path::new(arg);
        if path.exists() {
            return Self::load(path);
        }
        Self::builtin(arg).unwrap_or_else(|| Err(ScenarioError::FileNotFound(arg.to_string())))
    }

    /// Balance tables for this scenario.
    pub fn encounter_config(&self) -> Result<EncounterConfig, ScenarioError> {
        let Some(path) = &self.balance else {
            return Ok(EncounterConfig::default());
        };
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let text = std::fs::read_to_string(path)?;
        let config = EncounterConfig::from_ron_str(&text, &path.display().to_string())?;
        for issue in config.validate() {
            tracing::warn!(%issue, path = %path.display(), "balance issue");
        }
        Ok(config)
    }

    /// Reject values the runner cannot work with.
    pub fn check(&self) -> Result<(), ScenarioError> {
        if self.tick_rate == 0 {
            return Err(ScenarioError::Invalid("tick_rate must be positive".to_string()));
        }
        if self.player.hit_interval == 0 {
            return Err(ScenarioError::Invalid(
                "player.hit_interval must be positive".to_string(),
            ));
        }
        if !self.player.hp.is_finite() || self.player.hp <= 0.0 {
            return Err(ScenarioError::Invalid("player.hp must be positive".to_string()));
        }
        if !self.player.radius.is_finite() || self.player.radius < 0.0 {
            return Err(ScenarioError::Invalid(
                "player.radius must be non-negative".to_string(),
            ));
        }
        if let EncounterSetup::Duel { difficulty, .. } = self.encounter {
            if !difficulty.is_finite() || difficulty <= 0.0 {
                return Err(ScenarioError::Invalid(format!(
                    "difficulty must be positive, got {difficulty}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_parse() {
        for name in Scenario::builtin_names() {
            let scenario = Scenario::builtin(name).unwrap().unwrap();
            assert!(scenario.check().is_ok(), "{name}");
            assert!(!scenario.name.is_empty());
        }
    }

    #[test]
    fn test_unknown_builtin() {
        assert!(Scenario::builtin("nope").is_none());
        assert!(matches!(
            Scenario::resolve("nope"),
            Err(ScenarioError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_partial_scenario_uses_defaults() {
        let scenario =
            Scenario::from_ron_str("(name: \"short\", encounter: Duel(boss: KruFirst))").unwrap();
        assert_eq!(scenario.name, "short");
        assert_eq!(scenario.tick_rate, 60);
        assert_eq!(
            scenario.encounter,
            EncounterSetup::Duel {
                boss: ArchetypeKind::KruFirst,
                difficulty: 1.0,
                rider: false,
                phase3: false,
            }
        );
    }

    #[test]
    fn test_check_rejects_bad_values() {
        let mut scenario = Scenario::default();
        scenario.tick_rate = 0;
        assert!(matches!(scenario.check(), Err(ScenarioError::Invalid(_))));

        let mut scenario = Scenario::default();
        scenario.encounter = EncounterSetup::Duel {
            boss: ArchetypeKind::KruManop,
            difficulty: 0.0,
            rider: false,
            phase3: false,
        };
        assert!(matches!(scenario.check(), Err(ScenarioError::Invalid(_))));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            Scenario::load("/definitely/not/here.ron"),
            Err(ScenarioError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_default_balance_without_file() {
        let config = Scenario::default().encounter_config().unwrap();
        assert_eq!(config, EncounterConfig::default());
    }
}
