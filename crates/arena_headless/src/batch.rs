//! Batch runner for balance checks.
//!
//! Runs one scenario across many seeds in parallel using rayon. Sessions
//! share nothing, so each worker builds its own.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::protocol::{DuelOutcome, DuelReport};
use crate::runner::{DuelRunner, RunnerOptions};
use crate::scenario::{Scenario, ScenarioError};

/// Configuration for a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Scenario file or built-in name
    pub scenario: String,
    /// Number of runs
    pub run_count: u32,
    /// Worker threads (0 = use rayon default)
    pub parallel: u32,
    /// First seed; run `i` uses `seed_start + i`
    pub seed_start: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            scenario: "manop_duel".to_string(),
            run_count: 100,
            parallel: 0,
            seed_start: 0,
        }
    }
}

impl BatchConfig {
    /// Create config for a specific scenario
    pub fn new(scenario: &str, run_count: u32) -> Self {
        Self {
            scenario: scenario.to_string(),
            run_count,
            ..Default::default()
        }
    }

    /// Set seed start
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed_start = seed;
        self
    }

    /// Set worker threads
    pub fn with_parallel(mut self, parallel: u32) -> Self {
        self.parallel = parallel;
        self
    }
}

/// A run that could not finish.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchError {
    /// Run index
    pub run_index: u32,
    /// Seed used
    pub seed: u64,
    /// Error message
    pub message: String,
}

/// Aggregate over every finished run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub runs: u32,
    pub outcomes: BTreeMap<String, u32>,
    pub player_win_rate: f64,
    pub mean_ticks: f64,
    pub mean_damage_taken: f64,
    pub mean_player_hp_left: f64,
    pub mean_hits_discarded: f64,
    pub mean_projectiles_hit: f64,
}

impl BatchSummary {
    /// Summarize a set of reports.
    pub fn from_reports(reports: &[DuelReport]) -> Self {
        if reports.is_empty() {
            return Self::default();
        }
        let n = reports.len() as f64;
        let mean = |f: fn(&DuelReport) -> f64| reports.iter().map(f).sum::<f64>() / n;

        let mut outcomes = BTreeMap::new();
        for report in reports {
            *outcomes.entry(outcome_name(report.outcome).to_string()).or_insert(0) += 1;
        }
        let wins = reports.iter().filter(|r| r.player_won()).count() as f64;

        Self {
            runs: reports.len() as u32,
            outcomes,
            player_win_rate: wins / n,
            mean_ticks: mean(|r| r.ticks as f64),
            mean_damage_taken: mean(|r| r.damage_taken),
            mean_player_hp_left: mean(|r| r.player_hp_left),
            mean_hits_discarded: mean(|r| f64::from(r.hits_discarded)),
            mean_projectiles_hit: mean(|r| f64::from(r.projectiles_hit)),
        }
    }
}

fn outcome_name(outcome: DuelOutcome) -> &'static str {
    match outcome {
        DuelOutcome::BossDefeated => "boss_defeated",
        DuelOutcome::Victory => "victory",
        DuelOutcome::PlayerDefeated => "player_defeated",
        DuelOutcome::Timeout => "timeout",
    }
}

/// Results from a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResults {
    /// Configuration used
    pub config: BatchConfig,
    /// Per-run reports, in seed order
    pub reports: Vec<DuelReport>,
    /// Aggregate summary
    pub summary: BatchSummary,
    /// Total runtime
    pub duration_seconds: f64,
    /// Errors encountered
    pub errors: Vec<BatchError>,
}

impl BatchResults {
    /// Save results to JSON file
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Load results from JSON file
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(std::io::Error::other)
    }

    /// Default file name inside an output directory.
    pub fn path_in(dir: &Path) -> PathBuf {
        dir.join("batch_results.json")
    }
}

/// Run a batch of duels across consecutive seeds.
pub fn run_batch(config: BatchConfig) -> Result<BatchResults, ScenarioError> {
    let start = Instant::now();
    let runner = DuelRunner::new(Scenario::resolve(&config.scenario)?)?.with_options(RunnerOptions {
        state_interval: 0,
        record_hashes: false,
    });

    info!(
        "Starting batch run: {} runs of '{}'",
        config.run_count, config.scenario
    );

    let completed = AtomicU32::new(0);
    let run_all = || -> Vec<Result<DuelReport, BatchError>> {
        (0..config.run_count)
            .into_par_iter()
            .map(|i| {
                let seed = config.seed_start.wrapping_add(u64::from(i));
                let result = runner.run_quiet(seed).map_err(|e| BatchError {
                    run_index: i,
                    seed,
                    message: e.to_string(),
                });
                let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                if done % 10 == 0 {
                    debug!("Progress: {}/{}", done, config.run_count);
                }
                result
            })
            .collect()
    };

    let results = if config.parallel > 0 {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallel as usize)
            .build()
        {
            Ok(pool) => pool.install(run_all),
            Err(e) => {
                warn!(error = %e, "Failed to build thread pool, using the global one");
                run_all()
            }
        }
    } else {
        run_all()
    };

    let mut reports = Vec::new();
    let mut errors = Vec::new();
    for result in results {
        match result {
            Ok(report) => reports.push(report),
            Err(error) => {
                warn!(seed = error.seed, message = %error.message, "Run failed");
                errors.push(error);
            }
        }
    }

    let summary = BatchSummary::from_reports(&reports);
    let duration_seconds = start.elapsed().as_secs_f64();
    info!(
        runs = reports.len(),
        failed = errors.len(),
        win_rate = summary.player_win_rate,
        "Batch finished"
    );

    Ok(BatchResults {
        config,
        reports,
        summary,
        duration_seconds,
        errors,
    })
}

/// Outcome of a reproducibility check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyReport {
    /// Runs compared
    pub runs: u32,
    /// Final state hash of each run
    pub final_hashes: Vec<u64>,
    /// First tick at which some run's hash differed from the first run's
    pub first_divergence: Option<u64>,
}

impl VerifyReport {
    /// Whether every run matched.
    pub fn is_deterministic(&self) -> bool {
        self.first_divergence.is_none() && self.final_hashes.windows(2).all(|w| w[0] == w[1])
    }
}

/// Run the same scenario and seed several times and compare per-tick hashes.
pub fn verify_determinism(
    scenario: Scenario,
    seed: u64,
    runs: u32,
) -> Result<VerifyReport, ScenarioError> {
    let runner = DuelRunner::new(scenario)?.with_options(RunnerOptions {
        state_interval: 0,
        record_hashes: true,
    });

    let reports = (0..runs.max(1))
        .map(|_| runner.run_quiet(seed))
        .collect::<Result<Vec<_>, _>>()?;

    let reference = &reports[0].hash_trace;
    let first_divergence = reports[1..]
        .iter()
        .filter_map(|report| {
            let len = reference.len().max(report.hash_trace.len());
            (0..len).find(|&i| reference.get(i) != report.hash_trace.get(i))
        })
        .min()
        .map(|i| i as u64 + 1);

    Ok(VerifyReport {
        runs: reports.len() as u32,
        final_hashes: reports.iter().map(|r| r.final_hash).collect(),
        first_divergence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_config_default() {
        let config = BatchConfig::default();
        assert_eq!(config.run_count, 100);
        assert_eq!(config.scenario, "manop_duel");
    }

    #[test]
    fn test_batch_config_builder() {
        let config = BatchConfig::new("first_duel", 500)
            .with_seed(12345)
            .with_parallel(2);
        assert_eq!(config.scenario, "first_duel");
        assert_eq!(config.run_count, 500);
        assert_eq!(config.seed_start, 12345);
        assert_eq!(config.parallel, 2);
    }

    #[test]
    fn test_summary_of_nothing() {
        assert_eq!(BatchSummary::from_reports(&[]), BatchSummary::default());
    }

    #[test]
    fn test_summary_counts_outcomes() {
        let mut won = DuelReport::new("duel", 1);
        won.outcome = DuelOutcome::BossDefeated;
        won.ticks = 100;
        let mut lost = DuelReport::new("duel", 2);
        lost.outcome = DuelOutcome::PlayerDefeated;
        lost.ticks = 300;

        let summary = BatchSummary::from_reports(&[won, lost]);
        assert_eq!(summary.runs, 2);
        assert_eq!(summary.outcomes["boss_defeated"], 1);
        assert_eq!(summary.outcomes["player_defeated"], 1);
        assert_eq!(summary.player_win_rate, 0.5);
        assert_eq!(summary.mean_ticks, 200.0);
    }

    #[test]
    fn test_unknown_scenario_fails_early() {
        assert!(run_batch(BatchConfig::new("no_such_scenario", 3)).is_err());
    }

    #[test]
    fn test_verify_report_detects_mismatch() {
        let report = VerifyReport {
            runs: 2,
            final_hashes: vec![1, 2],
            first_divergence: None,
        };
        assert!(!report.is_deterministic());
    }
}
