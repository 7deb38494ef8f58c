//! Headless encounter runner CLI.
//!
//! Usage:
//!   arena_headless run [SCENARIO]               # Scripted duel, JSON lines on stdout
//!   arena_headless verify SCENARIO --runs 3     # Same seed must give the same hashes
//!   arena_headless batch SCENARIO --count 100   # Many seeds in parallel, summary
//!   arena_headless validate BALANCE.ron         # Check a balance file
//!   arena_headless defaults                     # Print the shipped balance tables
//!
//! SCENARIO is a RON file path or a built-in name.
//!
//! Protocol:
//!   - stdout: JSON frames, one per line
//!   - stderr: Debug logs

use std::io::{self, Write};
use std::path::PathBuf;

use arena_core::config::EncounterConfig;
use arena_headless::batch::{run_batch, verify_determinism, BatchConfig, BatchResults};
use arena_headless::protocol::Frame;
use arena_headless::runner::{DuelRunner, RunnerOptions};
use arena_headless::scenario::Scenario;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "arena_headless")]
#[command(about = "Headless boss encounter runner for balance checks and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one scripted duel and print frames
    Run {
        /// Scenario file or built-in name
        #[arg(default_value = "manop_duel")]
        scenario: String,

        /// Seed (defaults to the scenario's)
        #[arg(long)]
        seed: Option<u64>,

        /// Emit a state frame every N ticks (0 = never)
        #[arg(long, default_value = "60")]
        state_every: u64,
    },

    /// Verify that a scenario is reproducible
    Verify {
        /// Scenario file or built-in name
        scenario: String,

        /// Seed (defaults to the scenario's)
        #[arg(long)]
        seed: Option<u64>,

        /// Number of runs to compare
        #[arg(short, long, default_value = "3")]
        runs: u32,
    },

    /// Run a scenario across many seeds
    Batch {
        /// Scenario file or built-in name
        scenario: String,

        /// Number of runs
        #[arg(short, long, default_value = "100")]
        count: u32,

        /// Worker threads (0 = all cores)
        #[arg(short, long, default_value = "0")]
        parallel: u32,

        /// First seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Directory for batch_results.json
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check a balance file
    Validate {
        /// Balance RON file
        file: PathBuf,
    },

    /// Print the shipped balance tables as RON
    Defaults,

    /// List built-in scenarios
    List,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging to stderr (stdout is for frames)
    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            log_level,
        ))
        .init();

    match cli.command {
        Some(Commands::Run {
            scenario,
            seed,
            state_every,
        }) => cmd_run(&scenario, seed, state_every),
        Some(Commands::Verify {
            scenario,
            seed,
            runs,
        }) => cmd_verify(&scenario, seed, runs),
        Some(Commands::Batch {
            scenario,
            count,
            parallel,
            seed,
            output,
        }) => cmd_batch(scenario, count, parallel, seed, output),
        Some(Commands::Validate { file }) => cmd_validate(&file),
        Some(Commands::Defaults) => cmd_defaults(),
        Some(Commands::List) => cmd_list(),
        None => cmd_run("manop_duel", None, 60),
    }
}

fn load_scenario(arg: &str) -> Scenario {
    match Scenario::resolve(arg) {
        Ok(scenario) => scenario,
        Err(e) => {
            print!("{}", Frame::error(e.to_string()).to_json_line());
            eprintln!("FATAL: {}", e);
            std::process::exit(1);
        }
    }
}

/// Run a single duel
fn cmd_run(scenario: &str, seed: Option<u64>, state_every: u64) {
    let scenario = load_scenario(scenario);
    let seed = seed.unwrap_or(scenario.seed);

    let runner = match DuelRunner::new(scenario) {
        Ok(runner) => runner.with_options(RunnerOptions {
            state_interval: state_every,
            record_hashes: false,
        }),
        Err(e) => {
            print!("{}", Frame::error(e.to_string()).to_json_line());
            eprintln!("FATAL: {}", e);
            std::process::exit(1);
        }
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let result = runner.run(seed, &mut |frame: &Frame| {
        if let Err(e) = out.write_all(frame.to_json_line().as_bytes()) {
            tracing::error!(error = %e, "Failed to write frame");
        }
    });
    out.flush().ok();

    if let Err(e) = result {
        eprintln!("FATAL: {}", e);
        std::process::exit(1);
    }
}

/// Verify same seed => same hashes
fn cmd_verify(scenario: &str, seed: Option<u64>, runs: u32) {
    let scenario = load_scenario(scenario);
    let seed = seed.unwrap_or(scenario.seed);
    tracing::info!(
        "Verifying determinism: {} with seed {} ({} runs)",
        scenario.name,
        seed,
        runs
    );

    match verify_determinism(scenario, seed, runs) {
        Ok(report) if report.is_deterministic() => {
            eprintln!(
                "PASS: All {} runs produced identical results (hash {:#018x})",
                report.runs,
                report.final_hashes.first().copied().unwrap_or_default()
            );
        }
        Ok(report) => {
            eprintln!("FAIL: Non-determinism detected!");
            if let Some(tick) = report.first_divergence {
                eprintln!("  First divergence at tick {}", tick);
            }
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("FATAL: {}", e);
            std::process::exit(1);
        }
    }
}

/// Run a batch of duels
fn cmd_batch(scenario: String, count: u32, parallel: u32, seed: u64, output: Option<PathBuf>) {
    let config = BatchConfig {
        scenario,
        run_count: count,
        parallel,
        seed_start: seed,
    };

    let results = match run_batch(config) {
        Ok(results) => results,
        Err(e) => {
            eprintln!("FATAL: {}", e);
            std::process::exit(1);
        }
    };

    if let Some(dir) = output {
        let path = BatchResults::path_in(&dir);
        if let Err(e) = results.save(&path) {
            tracing::error!(error = %e, path = %path.display(), "Failed to save results");
            eprintln!("FATAL: Failed to save results: {}", e);
            std::process::exit(1);
        }
        eprintln!("Results saved to: {}", path.display());
    }

    let summary = &results.summary;
    eprintln!("\n{}", "=".repeat(50));
    eprintln!("BATCH COMPLETE");
    eprintln!("{}", "=".repeat(50));
    eprintln!("Runs: {}", summary.runs);
    if !results.errors.is_empty() {
        eprintln!("Failed: {}", results.errors.len());
    }
    for (outcome, n) in &summary.outcomes {
        eprintln!("  {:<16} {}", outcome, n);
    }
    eprintln!("Player win rate: {:.1}%", summary.player_win_rate * 100.0);
    eprintln!("Mean duration: {:.0} ticks", summary.mean_ticks);
    eprintln!("Mean damage taken: {:.1}", summary.mean_damage_taken);
    eprintln!("Duration: {:.1}s", results.duration_seconds);

    match serde_json::to_string(summary) {
        Ok(json) => println!("{}", json),
        Err(e) => tracing::error!(error = %e, "Failed to serialize summary"),
    }
}

/// Check a balance file
fn cmd_validate(file: &PathBuf) {
    let text = match std::fs::read_to_string(file) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("FATAL: Cannot read '{}': {}", file.display(), e);
            std::process::exit(1);
        }
    };
    let config = match EncounterConfig::from_ron_str(&text, &file.display().to_string()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("FAIL: {}", e);
            std::process::exit(1);
        }
    };

    let issues = config.validate();
    if issues.is_empty() {
        eprintln!("PASS: {} is valid", file.display());
        return;
    }
    eprintln!("FAIL: {} issue(s) in {}", issues.len(), file.display());
    for issue in &issues {
        eprintln!("  {}", issue);
    }
    std::process::exit(1);
}

/// Print the default balance tables
fn cmd_defaults() {
    match EncounterConfig::default().to_ron_string() {
        Ok(ron) => println!("{}", ron),
        Err(e) => {
            eprintln!("FATAL: {}", e);
            std::process::exit(1);
        }
    }
}

/// List built-in scenarios
fn cmd_list() {
    for name in Scenario::builtin_names() {
        match Scenario::builtin(name) {
            Some(Ok(scenario)) => println!("{:<12} {}", name, scenario.description),
            _ => println!("{:<12} (unreadable)", name),
        }
    }
}
