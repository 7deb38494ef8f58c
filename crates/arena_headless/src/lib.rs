//! Headless encounter runner for balance checks and CI verification.
//!
//! Runs scripted duels against the encounter engine with no graphics:
//!
//! - **Balance checks**: batch-run a scenario across many seeds
//! - **CI verification**: same scenario and seed must give the same state hash
//! - **Data checks**: validate balance files before they ship
//!
//! # Protocol
//!
//! Output uses JSON lines (one JSON object per line):
//!
//! - **stdout**: Frames (ready, events, state, finished)
//! - **stderr**: Debug logs (human-readable)
//!
//! See [`protocol`] module for the frame types.
//!
//! # Example
//!
//! ```bash
//! # Run a built-in duel
//! cargo run -p arena_headless -- run manop_duel
//!
//! # Verify determinism
//! cargo run -p arena_headless -- verify scenarios/rider_duel.ron --runs 3
//!
//! # Batch 200 seeds
//! cargo run -p arena_headless -- batch wave_run --count 200 --output results
//! ```

pub mod batch;
pub mod protocol;
pub mod runner;
pub mod scenario;

pub use batch::{
    run_batch, verify_determinism, BatchConfig, BatchResults, BatchSummary, VerifyReport,
};
pub use protocol::{DuelOutcome, DuelReport, Frame};
pub use runner::{DuelHooks, DuelRunner, RunnerOptions};
pub use scenario::{EncounterSetup, PlayerScript, Scenario, ScenarioError};
