//! # Arena Test Utilities
//!
//! Shared testing utilities for all crates:
//! - Reproducibility test harness
//! - Session and player fixtures
//! - Recording collaborator hooks
//! - Property-based testing strategies

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod determinism;
pub mod fixtures;
pub mod hooks;

/// Re-export proptest for convenience.
pub use proptest;
