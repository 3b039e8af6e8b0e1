//! Conformance harness for libcbind.
//!
//! This crate provides:
//! - Fixtures: JSON case sets describing binding calls and their expected effect
//! - Probe: a child process that makes the calls, so stdout can be captured
//! - Runner: executes fixture cases and compares output and return values
//! - Structured logging: JSONL records for every verification run

#![forbid(unsafe_code)]

pub mod diff;
pub mod error;
pub mod fixtures;
pub mod probe;
pub mod runner;
pub mod structured_log;
pub mod verify;

pub use error::HarnessError;
pub use fixtures::{FixtureCase, FixtureSet, ProbeArg};
pub use probe::{Probe, ProbeOutput};
pub use runner::TestRunner;
pub use verify::{VerificationResult, VerificationSummary};
