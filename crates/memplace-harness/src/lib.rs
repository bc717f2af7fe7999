//! # memplace-harness
//!
//! Runs the triad benchmark once per placement strategy.
//!
//! Provides:
//! - `HarnessConfig`: tolerance, RNG seed and fault injection
//! - `Phase` / `PhaseTrace`: the validated per-run state machine
//! - `Harness`: allocate → initialize → stage in → execute → stage out →
//!   verify → release, with faults contained to the strategy that raised them
//! - `StrategyReport` / `RunSummary`: timings, mismatches, faults and the
//!   aggregated exit status

pub mod config;
pub mod phase;
pub mod report;
pub mod harness;

pub use config::HarnessConfig;
pub use harness::Harness;
pub use phase::{Phase, PhaseTrace};
pub use report::{Fault, FaultKind, Outcome, RunSummary, StrategyReport};
