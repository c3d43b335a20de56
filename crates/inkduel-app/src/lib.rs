//! InkDuel application shell.
//!
//! Currently hosts the transcript replay tool behind the `inkduel-replay` binary.

pub mod replay;

pub use replay::{ReplayError, ReplayOptions, ReplayResult, ReplaySummary, load_config, run};
