//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `RunPhase`: the phase a crawl run is in (discover, fetch loop, final flush, done)
//! - `DetailOutcome`: what a single detail fetch produced

mod outcome;
mod run_phase;

// Re-export main types
pub use outcome::{DetailOutcome, OutcomeKind};
pub use run_phase::RunPhase;
