pub mod checkers;
pub mod runner;

pub use checkers::{evaluate_all, InvariantId, InvariantSnapshot};
pub use runner::{Counterexample, InvariantRunner, TrialHarness};
