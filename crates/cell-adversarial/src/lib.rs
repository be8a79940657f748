//! Adversarial scenario harness (component C7): seven scripted attacks with
//! numeric pass/fail criteria (§4.7), each driven through the ordinary
//! command surface the other crates expose. Pairs with [`cell_invariants`]'s
//! property runner — scenarios check a handful of specific, named attacks;
//! the invariant runner checks everything, generically, forever.

pub mod outcome;
pub mod scenarios;
pub mod support;

pub use outcome::ScenarioOutcome;
pub use scenarios::{run_adv01, run_adv02, run_adv03, run_adv04, run_adv05, run_adv06, run_adv07};
