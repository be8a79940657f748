use std::collections::BTreeMap;

use cell_invariants::InvariantId;

/// Result of running one scripted scenario: whether its numeric pass
/// criteria (§4.7) held, the metrics that decided it, and every invariant
/// checker (if any) that failed while the scenario ran.
#[derive(Debug)]
pub struct ScenarioOutcome {
    pub scenario: &'static str,
    pub passed: bool,
    pub metrics: BTreeMap<&'static str, f64>,
    pub invariant_violations: Vec<InvariantId>,
    pub notes: Vec<String>,
}

impl ScenarioOutcome {
    pub fn new(scenario: &'static str) -> Self {
        Self {
            scenario,
            passed: false,
            metrics: BTreeMap::new(),
            invariant_violations: Vec::new(),
            notes: Vec::new(),
        }
    }

    pub fn metric(mut self, key: &'static str, value: f64) -> Self {
        self.metrics.insert(key, value);
        self
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn finish(mut self, passed: bool) -> Self {
        self.passed = passed;
        self
    }
}
