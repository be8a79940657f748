//! Protocol-wide tunables, grouped by concern rather than collected into one
//! flat list.

// ── Credit limits ────────────────────────────────────────────────────────────

/// Default per-member credit limit `L_default`, used by the scenario fixtures
/// in §8 of the specification and by the default operation generator config.
pub const DEFAULT_MEMBER_LIMIT: i128 = 100;

/// Maximum per-interval change permitted to any member's limit (η in the
/// spec's glossary). The core enforces only the non-negativity/floor-safety
/// side of a limit adjustment; the caller is responsible for metering this.
pub const ETA_MAX_LIMIT_DELTA_PER_INTERVAL: i128 = 20;

// ── Admission ────────────────────────────────────────────────────────────────

/// Probation-limit factor applied by the admission collaborator when a
/// PROBATION member initiates an outflow. Left as a default only; per the
/// spec's open question, its domain and enforcement point belong to the
/// admission collaborator, not the core.
pub const PROBATION_LIMIT_FACTOR_DEFAULT: f64 = 0.25;

// ── Operation generator defaults (C5) ────────────────────────────────────────

pub const GEN_WEIGHT_TRANSACTION: u32 = 50;
pub const GEN_WEIGHT_CREATE_COMMITMENT: u32 = 20;
pub const GEN_WEIGHT_FULFILL_COMMITMENT: u32 = 15;
pub const GEN_WEIGHT_LIMIT_ADJUST: u32 = 5;
pub const GEN_WEIGHT_ADD_MEMBER: u32 = 5;
pub const GEN_WEIGHT_REMOVE_MEMBER: u32 = 5;

// ── Adversarial scenario defaults (C7) ───────────────────────────────────────

pub const ADV01_MEMBER_COUNT: usize = 80;
pub const ADV01_ATTACKER_FRACTION: f64 = 0.2;
pub const ADV01_DEFECTION_TICK: u64 = 50;
pub const ADV01_HONEST_SURVIVAL_MIN: f64 = 0.7;

pub const ADV02_SYBIL_ADMIT_CAP: usize = 5;
pub const ADV03_RING_SIZE_DEFAULT: usize = 6;

/// ADV-03: per-period limit delta ceiling, reusing η from the glossary.
pub const ADV03_ETA: i128 = ETA_MAX_LIMIT_DELTA_PER_INTERVAL;

/// ADV-03: `L_max`, the ceiling any single colluder's limit may reach.
pub const ADV03_L_MAX: i128 = 300;

/// ADV-04: fraction the external parameter must drop by to trip panic mode.
pub const ADV04_SHOCK_DROP_FRACTION: f64 = 0.6;

/// ADV-04: ticks allowed to recover (panic flag cleared) after a shock.
pub const ADV04_RECOVERY_WINDOW_TICKS: u64 = 20;

/// ADV-05: `beta`, the maximum fraction of externally-exposed position a
/// federation severance may lose without failing the scenario.
pub const ADV05_BETA_MAX_EXTERNAL_LOSS_FRACTION: f64 = 0.1;

/// ADV-05: `Lambda`, the externally-exposed position baseline against which
/// beta is measured (modeled as the sum of a configured federation-linked
/// subset's balances at severance time).
pub const ADV05_LAMBDA_DEFAULT: i128 = 500;

/// ADV-06: number of batches the operation stream is partitioned into.
pub const ADV06_PARTITION_COUNT: usize = 4;

/// ADV-07: number of infiltrators attempting governance capture.
pub const ADV07_INFILTRATOR_COUNT: usize = 3;
