pub mod canonical;
pub mod commitment;
pub mod engine;
pub mod error;

pub use canonical::{CommitmentBody, ParsedCommitmentBody, ParsedRevocationBody, RevocationBody};
pub use commitment::{Commitment, CommitmentId, CommitmentKind, CommitmentState};
pub use engine::{CommitmentEngine, DisputeOutcome};
pub use error::CommitmentError;
