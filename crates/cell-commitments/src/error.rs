use thiserror::Error;

use cell_ledger::LedgerError;

use crate::commitment::CommitmentId;

/// Closed error set for the commitment engine (component C4).
#[derive(Debug, Error)]
pub enum CommitmentError {
    #[error("commitment {0} not found")]
    CommitmentNotFound(CommitmentId),

    #[error("commitment {0} is already in a terminal state")]
    CommitmentTerminal(CommitmentId),

    #[error("actor is not authorized for this commitment transition")]
    NotAuthorized,

    #[error("commitment deadline has already passed")]
    DeadlinePassed,

    #[error("commitment value must be strictly positive")]
    ValueNotPositive,

    #[error("promisor and promisee must be different members")]
    SelfCommitment,

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Identity(#[from] cell_core::error::IdentityError),
}
