use thiserror::Error;

use cell_core::types::MemberId;

/// Closed error set for the balance ledger (component C3).
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("deltas in an update set must sum to zero")]
    ConservationViolation,

    #[error("member {member:?} would fall below its floor")]
    FloorBreach { member: MemberId },

    #[error("member {member:?} would be escrow-unsafe")]
    EscrowUnsafe { member: MemberId },

    #[error("a member cannot appear as both payer and payee with non-positive net")]
    SelfExchange,

    #[error("member {0:?} status forbids this role in the update")]
    StatusForbids(MemberId),

    #[error("signature invalid for member {0:?}")]
    SignatureInvalid(MemberId),

    #[error("arithmetic overflow while applying update")]
    NumericOverflow,

    #[error("reserve underflow for member {0:?}: release exceeds held reserve")]
    ReserveUnderflow(MemberId),

    #[error("reserve take for member {0:?} would be escrow-unsafe")]
    ReserveUnsafe(MemberId),

    #[error(transparent)]
    Identity(#[from] cell_core::error::IdentityError),
}
