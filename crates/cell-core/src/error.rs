use thiserror::Error;

use crate::types::MemberId;

/// Closed error set for the identity registry (component C1).
#[derive(Debug, Error)]
pub enum IdentityError {
    // ── Admission ────────────────────────────────────────────────────────────
    #[error("member {0:?} already exists")]
    IdentityExists(MemberId),

    #[error("public key already registered to a different member")]
    PublicKeyInUse,

    #[error("malformed public key")]
    InvalidPublicKey,

    // ── Lookup ───────────────────────────────────────────────────────────────
    #[error("member {0:?} not found")]
    IdentityNotFound(MemberId),

    // ── Status lattice ───────────────────────────────────────────────────────
    #[error("status transition {from:?} -> {to:?} is not permitted")]
    StatusTransitionForbidden {
        from: crate::registry::MemberStatus,
        to: crate::registry::MemberStatus,
    },

    // ── Limits ───────────────────────────────────────────────────────────────
    #[error("limit adjustment would break balance >= -limit")]
    LimitAdjustUnsafe,

    #[error("new limit must be strictly positive")]
    LimitNotPositive,

    // ── Removal ──────────────────────────────────────────────────────────────
    #[error("cannot remove member {0:?} with nonzero balance or reserve")]
    CannotRemoveNonzero(MemberId),
}
