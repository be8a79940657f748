use serde::{Deserialize, Serialize};

use cell_core::types::{Balance, MemberId, Nonce, SignatureBytes, Timestamp};

/// Stable identifier assigned by the engine at creation time, monotonic
/// within one engine instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommitmentId(pub u64);

impl std::fmt::Display for CommitmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "commitment#{}", self.0)
    }
}

/// Closed sum over commitment kinds (§9, "Optional fields and tagged union
/// shapes"): SOFT is a record only, ESCROWED reserves capacity on the payer
/// side. Dispatch on this is always exhaustive — no string-tag checked at
/// runtime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommitmentKind {
    Soft,
    Escrowed,
}

/// Lifecycle state (§4.4). PENDING is initial; FULFILLED/CANCELLED/EXPIRED
/// are terminal; DISPUTED is a detour that always resolves back to one of
/// the two terminal outcomes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommitmentState {
    Pending,
    Fulfilled,
    Cancelled,
    Expired,
    Disputed,
}

impl CommitmentState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            CommitmentState::Fulfilled | CommitmentState::Cancelled | CommitmentState::Expired
        )
    }
}

/// A promise from a `promisor` to a `promisee`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Commitment {
    pub id: CommitmentId,
    pub kind: CommitmentKind,
    pub promisor: MemberId,
    pub promisee: MemberId,
    pub value: Balance,
    pub category: String,
    pub description: String,
    pub created_at: Timestamp,
    /// Nonce carried in the canonical bytes `promisor_signature` was signed
    /// over, kept so that message can be reconstructed at fulfillment time.
    pub nonce: Nonce,
    pub deadline: Option<Timestamp>,
    pub state: CommitmentState,
    pub promisor_signature: SignatureBytes,
    pub promisee_confirmation: Option<SignatureBytes>,
}

impl Commitment {
    pub fn is_escrowed(&self) -> bool {
        matches!(self.kind, CommitmentKind::Escrowed)
    }
}
