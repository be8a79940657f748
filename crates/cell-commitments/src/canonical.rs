use cell_core::types::{Balance, MemberId, Nonce, Timestamp};
use cell_crypto::{parse_canonical_fields, CanonicalWriter};

use crate::commitment::CommitmentKind;

/// Canonical byte form of a commitment, field order fixed by §6:
/// `type, promisor, promisee, value, category, description, created_at,
/// nonce, deadline?`.
pub struct CommitmentBody<'a> {
    pub kind: CommitmentKind,
    pub promisor: MemberId,
    pub promisee: MemberId,
    pub value: Balance,
    pub category: &'a str,
    pub description: &'a str,
    pub created_at: Timestamp,
    pub nonce: Nonce,
    pub deadline: Option<Timestamp>,
}

/// Owned counterpart of [`CommitmentBody`], for the round-trip property of
/// §8: `parse(serialize(x)) = x`.
#[derive(Debug, PartialEq, Eq)]
pub struct ParsedCommitmentBody {
    pub kind: CommitmentKind,
    pub promisor: MemberId,
    pub promisee: MemberId,
    pub value: Balance,
    pub category: String,
    pub description: String,
    pub created_at: Timestamp,
    pub nonce: Nonce,
    pub deadline: Option<Timestamp>,
}

impl<'a> CommitmentBody<'a> {
    pub fn canonical_bytes(&self) -> Vec<u8> {
        CanonicalWriter::new()
            .field_str("type", self.kind.as_str())
            .field_str("promisor", &self.promisor.to_b58())
            .field_str("promisee", &self.promisee.to_b58())
            .field_i128("value", self.value)
            .field_str("category", self.category)
            .field_str("description", self.description)
            .field_i64("created_at", self.created_at)
            .field_u64("nonce", self.nonce)
            .field_opt_i64("deadline", self.deadline)
            .into_bytes()
    }

    /// Inverse of [`CommitmentBody::canonical_bytes`]. `None` on a malformed
    /// message (wrong field count, unknown `type`, or an unparseable
    /// integer).
    pub fn parse(bytes: &[u8]) -> Option<ParsedCommitmentBody> {
        let fields = parse_canonical_fields(bytes);
        if fields.len() != 9 {
            return None;
        }
        let kind = CommitmentKind::from_str(&fields[0].1)?;
        let deadline_raw = &fields[8].1;
        let deadline = if deadline_raw.is_empty() {
            None
        } else {
            Some(deadline_raw.parse().ok()?)
        };
        Some(ParsedCommitmentBody {
            kind,
            promisor: MemberId::from_b58(&fields[1].1)?,
            promisee: MemberId::from_b58(&fields[2].1)?,
            value: fields[3].1.parse().ok()?,
            category: fields[4].1.clone(),
            description: fields[5].1.clone(),
            created_at: fields[6].1.parse().ok()?,
            nonce: fields[7].1.parse().ok()?,
            deadline,
        })
    }
}

impl CommitmentKind {
    fn as_str(self) -> &'static str {
        match self {
            CommitmentKind::Soft => "SOFT",
            CommitmentKind::Escrowed => "ESCROWED",
        }
    }

    fn from_str(s: &str) -> Option<Self> {
        match s {
            "SOFT" => Some(CommitmentKind::Soft),
            "ESCROWED" => Some(CommitmentKind::Escrowed),
            _ => None,
        }
    }
}

/// Canonical byte form of a revocation, field order fixed by §6:
/// `target, reason, created_at, nonce`. Used by identity status changes and
/// commitment cancellations alike.
pub struct RevocationBody<'a> {
    pub target: MemberId,
    pub reason: &'a str,
    pub created_at: Timestamp,
    pub nonce: Nonce,
}

/// Owned counterpart of [`RevocationBody`], for the round-trip property of
/// §8.
#[derive(Debug, PartialEq, Eq)]
pub struct ParsedRevocationBody {
    pub target: MemberId,
    pub reason: String,
    pub created_at: Timestamp,
    pub nonce: Nonce,
}

impl<'a> RevocationBody<'a> {
    pub fn canonical_bytes(&self) -> Vec<u8> {
        CanonicalWriter::new()
            .field_str("target", &self.target.to_b58())
            .field_str("reason", self.reason)
            .field_i64("created_at", self.created_at)
            .field_u64("nonce", self.nonce)
            .into_bytes()
    }

    /// Inverse of [`RevocationBody::canonical_bytes`].
    pub fn parse(bytes: &[u8]) -> Option<ParsedRevocationBody> {
        let fields = parse_canonical_fields(bytes);
        if fields.len() != 4 {
            return None;
        }
        Some(ParsedRevocationBody {
            target: MemberId::from_b58(&fields[0].1)?,
            reason: fields[1].1.clone(),
            created_at: fields[2].1.parse().ok()?,
            nonce: fields[3].1.parse().ok()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commitment_body_parse_is_the_inverse_of_canonical_bytes() {
        let original = CommitmentBody {
            kind: CommitmentKind::Escrowed,
            promisor: MemberId::from_bytes([1; 32]),
            promisee: MemberId::from_bytes([2; 32]),
            value: 80,
            category: "rent",
            description: "month",
            created_at: 10,
            nonce: 3,
            deadline: Some(500),
        };
        let parsed = CommitmentBody::parse(&original.canonical_bytes()).expect("well-formed");
        assert_eq!(parsed.kind, original.kind);
        assert_eq!(parsed.promisor, original.promisor);
        assert_eq!(parsed.promisee, original.promisee);
        assert_eq!(parsed.value, original.value);
        assert_eq!(parsed.category, original.category);
        assert_eq!(parsed.description, original.description);
        assert_eq!(parsed.created_at, original.created_at);
        assert_eq!(parsed.nonce, original.nonce);
        assert_eq!(parsed.deadline, original.deadline);
    }

    #[test]
    fn commitment_body_parse_round_trips_a_missing_deadline() {
        let original = CommitmentBody {
            kind: CommitmentKind::Soft,
            promisor: MemberId::from_bytes([5; 32]),
            promisee: MemberId::from_bytes([6; 32]),
            value: 10,
            category: "favor",
            description: "",
            created_at: 0,
            nonce: 1,
            deadline: None,
        };
        let parsed = CommitmentBody::parse(&original.canonical_bytes()).expect("well-formed");
        assert_eq!(parsed.deadline, None);
    }

    #[test]
    fn commitment_body_parse_rejects_unknown_kind() {
        let bytes = CanonicalWriter::new()
            .field_str("type", "MINTED")
            .field_str("promisor", "x")
            .field_str("promisee", "y")
            .field_i128("value", 1)
            .field_str("category", "c")
            .field_str("description", "d")
            .field_i64("created_at", 0)
            .field_u64("nonce", 0)
            .field_opt_i64("deadline", None)
            .into_bytes();
        assert!(CommitmentBody::parse(&bytes).is_none());
    }

    #[test]
    fn revocation_body_parse_is_the_inverse_of_canonical_bytes() {
        let original = RevocationBody {
            target: MemberId::from_bytes([9; 32]),
            reason: "policy capture attempt",
            created_at: 7,
            nonce: 2,
        };
        let parsed = RevocationBody::parse(&original.canonical_bytes()).expect("well-formed");
        assert_eq!(parsed.target, original.target);
        assert_eq!(parsed.reason, original.reason);
        assert_eq!(parsed.created_at, original.created_at);
        assert_eq!(parsed.nonce, original.nonce);
    }
}
