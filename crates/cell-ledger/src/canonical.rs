use cell_core::types::{Balance, MemberId, Nonce, Timestamp};
use cell_crypto::{parse_canonical_fields, CanonicalWriter};

/// Canonical byte form of a spot transfer, field order fixed by §6:
/// `payer, payee, amount, description, created_at, nonce`.
pub struct SpotTransactionBody<'a> {
    pub payer: MemberId,
    pub payee: MemberId,
    pub amount: Balance,
    pub description: &'a str,
    pub created_at: Timestamp,
    pub nonce: Nonce,
}

/// Owned counterpart of [`SpotTransactionBody`] produced by
/// [`SpotTransactionBody::parse`], for the round-trip property of §8:
/// `parse(serialize(x)) = x`.
#[derive(Debug, PartialEq, Eq)]
pub struct ParsedSpotTransaction {
    pub payer: MemberId,
    pub payee: MemberId,
    pub amount: Balance,
    pub description: String,
    pub created_at: Timestamp,
    pub nonce: Nonce,
}

impl<'a> SpotTransactionBody<'a> {
    pub fn canonical_bytes(&self) -> Vec<u8> {
        CanonicalWriter::new()
            .field_str("payer", &self.payer.to_b58())
            .field_str("payee", &self.payee.to_b58())
            .field_i128("amount", self.amount)
            .field_str("description", self.description)
            .field_i64("created_at", self.created_at)
            .field_u64("nonce", self.nonce)
            .into_bytes()
    }

    /// Inverse of [`SpotTransactionBody::canonical_bytes`]. `None` on a
    /// malformed message (wrong field count or an unparseable integer).
    pub fn parse(bytes: &[u8]) -> Option<ParsedSpotTransaction> {
        let fields = parse_canonical_fields(bytes);
        if fields.len() != 6 {
            return None;
        }
        Some(ParsedSpotTransaction {
            payer: MemberId::from_b58(&fields[0].1)?,
            payee: MemberId::from_b58(&fields[1].1)?,
            amount: fields[2].1.parse().ok()?,
            description: fields[3].1.clone(),
            created_at: fields[4].1.parse().ok()?,
            nonce: fields[5].1.parse().ok()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_fields_produce_identical_bytes() {
        let a = SpotTransactionBody {
            payer: MemberId::from_bytes([1; 32]),
            payee: MemberId::from_bytes([2; 32]),
            amount: -30,
            description: "lunch",
            created_at: 10,
            nonce: 1,
        };
        let b = SpotTransactionBody {
            payer: MemberId::from_bytes([1; 32]),
            payee: MemberId::from_bytes([2; 32]),
            amount: -30,
            description: "lunch",
            created_at: 10,
            nonce: 1,
        };
        assert_eq!(a.canonical_bytes(), b.canonical_bytes());
    }

    #[test]
    fn parse_is_the_inverse_of_canonical_bytes() {
        let original = SpotTransactionBody {
            payer: MemberId::from_bytes([3; 32]),
            payee: MemberId::from_bytes([4; 32]),
            amount: -55,
            description: "groceries",
            created_at: 42,
            nonce: 7,
        };
        let bytes = original.canonical_bytes();
        let parsed = SpotTransactionBody::parse(&bytes).expect("well-formed message");
        assert_eq!(parsed.payer, original.payer);
        assert_eq!(parsed.payee, original.payee);
        assert_eq!(parsed.amount, original.amount);
        assert_eq!(parsed.description, original.description);
        assert_eq!(parsed.created_at, original.created_at);
        assert_eq!(parsed.nonce, original.nonce);
    }

    #[test]
    fn parse_rejects_malformed_message() {
        assert!(SpotTransactionBody::parse(b"payer=abc&payee=def").is_none());
    }
}
