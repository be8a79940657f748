use serde::{Deserialize, Serialize};

/// Monetary quantity in protocol units. Signed: a balance may be negative
/// down to a member's floor, a delta may be negative or positive.
pub type Balance = i128;

/// Caller-supplied integer timestamp, unit is the caller's choice (the core
/// never interprets it beyond comparison).
pub type Timestamp = i64;

/// Per-signer monotonic counter used by the canonical signed-object format.
pub type Nonce = u64;

/// Opaque, collision-resistant member identifier derived from a public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemberId(pub [u8; 32]);

impl MemberId {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_b58(&self) -> String {
        bs58::encode(&self.0).into_string()
    }

    pub fn from_b58(s: &str) -> Option<Self> {
        let bytes = bs58::decode(s).into_vec().ok()?;
        let arr: [u8; 32] = bytes.try_into().ok()?;
        Some(Self(arr))
    }
}

impl std::fmt::Debug for MemberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let b58 = self.to_b58();
        write!(f, "MemberId({}…)", &b58[..b58.len().min(8)])
    }
}

impl std::fmt::Display for MemberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_b58())
    }
}

/// Groups journal entries that must collectively net to zero.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationId(pub [u8; 16]);

impl CorrelationId {
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl std::fmt::Debug for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CorrelationId({}…)", &self.to_hex()[..8])
    }
}

/// Opaque public key bytes. The concrete scheme is chosen by the crypto port.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyBytes(pub Vec<u8>);

impl std::fmt::Debug for PublicKeyBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PublicKeyBytes({} bytes)", self.0.len())
    }
}

/// Opaque signature bytes produced by the crypto port.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureBytes(pub Vec<u8>);

impl std::fmt::Debug for SignatureBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SignatureBytes({} bytes)", self.0.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn member_id_b58_round_trips() {
        let id = MemberId::from_bytes([7u8; 32]);
        let encoded = id.to_b58();
        assert_eq!(MemberId::from_b58(&encoded), Some(id));
    }

    #[test]
    fn member_id_debug_is_truncated() {
        let id = MemberId::from_bytes([1u8; 32]);
        let text = format!("{:?}", id);
        assert!(text.starts_with("MemberId("));
    }
}
