use cell_core::types::{MemberId, PublicKeyBytes, SignatureBytes};

use crate::error::CryptoError;

/// Abstract interface for keypair generation, deterministic canonical
/// message signing, and verification (component C2). The core depends only
/// on this trait; concrete schemes are a deployment choice.
pub trait SigningPort {
    /// Opaque secret-key handle owned by the implementation; never leaves a
    /// `SigningPort` implementor.
    type Signer;

    /// Generates a fresh keypair, returning a signer handle and its public
    /// key bytes.
    fn keypair(&self) -> Result<(Self::Signer, PublicKeyBytes), CryptoError>;

    /// Deterministic, collision-resistant derivation of a member id from a
    /// public key.
    fn derive_identity_id(&self, public_key: &PublicKeyBytes) -> Result<MemberId, CryptoError>;

    /// Signs the canonical byte form of an already-serialized message.
    fn sign(&self, signer: &Self::Signer, message: &[u8]) -> Result<SignatureBytes, CryptoError>;

    /// Verifies a signature over the canonical byte form of a message.
    fn verify(
        &self,
        public_key: &PublicKeyBytes,
        message: &[u8],
        signature: &SignatureBytes,
    ) -> Result<(), CryptoError>;
}
