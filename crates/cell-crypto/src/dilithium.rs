use cell_core::types::{MemberId, PublicKeyBytes, SignatureBytes};
use pqcrypto_dilithium::dilithium2;
use pqcrypto_traits::sign::{
    DetachedSignature, PublicKey as _, SecretKey as _, VerificationError,
};
use zeroize::Zeroizing;

use crate::error::CryptoError;
use crate::port::SigningPort;

/// Production-grade signer handle backed by Dilithium2. The secret key lives
/// only inside a zeroizing buffer and is scrubbed on drop. `Clone` lets a
/// scenario harness reuse one identity's signing capability across two
/// independently constructed ledgers (ADV-06).
#[derive(Clone)]
pub struct Dilithium2Signer {
    secret_key: Zeroizing<Vec<u8>>,
}

impl std::fmt::Debug for Dilithium2Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dilithium2Signer").finish_non_exhaustive()
    }
}

/// Post-quantum-capable [`SigningPort`] implementation, for commitments whose
/// deadlines sit far enough out that signature-forging resistance against a
/// quantum adversary matters (§9, "Signature coverage").
#[derive(Default)]
pub struct Dilithium2Port;

impl SigningPort for Dilithium2Port {
    type Signer = Dilithium2Signer;

    fn keypair(&self) -> Result<(Self::Signer, PublicKeyBytes), CryptoError> {
        let (public_key, secret_key) = dilithium2::keypair();
        let signer = Dilithium2Signer {
            secret_key: Zeroizing::new(secret_key.as_bytes().to_vec()),
        };
        Ok((signer, PublicKeyBytes(public_key.as_bytes().to_vec())))
    }

    fn derive_identity_id(&self, public_key: &PublicKeyBytes) -> Result<MemberId, CryptoError> {
        if public_key.0.is_empty() {
            return Err(CryptoError::InvalidEncoding);
        }
        let hash = blake3::hash(&public_key.0);
        Ok(MemberId::from_bytes(*hash.as_bytes()))
    }

    fn sign(&self, signer: &Self::Signer, message: &[u8]) -> Result<SignatureBytes, CryptoError> {
        let secret_key = dilithium2::SecretKey::from_bytes(&signer.secret_key)
            .map_err(|_| CryptoError::SigningFailed)?;
        let sig = dilithium2::detached_sign(message, &secret_key);
        Ok(SignatureBytes(sig.as_bytes().to_vec()))
    }

    fn verify(
        &self,
        public_key: &PublicKeyBytes,
        message: &[u8],
        signature: &SignatureBytes,
    ) -> Result<(), CryptoError> {
        let pk = dilithium2::PublicKey::from_bytes(&public_key.0)
            .map_err(|_| CryptoError::InvalidEncoding)?;
        let sig = dilithium2::DetachedSignature::from_bytes(&signature.0)
            .map_err(|_| CryptoError::InvalidEncoding)?;
        match pqcrypto_dilithium::dilithium2::verify_detached_signature(&sig, message, &pk) {
            Ok(()) => Ok(()),
            Err(VerificationError::InvalidSignature) => Err(CryptoError::VerificationFailed),
            Err(_) => Err(CryptoError::VerificationFailed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_verify_round_trip() {
        let port = Dilithium2Port;
        let (signer, pk) = port.keypair().unwrap();
        let msg = b"type=ESCROWED&promisor=a&promisee=b&value=80";
        let sig = port.sign(&signer, msg).unwrap();
        assert!(port.verify(&pk, msg, &sig).is_ok());
    }

    #[test]
    fn tampered_message_fails() {
        let port = Dilithium2Port;
        let (signer, pk) = port.keypair().unwrap();
        let sig = port.sign(&signer, b"original").unwrap();
        assert!(port.verify(&pk, b"tampered", &sig).is_err());
    }
}
