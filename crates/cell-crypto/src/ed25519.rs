use cell_core::types::{MemberId, PublicKeyBytes, SignatureBytes};
use ed25519_dalek::{Signature, Signer as DalekSigner, SigningKey, Verifier, VerifyingKey};
use zeroize::Zeroizing;

use crate::error::CryptoError;
use crate::port::SigningPort;

/// Deterministic Ed25519 signer handle. Holds the secret key bytes in a
/// zeroizing buffer and scrubs them on drop, the same discipline used for
/// Dilithium secret keys. `Clone` is derived so a scenario harness can
/// replay the same identity's signing capability across two independently
/// constructed ledgers (ADV-06).
#[derive(Clone)]
pub struct Ed25519Signer {
    secret_key: Zeroizing<[u8; 32]>,
}

impl std::fmt::Debug for Ed25519Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ed25519Signer").finish_non_exhaustive()
    }
}

/// The test/dev-grade concrete [`SigningPort`] implementation: fast enough to
/// sign thousands of operations per invariant-runner trial. Use
/// [`crate::dilithium::Dilithium2Port`] for a post-quantum-capable signer.
#[derive(Default)]
pub struct Ed25519Port;

impl SigningPort for Ed25519Port {
    type Signer = Ed25519Signer;

    fn keypair(&self) -> Result<(Self::Signer, PublicKeyBytes), CryptoError> {
        let signing_key = SigningKey::generate(&mut rand_core::OsRng);
        let public_key = PublicKeyBytes(signing_key.verifying_key().to_bytes().to_vec());
        let signer = Ed25519Signer {
            secret_key: Zeroizing::new(signing_key.to_bytes()),
        };
        Ok((signer, public_key))
    }

    fn derive_identity_id(&self, public_key: &PublicKeyBytes) -> Result<MemberId, CryptoError> {
        if public_key.0.len() != 32 {
            return Err(CryptoError::InvalidEncoding);
        }
        let hash = blake3::hash(&public_key.0);
        Ok(MemberId::from_bytes(*hash.as_bytes()))
    }

    fn sign(&self, signer: &Self::Signer, message: &[u8]) -> Result<SignatureBytes, CryptoError> {
        let signing_key =
            SigningKey::from_bytes(&signer.secret_key).map_err(|_| CryptoError::SigningFailed)?;
        let sig: Signature = signing_key.sign(message);
        Ok(SignatureBytes(sig.to_bytes().to_vec()))
    }

    fn verify(
        &self,
        public_key: &PublicKeyBytes,
        message: &[u8],
        signature: &SignatureBytes,
    ) -> Result<(), CryptoError> {
        let key_bytes: [u8; 32] = public_key
            .0
            .clone()
            .try_into()
            .map_err(|_| CryptoError::InvalidEncoding)?;
        let verifying_key =
            VerifyingKey::from_bytes(&key_bytes).map_err(|_| CryptoError::InvalidEncoding)?;
        let sig_bytes: [u8; 64] = signature
            .0
            .clone()
            .try_into()
            .map_err(|_| CryptoError::InvalidEncoding)?;
        let sig = Signature::from_bytes(&sig_bytes);
        verifying_key
            .verify(message, &sig)
            .map_err(|_| CryptoError::VerificationFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_verify_round_trip() {
        let port = Ed25519Port;
        let (signer, pk) = port.keypair().unwrap();
        let msg = b"payer=a&payee=b&amount=30";
        let sig = port.sign(&signer, msg).unwrap();
        assert!(port.verify(&pk, msg, &sig).is_ok());
    }

    #[test]
    fn tampered_message_fails() {
        let port = Ed25519Port;
        let (signer, pk) = port.keypair().unwrap();
        let sig = port.sign(&signer, b"original").unwrap();
        assert!(port.verify(&pk, b"tampered", &sig).is_err());
    }

    #[test]
    fn derive_identity_id_is_deterministic() {
        let port = Ed25519Port;
        let pk = PublicKeyBytes(vec![9u8; 32]);
        assert_eq!(
            port.derive_identity_id(&pk).unwrap(),
            port.derive_identity_id(&pk).unwrap()
        );
    }
}
