use thiserror::Error;

/// Closed error set for the cryptographic port (component C2). No exception
/// escapes the port; every failure mode is reported through this enum.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("key generation failed")]
    KeyGenerationFailed,

    #[error("signing failed")]
    SigningFailed,

    #[error("signature verification failed")]
    VerificationFailed,

    #[error("signer not initialized")]
    NotInitialized,

    #[error("malformed key or signature bytes")]
    InvalidEncoding,
}
