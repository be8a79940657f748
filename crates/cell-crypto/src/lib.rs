pub mod canonical;
pub mod dilithium;
pub mod ed25519;
pub mod error;
pub mod port;

pub use canonical::{parse_canonical_fields, CanonicalWriter};
pub use dilithium::{Dilithium2Port, Dilithium2Signer};
pub use ed25519::{Ed25519Port, Ed25519Signer};
pub use error::CryptoError;
pub use port::SigningPort;
