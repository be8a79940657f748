pub mod constants;
pub mod error;
pub mod registry;
pub mod types;

pub use error::IdentityError;
pub use registry::{IdentityRegistry, Member, MemberStatus};
pub use types::{Balance, CorrelationId, MemberId, Nonce, PublicKeyBytes, SignatureBytes, Timestamp};
