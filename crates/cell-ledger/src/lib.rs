pub mod canonical;
pub mod error;
pub mod journal;
pub mod ledger;

pub use canonical::{ParsedSpotTransaction, SpotTransactionBody};
pub use error::LedgerError;
pub use journal::{Journal, JournalEntry, JournalReason};
pub use ledger::{BalanceLedger, CellState};
