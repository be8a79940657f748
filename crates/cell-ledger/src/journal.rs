use serde::{Deserialize, Serialize};

use cell_core::types::{Balance, CorrelationId, MemberId, Timestamp};

/// Closed set of reasons a journal entry can carry (§3).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum JournalReason {
    SpotTransactionPayer,
    SpotTransactionPayee,
    CommitmentFulfillPayer,
    CommitmentFulfillPayee,
    ReserveTake,
    ReserveRelease,
    AdmissionGrant,
    ExclusionWriteoff,
}

/// Append-only record of a single balance change.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JournalEntry {
    pub member_id: MemberId,
    pub delta: Balance,
    pub reason: JournalReason,
    pub timestamp: Timestamp,
    pub correlation_id: CorrelationId,
}

/// Write-once (from the ledger's perspective) log of every committed delta.
/// The core never chooses a persistence technology for this; a storage
/// adapter collaborator may mirror it to disk via `persist`/`load_all` (§6).
#[derive(Default)]
pub struct Journal {
    entries: Vec<JournalEntry>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, entry: JournalEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    /// Offset of the next entry to be written; a stable cursor for snapshots.
    pub fn head_offset(&self) -> usize {
        self.entries.len()
    }

    /// INV-06: grouping entries by correlation id, each group sums to zero.
    /// `ReserveTake`/`ReserveRelease` entries are excluded from the grouping:
    /// they record a capacity hold, not a balance movement, and the
    /// conservation law this checks is about balance.
    pub fn is_balanced(&self) -> bool {
        use std::collections::HashMap;
        let mut sums: HashMap<CorrelationId, Balance> = HashMap::new();
        for entry in &self.entries {
            if matches!(entry.reason, JournalReason::ReserveTake | JournalReason::ReserveRelease) {
                continue;
            }
            *sums.entry(entry.correlation_id).or_insert(0) += entry.delta;
        }
        sums.values().all(|&sum| sum == 0)
    }

    /// Property 7 (§8): no journal group contains both a payer and payee
    /// entry for the same member.
    pub fn no_self_exchange_groups(&self) -> bool {
        use std::collections::{HashMap, HashSet};
        let mut by_correlation: HashMap<CorrelationId, HashSet<MemberId>> = HashMap::new();
        for entry in &self.entries {
            let seen = by_correlation.entry(entry.correlation_id).or_default();
            if !seen.insert(entry.member_id) {
                // Same member appearing twice in one correlation group is
                // only legal if it nets to a single signed direction, which
                // callers never emit as two split entries; treat a repeat as
                // a violation.
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(member: u8, delta: Balance, correlation: u8) -> JournalEntry {
        JournalEntry {
            member_id: MemberId::from_bytes([member; 32]),
            delta,
            reason: JournalReason::SpotTransactionPayer,
            timestamp: 0,
            correlation_id: CorrelationId::from_bytes([correlation; 16]),
        }
    }

    #[test]
    fn balanced_correlation_groups_pass() {
        let mut j = Journal::new();
        j.append(entry(1, -30, 1));
        j.append(entry(2, 30, 1));
        assert!(j.is_balanced());
    }

    #[test]
    fn unbalanced_correlation_group_fails() {
        let mut j = Journal::new();
        j.append(entry(1, -30, 1));
        j.append(entry(2, 25, 1));
        assert!(!j.is_balanced());
    }

    #[test]
    fn a_lone_reserve_take_does_not_break_balance() {
        let mut j = Journal::new();
        j.append(JournalEntry {
            member_id: MemberId::from_bytes([1; 32]),
            delta: 80,
            reason: JournalReason::ReserveTake,
            timestamp: 0,
            correlation_id: CorrelationId::from_bytes([1; 16]),
        });
        assert!(j.is_balanced());
    }

    #[test]
    fn reserve_release_sharing_a_correlation_id_with_a_transfer_does_not_break_balance() {
        let mut j = Journal::new();
        j.append(JournalEntry {
            member_id: MemberId::from_bytes([1; 32]),
            delta: -80,
            reason: JournalReason::ReserveRelease,
            timestamp: 0,
            correlation_id: CorrelationId::from_bytes([1; 16]),
        });
        j.append(entry(1, -80, 1));
        j.append(entry(2, 80, 1));
        assert!(j.is_balanced());
    }

    #[test]
    fn head_offset_tracks_entry_count() {
        let mut j = Journal::new();
        assert_eq!(j.head_offset(), 0);
        j.append(entry(1, -1, 1));
        assert_eq!(j.head_offset(), 1);
    }

    #[test]
    fn no_self_exchange_groups_passes_when_every_member_appears_once_per_group() {
        let mut j = Journal::new();
        j.append(entry(1, -30, 1));
        j.append(entry(2, 30, 1));
        assert!(j.no_self_exchange_groups());
    }

    #[test]
    fn no_self_exchange_groups_fails_when_a_member_appears_twice_in_one_group() {
        let mut j = Journal::new();
        j.append(entry(1, -10, 1));
        j.append(entry(1, 10, 1));
        assert!(!j.no_self_exchange_groups());
    }
}
