use cell_commitments::{Commitment, CommitmentState};
use cell_ledger::{CellState, JournalEntry};

/// A point-in-time view handed to every registered checker: the ledger
/// snapshot, every commitment record, and the full journal. Built fresh per
/// trial by the invariant runner.
pub struct InvariantSnapshot {
    pub cell_state: CellState,
    pub commitments: Vec<Commitment>,
    pub journal_entries: Vec<JournalEntry>,
}

/// Identifies one of the six registered checkers (§4.6).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InvariantId {
    Inv01Conservation,
    Inv02Floor,
    Inv03ReserveNonNegative,
    Inv04EscrowSafety,
    Inv05EscrowedReserveCoverage,
    Inv06JournalBalanced,
}

impl std::fmt::Display for InvariantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            InvariantId::Inv01Conservation => "INV-01",
            InvariantId::Inv02Floor => "INV-02",
            InvariantId::Inv03ReserveNonNegative => "INV-03",
            InvariantId::Inv04EscrowSafety => "INV-04",
            InvariantId::Inv05EscrowedReserveCoverage => "INV-05",
            InvariantId::Inv06JournalBalanced => "INV-06",
        };
        write!(f, "{s}")
    }
}

/// INV-01: `|sum(balance_i)| = 0`.
pub fn inv01_conservation(snapshot: &InvariantSnapshot) -> bool {
    snapshot.cell_state.total_balance() == 0
}

/// INV-02: `forall i: balance_i >= -limit_i`.
pub fn inv02_floor(snapshot: &InvariantSnapshot) -> bool {
    snapshot
        .cell_state
        .members
        .iter()
        .all(|m| m.balance >= -m.limit)
}

/// INV-03: `forall i: reserve_i >= 0`.
pub fn inv03_reserve_non_negative(snapshot: &InvariantSnapshot) -> bool {
    snapshot.cell_state.members.iter().all(|m| m.reserve >= 0)
}

/// INV-04: `forall i: balance_i - reserve_i >= -limit_i`.
pub fn inv04_escrow_safety(snapshot: &InvariantSnapshot) -> bool {
    snapshot
        .cell_state
        .members
        .iter()
        .all(|m| m.balance - m.reserve >= -m.limit)
}

/// INV-05: for every PENDING ESCROWED commitment, the promisor's reserve
/// covers at least the sum of its PENDING ESCROWED outgoing commitments.
pub fn inv05_escrowed_reserve_coverage(snapshot: &InvariantSnapshot) -> bool {
    use std::collections::HashMap;
    let mut owed: HashMap<_, i128> = HashMap::new();
    for commitment in &snapshot.commitments {
        if commitment.state == CommitmentState::Pending && commitment.is_escrowed() {
            *owed.entry(commitment.promisor).or_insert(0) += commitment.value;
        }
    }
    owed.into_iter().all(|(promisor, required)| {
        snapshot
            .cell_state
            .members
            .iter()
            .find(|m| m.id == promisor)
            .map(|m| m.reserve >= required)
            .unwrap_or(false)
    })
}

/// INV-06: grouping journal entries by correlation id, each group sums to
/// zero. `ReserveTake`/`ReserveRelease` entries are excluded: they record a
/// capacity hold, not a balance movement, and this checks balance
/// conservation, not reserve bookkeeping (see [`cell_ledger::Journal::is_balanced`]).
pub fn inv06_journal_balanced(snapshot: &InvariantSnapshot) -> bool {
    use std::collections::HashMap;
    use cell_core::types::{Balance, CorrelationId};
    use cell_ledger::JournalReason;
    let mut sums: HashMap<CorrelationId, Balance> = HashMap::new();
    for entry in &snapshot.journal_entries {
        if matches!(entry.reason, JournalReason::ReserveTake | JournalReason::ReserveRelease) {
            continue;
        }
        *sums.entry(entry.correlation_id).or_insert(0) += entry.delta;
    }
    sums.values().all(|&sum| sum == 0)
}

/// Evaluates all six registered checkers against one snapshot, returning the
/// ids of any that failed.
pub fn evaluate_all(snapshot: &InvariantSnapshot) -> Vec<InvariantId> {
    let checks: &[(InvariantId, fn(&InvariantSnapshot) -> bool)] = &[
        (InvariantId::Inv01Conservation, inv01_conservation),
        (InvariantId::Inv02Floor, inv02_floor),
        (InvariantId::Inv03ReserveNonNegative, inv03_reserve_non_negative),
        (InvariantId::Inv04EscrowSafety, inv04_escrow_safety),
        (
            InvariantId::Inv05EscrowedReserveCoverage,
            inv05_escrowed_reserve_coverage,
        ),
        (InvariantId::Inv06JournalBalanced, inv06_journal_balanced),
    ];
    checks
        .iter()
        .filter(|(_, check)| !check(snapshot))
        .map(|(id, _)| *id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cell_core::registry::{Member, MemberStatus};
    use cell_core::types::{MemberId, PublicKeyBytes};

    fn member(byte: u8, balance: i128, limit: i128, reserve: i128) -> Member {
        Member {
            id: MemberId::from_bytes([byte; 32]),
            display_name: "m".into(),
            public_key: PublicKeyBytes(vec![byte; 32]),
            created_at: 0,
            last_active_at: 0,
            status: MemberStatus::Active,
            limit,
            balance,
            reserve,
        }
    }

    fn empty_snapshot(members: Vec<Member>) -> InvariantSnapshot {
        InvariantSnapshot {
            cell_state: CellState {
                members,
                journal_head_offset: 0,
            },
            commitments: Vec::new(),
            journal_entries: Vec::new(),
        }
    }

    #[test]
    fn conservation_holds_when_balances_net_zero() {
        let snap = empty_snapshot(vec![member(1, -30, 100, 0), member(2, 30, 100, 0)]);
        assert!(inv01_conservation(&snap));
    }

    #[test]
    fn conservation_fails_when_balances_do_not_net_zero() {
        let snap = empty_snapshot(vec![member(1, -30, 100, 0), member(2, 25, 100, 0)]);
        assert!(!inv01_conservation(&snap));
    }

    #[test]
    fn floor_fails_when_balance_below_negative_limit() {
        let snap = empty_snapshot(vec![member(1, -101, 100, 0)]);
        assert!(!inv02_floor(&snap));
    }

    #[test]
    fn escrow_safety_accounts_for_reserve() {
        let snap = empty_snapshot(vec![member(1, -50, 100, 60)]);
        // balance - reserve = -110 < -limit(100)
        assert!(!inv04_escrow_safety(&snap));
    }

    #[test]
    fn evaluate_all_reports_every_failure() {
        let snap = empty_snapshot(vec![member(1, -200, 100, 0)]);
        let failed = evaluate_all(&snap);
        assert!(failed.contains(&InvariantId::Inv02Floor));
    }

    #[test]
    fn journal_balance_ignores_reserve_take_and_release_entries() {
        use cell_core::types::CorrelationId;
        use cell_ledger::JournalReason;
        let mut snap = empty_snapshot(vec![member(1, -30, 100, 0), member(2, 30, 100, 0)]);
        snap.journal_entries = vec![
            JournalEntry {
                member_id: MemberId::from_bytes([1; 32]),
                delta: 50,
                reason: JournalReason::ReserveTake,
                timestamp: 0,
                correlation_id: CorrelationId::from_bytes([9; 16]),
            },
            JournalEntry {
                member_id: MemberId::from_bytes([1; 32]),
                delta: -30,
                reason: JournalReason::SpotTransactionPayer,
                timestamp: 0,
                correlation_id: CorrelationId::from_bytes([1; 16]),
            },
            JournalEntry {
                member_id: MemberId::from_bytes([2; 32]),
                delta: 30,
                reason: JournalReason::SpotTransactionPayee,
                timestamp: 0,
                correlation_id: CorrelationId::from_bytes([1; 16]),
            },
        ];
        assert!(inv06_journal_balanced(&snap));
    }
}
