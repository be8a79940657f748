use std::collections::HashMap;

use tracing::{info, warn};

use cell_core::registry::IdentityRegistry;
use cell_core::types::{Balance, CorrelationId, MemberId, SignatureBytes, Timestamp};
use cell_crypto::SigningPort;

use crate::error::LedgerError;
use crate::journal::{Journal, JournalEntry, JournalReason};

/// A consistent, point-in-time copy of every member record plus the journal
/// head offset (§4.3).
#[derive(Clone, Debug)]
pub struct CellState {
    pub members: Vec<cell_core::registry::Member>,
    pub journal_head_offset: usize,
}

impl CellState {
    /// Property 1 / INV-01: `sum(balance_i) = 0`.
    pub fn total_balance(&self) -> Balance {
        self.members.iter().map(|m| m.balance).sum()
    }
}

/// Core accounting kernel (component C3): atomic multi-party balance deltas,
/// floor enforcement, escrow-safe available-capacity computation, reserve
/// bookkeeping. The ledger is the single authoritative owner of every
/// member's `balance`/`reserve`; it reads `status`/`limit` from the identity
/// registry it composes but never mutates them directly — those belong to
/// [`IdentityRegistry`]'s own operations.
pub struct BalanceLedger<P: SigningPort> {
    registry: IdentityRegistry,
    journal: Journal,
    crypto: P,
}

impl<P: SigningPort> BalanceLedger<P> {
    pub fn new(crypto: P) -> Self {
        Self {
            registry: IdentityRegistry::new(),
            journal: Journal::new(),
            crypto,
        }
    }

    pub fn registry(&self) -> &IdentityRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut IdentityRegistry {
        &mut self.registry
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    /// Exposes the composed crypto port for collaborators (the commitment
    /// engine) that need to verify a signature not tied to a balance update,
    /// e.g. a promisee's fulfillment confirmation.
    pub fn crypto(&self) -> &P {
        &self.crypto
    }

    /// Applies a set of per-member deltas atomically: either every delta
    /// commits or none do. `canonical_message` is the already-serialized
    /// canonical form of the command being authorized (§4.2); `signatures`
    /// must carry one entry per member with a negative delta in `updates`.
    pub fn apply_balance_updates(
        &mut self,
        updates: &[(MemberId, Balance, JournalReason)],
        correlation_id: CorrelationId,
        canonical_message: &[u8],
        signatures: &HashMap<MemberId, SignatureBytes>,
        now: Timestamp,
        enforce_escrow_safety: bool,
    ) -> Result<(), LedgerError> {
        // ── 1. Conservation precondition ────────────────────────────────────
        let total: Balance = updates.iter().map(|(_, delta, _)| *delta).sum();
        if total != 0 {
            return Err(LedgerError::ConservationViolation);
        }

        // ── 4. Self-exchange: a member may appear as both payer and payee in
        // the same set only if their net is strictly positive ─────────────
        let mut net: HashMap<MemberId, Balance> = HashMap::new();
        let mut saw_negative: HashMap<MemberId, bool> = HashMap::new();
        let mut saw_positive: HashMap<MemberId, bool> = HashMap::new();
        for (member_id, delta, _) in updates {
            *net.entry(*member_id).or_insert(0) += delta;
            if *delta < 0 {
                saw_negative.insert(*member_id, true);
            } else if *delta > 0 {
                saw_positive.insert(*member_id, true);
            }
        }
        for (member_id, net_delta) in &net {
            let is_both = *saw_negative.get(member_id).unwrap_or(&false)
                && *saw_positive.get(member_id).unwrap_or(&false);
            if is_both && *net_delta <= 0 {
                return Err(LedgerError::SelfExchange);
            }
        }

        // ── 2./3./5. Per-entry preconditions against current state ─────────
        for (member_id, delta, _reason) in updates {
            let member = self.registry.get(*member_id)?;
            if *delta < 0 {
                if !member.status.may_initiate_outflow() {
                    return Err(LedgerError::StatusForbids(*member_id));
                }
                if member.balance.checked_add(*delta).is_none() {
                    return Err(LedgerError::NumericOverflow);
                }
                if !member.floor_holds_after(*delta) {
                    return Err(LedgerError::FloorBreach { member: *member_id });
                }
                if enforce_escrow_safety && !member.escrow_safe_after(*delta) {
                    return Err(LedgerError::EscrowUnsafe { member: *member_id });
                }
                let signature = signatures
                    .get(member_id)
                    .ok_or(LedgerError::SignatureInvalid(*member_id))?;
                self.crypto
                    .verify(&member.public_key, canonical_message, signature)
                    .map_err(|_| LedgerError::SignatureInvalid(*member_id))?;
            } else if *delta > 0 {
                if !member.status.may_receive() {
                    return Err(LedgerError::StatusForbids(*member_id));
                }
                if member.balance.checked_add(*delta).is_none() {
                    return Err(LedgerError::NumericOverflow);
                }
            }
        }

        // ── Commit: every precondition held, apply all deltas and journal
        // one entry per delta, in the order given ──────────────────────────
        for (member_id, delta, reason) in updates {
            let member = self.registry.get_mut(*member_id)?;
            member.apply_delta(*delta);
            self.journal.append(JournalEntry {
                member_id: *member_id,
                delta: *delta,
                reason: *reason,
                timestamp: now,
                correlation_id,
            });
        }

        info!(
            correlation_id = %correlation_id.to_hex(),
            entries = updates.len(),
            "balance update committed"
        );
        Ok(())
    }

    /// `reserve += amount` iff `amount > 0` and escrow-safe at reservation
    /// time.
    pub fn take_reserve(
        &mut self,
        member_id: MemberId,
        amount: Balance,
        correlation_id: CorrelationId,
        now: Timestamp,
    ) -> Result<(), LedgerError> {
        if amount <= 0 {
            return Err(LedgerError::ReserveUnsafe(member_id));
        }
        let member = self.registry.get(member_id)?;
        if member.balance - (member.reserve + amount) < -member.limit {
            warn!(member = %member_id, amount, "reserve take would be escrow-unsafe");
            return Err(LedgerError::ReserveUnsafe(member_id));
        }

        let member = self.registry.get_mut(member_id)?;
        member.take_reserve(amount);
        self.journal.append(JournalEntry {
            member_id,
            delta: amount,
            reason: JournalReason::ReserveTake,
            timestamp: now,
            correlation_id,
        });
        Ok(())
    }

    /// `reserve -= amount` iff `reserve >= amount`.
    pub fn release_reserve(
        &mut self,
        member_id: MemberId,
        amount: Balance,
        correlation_id: CorrelationId,
        now: Timestamp,
    ) -> Result<(), LedgerError> {
        let member = self.registry.get(member_id)?;
        if member.reserve < amount {
            return Err(LedgerError::ReserveUnderflow(member_id));
        }

        let member = self.registry.get_mut(member_id)?;
        member.release_reserve(amount);
        self.journal.append(JournalEntry {
            member_id,
            delta: -amount,
            reason: JournalReason::ReserveRelease,
            timestamp: now,
            correlation_id,
        });
        Ok(())
    }

    pub fn get_balance(&self, member_id: MemberId) -> Result<Balance, LedgerError> {
        Ok(self.registry.get(member_id)?.balance)
    }

    /// `max(0, limit + balance - reserve)` for members that may transact at
    /// all; zero otherwise.
    pub fn get_available_capacity(&self, member_id: MemberId) -> Result<Balance, LedgerError> {
        Ok(self.registry.get(member_id)?.available_capacity())
    }

    pub fn snapshot(&self) -> CellState {
        CellState {
            members: self.registry.iter().cloned().collect(),
            journal_head_offset: self.journal.head_offset(),
        }
    }
}
