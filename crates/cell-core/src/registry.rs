use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::IdentityError;
use crate::types::{Balance, MemberId, PublicKeyBytes, Timestamp};

/// Admission/lifecycle status of a member. PENDING is the initial state,
/// EXCLUDED is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemberStatus {
    Pending,
    Probation,
    Active,
    Frozen,
    Excluded,
}

impl MemberStatus {
    /// Whether `self -> to` is a legal edge in the status lattice (§4.1).
    /// Matches the lattice diagram exactly: `admit`, `complete`, `reject`,
    /// `freeze`, `unfreeze`, `exclude`. PENDING and FROZEN members are not
    /// directly excludable — exclusion from either state routes through
    /// PROBATION/ACTIVE first.
    pub fn can_transition_to(self, to: MemberStatus) -> bool {
        use MemberStatus::*;
        matches!(
            (self, to),
            (Pending, Probation)
                | (Probation, Active)
                | (Probation, Excluded)
                | (Active, Frozen)
                | (Active, Excluded)
                | (Frozen, Active)
        )
    }

    /// Only ACTIVE members may initiate spot transactions or create escrowed
    /// commitments.
    pub fn may_initiate_outflow(self) -> bool {
        matches!(self, MemberStatus::Active)
    }

    /// FROZEN and PROBATION may still receive inflows; EXCLUDED is inert.
    pub fn may_receive(self) -> bool {
        matches!(
            self,
            MemberStatus::Active | MemberStatus::Probation | MemberStatus::Frozen
        )
    }
}

/// The fundamental participant record. The ledger (a different crate) is the
/// only caller expected to invoke [`Member::apply_delta`], [`Member::take_reserve`]
/// and [`Member::release_reserve`] — everything else here is owned by the identity
/// registry. Crate-level visibility can't express that split across crates,
/// so it is a documented convention: these are plain `pub fn`s that only the
/// ledger crate is meant to call.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub display_name: String,
    pub public_key: PublicKeyBytes,
    pub created_at: Timestamp,
    pub last_active_at: Timestamp,
    pub status: MemberStatus,
    pub limit: Balance,
    pub balance: Balance,
    pub reserve: Balance,
}

impl Member {
    /// Available capacity for new outflow, per §3: `limit + balance - reserve`,
    /// floored at zero for members that may not transact at all.
    pub fn available_capacity(&self) -> Balance {
        if !self.status.may_receive() {
            return 0;
        }
        (self.limit + self.balance - self.reserve).max(0)
    }

    /// `balance + delta >= -limit`.
    pub fn floor_holds_after(&self, delta: Balance) -> bool {
        self.balance + delta >= -self.limit
    }

    /// `balance + delta - reserve >= -limit` (escrow safety at the instant a
    /// delta applies; reserve unaffected).
    pub fn escrow_safe_after(&self, delta: Balance) -> bool {
        self.balance + delta - self.reserve >= -self.limit
    }

    /// Ledger-only: apply a balance delta. Caller has already checked every
    /// precondition; this never fails.
    pub fn apply_delta(&mut self, delta: Balance) {
        self.balance += delta;
    }

    /// Ledger-only: `reserve += amount`.
    pub fn take_reserve(&mut self, amount: Balance) {
        self.reserve += amount;
    }

    /// Ledger-only: `reserve -= amount`.
    pub fn release_reserve(&mut self, amount: Balance) {
        self.reserve -= amount;
    }
}

/// Maintains the set of admitted members: their status, credit limits, and
/// public keys. No network, no admission policy — just a consistent store
/// (component C1).
#[derive(Default)]
pub struct IdentityRegistry {
    members: HashMap<MemberId, Member>,
    keys_in_use: std::collections::HashSet<Vec<u8>>,
}

impl IdentityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a member with `balance = 0`, `reserve = 0`. `status` must be
    /// either PENDING or PROBATION per §4.1; any other value is rejected by
    /// the caller contract (the registry does not second-guess a valid
    /// initial status beyond that single check).
    pub fn add_member(
        &mut self,
        id: MemberId,
        public_key: PublicKeyBytes,
        display_name: String,
        limit: Balance,
        initial_status: MemberStatus,
        now: Timestamp,
    ) -> Result<(), IdentityError> {
        if public_key.0.is_empty() {
            return Err(IdentityError::InvalidPublicKey);
        }
        if self.members.contains_key(&id) {
            return Err(IdentityError::IdentityExists(id));
        }
        if self.keys_in_use.contains(&public_key.0) {
            return Err(IdentityError::PublicKeyInUse);
        }
        if !matches!(initial_status, MemberStatus::Pending | MemberStatus::Probation) {
            return Err(IdentityError::StatusTransitionForbidden {
                from: MemberStatus::Pending,
                to: initial_status,
            });
        }
        if limit <= 0 {
            return Err(IdentityError::LimitNotPositive);
        }

        self.keys_in_use.insert(public_key.0.clone());
        self.members.insert(
            id,
            Member {
                id,
                display_name,
                public_key,
                created_at: now,
                last_active_at: now,
                status: initial_status,
                limit,
                balance: 0,
                reserve: 0,
            },
        );
        info!(member = %id, "member admitted");
        Ok(())
    }

    pub fn get(&self, id: MemberId) -> Result<&Member, IdentityError> {
        self.members.get(&id).ok_or(IdentityError::IdentityNotFound(id))
    }

    /// Ledger-only mutable access, used to apply balance/reserve deltas.
    pub fn get_mut(&mut self, id: MemberId) -> Result<&mut Member, IdentityError> {
        self.members
            .get_mut(&id)
            .ok_or(IdentityError::IdentityNotFound(id))
    }

    pub fn contains(&self, id: MemberId) -> bool {
        self.members.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Member> {
        self.members.values()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn set_status(
        &mut self,
        id: MemberId,
        new_status: MemberStatus,
        reason: &str,
    ) -> Result<(), IdentityError> {
        let member = self
            .members
            .get_mut(&id)
            .ok_or(IdentityError::IdentityNotFound(id))?;
        if !member.status.can_transition_to(new_status) {
            return Err(IdentityError::StatusTransitionForbidden {
                from: member.status,
                to: new_status,
            });
        }
        let from = member.status;
        member.status = new_status;
        info!(member = %id, ?from, to = ?new_status, reason, "status transition");
        Ok(())
    }

    /// Bounded by `|new - old| <= eta` per interval — enforced by the caller
    /// (the registry only checks monotone non-negativity and floor safety,
    /// per §4.1).
    pub fn adjust_limit(&mut self, id: MemberId, new_limit: Balance) -> Result<(), IdentityError> {
        let member = self
            .members
            .get_mut(&id)
            .ok_or(IdentityError::IdentityNotFound(id))?;
        if new_limit <= 0 {
            return Err(IdentityError::LimitNotPositive);
        }
        if member.balance < -new_limit {
            warn!(member = %id, new_limit, balance = member.balance, "limit adjustment unsafe");
            return Err(IdentityError::LimitAdjustUnsafe);
        }
        let old_limit = member.limit;
        member.limit = new_limit;
        debug!(member = %id, old_limit, new_limit, "limit adjusted");
        Ok(())
    }

    /// Permitted only if `balance = 0` and `reserve = 0`.
    pub fn remove_member(&mut self, id: MemberId, reason: &str) -> Result<(), IdentityError> {
        let member = self
            .members
            .get(&id)
            .ok_or(IdentityError::IdentityNotFound(id))?;
        if member.balance != 0 || member.reserve != 0 {
            return Err(IdentityError::CannotRemoveNonzero(id));
        }
        let removed = self.members.remove(&id).expect("checked above");
        self.keys_in_use.remove(&removed.public_key.0);
        info!(member = %id, reason, "member removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pk(byte: u8) -> PublicKeyBytes {
        PublicKeyBytes(vec![byte; 32])
    }

    fn id(byte: u8) -> MemberId {
        MemberId::from_bytes([byte; 32])
    }

    #[test]
    fn add_member_succeeds_once() {
        let mut reg = IdentityRegistry::new();
        reg.add_member(id(1), pk(1), "alice".into(), 100, MemberStatus::Active, 0)
            .unwrap();
        let err = reg
            .add_member(id(1), pk(2), "alice2".into(), 100, MemberStatus::Active, 0)
            .unwrap_err();
        assert!(matches!(err, IdentityError::IdentityExists(_)));
    }

    #[test]
    fn add_member_rejects_reused_public_key() {
        let mut reg = IdentityRegistry::new();
        reg.add_member(id(1), pk(9), "alice".into(), 100, MemberStatus::Active, 0)
            .unwrap();
        let err = reg
            .add_member(id(2), pk(9), "bob".into(), 100, MemberStatus::Active, 0)
            .unwrap_err();
        assert!(matches!(err, IdentityError::PublicKeyInUse));
    }

    #[test]
    fn status_lattice_rejects_illegal_edge() {
        let mut reg = IdentityRegistry::new();
        reg.add_member(id(1), pk(1), "alice".into(), 100, MemberStatus::Pending, 0)
            .unwrap();
        let err = reg
            .set_status(id(1), MemberStatus::Active, "skip probation")
            .unwrap_err();
        assert!(matches!(err, IdentityError::StatusTransitionForbidden { .. }));
    }

    #[test]
    fn status_lattice_allows_pending_to_probation_to_active() {
        let mut reg = IdentityRegistry::new();
        reg.add_member(id(1), pk(1), "alice".into(), 100, MemberStatus::Pending, 0)
            .unwrap();
        reg.set_status(id(1), MemberStatus::Probation, "admit").unwrap();
        reg.set_status(id(1), MemberStatus::Active, "complete").unwrap();
        assert_eq!(reg.get(id(1)).unwrap().status, MemberStatus::Active);
    }

    #[test]
    fn adjust_limit_unsafe_when_it_would_break_the_floor() {
        let mut reg = IdentityRegistry::new();
        reg.add_member(id(1), pk(1), "alice".into(), 100, MemberStatus::Active, 0)
            .unwrap();
        reg.get_mut(id(1)).unwrap().apply_delta(-80);
        let err = reg.adjust_limit(id(1), 50).unwrap_err();
        assert!(matches!(err, IdentityError::LimitAdjustUnsafe));
    }

    #[test]
    fn remove_member_requires_zero_balance_and_reserve() {
        let mut reg = IdentityRegistry::new();
        reg.add_member(id(1), pk(1), "alice".into(), 100, MemberStatus::Active, 0)
            .unwrap();
        reg.get_mut(id(1)).unwrap().apply_delta(5);
        let err = reg.remove_member(id(1), "cleanup").unwrap_err();
        assert!(matches!(err, IdentityError::CannotRemoveNonzero(_)));
        reg.get_mut(id(1)).unwrap().apply_delta(-5);
        reg.remove_member(id(1), "cleanup").unwrap();
        assert!(!reg.contains(id(1)));
    }
}
