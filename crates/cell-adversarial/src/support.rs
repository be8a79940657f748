use std::collections::HashMap;

use cell_core::registry::MemberStatus;
use cell_core::types::{Balance, MemberId, PublicKeyBytes, Timestamp};
use cell_crypto::SigningPort;
use cell_invariants::{evaluate_all, InvariantId, TrialHarness};
use cell_ledger::{JournalReason, SpotTransactionBody};

/// Drives one signed spot transaction through the ledger exactly the way a
/// real caller would: builds the canonical body, signs it with the payer's
/// stored signer, and submits it through `apply_balance_updates`. Returns
/// whether it was accepted.
pub fn transfer<P: SigningPort>(
    harness: &mut TrialHarness<P>,
    payer: MemberId,
    payee: MemberId,
    amount: Balance,
    now: Timestamp,
) -> bool {
    if amount <= 0 {
        return false;
    }
    let correlation_id = harness.next_correlation();
    let body = SpotTransactionBody {
        payer,
        payee,
        amount,
        description: "scenario",
        created_at: now,
        nonce: harness.correlation_counter,
    };
    let message = body.canonical_bytes();
    let Some(signer) = harness.signers.get(&payer) else {
        return false;
    };
    let Ok(signature) = harness.engine.ledger().crypto().sign(signer, &message) else {
        return false;
    };
    let mut signatures = HashMap::new();
    signatures.insert(payer, signature);
    harness
        .engine
        .ledger_mut()
        .apply_balance_updates(
            &[
                (payer, -amount, JournalReason::SpotTransactionPayer),
                (payee, amount, JournalReason::SpotTransactionPayee),
            ],
            correlation_id,
            &message,
            &signatures,
            now,
            true,
        )
        .is_ok()
}

/// Evaluates the checkers a scenario's pass criteria reference and folds any
/// failures into `accumulated`, deduplicating.
pub fn record_violations<P: SigningPort>(
    harness: &TrialHarness<P>,
    accumulated: &mut Vec<InvariantId>,
) {
    for id in evaluate_all(&harness.snapshot()) {
        if !accumulated.contains(&id) {
            accumulated.push(id);
        }
    }
}

/// Attempts a transfer of `min(requested, payer's available capacity)`,
/// i.e. an attacker squeezing out as much as the floor still allows. Returns
/// the amount actually moved (zero if the payer has no capacity left).
pub fn extract_up_to<P: SigningPort>(
    harness: &mut TrialHarness<P>,
    payer: MemberId,
    payee: MemberId,
    requested: Balance,
    now: Timestamp,
) -> Balance {
    let cap = harness
        .engine
        .ledger()
        .get_available_capacity(payer)
        .unwrap_or(0);
    let amount = requested.min(cap);
    if amount <= 0 {
        return 0;
    }
    if transfer(harness, payer, payee, amount, now) {
        amount
    } else {
        0
    }
}

/// Sum of a set of members' current balances, floored at zero per-member —
/// the portion of a population's position that represents net extraction
/// rather than a liability they still carry.
pub fn positive_balance_sum<P: SigningPort>(harness: &TrialHarness<P>, members: &[MemberId]) -> Balance {
    members
        .iter()
        .filter_map(|id| harness.engine.ledger().get_balance(*id).ok())
        .map(|b| b.max(0))
        .sum()
}

/// Builds `count` fresh `(MemberId, PublicKeyBytes, Signer)` identities from
/// one crypto port instance, for scenarios that need to replay the same
/// ordered operation stream across two independently constructed ledgers
/// (ADV-06).
pub fn shared_identities<P: SigningPort + Default>(
    count: usize,
) -> Vec<(MemberId, PublicKeyBytes, P::Signer)> {
    let port = P::default();
    (0..count)
        .map(|_| {
            let (signer, public_key) = port.keypair().expect("keypair generation");
            let id = port.derive_identity_id(&public_key).expect("id derivation");
            (id, public_key, signer)
        })
        .collect()
}

/// Constructs a fresh [`TrialHarness`] preloaded with a fixed set of
/// identities (as produced by [`shared_identities`]), each admitted straight
/// to ACTIVE with the given credit limit.
pub fn harness_with_identities<P: SigningPort + Default>(
    identities: &[(MemberId, PublicKeyBytes, P::Signer)],
    limit: Balance,
) -> TrialHarness<P>
where
    P::Signer: Clone,
{
    let mut harness = TrialHarness::new(P::default());
    for (id, public_key, signer) in identities {
        harness
            .engine
            .ledger_mut()
            .registry_mut()
            .add_member(*id, public_key.clone(), "member".into(), limit, MemberStatus::Probation, 0)
            .expect("add_member");
        harness
            .engine
            .ledger_mut()
            .registry_mut()
            .set_status(*id, MemberStatus::Active, "scenario-admit")
            .expect("set_status");
        harness.signers.insert(*id, signer.clone());
    }
    harness
}
