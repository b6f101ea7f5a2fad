// End-to-end voting flows over a real membership tree and election ledger

use election_ledger::{LedgerError, NullifierScope};
use ledger_integration_tests::{
    balancing_nullifier, binding_proof, generator_proof, LedgerSystem, VerifierKind, DAY,
};
use soroban_sdk::{testutils::Ledger as _, U256};

#[test]
fn test_proposal_locks_current_root() {
    let system = LedgerSystem::new(8, NullifierScope::Global, VerifierKind::AcceptAll);
    let ledger = system.ledger_client();

    let root = system.add_members(&[111, 222, 333]);
    let locked = system.open_proposal(1, "Fund the commons");

    assert_eq!(locked, root);
    assert_eq!(ledger.get_proposal(&1u64).root, root);
    assert_eq!(ledger.status(&1u64), election_ledger::ProposalStatus::Active);
}

#[test]
fn test_late_member_cannot_vote_on_earlier_proposal() {
    let system = LedgerSystem::new(8, NullifierScope::Global, VerifierKind::Binding);
    let env = &system.env;
    let ledger = system.ledger_client();

    let snapshot = system.add_members(&[111, 222, 333]);
    system.open_proposal(1, "Before the newcomer");

    // The tree moves on, the proposal does not
    let grown = system.add_members(&[444]);
    assert_ne!(grown, snapshot);
    assert_eq!(ledger.get_proposal(&1u64).root, snapshot);

    // A proof against the grown tree is a proof about the wrong voter set
    let late = U256::from_u32(env, 4040);
    let result = ledger.try_vote(
        &1u64,
        &grown,
        &late,
        &1u32,
        &binding_proof(env, &grown, &late, 1),
    );
    assert_eq!(result, Err(Ok(LedgerError::RootMismatch)));

    // An original member still votes against the snapshot
    let early = U256::from_u32(env, 1010);
    ledger.vote(
        &1u64,
        &snapshot,
        &early,
        &1u32,
        &binding_proof(env, &snapshot, &early, 1),
    );
    assert_eq!(ledger.get_count(&1u64, &1u32), 1);

    // The newcomer is eligible for proposals opened afterwards
    system.open_proposal(2, "After the newcomer");
    ledger.vote(
        &2u64,
        &grown,
        &late,
        &0u32,
        &binding_proof(env, &grown, &late, 2),
    );
    assert_eq!(ledger.get_count(&2u64, &0u32), 1);
}

#[test]
fn test_stale_root_rejected_then_resubmitted() {
    let system = LedgerSystem::new(6, NullifierScope::Global, VerifierKind::Binding);
    let env = &system.env;
    let ledger = system.ledger_client();

    let stale = system.add_members(&[1, 2]);
    let current = system.add_members(&[3]);
    system.open_proposal(1, "Stale client");

    let nullifier = U256::from_u32(env, 77);
    let result = ledger.try_vote(
        &1u64,
        &stale,
        &nullifier,
        &2u32,
        &binding_proof(env, &stale, &nullifier, 1),
    );
    assert_eq!(result, Err(Ok(LedgerError::RootMismatch)));
    assert!(!ledger.is_spent(&1u64, &nullifier));

    // Regenerated against the locked root, the same nullifier goes through
    ledger.vote(
        &1u64,
        &current,
        &nullifier,
        &2u32,
        &binding_proof(env, &current, &nullifier, 1),
    );
    assert_eq!(ledger.get_count(&1u64, &2u32), 1);
    assert!(ledger.is_spent(&1u64, &nullifier));
}

#[test]
fn test_global_nullifier_blocks_second_proposal() {
    let system = LedgerSystem::new(6, NullifierScope::Global, VerifierKind::Binding);
    let env = &system.env;
    let ledger = system.ledger_client();

    let root = system.add_members(&[10, 20, 30]);
    system.open_proposal(1, "First");
    system.open_proposal(2, "Second");

    let nullifier = U256::from_u32(env, 555);
    ledger.vote(
        &1u64,
        &root,
        &nullifier,
        &1u32,
        &binding_proof(env, &root, &nullifier, 1),
    );

    let result = ledger.try_vote(
        &2u64,
        &root,
        &nullifier,
        &1u32,
        &binding_proof(env, &root, &nullifier, 2),
    );
    assert_eq!(result, Err(Ok(LedgerError::DoubleVote)));
    assert_eq!(ledger.get_count(&2u64, &1u32), 0);
}

#[test]
fn test_per_proposal_nullifier_votes_once_each() {
    let system = LedgerSystem::new(6, NullifierScope::PerProposal, VerifierKind::Binding);
    let env = &system.env;
    let ledger = system.ledger_client();

    let root = system.add_members(&[10, 20, 30]);
    system.open_proposal(1, "First");
    system.open_proposal(2, "Second");

    let nullifier = U256::from_u32(env, 555);
    for id in [1u64, 2] {
        ledger.vote(
            &id,
            &root,
            &nullifier,
            &1u32,
            &binding_proof(env, &root, &nullifier, id),
        );
    }
    assert_eq!(ledger.get_count(&1u64, &1u32), 1);
    assert_eq!(ledger.get_count(&2u64, &1u32), 1);

    let result = ledger.try_vote(
        &1u64,
        &root,
        &nullifier,
        &0u32,
        &binding_proof(env, &root, &nullifier, 1),
    );
    assert_eq!(result, Err(Ok(LedgerError::DoubleVote)));
}

#[test]
fn test_proof_is_bound_to_its_signals() {
    let system = LedgerSystem::new(6, NullifierScope::PerProposal, VerifierKind::Binding);
    let env = &system.env;
    let ledger = system.ledger_client();

    let root = system.add_members(&[10, 20]);
    system.open_proposal(1, "First");
    system.open_proposal(2, "Second");

    let nullifier = U256::from_u32(env, 9);
    let proof_for_one = binding_proof(env, &root, &nullifier, 1);

    // Replayed on another proposal
    let result = ledger.try_vote(&2u64, &root, &nullifier, &1u32, &proof_for_one);
    assert_eq!(result, Err(Ok(LedgerError::InvalidProof)));

    // Presented with a different nullifier
    let other = U256::from_u32(env, 10);
    let result = ledger.try_vote(&1u64, &root, &other, &1u32, &proof_for_one);
    assert_eq!(result, Err(Ok(LedgerError::InvalidProof)));

    assert!(!ledger.is_spent(&1u64, &other));
    assert!(!ledger.is_spent(&2u64, &nullifier));

    // The proof still works where it belongs
    ledger.vote(&1u64, &root, &nullifier, &1u32, &proof_for_one);
    assert_eq!(ledger.get_count(&1u64, &1u32), 1);
}

#[test]
fn test_tally_across_options() {
    let system = LedgerSystem::new(6, NullifierScope::Global, VerifierKind::AcceptAll);
    let env = &system.env;
    let ledger = system.ledger_client();

    let root = system.add_members(&[1, 2, 3, 4, 5]);
    system.open_proposal(1, "Pick a colour");

    let choices = [0u32, 2, 2, 1, 2];
    for (i, option) in choices.iter().enumerate() {
        let nullifier = U256::from_u32(env, 100 + i as u32);
        ledger.vote(
            &1u64,
            &root,
            &nullifier,
            option,
            &binding_proof(env, &root, &nullifier, 1),
        );
    }

    assert_eq!(ledger.get_count(&1u64, &0u32), 1);
    assert_eq!(ledger.get_count(&1u64, &1u32), 1);
    assert_eq!(ledger.get_count(&1u64, &2u32), 3);
    assert_eq!(ledger.get_count(&1u64, &3u32), 0);

    let results = ledger.get_results(&1u64);
    assert_eq!(results.len(), 3);
    assert_eq!(results.get(2u32), Some(3u64));
}

#[test]
fn test_voting_closes_after_window() {
    let system = LedgerSystem::new(4, NullifierScope::Global, VerifierKind::AcceptAll);
    let env = &system.env;
    let ledger = system.ledger_client();

    env.ledger().set_timestamp(1_000);
    let root = system.add_members(&[42]);
    system.open_proposal(1, "Short lived");

    env.ledger().set_timestamp(1_000 + DAY + 1);
    let nullifier = U256::from_u32(env, 1);
    let result = ledger.try_vote(
        &1u64,
        &root,
        &nullifier,
        &1u32,
        &generator_proof(env),
    );
    assert_eq!(result, Err(Ok(LedgerError::VotingClosed)));
    assert_eq!(
        ledger.status(&1u64),
        election_ledger::ProposalStatus::Closed
    );
}

#[test]
fn test_groth16_verifier_end_to_end() {
    let system = LedgerSystem::new(4, NullifierScope::Global, VerifierKind::Groth16);
    let env = &system.env;
    let ledger = system.ledger_client();

    let root = system.add_members(&[111, 222, 333]);
    system.open_proposal(1, "Pairing check");

    // Any other nullifier unbalances the pairing product
    let wrong = U256::from_u32(env, 3);
    let result = ledger.try_vote(&1u64, &root, &wrong, &1u32, &generator_proof(env));
    assert_eq!(result, Err(Ok(LedgerError::InvalidProof)));

    let nullifier = balancing_nullifier(env, &root, 1);
    ledger.vote(&1u64, &root, &nullifier, &1u32, &generator_proof(env));
    assert_eq!(ledger.get_count(&1u64, &1u32), 1);
    assert!(ledger.is_spent(&1u64, &nullifier));

    // Replaying the accepted proof is caught by the spent set
    let result = ledger.try_vote(&1u64, &root, &nullifier, &0u32, &generator_proof(env));
    assert_eq!(result, Err(Ok(LedgerError::DoubleVote)));
}
