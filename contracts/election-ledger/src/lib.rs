//! # Election Ledger
//!
//! Anonymous voting over a membership tree snapshot.
//!
//! A proposal locks the tree root current at creation; only proofs against that
//! exact root count. Each vote reveals a nullifier, which is spent on success so
//! the same identity cannot vote again. The ledger never learns which
//! commitment a nullifier belongs to; that link lives inside the proof.
//!
//! ## Vote Validation Order
//!
//! 1. proposal exists
//! 2. `start <= now <= end`
//! 3. claimed root equals the locked root
//! 4. nullifier unspent in its scope
//! 5. option fits in a byte, nullifier is a field element
//! 6. verifier accepts `[root, nullifier, proposal_id]`
//!
//! Nothing is written until every check passes.

#![no_std]
use ledger_groth16::{is_in_field, Proof, ProofVerifierClient};
use soroban_sdk::{
    contract, contracterror, contractimpl, contracttype, log, symbol_short, Address, Env, Map,
    String, Symbol, Vec, U256,
};

const ADMIN: Symbol = symbol_short!("admin");
const TREE_CONTRACT: Symbol = symbol_short!("tree");
const VERIFIER_CONTRACT: Symbol = symbol_short!("verifier");
const NULLIFIER_SCOPE: Symbol = symbol_short!("scope");
const PROPOSAL_COUNT: Symbol = symbol_short!("prop_cnt");

// Size limits to prevent DoS attacks
pub const MAX_TITLE_LEN: u32 = 1024;
/// Options are byte-sized identifiers
pub const MAX_OPTION: u32 = 255;

// Proposal ids are non-zero, so scope 0 is free for the ledger-wide nullifier set
const GLOBAL_SCOPE: u64 = 0;

#[contracterror]
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum LedgerError {
    Unauthorized = 1,
    InvalidId = 2,
    InvalidWindow = 3,
    DuplicateProposal = 4,
    NotFound = 5,
    VotingClosed = 6,
    RootMismatch = 7,
    DoubleVote = 8,
    InvalidProof = 9,
    InvalidOption = 10,
    TitleTooLong = 11,
}

#[contracttype]
#[derive(Clone)]
pub enum DataKey {
    Proposal(u64),        // proposal_id -> ProposalInfo
    Tally(u64),           // proposal_id -> Map<option, count>
    Nullifier(u64, U256), // (scope, nullifier) -> bool
}

/// Where a nullifier is single-use
#[contracttype]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NullifierScope {
    Global,      // Once per ledger, across every proposal
    PerProposal, // Once per proposal
}

/// Derived from ledger time against the fixed window; never stored
#[contracttype]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProposalStatus {
    Pending,
    Active,
    Closed,
}

#[contracttype]
#[derive(Clone, Debug, PartialEq)]
pub struct ProposalInfo {
    pub id: u64,
    pub title: String,
    pub root: U256, // Tree root at creation - defines the eligible voter set
    pub start: u64,
    pub end: u64,
    pub created_by: Address,
    pub created_at: u64,
}

// Typed Events
#[soroban_sdk::contractevent]
#[derive(Clone, Debug, PartialEq)]
pub struct ProposalCreated {
    #[topic]
    pub id: u64,
    pub title: String,
    pub root: U256,
    pub start: u64,
    pub end: u64,
}

#[soroban_sdk::contractevent]
#[derive(Clone, Debug, PartialEq)]
pub struct Voted {
    #[topic]
    pub proposal_id: u64,
    pub option: u32,
    pub nullifier: U256,
}

#[contract]
pub struct ElectionLedger;

#[contractimpl]
impl ElectionLedger {
    /// Constructor: bind the ledger to its admin, membership tree and proof verifier
    pub fn __constructor(
        env: Env,
        admin: Address,
        tree_contract: Address,
        verifier_contract: Address,
        nullifier_scope: NullifierScope,
    ) {
        let storage = env.storage().instance();
        storage.set(&ADMIN, &admin);
        storage.set(&TREE_CONTRACT, &tree_contract);
        storage.set(&VERIFIER_CONTRACT, &verifier_contract);
        storage.set(&NULLIFIER_SCOPE, &nullifier_scope);
        storage.set(&PROPOSAL_COUNT, &0u64);
    }

    /// Open a proposal locked to the tree's current root. Admin only.
    ///
    /// Returns the locked root.
    pub fn create_proposal(
        env: Env,
        caller: Address,
        id: u64,
        title: String,
        start: u64,
        end: u64,
    ) -> Result<U256, LedgerError> {
        Self::require_admin(&env, &caller)?;

        if id == 0 {
            return Err(LedgerError::InvalidId);
        }
        if start >= end {
            log!(&env, "invalid window {} >= {}", start, end);
            return Err(LedgerError::InvalidWindow);
        }
        if title.len() > MAX_TITLE_LEN {
            return Err(LedgerError::TitleTooLong);
        }

        let key = DataKey::Proposal(id);
        if env.storage().persistent().has(&key) {
            return Err(LedgerError::DuplicateProposal);
        }

        // Snapshot current Merkle root - defines the eligible voter set
        let tree_contract: Address = env.storage().instance().get(&TREE_CONTRACT).unwrap();
        let root: U256 = env.invoke_contract(
            &tree_contract,
            &symbol_short!("get_root"),
            soroban_sdk::vec![&env],
        );

        let proposal = ProposalInfo {
            id,
            title: title.clone(),
            root: root.clone(),
            start,
            end,
            created_by: caller,
            created_at: env.ledger().timestamp(),
        };
        env.storage().persistent().set(&key, &proposal);
        env.storage()
            .persistent()
            .set(&DataKey::Tally(id), &Map::<u32, u64>::new(&env));

        let count: u64 = env.storage().instance().get(&PROPOSAL_COUNT).unwrap_or(0);
        env.storage().instance().set(&PROPOSAL_COUNT, &(count + 1));

        ProposalCreated {
            id,
            title,
            root: root.clone(),
            start,
            end,
        }
        .publish(&env);

        Ok(root)
    }

    /// Submit an anonymous vote. Callable by anyone.
    pub fn vote(
        env: Env,
        proposal_id: u64,
        root: U256,
        nullifier: U256,
        option: u32,
        proof: Proof,
    ) -> Result<(), LedgerError> {
        let proposal = Self::load_proposal(&env, proposal_id)?;

        let now = env.ledger().timestamp();
        if now < proposal.start || now > proposal.end {
            log!(&env, "vote at {} outside window", now);
            return Err(LedgerError::VotingClosed);
        }

        // Root must exactly match the snapshot: members added later, and stale
        // roots from before creation, are both outside the eligible set
        if root != proposal.root {
            return Err(LedgerError::RootMismatch);
        }

        let null_key = Self::nullifier_key(&env, proposal_id, &nullifier);
        if env.storage().persistent().has(&null_key) {
            log!(&env, "nullifier already spent");
            return Err(LedgerError::DoubleVote);
        }

        if option > MAX_OPTION {
            return Err(LedgerError::InvalidOption);
        }

        // n and n + r verify identically but would be distinct spent-set keys
        if !is_in_field(&env, &nullifier) {
            return Err(LedgerError::InvalidProof);
        }

        // Public signals: [root, nullifier, proposalId]
        let pub_signals = soroban_sdk::vec![
            &env,
            root,
            nullifier.clone(),
            U256::from_u128(&env, proposal_id as u128)
        ];
        if !Self::verify_proof(&env, &proof, &pub_signals) {
            log!(&env, "proof rejected for proposal {}", proposal_id);
            return Err(LedgerError::InvalidProof);
        }

        env.storage().persistent().set(&null_key, &true);

        let mut tally = Self::load_tally(&env, proposal_id);
        tally.set(option, tally.get(option).unwrap_or(0) + 1);
        env.storage()
            .persistent()
            .set(&DataKey::Tally(proposal_id), &tally);

        Voted {
            proposal_id,
            option,
            nullifier,
        }
        .publish(&env);

        Ok(())
    }

    /// Get proposal info
    pub fn get_proposal(env: Env, id: u64) -> Result<ProposalInfo, LedgerError> {
        Self::load_proposal(&env, id)
    }

    /// Votes recorded for `option`; zero if never voted on
    pub fn get_count(env: Env, id: u64, option: u32) -> Result<u64, LedgerError> {
        Self::load_proposal(&env, id)?;
        Ok(Self::load_tally(&env, id).get(option).unwrap_or(0))
    }

    /// Full tally for a proposal, only options with at least one vote
    pub fn get_results(env: Env, id: u64) -> Result<Map<u32, u64>, LedgerError> {
        Self::load_proposal(&env, id)?;
        Ok(Self::load_tally(&env, id))
    }

    pub fn status(env: Env, id: u64) -> Result<ProposalStatus, LedgerError> {
        let proposal = Self::load_proposal(&env, id)?;
        let now = env.ledger().timestamp();
        let status = if now < proposal.start {
            ProposalStatus::Pending
        } else if now <= proposal.end {
            ProposalStatus::Active
        } else {
            ProposalStatus::Closed
        };
        Ok(status)
    }

    /// Check if nullifier has been used. `proposal_id` is ignored under global scope.
    pub fn is_spent(env: Env, proposal_id: u64, nullifier: U256) -> bool {
        let key = Self::nullifier_key(&env, proposal_id, &nullifier);
        env.storage().persistent().has(&key)
    }

    pub fn nullifier_scope(env: Env) -> NullifierScope {
        env.storage().instance().get(&NULLIFIER_SCOPE).unwrap()
    }

    /// Number of proposals created
    pub fn proposal_count(env: Env) -> u64 {
        env.storage().instance().get(&PROPOSAL_COUNT).unwrap_or(0)
    }

    /// Get tree contract address
    pub fn tree_contract(env: Env) -> Address {
        env.storage().instance().get(&TREE_CONTRACT).unwrap()
    }

    /// Get verifier contract address
    pub fn verifier_contract(env: Env) -> Address {
        env.storage().instance().get(&VERIFIER_CONTRACT).unwrap()
    }

    pub fn admin(env: Env) -> Address {
        env.storage().instance().get(&ADMIN).unwrap()
    }

    fn require_admin(env: &Env, caller: &Address) -> Result<(), LedgerError> {
        caller.require_auth();
        let admin: Address = env.storage().instance().get(&ADMIN).unwrap();
        if &admin != caller {
            log!(env, "caller is not admin");
            return Err(LedgerError::Unauthorized);
        }
        Ok(())
    }

    // Existence is the storage entry itself; a window may legitimately start at 0
    fn load_proposal(env: &Env, id: u64) -> Result<ProposalInfo, LedgerError> {
        env.storage()
            .persistent()
            .get(&DataKey::Proposal(id))
            .ok_or(LedgerError::NotFound)
    }

    fn load_tally(env: &Env, id: u64) -> Map<u32, u64> {
        env.storage()
            .persistent()
            .get(&DataKey::Tally(id))
            .unwrap_or_else(|| Map::new(env))
    }

    fn nullifier_key(env: &Env, proposal_id: u64, nullifier: &U256) -> DataKey {
        let scope = match Self::nullifier_scope(env.clone()) {
            NullifierScope::Global => GLOBAL_SCOPE,
            NullifierScope::PerProposal => proposal_id,
        };
        DataKey::Nullifier(scope, nullifier.clone())
    }

    // A verifier that traps counts as a rejection
    fn verify_proof(env: &Env, proof: &Proof, pub_signals: &Vec<U256>) -> bool {
        let verifier: Address = env.storage().instance().get(&VERIFIER_CONTRACT).unwrap();
        let client = ProofVerifierClient::new(env, &verifier);
        matches!(client.try_verify(proof, pub_signals), Ok(Ok(true)))
    }
}
