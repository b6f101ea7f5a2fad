//! # Groth16 Vote Verifier
//!
//! Production [`ProofVerifier`] for the election ledger. The verification key is
//! fixed at deployment; replacing the circuit means deploying a new verifier and
//! a new ledger pointing at it.
//!
//! Public signals are `[root, nullifier, proposal_id]`, so the key must carry
//! exactly four IC points.

#![no_std]
use ledger_groth16::{
    hash_vk, verify_groth16, Groth16Error, Proof, ProofVerifier, VerificationKey,
    PUBLIC_SIGNAL_COUNT,
};
use soroban_sdk::{
    contract, contractimpl, contracttype, log, panic_with_error, BytesN, Env, Vec, U256,
};

#[contracttype]
#[derive(Clone)]
pub enum DataKey {
    VerifyingKey,
    VerifyingKeyHash,
}

#[soroban_sdk::contractevent]
#[derive(Clone, Debug, PartialEq)]
pub struct VerifyingKeySet {
    pub vk_hash: BytesN<32>,
}

#[contract]
pub struct Groth16Verifier;

#[contractimpl]
impl Groth16Verifier {
    /// Constructor: store the verification key for the vote circuit
    pub fn __constructor(env: Env, vk: VerificationKey) {
        if vk.ic.len() != PUBLIC_SIGNAL_COUNT + 1 {
            log!(&env, "verification key has {} IC points", vk.ic.len());
            panic_with_error!(&env, Groth16Error::IcLengthMismatch);
        }

        let vk_hash = hash_vk(&env, &vk);
        env.storage().instance().set(&DataKey::VerifyingKey, &vk);
        env.storage()
            .instance()
            .set(&DataKey::VerifyingKeyHash, &vk_hash);

        VerifyingKeySet { vk_hash }.publish(&env);
    }

    /// SHA-256 of the stored verification key
    pub fn vk_hash(env: Env) -> BytesN<32> {
        env.storage()
            .instance()
            .get(&DataKey::VerifyingKeyHash)
            .unwrap()
    }
}

#[contractimpl]
impl ProofVerifier for Groth16Verifier {
    fn verify(env: Env, proof: Proof, pub_signals: Vec<U256>) -> bool {
        if pub_signals.len() != PUBLIC_SIGNAL_COUNT {
            log!(&env, "expected 3 public signals, got {}", pub_signals.len());
            return false;
        }

        let vk: VerificationKey = match env.storage().instance().get(&DataKey::VerifyingKey) {
            Some(vk) => vk,
            None => return false,
        };

        verify_groth16(&env, &vk, &proof, &pub_signals)
    }
}
