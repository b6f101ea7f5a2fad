//! # Ledger Groth16 Verification Library
//!
//! Shared proof types and the verifier interface for the election ledger.
//! Production verification uses Groth16 over the BN254 elliptic curve (alt_bn128).
//!
//! ## Cryptographic Primitives
//!
//! ### BN254 Curve (alt_bn128)
//! - **Definition**: y² = x³ + 3 over 𝔽_p where p = 21888242871839275222246405745257275088696311157297823662689037894645226208583
//! - **Scalar field order**: r = 21888242871839275222246405745257275088548364400416034343698204186575808495617
//!
//! ### Groth16 SNARK
//! - **Paper**: "On the Size of Pairing-based Non-interactive Arguments" by Jens Groth (2016)
//! - **Implementation**: Uses Soroban BN254 host functions for verification
//!
//! ## Verifier Interface
//!
//! The ledger never verifies proofs itself. It calls any contract exposing
//! [`ProofVerifier::verify`] with the public signals `[root, nullifier, proposal_id]`.

#![no_std]

use soroban_sdk::{
    contractclient, contracterror, contracttype,
    crypto::bn254::{Fr, G1Affine, G2Affine},
    Bytes, BytesN, Env, Vec, U256,
};

/// Number of public signals bound by a vote proof: `[root, nullifier, proposal_id]`
pub const PUBLIC_SIGNAL_COUNT: u32 = 3;

/// BN254 scalar field modulus (Fr) in big-endian bytes
/// r = 21888242871839275222246405745257275088548364400416034343698204186575808495617
/// All public signals (nullifier, root, etc.) must be < r to prevent modular reduction attacks
pub const BN254_FR_MODULUS: [u8; 32] = [
    0x30, 0x64, 0x4e, 0x72, 0xe1, 0x31, 0xa0, 0x29, 0xb8, 0x50, 0x45, 0xb6, 0x81, 0x81, 0x58, 0x5d,
    0x28, 0x33, 0xe8, 0x48, 0x79, 0xb9, 0x70, 0x91, 0x43, 0xe1, 0xf5, 0x93, 0xf0, 0x00, 0x00, 0x01,
];

/// BN254 scalar field order minus one (r - 1) in big-endian bytes
/// Used for G1 point negation: (r-1) * P = -P since (r-1) ≡ -1 (mod r)
const BN254_R_MINUS_ONE: [u8; 32] = [
    0x30, 0x64, 0x4e, 0x72, 0xe1, 0x31, 0xa0, 0x29, 0xb8, 0x50, 0x45, 0xb6, 0x81, 0x81, 0x58, 0x5d,
    0x28, 0x33, 0xe8, 0x48, 0x79, 0xb9, 0x70, 0x91, 0x43, 0xe1, 0xf5, 0x93, 0xf0, 0x00, 0x00, 0x00,
];

#[contracterror]
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Groth16Error {
    /// IC vector length doesn't match public signals + 1
    IcLengthMismatch = 30,
    /// Public signal value >= BN254 scalar field modulus (invalid field element)
    SignalNotInField = 31,
    /// Nullifier is zero (invalid)
    InvalidNullifier = 32,
}

/// Groth16 Verification Key for BN254
#[contracttype]
#[derive(Clone)]
pub struct VerificationKey {
    pub alpha: BytesN<64>,   // G1 point
    pub beta: BytesN<128>,   // G2 point
    pub gamma: BytesN<128>,  // G2 point
    pub delta: BytesN<128>,  // G2 point
    pub ic: Vec<BytesN<64>>, // IC points (G1)
}

/// Groth16 Proof
///
/// The eight 32-byte words of a Groth16 proof, big-endian, in EIP-196/197 order.
#[contracttype]
#[derive(Clone, Debug, PartialEq)]
pub struct Proof {
    pub a: BytesN<64>,  // G1 point
    pub b: BytesN<128>, // G2 point
    pub c: BytesN<64>,  // G1 point
}

impl Proof {
    /// Build a proof from its `uint[8]` form: `a = w0‖w1`, `b = w2‖w3‖w4‖w5`, `c = w6‖w7`.
    pub fn from_words(env: &Env, words: &[U256; 8]) -> Proof {
        let mut raw = [0u8; 256];
        for (i, word) in words.iter().enumerate() {
            word.to_be_bytes()
                .copy_into_slice(&mut raw[i * 32..(i + 1) * 32]);
        }

        let mut a = [0u8; 64];
        let mut b = [0u8; 128];
        let mut c = [0u8; 64];
        a.copy_from_slice(&raw[0..64]);
        b.copy_from_slice(&raw[64..192]);
        c.copy_from_slice(&raw[192..256]);

        Proof {
            a: BytesN::from_array(env, &a),
            b: BytesN::from_array(env, &b),
            c: BytesN::from_array(env, &c),
        }
    }
}

/// Black-box proof predicate consumed by the election ledger.
///
/// Implementations must be pure: the answer may depend only on the proof and the
/// public signals, never on ledger time or call ordering.
#[contractclient(name = "ProofVerifierClient")]
pub trait ProofVerifier {
    /// Does `proof` attest the public signals `[root, nullifier, proposal_id]`?
    fn verify(env: Env, proof: Proof, pub_signals: Vec<U256>) -> bool;
}

/// Validate that a U256 value is within the BN254 scalar field (< r)
///
/// This prevents modular reduction attacks where values >= r are reduced mod r,
/// allowing attackers to submit different U256 values that verify identically.
///
/// Returns `Err(Groth16Error::SignalNotInField)` if value >= r.
pub fn assert_in_field(env: &Env, value: &U256) -> Result<(), Groth16Error> {
    if !is_in_field(env, value) {
        return Err(Groth16Error::SignalNotInField);
    }
    Ok(())
}

/// Check if a U256 value is within the BN254 scalar field (< r)
pub fn is_in_field(env: &Env, value: &U256) -> bool {
    value < &field_modulus(env)
}

/// The BN254 scalar field modulus as a U256
pub fn field_modulus(env: &Env) -> U256 {
    U256::from_be_bytes(env, &Bytes::from_array(env, &BN254_FR_MODULUS))
}

/// Validate that a nullifier is non-zero and within the BN254 scalar field.
pub fn validate_nullifier(env: &Env, nullifier: &U256) -> Result<(), Groth16Error> {
    if nullifier == &U256::from_u32(env, 0) {
        return Err(Groth16Error::InvalidNullifier);
    }
    assert_in_field(env, nullifier)
}

/// Verify a Groth16 proof using BN254 pairing check.
///
/// The Groth16 verification equation is:
/// e(-A, B) * e(alpha, beta) * e(vk_x, gamma) * e(C, delta) = 1
///
/// Where vk_x = IC[0] + sum(pub_signals[i] * IC[i+1])
///
/// Returns `false` without touching the curve if the IC length does not match
/// the signal count or any signal lies outside the scalar field.
pub fn verify_groth16(
    env: &Env,
    vk: &VerificationKey,
    proof: &Proof,
    pub_signals: &Vec<U256>,
) -> bool {
    if pub_signals.len() + 1 != vk.ic.len() {
        return false;
    }
    for signal in pub_signals.iter() {
        if !is_in_field(env, &signal) {
            return false;
        }
    }

    let vk_x = compute_vk_x(vk, pub_signals);

    // (r-1) * A = -A
    let a_point = G1Affine::from_bytes(proof.a.clone());
    let neg_a = a_point * neg_one_scalar(env);

    let mut g1_vec = Vec::new(env);
    g1_vec.push_back(neg_a);
    g1_vec.push_back(G1Affine::from_bytes(vk.alpha.clone()));
    g1_vec.push_back(G1Affine::from_bytes(vk_x));
    g1_vec.push_back(G1Affine::from_bytes(proof.c.clone()));

    let mut g2_vec = Vec::new(env);
    g2_vec.push_back(G2Affine::from_bytes(proof.b.clone()));
    g2_vec.push_back(G2Affine::from_bytes(vk.beta.clone()));
    g2_vec.push_back(G2Affine::from_bytes(vk.gamma.clone()));
    g2_vec.push_back(G2Affine::from_bytes(vk.delta.clone()));

    env.crypto().bn254().pairing_check(g1_vec, g2_vec)
}

/// SHA-256 over the concatenated key points, for audit trails
pub fn hash_vk(env: &Env, vk: &VerificationKey) -> BytesN<32> {
    let mut data = Bytes::new(env);
    data.append(&Bytes::from_array(env, &vk.alpha.to_array()));
    data.append(&Bytes::from_array(env, &vk.beta.to_array()));
    data.append(&Bytes::from_array(env, &vk.gamma.to_array()));
    data.append(&Bytes::from_array(env, &vk.delta.to_array()));
    for ic_point in vk.ic.iter() {
        data.append(&Bytes::from_array(env, &ic_point.to_array()));
    }
    env.crypto().sha256(&data).into()
}

fn neg_one_scalar(env: &Env) -> Fr {
    let bytes = Bytes::from_array(env, &BN254_R_MINUS_ONE);
    Fr::from(U256::from_be_bytes(env, &bytes))
}

// vk_x = IC[0] + sum(pub_signals[i] * IC[i+1]); caller has checked the lengths
fn compute_vk_x(vk: &VerificationKey, pub_signals: &Vec<U256>) -> BytesN<64> {
    let mut vk_x = G1Affine::from_bytes(vk.ic.get_unchecked(0));

    for (i, signal) in pub_signals.iter().enumerate() {
        let ic_point = G1Affine::from_bytes(vk.ic.get_unchecked(i as u32 + 1));
        vk_x = vk_x + ic_point * Fr::from(signal);
    }

    vk_x.to_bytes()
}
