//! # Membership Tree
//!
//! Append-only incremental Merkle tree over identity commitments.
//!
//! Leaves are hashed pairwise with Poseidon over BN254, always as `(left, right)`.
//! Insertion walks a single path from leaf to root and reuses the rightmost
//! filled subtree at each level, so each insert costs `depth` hashes.
//!
//! Only the latest root is kept. Proposals snapshot it at creation time.

#![no_std]
use ledger_groth16::is_in_field;
use soroban_sdk::{
    contract, contracterror, contractimpl, contracttype, log, panic_with_error, Address, Env,
    Symbol, Vec, U256,
};

/// Depth 32 keeps leaf indices inside a u64 with room for the capacity check
pub const MAX_TREE_DEPTH: u32 = 32;

#[contracterror]
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum TreeError {
    Unauthorized = 1,
    InvalidDepth = 2,
    CapacityExceeded = 3,
    /// Leaf (or zero value) is not a BN254 scalar field element
    LeafNotInField = 4,
    LeafOutOfRange = 5,
}

#[contracttype]
#[derive(Clone)]
pub enum DataKey {
    Admin,
    TreeDepth,
    ZeroValue,
    NextLeafIndex,
    FilledSubtrees, // Vec<U256>, one per level
    Zeros,          // Vec<U256>, empty-subtree root per level, len = depth + 1
    Root,
    Node(u32, u64), // (level, index) -> latest hash of that node
}

// Typed Events
#[soroban_sdk::contractevent]
#[derive(Clone, Debug, PartialEq)]
pub struct TreeInitialized {
    pub depth: u32,
    pub empty_root: U256,
}

#[soroban_sdk::contractevent]
#[derive(Clone, Debug, PartialEq)]
pub struct MemberInserted {
    #[topic]
    pub index: u64,
    pub leaf: U256,
    pub new_root: U256,
}

#[contract]
pub struct MembershipTree;

#[contractimpl]
impl MembershipTree {
    /// Constructor: fix the admin, tree depth and empty-leaf value.
    /// Precomputes the empty-subtree roots so inserts never rehash empty levels.
    pub fn __constructor(env: Env, admin: Address, depth: u32, zero_value: U256) {
        if depth == 0 || depth > MAX_TREE_DEPTH {
            log!(&env, "invalid depth {}", depth);
            panic_with_error!(&env, TreeError::InvalidDepth);
        }
        if !is_in_field(&env, &zero_value) {
            panic_with_error!(&env, TreeError::LeafNotInField);
        }

        let zeros = Self::compute_zeros(&env, &zero_value, depth);

        let mut filled = Vec::new(&env);
        for level in 0..depth {
            filled.push_back(zeros.get_unchecked(level));
        }
        let empty_root = zeros.get_unchecked(depth);

        let storage = env.storage().instance();
        storage.set(&DataKey::Admin, &admin);
        storage.set(&DataKey::TreeDepth, &depth);
        storage.set(&DataKey::ZeroValue, &zero_value);
        storage.set(&DataKey::NextLeafIndex, &0u64);
        storage.set(&DataKey::FilledSubtrees, &filled);
        storage.set(&DataKey::Zeros, &zeros);
        storage.set(&DataKey::Root, &empty_root);

        TreeInitialized { depth, empty_root }.publish(&env);
    }

    /// Append a commitment. Admin only.
    ///
    /// Returns the leaf's index and the new root. Duplicate commitments are
    /// accepted; deduplication is the admin's policy, not the tree's.
    pub fn insert(env: Env, caller: Address, leaf: U256) -> Result<(u64, U256), TreeError> {
        Self::require_admin(&env, &caller)?;

        if !is_in_field(&env, &leaf) {
            return Err(TreeError::LeafNotInField);
        }

        let depth = Self::load_depth(&env);
        let index = Self::load_next_index(&env);
        if index >= Self::capacity(depth) {
            log!(&env, "tree is full at {} leaves", index);
            return Err(TreeError::CapacityExceeded);
        }

        let new_root = Self::insert_leaf(&env, leaf.clone(), index, depth);

        env.storage()
            .instance()
            .set(&DataKey::NextLeafIndex, &(index + 1));

        MemberInserted {
            index,
            leaf,
            new_root: new_root.clone(),
        }
        .publish(&env);

        Ok((index, new_root))
    }

    /// Get current root
    pub fn get_root(env: Env) -> U256 {
        env.storage().instance().get(&DataKey::Root).unwrap()
    }

    /// Number of leaves inserted so far
    pub fn size(env: Env) -> u64 {
        Self::load_next_index(&env)
    }

    /// (depth, size, root)
    pub fn get_tree_info(env: Env) -> (u32, u64, U256) {
        let depth = Self::load_depth(&env);
        let size = Self::load_next_index(&env);
        (depth, size, Self::get_root(env))
    }

    pub fn zero_value(env: Env) -> U256 {
        env.storage().instance().get(&DataKey::ZeroValue).unwrap()
    }

    pub fn admin(env: Env) -> Address {
        env.storage().instance().get(&DataKey::Admin).unwrap()
    }

    /// Get Merkle path for a specific leaf index against the current root
    /// Returns (pathElements, pathIndices) where:
    /// - pathElements[i] is the sibling hash at level i
    /// - pathIndices[i] is 0 if the node is a left child, 1 if right
    pub fn get_merkle_path(env: Env, leaf_index: u64) -> Result<(Vec<U256>, Vec<u32>), TreeError> {
        if leaf_index >= Self::load_next_index(&env) {
            return Err(TreeError::LeafOutOfRange);
        }

        let depth = Self::load_depth(&env);
        let zeros = Self::load_zeros(&env);

        let mut path_elements = Vec::new(&env);
        let mut path_indices = Vec::new(&env);
        let mut current_index = leaf_index;

        for level in 0..depth {
            path_indices.push_back((current_index % 2) as u32);

            // Siblings never written to are still empty subtrees
            let sibling = env
                .storage()
                .persistent()
                .get(&DataKey::Node(level, current_index ^ 1))
                .unwrap_or_else(|| zeros.get_unchecked(level));
            path_elements.push_back(sibling);

            current_index /= 2;
        }

        Ok((path_elements, path_indices))
    }

    fn require_admin(env: &Env, caller: &Address) -> Result<(), TreeError> {
        caller.require_auth();
        let admin: Address = env.storage().instance().get(&DataKey::Admin).unwrap();
        if &admin != caller {
            log!(env, "insert rejected: caller is not admin");
            return Err(TreeError::Unauthorized);
        }
        Ok(())
    }

    // Internal: walk from leaf to root, updating filled subtrees in place
    fn insert_leaf(env: &Env, leaf: U256, index: u64, depth: u32) -> U256 {
        let zeros = Self::load_zeros(env);
        let mut filled: Vec<U256> = env
            .storage()
            .instance()
            .get(&DataKey::FilledSubtrees)
            .unwrap();

        let mut current_hash = leaf;
        let mut current_index = index;

        for level in 0..depth {
            env.storage()
                .persistent()
                .set(&DataKey::Node(level, current_index), &current_hash);

            current_hash = if current_index % 2 == 0 {
                // Left child - becomes the rightmost filled subtree, right side still empty
                filled.set(level, current_hash.clone());
                Self::hash_pair(env, &current_hash, &zeros.get_unchecked(level))
            } else {
                // Right child - left sibling is the filled subtree
                Self::hash_pair(env, &filled.get_unchecked(level), &current_hash)
            };
            current_index /= 2;
        }

        env.storage()
            .instance()
            .set(&DataKey::FilledSubtrees, &filled);
        env.storage().instance().set(&DataKey::Root, &current_hash);

        current_hash
    }

    // Internal: Poseidon hash of two U256 values
    fn hash_pair(env: &Env, left: &U256, right: &U256) -> U256 {
        let field = Symbol::new(env, "BN254");
        let inputs = soroban_sdk::vec![env, left.clone(), right.clone()];
        env.crypto().poseidon_hash(&inputs, field)
    }

    // zeros[0] = zero_value, zeros[i+1] = H(zeros[i], zeros[i])
    fn compute_zeros(env: &Env, zero_value: &U256, depth: u32) -> Vec<U256> {
        let mut zeros = Vec::new(env);
        let mut current = zero_value.clone();
        zeros.push_back(current.clone());

        for _ in 0..depth {
            current = Self::hash_pair(env, &current, &current);
            zeros.push_back(current.clone());
        }
        zeros
    }

    fn capacity(depth: u32) -> u64 {
        1u64 << depth
    }

    fn load_depth(env: &Env) -> u32 {
        env.storage().instance().get(&DataKey::TreeDepth).unwrap()
    }

    fn load_next_index(env: &Env) -> u64 {
        env.storage()
            .instance()
            .get(&DataKey::NextLeafIndex)
            .unwrap_or(0)
    }

    fn load_zeros(env: &Env) -> Vec<U256> {
        env.storage().instance().get(&DataKey::Zeros).unwrap()
    }
}

// Test-only functions in separate contractimpl block
// This prevents the macro from generating references to these functions in production builds
#[cfg(any(test, feature = "testutils"))]
#[contractimpl]
impl MembershipTree {
    /// Test helper: expose the pair hash so callers can recompute roots off-tree
    pub fn test_hash_pair(env: Env, a: U256, b: U256) -> U256 {
        Self::hash_pair(&env, &a, &b)
    }

    /// Test helper: root of an empty subtree of the given height
    pub fn test_zero_at_level(env: Env, level: u32) -> U256 {
        Self::load_zeros(&env).get_unchecked(level)
    }
}
