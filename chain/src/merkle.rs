//! Merkle tree over accumulator element leaves.
//!
//! The leaf list is padded to a power of two, so a proof is just the sibling
//! hashes from leaf to root and verification needs nothing beyond the leaf
//! index. The whole tree is rebuilt when the element set changes; callers
//! read out fresh proofs for every live leaf afterwards.

use merlin::Transcript;
use subtle::ConstantTimeEq;

use crate::types::Hash256;

const DOMAIN: &[u8] = b"chain.elements";

fn challenge(t: &mut Transcript) -> Hash256 {
    let mut buf = [0u8; 32];
    t.challenge_bytes(b"merkle.node", &mut buf);
    Hash256(buf)
}

/// Hash of an empty (padding) leaf.
pub fn empty_hash() -> Hash256 {
    let mut t = Transcript::new(DOMAIN);
    t.append_message(b"padding", b"");
    challenge(&mut t)
}

fn node_hash(left: &Hash256, right: &Hash256) -> Hash256 {
    let mut t = Transcript::new(DOMAIN);
    t.append_message(b"L", &left.0);
    t.append_message(b"R", &right.0);
    challenge(&mut t)
}

/// Merkle tree with all intermediate levels retained so that a path can be
/// produced for any leaf.
pub struct MerkleTree {
    levels: Vec<Vec<Hash256>>,
}

impl MerkleTree {
    /// Builds a tree over the given leaf hashes.
    pub fn build(mut leaves: Vec<Hash256>) -> MerkleTree {
        let width = leaves.len().max(1).next_power_of_two();
        leaves.resize(width, empty_hash());

        let mut levels = vec![leaves];
        while levels.last().unwrap().len() > 1 {
            let prev = levels.last().unwrap();
            let next = prev
                .chunks(2)
                .map(|pair| node_hash(&pair[0], &pair[1]))
                .collect();
            levels.push(next);
        }
        MerkleTree { levels }
    }

    pub fn root(&self) -> Hash256 {
        self.levels.last().unwrap()[0]
    }

    /// Sibling hashes from the leaf level up to (but excluding) the root.
    pub fn path(&self, index: usize) -> Vec<Hash256> {
        let mut path = Vec::with_capacity(self.levels.len() - 1);
        let mut i = index;
        for level in &self.levels[..self.levels.len() - 1] {
            path.push(level[i ^ 1]);
            i >>= 1;
        }
        path
    }
}

/// Recomputes the root implied by a leaf and its proof.
pub fn root_from_path(leaf: Hash256, leaf_index: u64, path: &[Hash256]) -> Hash256 {
    let mut h = leaf;
    for (i, sibling) in path.iter().enumerate() {
        h = if leaf_index >> i & 1 == 1 {
            node_hash(sibling, &h)
        } else {
            node_hash(&h, sibling)
        };
    }
    h
}

/// Verifies a leaf's proof against a root, in constant time over the hash
/// comparison.
pub fn verify_path(leaf: Hash256, leaf_index: u64, path: &[Hash256], root: &Hash256) -> bool {
    let computed = root_from_path(leaf, leaf_index, path);
    computed.0.ct_eq(&root.0).unwrap_u8() == 1
}
