//! Merkle root over ordered chunk ciphertexts
//!
//! ## Security
//!
//! - Leaves and internal nodes use distinct prefixes, so a leaf can never be
//!   confused with an internal node (second preimage resistance)
//! - For odd-length levels the last node is paired with itself
//! - Leaf order is significant; reordering chunks changes the root

use sha2::{Digest, Sha256};

use crate::error::{CryptoError, CryptoResult};
use crate::hash::HASH_SIZE;

/// Prefix for leaf hashing
const LEAF_PREFIX: u8 = 0x00;

/// Prefix for internal node hashing
const NODE_PREFIX: u8 = 0x01;

/// A Merkle digest
pub type MerkleHash = [u8; HASH_SIZE];

/// Hash a leaf's data
pub fn leaf_hash(data: &[u8]) -> MerkleHash {
    let mut hasher = Sha256::new();
    hasher.update([LEAF_PREFIX]);
    hasher.update(data);
    hasher.finalize().into()
}

fn node_hash(left: &MerkleHash, right: &MerkleHash) -> MerkleHash {
    let mut hasher = Sha256::new();
    hasher.update([NODE_PREFIX]);
    hasher.update(left);
    hasher.update(right);
    hasher.finalize().into()
}

/// Merkle tree built from leaf hashes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MerkleTree {
    leaves: Vec<MerkleHash>,
    root: MerkleHash,
}

impl MerkleTree {
    /// Build a tree from leaf hashes
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::EmptyMerkleTree` if there are no leaves.
    pub fn new(leaves: Vec<MerkleHash>) -> CryptoResult<Self> {
        if leaves.is_empty() {
            return Err(CryptoError::EmptyMerkleTree);
        }

        let mut level = leaves.clone();
        while level.len() > 1 {
            level = level
                .chunks(2)
                .map(|pair| match pair {
                    [left, right] => node_hash(left, right),
                    [single] => node_hash(single, single),
                    _ => unreachable!("chunks(2) yields one or two items"),
                })
                .collect();
        }

        Ok(Self {
            root: level[0],
            leaves,
        })
    }

    /// Build a tree directly from leaf data, in order
    pub fn from_data<T: AsRef<[u8]>>(items: &[T]) -> CryptoResult<Self> {
        Self::new(items.iter().map(|item| leaf_hash(item.as_ref())).collect())
    }

    /// Root hash
    pub fn root(&self) -> MerkleHash {
        self.root
    }

    /// Root hash, hex encoded
    pub fn root_hex(&self) -> String {
        hex::encode(self.root)
    }

    /// Number of leaves
    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    /// Always false; construction rejects empty trees
    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// Leaf hashes in order
    pub fn leaves(&self) -> &[MerkleHash] {
        &self.leaves
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_tree_rejected() {
        let result = MerkleTree::new(Vec::new());
        assert!(matches!(result, Err(CryptoError::EmptyMerkleTree)));
    }

    #[test]
    fn test_single_leaf_root_is_leaf_hash() {
        let tree = MerkleTree::from_data(&[b"only".as_slice()]).unwrap();
        assert_eq!(tree.root(), leaf_hash(b"only"));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_root_is_deterministic() {
        let items = [b"a".as_slice(), b"b", b"c"];
        let a = MerkleTree::from_data(&items).unwrap();
        let b = MerkleTree::from_data(&items).unwrap();
        assert_eq!(a.root(), b.root());
    }

    #[test]
    fn test_odd_leaf_duplication() {
        let tree = MerkleTree::from_data(&[b"a".as_slice(), b"b", b"c"]).unwrap();
        let ab = node_hash(&leaf_hash(b"a"), &leaf_hash(b"b"));
        let cc = node_hash(&leaf_hash(b"c"), &leaf_hash(b"c"));
        assert_eq!(tree.root(), node_hash(&ab, &cc));
    }

    #[test]
    fn test_any_leaf_change_changes_root() {
        let base = MerkleTree::from_data(&[b"a".as_slice(), b"b", b"c", b"d"]).unwrap();
        for i in 0..4 {
            let mut items: Vec<&[u8]> = vec![b"a", b"b", b"c", b"d"];
            items[i] = b"x";
            let changed = MerkleTree::from_data(&items).unwrap();
            assert_ne!(base.root(), changed.root(), "leaf {} change not detected", i);
        }
    }

    #[test]
    fn test_order_matters() {
        let ab = MerkleTree::from_data(&[b"a".as_slice(), b"b"]).unwrap();
        let ba = MerkleTree::from_data(&[b"b".as_slice(), b"a"]).unwrap();
        assert_ne!(ab.root(), ba.root());
    }

    #[test]
    fn test_leaf_not_confused_with_node() {
        let left = leaf_hash(b"a");
        let right = leaf_hash(b"b");
        let mut forged = Vec::new();
        forged.extend_from_slice(&left);
        forged.extend_from_slice(&right);

        let honest = MerkleTree::from_data(&[b"a".as_slice(), b"b"]).unwrap();
        let forged_tree = MerkleTree::from_data(&[forged.as_slice()]).unwrap();
        assert_ne!(honest.root(), forged_tree.root());
    }
}
