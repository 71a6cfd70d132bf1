// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// STAKEHEAP (SHP) - BALANCE ACCUMULATOR
//
// Append-only forest of perfect binary hash trees ("virtual binary heap").
// - One tree per set bit of the leaf count n, largest tree first
// - Inserting carries like binary addition: equal trees merge
// - Nodes keep only the roots; accounts carry their own sibling paths
// - Updates rewrite one root and can refresh other holders' paths
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

use crate::encoding::{b64_hashes, TAG_LEAF, TAG_NODE};
use serde::{Deserialize, Serialize};
use shp_crypto::{FieldHasher, Hash};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum AccumulatorError {
    #[error("position {pos} out of range (n = {n})")]
    PositionOutOfRange { pos: u64, n: u64 },
    #[error("proof for position {pos} has {got} entries, tree height is {expected}")]
    ProofLength { pos: u64, expected: usize, got: usize },
    #[error("leaf at position {pos} does not match its tracked root")]
    StaleLeaf { pos: u64 },
    #[error("{roots} roots cannot describe {n} leaves")]
    Shape { n: u64, roots: usize },
    #[error("accumulator is full")]
    Full,
}

/// Hash committing a leaf's balance data to its position.
pub fn leaf_hash(data: &Hash, pos: u64) -> Hash {
    FieldHasher::new(TAG_LEAF).field(data).u64(pos).finish()
}

/// Parent of two subtree roots.
///
/// The pair is ordered before hashing, so a path entry can be folded in
/// without knowing which side the sibling sits on.
pub fn node_hash(a: &Hash, b: &Hash) -> Hash {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    FieldHasher::new(TAG_NODE).field(lo).field(hi).finish()
}

/// Fold a sibling path onto a starting hash.
pub fn fold_proof(start: Hash, proof: &[Hash]) -> Hash {
    proof.iter().fold(start, |h, sibling| node_hash(&h, sibling))
}

/// Which root covers `pos` when there are `n` leaves.
///
/// Returns `(root_index, tree_height)`, or `None` when `pos >= n`.
pub fn locate_root(pos: u64, n: u64) -> Option<(usize, usize)> {
    let mut covered = 0u64;
    let mut index = 0usize;
    for bit in (0..u64::BITS).rev() {
        if (n >> bit) & 1 == 0 {
            continue;
        }
        let size = 1u64 << bit;
        if pos < covered + size {
            return Some((index, bit as usize));
        }
        covered += size;
        index += 1;
    }
    None
}

/// Roots plus leaf count. This is all a node has to store.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "AccumulatorWire", into = "AccumulatorWire")]
pub struct Accumulator {
    n: u64,
    roots: Vec<Hash>,
}

#[derive(Serialize, Deserialize)]
struct AccumulatorWire {
    n: u64,
    #[serde(with = "b64_hashes")]
    roots: Vec<Hash>,
}

impl TryFrom<AccumulatorWire> for Accumulator {
    type Error = AccumulatorError;

    fn try_from(wire: AccumulatorWire) -> Result<Self, Self::Error> {
        Accumulator::from_parts(wire.n, wire.roots)
    }
}

impl From<Accumulator> for AccumulatorWire {
    fn from(acc: Accumulator) -> Self {
        AccumulatorWire {
            n: acc.n,
            roots: acc.roots,
        }
    }
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from a peer's snapshot; the root count must match `popcount(n)`.
    pub fn from_parts(n: u64, roots: Vec<Hash>) -> Result<Self, AccumulatorError> {
        if n.count_ones() as usize != roots.len() {
            return Err(AccumulatorError::Shape {
                n,
                roots: roots.len(),
            });
        }
        Ok(Self { n, roots })
    }

    pub fn len(&self) -> u64 {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    pub fn roots(&self) -> &[Hash] {
        &self.roots
    }

    /// Append a leaf. Returns its position and its initial sibling path.
    pub fn insert(&mut self, data: &Hash) -> Result<(u64, Vec<Hash>), AccumulatorError> {
        self.insert_refreshing(data, std::iter::empty())
    }

    /// Append a leaf and extend the paths of holders whose tree got merged.
    ///
    /// A holder in the tree of height `h` popped by the carry chain gains the
    /// running hash it merged with, then every larger popped root after it.
    pub fn insert_refreshing<'a, I>(
        &mut self,
        data: &Hash,
        witnesses: I,
    ) -> Result<(u64, Vec<Hash>), AccumulatorError>
    where
        I: IntoIterator<Item = (u64, &'a mut Vec<Hash>)>,
    {
        let pos = self.n;
        let next = pos.checked_add(1).ok_or(AccumulatorError::Full)?;
        let carries = pos.trailing_ones() as usize;

        let mut running = leaf_hash(data, pos);
        let mut runnings = Vec::with_capacity(carries);
        let mut popped = Vec::with_capacity(carries);
        for _ in 0..carries {
            let Some(sibling) = self.roots.pop() else {
                return Err(AccumulatorError::Shape {
                    n: self.n,
                    roots: self.roots.len(),
                });
            };
            runnings.push(running);
            running = node_hash(&running, &sibling);
            popped.push(sibling);
        }

        for (wpos, proof) in witnesses {
            // Popped trees have heights 0..carries, and height h is popped at step h.
            if let Some((_, height)) = locate_root(wpos, pos) {
                if height < carries {
                    proof.push(runnings[height]);
                    proof.extend_from_slice(&popped[height + 1..]);
                }
            }
        }

        self.roots.push(running);
        self.n = next;
        Ok((pos, popped))
    }

    /// Check that `data` sits at `pos` under the tree that covers `pos`.
    pub fn verify(&self, data: &Hash, pos: u64, proof: &[Hash]) -> bool {
        match locate_root(pos, self.n) {
            Some((index, height)) if proof.len() == height => {
                fold_proof(leaf_hash(data, pos), proof) == self.roots[index]
            }
            _ => false,
        }
    }

    /// Overwrite the leaf at `pos`, trusting `proof`. Returns the new root.
    pub fn update(
        &mut self,
        new_data: &Hash,
        pos: u64,
        proof: &[Hash],
    ) -> Result<Hash, AccumulatorError> {
        self.rewrite(None, new_data, pos, proof, std::iter::empty())
    }

    /// Replace `old_data` with `new_data` at `pos`, refreshing other holders.
    ///
    /// Fails with `StaleLeaf`, without mutating, unless `old_data` currently
    /// verifies under `proof`.
    pub fn replace_refreshing<'a, I>(
        &mut self,
        old_data: &Hash,
        new_data: &Hash,
        pos: u64,
        proof: &[Hash],
        witnesses: I,
    ) -> Result<Hash, AccumulatorError>
    where
        I: IntoIterator<Item = (u64, &'a mut Vec<Hash>)>,
    {
        self.rewrite(Some(old_data), new_data, pos, proof, witnesses)
    }

    fn rewrite<'a, I>(
        &mut self,
        old_data: Option<&Hash>,
        new_data: &Hash,
        pos: u64,
        proof: &[Hash],
        witnesses: I,
    ) -> Result<Hash, AccumulatorError>
    where
        I: IntoIterator<Item = (u64, &'a mut Vec<Hash>)>,
    {
        let (index, height) = locate_root(pos, self.n)
            .ok_or(AccumulatorError::PositionOutOfRange { pos, n: self.n })?;
        if proof.len() != height {
            return Err(AccumulatorError::ProofLength {
                pos,
                expected: height,
                got: proof.len(),
            });
        }
        if let Some(old) = old_data {
            if fold_proof(leaf_hash(old, pos), proof) != self.roots[index] {
                return Err(AccumulatorError::StaleLeaf { pos });
            }
        }

        // levels[d] is the hash of the height-d subtree holding `pos`.
        let mut levels = Vec::with_capacity(height + 1);
        let mut current = leaf_hash(new_data, pos);
        levels.push(current);
        for sibling in proof {
            current = node_hash(&current, sibling);
            levels.push(current);
        }

        for (wpos, wproof) in witnesses {
            if wpos == pos || locate_root(wpos, self.n).map(|(i, _)| i) != Some(index) {
                continue;
            }
            let level = (u64::BITS - 1 - (wpos ^ pos).leading_zeros()) as usize;
            if let Some(entry) = wproof.get_mut(level) {
                *entry = levels[level];
            }
        }

        self.roots[index] = current;
        Ok(current)
    }
}
