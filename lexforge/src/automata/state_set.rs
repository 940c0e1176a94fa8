//! Bitset of NFA states.
//!
//! Subset construction keys its state map by [`StateSet`], so equality and
//! hashing depend only on the member states, never on how much storage a
//! set happens to have allocated.

use std::hash::{Hash, Hasher};

use bitvec::vec::BitVec;

use super::StateId;

#[derive(Debug, Clone, Default)]
pub struct StateSet {
    bits: BitVec<usize>,
}

impl StateSet {
    pub fn new() -> Self {
        StateSet { bits: BitVec::new() }
    }

    /// An empty set with room for states `0..n` without reallocating.
    pub fn with_capacity(n: usize) -> Self {
        StateSet { bits: BitVec::repeat(false, n) }
    }

    pub fn singleton(state: StateId) -> Self {
        let mut set = StateSet::new();
        set.add(state);
        set
    }

    pub fn add(&mut self, state: StateId) {
        let idx = state as usize;
        if idx >= self.bits.len() {
            let len = (idx + 1).max(self.bits.len() * 2);
            self.bits.resize(len, false);
        }
        self.bits.set(idx, true);
    }

    #[inline]
    pub fn contains(&self, state: StateId) -> bool {
        self.bits.get(state as usize).map(|b| *b).unwrap_or(false)
    }

    pub fn remove(&mut self, state: StateId) {
        if let Some(mut bit) = self.bits.get_mut(state as usize) {
            *bit = false;
        }
    }

    /// Union with `other`.
    pub fn add_set(&mut self, other: &StateSet) {
        if other.bits.len() > self.bits.len() {
            self.bits.resize(other.bits.len(), false);
        }
        for idx in other.bits.iter_ones() {
            self.bits.set(idx, true);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bits.not_any()
    }

    pub fn len(&self) -> usize {
        self.bits.count_ones()
    }

    /// Members in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = StateId> + '_ {
        self.bits.iter_ones().map(|i| i as StateId)
    }
}

impl PartialEq for StateSet {
    fn eq(&self, other: &Self) -> bool {
        self.iter().eq(other.iter())
    }
}

impl Eq for StateSet {}

impl Hash for StateSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for s in self.iter() {
            s.hash(state);
        }
        // Separates the member list from whatever is hashed next.
        u32::MAX.hash(state);
    }
}

impl FromIterator<StateId> for StateSet {
    fn from_iter<T: IntoIterator<Item = StateId>>(iter: T) -> Self {
        let mut set = StateSet::new();
        for s in iter {
            set.add(s);
        }
        set
    }
}
