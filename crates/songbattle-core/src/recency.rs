use std::collections::{HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::catalog::SongId;

/// A contested pair, stored as `(winner, loser)`.
pub type Pair = (SongId, SongId);

/// Bounded FIFO of the pairs a session voted on most recently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentPairs {
    capacity: usize,
    pairs: VecDeque<Pair>,
}

impl RecentPairs {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            pairs: VecDeque::with_capacity(capacity + 1),
        }
    }

    /// Rebuild from stored pairs (oldest first), keeping only the newest `capacity`.
    pub fn from_pairs(capacity: usize, pairs: impl IntoIterator<Item = Pair>) -> Self {
        let mut recent = Self::new(capacity);
        for pair in pairs {
            recent.push(pair);
        }
        recent
    }

    /// Append a pair, evicting the oldest once over capacity.
    pub fn push(&mut self, pair: Pair) {
        self.pairs.push_back(pair);
        while self.pairs.len() > self.capacity {
            self.pairs.pop_front();
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn to_vec(&self) -> Vec<Pair> {
        self.pairs.iter().copied().collect()
    }
}

/// Every song id that appears in the newest `limit` pairs.
pub fn contested_ids(pairs: &[Pair], limit: usize) -> HashSet<SongId> {
    let start = pairs.len().saturating_sub(limit);
    pairs[start..]
        .iter()
        .flat_map(|&(a, b)| [a, b])
        .collect()
}
