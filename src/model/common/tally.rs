use std::collections::HashMap;

use crate::model::mongodb::Id;

/// Per-option vote counts for one referendum. Computed on read, never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tally {
    counts: HashMap<Id, u64>,
}

impl Tally {
    pub fn new(counts: HashMap<Id, u64>) -> Self {
        Self { counts }
    }

    /// Votes cast for `option`; zero for options nobody chose.
    pub fn count(&self, option: Id) -> u64 {
        self.counts.get(&option).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Does any option have at least half (rounded up) of `total_voters`?
    pub fn has_majority(&self, total_voters: u64) -> bool {
        let threshold = majority_threshold(total_voters);
        self.counts.values().any(|&votes| votes >= threshold)
    }
}

/// `ceil(total_voters * 0.5)`.
pub fn majority_threshold(total_voters: u64) -> u64 {
    total_voters / 2 + total_voters % 2
}
