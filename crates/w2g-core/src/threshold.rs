//! Ordered threshold matching shared by the reward and vault stages.
use serde::{Deserialize, Serialize};

/// Tiers keyed by a minimum value, scanned from the highest threshold down.
///
/// Tiers with equal thresholds keep their insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdTable<T> {
    tiers: Vec<(u64, T)>,
}

impl<T> ThresholdTable<T> {
    pub fn new(tiers: impl IntoIterator<Item = (u64, T)>) -> Self {
        let mut tiers: Vec<(u64, T)> = tiers.into_iter().collect();
        // stable: equal thresholds keep insertion order
        tiers.sort_by(|a, b| b.0.cmp(&a.0));
        Self { tiers }
    }

    /// Highest tier whose threshold is at or below `value`.
    pub fn highest_match(&self, value: u64) -> Option<(u64, &T)> {
        self.matches_descending(value).next()
    }

    /// Every qualifying tier, highest threshold first.
    pub fn matches_descending(&self, value: u64) -> impl Iterator<Item = (u64, &T)> + '_ {
        self.tiers
            .iter()
            .filter(move |(threshold, _)| *threshold <= value)
            .map(|(threshold, tier)| (*threshold, tier))
    }

    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }
}

impl<T> FromIterator<(u64, T)> for ThresholdTable<T> {
    fn from_iter<I: IntoIterator<Item = (u64, T)>>(iter: I) -> Self {
        Self::new(iter)
    }
}
