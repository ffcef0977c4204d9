//! Epoch Entry Module
//!
//! Ordering tokens for the partial cache's eviction candidate set.

use std::cmp::Ordering;

// == Epoch Entry ==
/// Records one `put` against a key at a given epoch.
///
/// Entries order by `epoch`, then by `seq` (insertion order) so that several
/// writes at the same epoch stay distinct inside a `BTreeSet`. The key is
/// carried along but never compared.
#[derive(Debug, Clone)]
pub(crate) struct EpochEntry<K> {
    epoch: i64,
    seq: u64,
    key: K,
}

impl<K> EpochEntry<K> {
    pub(crate) fn new(epoch: i64, seq: u64, key: K) -> Self {
        Self { epoch, seq, key }
    }

    pub(crate) fn epoch(&self) -> i64 {
        self.epoch
    }

    pub(crate) fn into_key(self) -> K {
        self.key
    }
}

impl<K> PartialEq for EpochEntry<K> {
    fn eq(&self, other: &Self) -> bool {
        self.epoch == other.epoch && self.seq == other.seq
    }
}

impl<K> Eq for EpochEntry<K> {}

impl<K> PartialOrd for EpochEntry<K> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K> Ord for EpochEntry<K> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.epoch
            .cmp(&other.epoch)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_orders_by_epoch_not_key() {
        let a = EpochEntry::new(2, 0, "a");
        let z = EpochEntry::new(1, 1, "z");

        assert!(z < a);
    }

    #[test]
    fn test_same_epoch_keeps_insertion_order() {
        let mut set = BTreeSet::new();
        set.insert(EpochEntry::new(5, 0, "first"));
        set.insert(EpochEntry::new(5, 1, "second"));
        set.insert(EpochEntry::new(5, 2, "first"));

        assert_eq!(set.len(), 3);
        let keys: Vec<_> = set.into_iter().map(EpochEntry::into_key).collect();
        assert_eq!(keys, vec!["first", "second", "first"]);
    }

    #[test]
    fn test_equality_ignores_key() {
        assert_eq!(EpochEntry::new(1, 0, "a"), EpochEntry::new(1, 0, "b"));
        assert_ne!(EpochEntry::new(1, 0, "a"), EpochEntry::new(1, 1, "a"));
    }
}
