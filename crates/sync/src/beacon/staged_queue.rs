use std::collections::BTreeMap;

use super::error::StagedQueueError;

/// A sorted map keyed by the top (or bottom, depending on the caller's
/// convention) block number of each staged entry. Used both for staged
/// header chains (keyed by top number) and staged block-body lists (keyed
/// by bottom number). Entries are expected to be disjoint; duplicate
/// insertion is a programmer error, not a data-dependent failure.
#[derive(Debug, Clone, Default)]
pub struct StagedQueue<V> {
    entries: BTreeMap<u64, V>,
}

impl<V> StagedQueue<V> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Inserts `value` keyed by `key`. A duplicate key is the programmer's
    /// bug (double staging of the same range) — this is the one place the
    /// engine aborts rather than returning a recoverable error, per the
    /// staged-insertion invariant.
    pub fn insert(&mut self, key: u64, value: V) -> Result<(), StagedQueueError> {
        if self.entries.contains_key(&key) {
            return Err(StagedQueueError::DuplicateKey(key));
        }
        self.entries.insert(key, value);
        Ok(())
    }

    pub fn delete(&mut self, key: u64) -> Option<V> {
        self.entries.remove(&key)
    }

    /// The entry with the smallest key greater than or equal to `key`.
    pub fn ge(&self, key: u64) -> Option<(&u64, &V)> {
        self.entries.range(key..).next()
    }

    /// The entry with the largest key less than or equal to `key`.
    pub fn le(&self, key: u64) -> Option<(&u64, &V)> {
        self.entries.range(..=key).next_back()
    }

    /// The entry with the smallest key in the queue.
    pub fn first(&self) -> Option<(&u64, &V)> {
        self.entries.iter().next()
    }

    /// The entry with the largest key in the queue.
    pub fn last(&self) -> Option<(&u64, &V)> {
        self.entries.iter().next_back()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&u64, &V)> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &u64> {
        self.entries.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_rejects_duplicate_keys() {
        let mut queue: StagedQueue<&str> = StagedQueue::new();
        queue.insert(10, "a").unwrap();
        let err = queue.insert(10, "b").unwrap_err();
        assert!(matches!(err, StagedQueueError::DuplicateKey(10)));
    }

    #[test]
    fn ge_and_le_find_boundary_entries() {
        let mut queue = StagedQueue::new();
        queue.insert(10, "ten").unwrap();
        queue.insert(20, "twenty").unwrap();
        queue.insert(30, "thirty").unwrap();

        assert_eq!(queue.ge(15), Some((&20, &"twenty")));
        assert_eq!(queue.le(25), Some((&20, &"twenty")));
        assert_eq!(queue.ge(30), Some((&30, &"thirty")));
        assert_eq!(queue.ge(31), None);
        assert_eq!(queue.le(9), None);
    }

    #[test]
    fn first_and_last_track_extremes() {
        let mut queue = StagedQueue::new();
        queue.insert(5, ()).unwrap();
        queue.insert(50, ()).unwrap();
        queue.insert(25, ()).unwrap();
        assert_eq!(queue.first().map(|(k, _)| *k), Some(5));
        assert_eq!(queue.last().map(|(k, _)| *k), Some(50));
    }

    #[test]
    fn delete_removes_entry_and_returns_value() {
        let mut queue = StagedQueue::new();
        queue.insert(1, "x").unwrap();
        assert_eq!(queue.delete(1), Some("x"));
        assert_eq!(queue.delete(1), None);
        assert!(queue.is_empty());
    }
}
