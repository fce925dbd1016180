use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use ethereum_core::Header;
use ethereum_types::H256;
use parking_lot::RwLock;

use super::error::Result;
use super::external::SyncKv;

fn stash_key(number: u64) -> [u8; 9] {
    let mut key = [0u8; 9];
    key[0] = 0xBE;
    key[1..9].copy_from_slice(&number.to_be_bytes());
    key
}

/// Transient header store keyed by block number, backed by the persistent
/// KV store when writable, otherwise by an in-memory overflow that is
/// flushed once the KV becomes writable again. Peeks try the overflow
/// first, then the KV.
pub struct HeaderStash<K: SyncKv> {
    kv: Arc<K>,
    overflow: RwLock<HashMap<u64, Header>>,
    stashed: RwLock<BTreeSet<u64>>,
}

impl<K: SyncKv> HeaderStash<K> {
    pub fn new(kv: Arc<K>) -> Self {
        Self {
            kv,
            overflow: RwLock::new(HashMap::new()),
            stashed: RwLock::new(BTreeSet::new()),
        }
    }

    /// Stashes `rev_headers` which are in reverse order: `rev_headers[i]`
    /// maps to block number `first + (len - 1 - i)`.
    pub fn stash(&self, first: u64, rev_headers: &[Header]) -> Result<()> {
        let len = rev_headers.len() as u64;
        for (i, header) in rev_headers.iter().enumerate() {
            let number = first + (len - 1 - i as u64);
            self.write_one(number, header)?;
        }
        Ok(())
    }

    fn write_one(&self, number: u64, header: &Header) -> Result<()> {
        self.stashed.write().insert(number);
        if self.kv.is_write_blocked() {
            self.overflow.write().insert(number, header.clone());
        } else {
            let bytes = bincode::serialize(header).expect("Header serialization cannot fail");
            self.kv.put(&stash_key(number), &bytes)?;
        }
        Ok(())
    }

    pub fn peek(&self, number: u64) -> Option<Header> {
        if let Some(header) = self.overflow.read().get(&number).cloned() {
            return Some(header);
        }
        self.kv
            .get(&stash_key(number))
            .ok()
            .flatten()
            .and_then(|bytes| bincode::deserialize(&bytes).ok())
    }

    pub fn parent_hash(&self, number: u64) -> Option<H256> {
        self.peek(number).map(|header| header.parent_hash)
    }

    /// Removes the entry for `number` from whichever store holds it.
    pub fn unstash(&self, number: u64) {
        self.stashed.write().remove(&number);
        if self.overflow.write().remove(&number).is_some() {
            return;
        }
        let _ = self.kv.del(&stash_key(number));
    }

    pub fn clear(&self) {
        let numbers: Vec<u64> = self.stashed.write().drain().collect();
        let mut overflow = self.overflow.write();
        for number in numbers {
            if overflow.remove(&number).is_none() {
                let _ = self.kv.del(&stash_key(number));
            }
        }
    }

    /// Drains the in-memory overflow into the KV store. Call once the FC
    /// transaction that had blocked writes closes.
    pub fn flush_overflow(&self) -> Result<()> {
        let drained: Vec<(u64, Header)> = self.overflow.write().drain().collect();
        for (number, header) in drained {
            let bytes = bincode::serialize(&header).expect("Header serialization cannot fail");
            self.kv.put(&stash_key(number), &bytes)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.stashed.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.stashed.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beacon::testutil::MemorySyncKv;

    fn header(number: u64, parent_hash: H256) -> Header {
        let mut h = Header::new();
        h.number = ethereum_types::U256::from(number);
        h.parent_hash = parent_hash;
        h
    }

    #[test]
    fn stash_and_peek_round_trip() {
        let kv = Arc::new(MemorySyncKv::new());
        let stash = HeaderStash::new(kv);

        let top = header(12, H256::from_low_u64_be(11));
        let mid = header(11, H256::from_low_u64_be(10));
        let bot = header(10, H256::from_low_u64_be(9));

        stash.stash(10, &[top.clone(), mid.clone(), bot.clone()]).unwrap();

        assert_eq!(stash.peek(12).unwrap().number, top.number);
        assert_eq!(stash.peek(11).unwrap().number, mid.number);
        assert_eq!(stash.peek(10).unwrap().number, bot.number);
        assert_eq!(stash.parent_hash(12), Some(H256::from_low_u64_be(11)));
        assert_eq!(stash.len(), 3);
    }

    #[test]
    fn writes_go_to_overflow_while_write_blocked() {
        let kv = Arc::new(MemorySyncKv::new());
        kv.set_write_blocked(true);
        let stash = HeaderStash::new(kv.clone());

        stash.stash(5, &[header(5, H256::zero())]).unwrap();
        assert!(kv.get(&stash_key(5)).unwrap().is_none());
        assert!(stash.peek(5).is_some());

        kv.set_write_blocked(false);
        stash.flush_overflow().unwrap();
        assert!(kv.get(&stash_key(5)).unwrap().is_some());
    }

    #[test]
    fn unstash_removes_from_overflow_first() {
        let kv = Arc::new(MemorySyncKv::new());
        let stash = HeaderStash::new(kv.clone());
        kv.set_write_blocked(true);
        stash.stash(1, &[header(1, H256::zero())]).unwrap();
        stash.unstash(1);
        assert!(stash.peek(1).is_none());
    }

    #[test]
    fn clear_empties_both_stores() {
        let kv = Arc::new(MemorySyncKv::new());
        let stash = HeaderStash::new(kv);
        stash.stash(1, &[header(1, H256::zero())]).unwrap();
        stash.clear();
        assert!(stash.is_empty());
        assert!(stash.peek(1).is_none());
    }
}
