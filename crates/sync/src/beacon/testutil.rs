//! In-memory mocks of the external collaborator traits, used only by the
//! `#[cfg(test)]` modules throughout `beacon`.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use ethereum_core::{Block, Header};
use ethereum_types::H256;

use super::error::{BeaconSyncError, Result};
use super::external::{FetchedBody, ForkchoiceHandle, SyncKv, WireClient};

/// Mirrors `ethereum_storage::memory::MemoryDatabase`'s shape, scoped to
/// the `SyncKv` surface the engine needs, with a toggleable write-block
/// flag for exercising the stash overflow path.
#[derive(Debug, Clone)]
pub struct MemorySyncKv {
    data: Arc<RwLock<BTreeMap<Vec<u8>, Vec<u8>>>>,
    write_blocked: Arc<AtomicBool>,
    tx_depth: Arc<AtomicU32>,
}

impl MemorySyncKv {
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(BTreeMap::new())),
            write_blocked: Arc::new(AtomicBool::new(false)),
            tx_depth: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn set_write_blocked(&self, blocked: bool) {
        self.write_blocked.store(blocked, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.data.read().unwrap().len()
    }
}

impl Default for MemorySyncKv {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncKv for MemorySyncKv {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.data.read().unwrap().get(key).cloned())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        self.data
            .write()
            .unwrap()
            .insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn del(&self, key: &[u8]) -> Result<()> {
        self.data.write().unwrap().remove(key);
        Ok(())
    }

    fn persistent(&self, _number: u64) -> Result<()> {
        Ok(())
    }

    fn is_write_blocked(&self) -> bool {
        self.write_blocked.load(Ordering::SeqCst)
    }

    fn tx_depth(&self) -> u32 {
        self.tx_depth.load(Ordering::SeqCst)
    }
}

/// A scriptable Forkchoice mock: headers and imported blocks are recorded
/// in plain maps, `base`/`latest` are settable directly by the test.
pub struct MockForkchoice {
    pub base: RwLock<u64>,
    pub latest: RwLock<u64>,
    pub latest_hash: RwLock<H256>,
    pub headers: RwLock<HashMap<H256, Header>>,
    pub imported: RwLock<Vec<Block>>,
    pub fork_choice_calls: RwLock<Vec<(H256, H256)>>,
    pub fail_import: AtomicBool,
}

impl MockForkchoice {
    pub fn new() -> Self {
        Self {
            base: RwLock::new(0),
            latest: RwLock::new(0),
            latest_hash: RwLock::new(H256::zero()),
            headers: RwLock::new(HashMap::new()),
            imported: RwLock::new(Vec::new()),
            fork_choice_calls: RwLock::new(Vec::new()),
            fail_import: AtomicBool::new(false),
        }
    }

    pub fn known(&self, header: Header) {
        self.headers.write().unwrap().insert(header.hash(), header);
    }
}

impl Default for MockForkchoice {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ForkchoiceHandle for MockForkchoice {
    fn base_number(&self) -> u64 {
        *self.base.read().unwrap()
    }

    fn latest_number(&self) -> u64 {
        *self.latest.read().unwrap()
    }

    fn latest_hash(&self) -> H256 {
        *self.latest_hash.read().unwrap()
    }

    fn latest_header(&self) -> Header {
        let hash = self.latest_hash();
        self.headers
            .read()
            .unwrap()
            .get(&hash)
            .cloned()
            .unwrap_or_else(Header::new)
    }

    fn header_by_hash(&self, hash: H256) -> Result<Header> {
        self.headers
            .read()
            .unwrap()
            .get(&hash)
            .cloned()
            .ok_or(BeaconSyncError::UnknownHeader(hash))
    }

    async fn import_block(&self, block: Block) -> std::result::Result<(), String> {
        if self.fail_import.load(Ordering::SeqCst) {
            return Err("mock import failure".to_string());
        }
        *self.latest.write().unwrap() = block.header.number.as_u64();
        *self.latest_hash.write().unwrap() = block.hash();
        self.imported.write().unwrap().push(block);
        Ok(())
    }

    async fn fork_choice(&self, head_hash: H256, final_hash: H256) -> std::result::Result<(), String> {
        self.fork_choice_calls
            .write()
            .unwrap()
            .push((head_hash, final_hash));
        Ok(())
    }
}

/// A wire client mock serving headers/bodies from pre-seeded maps, keyed
/// by block number so tests can construct arbitrary chains.
pub struct MockWireClient {
    pub headers_by_number: RwLock<HashMap<u64, Header>>,
    pub bodies_by_hash: RwLock<HashMap<H256, FetchedBody>>,
}

impl MockWireClient {
    pub fn new() -> Self {
        Self {
            headers_by_number: RwLock::new(HashMap::new()),
            bodies_by_hash: RwLock::new(HashMap::new()),
        }
    }

    pub fn seed_header(&self, header: Header) {
        self.headers_by_number
            .write()
            .unwrap()
            .insert(header.number.as_u64(), header);
    }

    pub fn seed_body(&self, hash: H256, body: FetchedBody) {
        self.bodies_by_hash.write().unwrap().insert(hash, body);
    }
}

impl Default for MockWireClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WireClient for MockWireClient {
    async fn fetch_headers_reversed(
        &self,
        top_number: u64,
        _top_hash: Option<H256>,
        limit: u64,
    ) -> Result<Vec<Header>> {
        let headers = self.headers_by_number.read().unwrap();
        let mut out = Vec::new();
        let mut number = top_number;
        for _ in 0..limit {
            match headers.get(&number) {
                Some(header) => out.push(header.clone()),
                None => break,
            }
            if number == 0 {
                break;
            }
            number -= 1;
        }
        Ok(out)
    }

    async fn fetch_bodies(&self, hashes: Vec<H256>) -> Result<Vec<FetchedBody>> {
        let bodies = self.bodies_by_hash.read().unwrap();
        Ok(hashes
            .into_iter()
            .filter_map(|hash| bodies.get(&hash).cloned())
            .collect())
    }
}
