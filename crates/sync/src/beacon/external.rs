//! Interfaces to the engine's external collaborators: the Forkchoice/import
//! module, the on-disk key-value store, and the wire/RPC layer. None of
//! these are implemented by this crate; production wiring plugs concrete
//! adapters in from `ethereum-engine`, `ethereum-storage` and
//! `ethereum-network` respectively. `testutil` provides in-memory
//! implementations for tests.

use async_trait::async_trait;
use ethereum_core::{Block, Header};
use ethereum_types::H256;

use super::error::Result;

/// A fetched block body, decoupled from the wire crate's `BlockBody` so the
/// engine can carry withdrawals (the wire type predates EIP-4895).
#[derive(Debug, Clone)]
pub struct FetchedBody {
    pub transactions: Vec<Vec<u8>>,
    pub uncles: Vec<Header>,
    pub withdrawals: Option<Vec<ethereum_core::Withdrawal>>,
}

/// The Forkchoice/import module, consumed read-mostly by the engine and
/// written to only by the single-writer commit passes.
#[async_trait]
pub trait ForkchoiceHandle: Send + Sync {
    fn base_number(&self) -> u64;
    fn latest_number(&self) -> u64;
    fn latest_hash(&self) -> H256;
    fn latest_header(&self) -> Header;
    fn header_by_hash(&self, hash: H256) -> Result<Header>;
    async fn import_block(&self, block: Block) -> std::result::Result<(), String>;
    async fn fork_choice(&self, head_hash: H256, final_hash: H256) -> std::result::Result<(), String>;
}

/// The persistent key-value facade the engine uses for the layout record
/// and stashed headers, mirroring `ethereum_storage::Database` but scoped
/// to the subset of operations the engine needs plus transaction awareness.
pub trait SyncKv: Send + Sync {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;
    fn put(&self, key: &[u8], value: &[u8]) -> Result<()>;
    fn del(&self, key: &[u8]) -> Result<()>;
    /// Flushes pending writes up to `number`; a no-op for backends that
    /// write through immediately.
    fn persistent(&self, number: u64) -> Result<()>;
    /// True while a write transaction (e.g. an FC import batch) is open
    /// and the stash must route writes to its in-memory overflow instead.
    fn is_write_blocked(&self) -> bool;
    fn tx_depth(&self) -> u32;
}

/// The wire/RPC layer that delivers `getBlockHeaders`/`getBlockBodies`
/// requests to a specific peer.
#[async_trait]
pub trait WireClient: Send + Sync {
    /// Fetches up to `limit` headers walking backwards from `top_hash`
    /// (or from `top_number` in opportunistic mode, when `top_hash` is
    /// `None`). `result[0]` is the top (highest-numbered) header.
    async fn fetch_headers_reversed(
        &self,
        top_number: u64,
        top_hash: Option<H256>,
        limit: u64,
    ) -> Result<Vec<Header>>;

    /// Fetches bodies for `hashes`, in the same order.
    async fn fetch_bodies(&self, hashes: Vec<H256>) -> Result<Vec<FetchedBody>>;
}
