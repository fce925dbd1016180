use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ethereum_core::{Block, Header};
use ethereum_types::{H256, H512};
use parking_lot::RwLock;
use tokio::sync::{Mutex, Notify};

use super::config::BeaconSyncConfig;
use super::external::{ForkchoiceHandle, SyncKv};
use super::layout::SyncStateLayout;
use super::peer_state::PeerState;
use super::range_set::RangeSet;
use super::stash::HeaderStash;
use super::staged_queue::StagedQueue;
use super::target::Target;

/// A downloaded, reverse-contiguous run of headers: `revHdrs[0]` is the
/// highest-numbered header and `revHdrs[^1].parentHash == parentHash`.
#[derive(Debug, Clone)]
pub struct StagedHeaderChain {
    pub parent_hash: H256,
    pub hash: H256,
    pub rev_hdrs: Vec<Header>,
}

/// A forward-contiguous run of fully assembled blocks, ready for ordered
/// import.
#[derive(Debug, Clone)]
pub struct StagedBlockList {
    pub blocks: Vec<Block>,
}

/// The engine's shared state, following the same `Arc<RwLock<..>>`
/// aggregate pattern the workspace's other long-lived subsystem handles
/// use, generalized to the external collaborators (`FC`, `K`) this engine
/// actually needs. One instance is shared by the controller task and
/// every per-peer fetch task via `Arc`.
pub struct EngineContext<FC: ForkchoiceHandle, K: SyncKv> {
    pub fc: Arc<FC>,
    pub kv: Arc<K>,
    pub config: BeaconSyncConfig,

    pub stash: HeaderStash<K>,
    pub header_unprocessed: RwLock<RangeSet>,
    pub body_unprocessed: RwLock<RangeSet>,
    pub header_staged: RwLock<StagedQueue<StagedHeaderChain>>,
    pub body_staged: RwLock<StagedQueue<StagedBlockList>>,

    pub target: Target,
    pub layout: RwLock<Option<SyncStateLayout>>,

    /// Cooperative barrier: when set, peer workers finish their current
    /// step and return so the controller can run a reorg pass.
    pub pool_mode: AtomicBool,
    pub pool_mode_notify: Notify,
    pub hibernating: AtomicBool,

    /// Enforces the "single writer" discipline for commit passes: held
    /// for the duration of a `headersStagedProcess`/`blocksStagedImport`
    /// pass, including the `.await`s on `import_block`/`fork_choice`.
    pub commit_mutex: Mutex<()>,

    pub peers: RwLock<HashMap<H512, Arc<PeerState>>>,
}

impl<FC: ForkchoiceHandle, K: SyncKv> EngineContext<FC, K> {
    pub fn new(fc: Arc<FC>, kv: Arc<K>, config: BeaconSyncConfig) -> Self {
        Self {
            fc,
            stash: HeaderStash::new(kv.clone()),
            kv,
            config,
            header_unprocessed: RwLock::new(RangeSet::new()),
            body_unprocessed: RwLock::new(RangeSet::new()),
            header_staged: RwLock::new(StagedQueue::new()),
            body_staged: RwLock::new(StagedQueue::new()),
            target: Target::new(),
            layout: RwLock::new(None),
            pool_mode: AtomicBool::new(false),
            pool_mode_notify: Notify::new(),
            hibernating: AtomicBool::new(true),
            commit_mutex: Mutex::new(()),
            peers: RwLock::new(HashMap::new()),
        }
    }

    pub fn is_pool_mode(&self) -> bool {
        self.pool_mode.load(Ordering::SeqCst)
    }

    pub fn enter_pool_mode(&self) {
        self.pool_mode.store(true, Ordering::SeqCst);
        self.pool_mode_notify.notify_waiters();
    }

    pub fn exit_pool_mode(&self) {
        self.pool_mode.store(false, Ordering::SeqCst);
    }

    pub fn is_hibernating(&self) -> bool {
        self.hibernating.load(Ordering::SeqCst)
    }

    pub fn set_hibernating(&self, hibernating: bool) {
        self.hibernating.store(hibernating, Ordering::SeqCst);
    }

    pub fn peer(&self, id: H512) -> Arc<PeerState> {
        self.peers
            .write()
            .entry(id)
            .or_insert_with(|| Arc::new(PeerState::new()))
            .clone()
    }

    pub fn reset_queues_and_stash(&self) {
        self.header_unprocessed.write().clear();
        self.body_unprocessed.write().clear();
        self.header_staged.write().clear();
        self.body_staged.write().clear();
        self.stash.clear();
    }
}
