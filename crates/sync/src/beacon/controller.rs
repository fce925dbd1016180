use std::sync::Arc;

use ethereum_types::H256;
use tracing::{info, warn};

use super::context::EngineContext;
use super::external::{ForkchoiceHandle, SyncKv};
use super::layout::{compute_state, SyncState, SyncStateLayout, LAYOUT_KEY};
use super::persistence;

/// Runs between scheduler quanta, driving the sync state machine and
/// reacting to fresh targets. Unlike the fetch loops this has no peer of
/// its own; it only observes and mutates [`EngineContext`] shared state.
pub struct BeaconSyncController<FC: ForkchoiceHandle, K: SyncKv> {
    ctx: Arc<EngineContext<FC, K>>,
}

impl<FC: ForkchoiceHandle, K: SyncKv> BeaconSyncController<FC, K> {
    pub fn new(ctx: Arc<EngineContext<FC, K>>) -> Self {
        Self { ctx }
    }

    /// One controller quantum: process an incoming target update, run a
    /// pool-mode reorg pass if either staged queue is over its high-water
    /// mark, then re-evaluate and act on the current state transition.
    pub async fn tick(&self) -> super::error::Result<()> {
        if self.ctx.target.take_changed() {
            self.try_start_collecting_headers();
        }

        self.reorg_if_over_hwm();

        let state = self.current_state();
        match state {
            SyncState::CollectingHeaders if self.coupler_plus_one_equals_dangling() => {
                self.transition_to(SyncState::FinishedHeaders);
            }
            SyncState::FinishedHeaders => {
                self.try_link_into_fc().await;
            }
            _ => {}
        }

        Ok(())
    }

    /// Pool-mode trigger: when a staged queue grows past its high-water
    /// mark, flush it back down to the low-water mark by returning the
    /// entries furthest from the current commit frontier to the
    /// unprocessed set, then drops the cooperative barrier so fetch
    /// workers resume.
    fn reorg_if_over_hwm(&self) {
        let hwm = self.ctx.config.headers_staged_queue_length_hwm;
        let lwm = self.ctx.config.headers_staged_queue_length_lwm;

        let header_over = self.ctx.header_staged.read().len() > hwm;
        let body_over = self.ctx.body_staged.read().len() > hwm;
        if !header_over && !body_over {
            return;
        }

        self.ctx.enter_pool_mode();

        if header_over {
            // Commit consumes the largest key first, so the smallest-key
            // entries have been waiting longest.
            let mut staged = self.ctx.header_staged.write();
            while staged.len() > lwm {
                let Some((&key, _)) = staged.first() else { break };
                let Some(entry) = staged.delete(key) else { break };
                let bottom = entry.rev_hdrs.last().unwrap().number.as_u64();
                self.ctx.header_unprocessed.write().merge(bottom, key);
            }
        }

        if body_over {
            // Commit consumes the smallest key first, so the largest-key
            // entries have been waiting longest.
            let mut staged = self.ctx.body_staged.write();
            while staged.len() > lwm {
                let Some((&key, _)) = staged.last() else { break };
                let Some(entry) = staged.delete(key) else { break };
                let top = key + entry.blocks.len() as u64 - 1;
                self.ctx.body_unprocessed.write().merge(key, top);
            }
        }

        self.ctx.exit_pool_mode();
    }

    fn current_state(&self) -> SyncState {
        let Some(layout) = self.ctx.layout.read().clone() else {
            return SyncState::Idle;
        };
        compute_state(
            self.ctx.fc.base_number(),
            self.ctx.fc.latest_number(),
            layout.coupler,
            layout.dangling,
            layout.head,
        )
    }

    fn coupler_plus_one_equals_dangling(&self) -> bool {
        self.ctx
            .layout
            .read()
            .as_ref()
            .map(|l| l.coupler + 1 == l.dangling)
            .unwrap_or(false)
    }

    fn transition_to(&self, state: SyncState) {
        if let Some(layout) = self.ctx.layout.write().as_mut() {
            layout.last_state = state;
        }
    }

    /// `idle -> collectingHeaders`: seeds the session from a freshly
    /// observed target, provided there is nothing already in flight.
    fn try_start_collecting_headers(&self) {
        let snapshot = self.ctx.target.snapshot();
        if snapshot.final_number == 0 {
            return;
        }
        if !matches!(self.current_state(), SyncState::Idle) {
            return;
        }
        if self.ctx.header_unprocessed.read().total() != 0
            || self.ctx.header_staged.read().len() != 0
            || !self.ctx.stash.is_empty()
        {
            return;
        }

        let base = self.ctx.fc.base_number();
        let head = snapshot.cons_head.number.as_u64();
        if head == 0 || head <= base {
            return;
        }

        self.ctx.stash.stash(head, std::slice::from_ref(&snapshot.cons_head)).ok();

        *self.ctx.layout.write() = Some(SyncStateLayout {
            coupler: base,
            coupler_hash: H256::zero(),
            dangling: head,
            dangling_parent: snapshot.cons_head.parent_hash,
            final_number: snapshot.final_number,
            final_hash: snapshot.final_hash,
            head,
            head_hash: snapshot.cons_head.hash(),
            last_state: SyncState::CollectingHeaders,
        });
        self.ctx.header_unprocessed.write().merge(base + 1, head.saturating_sub(1));
        self.ctx.set_hibernating(false);
        if let Err(err) = persistence::persist(self.ctx.as_ref()) {
            warn!(?err, "failed to persist layout on collectingHeaders entry");
        }
        info!(base, head, "beacon sync target accepted, collecting headers");
    }

    /// `finishedHeaders -> processingBlocks`: searches for a header
    /// already known to the Forkchoice module among the stashed chain.
    /// On success this couples the stashed chain into FC and seeds the
    /// body range; on failure the session is abandoned.
    async fn try_link_into_fc(&self) {
        let (l, c, head) = {
            let Some(layout) = self.ctx.layout.read().clone() else { return };
            (self.ctx.fc.latest_number(), layout.coupler, layout.head)
        };

        let start = l.min(c) + 1;
        for bn in start..=l + 1 {
            let Some(parent_hash) = self.ctx.stash.parent_hash(bn) else {
                continue;
            };
            if self.ctx.fc.header_by_hash(parent_hash).is_ok() {
                if let Some(layout) = self.ctx.layout.write().as_mut() {
                    layout.coupler = bn - 1;
                    layout.coupler_hash = parent_hash;
                    layout.dangling = bn - 1;
                    layout.last_state = SyncState::ProcessingBlocks;
                }
                self.ctx.body_unprocessed.write().merge(bn, head);
                if let Err(err) = persistence::persist(self.ctx.as_ref()) {
                    warn!(?err, "failed to persist layout on processingBlocks entry");
                }
                info!(bn, "linked stashed header chain into forkchoice, processing blocks");
                return;
            }
        }

        info!("no linkage point found for stashed header chain, hibernating");
        self.hibernate();
    }

    /// `any -> idle`: resets all session state and marks the engine
    /// hibernating, discarding the in-flight sync attempt entirely.
    pub fn hibernate(&self) {
        *self.ctx.layout.write() = None;
        self.ctx.reset_queues_and_stash();
        self.ctx.set_hibernating(true);
        if let Err(err) = self.ctx.kv.del(LAYOUT_KEY) {
            warn!(?err, "failed to delete persisted layout on hibernate");
        }
        info!("beacon sync hibernating");
    }

    /// Accepts a freshly finalised block number/hash pair from the
    /// Forkchoice module, waking the engine if it was hibernating.
    pub fn update_final_block_header(&self, finalised: u64, final_hash: H256) -> bool {
        let base = self.ctx.fc.base_number();
        let accepted = self.ctx.target.update_final_block_header(finalised, final_hash, base);
        if accepted && self.ctx.is_hibernating() {
            self.ctx.set_hibernating(false);
        }
        accepted
    }

    /// RPC ingress: records a new consensus head/final-hash pair if it
    /// strictly advances the target, and opportunistically finalises it
    /// immediately when FC already recognises the finalised hash.
    pub fn update_beacon_header_cb(&self, cons_head: ethereum_core::Header, final_hash: H256) -> bool {
        let current_head = self.ctx.fc.latest_number();
        let updated = self.ctx.target.update_beacon_header_cb(cons_head, final_hash, current_head);
        if updated {
            if let Ok(header) = self.ctx.fc.header_by_hash(final_hash) {
                self.update_final_block_header(header.number.as_u64(), final_hash);
            }
        }
        updated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beacon::config::BeaconSyncConfig;
    use crate::beacon::context::{StagedBlockList, StagedHeaderChain};
    use crate::beacon::testutil::{MemorySyncKv, MockForkchoice};
    use ethereum_core::Header;
    use ethereum_types::U256;
    use std::sync::Arc;

    fn header_at(number: u64, parent_hash: H256) -> Header {
        let mut h = Header::new();
        h.number = U256::from(number);
        h.parent_hash = parent_hash;
        h
    }

    fn setup() -> Arc<EngineContext<MockForkchoice, MemorySyncKv>> {
        let fc = Arc::new(MockForkchoice::new());
        let kv = Arc::new(MemorySyncKv::new());
        Arc::new(EngineContext::new(fc, kv, BeaconSyncConfig::default()))
    }

    #[tokio::test]
    async fn target_update_seeds_collecting_headers() {
        let ctx = setup();
        let controller = BeaconSyncController::new(ctx.clone());

        ctx.target.update_beacon_header_cb(header_at(1000, H256::zero()), H256::from_low_u64_be(999), 0);
        ctx.target.update_final_block_header(999, H256::from_low_u64_be(999), 0);

        controller.tick().await.unwrap();

        let layout = ctx.layout.read().clone().unwrap();
        assert_eq!(layout.last_state, SyncState::CollectingHeaders);
        assert_eq!(layout.dangling, 1000);
        assert_eq!(ctx.header_unprocessed.read().total(), 999);
    }

    #[tokio::test]
    async fn finished_headers_links_into_fc_when_parent_known() {
        let ctx = setup();
        let controller = BeaconSyncController::new(ctx.clone());

        let genesis = header_at(0, H256::zero());
        ctx.fc.known(genesis.clone());

        let h1 = header_at(1, genesis.hash());
        ctx.stash.stash(1, &[h1.clone()]).unwrap();

        *ctx.layout.write() = Some(SyncStateLayout {
            coupler: 0,
            coupler_hash: H256::zero(),
            dangling: 1,
            dangling_parent: genesis.hash(),
            final_number: 1,
            final_hash: h1.hash(),
            head: 1,
            head_hash: h1.hash(),
            last_state: SyncState::FinishedHeaders,
        });

        controller.tick().await.unwrap();

        let layout = ctx.layout.read().clone().unwrap();
        assert_eq!(layout.last_state, SyncState::ProcessingBlocks);
        assert_eq!(ctx.body_unprocessed.read().total(), 1);
    }

    #[tokio::test]
    async fn finished_headers_hibernates_when_unlinkable() {
        let ctx = setup();
        let controller = BeaconSyncController::new(ctx.clone());

        ctx.stash.stash(1, &[header_at(1, H256::zero())]).unwrap();
        *ctx.layout.write() = Some(SyncStateLayout {
            coupler: 0,
            coupler_hash: H256::zero(),
            dangling: 1,
            dangling_parent: H256::zero(),
            final_number: 1,
            final_hash: H256::zero(),
            head: 1,
            head_hash: H256::zero(),
            last_state: SyncState::FinishedHeaders,
        });

        controller.tick().await.unwrap();
        assert!(ctx.layout.read().is_none());
        assert!(ctx.is_hibernating());
    }

    #[tokio::test]
    async fn reorg_drains_header_staged_down_to_lwm() {
        let ctx = setup();
        let controller = BeaconSyncController::new(ctx.clone());

        let hwm = ctx.config.headers_staged_queue_length_hwm;
        let lwm = ctx.config.headers_staged_queue_length_lwm;
        {
            let mut staged = ctx.header_staged.write();
            for top in 0..(hwm as u64 + 1) {
                let bottom = top * 10;
                staged
                    .insert(
                        top,
                        StagedHeaderChain {
                            parent_hash: H256::zero(),
                            hash: H256::zero(),
                            rev_hdrs: vec![header_at(bottom, H256::zero())],
                        },
                    )
                    .unwrap();
            }
        }

        controller.reorg_if_over_hwm();

        assert_eq!(ctx.header_staged.read().len(), lwm);
        assert!(!ctx.is_pool_mode());
        assert!(ctx.header_unprocessed.read().total() > 0);
        // The entries drained are the smallest keys (0..=hwm-lwm), since
        // commit always consumes the largest key first.
        assert!(ctx.header_staged.read().first().unwrap().0 >= &((hwm as u64 + 1) - lwm as u64));
    }

    #[tokio::test]
    async fn reorg_drains_body_staged_down_to_lwm() {
        let ctx = setup();
        let controller = BeaconSyncController::new(ctx.clone());

        let hwm = ctx.config.headers_staged_queue_length_hwm;
        let lwm = ctx.config.headers_staged_queue_length_lwm;
        {
            let mut staged = ctx.body_staged.write();
            for bottom in 0..(hwm as u64 + 1) {
                let key = bottom * 10;
                let block = ethereum_core::Block {
                    header: header_at(key, H256::zero()),
                    transactions: vec![],
                    ommers: vec![],
                    withdrawals: None,
                };
                staged.insert(key, StagedBlockList { blocks: vec![block] }).unwrap();
            }
        }

        controller.reorg_if_over_hwm();

        assert_eq!(ctx.body_staged.read().len(), lwm);
        assert!(!ctx.is_pool_mode());
        assert!(ctx.body_unprocessed.read().total() > 0);
        // The entries drained are the largest keys, since commit always
        // consumes the smallest key first.
        assert!(ctx.body_staged.read().last().unwrap().0 < &((lwm as u64) * 10));
    }
}
