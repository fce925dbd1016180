use std::sync::Arc;

use tracing::{info, warn};

use super::context::EngineContext;
use super::external::{ForkchoiceHandle, SyncKv};
use super::layout::{SyncState, SyncStateLayout, LAYOUT_KEY};

/// Flushes the current layout to the KV store and, if no FC transaction
/// is open and no stash overflow is pending, issues a `persistent` flush
/// so the write actually hits durable storage.
pub fn persist<FC: ForkchoiceHandle, K: SyncKv>(ctx: &EngineContext<FC, K>) -> super::error::Result<()> {
    let Some(layout) = ctx.layout.read().clone() else {
        return Ok(());
    };
    ctx.kv.put(LAYOUT_KEY, &layout.encode())?;
    if !ctx.kv.is_write_blocked() && ctx.kv.tx_depth() == 0 {
        ctx.kv.persistent(layout.dangling)?;
    }
    Ok(())
}

/// Attempts to resume a prior session from the persisted layout. Returns
/// `true` if a resumable session was found and loaded into `ctx`; `false`
/// if there was nothing to resume or the saved state was unusable (in
/// which case stale stashed headers are cleaned up and the caller should
/// start fresh from the current `L`).
pub fn recover<FC: ForkchoiceHandle, K: SyncKv>(ctx: &Arc<EngineContext<FC, K>>) -> super::error::Result<bool> {
    let Some(bytes) = ctx.kv.get(LAYOUT_KEY)? else {
        return Ok(false);
    };
    let layout = SyncStateLayout::decode(&bytes)?;

    let base = ctx.fc.base_number();
    let latest = ctx.fc.latest_number();
    let resumable = base <= layout.final_number
        && latest < layout.head
        && layout.last_state == SyncState::CollectingHeaders;

    if !resumable {
        warn!(
            base,
            latest,
            coupler = layout.coupler,
            dangling = layout.dangling,
            head = layout.head,
            final_number = layout.final_number,
            last_state = ?layout.last_state,
            "discarding unresumable persisted sync layout"
        );
        cleanup_stale_stash(ctx, latest.max(layout.head));
        ctx.kv.del(LAYOUT_KEY)?;
        return Ok(false);
    }

    info!(coupler = layout.coupler, dangling = layout.dangling, head = layout.head, "resuming persisted beacon sync session");
    ctx.header_unprocessed.write().merge(layout.coupler + 1, layout.dangling.saturating_sub(1));
    *ctx.layout.write() = Some(layout);
    ctx.set_hibernating(false);
    Ok(true)
}

/// Walks backward from `from` unstashing entries until the stash reports
/// nothing left, flushing the KV periodically so a crash mid-cleanup
/// doesn't leave an unbounded amount of work for the next boot.
fn cleanup_stale_stash<FC: ForkchoiceHandle, K: SyncKv>(ctx: &Arc<EngineContext<FC, K>>, from: u64) {
    const FLUSH_INTERVAL: u64 = 1024;
    let mut number = from;
    let mut visited = 0u64;
    loop {
        if ctx.stash.is_empty() {
            break;
        }
        if ctx.stash.peek(number).is_none() {
            if number == 0 {
                break;
            }
            number -= 1;
            continue;
        }
        ctx.stash.unstash(number);
        visited += 1;
        if visited % FLUSH_INTERVAL == 0 {
            let _ = ctx.kv.persistent(number);
        }
        if number == 0 {
            break;
        }
        number -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beacon::config::BeaconSyncConfig;
    use crate::beacon::testutil::{MemorySyncKv, MockForkchoice};
    use ethereum_core::Header;
    use ethereum_types::{H256, U256};

    fn ctx() -> Arc<EngineContext<MockForkchoice, MemorySyncKv>> {
        let fc = Arc::new(MockForkchoice::new());
        let kv = Arc::new(MemorySyncKv::new());
        Arc::new(EngineContext::new(fc, kv, BeaconSyncConfig::default()))
    }

    fn sample_layout(last_state: SyncState) -> SyncStateLayout {
        SyncStateLayout {
            coupler: 100,
            coupler_hash: H256::zero(),
            dangling: 150,
            dangling_parent: H256::zero(),
            final_number: 900,
            final_hash: H256::zero(),
            head: 1000,
            head_hash: H256::zero(),
            last_state,
        }
    }

    #[test]
    fn persist_and_recover_round_trip() {
        let ctx = ctx();
        *ctx.layout.write() = Some(sample_layout(SyncState::CollectingHeaders));
        persist(ctx.as_ref()).unwrap();

        let ctx2 = {
            let fc = ctx.fc.clone();
            let kv = ctx.kv.clone();
            Arc::new(EngineContext::new(fc, kv, BeaconSyncConfig::default()))
        };
        let resumed = recover(&ctx2).unwrap();
        assert!(resumed);
        assert_eq!(ctx2.layout.read().as_ref().unwrap().dangling, 150);
        assert_eq!(ctx2.header_unprocessed.read().total(), 49);
    }

    #[test]
    fn recover_discards_non_collecting_headers_state() {
        let ctx = ctx();
        *ctx.layout.write() = Some(sample_layout(SyncState::ProcessingBlocks));
        persist(ctx.as_ref()).unwrap();

        let mut h = Header::new();
        h.number = U256::from(50);
        ctx.stash.stash(50, &[h]).unwrap();

        let resumed = recover(&ctx).unwrap();
        assert!(!resumed);
        assert!(ctx.kv.get(LAYOUT_KEY).unwrap().is_none());
        assert!(ctx.stash.is_empty());
    }

    #[test]
    fn recover_returns_false_when_nothing_persisted() {
        let ctx = ctx();
        assert!(!recover(&ctx).unwrap());
    }
}
