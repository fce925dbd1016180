use std::sync::Arc;

use ethereum_core::Header;
use ethereum_types::H256;
use tracing::{debug, warn};

use super::context::{EngineContext, StagedHeaderChain};
use super::error::BeaconSyncError;
use super::external::{ForkchoiceHandle, SyncKv, WireClient};
use super::peer_state::PeerState;
use super::persistence;

/// Runs the per-peer header fetch loop until the peer is stopped or the
/// engine leaves `collectingHeaders`. Each iteration borrows a batch from
/// the unprocessed header range, fetches it (possibly over several
/// sub-requests), stages the result, and cooperates with pool-mode.
pub async fn run<FC: ForkchoiceHandle, K: SyncKv, W: WireClient>(
    ctx: Arc<EngineContext<FC, K>>,
    wire: Arc<W>,
    peer: Arc<PeerState>,
) {
    loop {
        if peer.is_stopped() || ctx.is_pool_mode() {
            return;
        }

        let progressed = match fetch_batch(&ctx, wire.as_ref(), peer.as_ref()).await {
            Ok(progressed) => progressed,
            Err(err) => {
                abort_on_invariant_violation(&err);
                warn!(?err, "header fetch batch failed");
                false
            }
        };

        if let Err(err) = headers_staged_process(&ctx).await {
            abort_on_invariant_violation(&err);
            warn!(?err, "header commit pass failed");
        }

        if !progressed {
            tokio::time::sleep(ctx.config.async_thread_switch_time_slot).await;
        }

        tokio::task::yield_now().await;
    }
}

/// A duplicate staged-queue key is an invariant violation, not a
/// recoverable fault: abort rather than let the engine keep running with a
/// corrupted staged queue.
fn abort_on_invariant_violation(err: &BeaconSyncError) {
    if err.is_invariant_violation() {
        panic!("beacon sync invariant violated: {err}");
    }
}

/// Borrows a batch from the unprocessed header range, fetches it from the
/// peer (in `deterministic` or `opportunistic` mode), validates the chain,
/// and stages the valid portion. Returns whether any work was done.
async fn fetch_batch<FC: ForkchoiceHandle, K: SyncKv, W: WireClient>(
    ctx: &Arc<EngineContext<FC, K>>,
    wire: &W,
    peer: &PeerState,
) -> super::error::Result<bool> {
    let Some((lo, hi)) = borrow_top(ctx) else {
        return Ok(false);
    };

    let dangling = ctx.layout.read().as_ref().map(|l| l.dangling).unwrap_or(0);
    let dangling_parent = ctx.layout.read().as_ref().map(|l| l.dangling_parent);
    let deterministic = hi + 1 == dangling;

    let requested = hi - lo + 1;
    let mut collected: Vec<Header> = Vec::new();
    let mut cur_top = hi;
    let mut response_failed = false;

    while cur_top >= lo {
        let limit = (cur_top - lo + 1).min(ctx.config.n_fetch_headers_request);
        let top_hash = if deterministic {
            match collected.last() {
                Some(prev) => Some(prev.parent_hash),
                None => dangling_parent,
            }
        } else {
            None
        };

        match wire.fetch_headers_reversed(cur_top, top_hash, limit).await {
            Ok(headers) if !headers.is_empty() => {
                let received = headers.len() as u64;
                collected.extend(headers);
                if received >= cur_top - lo + 1 {
                    break;
                }
                cur_top -= received;
            }
            _ => {
                response_failed = true;
                break;
            }
        }
    }

    if collected.is_empty() {
        let count = peer.inc_header_resp_errors();
        peer.zombify_if_over_threshold(count, ctx.config.fetch_headers_req_err_threshold);
        ctx.header_unprocessed.write().merge(lo, hi);
        tokio::task::yield_now().await;
        return Ok(false);
    }

    let valid_prefix = valid_chain_prefix(&collected, if deterministic { dangling_parent } else { None });

    if valid_prefix == 0 {
        let count = peer.inc_header_proc_errors();
        peer.zombify_if_over_threshold(count, ctx.config.fetch_headers_process_err_threshold);
        ctx.header_unprocessed.write().merge(lo, hi);
        tokio::task::yield_now().await;
        return Ok(false);
    }

    let full_success = !response_failed && valid_prefix as u64 == requested;

    if !full_success && !deterministic {
        // Opportunistic mode has no hash anchor to trust a broken chain by;
        // any failure here discards the whole batch.
        let count = peer.inc_header_proc_errors();
        peer.zombify_if_over_threshold(count, ctx.config.fetch_headers_process_err_threshold);
        ctx.header_unprocessed.write().merge(lo, hi);
        tokio::task::yield_now().await;
        return Ok(false);
    }

    collected.truncate(valid_prefix);
    let bottom = collected.last().expect("valid_prefix > 0").number.as_u64();

    if bottom > lo {
        ctx.header_unprocessed.write().merge(lo, bottom - 1);
    }

    let chain = StagedHeaderChain {
        parent_hash: collected.last().unwrap().parent_hash,
        hash: collected[0].hash(),
        rev_hdrs: collected,
    };
    ctx.header_staged.write().insert(hi, chain)?;
    debug!(lo, hi, bottom, "staged header chain");

    Ok(true)
}

fn borrow_top<FC: ForkchoiceHandle, K: SyncKv>(ctx: &EngineContext<FC, K>) -> Option<(u64, u64)> {
    let mut unproc = ctx.header_unprocessed.write();
    let (lo, hi) = unproc.le().ok()?;
    let batch_lo = hi.saturating_sub(ctx.config.n_fetch_headers_batch - 1).max(lo);
    unproc.reduce(batch_lo, hi);
    Some((batch_lo, hi))
}

/// Returns the length of the longest valid prefix of `headers` (top-first,
/// reverse order): contiguous by decreasing number, each hash linking to
/// the next header's `parentHash`, and (when `expected_top_hash` is set)
/// the first header's hash matching it.
fn valid_chain_prefix(headers: &[Header], expected_top_hash: Option<H256>) -> usize {
    if headers.is_empty() {
        return 0;
    }
    if let Some(expected) = expected_top_hash {
        if headers[0].hash() != expected {
            return 0;
        }
    }

    let mut len = 1;
    for pair in headers.windows(2) {
        let (top, next) = (&pair[0], &pair[1]);
        if next.number + ethereum_types::U256::one() != top.number {
            break;
        }
        if next.hash() != top.parent_hash {
            break;
        }
        len += 1;
    }
    len
}

/// Single-writer commit pass: drains the header staged queue from the top,
/// stashing contiguous chains that link to the current dangling anchor
/// `D` and advancing it, stopping at the first gap.
pub async fn headers_staged_process<FC: ForkchoiceHandle, K: SyncKv>(
    ctx: &Arc<EngineContext<FC, K>>,
) -> super::error::Result<()> {
    let _guard = ctx.commit_mutex.lock().await;

    loop {
        let dangling = match ctx.layout.read().as_ref() {
            Some(layout) => layout.dangling,
            None => return Ok(()),
        };

        let (key, bottom, hash, rev_hdrs) = {
            let staged = ctx.header_staged.read();
            let Some((key, entry)) = staged.last() else {
                return Ok(());
            };
            let bottom = entry.rev_hdrs.last().unwrap().number.as_u64();
            (*key, bottom, entry.hash, entry.rev_hdrs.clone())
        };

        if key + 1 < dangling {
            debug!(key, dangling, "gap at top of header staged queue, stopping commit pass");
            return Ok(());
        }

        let parent_matches = key + 1 == dangling && ctx.stash.parent_hash(dangling) == Some(hash);
        if parent_matches {
            ctx.header_staged.write().delete(key);
            ctx.stash.stash(bottom, &rev_hdrs)?;
            if let Some(layout) = ctx.layout.write().as_mut() {
                layout.dangling = bottom;
                layout.dangling_parent = rev_hdrs.last().unwrap().parent_hash;
            }
            persistence::persist(ctx.as_ref())?;
        } else {
            ctx.header_staged.write().delete(key);
            ctx.header_unprocessed.write().merge(bottom, key);
            warn!(key, bottom, "discarding staged header chain, hash mismatch at commit");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beacon::config::BeaconSyncConfig;
    use crate::beacon::layout::{SyncState, SyncStateLayout};
    use crate::beacon::testutil::{MemorySyncKv, MockForkchoice, MockWireClient};
    use ethereum_types::U256;
    use std::sync::Arc;

    fn header(number: u64, parent_hash: H256) -> Header {
        let mut h = Header::new();
        h.number = U256::from(number);
        h.parent_hash = parent_hash;
        h
    }

    /// Builds a reverse-contiguous chain `[bottom, top]`, bottom-up so
    /// each header's hash seeds the next header's `parent_hash`, then
    /// reverses it into the top-first order the wire returns.
    fn chain(top: u64, bottom: u64) -> Vec<Header> {
        let mut headers = Vec::new();
        let mut prev_hash = H256::from_low_u64_be(bottom - 1);
        for n in bottom..=top {
            let h = header(n, prev_hash);
            prev_hash = h.hash();
            headers.push(h);
        }
        headers.reverse();
        headers
    }

    fn setup() -> (
        Arc<EngineContext<MockForkchoice, MemorySyncKv>>,
        Arc<MockWireClient>,
    ) {
        let fc = Arc::new(MockForkchoice::new());
        let kv = Arc::new(MemorySyncKv::new());
        let ctx = Arc::new(EngineContext::new(fc, kv, BeaconSyncConfig::default()));
        let wire = Arc::new(MockWireClient::new());
        (ctx, wire)
    }

    #[tokio::test]
    async fn deterministic_fetch_stages_and_commits_full_chain() {
        let (ctx, wire) = setup();
        let headers = chain(1000, 951); // 50 headers, top-first
        for h in &headers {
            wire.seed_header(h.clone());
        }

        let top_header = headers[0].clone();
        *ctx.layout.write() = Some(SyncStateLayout {
            coupler: 950,
            coupler_hash: H256::zero(),
            dangling: 1000,
            dangling_parent: top_header.parent_hash,
            final_number: 0,
            final_hash: H256::zero(),
            head: 1000,
            head_hash: H256::zero(),
            last_state: SyncState::CollectingHeaders,
        });
        ctx.stash.stash(1000, &[top_header]).unwrap();
        ctx.header_unprocessed.write().merge(951, 999);

        let peer = Arc::new(PeerState::new());
        fetch_batch(&ctx, wire.as_ref(), peer.as_ref()).await.unwrap();
        headers_staged_process(&ctx).await.unwrap();

        assert_eq!(ctx.layout.read().as_ref().unwrap().dangling, 951);
        assert!(ctx.stash.peek(951).is_some());
    }

    #[tokio::test]
    async fn bad_chain_increments_process_errors_and_returns_range() {
        let (ctx, wire) = setup();
        // 501's parent_hash deliberately does not match 500's real hash,
        // breaking the chain-extension check.
        wire.seed_header(header(501, H256::zero()));
        wire.seed_header(header(500, H256::from_low_u64_be(999)));

        *ctx.layout.write() = Some(SyncStateLayout {
            coupler: 100,
            coupler_hash: H256::zero(),
            dangling: 2000,
            dangling_parent: H256::from_low_u64_be(42),
            final_number: 0,
            final_hash: H256::zero(),
            head: 2000,
            head_hash: H256::zero(),
            last_state: SyncState::CollectingHeaders,
        });
        ctx.header_unprocessed.write().merge(500, 501);

        let peer = Arc::new(PeerState::new());
        let progressed = fetch_batch(&ctx, wire.as_ref(), peer.as_ref()).await.unwrap();
        assert!(!progressed);
        assert_eq!(ctx.header_unprocessed.read().total(), 2);
        assert_eq!(peer.ctrl(), crate::beacon::peer_state::PeerCtrl::Running);
    }
}
