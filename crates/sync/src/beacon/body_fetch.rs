use std::sync::Arc;

use ethereum_core::{Block, Header};
use ethereum_types::H256;
use tracing::{debug, warn};

use super::context::{EngineContext, StagedBlockList};
use super::error::BeaconSyncError;
use super::external::{ForkchoiceHandle, SyncKv, WireClient};
use super::peer_state::PeerState;

/// Keccak-256 of the empty RLP list, the transactions/ommers root of any
/// block with no transactions.
const EMPTY_TRIE_ROOT: H256 = H256([
    0x56, 0xe8, 0x1f, 0x17, 0x1b, 0xcc, 0x55, 0xa6, 0xff, 0x83, 0x45, 0xe6, 0x92, 0xc0, 0xf8,
    0x6e, 0x5b, 0x48, 0xe0, 0x1b, 0x99, 0x6c, 0xad, 0xc0, 0x01, 0x62, 0x2f, 0xb5, 0xe3, 0x63,
    0xb4, 0x21,
]);

/// A duplicate staged-queue key is an invariant violation, not a
/// recoverable fault: abort rather than let the engine keep running with a
/// corrupted staged queue.
fn abort_on_invariant_violation(err: &BeaconSyncError) {
    if err.is_invariant_violation() {
        panic!("beacon sync invariant violated: {err}");
    }
}

/// Runs the per-peer body fetch loop until the peer is stopped or the
/// engine leaves the block-processing phase. Symmetric to
/// [`super::header_fetch::run`] but forward-ordered: bodies are borrowed
/// from the bottom of the unprocessed range, since blocks must import in
/// ascending order.
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
                warn!(?err, "body fetch batch failed");
                false
            }
        };

        if let Err(err) = blocks_staged_import(&ctx).await {
            warn!(?err, "block import pass failed");
        }

        if !progressed {
            tokio::time::sleep(ctx.config.async_thread_switch_time_slot).await;
        }

        tokio::task::yield_now().await;
    }
}

/// Borrows a batch from the unprocessed body range, looks up the matching
/// headers in the stash, fetches bodies from the peer, validates their
/// shape, and stages the assembled blocks. Returns whether any work was
/// done.
async fn fetch_batch<FC: ForkchoiceHandle, K: SyncKv, W: WireClient>(
    ctx: &Arc<EngineContext<FC, K>>,
    wire: &W,
    peer: &PeerState,
) -> super::error::Result<bool> {
    let Some((lo, hi)) = borrow_bottom(ctx) else {
        return Ok(false);
    };

    let mut headers = Vec::with_capacity((hi - lo + 1) as usize);
    for number in lo..=hi {
        match ctx.stash.peek(number) {
            Some(header) => headers.push(header),
            None => {
                // The header this body depends on isn't stashed yet (most
                // likely reorged out from under us); hand the range back
                // and let the controller run a reorg pass.
                ctx.enter_pool_mode();
                ctx.body_unprocessed.write().merge(lo, hi);
                return Ok(false);
            }
        }
    }

    let hashes: Vec<H256> = headers.iter().map(Header::hash).collect();

    let mut bodies = Vec::with_capacity(hashes.len());
    for chunk in hashes.chunks(ctx.config.n_fetch_bodies_request as usize) {
        match wire.fetch_bodies(chunk.to_vec()).await {
            Ok(chunk_bodies) if !chunk_bodies.is_empty() => {
                let got_all = chunk_bodies.len() == chunk.len();
                bodies.extend(chunk_bodies);
                if !got_all {
                    break;
                }
            }
            Ok(_) => break,
            Err(err) => {
                warn!(?err, "body request failed");
                break;
            }
        }
    }

    if bodies.is_empty() {
        let count = peer.inc_body_resp_errors();
        peer.zombify_if_over_threshold(count, ctx.config.fetch_bodies_req_err_threshold);
        ctx.body_unprocessed.write().merge(lo, hi);
        tokio::task::yield_now().await;
        return Ok(false);
    }

    let mut blocks = Vec::with_capacity(bodies.len());
    for (header, body) in headers.into_iter().zip(bodies.into_iter()) {
        let empty_expected = header.transactions_root == EMPTY_TRIE_ROOT;
        if body.transactions.is_empty() != empty_expected {
            // A malformed body is a response-level fault in its own right,
            // even when earlier bodies in the same batch were good.
            let count = peer.inc_body_proc_errors();
            peer.zombify_if_over_threshold(count, ctx.config.fetch_bodies_process_err_threshold);
            break;
        }
        blocks.push(Block {
            header,
            transactions: body.transactions,
            ommers: body.uncles,
            withdrawals: body.withdrawals,
        });
    }

    if blocks.is_empty() {
        ctx.body_unprocessed.write().merge(lo, hi);
        tokio::task::yield_now().await;
        return Ok(false);
    }

    let top = lo + blocks.len() as u64 - 1;
    if top < hi {
        ctx.body_unprocessed.write().merge(top + 1, hi);
    }

    ctx.body_staged.write().insert(lo, StagedBlockList { blocks })?;
    debug!(lo, top, "staged block list");

    Ok(true)
}

fn borrow_bottom<FC: ForkchoiceHandle, K: SyncKv>(ctx: &EngineContext<FC, K>) -> Option<(u64, u64)> {
    let mut unproc = ctx.body_unprocessed.write();
    let (lo, hi) = unproc.ge().ok()?;
    let batch_hi = lo.saturating_add(ctx.config.n_fetch_bodies_batch - 1).min(hi);
    unproc.reduce(lo, batch_hi);
    Some((lo, batch_hi))
}

/// Single-writer commit pass: imports blocks from the bottom of the staged
/// queue in ascending order, calling `forkChoice` every
/// `finaliser_chain_length_max` blocks and rolling the tail back to
/// unprocessed on an import failure.
pub async fn blocks_staged_import<FC: ForkchoiceHandle, K: SyncKv>(
    ctx: &Arc<EngineContext<FC, K>>,
) -> super::error::Result<()> {
    let _guard = ctx.commit_mutex.lock().await;

    loop {
        let latest = ctx.fc.latest_number();
        let base = ctx.fc.base_number();

        let (key, blocks) = {
            let staged = ctx.body_staged.read();
            let Some((key, entry)) = staged.first() else {
                return Ok(());
            };
            (*key, entry.blocks.clone())
        };

        if latest + 1 < key {
            debug!(key, latest, "gap at bottom of body staged queue, out-of-band importer rewound latest");
            ctx.body_unprocessed.write().merge(latest + 1, key - 1);
            return Ok(());
        }

        ctx.body_staged.write().delete(key);

        let mut imported = 0u64;
        let mut last_imported_number = latest;
        let mut failed_at = None;

        for (idx, block) in blocks.iter().enumerate() {
            let number = block.header.number.as_u64();
            // Below FC base, or already imported out-of-band (an external
            // importer may have advanced `latest` past part of this batch).
            if number <= base || number <= latest {
                continue;
            }

            match ctx.fc.import_block(block.clone()).await {
                Ok(()) => {
                    ctx.stash.unstash(number);
                    imported += 1;
                    last_imported_number = number;
                    if imported % ctx.config.finaliser_chain_length_max == 0 {
                        run_fork_choice(ctx, number).await;
                    }
                    tokio::task::yield_now().await;
                }
                Err(err) => {
                    warn!(number, ?err, "block import failed, rolling back tail");
                    failed_at = Some(idx);
                    break;
                }
            }
        }

        if let Some(idx) = failed_at {
            let tail_lo = blocks[idx].header.number.as_u64();
            let tail_hi = blocks.last().unwrap().header.number.as_u64();
            ctx.body_unprocessed.write().merge(tail_lo, tail_hi);
        }

        if imported > 0 {
            run_fork_choice(ctx, last_imported_number).await;
        }

        if failed_at.is_some() {
            return Ok(());
        }
    }
}

/// `finHash := finalHash` once import has reached the persisted finalised
/// number `F`, otherwise the chain keeps finalising against its own latest
/// imported hash.
async fn run_fork_choice<FC: ForkchoiceHandle, K: SyncKv>(ctx: &Arc<EngineContext<FC, K>>, current_number: u64) {
    let current_hash = ctx.fc.latest_hash();
    let layout = ctx.layout.read().clone();
    let fin_hash = match layout {
        Some(l) if current_number >= l.final_number => l.final_hash,
        _ => current_hash,
    };
    if let Err(err) = ctx.fc.fork_choice(current_hash, fin_hash).await {
        warn!(?err, "fork choice update failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::beacon::config::BeaconSyncConfig;
    use crate::beacon::external::FetchedBody;
    use crate::beacon::testutil::{MemorySyncKv, MockForkchoice, MockWireClient};
    use ethereum_types::U256;

    fn header(number: u64, parent_hash: H256) -> Header {
        let mut h = Header::new();
        h.number = U256::from(number);
        h.parent_hash = parent_hash;
        h.transactions_root = EMPTY_TRIE_ROOT;
        h
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
    async fn fetch_batch_stages_blocks_for_stashed_headers() {
        let (ctx, wire) = setup();
        let h1 = header(10, H256::zero());
        let h2 = header(11, h1.hash());
        ctx.stash.stash(10, &[h2.clone(), h1.clone()]).unwrap();
        wire.seed_body(h1.hash(), FetchedBody { transactions: vec![], uncles: vec![], withdrawals: None });
        wire.seed_body(h2.hash(), FetchedBody { transactions: vec![], uncles: vec![], withdrawals: None });

        ctx.body_unprocessed.write().merge(10, 11);

        let peer = Arc::new(PeerState::new());
        let progressed = fetch_batch(&ctx, wire.as_ref(), peer.as_ref()).await.unwrap();
        assert!(progressed);
        assert_eq!(ctx.body_staged.read().len(), 1);
        let (key, entry) = ctx.body_staged.read().first().map(|(k, v)| (*k, v.blocks.len())).unwrap();
        assert_eq!(key, 10);
        assert_eq!(entry, 2);
    }

    #[tokio::test]
    async fn fetch_batch_counts_fault_on_malformed_suffix_body() {
        let (ctx, wire) = setup();
        let h1 = header(10, H256::zero());
        let h2 = header(11, h1.hash());
        ctx.stash.stash(10, &[h2.clone(), h1.clone()]).unwrap();
        wire.seed_body(h1.hash(), FetchedBody { transactions: vec![], uncles: vec![], withdrawals: None });
        // h2 declares an empty transactions_root but the body claims a
        // transaction: a good prefix (h1) followed by a malformed body.
        wire.seed_body(h2.hash(), FetchedBody { transactions: vec![vec![1]], uncles: vec![], withdrawals: None });

        ctx.body_unprocessed.write().merge(10, 11);

        let peer = Arc::new(PeerState::new());
        let progressed = fetch_batch(&ctx, wire.as_ref(), peer.as_ref()).await.unwrap();
        assert!(progressed, "the good prefix still stages");
        assert_eq!(ctx.body_staged.read().len(), 1);
        let (key, count) = ctx.body_staged.read().first().map(|(k, v)| (*k, v.blocks.len())).unwrap();
        assert_eq!(key, 10);
        assert_eq!(count, 1, "only h1 stages, h2's malformed body truncates the list");
        assert_eq!(peer.ctrl(), crate::beacon::peer_state::PeerCtrl::Running);
    }

    #[tokio::test]
    async fn fetch_batch_enters_pool_mode_on_stash_miss() {
        let (ctx, wire) = setup();
        ctx.body_unprocessed.write().merge(10, 11);

        let peer = Arc::new(PeerState::new());
        let progressed = fetch_batch(&ctx, wire.as_ref(), peer.as_ref()).await.unwrap();
        assert!(!progressed);
        assert!(ctx.is_pool_mode());
        assert_eq!(ctx.body_unprocessed.read().total(), 2);
    }

    #[tokio::test]
    async fn blocks_staged_import_rolls_back_tail_on_failure() {
        let (ctx, _wire) = setup();
        let h1 = header(1, H256::zero());
        let h2 = header(2, h1.hash());
        let h3 = header(3, h2.hash());
        ctx.stash.stash(1, &[h3.clone(), h2.clone(), h1.clone()]).unwrap();

        let blocks = vec![
            Block { header: h1, transactions: vec![], ommers: vec![], withdrawals: None },
            Block { header: h2, transactions: vec![], ommers: vec![], withdrawals: None },
            Block { header: h3, transactions: vec![], ommers: vec![], withdrawals: None },
        ];
        ctx.body_staged.write().insert(1, StagedBlockList { blocks }).unwrap();
        ctx.fc.fail_import.store(false, std::sync::atomic::Ordering::SeqCst);

        blocks_staged_import(&ctx).await.unwrap();
        assert_eq!(ctx.fc.imported.read().unwrap().len(), 3);
        assert!(ctx.stash.peek(1).is_none());
        assert!(ctx.body_staged.read().is_empty());
    }

    #[tokio::test]
    async fn blocks_staged_import_stops_on_gap() {
        let (ctx, _wire) = setup();
        let h5 = header(5, H256::zero());
        ctx.body_staged
            .write()
            .insert(5, StagedBlockList { blocks: vec![Block { header: h5, transactions: vec![], ommers: vec![], withdrawals: None }] })
            .unwrap();

        blocks_staged_import(&ctx).await.unwrap();
        assert_eq!(ctx.body_staged.read().len(), 1, "latest=0 means key=5 is a gap, nothing should import");
    }
}
