use serde::{Deserialize, Serialize};

use super::external::{ForkchoiceHandle, SyncKv};
use super::context::EngineContext;

/// The engine's side of the workspace's ambient metrics reporter, the
/// same shape `ethereum_sync::block_downloader::DownloadStats` uses for
/// its own polled counters: a plain struct the external ticker/metrics
/// reporter polls, not a Prometheus registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickerStats {
    pub base: u64,
    pub latest: u64,
    pub coupler: u64,
    pub dangling: u64,
    pub head: u64,
    pub target: u64,
    pub head_ok: bool,
    pub target_ok: bool,
    pub n_hdr_staged: usize,
    pub hdr_staged_top: Option<u64>,
    pub hdr_unproc_top: Option<u64>,
    pub n_hdr_unprocessed: u64,
    pub n_hdr_unproc_fragm: usize,
    pub n_blk_staged: usize,
    pub blk_staged_bottom: Option<u64>,
    pub blk_unproc_bottom: Option<u64>,
    pub n_blk_unprocessed: u64,
    pub n_blk_unproc_fragm: usize,
    pub reorg: bool,
    pub n_buddies: usize,
}

impl TickerStats {
    pub fn collect<FC: ForkchoiceHandle, K: SyncKv>(ctx: &EngineContext<FC, K>) -> Self {
        let layout = ctx.layout.read().clone();
        let header_unproc = ctx.header_unprocessed.read();
        let body_unproc = ctx.body_unprocessed.read();
        let header_staged = ctx.header_staged.read();
        let body_staged = ctx.body_staged.read();
        let target = ctx.target.snapshot();

        Self {
            base: ctx.fc.base_number(),
            latest: ctx.fc.latest_number(),
            coupler: layout.as_ref().map(|l| l.coupler).unwrap_or(0),
            dangling: layout.as_ref().map(|l| l.dangling).unwrap_or(0),
            head: layout.as_ref().map(|l| l.head).unwrap_or(0),
            target: target.cons_head.number.as_u64(),
            head_ok: layout.is_some(),
            target_ok: target.cons_head.number.as_u64() > 0,
            n_hdr_staged: header_staged.len(),
            hdr_staged_top: header_staged.last().map(|(k, _)| *k),
            hdr_unproc_top: header_unproc.le().ok().map(|(_, hi)| hi),
            n_hdr_unprocessed: header_unproc.total(),
            n_hdr_unproc_fragm: header_unproc.iter().count(),
            n_blk_staged: body_staged.len(),
            blk_staged_bottom: body_staged.first().map(|(k, _)| *k),
            blk_unproc_bottom: body_unproc.ge().ok().map(|(lo, _)| lo),
            n_blk_unprocessed: body_unproc.total(),
            n_blk_unproc_fragm: body_unproc.iter().count(),
            reorg: ctx.is_pool_mode(),
            n_buddies: ctx.peers.read().len(),
        }
    }
}
