//! Beacon-chain-driven sync engine: downloads headers backward from a
//! consensus-layer-published target, couples them into the Forkchoice
//! module's known chain, then downloads and imports the corresponding
//! block bodies forward. See the submodules for the individual
//! components; this module wires them into the engine the rest of the
//! node talks to.

pub mod config;
pub mod context;
pub mod controller;
pub mod error;
pub mod external;
pub mod layout;
pub mod persistence;
pub mod peer_state;
pub mod range_set;
pub mod staged_queue;
pub mod stash;
pub mod target;
pub mod ticker;

pub mod header_fetch;
pub mod body_fetch;

#[cfg(test)]
pub mod testutil;

use std::collections::HashMap;
use std::sync::Arc;

use ethereum_core::Header;
use ethereum_types::{H256, H512};
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tracing::info;

pub use config::BeaconSyncConfig;
pub use context::EngineContext;
pub use controller::BeaconSyncController;
pub use error::{BeaconSyncError, Result};
pub use external::{FetchedBody, ForkchoiceHandle, SyncKv, WireClient};
pub use ticker::TickerStats;

struct PeerTasks {
    headers: JoinHandle<()>,
    bodies: JoinHandle<()>,
}

/// The engine's public facade: owns the shared [`EngineContext`], the
/// controller, and the per-peer fetch tasks. One instance per running
/// sync session; cheap to construct, expensive to run.
pub struct BeaconEngine<FC: ForkchoiceHandle + 'static, K: SyncKv + 'static, W: WireClient + 'static> {
    ctx: Arc<EngineContext<FC, K>>,
    controller: Arc<BeaconSyncController<FC, K>>,
    controller_task: AsyncMutex<Option<JoinHandle<()>>>,
    peer_tasks: AsyncMutex<HashMap<H512, PeerTasks>>,
    _wire: std::marker::PhantomData<W>,
}

impl<FC: ForkchoiceHandle + 'static, K: SyncKv + 'static, W: WireClient + 'static> BeaconEngine<FC, K, W> {
    pub fn new(fc: Arc<FC>, kv: Arc<K>, config: BeaconSyncConfig) -> Self {
        let ctx = Arc::new(EngineContext::new(fc, kv, config));
        let controller = Arc::new(BeaconSyncController::new(ctx.clone()));
        Self {
            ctx,
            controller,
            controller_task: AsyncMutex::new(None),
            peer_tasks: AsyncMutex::new(HashMap::new()),
            _wire: std::marker::PhantomData,
        }
    }

    /// Attempts to resume a previously persisted session, then starts the
    /// periodic controller loop. A no-op if already started.
    pub async fn start(self: Arc<Self>) -> Result<()> {
        if persistence::recover(&self.ctx)? {
            info!("beacon sync resumed from persisted layout");
        }

        let mut task = self.controller_task.lock().await;
        if task.is_some() {
            return Ok(());
        }

        let engine = self.clone();
        *task = Some(tokio::spawn(async move {
            loop {
                if let Err(err) = engine.tick().await {
                    tracing::warn!(?err, "controller tick failed");
                }
                if let Err(err) = persistence::persist(engine.ctx.as_ref()) {
                    tracing::warn!(?err, "periodic layout persist failed");
                }
                tokio::time::sleep(engine.ctx.config.async_thread_switch_time_slot).await;
            }
        }));
        Ok(())
    }

    /// Stops the controller loop and every active peer task, then
    /// hibernates the session (clears queues/stash/layout).
    pub async fn stop(&self) {
        if let Some(task) = self.controller_task.lock().await.take() {
            task.abort();
        }
        for (_, tasks) in self.peer_tasks.lock().await.drain() {
            tasks.headers.abort();
            tasks.bodies.abort();
        }
        self.controller.hibernate();
    }

    /// One controller quantum, exposed for callers that drive the engine
    /// from their own scheduler instead of `start`'s background loop.
    pub async fn tick(&self) -> Result<()> {
        self.controller.tick().await
    }

    pub fn ticker_stats(&self) -> TickerStats {
        TickerStats::collect(&self.ctx)
    }

    /// Registers a newly connected peer and spawns its header and body
    /// fetch loops.
    pub async fn add_peer(&self, id: H512, wire: Arc<W>) {
        let peer = self.ctx.peer(id);

        let headers = tokio::spawn(header_fetch::run(self.ctx.clone(), wire.clone(), peer.clone()));
        let bodies = tokio::spawn(body_fetch::run(self.ctx.clone(), wire, peer));

        self.peer_tasks.lock().await.insert(id, PeerTasks { headers, bodies });
    }

    /// Requests a peer's fetch loops stop at their next cooperative yield
    /// point and drops its task handles.
    pub async fn remove_peer(&self, id: H512) {
        if let Some(peer) = self.ctx.peers.read().get(&id).cloned() {
            peer.request_stop();
        }
        if let Some(tasks) = self.peer_tasks.lock().await.remove(&id) {
            tasks.headers.abort();
            tasks.bodies.abort();
        }
    }

    /// RPC ingress: the consensus layer publishing a new sync target.
    pub fn update_beacon_header_cb(&self, cons_head: Header, final_hash: H256) -> bool {
        self.controller.update_beacon_header_cb(cons_head, final_hash)
    }

    pub fn update_final_block_header(&self, finalised: u64, final_hash: H256) -> bool {
        self.controller.update_final_block_header(finalised, final_hash)
    }

    pub fn persist(&self) -> Result<()> {
        persistence::persist(self.ctx.as_ref())
    }
}
