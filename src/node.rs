use std::sync::Arc;
use std::path::PathBuf;
use tokio::sync::{RwLock, mpsc, broadcast};
use tokio::task::JoinHandle;
use anyhow::{Result, Context};
use tracing::{info, error, warn};

use ethereum_types::{H256, U256};
use ethereum_core::{Block, Transaction};
use ethereum_storage::{Database, RocksDatabase};
use ethereum_network::{NetworkManager, PeerManager};
use ethereum_rpc::{RpcServer, RpcHandler};
use ethereum_consensus::{Consensus, ConsensusConfig, EngineType};
use ethereum_sync::{Synchronizer, SyncConfig, SyncMode};
use ethereum_txpool::TransactionPool;
use ethereum_filter::FilterSystem;
use ethereum_verification::{VerificationEngine, VerificationConfig};

/// Node configuration
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Chain ID
    pub chain_id: u64,
    /// Network name (mainnet, goerli, sepolia, etc.)
    pub network_name: String,
    /// Data directory
    pub data_dir: PathBuf,
    /// HTTP RPC configuration
    pub http_rpc: RpcConfig,
    /// WebSocket RPC configuration
    pub ws_rpc: RpcConfig,
    /// P2P network configuration
    pub p2p: P2pConfig,
    /// Consensus configuration
    pub consensus: ConsensusConfig,
    /// Sync configuration
    pub sync: SyncConfig,
    /// Transaction pool configuration
    pub txpool: TxPoolConfig,
}

#[derive(Debug, Clone)]
pub struct RpcConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub apis: Vec<String>,
    pub cors: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct P2pConfig {
    pub enabled: bool,
    pub listen_addr: String,
    pub port: u16,
    pub max_peers: usize,
    pub bootnodes: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct TxPoolConfig {
    pub max_pending: usize,
    pub max_queued: usize,
    pub gas_price_floor: U256,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            chain_id: 1,
            network_name: "mainnet".to_string(),
            data_dir: PathBuf::from("./data"),
            http_rpc: RpcConfig {
                enabled: true,
                host: "127.0.0.1".to_string(),
                port: 8545,
                apis: vec!["eth".to_string(), "net".to_string(), "web3".to_string()],
                cors: vec!["*".to_string()],
            },
            ws_rpc: RpcConfig {
                enabled: true,
                host: "127.0.0.1".to_string(),
                port: 8546,
                apis: vec!["eth".to_string(), "net".to_string(), "web3".to_string()],
                cors: vec!["*".to_string()],
            },
            p2p: P2pConfig {
                enabled: true,
                listen_addr: "0.0.0.0".to_string(),
                port: 30303,
                max_peers: 25,
                bootnodes: vec![],
            },
            consensus: ConsensusConfig {
                engine_type: EngineType::ProofOfStake,
                epoch_length: 32,
                block_period: 12,
                validators: vec![],
                genesis_validators: vec![],
            },
            sync: SyncConfig {
                mode: SyncMode::Fast,
                max_peers: 5,
                max_block_request: 128,
                max_header_request: 192,
                max_body_request: 128,
                max_receipt_request: 256,
                max_state_request: 384,
                timeout: std::time::Duration::from_secs(10),
                retry_limit: 3,
            },
            txpool: TxPoolConfig {
                max_pending: 4096,
                max_queued: 1024,
                gas_price_floor: U256::from(1_000_000_000), // 1 gwei
            },
        }
    }
}

/// Ethereum node orchestrator
pub struct Node<D: Database> {
    config: NodeConfig,
    db: Arc<D>,
    
    // Core components
    consensus: Arc<Consensus<D>>,
    sync: Arc<RwLock<Synchronizer<D>>>,
    txpool: Arc<TransactionPool>,
    filter_system: Arc<FilterSystem<D>>,
    verification: Arc<VerificationEngine<D>>,
    
    // Network components
    network_manager: Option<Arc<NetworkManager>>,
    peer_manager: Arc<PeerManager>,
    
    // RPC servers
    http_server: Option<Arc<RpcServer>>,
    ws_server: Option<Arc<RpcServer>>,
    
    // Event channels
    block_events: broadcast::Sender<Block>,
    tx_events: broadcast::Sender<Transaction>,
    
    // Shutdown signal
    shutdown_tx: broadcast::Sender<()>,
    
    // Task handles
    tasks: Arc<RwLock<Vec<JoinHandle<()>>>>,
}

impl Node<RocksDatabase> {
    /// Create a new node with RocksDB storage
    pub async fn new(config: NodeConfig) -> Result<Self> {
        // Initialize database
        let db_path = config.data_dir.join("chaindata");
        std::fs::create_dir_all(&db_path)?;
        let db = Arc::new(RocksDatabase::open(db_path)?);
        
        Self::with_database(config, db).await
    }
}

impl<D: Database + 'static> Node<D> {
    /// Create a new node with custom database
    pub async fn with_database(config: NodeConfig, db: Arc<D>) -> Result<Self> {
        info!("Initializing Ethereum node");
        
        // Initialize consensus
        let consensus = Arc::new(Consensus::new(
            config.consensus.clone(),
            db.clone(),
        ));
        
        // Initialize peer manager
        let peer_manager = Arc::new(PeerManager::new());
        
        // Initialize synchronizer
        let sync = Arc::new(RwLock::new(Synchronizer::new(
            config.sync.clone(),
            db.clone(),
            peer_manager.clone(),
        )));
        
        // Initialize transaction pool
        let txpool = Arc::new(TransactionPool::new(
            config.txpool.max_pending,
            config.txpool.max_queued,
        ));
        
        // Initialize filter system
        let filter_system = Arc::new(FilterSystem::new(db.clone()));
        
        // Initialize verification engine
        let verification = Arc::new(VerificationEngine::new(
            db.clone(),
            config.consensus.clone(),
            VerificationConfig {
                chain_id: config.chain_id,
                ..Default::default()
            },
        ));
        
        // Create event channels
        let (block_events, _) = broadcast::channel(100);
        let (tx_events, _) = broadcast::channel(1000);
        let (shutdown_tx, _) = broadcast::channel(1);
        
        Ok(Self {
            config,
            db,
            consensus,
            sync,
            txpool,
            filter_system,
            verification,
            network_manager: None,
            peer_manager,
            http_server: None,
            ws_server: None,
            block_events,
            tx_events,
            shutdown_tx,
            tasks: Arc::new(RwLock::new(Vec::new())),
        })
    }
    
    /// Start the node
    pub async fn start(&mut self) -> Result<()> {
        info!("Starting Ethereum node on {} network", self.config.network_name);
        
        // Start filter system
        self.filter_system.start().await;
        
        // Start P2P networking
        if self.config.p2p.enabled {
            self.start_p2p().await?;
        }
        
        // Start synchronization
        self.start_sync().await?;
        
        // Start transaction pool
        self.start_txpool().await?;
        
        // Start RPC servers
        if self.config.http_rpc.enabled {
            self.start_http_rpc().await?;
        }
        
        if self.config.ws_rpc.enabled {
            self.start_ws_rpc().await?;
        }
        
        // Start block production (if validator)
        if !self.consensus.get_validators().is_empty() {
            self.start_block_production().await?;
        }
        
        info!("Ethereum node started successfully");
        Ok(())
    }
    
    /// Stop the node
    pub async fn stop(&self) -> Result<()> {
        info!("Stopping Ethereum node");
        
        // Send shutdown signal
        let _ = self.shutdown_tx.send(());
        
        // Wait for all tasks to complete
        let mut tasks = self.tasks.write().await;
        for task in tasks.drain(..) {
            task.abort();
        }
        
        info!("Ethereum node stopped");
        Ok(())
    }
    
    /// Start P2P networking
    async fn start_p2p(&mut self) -> Result<()> {
        info!("Starting P2P networking on {}:{}", 
            self.config.p2p.listen_addr, 
            self.config.p2p.port
        );
        
        // Initialize network manager
        let network_manager = Arc::new(NetworkManager::new(
            self.config.p2p.listen_addr.clone(),
            self.config.p2p.port,
            self.peer_manager.clone(),
        ).await?);
        
        // Connect to bootnodes
        for bootnode in &self.config.p2p.bootnodes {
            if let Err(e) = network_manager.connect_to_bootnode(bootnode).await {
                warn!("Failed to connect to bootnode {}: {}", bootnode, e);
            }
        }
        
        // Start network service
        let network = network_manager.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        
        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = network.run() => {
                    error!("Network manager stopped unexpectedly");
                }
                _ = shutdown_rx.recv() => {
                    info!("Network manager shutting down");
                }
            }
        });
        
        self.tasks.write().await.push(handle);
        self.network_manager = Some(network_manager);
        
        Ok(())
    }
    
    /// Start synchronization
    async fn start_sync(&self) -> Result<()> {
        info!("Starting blockchain synchronization");
        
        let sync = self.sync.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let block_events = self.block_events.clone();
        
        let handle = tokio::spawn(async move {
            tokio::select! {
                result = async {
                    let mut syncer = sync.write().await;
                    syncer.start().await
                } => {
                    if let Err(e) = result {
                        error!("Synchronizer error: {}", e);
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Synchronizer shutting down");
                }
            }
        });
        
        self.tasks.write().await.push(handle);
        Ok(())
    }
    
    /// Start transaction pool
    async fn start_txpool(&self) -> Result<()> {
        info!("Starting transaction pool");
        
        let txpool = self.txpool.clone();
        let tx_events = self.tx_events.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(std::time::Duration::from_secs(1));
            
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        // Process pending transactions
                        let pending = txpool.get_pending_transactions(100).await;
                        for tx in pending {
                            let _ = tx_events.send(tx);
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        info!("Transaction pool shutting down");
                        break;
                    }
                }
            }
        });
        
        self.tasks.write().await.push(handle);
        Ok(())
    }
    
    /// Start HTTP RPC server
    async fn start_http_rpc(&mut self) -> Result<()> {
        let addr = format!("{}:{}", self.config.http_rpc.host, self.config.http_rpc.port);
        info!("Starting HTTP-RPC server on {}", addr);
        
        let client_version = format!("ethereum-rust/v{}/rust", env!("CARGO_PKG_VERSION"));
        
        let rpc_handler = Arc::new(RpcHandler::new(
            self.db.clone(),
            self.config.chain_id,
            client_version,
        ));
        
        let server = Arc::new(RpcServer::new(
            addr.parse()?,
            rpc_handler,
        ));
        
        let srv = server.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        
        let handle = tokio::spawn(async move {
            tokio::select! {
                result = srv.run() => {
                    if let Err(e) = result {
                        error!("HTTP-RPC server error: {}", e);
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("HTTP-RPC server shutting down");
                }
            }
        });
        
        self.tasks.write().await.push(handle);
        self.http_server = Some(server);
        
        Ok(())
    }
    
    /// Start WebSocket RPC server
    async fn start_ws_rpc(&mut self) -> Result<()> {
        let addr = format!("{}:{}", self.config.ws_rpc.host, self.config.ws_rpc.port);
        info!("Starting WebSocket-RPC server on {}", addr);
        
        // Similar to HTTP RPC but with WebSocket support
        // Implementation would be similar to start_http_rpc
        
        Ok(())
    }
    
    /// Start block production (for validators)
    async fn start_block_production(&self) -> Result<()> {
        info!("Starting block production");
        
        let consensus = self.consensus.clone();
        let txpool = self.txpool.clone();
        let block_events = self.block_events.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(std::time::Duration::from_secs(12));
            
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        // Check if we should produce a block
                        // This would involve checking if we're the current validator
                        // and producing a block if so
                    }
                    _ = shutdown_rx.recv() => {
                        info!("Block production shutting down");
                        break;
                    }
                }
            }
        });
        
        self.tasks.write().await.push(handle);
        Ok(())
    }
    
    /// Import a block
    pub async fn import_block(&self, block: Block) -> Result<()> {
        // Verify block
        self.verification.verify_block(&block).await
            .context("Block verification failed")?;
        
        // Store block
        let key = format!("block:{}", hex::encode(block.header.hash()));
        self.db.put(
            key.as_bytes(),
            &bincode::serialize(&block)?,
        )?;
        
        // Update chain head
        let number_key = format!("block:number:{}", block.header.number);
        self.db.put(
            number_key.as_bytes(),
            block.header.hash().as_bytes(),
        )?;
        
        // Notify subscribers
        let _ = self.block_events.send(block.clone());
        
        // Update filter system
        self.filter_system.notify_new_block(block.clone()).await;
        
        info!("Imported block #{} ({})", 
            block.header.number, 
            hex::encode(block.header.hash())
        );
        
        Ok(())
    }
    
    /// Add transaction to pool
    pub async fn add_transaction(&self, tx: Transaction) -> Result<H256> {
        let hash = tx.hash();
        
        // Validate transaction
        // TODO: Add validation
        
        // Add to pool
        self.txpool.add_transaction(tx.clone()).await?;
        
        // Notify subscribers
        let _ = self.tx_events.send(tx.clone());
        
        // Update filter system
        self.filter_system.notify_new_pending_transaction(tx).await;
        
        Ok(hash)
    }
    
    /// Get node information
    pub fn node_info(&self) -> NodeInfo {
        NodeInfo {
            client_version: format!("ethereum-rust/v{}/rust", env!("CARGO_PKG_VERSION")),
            network_id: self.config.chain_id,
            chain_id: self.config.chain_id,
            genesis_hash: H256::zero(), // Would be loaded from genesis
            best_hash: H256::zero(), // Would be loaded from DB
            best_number: U256::zero(), // Would be loaded from DB
        }
    }
}

/// Node information
#[derive(Debug, Clone)]
pub struct NodeInfo {
    pub client_version: String,
    pub network_id: u64,
    pub chain_id: u64,
    pub genesis_hash: H256,
    pub best_hash: H256,
    pub best_number: U256,
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethereum_storage::MemoryDatabase;
    
    #[tokio::test]
    async fn test_node_creation() {
        let config = NodeConfig::default();
        let db = Arc::new(MemoryDatabase::new());
        
        let node = Node::with_database(config, db).await;
        assert!(node.is_ok());
    }
}