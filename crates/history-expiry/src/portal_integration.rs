use ethereum_types::{H256, U256};
use ethereum_core::Block;
use std::sync::{Arc, RwLock};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{info, debug, warn};
use async_trait::async_trait;
use discv5::{Discv5, Discv5Config, Enr, enr::CombinedKey};

use crate::{Result, HistoryExpiryError};

/// Portal Network client for distributing historical data
pub struct PortalNetworkClient {
    discovery: Arc<Discv5>,
    history_network: Arc<HistoryNetwork>,
    distribution_strategy: DistributionStrategy,
    metrics: Arc<PortalMetrics>,
}

#[derive(Debug, Clone)]
pub enum DistributionStrategy {
    /// Broadcast to all known nodes
    Broadcast,
    /// Distribute to specific radius
    Radius { target_radius: U256 },
    /// Distribute based on content ID
    ContentAddressed,
    /// Redundant distribution for reliability
    Redundant { replication_factor: usize },
}

/// History network implementation
pub struct HistoryNetwork {
    content_store: Arc<RwLock<ContentStore>>,
    routing_table: Arc<RwLock<RoutingTable>>,
    active_transfers: Arc<RwLock<HashMap<H256, Transfer>>>,
}

struct ContentStore {
    blocks: HashMap<H256, Block>,
    headers: HashMap<H256, BlockHeader>,
    receipts: HashMap<H256, Vec<Receipt>>,
    max_size: usize,
}

struct RoutingTable {
    nodes: Vec<NodeInfo>,
    content_radius: U256,
}

#[derive(Debug, Clone)]
struct NodeInfo {
    node_id: H256,
    enr: Enr<CombinedKey>,
    radius: U256,
    last_seen: std::time::Instant,
}

struct Transfer {
    content_id: H256,
    target_nodes: Vec<H256>,
    started_at: std::time::Instant,
    bytes_transferred: u64,
    status: TransferStatus,
}

#[derive(Debug, Clone)]
enum TransferStatus {
    Pending,
    InProgress,
    Completed,
    Failed(String),
}

struct PortalMetrics {
    blocks_distributed: std::sync::atomic::AtomicU64,
    bytes_transferred: std::sync::atomic::AtomicU64,
    distribution_failures: std::sync::atomic::AtomicU64,
    active_peers: std::sync::atomic::AtomicU64,
}

impl PortalNetworkClient {
    pub async fn new(
        listen_addr: String,
        boot_nodes: Vec<String>,
        distribution_strategy: DistributionStrategy,
    ) -> Result<Self> {
        // Initialize discovery
        let config = Discv5Config::default();
        let enr_key = CombinedKey::generate_secp256k1();
        let enr = Enr::builder()
            .ip4(std::net::Ipv4Addr::new(0, 0, 0, 0))
            .tcp4(9000)
            .build(&enr_key)
            .map_err(|e| HistoryExpiryError::PortalNetworkError(format!("Failed to build ENR: {}", e)))?;

        let discovery = Discv5::new(enr, enr_key, config)
            .map_err(|e| HistoryExpiryError::PortalNetworkError(format!("Failed to create discovery: {}", e)))?;

        // Start discovery
        discovery.start()
            .await
            .map_err(|e| HistoryExpiryError::PortalNetworkError(format!("Failed to start discovery: {}", e)))?;

        // Add boot nodes
        for boot_node in boot_nodes {
            if let Ok(enr) = boot_node.parse::<Enr<CombinedKey>>() {
                discovery.add_enr(enr)
                    .map_err(|e| HistoryExpiryError::PortalNetworkError(format!("Failed to add boot node: {}", e)))?;
            }
        }

        let history_network = Arc::new(HistoryNetwork::new());

        Ok(Self {
            discovery: Arc::new(discovery),
            history_network,
            distribution_strategy,
            metrics: Arc::new(PortalMetrics::new()),
        })
    }

    /// Distribute a block to the Portal Network
    pub async fn distribute_block(&self, block: Block) -> Result<()> {
        let content_id = self.calculate_content_id(&block);
        
        info!("Distributing block {} to Portal Network", block.header.number);

        // Store locally first
        self.history_network.store_block(block.clone())?;

        // Find target nodes based on strategy
        let target_nodes = self.find_target_nodes(&content_id).await?;

        if target_nodes.is_empty() {
            warn!("No target nodes found for distribution");
            return Ok(());
        }

        // Start transfer
        let transfer = Transfer {
            content_id,
            target_nodes: target_nodes.clone(),
            started_at: std::time::Instant::now(),
            bytes_transferred: 0,
            status: TransferStatus::Pending,
        };

        self.history_network.register_transfer(content_id, transfer)?;

        // Distribute to target nodes
        let mut success_count = 0;
        let block_data = bincode::serialize(&block)
            .map_err(|e| HistoryExpiryError::PortalNetworkError(format!("Serialization failed: {}", e)))?;

        for node_id in target_nodes {
            match self.send_to_node(node_id, content_id, &block_data).await {
                Ok(_) => {
                    success_count += 1;
                    self.metrics.bytes_transferred.fetch_add(
                        block_data.len() as u64,
                        std::sync::atomic::Ordering::Relaxed,
                    );
                }
                Err(e) => {
                    warn!("Failed to send to node {}: {}", node_id, e);
                    self.metrics.distribution_failures.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                }
            }
        }

        if success_count > 0 {
            self.metrics.blocks_distributed.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            self.history_network.mark_transfer_complete(content_id)?;
            info!("Successfully distributed block to {}/{} nodes", success_count, target_nodes.len());
        } else {
            self.history_network.mark_transfer_failed(content_id, "No successful transfers".to_string())?;
            return Err(HistoryExpiryError::PortalNetworkError("Distribution failed".into()));
        }

        Ok(())
    }

    /// Calculate content ID for a block
    fn calculate_content_id(&self, block: &Block) -> H256 {
        H256::from_slice(&ethereum_crypto::keccak256(&block.header.hash().as_bytes()))
    }

    /// Find target nodes for distribution
    async fn find_target_nodes(&self, content_id: &H256) -> Result<Vec<H256>> {
        match &self.distribution_strategy {
            DistributionStrategy::Broadcast => {
                self.find_all_nodes().await
            }
            DistributionStrategy::Radius { target_radius } => {
                self.find_nodes_in_radius(content_id, target_radius).await
            }
            DistributionStrategy::ContentAddressed => {
                self.find_closest_nodes(content_id, 16).await
            }
            DistributionStrategy::Redundant { replication_factor } => {
                self.find_closest_nodes(content_id, *replication_factor).await
            }
        }
    }

    /// Find all known nodes
    async fn find_all_nodes(&self) -> Result<Vec<H256>> {
        let routing_table = self.history_network.routing_table.read().unwrap();
        Ok(routing_table.nodes.iter().map(|n| n.node_id).collect())
    }

    /// Find nodes within a specific radius
    async fn find_nodes_in_radius(&self, content_id: &H256, target_radius: &U256) -> Result<Vec<H256>> {
        let routing_table = self.history_network.routing_table.read().unwrap();
        
        let nodes: Vec<H256> = routing_table.nodes
            .iter()
            .filter(|n| {
                let distance = self.calculate_distance(&n.node_id, content_id);
                distance <= *target_radius
            })
            .map(|n| n.node_id)
            .collect();

        Ok(nodes)
    }

    /// Find closest nodes to content ID
    async fn find_closest_nodes(&self, content_id: &H256, count: usize) -> Result<Vec<H256>> {
        let routing_table = self.history_network.routing_table.read().unwrap();
        
        let mut nodes_with_distance: Vec<(H256, U256)> = routing_table.nodes
            .iter()
            .map(|n| {
                let distance = self.calculate_distance(&n.node_id, content_id);
                (n.node_id, distance)
            })
            .collect();

        nodes_with_distance.sort_by_key(|&(_, distance)| distance);
        
        Ok(nodes_with_distance
            .into_iter()
            .take(count)
            .map(|(node_id, _)| node_id)
            .collect())
    }

    /// Calculate XOR distance between two node IDs
    fn calculate_distance(&self, a: &H256, b: &H256) -> U256 {
        let mut result = [0u8; 32];
        for i in 0..32 {
            result[i] = a.as_bytes()[i] ^ b.as_bytes()[i];
        }
        U256::from_big_endian(&result)
    }

    /// Send content to a specific node
    async fn send_to_node(&self, node_id: H256, content_id: H256, data: &[u8]) -> Result<()> {
        // In production, this would use the Portal Network protocol
        // For now, simulate the transfer
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
        
        debug!("Sent {} bytes to node {}", data.len(), node_id);
        Ok(())
    }

    /// Retrieve block from Portal Network
    pub async fn retrieve_block(&self, block_hash: H256) -> Result<Option<Block>> {
        let content_id = H256::from_slice(&ethereum_crypto::keccak256(block_hash.as_bytes()));
        
        // Check local store first
        if let Some(block) = self.history_network.get_block(&content_id)? {
            return Ok(Some(block));
        }

        // Query network
        let closest_nodes = self.find_closest_nodes(&content_id, 8).await?;
        
        for node_id in closest_nodes {
            match self.query_node(node_id, content_id).await {
                Ok(Some(data)) => {
                    let block: Block = bincode::deserialize(&data)
                        .map_err(|e| HistoryExpiryError::RetrievalError(format!("Deserialization failed: {}", e)))?;
                    
                    // Cache locally
                    self.history_network.store_block(block.clone())?;
                    
                    return Ok(Some(block));
                }
                Ok(None) => continue,
                Err(e) => {
                    debug!("Failed to query node {}: {}", node_id, e);
                    continue;
                }
            }
        }

        Ok(None)
    }

    /// Query a node for content
    async fn query_node(&self, node_id: H256, content_id: H256) -> Result<Option<Vec<u8>>> {
        // In production, this would use the Portal Network protocol
        // For now, simulate the query
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        
        // Simulate 50% success rate for demo
        if rand::random::<bool>() {
            Ok(Some(vec![0u8; 1000])) // Mock data
        } else {
            Ok(None)
        }
    }

    /// Get Portal Network statistics
    pub fn get_stats(&self) -> PortalStats {
        let routing_table = self.history_network.routing_table.read().unwrap();
        let active_transfers = self.history_network.active_transfers.read().unwrap();
        
        PortalStats {
            connected_peers: routing_table.nodes.len(),
            blocks_distributed: self.metrics.blocks_distributed.load(std::sync::atomic::Ordering::Relaxed),
            bytes_transferred: self.metrics.bytes_transferred.load(std::sync::atomic::Ordering::Relaxed),
            distribution_failures: self.metrics.distribution_failures.load(std::sync::atomic::Ordering::Relaxed),
            active_transfers: active_transfers.len(),
            content_radius: routing_table.content_radius,
        }
    }
}

impl HistoryNetwork {
    fn new() -> Self {
        Self {
            content_store: Arc::new(RwLock::new(ContentStore {
                blocks: HashMap::new(),
                headers: HashMap::new(),
                receipts: HashMap::new(),
                max_size: 10000,
            })),
            routing_table: Arc::new(RwLock::new(RoutingTable {
                nodes: Vec::new(),
                content_radius: U256::max_value(),
            })),
            active_transfers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn store_block(&self, block: Block) -> Result<()> {
        let mut store = self.content_store.write().unwrap();
        let block_hash = block.header.hash();
        
        // Clean if needed
        if store.blocks.len() >= store.max_size {
            let oldest = store.blocks.keys().next().cloned();
            if let Some(key) = oldest {
                store.blocks.remove(&key);
            }
        }
        
        store.blocks.insert(block_hash, block);
        Ok(())
    }

    fn get_block(&self, content_id: &H256) -> Result<Option<Block>> {
        let store = self.content_store.read().unwrap();
        Ok(store.blocks.get(content_id).cloned())
    }

    fn register_transfer(&self, content_id: H256, transfer: Transfer) -> Result<()> {
        let mut transfers = self.active_transfers.write().unwrap();
        transfers.insert(content_id, transfer);
        Ok(())
    }

    fn mark_transfer_complete(&self, content_id: H256) -> Result<()> {
        let mut transfers = self.active_transfers.write().unwrap();
        if let Some(transfer) = transfers.get_mut(&content_id) {
            transfer.status = TransferStatus::Completed;
        }
        Ok(())
    }

    fn mark_transfer_failed(&self, content_id: H256, reason: String) -> Result<()> {
        let mut transfers = self.active_transfers.write().unwrap();
        if let Some(transfer) = transfers.get_mut(&content_id) {
            transfer.status = TransferStatus::Failed(reason);
        }
        Ok(())
    }
}

impl PortalMetrics {
    fn new() -> Self {
        Self {
            blocks_distributed: std::sync::atomic::AtomicU64::new(0),
            bytes_transferred: std::sync::atomic::AtomicU64::new(0),
            distribution_failures: std::sync::atomic::AtomicU64::new(0),
            active_peers: std::sync::atomic::AtomicU64::new(0),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PortalStats {
    pub connected_peers: usize,
    pub blocks_distributed: u64,
    pub bytes_transferred: u64,
    pub distribution_failures: u64,
    pub active_transfers: usize,
    pub content_radius: U256,
}

/// History distribution configuration
#[derive(Debug, Clone)]
pub struct HistoryDistribution {
    pub strategy: DistributionStrategy,
    pub batch_size: usize,
    pub parallel_transfers: usize,
    pub retry_attempts: usize,
}

impl Default for HistoryDistribution {
    fn default() -> Self {
        Self {
            strategy: DistributionStrategy::ContentAddressed,
            batch_size: 100,
            parallel_transfers: 8,
            retry_attempts: 3,
        }
    }
}

// Placeholder types for compilation
type BlockHeader = ethereum_core::Header;
type Receipt = Vec<u8>;