use crate::{Result, RpcError};

pub struct NetApi {
    network_id: u64,
    peer_count: std::sync::Arc<std::sync::atomic::AtomicUsize>,
}

impl NetApi {
    pub fn new(network_id: u64) -> Self {
        Self {
            network_id,
            peer_count: std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0)),
        }
    }
    
    pub async fn version(&self) -> Result<String> {
        // Return network ID as string
        Ok(self.network_id.to_string())
    }
    
    pub async fn peer_count(&self) -> Result<String> {
        // Return current peer count as hex string
        let count = self.peer_count.load(std::sync::atomic::Ordering::Relaxed);
        Ok(format!("0x{:x}", count))
    }
    
    pub async fn listening(&self) -> Result<bool> {
        // Check if P2P server is listening
        // This would check actual server state
        Ok(true)
    }
    
    pub fn update_peer_count(&self, count: usize) {
        self.peer_count.store(count, std::sync::atomic::Ordering::Relaxed);
    }
}