use ethereum_types::{H256, U256};
use ethereum_core::{Block, Header};
use ethereum_storage::Database;
use ethereum_network::peer::PeerManager;
use ethereum_trie::PatriciaTrie;
use std::sync::Arc;
use std::collections::{HashMap, VecDeque};
use tokio::sync::mpsc;

use crate::{Result, SyncError, SyncConfig};

pub struct FastSync<D: Database> {
    db: Arc<D>,
    peer_manager: Arc<PeerManager>,
    config: SyncConfig,
    headers: VecDeque<Header>,
    pivot_block: Option<U256>,
}

impl<D: Database + 'static> FastSync<D> {
    pub fn new(
        db: Arc<D>,
        peer_manager: Arc<PeerManager>,
        config: SyncConfig,
    ) -> Self {
        Self {
            db,
            peer_manager,
            config,
            headers: VecDeque::new(),
            pivot_block: None,
        }
    }
    
    pub async fn download_headers(
        &self,
        cancel_rx: &mut mpsc::Receiver<()>,
    ) -> Result<Header> {
        tracing::info!("Starting header download");
        
        // Get best peer
        let peers = self.peer_manager.get_all_peers().await;
        if peers.is_empty() {
            return Err(SyncError::NoPeers);
        }
        
        let best_peer = &peers[0];
        
        // Request headers from genesis to head
        let mut current_number = U256::zero();
        let mut headers = Vec::new();
        
        loop {
            tokio::select! {
                _ = cancel_rx.recv() => {
                    return Err(SyncError::Cancelled);
                }
                _ = tokio::time::sleep(self.config.timeout) => {
                    // Request next batch of headers
                    let batch_size = self.config.max_header_request;
                    
                    // In real implementation, would send GetBlockHeaders message
                    // and receive BlockHeaders response
                    
                    // For now, simulate receiving headers
                    if current_number > U256::from(1000) {
                        break;
                    }
                    
                    for i in 0..batch_size {
                        let header = Header {
                            parent_hash: if current_number == U256::zero() {
                                H256::zero()
                            } else {
                                headers.last().map(|h: &Header| h.hash()).unwrap_or(H256::zero())
                            },
                            number: current_number,
                            gas_limit: U256::from(8_000_000),
                            gas_used: U256::zero(),
                            timestamp: 0,
                            ..Default::default()
                        };
                        
                        headers.push(header);
                        current_number = current_number + U256::one();
                    }
                }
            }
        }
        
        // Select pivot block (usually 64 blocks behind head for safety)
        let pivot_index = headers.len().saturating_sub(64);
        let pivot_header = headers[pivot_index].clone();
        
        self.store_headers(headers).await?;
        
        tracing::info!("Downloaded {} headers, pivot at {}", 
            current_number, pivot_header.number);
        
        Ok(pivot_header)
    }
    
    pub async fn download_state(
        &self,
        pivot_header: &Header,
        cancel_rx: &mut mpsc::Receiver<()>,
    ) -> Result<()> {
        tracing::info!("Downloading state at block {}", pivot_header.number);
        
        // In real implementation, would download state trie nodes
        // using GetNodeData or snap sync protocol
        
        let mut state_trie = PatriciaTrie::new(self.db.clone());
        
        // Download account states
        let accounts = self.download_accounts(pivot_header, cancel_rx).await?;
        
        for (address, account) in accounts {
            // Store account in state trie
            state_trie.insert(&address, account).await?;
        }
        
        // Commit state trie
        let state_root = state_trie.commit().await?;
        
        if state_root != pivot_header.state_root {
            return Err(SyncError::InvalidState(
                "State root mismatch".to_string()
            ));
        }
        
        tracing::info!("State download completed");
        
        Ok(())
    }
    
    pub async fn download_blocks(
        &self,
        cancel_rx: &mut mpsc::Receiver<()>,
    ) -> Result<()> {
        tracing::info!("Downloading block bodies and receipts");
        
        // Download block bodies and receipts in parallel
        let mut block_bodies = HashMap::new();
        let mut receipts = HashMap::new();
        
        // In real implementation, would send GetBlockBodies and GetReceipts
        
        for header in &self.headers {
            tokio::select! {
                _ = cancel_rx.recv() => {
                    return Err(SyncError::Cancelled);
                }
                _ = tokio::time::sleep(tokio::time::Duration::from_millis(10)) => {
                    // Simulate downloading body and receipts
                    block_bodies.insert(header.hash(), vec![]);
                    receipts.insert(header.hash(), vec![]);
                }
            }
        }
        
        // Store blocks
        for header in &self.headers {
            let hash = header.hash();
            
            if let Some(body) = block_bodies.get(&hash) {
                self.store_block(header.clone(), body.clone()).await?;
            }
            
            if let Some(receipt_list) = receipts.get(&hash) {
                self.store_receipts(&hash, receipt_list.clone()).await?;
            }
        }
        
        tracing::info!("Block download completed");
        
        Ok(())
    }
    
    async fn download_accounts(
        &self,
        pivot_header: &Header,
        _cancel_rx: &mut mpsc::Receiver<()>,
    ) -> Result<HashMap<Vec<u8>, Vec<u8>>> {
        // In real implementation, would download accounts from peers
        // using GetAccountRange (snap sync) or GetNodeData
        
        let accounts = HashMap::new();
        
        Ok(accounts)
    }
    
    async fn store_headers(&self, headers: Vec<Header>) -> Result<()> {
        for header in headers {
            let key = format!("header:{}", hex::encode(header.hash()));
            self.db.put(
                key.as_bytes(),
                &bincode::serialize(&header).unwrap(),
            )?;
        }
        
        Ok(())
    }
    
    async fn store_block(&self, header: Header, body: Vec<u8>) -> Result<()> {
        let hash = header.hash();
        
        // Store header
        let header_key = format!("header:{}", hex::encode(hash));
        self.db.put(
            header_key.as_bytes(),
            &bincode::serialize(&header).unwrap(),
        )?;
        
        // Store body
        let body_key = format!("body:{}", hex::encode(hash));
        self.db.put(body_key.as_bytes(), &body)?;
        
        // Update block number index
        let number_key = format!("number:{}", header.number);
        self.db.put(number_key.as_bytes(), hash.as_bytes())?;
        
        Ok(())
    }
    
    async fn store_receipts(&self, block_hash: &H256, receipts: Vec<u8>) -> Result<()> {
        let key = format!("receipts:{}", hex::encode(block_hash));
        self.db.put(key.as_bytes(), &receipts)?;
        
        Ok(())
    }
}