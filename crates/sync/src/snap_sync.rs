use ethereum_types::{H256, U256};
use ethereum_storage::Database;
use ethereum_network::peer::PeerManager;
use std::sync::Arc;
use std::collections::{HashMap, HashSet};
use tokio::sync::mpsc;
use bytes::Bytes;

use crate::{Result, SyncError, SyncConfig};

pub struct SnapSync<D: Database> {
    db: Arc<D>,
    peer_manager: Arc<PeerManager>,
    config: SyncConfig,
    account_ranges: HashMap<H256, AccountRange>,
    storage_ranges: HashMap<H256, StorageRange>,
    bytecodes: HashMap<H256, Bytes>,
    missing_nodes: HashSet<H256>,
}

#[derive(Debug, Clone)]
struct AccountRange {
    start: H256,
    end: H256,
    accounts: Vec<Account>,
}

#[derive(Debug, Clone)]
struct Account {
    address: H256,
    nonce: U256,
    balance: U256,
    storage_root: H256,
    code_hash: H256,
}

#[derive(Debug, Clone)]
struct StorageRange {
    account: H256,
    start: H256,
    end: H256,
    slots: Vec<(H256, H256)>,
}

impl<D: Database + 'static> SnapSync<D> {
    pub fn new(
        db: Arc<D>,
        peer_manager: Arc<PeerManager>,
        config: SyncConfig,
    ) -> Self {
        Self {
            db,
            peer_manager,
            config,
            account_ranges: HashMap::new(),
            storage_ranges: HashMap::new(),
            bytecodes: HashMap::new(),
            missing_nodes: HashSet::new(),
        }
    }
    
    pub async fn download_accounts(
        &mut self,
        cancel_rx: &mut mpsc::Receiver<()>,
    ) -> Result<()> {
        tracing::info!("Starting account download");
        
        let mut start_hash = H256::zero();
        let end_hash = H256::from([0xff; 32]);
        
        while start_hash < end_hash {
            tokio::select! {
                _ = cancel_rx.recv() => {
                    return Err(SyncError::Cancelled);
                }
                _ = tokio::time::sleep(self.config.timeout) => {
                    // Request account range from peer
                    let range = self.request_account_range(
                        start_hash,
                        end_hash,
                        self.config.max_state_request
                    ).await?;
                    
                    if range.accounts.is_empty() {
                        break;
                    }
                    
                    // Store accounts
                    for account in &range.accounts {
                        self.store_account(account).await?;
                        
                        // Track storage roots and code hashes
                        if account.storage_root != H256::zero() {
                            self.missing_nodes.insert(account.storage_root);
                        }
                        if account.code_hash != H256::zero() {
                            self.missing_nodes.insert(account.code_hash);
                        }
                    }
                    
                    // Update start for next iteration
                    if let Some(last) = range.accounts.last() {
                        start_hash = last.address;
                    } else {
                        break;
                    }
                    
                    self.account_ranges.insert(range.start, range);
                }
            }
        }
        
        tracing::info!("Downloaded {} account ranges", self.account_ranges.len());
        
        Ok(())
    }
    
    pub async fn download_storage(
        &mut self,
        cancel_rx: &mut mpsc::Receiver<()>,
    ) -> Result<()> {
        tracing::info!("Starting storage download");
        
        for (_, account_range) in &self.account_ranges {
            for account in &account_range.accounts {
                if account.storage_root == H256::zero() {
                    continue;
                }
                
                let mut start_hash = H256::zero();
                let end_hash = H256::from([0xff; 32]);
                
                while start_hash < end_hash {
                    tokio::select! {
                        _ = cancel_rx.recv() => {
                            return Err(SyncError::Cancelled);
                        }
                        _ = tokio::time::sleep(tokio::time::Duration::from_millis(100)) => {
                            // Request storage range
                            let range = self.request_storage_range(
                                account.address,
                                start_hash,
                                end_hash,
                                self.config.max_state_request
                            ).await?;
                            
                            if range.slots.is_empty() {
                                break;
                            }
                            
                            // Store storage slots
                            for (key, value) in &range.slots {
                                self.store_storage_slot(&account.address, key, value).await?;
                            }
                            
                            // Update start for next iteration
                            if let Some((last_key, _)) = range.slots.last() {
                                start_hash = *last_key;
                            } else {
                                break;
                            }
                            
                            self.storage_ranges.insert(account.address, range);
                        }
                    }
                }
            }
        }
        
        tracing::info!("Downloaded {} storage ranges", self.storage_ranges.len());
        
        Ok(())
    }
    
    pub async fn download_bytecodes(
        &mut self,
        cancel_rx: &mut mpsc::Receiver<()>,
    ) -> Result<()> {
        tracing::info!("Starting bytecode download");
        
        let mut code_hashes = Vec::new();
        for (_, account_range) in &self.account_ranges {
            for account in &account_range.accounts {
                if account.code_hash != H256::zero() {
                    code_hashes.push(account.code_hash);
                }
            }
        }
        
        // Download bytecodes in batches
        for chunk in code_hashes.chunks(self.config.max_state_request) {
            tokio::select! {
                _ = cancel_rx.recv() => {
                    return Err(SyncError::Cancelled);
                }
                _ = tokio::time::sleep(tokio::time::Duration::from_millis(100)) => {
                    let bytecodes = self.request_bytecodes(chunk.to_vec()).await?;
                    
                    for (hash, code) in bytecodes {
                        self.store_bytecode(&hash, &code).await?;
                        self.bytecodes.insert(hash, code);
                    }
                }
            }
        }
        
        tracing::info!("Downloaded {} bytecodes", self.bytecodes.len());
        
        Ok(())
    }
    
    pub async fn heal_trie(
        &mut self,
        cancel_rx: &mut mpsc::Receiver<()>,
    ) -> Result<()> {
        tracing::info!("Starting trie healing");
        
        // Request missing trie nodes
        while !self.missing_nodes.is_empty() {
            let batch: Vec<_> = self.missing_nodes
                .iter()
                .take(self.config.max_state_request)
                .cloned()
                .collect();
            
            tokio::select! {
                _ = cancel_rx.recv() => {
                    return Err(SyncError::Cancelled);
                }
                _ = tokio::time::sleep(tokio::time::Duration::from_millis(100)) => {
                    let nodes = self.request_trie_nodes(batch.clone()).await?;
                    
                    for (hash, node_data) in nodes {
                        self.store_trie_node(&hash, &node_data).await?;
                        self.missing_nodes.remove(&hash);
                    }
                }
            }
        }
        
        tracing::info!("Trie healing completed");
        
        Ok(())
    }
    
    async fn request_account_range(
        &self,
        start: H256,
        end: H256,
        limit: usize,
    ) -> Result<AccountRange> {
        // In real implementation, would send GetAccountRange message to peer
        // For now, return mock data
        
        Ok(AccountRange {
            start,
            end,
            accounts: vec![],
        })
    }
    
    async fn request_storage_range(
        &self,
        account: H256,
        start: H256,
        end: H256,
        limit: usize,
    ) -> Result<StorageRange> {
        // In real implementation, would send GetStorageRanges message to peer
        
        Ok(StorageRange {
            account,
            start,
            end,
            slots: vec![],
        })
    }
    
    async fn request_bytecodes(&self, hashes: Vec<H256>) -> Result<Vec<(H256, Bytes)>> {
        // In real implementation, would send GetByteCodes message to peer
        
        Ok(vec![])
    }
    
    async fn request_trie_nodes(&self, hashes: Vec<H256>) -> Result<Vec<(H256, Vec<u8>)>> {
        // In real implementation, would send GetTrieNodes message to peer
        
        Ok(vec![])
    }
    
    async fn store_account(&self, account: &Account) -> Result<()> {
        let key = format!("account:{}", hex::encode(account.address));
        self.db.put(
            key.as_bytes(),
            &bincode::serialize(account).unwrap(),
        )?;
        
        Ok(())
    }
    
    async fn store_storage_slot(
        &self,
        account: &H256,
        key: &H256,
        value: &H256,
    ) -> Result<()> {
        let storage_key = format!(
            "storage:{}:{}",
            hex::encode(account),
            hex::encode(key)
        );
        self.db.put(storage_key.as_bytes(), value.as_bytes())?;
        
        Ok(())
    }
    
    async fn store_bytecode(&self, hash: &H256, code: &Bytes) -> Result<()> {
        let key = format!("code:{}", hex::encode(hash));
        self.db.put(key.as_bytes(), code)?;
        
        Ok(())
    }
    
    async fn store_trie_node(&self, hash: &H256, data: &[u8]) -> Result<()> {
        let key = format!("trie:{}", hex::encode(hash));
        self.db.put(key.as_bytes(), data)?;
        
        Ok(())
    }
}