use ethereum_types::{H256, U256};
use ethereum_storage::Database;
use ethereum_trie::{PatriciaTrie, MerkleProof};
use std::sync::Arc;
use std::collections::{HashMap, VecDeque};

use crate::{Result, SyncError};

pub struct StateSync<D: Database> {
    db: Arc<D>,
    state_trie: PatriciaTrie<D>,
    pending_nodes: VecDeque<H256>,
    downloaded_nodes: HashMap<H256, Vec<u8>>,
}

impl<D: Database + 'static> StateSync<D> {
    pub fn new(db: Arc<D>) -> Self {
        let state_trie = PatriciaTrie::new(db.clone());
        
        Self {
            db,
            state_trie,
            pending_nodes: VecDeque::new(),
            downloaded_nodes: HashMap::new(),
        }
    }
    
    pub async fn sync_state_root(&mut self, state_root: H256) -> Result<()> {
        tracing::info!("Syncing state root: {:?}", state_root);
        
        // Start with root node
        self.pending_nodes.push_back(state_root);
        
        while let Some(node_hash) = self.pending_nodes.pop_front() {
            if self.downloaded_nodes.contains_key(&node_hash) {
                continue;
            }
            
            // Download node from network
            let node_data = self.download_node(node_hash).await?;
            
            // Parse node and add children to pending
            self.process_node(&node_data)?;
            
            // Store node
            self.downloaded_nodes.insert(node_hash, node_data);
        }
        
        // Verify complete state
        self.verify_state(state_root)?;
        
        Ok(())
    }
    
    pub async fn verify_account_proof(
        &self,
        state_root: H256,
        address: H256,
        proof: &MerkleProof,
    ) -> Result<bool> {
        // Verify merkle proof for account
        let key = address.as_bytes();
        let valid = proof.verify(&state_root, key, None)?;
        
        Ok(valid)
    }
    
    pub async fn sync_account(
        &mut self,
        address: H256,
        account_data: AccountState,
    ) -> Result<()> {
        // Store account state
        let key = format!("account:{}", hex::encode(address));
        self.db.put(
            key.as_bytes(),
            &bincode::serialize(&account_data).unwrap(),
        )?;
        
        // If account has storage, sync storage trie
        if account_data.storage_root != H256::zero() {
            self.sync_storage(address, account_data.storage_root).await?;
        }
        
        // If account has code, download code
        if account_data.code_hash != H256::zero() {
            self.sync_code(account_data.code_hash).await?;
        }
        
        Ok(())
    }
    
    async fn sync_storage(
        &mut self,
        account: H256,
        storage_root: H256,
    ) -> Result<()> {
        tracing::debug!("Syncing storage for account {:?}", account);
        
        // Similar to state sync but for storage trie
        let mut storage_trie = PatriciaTrie::new(self.db.clone());
        
        // Download storage trie nodes
        self.pending_nodes.clear();
        self.pending_nodes.push_back(storage_root);
        
        while let Some(node_hash) = self.pending_nodes.pop_front() {
            let node_data = self.download_node(node_hash).await?;
            self.process_node(&node_data)?;
            
            // Store in storage trie
            let key = format!("storage:{}:{}", hex::encode(account), hex::encode(node_hash));
            self.db.put(key.as_bytes(), &node_data)?;
        }
        
        Ok(())
    }
    
    async fn sync_code(&mut self, code_hash: H256) -> Result<()> {
        tracing::debug!("Syncing code {:?}", code_hash);
        
        // Download contract code
        let code = self.download_code(code_hash).await?;
        
        // Verify code hash
        let computed_hash = ethereum_crypto::keccak256(&code);
        if computed_hash != code_hash {
            return Err(SyncError::InvalidState("Code hash mismatch".to_string()));
        }
        
        // Store code
        let key = format!("code:{}", hex::encode(code_hash));
        self.db.put(key.as_bytes(), &code)?;
        
        Ok(())
    }
    
    async fn download_node(&self, hash: H256) -> Result<Vec<u8>> {
        // In real implementation, would download from network
        // For now, return empty data
        Ok(vec![])
    }
    
    async fn download_code(&self, hash: H256) -> Result<Vec<u8>> {
        // In real implementation, would download from network
        Ok(vec![])
    }
    
    fn process_node(&mut self, node_data: &[u8]) -> Result<()> {
        // Parse node and extract child references
        // This would use RLP decoding to parse the node
        
        // For branch nodes, add all non-empty children to pending
        // For extension nodes, add the child node to pending
        
        Ok(())
    }
    
    fn verify_state(&self, state_root: H256) -> Result<()> {
        // Verify that all downloaded nodes form a complete trie
        // with the given state root
        
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct AccountState {
    pub nonce: U256,
    pub balance: U256,
    pub storage_root: H256,
    pub code_hash: H256,
}