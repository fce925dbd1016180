use std::sync::Arc;
use ethereum_types::{H160, H256, U256};
use ethereum_storage::Database;
use ethereum_core::{Block as CoreBlock, Transaction as CoreTransaction};

use crate::{Result, RpcError};
use crate::types::{Block, Transaction, Receipt, CallRequest, BlockNumber, SyncStatus};

pub struct EthApi {
    db: Arc<dyn Database>,
    chain_id: u64,
}

impl EthApi {
    pub fn new<D: Database + 'static>(db: Arc<D>) -> Self {
        Self {
            db: db as Arc<dyn Database>,
            chain_id: 1, // Default to mainnet
        }
    }
    
    pub async fn block_number(&self) -> Result<U256> {
        // Get the latest block number from storage
        // This is a simplified implementation
        Ok(U256::from(0))
    }
    
    pub async fn get_balance(&self, address: H160, block_number: Option<BlockNumber>) -> Result<U256> {
        // Query state database for account balance
        // This would interact with the state trie
        let block = self.resolve_block_number(block_number).await?;
        
        // Simplified - would actually query the state trie
        Ok(U256::zero())
    }
    
    pub async fn get_transaction_count(&self, address: H160, block_number: Option<BlockNumber>) -> Result<U256> {
        // Query state database for account nonce
        let block = self.resolve_block_number(block_number).await?;
        
        // Simplified - would actually query the state trie
        Ok(U256::zero())
    }
    
    pub async fn get_block_by_hash(&self, hash: H256, full_transactions: bool) -> Result<Option<Block>> {
        // Query block from database
        let key = format!("block:{}", hex::encode(hash.as_bytes()));
        
        match self.db.get(key.as_bytes()) {
            Ok(Some(data)) => {
                // Deserialize block and convert to RPC format
                let block = self.convert_block(hash, full_transactions)?;
                Ok(Some(block))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(RpcError::InternalError(e.to_string())),
        }
    }
    
    pub async fn get_block_by_number(&self, number: BlockNumber, full_transactions: bool) -> Result<Option<Block>> {
        let block_num = self.resolve_block_number(Some(number)).await?;
        
        // Get block hash for the number
        let key = format!("number:{}", block_num);
        let hash = match self.db.get(key.as_bytes()) {
            Ok(Some(data)) => {
                // Parse hash from data
                H256::from_slice(&data[..32])
            }
            Ok(None) => return Ok(None),
            Err(e) => return Err(RpcError::InternalError(e.to_string())),
        };
        
        self.get_block_by_hash(hash, full_transactions).await
    }
    
    pub async fn get_transaction_by_hash(&self, hash: H256) -> Result<Option<Transaction>> {
        // Query transaction from database
        let key = format!("tx:{}", hex::encode(hash.as_bytes()));
        
        match self.db.get(key.as_bytes()) {
            Ok(Some(data)) => {
                // Deserialize and convert to RPC format
                let tx = self.convert_transaction(hash)?;
                Ok(Some(tx))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(RpcError::InternalError(e.to_string())),
        }
    }
    
    pub async fn get_transaction_receipt(&self, hash: H256) -> Result<Option<Receipt>> {
        // Query receipt from database
        let key = format!("receipt:{}", hex::encode(hash.as_bytes()));
        
        match self.db.get(key.as_bytes()) {
            Ok(Some(data)) => {
                // Deserialize and convert to RPC format
                let receipt = self.convert_receipt(hash)?;
                Ok(Some(receipt))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(RpcError::InternalError(e.to_string())),
        }
    }
    
    pub async fn call(&self, request: CallRequest, block_number: Option<BlockNumber>) -> Result<String> {
        // Execute EVM call without state changes
        let block = self.resolve_block_number(block_number).await?;
        
        // This would actually execute the call in the EVM
        Ok("0x".to_string())
    }
    
    pub async fn estimate_gas(&self, request: CallRequest) -> Result<U256> {
        // Estimate gas by executing the transaction
        // This would actually run the transaction to estimate gas
        Ok(U256::from(21000)) // Basic transfer gas
    }
    
    pub async fn gas_price(&self) -> Result<U256> {
        // Return current gas price estimate
        // This would calculate based on recent blocks
        Ok(U256::from(20_000_000_000u64)) // 20 gwei
    }
    
    pub async fn chain_id(&self) -> Result<U256> {
        Ok(U256::from(self.chain_id))
    }
    
    pub async fn syncing(&self) -> Result<SyncStatus> {
        // Return sync status
        // This would check actual sync state
        Ok(SyncStatus {
            starting_block: U256::zero(),
            current_block: U256::zero(),
            highest_block: U256::zero(),
        })
    }
    
    pub async fn mining(&self) -> Result<bool> {
        // Check if node is mining
        Ok(false)
    }
    
    pub async fn hashrate(&self) -> Result<U256> {
        // Return current hashrate
        Ok(U256::zero())
    }
    
    pub async fn accounts(&self) -> Result<Vec<H160>> {
        // Return list of accounts
        // This would return accounts managed by the node
        Ok(Vec::new())
    }
    
    pub async fn send_raw_transaction(&self, data: String) -> Result<H256> {
        // Decode and validate transaction
        let tx_bytes = hex::decode(data.trim_start_matches("0x"))
            .map_err(|e| RpcError::InvalidParams(e.to_string()))?;
        
        // This would actually:
        // 1. Decode the RLP transaction
        // 2. Validate the transaction
        // 3. Add to mempool
        // 4. Broadcast to network
        
        // Return transaction hash
        Ok(H256::from_slice(&ethereum_crypto::keccak256(&tx_bytes)))
    }
    
    async fn resolve_block_number(&self, number: Option<BlockNumber>) -> Result<U256> {
        match number {
            Some(BlockNumber::Latest) | None => self.block_number().await,
            Some(BlockNumber::Earliest) => Ok(U256::zero()),
            Some(BlockNumber::Pending) => self.block_number().await,
            Some(BlockNumber::Number(n)) => Ok(n),
        }
    }
    
    fn convert_block(&self, hash: H256, full_transactions: bool) -> Result<Block> {
        // Convert core block to RPC block format
        // This is a simplified version
        Ok(Block {
            number: Some(U256::zero()),
            hash: Some(hash),
            parent_hash: H256::zero(),
            nonce: Some(U256::zero()),
            sha3_uncles: H256::zero(),
            logs_bloom: Some("0x".to_string()),
            transactions_root: H256::zero(),
            state_root: H256::zero(),
            receipts_root: H256::zero(),
            miner: H160::zero(),
            difficulty: U256::zero(),
            total_difficulty: Some(U256::zero()),
            extra_data: "0x".to_string(),
            size: U256::zero(),
            gas_limit: U256::from(8_000_000),
            gas_used: U256::zero(),
            timestamp: U256::zero(),
            transactions: Vec::new(),
            uncles: Vec::new(),
            base_fee_per_gas: Some(U256::from(1_000_000_000)),
        })
    }
    
    fn convert_transaction(&self, hash: H256) -> Result<Transaction> {
        // Convert core transaction to RPC format
        // This is a simplified version
        Ok(Transaction {
            hash,
            nonce: U256::zero(),
            block_hash: None,
            block_number: None,
            transaction_index: None,
            from: H160::zero(),
            to: None,
            value: U256::zero(),
            gas_price: Some(U256::from(20_000_000_000u64)),
            gas: U256::from(21000),
            input: "0x".to_string(),
            v: U256::zero(),
            r: U256::zero(),
            s: U256::zero(),
            tx_type: Some(U256::from(2)),
            max_fee_per_gas: Some(U256::from(30_000_000_000u64)),
            max_priority_fee_per_gas: Some(U256::from(1_000_000_000)),
            access_list: None,
        })
    }
    
    fn convert_receipt(&self, hash: H256) -> Result<Receipt> {
        // Convert core receipt to RPC format
        // This is a simplified version
        Ok(Receipt {
            transaction_hash: hash,
            transaction_index: U256::zero(),
            block_hash: H256::zero(),
            block_number: U256::zero(),
            from: H160::zero(),
            to: None,
            cumulative_gas_used: U256::from(21000),
            gas_used: U256::from(21000),
            contract_address: None,
            logs: Vec::new(),
            logs_bloom: "0x".to_string(),
            status: U256::one(),
            effective_gas_price: U256::from(20_000_000_000u64),
            tx_type: U256::from(2),
        })
    }
}