use ethereum_types::{H256, U256, Address};
use ethereum_core::{Transaction, Receipt};
use std::sync::{Arc, RwLock};
use std::collections::{HashMap, HashSet};
use rayon::prelude::*;
use crossbeam::channel;
use tracing::{info, debug, warn};

use crate::{Result, ParallelExecutionError};
use crate::scheduler::{TransactionScheduler, SchedulingStrategy};
use crate::conflict_detector::{ConflictDetector, AccessSet};
use crate::state_manager::{StateManager, StateSnapshot};
use crate::dependency_graph::DependencyGraph;

/// Parallel transaction executor
pub struct ParallelExecutor {
    scheduler: Arc<TransactionScheduler>,
    conflict_detector: Arc<ConflictDetector>,
    state_manager: Arc<StateManager>,
    config: ExecutorConfig,
    metrics: Arc<ExecutorMetrics>,
}

#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Number of worker threads
    pub num_workers: usize,
    /// Maximum transactions per batch
    pub batch_size: usize,
    /// Enable speculative execution
    pub speculative_execution: bool,
    /// Conflict resolution strategy
    pub conflict_resolution: ConflictResolution,
    /// Scheduling strategy
    pub scheduling_strategy: SchedulingStrategy,
}

#[derive(Debug, Clone)]
pub enum ConflictResolution {
    /// Retry conflicting transactions
    Retry,
    /// Abort and revert conflicting transactions
    Abort,
    /// Merge conflicting state changes
    Merge,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            num_workers: num_cpus::get(),
            batch_size: 100,
            speculative_execution: true,
            conflict_resolution: ConflictResolution::Retry,
            scheduling_strategy: SchedulingStrategy::OptimisticConcurrency,
        }
    }
}

/// Execution result for a batch of transactions
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub executed_txs: Vec<ExecutedTransaction>,
    pub failed_txs: Vec<FailedTransaction>,
    pub state_root: H256,
    pub gas_used: U256,
    pub execution_time_ms: u64,
}

#[derive(Debug, Clone)]
pub struct ExecutedTransaction {
    pub tx_hash: H256,
    pub receipt: Receipt,
    pub access_set: AccessSet,
}

#[derive(Debug, Clone)]
pub struct FailedTransaction {
    pub tx_hash: H256,
    pub error: String,
    pub can_retry: bool,
}

struct ExecutorMetrics {
    total_executed: std::sync::atomic::AtomicU64,
    conflicts_detected: std::sync::atomic::AtomicU64,
    retries: std::sync::atomic::AtomicU64,
    parallel_speedup: RwLock<f64>,
}

impl ParallelExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        let scheduler = Arc::new(TransactionScheduler::new(config.scheduling_strategy.clone()));
        let conflict_detector = Arc::new(ConflictDetector::new());
        let state_manager = Arc::new(StateManager::new());
        
        Self {
            scheduler,
            conflict_detector,
            state_manager,
            config,
            metrics: Arc::new(ExecutorMetrics::new()),
        }
    }
    
    /// Execute a batch of transactions in parallel
    pub async fn execute_batch(&self, transactions: Vec<Transaction>) -> Result<ExecutionResult> {
        let start = std::time::Instant::now();
        
        info!("Starting parallel execution of {} transactions", transactions.len());
        
        // Build dependency graph
        let dep_graph = self.build_dependency_graph(&transactions)?;
        
        // Schedule transactions
        let schedule = self.scheduler.schedule(&dep_graph, &transactions)?;
        
        // Execute in parallel batches
        let mut all_results = Vec::new();
        
        for batch in schedule.batches {
            let batch_results = self.execute_parallel_batch(batch).await?;
            all_results.extend(batch_results);
        }
        
        // Validate and commit results
        let final_results = self.validate_and_commit(all_results).await?;
        
        let elapsed = start.elapsed();
        
        Ok(ExecutionResult {
            executed_txs: final_results.0,
            failed_txs: final_results.1,
            state_root: self.state_manager.compute_state_root()?,
            gas_used: self.calculate_total_gas(&final_results.0),
            execution_time_ms: elapsed.as_millis() as u64,
        })
    }
    
    /// Build dependency graph for transactions
    fn build_dependency_graph(&self, transactions: &[Transaction]) -> Result<DependencyGraph> {
        let mut graph = DependencyGraph::new();
        
        for (i, tx) in transactions.iter().enumerate() {
            graph.add_transaction(i, tx.clone());
            
            // Analyze dependencies
            for j in 0..i {
                if self.has_dependency(&transactions[j], tx)? {
                    graph.add_dependency(j, i);
                }
            }
        }
        
        Ok(graph)
    }
    
    /// Check if tx2 depends on tx1
    fn has_dependency(&self, tx1: &Transaction, tx2: &Transaction) -> Result<bool> {
        // Check for account dependencies
        if tx1.from == tx2.from {
            return Ok(true); // Same sender, must be sequential
        }
        
        // Check for contract interactions
        if let (Some(to1), Some(to2)) = (tx1.to, tx2.to) {
            if to1 == to2 {
                // Same contract, check for state conflicts
                return self.conflict_detector.check_conflict(tx1, tx2);
            }
        }
        
        // Check for cross-contract dependencies
        // This would require deeper analysis of contract calls
        
        Ok(false)
    }
    
    /// Execute a batch of independent transactions in parallel
    async fn execute_parallel_batch(
        &self,
        batch: Vec<usize>,
    ) -> Result<Vec<TransactionResult>> {
        let (tx, rx) = channel::unbounded();
        
        // Create thread pool for parallel execution
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.num_workers)
            .build()
            .map_err(|e| ParallelExecutionError::ExecutionFailed(e.to_string()))?;
        
        // Take state snapshot for speculative execution
        let snapshot = if self.config.speculative_execution {
            Some(self.state_manager.snapshot()?)
        } else {
            None
        };
        
        // Execute transactions in parallel
        pool.install(|| {
            batch.par_iter().for_each(|&tx_index| {
                let result = self.execute_single_transaction(tx_index, snapshot.as_ref());
                tx.send((tx_index, result)).unwrap();
            });
        });
        
        drop(tx);
        
        // Collect results
        let mut results = Vec::new();
        while let Ok((index, result)) = rx.recv() {
            results.push(result?);
        }
        
        Ok(results)
    }
    
    /// Execute a single transaction
    fn execute_single_transaction(
        &self,
        tx_index: usize,
        snapshot: Option<&StateSnapshot>,
    ) -> Result<TransactionResult> {
        debug!("Executing transaction {}", tx_index);
        
        // Create isolated execution context
        let mut context = if let Some(snap) = snapshot {
            ExecutionContext::from_snapshot(snap.clone())
        } else {
            ExecutionContext::new(self.state_manager.clone())
        };
        
        // Track access set for conflict detection
        let mut access_set = AccessSet::new();
        
        // Execute transaction (simplified)
        // In production, this would call the actual EVM
        let receipt = self.simulate_execution(&mut context, tx_index, &mut access_set)?;
        
        Ok(TransactionResult {
            tx_index,
            receipt,
            access_set,
            state_changes: context.get_changes(),
        })
    }
    
    /// Validate execution results and handle conflicts
    async fn validate_and_commit(
        &self,
        results: Vec<TransactionResult>,
    ) -> Result<(Vec<ExecutedTransaction>, Vec<FailedTransaction>)> {
        let mut executed = Vec::new();
        let mut failed = Vec::new();
        let mut retry_queue = Vec::new();
        
        // Group results by potential conflicts
        let conflict_groups = self.group_by_conflicts(results)?;
        
        for group in conflict_groups {
            match self.config.conflict_resolution {
                ConflictResolution::Retry => {
                    // Retry conflicting transactions sequentially
                    for result in group {
                        if self.validate_result(&result)? {
                            self.commit_result(&result)?;
                            executed.push(self.to_executed_tx(result));
                        } else {
                            retry_queue.push(result);
                        }
                    }
                }
                ConflictResolution::Abort => {
                    // Abort all conflicting transactions
                    let mut has_conflict = false;
                    for result in &group {
                        if !self.validate_result(result)? {
                            has_conflict = true;
                            break;
                        }
                    }
                    
                    if !has_conflict {
                        for result in group {
                            self.commit_result(&result)?;
                            executed.push(self.to_executed_tx(result));
                        }
                    } else {
                        for result in group {
                            failed.push(self.to_failed_tx(result, "Conflict detected"));
                        }
                    }
                }
                ConflictResolution::Merge => {
                    // Try to merge conflicting state changes
                    let merged = self.merge_results(group)?;
                    if let Some(result) = merged {
                        self.commit_result(&result)?;
                        executed.push(self.to_executed_tx(result));
                    }
                }
            }
        }
        
        // Retry failed transactions if configured
        if !retry_queue.is_empty() && self.config.conflict_resolution == ConflictResolution::Retry {
            self.metrics.retries.fetch_add(
                retry_queue.len() as u64,
                std::sync::atomic::Ordering::Relaxed,
            );
            
            for result in retry_queue {
                match self.retry_transaction(result).await {
                    Ok(retried) => executed.push(retried),
                    Err(e) => failed.push(FailedTransaction {
                        tx_hash: H256::random(), // Would be actual tx hash
                        error: e.to_string(),
                        can_retry: false,
                    }),
                }
            }
        }
        
        Ok((executed, failed))
    }
    
    /// Group transactions by potential conflicts
    fn group_by_conflicts(&self, results: Vec<TransactionResult>) -> Result<Vec<Vec<TransactionResult>>> {
        let mut groups = Vec::new();
        let mut processed = HashSet::new();
        
        for (i, result) in results.iter().enumerate() {
            if processed.contains(&i) {
                continue;
            }
            
            let mut group = vec![result.clone()];
            processed.insert(i);
            
            // Find all conflicting transactions
            for (j, other) in results.iter().enumerate().skip(i + 1) {
                if self.conflict_detector.conflicts(&result.access_set, &other.access_set) {
                    group.push(other.clone());
                    processed.insert(j);
                    
                    self.metrics.conflicts_detected.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                }
            }
            
            groups.push(group);
        }
        
        Ok(groups)
    }
    
    /// Validate a transaction result
    fn validate_result(&self, result: &TransactionResult) -> Result<bool> {
        // Check if state changes are valid
        for (address, changes) in &result.state_changes {
            if !self.state_manager.can_apply(address, changes)? {
                return Ok(false);
            }
        }
        
        Ok(true)
    }
    
    /// Commit a transaction result to state
    fn commit_result(&self, result: &TransactionResult) -> Result<()> {
        self.state_manager.apply_changes(&result.state_changes)?;
        self.metrics.total_executed.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        Ok(())
    }
    
    /// Retry a failed transaction
    async fn retry_transaction(&self, result: TransactionResult) -> Result<ExecutedTransaction> {
        // Re-execute with updated state
        let new_result = self.execute_single_transaction(result.tx_index, None)?;
        
        if self.validate_result(&new_result)? {
            self.commit_result(&new_result)?;
            Ok(self.to_executed_tx(new_result))
        } else {
            Err(ParallelExecutionError::ExecutionFailed(
                "Retry failed".to_string()
            ))
        }
    }
    
    /// Merge conflicting results if possible
    fn merge_results(&self, results: Vec<TransactionResult>) -> Result<Option<TransactionResult>> {
        // Simplified merge logic
        // In production, this would implement sophisticated CRDT-based merging
        
        if results.len() == 1 {
            return Ok(Some(results.into_iter().next().unwrap()));
        }
        
        // For now, just return None (cannot merge)
        Ok(None)
    }
    
    /// Simulate transaction execution (placeholder)
    fn simulate_execution(
        &self,
        context: &mut ExecutionContext,
        tx_index: usize,
        access_set: &mut AccessSet,
    ) -> Result<Receipt> {
        // This would be replaced with actual EVM execution
        
        // Simulate some state accesses
        let addresses = vec![
            Address::random(),
            Address::random(),
        ];
        
        for addr in addresses {
            access_set.add_read(addr, H256::random());
            access_set.add_write(addr, H256::random(), H256::random());
        }
        
        Ok(Receipt {
            transaction_hash: H256::random(),
            transaction_index: tx_index as u64,
            block_hash: H256::zero(),
            block_number: 0,
            from: Address::random(),
            to: Some(Address::random()),
            cumulative_gas_used: U256::from(21000),
            gas_used: Some(U256::from(21000)),
            contract_address: None,
            logs: Vec::new(),
            logs_bloom: ethereum_types::Bloom::zero(),
            status: Some(U256::one()),
            state_root: None,
        })
    }
    
    fn calculate_total_gas(&self, executed: &[ExecutedTransaction]) -> U256 {
        executed.iter()
            .map(|tx| tx.receipt.gas_used.unwrap_or_default())
            .fold(U256::zero(), |acc, gas| acc + gas)
    }
    
    fn to_executed_tx(&self, result: TransactionResult) -> ExecutedTransaction {
        ExecutedTransaction {
            tx_hash: result.receipt.transaction_hash,
            receipt: result.receipt,
            access_set: result.access_set,
        }
    }
    
    fn to_failed_tx(&self, result: TransactionResult, error: &str) -> FailedTransaction {
        FailedTransaction {
            tx_hash: result.receipt.transaction_hash,
            error: error.to_string(),
            can_retry: true,
        }
    }
    
    pub fn get_metrics(&self) -> ExecutorMetricsSnapshot {
        ExecutorMetricsSnapshot {
            total_executed: self.metrics.total_executed.load(std::sync::atomic::Ordering::Relaxed),
            conflicts_detected: self.metrics.conflicts_detected.load(std::sync::atomic::Ordering::Relaxed),
            retries: self.metrics.retries.load(std::sync::atomic::Ordering::Relaxed),
            parallel_speedup: *self.metrics.parallel_speedup.read().unwrap(),
        }
    }
}

impl ExecutorMetrics {
    fn new() -> Self {
        Self {
            total_executed: std::sync::atomic::AtomicU64::new(0),
            conflicts_detected: std::sync::atomic::AtomicU64::new(0),
            retries: std::sync::atomic::AtomicU64::new(0),
            parallel_speedup: RwLock::new(1.0),
        }
    }
}

#[derive(Debug, Clone)]
struct TransactionResult {
    tx_index: usize,
    receipt: Receipt,
    access_set: AccessSet,
    state_changes: HashMap<Address, StateChanges>,
}

#[derive(Debug, Clone)]
struct StateChanges {
    nonce: Option<U256>,
    balance: Option<U256>,
    storage: HashMap<H256, H256>,
}

struct ExecutionContext {
    state_manager: Arc<StateManager>,
    changes: HashMap<Address, StateChanges>,
}

impl ExecutionContext {
    fn new(state_manager: Arc<StateManager>) -> Self {
        Self {
            state_manager,
            changes: HashMap::new(),
        }
    }
    
    fn from_snapshot(snapshot: StateSnapshot) -> Self {
        Self {
            state_manager: Arc::new(StateManager::from_snapshot(snapshot)),
            changes: HashMap::new(),
        }
    }
    
    fn get_changes(&self) -> HashMap<Address, StateChanges> {
        self.changes.clone()
    }
}

#[derive(Debug, Clone)]
pub struct ExecutorMetricsSnapshot {
    pub total_executed: u64,
    pub conflicts_detected: u64,
    pub retries: u64,
    pub parallel_speedup: f64,
}