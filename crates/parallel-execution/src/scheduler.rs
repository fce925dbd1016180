use ethereum_core::Transaction;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::algo::toposort;

use crate::{Result, ParallelExecutionError};
use crate::dependency_graph::DependencyGraph;

/// Transaction scheduling strategy
#[derive(Debug, Clone)]
pub enum SchedulingStrategy {
    /// Optimistic concurrency control
    OptimisticConcurrency,
    /// Pessimistic locking
    PessimisticLocking,
    /// Timestamp ordering
    TimestampOrdering,
    /// Multi-version concurrency control
    MVCC,
    /// Deterministic scheduling
    Deterministic,
}

/// Transaction scheduler
pub struct TransactionScheduler {
    strategy: SchedulingStrategy,
    max_parallel: usize,
}

impl TransactionScheduler {
    pub fn new(strategy: SchedulingStrategy) -> Self {
        Self {
            strategy,
            max_parallel: num_cpus::get(),
        }
    }
    
    /// Schedule transactions for parallel execution
    pub fn schedule(
        &self,
        dep_graph: &DependencyGraph,
        transactions: &[Transaction],
    ) -> Result<Schedule> {
        match self.strategy {
            SchedulingStrategy::OptimisticConcurrency => {
                self.schedule_optimistic(dep_graph, transactions)
            }
            SchedulingStrategy::PessimisticLocking => {
                self.schedule_pessimistic(dep_graph, transactions)
            }
            SchedulingStrategy::TimestampOrdering => {
                self.schedule_timestamp(dep_graph, transactions)
            }
            SchedulingStrategy::MVCC => {
                self.schedule_mvcc(dep_graph, transactions)
            }
            SchedulingStrategy::Deterministic => {
                self.schedule_deterministic(dep_graph, transactions)
            }
        }
    }
    
    /// Optimistic scheduling - assume no conflicts
    fn schedule_optimistic(
        &self,
        dep_graph: &DependencyGraph,
        transactions: &[Transaction],
    ) -> Result<Schedule> {
        let mut schedule = Schedule::new();
        let graph = dep_graph.to_petgraph();
        
        // Topological sort to respect dependencies
        let sorted = toposort(&graph, None)
            .map_err(|_| ParallelExecutionError::SchedulingError(
                "Cycle detected in dependency graph".to_string()
            ))?;
        
        // Group into parallel batches
        let mut current_batch = Vec::new();
        let mut processed = HashSet::new();
        
        for node in sorted {
            let tx_index = graph[node];
            
            // Check if all dependencies are processed
            let deps_satisfied = dep_graph
                .get_dependencies(tx_index)
                .iter()
                .all(|dep| processed.contains(dep));
            
            if deps_satisfied && current_batch.len() < self.max_parallel {
                current_batch.push(tx_index);
            } else {
                if !current_batch.is_empty() {
                    schedule.add_batch(current_batch.clone());
                    for &idx in &current_batch {
                        processed.insert(idx);
                    }
                    current_batch.clear();
                }
                current_batch.push(tx_index);
            }
        }
        
        if !current_batch.is_empty() {
            schedule.add_batch(current_batch);
        }
        
        Ok(schedule)
    }
    
    /// Pessimistic scheduling - conservative approach
    fn schedule_pessimistic(
        &self,
        dep_graph: &DependencyGraph,
        transactions: &[Transaction],
    ) -> Result<Schedule> {
        let mut schedule = Schedule::new();
        
        // Analyze potential conflicts
        let conflict_groups = self.analyze_conflicts(transactions)?;
        
        // Schedule conflict-free groups in parallel
        for group in conflict_groups {
            if group.len() == 1 {
                // No conflicts, can run in parallel with others
                schedule.add_to_current_batch(group[0]);
            } else {
                // Has conflicts, must run sequentially
                schedule.finalize_current_batch();
                for tx_index in group {
                    schedule.add_batch(vec![tx_index]);
                }
            }
        }
        
        schedule.finalize_current_batch();
        Ok(schedule)
    }
    
    /// Timestamp-based scheduling
    fn schedule_timestamp(
        &self,
        dep_graph: &DependencyGraph,
        transactions: &[Transaction],
    ) -> Result<Schedule> {
        let mut schedule = Schedule::new();
        
        // Assign timestamps
        let mut timestamps: Vec<(usize, u64)> = transactions
            .iter()
            .enumerate()
            .map(|(i, tx)| (i, Self::compute_timestamp(tx)))
            .collect();
        
        // Sort by timestamp
        timestamps.sort_by_key(|&(_, ts)| ts);
        
        // Group transactions with non-overlapping timestamps
        let mut current_batch = Vec::new();
        let mut last_timestamp = 0;
        
        for (tx_index, timestamp) in timestamps {
            if timestamp > last_timestamp || current_batch.len() >= self.max_parallel {
                if !current_batch.is_empty() {
                    schedule.add_batch(current_batch.clone());
                    current_batch.clear();
                }
            }
            current_batch.push(tx_index);
            last_timestamp = timestamp;
        }
        
        if !current_batch.is_empty() {
            schedule.add_batch(current_batch);
        }
        
        Ok(schedule)
    }
    
    /// Multi-version concurrency control scheduling
    fn schedule_mvcc(
        &self,
        dep_graph: &DependencyGraph,
        transactions: &[Transaction],
    ) -> Result<Schedule> {
        let mut schedule = Schedule::new();
        
        // Create version map
        let mut version_map: HashMap<Address, Vec<usize>> = HashMap::new();
        
        for (i, tx) in transactions.iter().enumerate() {
            // Track which addresses each transaction accesses
            let addresses = Self::extract_addresses(tx);
            for addr in addresses {
                version_map.entry(addr).or_insert_with(Vec::new).push(i);
            }
        }
        
        // Schedule based on version compatibility
        let mut scheduled = HashSet::new();
        let mut current_batch = Vec::new();
        
        for i in 0..transactions.len() {
            if scheduled.contains(&i) {
                continue;
            }
            
            // Check if compatible with current batch
            let compatible = current_batch.iter().all(|&j| {
                !self.has_version_conflict(i, j, &version_map)
            });
            
            if compatible && current_batch.len() < self.max_parallel {
                current_batch.push(i);
                scheduled.insert(i);
            } else {
                if !current_batch.is_empty() {
                    schedule.add_batch(current_batch.clone());
                    current_batch.clear();
                }
                current_batch.push(i);
                scheduled.insert(i);
            }
        }
        
        if !current_batch.is_empty() {
            schedule.add_batch(current_batch);
        }
        
        Ok(schedule)
    }
    
    /// Deterministic scheduling for reproducibility
    fn schedule_deterministic(
        &self,
        dep_graph: &DependencyGraph,
        transactions: &[Transaction],
    ) -> Result<Schedule> {
        let mut schedule = Schedule::new();
        
        // Use a deterministic algorithm based on transaction hash
        let mut tx_indices: Vec<usize> = (0..transactions.len()).collect();
        tx_indices.sort_by_key(|&i| transactions[i].hash());
        
        // Create fixed-size batches
        for chunk in tx_indices.chunks(self.max_parallel) {
            schedule.add_batch(chunk.to_vec());
        }
        
        Ok(schedule)
    }
    
    /// Analyze potential conflicts between transactions
    fn analyze_conflicts(&self, transactions: &[Transaction]) -> Result<Vec<Vec<usize>>> {
        let mut groups = Vec::new();
        let mut processed = HashSet::new();
        
        for i in 0..transactions.len() {
            if processed.contains(&i) {
                continue;
            }
            
            let mut group = vec![i];
            processed.insert(i);
            
            for j in (i + 1)..transactions.len() {
                if self.may_conflict(&transactions[i], &transactions[j]) {
                    group.push(j);
                    processed.insert(j);
                }
            }
            
            groups.push(group);
        }
        
        Ok(groups)
    }
    
    /// Check if two transactions may conflict
    fn may_conflict(&self, tx1: &Transaction, tx2: &Transaction) -> bool {
        // Check sender
        if tx1.from == tx2.from {
            return true;
        }
        
        // Check recipient
        if let (Some(to1), Some(to2)) = (tx1.to, tx2.to) {
            if to1 == to2 {
                return true;
            }
        }
        
        // Could add more sophisticated conflict detection here
        false
    }
    
    /// Check for version conflicts in MVCC
    fn has_version_conflict(
        &self,
        tx1: usize,
        tx2: usize,
        version_map: &HashMap<Address, Vec<usize>>,
    ) -> bool {
        for (_, txs) in version_map {
            if txs.contains(&tx1) && txs.contains(&tx2) {
                return true;
            }
        }
        false
    }
    
    /// Compute timestamp for a transaction
    fn compute_timestamp(tx: &Transaction) -> u64 {
        // Use nonce as timestamp for simplicity
        tx.nonce.as_u64()
    }
    
    /// Extract addresses accessed by a transaction
    fn extract_addresses(tx: &Transaction) -> Vec<Address> {
        let mut addresses = vec![tx.from];
        if let Some(to) = tx.to {
            addresses.push(to);
        }
        addresses
    }
}

use ethereum_types::Address;

/// Execution schedule
#[derive(Debug, Clone)]
pub struct Schedule {
    pub batches: Vec<Vec<usize>>,
    current_batch: Vec<usize>,
}

impl Schedule {
    fn new() -> Self {
        Self {
            batches: Vec::new(),
            current_batch: Vec::new(),
        }
    }
    
    fn add_batch(&mut self, batch: Vec<usize>) {
        if !batch.is_empty() {
            self.batches.push(batch);
        }
    }
    
    fn add_to_current_batch(&mut self, tx_index: usize) {
        self.current_batch.push(tx_index);
    }
    
    fn finalize_current_batch(&mut self) {
        if !self.current_batch.is_empty() {
            self.batches.push(self.current_batch.clone());
            self.current_batch.clear();
        }
    }
    
    pub fn num_batches(&self) -> usize {
        self.batches.len()
    }
    
    pub fn total_transactions(&self) -> usize {
        self.batches.iter().map(|b| b.len()).sum()
    }
    
    pub fn parallelism_factor(&self) -> f64 {
        if self.batches.is_empty() {
            return 0.0;
        }
        
        let total = self.total_transactions() as f64;
        let batches = self.num_batches() as f64;
        total / batches
    }
}