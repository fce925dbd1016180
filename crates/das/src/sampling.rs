use ethereum_types::H256;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, RwLock, Semaphore};
use tokio::time::timeout;
use tracing::{debug, info, warn};
use async_trait::async_trait;

use crate::{DASError, Result};

/// Sample request for a specific column
#[derive(Debug, Clone)]
pub struct SampleRequest {
    pub block_root: H256,
    pub column_index: u64,
    pub commitment: Option<ethereum_crypto_advanced::kzg::KzgCommitment>,
}

/// Sample response
#[derive(Debug, Clone)]
pub struct SampleResponse {
    pub column_index: u64,
    pub is_available: bool,
    pub data: Option<Vec<u8>>,
    pub proof: Option<Vec<u8>>,
    pub latency: Duration,
}

/// Network interface for sampling
#[async_trait]
pub trait SamplingNetwork: Send + Sync {
    async fn request_column(
        &self,
        peer_id: &[u8; 32],
        column_index: u64,
        block_root: H256,
    ) -> Result<Vec<u8>>;
    
    async fn find_column_custodians(
        &self,
        column_index: u64,
    ) -> Result<Vec<[u8; 32]>>;
}

/// Data sampler for PeerDAS
pub struct DataSampler {
    max_concurrent: usize,
    semaphore: Arc<Semaphore>,
    network: Option<Arc<dyn SamplingNetwork>>,
    cache: Arc<RwLock<SampleCache>>,
    metrics: Arc<SamplingMetrics>,
}

struct SampleCache {
    entries: HashMap<(H256, u64), CachedSample>,
    max_entries: usize,
}

struct CachedSample {
    data: Vec<u8>,
    proof: Vec<u8>,
    cached_at: Instant,
    ttl: Duration,
}

struct SamplingMetrics {
    total_requests: std::sync::atomic::AtomicU64,
    successful_samples: std::sync::atomic::AtomicU64,
    failed_samples: std::sync::atomic::AtomicU64,
    cache_hits: std::sync::atomic::AtomicU64,
    cache_misses: std::sync::atomic::AtomicU64,
}

impl DataSampler {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            max_concurrent,
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            network: None,
            cache: Arc::new(RwLock::new(SampleCache::new(1000))),
            metrics: Arc::new(SamplingMetrics::new()),
        }
    }
    
    pub fn with_network(mut self, network: Arc<dyn SamplingNetwork>) -> Self {
        self.network = Some(network);
        self
    }
    
    /// Sample multiple columns concurrently
    pub async fn sample_columns(
        &self,
        requests: Vec<SampleRequest>,
    ) -> Vec<SampleResponse> {
        let mut handles = Vec::new();
        
        for request in requests {
            let permit = self.semaphore.clone().acquire_owned().await.unwrap();
            let cache = self.cache.clone();
            let network = self.network.clone();
            let metrics = self.metrics.clone();
            
            let handle = tokio::spawn(async move {
                let start = Instant::now();
                let result = Self::sample_single(
                    request,
                    cache,
                    network,
                    metrics,
                ).await;
                
                drop(permit);
                
                SampleResponse {
                    column_index: request.column_index,
                    is_available: result.is_ok(),
                    data: result.as_ref().ok().map(|r| r.0.clone()),
                    proof: result.ok().map(|r| r.1),
                    latency: start.elapsed(),
                }
            });
            
            handles.push(handle);
        }
        
        let mut responses = Vec::new();
        for handle in handles {
            if let Ok(response) = handle.await {
                responses.push(response);
            }
        }
        
        responses
    }
    
    async fn sample_single(
        request: SampleRequest,
        cache: Arc<RwLock<SampleCache>>,
        network: Option<Arc<dyn SamplingNetwork>>,
        metrics: Arc<SamplingMetrics>,
    ) -> Result<(Vec<u8>, Vec<u8>)> {
        metrics.total_requests.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        
        // Check cache first
        let cache_key = (request.block_root, request.column_index);
        if let Some(cached) = cache.read().await.get(&cache_key) {
            metrics.cache_hits.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            return Ok((cached.data.clone(), cached.proof.clone()));
        }
        
        metrics.cache_misses.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        
        // Fetch from network
        let result = if let Some(net) = network {
            Self::fetch_from_network(
                net,
                request.block_root,
                request.column_index,
            ).await
        } else {
            // Simulate sampling for testing
            Self::simulate_sampling(request.column_index).await
        };
        
        match &result {
            Ok((data, proof)) => {
                metrics.successful_samples.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                
                // Cache the result
                cache.write().await.insert(
                    cache_key,
                    CachedSample {
                        data: data.clone(),
                        proof: proof.clone(),
                        cached_at: Instant::now(),
                        ttl: Duration::from_secs(60),
                    },
                );
            }
            Err(_) => {
                metrics.failed_samples.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            }
        }
        
        result
    }
    
    async fn fetch_from_network(
        network: Arc<dyn SamplingNetwork>,
        block_root: H256,
        column_index: u64,
    ) -> Result<(Vec<u8>, Vec<u8>)> {
        // Find custodians for this column
        let custodians = network.find_column_custodians(column_index).await?;
        
        if custodians.is_empty() {
            return Err(DASError::SamplingFailed(
                "No custodians found for column".to_string()
            ));
        }
        
        // Try to fetch from custodians
        for custodian in custodians.iter().take(3) {
            match timeout(
                Duration::from_secs(5),
                network.request_column(custodian, column_index, block_root),
            ).await {
                Ok(Ok(data)) => {
                    debug!("Successfully fetched column {} from custodian", column_index);
                    // Extract proof from data (in production, this would be properly parsed)
                    let proof = vec![0u8; 48]; // Mock KZG proof
                    return Ok((data, proof));
                }
                Ok(Err(e)) => {
                    warn!("Failed to fetch column {} from custodian: {}", column_index, e);
                }
                Err(_) => {
                    warn!("Timeout fetching column {} from custodian", column_index);
                }
            }
        }
        
        Err(DASError::SamplingFailed(
            format!("Failed to fetch column {} from any custodian", column_index)
        ))
    }
    
    async fn simulate_sampling(column_index: u64) -> Result<(Vec<u8>, Vec<u8>)> {
        // Simulate network delay
        tokio::time::sleep(Duration::from_millis(10)).await;
        
        // Simulate success rate (90%)
        if rand::random::<f64>() < 0.9 {
            let data = vec![0u8; 512]; // Mock column data
            let proof = vec![0u8; 48]; // Mock KZG proof
            Ok((data, proof))
        } else {
            Err(DASError::SamplingFailed(
                format!("Simulated failure for column {}", column_index)
            ))
        }
    }
    
    pub fn get_metrics(&self) -> SamplingMetricsSnapshot {
        SamplingMetricsSnapshot {
            total_requests: self.metrics.total_requests.load(std::sync::atomic::Ordering::Relaxed),
            successful_samples: self.metrics.successful_samples.load(std::sync::atomic::Ordering::Relaxed),
            failed_samples: self.metrics.failed_samples.load(std::sync::atomic::Ordering::Relaxed),
            cache_hits: self.metrics.cache_hits.load(std::sync::atomic::Ordering::Relaxed),
            cache_misses: self.metrics.cache_misses.load(std::sync::atomic::Ordering::Relaxed),
            success_rate: self.metrics.calculate_success_rate(),
        }
    }
}

impl SampleCache {
    fn new(max_entries: usize) -> Self {
        Self {
            entries: HashMap::new(),
            max_entries,
        }
    }
    
    fn get(&self, key: &(H256, u64)) -> Option<&CachedSample> {
        self.entries.get(key).and_then(|sample| {
            if sample.cached_at.elapsed() < sample.ttl {
                Some(sample)
            } else {
                None
            }
        })
    }
    
    fn insert(&mut self, key: (H256, u64), sample: CachedSample) {
        // Evict old entries if cache is full
        if self.entries.len() >= self.max_entries {
            self.evict_oldest();
        }
        
        self.entries.insert(key, sample);
    }
    
    fn evict_oldest(&mut self) {
        if let Some(oldest_key) = self.entries
            .iter()
            .min_by_key(|(_, sample)| sample.cached_at)
            .map(|(key, _)| key.clone())
        {
            self.entries.remove(&oldest_key);
        }
    }
}

impl SamplingMetrics {
    fn new() -> Self {
        Self {
            total_requests: std::sync::atomic::AtomicU64::new(0),
            successful_samples: std::sync::atomic::AtomicU64::new(0),
            failed_samples: std::sync::atomic::AtomicU64::new(0),
            cache_hits: std::sync::atomic::AtomicU64::new(0),
            cache_misses: std::sync::atomic::AtomicU64::new(0),
        }
    }
    
    fn calculate_success_rate(&self) -> f64 {
        let successful = self.successful_samples.load(std::sync::atomic::Ordering::Relaxed) as f64;
        let total = self.total_requests.load(std::sync::atomic::Ordering::Relaxed) as f64;
        
        if total > 0.0 {
            successful / total
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone)]
pub struct SamplingMetricsSnapshot {
    pub total_requests: u64,
    pub successful_samples: u64,
    pub failed_samples: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub success_rate: f64,
}

/// Sampling strategy for column selection
#[derive(Debug, Clone)]
pub enum SamplingStrategy {
    /// Random sampling
    Random,
    /// Prioritize columns based on custody
    CustodyBased,
    /// Adaptive based on network conditions
    Adaptive,
}

impl SamplingStrategy {
    pub fn select_columns(
        &self,
        total_columns: usize,
        sample_count: usize,
        custody_columns: &[u64],
    ) -> Vec<u64> {
        match self {
            Self::Random => {
                use rand::seq::SliceRandom;
                let mut columns: Vec<u64> = (0..total_columns as u64).collect();
                let mut rng = rand::thread_rng();
                columns.shuffle(&mut rng);
                columns.into_iter().take(sample_count).collect()
            }
            Self::CustodyBased => {
                let mut selected = Vec::new();
                
                // First add custody columns
                for &col in custody_columns.iter().take(sample_count / 2) {
                    selected.push(col);
                }
                
                // Then add random non-custody columns
                use rand::seq::SliceRandom;
                let mut non_custody: Vec<u64> = (0..total_columns as u64)
                    .filter(|c| !custody_columns.contains(c))
                    .collect();
                let mut rng = rand::thread_rng();
                non_custody.shuffle(&mut rng);
                
                for col in non_custody.into_iter().take(sample_count - selected.len()) {
                    selected.push(col);
                }
                
                selected
            }
            Self::Adaptive => {
                // In production, this would consider network latency, peer availability, etc.
                Self::Random.select_columns(total_columns, sample_count, custody_columns)
            }
        }
    }
}