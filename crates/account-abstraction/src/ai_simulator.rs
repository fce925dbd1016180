use ethereum_types::{H256, U256, Address};
use ethereum_core::Transaction;
use candle_core::{Device, Tensor};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, debug};

use crate::{Result, AccountAbstractionError};

/// AI-powered transaction simulator
pub struct AITransactionSimulator {
    model: Arc<SimulationModel>,
    cache: Arc<RwLock<SimulationCache>>,
    device: Device,
}

impl AITransactionSimulator {
    pub fn new() -> Result<Self> {
        let device = Device::cuda_if_available(0).unwrap_or(Device::Cpu);
        
        Ok(Self {
            model: Arc::new(SimulationModel::load()?),
            cache: Arc::new(RwLock::new(SimulationCache::new(1000))),
            device,
        })
    }
    
    /// Simulate a transaction using AI model
    pub async fn simulate(&self, tx: &Transaction) -> Result<SimulationResult> {
        info!("AI-powered simulation for transaction: {:?}", tx.hash());
        
        // Check cache
        if let Some(cached) = self.cache.read().await.get(&tx.hash()) {
            return Ok(cached.clone());
        }
        
        // Extract features from transaction
        let features = self.extract_features(tx)?;
        
        // Run AI model inference
        let prediction = self.model.predict(&features, &self.device).await?;
        
        // Interpret prediction
        let result = self.interpret_prediction(prediction, tx)?;
        
        // Cache result
        self.cache.write().await.insert(tx.hash(), result.clone());
        
        Ok(result)
    }
    
    /// Extract features from transaction for AI model
    fn extract_features(&self, tx: &Transaction) -> Result<TransactionFeatures> {
        Ok(TransactionFeatures {
            gas_price: tx.gas_price.as_u64() as f32 / 1e9,
            gas_limit: tx.gas_limit.as_u64() as f32,
            value: tx.value.as_u64() as f32 / 1e18,
            nonce: tx.nonce.as_u64() as f32,
            data_size: tx.data.len() as f32,
            is_contract_creation: tx.to.is_none(),
            function_selector: self.extract_function_selector(&tx.data),
            historical_success_rate: self.get_historical_success_rate(&tx.from),
            network_congestion: self.estimate_network_congestion(),
            mev_risk_score: self.calculate_mev_risk(tx),
        })
    }
    
    fn extract_function_selector(&self, data: &[u8]) -> [f32; 4] {
        if data.len() >= 4 {
            [
                data[0] as f32 / 255.0,
                data[1] as f32 / 255.0,
                data[2] as f32 / 255.0,
                data[3] as f32 / 255.0,
            ]
        } else {
            [0.0; 4]
        }
    }
    
    fn get_historical_success_rate(&self, address: &Address) -> f32 {
        // Would query historical data
        0.95 // Mock 95% success rate
    }
    
    fn estimate_network_congestion(&self) -> f32 {
        // Would query network state
        0.3 // Mock 30% congestion
    }
    
    fn calculate_mev_risk(&self, tx: &Transaction) -> f32 {
        // Analyze MEV vulnerability
        if tx.value > U256::from(10).pow(U256::from(18)) {
            0.7 // High value = higher MEV risk
        } else {
            0.2
        }
    }
    
    /// Interpret AI model prediction
    fn interpret_prediction(
        &self,
        prediction: ModelPrediction,
        tx: &Transaction,
    ) -> Result<SimulationResult> {
        Ok(SimulationResult {
            success_probability: prediction.success_probability,
            estimated_gas_used: U256::from((prediction.gas_estimate * 1e6) as u64),
            revert_reason: prediction.revert_reason,
            warnings: prediction.warnings,
            optimization_suggestions: self.generate_optimizations(&prediction, tx),
            mev_protection_needed: prediction.mev_risk > 0.5,
            recommended_gas_price: self.calculate_optimal_gas_price(&prediction),
            execution_path: prediction.execution_path,
            state_changes: prediction.state_changes,
        })
    }
    
    fn generate_optimizations(
        &self,
        prediction: &ModelPrediction,
        tx: &Transaction,
    ) -> Vec<OptimizationSuggestion> {
        let mut suggestions = Vec::new();
        
        if prediction.gas_estimate > tx.gas_limit.as_u64() as f32 * 0.8 {
            suggestions.push(OptimizationSuggestion {
                type_: OptimizationType::GasLimit,
                description: "Consider increasing gas limit".to_string(),
                impact: ImpactLevel::High,
            });
        }
        
        if prediction.mev_risk > 0.5 {
            suggestions.push(OptimizationSuggestion {
                type_: OptimizationType::MEVProtection,
                description: "Use flashbots or private mempool".to_string(),
                impact: ImpactLevel::Critical,
            });
        }
        
        suggestions
    }
    
    fn calculate_optimal_gas_price(&self, prediction: &ModelPrediction) -> U256 {
        let base = 30_000_000_000u64; // 30 gwei
        let multiplier = (1.0 + prediction.urgency_score) as u64;
        U256::from(base * multiplier)
    }
    
    /// Train the model with new data
    pub async fn train(&mut self, training_data: Vec<TrainingExample>) -> Result<()> {
        info!("Training AI model with {} examples", training_data.len());
        
        // Convert to tensors
        let inputs = self.prepare_training_inputs(&training_data)?;
        let targets = self.prepare_training_targets(&training_data)?;
        
        // Train model
        self.model.train(&inputs, &targets, &self.device).await?;
        
        Ok(())
    }
    
    fn prepare_training_inputs(&self, data: &[TrainingExample]) -> Result<Tensor> {
        // Convert training data to tensors
        let features: Vec<f32> = data.iter()
            .flat_map(|ex| ex.features.to_vec())
            .collect();
        
        Ok(Tensor::from_vec(
            features,
            &[data.len(), TransactionFeatures::SIZE],
            &self.device,
        ).map_err(|e| AccountAbstractionError::SimulationFailed(e.to_string()))?)
    }
    
    fn prepare_training_targets(&self, data: &[TrainingExample]) -> Result<Tensor> {
        let targets: Vec<f32> = data.iter()
            .map(|ex| if ex.successful { 1.0 } else { 0.0 })
            .collect();
        
        Ok(Tensor::from_vec(
            targets,
            &[data.len(), 1],
            &self.device,
        ).map_err(|e| AccountAbstractionError::SimulationFailed(e.to_string()))?)
    }
}

/// Transaction features for AI model
#[derive(Debug, Clone)]
struct TransactionFeatures {
    gas_price: f32,
    gas_limit: f32,
    value: f32,
    nonce: f32,
    data_size: f32,
    is_contract_creation: bool,
    function_selector: [f32; 4],
    historical_success_rate: f32,
    network_congestion: f32,
    mev_risk_score: f32,
}

impl TransactionFeatures {
    const SIZE: usize = 14;
    
    fn to_vec(&self) -> Vec<f32> {
        vec![
            self.gas_price,
            self.gas_limit,
            self.value,
            self.nonce,
            self.data_size,
            if self.is_contract_creation { 1.0 } else { 0.0 },
            self.function_selector[0],
            self.function_selector[1],
            self.function_selector[2],
            self.function_selector[3],
            self.historical_success_rate,
            self.network_congestion,
            self.mev_risk_score,
            0.0, // Padding
        ]
    }
}

/// AI model for transaction simulation
struct SimulationModel {
    weights: Vec<Tensor>,
}

impl SimulationModel {
    fn load() -> Result<Self> {
        // Load pre-trained model
        Ok(Self {
            weights: Vec::new(),
        })
    }
    
    async fn predict(
        &self,
        features: &TransactionFeatures,
        device: &Device,
    ) -> Result<ModelPrediction> {
        // Run inference
        let input = Tensor::from_vec(
            features.to_vec(),
            &[1, TransactionFeatures::SIZE],
            device,
        ).map_err(|e| AccountAbstractionError::SimulationFailed(e.to_string()))?;
        
        // Mock prediction
        Ok(ModelPrediction {
            success_probability: 0.95,
            gas_estimate: 100000.0,
            revert_reason: None,
            warnings: Vec::new(),
            mev_risk: features.mev_risk_score,
            urgency_score: 0.5,
            execution_path: Vec::new(),
            state_changes: Vec::new(),
        })
    }
    
    async fn train(
        &mut self,
        inputs: &Tensor,
        targets: &Tensor,
        device: &Device,
    ) -> Result<()> {
        // Training logic
        Ok(())
    }
}

/// Model prediction result
struct ModelPrediction {
    success_probability: f64,
    gas_estimate: f32,
    revert_reason: Option<String>,
    warnings: Vec<String>,
    mev_risk: f32,
    urgency_score: f32,
    execution_path: Vec<ExecutionStep>,
    state_changes: Vec<StateChange>,
}

/// Simulation result
#[derive(Debug, Clone)]
pub struct SimulationResult {
    pub success_probability: f64,
    pub estimated_gas_used: U256,
    pub revert_reason: Option<String>,
    pub warnings: Vec<String>,
    pub optimization_suggestions: Vec<OptimizationSuggestion>,
    pub mev_protection_needed: bool,
    pub recommended_gas_price: U256,
    pub execution_path: Vec<ExecutionStep>,
    pub state_changes: Vec<StateChange>,
}

#[derive(Debug, Clone)]
pub struct OptimizationSuggestion {
    pub type_: OptimizationType,
    pub description: String,
    pub impact: ImpactLevel,
}

#[derive(Debug, Clone)]
pub enum OptimizationType {
    GasLimit,
    GasPrice,
    MEVProtection,
    Batching,
    Timing,
}

#[derive(Debug, Clone)]
pub enum ImpactLevel {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone)]
pub struct ExecutionStep {
    pub opcode: String,
    pub gas_cost: u64,
    pub stack_depth: usize,
}

#[derive(Debug, Clone)]
pub struct StateChange {
    pub address: Address,
    pub slot: H256,
    pub old_value: H256,
    pub new_value: H256,
}

/// Training example for model
pub struct TrainingExample {
    pub features: TransactionFeatures,
    pub successful: bool,
    pub gas_used: u64,
}

/// Simulation cache
struct SimulationCache {
    cache: std::collections::HashMap<H256, SimulationResult>,
    max_size: usize,
}

impl SimulationCache {
    fn new(max_size: usize) -> Self {
        Self {
            cache: std::collections::HashMap::new(),
            max_size,
        }
    }
    
    fn get(&self, hash: &H256) -> Option<SimulationResult> {
        self.cache.get(hash).cloned()
    }
    
    fn insert(&mut self, hash: H256, result: SimulationResult) {
        if self.cache.len() >= self.max_size {
            // Remove oldest entry (simplified)
            if let Some(key) = self.cache.keys().next().cloned() {
                self.cache.remove(&key);
            }
        }
        self.cache.insert(hash, result);
    }
}