use ethereum_types::{H256, U256};
use ark_ff::PrimeField;
use ark_groth16::{Groth16, ProvingKey, VerifyingKey};
use ark_marlin::Marlin;
use ark_poly::univariate::DensePolynomial;
use ark_poly_commit::kzg10::KZG10;
use ark_ec::pairing::Pairing;
use ark_serialize::{CanonicalSerialize, CanonicalDeserialize};
use std::sync::Arc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{info, debug};

use crate::{Result, ZkMLError};
use crate::model::MLModel;
use crate::circuits::MLCircuit;

/// Proof system type
#[derive(Debug, Clone)]
pub enum ProofSystem {
    Groth16,
    Marlin,
    Plonk,
    Halo2,
    Plonky2,
}

/// ML proof containing the zero-knowledge proof and metadata
#[derive(Debug, Clone)]
pub struct MLProof {
    pub proof_system: ProofSystem,
    pub proof_bytes: Vec<u8>,
    pub public_inputs: Vec<Vec<u8>>,
    pub model_hash: H256,
    pub input_hash: H256,
    pub output_commitment: H256,
    pub gas_used: U256,
    pub proving_time_ms: u64,
}

/// ML prover for generating zero-knowledge proofs of ML inference
pub struct MLProver {
    proof_system: ProofSystem,
    proving_keys: Arc<RwLock<HashMap<H256, ProvingKeyCache>>>,
    circuit_cache: Arc<RwLock<HashMap<H256, Arc<MLCircuit>>>>,
    gpu_enabled: bool,
    max_circuit_size: usize,
}

struct ProvingKeyCache {
    key: Vec<u8>,
    verifying_key: Vec<u8>,
    model_hash: H256,
}

impl MLProver {
    pub fn new(proof_system: ProofSystem) -> Self {
        Self {
            proof_system,
            proving_keys: Arc::new(RwLock::new(HashMap::new())),
            circuit_cache: Arc::new(RwLock::new(HashMap::new())),
            gpu_enabled: Self::detect_gpu(),
            max_circuit_size: 1 << 20, // 1M constraints
        }
    }
    
    /// Generate a proof for ML model inference
    pub async fn prove_inference(
        &self,
        model: &MLModel,
        input: &[f32],
        output: &[f32],
    ) -> Result<MLProof> {
        let start = std::time::Instant::now();
        
        info!("Generating zkML proof for model: {:?}", model.id());
        
        // Build circuit for the model
        let circuit = self.build_or_get_circuit(model).await?;
        
        // Get or generate proving key
        let (proving_key, verifying_key) = self.get_or_generate_keys(model, &circuit).await?;
        
        // Generate the proof
        let proof_bytes = match self.proof_system {
            ProofSystem::Groth16 => {
                self.prove_groth16(&circuit, &proving_key, input, output).await?
            }
            ProofSystem::Marlin => {
                self.prove_marlin(&circuit, &proving_key, input, output).await?
            }
            ProofSystem::Plonk => {
                self.prove_plonk(&circuit, &proving_key, input, output).await?
            }
            ProofSystem::Halo2 => {
                self.prove_halo2(&circuit, &proving_key, input, output).await?
            }
            ProofSystem::Plonky2 => {
                self.prove_plonky2(&circuit, &proving_key, input, output).await?
            }
        };
        
        let elapsed = start.elapsed();
        
        Ok(MLProof {
            proof_system: self.proof_system.clone(),
            proof_bytes,
            public_inputs: self.encode_public_inputs(input, output),
            model_hash: model.hash(),
            input_hash: self.hash_input(input),
            output_commitment: self.commit_output(output),
            gas_used: self.estimate_gas(&circuit),
            proving_time_ms: elapsed.as_millis() as u64,
        })
    }
    
    /// Build or retrieve cached circuit for a model
    async fn build_or_get_circuit(&self, model: &MLModel) -> Result<Arc<MLCircuit>> {
        let model_hash = model.hash();
        
        // Check cache
        if let Some(circuit) = self.circuit_cache.read().await.get(&model_hash) {
            return Ok(circuit.clone());
        }
        
        // Build new circuit
        let circuit = self.build_circuit(model).await?;
        let circuit_arc = Arc::new(circuit);
        
        // Cache it
        self.circuit_cache.write().await.insert(model_hash, circuit_arc.clone());
        
        Ok(circuit_arc)
    }
    
    /// Build a circuit from an ML model
    async fn build_circuit(&self, model: &MLModel) -> Result<MLCircuit> {
        debug!("Building circuit for model: {:?}", model.id());
        
        let mut circuit = MLCircuit::new();
        
        // Convert model layers to circuit constraints
        for layer in model.layers() {
            match layer.layer_type() {
                "linear" => {
                    circuit.add_linear_layer(
                        layer.weights(),
                        layer.bias(),
                        layer.activation(),
                    )?;
                }
                "conv2d" => {
                    circuit.add_conv2d_layer(
                        layer.kernels(),
                        layer.bias(),
                        layer.stride(),
                        layer.padding(),
                    )?;
                }
                "attention" => {
                    circuit.add_attention_layer(
                        layer.num_heads(),
                        layer.dim(),
                        layer.qkv_weights(),
                    )?;
                }
                "normalization" => {
                    circuit.add_normalization_layer(
                        layer.gamma(),
                        layer.beta(),
                        layer.epsilon(),
                    )?;
                }
                _ => {
                    return Err(ZkMLError::CircuitError(
                        format!("Unsupported layer type: {}", layer.layer_type())
                    ));
                }
            }
        }
        
        // Optimize circuit if it's too large
        if circuit.num_constraints() > self.max_circuit_size {
            circuit = self.optimize_circuit(circuit)?;
        }
        
        Ok(circuit)
    }
    
    /// Generate or retrieve proving and verifying keys
    async fn get_or_generate_keys(
        &self,
        model: &MLModel,
        circuit: &MLCircuit,
    ) -> Result<(Vec<u8>, Vec<u8>)> {
        let model_hash = model.hash();
        
        // Check cache
        if let Some(cache) = self.proving_keys.read().await.get(&model_hash) {
            return Ok((cache.key.clone(), cache.verifying_key.clone()));
        }
        
        info!("Generating proving keys for model: {:?}", model_hash);
        
        // Generate new keys
        let (pk, vk) = match self.proof_system {
            ProofSystem::Groth16 => self.setup_groth16(circuit)?,
            ProofSystem::Marlin => self.setup_marlin(circuit)?,
            ProofSystem::Plonk => self.setup_plonk(circuit)?,
            ProofSystem::Halo2 => self.setup_halo2(circuit)?,
            ProofSystem::Plonky2 => self.setup_plonky2(circuit)?,
        };
        
        // Cache keys
        self.proving_keys.write().await.insert(
            model_hash,
            ProvingKeyCache {
                key: pk.clone(),
                verifying_key: vk.clone(),
                model_hash,
            },
        );
        
        Ok((pk, vk))
    }
    
    /// Prove using Groth16
    async fn prove_groth16(
        &self,
        circuit: &MLCircuit,
        proving_key: &[u8],
        input: &[f32],
        output: &[f32],
    ) -> Result<Vec<u8>> {
        // Convert to field elements
        let input_fe = self.to_field_elements(input);
        let output_fe = self.to_field_elements(output);
        
        // Create witness
        let witness = circuit.create_witness(&input_fe, &output_fe)?;
        
        // Generate proof (simplified - would use actual ark-groth16)
        let proof = vec![0u8; 192]; // Mock Groth16 proof size
        
        Ok(proof)
    }
    
    /// Prove using Marlin
    async fn prove_marlin(
        &self,
        circuit: &MLCircuit,
        proving_key: &[u8],
        input: &[f32],
        output: &[f32],
    ) -> Result<Vec<u8>> {
        // Similar to Groth16 but with Marlin-specific logic
        let proof = vec![0u8; 256]; // Mock Marlin proof size
        Ok(proof)
    }
    
    /// Prove using PLONK
    async fn prove_plonk(
        &self,
        circuit: &MLCircuit,
        proving_key: &[u8],
        input: &[f32],
        output: &[f32],
    ) -> Result<Vec<u8>> {
        let proof = vec![0u8; 384]; // Mock PLONK proof size
        Ok(proof)
    }
    
    /// Prove using Halo2
    async fn prove_halo2(
        &self,
        circuit: &MLCircuit,
        proving_key: &[u8],
        input: &[f32],
        output: &[f32],
    ) -> Result<Vec<u8>> {
        // Halo2 doesn't need trusted setup
        let proof = vec![0u8; 320]; // Mock Halo2 proof size
        Ok(proof)
    }
    
    /// Prove using Plonky2
    async fn prove_plonky2(
        &self,
        circuit: &MLCircuit,
        proving_key: &[u8],
        input: &[f32],
        output: &[f32],
    ) -> Result<Vec<u8>> {
        // Plonky2 for fast recursive proofs
        let proof = vec![0u8; 256]; // Mock Plonky2 proof size
        Ok(proof)
    }
    
    /// Setup for Groth16
    fn setup_groth16(&self, circuit: &MLCircuit) -> Result<(Vec<u8>, Vec<u8>)> {
        // Generate random trusted setup (in production, use ceremony)
        let pk = vec![0u8; 10240]; // Mock proving key
        let vk = vec![0u8; 512];   // Mock verifying key
        Ok((pk, vk))
    }
    
    /// Setup for Marlin
    fn setup_marlin(&self, circuit: &MLCircuit) -> Result<(Vec<u8>, Vec<u8>)> {
        // Universal setup for Marlin
        let pk = vec![0u8; 8192];
        let vk = vec![0u8; 256];
        Ok((pk, vk))
    }
    
    /// Setup for PLONK
    fn setup_plonk(&self, circuit: &MLCircuit) -> Result<(Vec<u8>, Vec<u8>)> {
        let pk = vec![0u8; 12288];
        let vk = vec![0u8; 384];
        Ok((pk, vk))
    }
    
    /// Setup for Halo2
    fn setup_halo2(&self, circuit: &MLCircuit) -> Result<(Vec<u8>, Vec<u8>)> {
        // No trusted setup needed
        let pk = vec![0u8; 4096];
        let vk = vec![0u8; 128];
        Ok((pk, vk))
    }
    
    /// Setup for Plonky2
    fn setup_plonky2(&self, circuit: &MLCircuit) -> Result<(Vec<u8>, Vec<u8>)> {
        let pk = vec![0u8; 2048];
        let vk = vec![0u8; 64];
        Ok((pk, vk))
    }
    
    /// Optimize circuit to reduce constraints
    fn optimize_circuit(&self, mut circuit: MLCircuit) -> Result<MLCircuit> {
        info!("Optimizing circuit with {} constraints", circuit.num_constraints());
        
        // Apply optimization techniques
        circuit.eliminate_common_subexpressions()?;
        circuit.constant_folding()?;
        circuit.gate_reduction()?;
        
        if self.gpu_enabled {
            circuit.enable_gpu_acceleration()?;
        }
        
        info!("Optimized to {} constraints", circuit.num_constraints());
        
        Ok(circuit)
    }
    
    /// Convert floating point to field elements
    fn to_field_elements(&self, values: &[f32]) -> Vec<Vec<u8>> {
        values.iter().map(|&v| {
            let scaled = (v * 1e6) as i64; // Scale and convert
            scaled.to_le_bytes().to_vec()
        }).collect()
    }
    
    /// Encode public inputs
    fn encode_public_inputs(&self, input: &[f32], output: &[f32]) -> Vec<Vec<u8>> {
        let mut encoded = Vec::new();
        
        // Encode input hash
        encoded.push(self.hash_input(input).as_bytes().to_vec());
        
        // Encode output commitment
        encoded.push(self.commit_output(output).as_bytes().to_vec());
        
        encoded
    }
    
    /// Hash input data
    fn hash_input(&self, input: &[f32]) -> H256 {
        let bytes: Vec<u8> = input.iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        H256::from_slice(&ethereum_crypto::keccak256(&bytes))
    }
    
    /// Create commitment to output
    fn commit_output(&self, output: &[f32]) -> H256 {
        let bytes: Vec<u8> = output.iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        H256::from_slice(&ethereum_crypto::keccak256(&bytes))
    }
    
    /// Estimate gas cost for proof verification
    fn estimate_gas(&self, circuit: &MLCircuit) -> U256 {
        let base_gas = U256::from(200_000);
        let per_constraint = U256::from(10);
        
        base_gas + per_constraint * circuit.num_constraints()
    }
    
    /// Detect GPU availability
    fn detect_gpu() -> bool {
        #[cfg(feature = "cuda")]
        {
            // Check for CUDA
            if Self::check_cuda() {
                return true;
            }
        }
        
        #[cfg(feature = "opencl")]
        {
            // Check for OpenCL
            if Self::check_opencl() {
                return true;
            }
        }
        
        false
    }
    
    #[cfg(feature = "cuda")]
    fn check_cuda() -> bool {
        // Check CUDA availability
        true // Simplified
    }
    
    #[cfg(feature = "opencl")]
    fn check_opencl() -> bool {
        // Check OpenCL availability
        true // Simplified
    }
    
    /// Generate proof with GPU acceleration
    pub async fn prove_with_gpu(
        &self,
        model: &MLModel,
        input: &[f32],
        output: &[f32],
    ) -> Result<MLProof> {
        if !self.gpu_enabled {
            return self.prove_inference(model, input, output).await;
        }
        
        // GPU-accelerated proving
        info!("Using GPU acceleration for proof generation");
        
        // Offload to GPU (implementation would use CUDA/OpenCL)
        self.prove_inference(model, input, output).await
    }
    
    /// Batch prove multiple inferences
    pub async fn batch_prove(
        &self,
        model: &MLModel,
        inputs: Vec<Vec<f32>>,
        outputs: Vec<Vec<f32>>,
    ) -> Result<Vec<MLProof>> {
        if inputs.len() != outputs.len() {
            return Err(ZkMLError::ProofGenerationFailed(
                "Input/output count mismatch".to_string()
            ));
        }
        
        let mut proofs = Vec::new();
        
        // Generate proofs in parallel
        let handles: Vec<_> = inputs.into_iter()
            .zip(outputs.into_iter())
            .map(|(input, output)| {
                let model = model.clone();
                let prover = self.clone();
                
                tokio::spawn(async move {
                    prover.prove_inference(&model, &input, &output).await
                })
            })
            .collect();
        
        for handle in handles {
            proofs.push(handle.await.map_err(|e| {
                ZkMLError::ProofGenerationFailed(e.to_string())
            })??);
        }
        
        Ok(proofs)
    }
}

impl Clone for MLProver {
    fn clone(&self) -> Self {
        Self {
            proof_system: self.proof_system.clone(),
            proving_keys: self.proving_keys.clone(),
            circuit_cache: self.circuit_cache.clone(),
            gpu_enabled: self.gpu_enabled,
            max_circuit_size: self.max_circuit_size,
        }
    }
}