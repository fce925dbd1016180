use crate::{Result, ZkMLError};

/// ML circuit for zero-knowledge proofs
pub struct MLCircuit {
    constraints: Vec<Constraint>,
    num_variables: usize,
    gpu_enabled: bool,
}

impl MLCircuit {
    pub fn new() -> Self {
        Self {
            constraints: Vec::new(),
            num_variables: 0,
            gpu_enabled: false,
        }
    }
    
    pub fn add_linear_layer(
        &mut self,
        weights: &[f32],
        bias: &[f32],
        activation: &str,
    ) -> Result<()> {
        // Add constraints for linear layer
        self.constraints.push(Constraint::Linear);
        Ok(())
    }
    
    pub fn add_conv2d_layer(
        &mut self,
        kernels: &[f32],
        bias: &[f32],
        stride: usize,
        padding: usize,
    ) -> Result<()> {
        // Add constraints for conv2d layer
        self.constraints.push(Constraint::Conv2D);
        Ok(())
    }
    
    pub fn add_attention_layer(
        &mut self,
        num_heads: usize,
        dim: usize,
        qkv_weights: &[f32],
    ) -> Result<()> {
        // Add constraints for attention layer
        self.constraints.push(Constraint::Attention);
        Ok(())
    }
    
    pub fn add_normalization_layer(
        &mut self,
        gamma: &[f32],
        beta: &[f32],
        epsilon: f32,
    ) -> Result<()> {
        // Add constraints for normalization
        self.constraints.push(Constraint::Normalization);
        Ok(())
    }
    
    pub fn num_constraints(&self) -> usize {
        self.constraints.len() * 1000 // Mock constraint count
    }
    
    pub fn create_witness(
        &self,
        input: &[Vec<u8>],
        output: &[Vec<u8>],
    ) -> Result<Vec<Vec<u8>>> {
        // Create witness for the circuit
        Ok(vec![vec![0u8; 32]])
    }
    
    pub fn eliminate_common_subexpressions(&mut self) -> Result<()> {
        // Optimization: CSE elimination
        Ok(())
    }
    
    pub fn constant_folding(&mut self) -> Result<()> {
        // Optimization: constant folding
        Ok(())
    }
    
    pub fn gate_reduction(&mut self) -> Result<()> {
        // Optimization: reduce gates
        Ok(())
    }
    
    pub fn enable_gpu_acceleration(&mut self) -> Result<()> {
        self.gpu_enabled = true;
        Ok(())
    }
}

#[derive(Debug, Clone)]
enum Constraint {
    Linear,
    Conv2D,
    Attention,
    Normalization,
}

/// Circuit builder for constructing ML circuits
pub struct CircuitBuilder {
    circuit: MLCircuit,
}

impl CircuitBuilder {
    pub fn new() -> Self {
        Self {
            circuit: MLCircuit::new(),
        }
    }
    
    pub fn build(self) -> MLCircuit {
        self.circuit
    }
}