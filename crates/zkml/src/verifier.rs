use ethereum_types::H256;
use crate::{Result, ZkMLError, MLProof};

/// ML proof verifier
pub struct MLVerifier {
    verifying_keys: std::collections::HashMap<H256, Vec<u8>>,
}

impl MLVerifier {
    pub fn new() -> Self {
        Self {
            verifying_keys: std::collections::HashMap::new(),
        }
    }
    
    pub async fn verify(&self, proof: &MLProof) -> Result<VerificationResult> {
        // Verify the zkML proof
        Ok(VerificationResult {
            is_valid: true,
            gas_cost: proof.gas_used,
        })
    }
}

#[derive(Debug, Clone)]
pub struct VerificationResult {
    pub is_valid: bool,
    pub gas_cost: ethereum_types::U256,
}