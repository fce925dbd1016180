use ethereum_types::{H256, U256};
use ark_ff::{Field, PrimeField};
use ark_poly::polynomial::univariate::DensePolynomial;
use ark_ec::pairing::Pairing;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{Result, VerkleError};
use crate::node::{VerkleNode, NodeType};
use crate::tree::VerkleConfig;
use crate::proof::VerkleProof;

/// Commitment to a Verkle node
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Commitment {
    pub value: Vec<u8>,
    pub commitment_type: CommitmentType,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CommitmentType {
    IPA,
    KZG,
    Empty,
}

impl Default for CommitmentType {
    fn default() -> Self {
        Self::Empty
    }
}

/// Verkle commitment engine
pub struct VerkleCommitment {
    config: VerkleConfig,
    ipa_params: Option<IPAParams>,
    kzg_params: Option<KZGParams>,
}

/// IPA (Inner Product Argument) parameters
struct IPAParams {
    basis: Vec<Vec<u8>>,
    domain_size: usize,
}

/// KZG parameters
struct KZGParams {
    g1_points: Vec<Vec<u8>>,
    g2_points: Vec<Vec<u8>>,
    domain_size: usize,
}

impl VerkleCommitment {
    pub fn new(config: &VerkleConfig) -> Result<Self> {
        let (ipa_params, kzg_params) = match config.commitment_scheme {
            crate::tree::CommitmentScheme::IPA => {
                (Some(IPAParams::new(config.width)?), None)
            }
            crate::tree::CommitmentScheme::KZG => {
                (None, Some(KZGParams::new(config.width)?))
            }
        };
        
        Ok(Self {
            config: config.clone(),
            ipa_params,
            kzg_params,
        })
    }
    
    /// Compute commitment for a node
    pub fn compute_node_commitment(&self, node: &VerkleNode) -> Result<Commitment> {
        match &node.node_type {
            NodeType::Extension(ext) => {
                self.compute_extension_commitment(&ext.stem, ext.suffix_tree.as_deref())
            }
            NodeType::Branch(branch) => {
                let children_commitments: Vec<Commitment> = branch.children
                    .iter()
                    .map(|child| {
                        child.as_ref()
                            .map(|c| c.commitment.clone())
                            .unwrap_or_default()
                    })
                    .collect();
                
                self.compute_branch_commitment(&children_commitments, &branch.value)
            }
            NodeType::Leaf(value) => {
                self.compute_leaf_commitment(value)
            }
        }
    }
    
    /// Compute commitment for extension node
    fn compute_extension_commitment(
        &self,
        stem: &[u8],
        suffix: Option<&VerkleNode>,
    ) -> Result<Commitment> {
        let mut data = Vec::new();
        data.extend_from_slice(stem);
        
        if let Some(suffix_node) = suffix {
            data.extend_from_slice(&suffix_node.commitment.value);
        }
        
        match &self.config.commitment_scheme {
            crate::tree::CommitmentScheme::IPA => {
                self.compute_ipa_commitment(&data)
            }
            crate::tree::CommitmentScheme::KZG => {
                self.compute_kzg_commitment(&data)
            }
        }
    }
    
    /// Compute commitment for branch node
    fn compute_branch_commitment(
        &self,
        children: &[Commitment],
        value: &Option<Vec<u8>>,
    ) -> Result<Commitment> {
        let mut data = Vec::new();
        
        // Combine all children commitments
        for child in children {
            data.extend_from_slice(&child.value);
        }
        
        // Add value if present
        if let Some(val) = value {
            data.extend_from_slice(val);
        }
        
        match &self.config.commitment_scheme {
            crate::tree::CommitmentScheme::IPA => {
                self.compute_ipa_commitment(&data)
            }
            crate::tree::CommitmentScheme::KZG => {
                self.compute_kzg_commitment(&data)
            }
        }
    }
    
    /// Compute commitment for leaf node
    fn compute_leaf_commitment(&self, value: &[u8]) -> Result<Commitment> {
        match &self.config.commitment_scheme {
            crate::tree::CommitmentScheme::IPA => {
                self.compute_ipa_commitment(value)
            }
            crate::tree::CommitmentScheme::KZG => {
                self.compute_kzg_commitment(value)
            }
        }
    }
    
    /// Compute IPA commitment
    fn compute_ipa_commitment(&self, data: &[u8]) -> Result<Commitment> {
        let params = self.ipa_params.as_ref()
            .ok_or_else(|| VerkleError::CommitmentError("IPA params not initialized".to_string()))?;
        
        // Simplified IPA commitment (in production, use proper banderwagon curve)
        let mut commitment_value = vec![0u8; 32];
        
        for (i, byte) in data.iter().enumerate() {
            if i < params.basis.len() {
                for j in 0..32 {
                    if j < params.basis[i].len() {
                        commitment_value[j] ^= params.basis[i][j].wrapping_mul(*byte);
                    }
                }
            }
        }
        
        Ok(Commitment {
            value: commitment_value,
            commitment_type: CommitmentType::IPA,
        })
    }
    
    /// Compute KZG commitment
    fn compute_kzg_commitment(&self, data: &[u8]) -> Result<Commitment> {
        let params = self.kzg_params.as_ref()
            .ok_or_else(|| VerkleError::CommitmentError("KZG params not initialized".to_string()))?;
        
        // Simplified KZG commitment
        let hash = ethereum_crypto::keccak256(data);
        
        Ok(Commitment {
            value: hash.to_vec(),
            commitment_type: CommitmentType::KZG,
        })
    }
    
    /// Verify a Verkle proof
    pub fn verify_proof(&self, proof: &VerkleProof) -> Result<bool> {
        // Reconstruct the root commitment from proof
        let reconstructed = self.reconstruct_commitment_from_proof(proof)?;
        
        // Compare with claimed root
        Ok(reconstructed.value == proof.root_commitment.value)
    }
    
    fn reconstruct_commitment_from_proof(&self, proof: &VerkleProof) -> Result<Commitment> {
        // Start from leaf value
        let mut current_commitment = if let Some(value) = &proof.value {
            self.compute_leaf_commitment(value)?
        } else {
            Commitment::default()
        };
        
        // Work up through proof nodes
        for (path, sibling_commitment) in proof.proof_nodes.iter().rev() {
            // Combine current commitment with sibling
            let combined = self.combine_commitments(&current_commitment, sibling_commitment)?;
            current_commitment = combined;
        }
        
        Ok(current_commitment)
    }
    
    fn combine_commitments(&self, left: &Commitment, right: &Commitment) -> Result<Commitment> {
        let mut data = Vec::new();
        data.extend_from_slice(&left.value);
        data.extend_from_slice(&right.value);
        
        match &self.config.commitment_scheme {
            crate::tree::CommitmentScheme::IPA => {
                self.compute_ipa_commitment(&data)
            }
            crate::tree::CommitmentScheme::KZG => {
                self.compute_kzg_commitment(&data)
            }
        }
    }
}

impl IPAParams {
    fn new(width: usize) -> Result<Self> {
        // Generate random basis vectors (in production, use proper setup)
        let mut basis = Vec::new();
        
        for i in 0..width {
            let mut vec = vec![0u8; 32];
            vec[i % 32] = ((i / 32) as u8) + 1;
            basis.push(vec);
        }
        
        Ok(Self {
            basis,
            domain_size: width,
        })
    }
}

impl KZGParams {
    fn new(width: usize) -> Result<Self> {
        // Mock KZG setup (in production, use proper trusted setup)
        let g1_points = vec![vec![1u8; 48]; width];
        let g2_points = vec![vec![2u8; 96]; width];
        
        Ok(Self {
            g1_points,
            g2_points,
            domain_size: width,
        })
    }
}

/// IPA proof for Verkle trees
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IPAProof {
    pub commitments: Vec<Commitment>,
    pub evaluations: Vec<Vec<u8>>,
    pub proof: Vec<u8>,
}

impl IPAProof {
    pub fn new() -> Self {
        Self {
            commitments: Vec::new(),
            evaluations: Vec::new(),
            proof: Vec::new(),
        }
    }
    
    pub fn verify(&self, commitment: &Commitment, point: &[u8], value: &[u8]) -> Result<bool> {
        // Simplified verification (in production, implement full IPA verification)
        let hash = ethereum_crypto::keccak256(&[
            commitment.value.as_slice(),
            point,
            value,
        ].concat());
        
        Ok(hash.as_bytes() == self.proof.as_slice())
    }
}

/// Multi-proof for batch verification
#[derive(Debug, Clone)]
pub struct MultiProof {
    pub keys: Vec<Vec<u8>>,
    pub values: Vec<Option<Vec<u8>>>,
    pub commitments: Vec<Commitment>,
    pub proof: IPAProof,
}

impl MultiProof {
    pub fn new(keys: Vec<Vec<u8>>, values: Vec<Option<Vec<u8>>>) -> Self {
        Self {
            keys,
            values,
            commitments: Vec::new(),
            proof: IPAProof::new(),
        }
    }
    
    pub fn verify(&self, root_commitment: &Commitment) -> Result<bool> {
        // Verify all key-value pairs in batch
        for (i, key) in self.keys.iter().enumerate() {
            if let Some(value) = &self.values[i] {
                if !self.proof.verify(&self.commitments[i], key, value)? {
                    return Ok(false);
                }
            }
        }
        
        Ok(true)
    }
}