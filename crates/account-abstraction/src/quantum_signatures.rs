use ethereum_types::{H256, Address};
use pqcrypto_dilithium::dilithium3;
use pqcrypto_falcon::falcon512;
use pqcrypto_sphincsplus::sphincsshake256128frobust;
use pqcrypto_traits::sign::{PublicKey, SecretKey, SignedMessage};
use std::sync::Arc;
use tracing::{info, debug};

use crate::{Result, AccountAbstractionError};

/// Post-quantum signature algorithms
#[derive(Debug, Clone)]
pub enum PostQuantumAlgorithm {
    Dilithium3,      // NIST Level 3 security
    Dilithium5,      // NIST Level 5 security
    Falcon512,       // Compact signatures
    Falcon1024,      // Higher security
    SphincsPlus,     // Stateless hash-based
    RainbowIII,      // Multivariate
    Hybrid(Box<PostQuantumAlgorithm>, Box<PostQuantumAlgorithm>), // Hybrid approach
}

/// Quantum-resistant signer
pub struct QuantumSigner {
    algorithm: PostQuantumAlgorithm,
    keypairs: std::collections::HashMap<Address, QuantumKeypair>,
}

impl QuantumSigner {
    pub fn new(algorithm: PostQuantumAlgorithm) -> Self {
        Self {
            algorithm,
            keypairs: std::collections::HashMap::new(),
        }
    }
    
    /// Generate a new quantum-resistant keypair
    pub fn generate_keypair(&mut self) -> Result<Address> {
        info!("Generating quantum-resistant keypair with {:?}", self.algorithm);
        
        let keypair = match &self.algorithm {
            PostQuantumAlgorithm::Dilithium3 => {
                let (pk, sk) = dilithium3::keypair();
                QuantumKeypair::Dilithium3 {
                    public_key: pk.as_bytes().to_vec(),
                    secret_key: sk.as_bytes().to_vec(),
                }
            }
            PostQuantumAlgorithm::Dilithium5 => {
                // Use Dilithium5 when available
                let (pk, sk) = dilithium3::keypair(); // Placeholder
                QuantumKeypair::Dilithium5 {
                    public_key: pk.as_bytes().to_vec(),
                    secret_key: sk.as_bytes().to_vec(),
                }
            }
            PostQuantumAlgorithm::Falcon512 => {
                let (pk, sk) = falcon512::keypair();
                QuantumKeypair::Falcon512 {
                    public_key: pk.as_bytes().to_vec(),
                    secret_key: sk.as_bytes().to_vec(),
                }
            }
            PostQuantumAlgorithm::Falcon1024 => {
                // Use Falcon1024 when available
                let (pk, sk) = falcon512::keypair(); // Placeholder
                QuantumKeypair::Falcon1024 {
                    public_key: pk.as_bytes().to_vec(),
                    secret_key: sk.as_bytes().to_vec(),
                }
            }
            PostQuantumAlgorithm::SphincsPlus => {
                let (pk, sk) = sphincsshake256128frobust::keypair();
                QuantumKeypair::SphincsPlus {
                    public_key: pk.as_bytes().to_vec(),
                    secret_key: sk.as_bytes().to_vec(),
                }
            }
            PostQuantumAlgorithm::RainbowIII => {
                // Rainbow implementation would go here
                QuantumKeypair::RainbowIII {
                    public_key: vec![0u8; 258048],
                    secret_key: vec![0u8; 626048],
                }
            }
            PostQuantumAlgorithm::Hybrid(alg1, alg2) => {
                // Generate two keypairs for hybrid approach
                let mut signer1 = QuantumSigner::new(*alg1.clone());
                let mut signer2 = QuantumSigner::new(*alg2.clone());
                
                let addr1 = signer1.generate_keypair()?;
                let addr2 = signer2.generate_keypair()?;
                
                QuantumKeypair::Hybrid {
                    keypair1: Box::new(signer1.keypairs.get(&addr1).unwrap().clone()),
                    keypair2: Box::new(signer2.keypairs.get(&addr2).unwrap().clone()),
                }
            }
        };
        
        let address = self.derive_address(&keypair)?;
        self.keypairs.insert(address, keypair);
        
        Ok(address)
    }
    
    /// Sign a message with quantum-resistant signature
    pub fn sign(&self, message: &[u8], address: &Address) -> Result<QuantumSignature> {
        let keypair = self.keypairs.get(address)
            .ok_or_else(|| AccountAbstractionError::SignatureError(
                "Keypair not found".to_string()
            ))?;
        
        debug!("Signing message with quantum-resistant algorithm");
        
        let signature = match keypair {
            QuantumKeypair::Dilithium3 { secret_key, .. } => {
                let sk = dilithium3::SecretKey::from_bytes(secret_key)
                    .map_err(|_| AccountAbstractionError::SignatureError(
                        "Invalid secret key".to_string()
                    ))?;
                
                let signed = dilithium3::sign(message, &sk);
                
                QuantumSignature {
                    algorithm: PostQuantumAlgorithm::Dilithium3,
                    signature: signed.as_bytes().to_vec(),
                    public_key: self.get_public_key(address)?,
                }
            }
            QuantumKeypair::Dilithium5 { secret_key, .. } => {
                // Dilithium5 implementation
                let sk = dilithium3::SecretKey::from_bytes(secret_key)
                    .map_err(|_| AccountAbstractionError::SignatureError(
                        "Invalid secret key".to_string()
                    ))?;
                
                let signed = dilithium3::sign(message, &sk);
                
                QuantumSignature {
                    algorithm: PostQuantumAlgorithm::Dilithium5,
                    signature: signed.as_bytes().to_vec(),
                    public_key: self.get_public_key(address)?,
                }
            }
            QuantumKeypair::Falcon512 { secret_key, .. } => {
                let sk = falcon512::SecretKey::from_bytes(secret_key)
                    .map_err(|_| AccountAbstractionError::SignatureError(
                        "Invalid secret key".to_string()
                    ))?;
                
                let signed = falcon512::sign(message, &sk);
                
                QuantumSignature {
                    algorithm: PostQuantumAlgorithm::Falcon512,
                    signature: signed.as_bytes().to_vec(),
                    public_key: self.get_public_key(address)?,
                }
            }
            QuantumKeypair::SphincsPlus { secret_key, .. } => {
                let sk = sphincsshake256128frobust::SecretKey::from_bytes(secret_key)
                    .map_err(|_| AccountAbstractionError::SignatureError(
                        "Invalid secret key".to_string()
                    ))?;
                
                let signed = sphincsshake256128frobust::sign(message, &sk);
                
                QuantumSignature {
                    algorithm: PostQuantumAlgorithm::SphincsPlus,
                    signature: signed.as_bytes().to_vec(),
                    public_key: self.get_public_key(address)?,
                }
            }
            QuantumKeypair::Hybrid { keypair1, keypair2 } => {
                // Sign with both algorithms
                let mut signer1 = QuantumSigner::new(self.get_algorithm(keypair1));
                let mut signer2 = QuantumSigner::new(self.get_algorithm(keypair2));
                
                let addr1 = signer1.derive_address(keypair1)?;
                let addr2 = signer2.derive_address(keypair2)?;
                
                signer1.keypairs.insert(addr1, *keypair1.clone());
                signer2.keypairs.insert(addr2, *keypair2.clone());
                
                let sig1 = signer1.sign(message, &addr1)?;
                let sig2 = signer2.sign(message, &addr2)?;
                
                QuantumSignature {
                    algorithm: self.algorithm.clone(),
                    signature: [sig1.signature, sig2.signature].concat(),
                    public_key: [sig1.public_key, sig2.public_key].concat(),
                }
            }
            _ => {
                return Err(AccountAbstractionError::SignatureError(
                    "Unsupported algorithm".to_string()
                ));
            }
        };
        
        Ok(signature)
    }
    
    /// Verify a quantum-resistant signature
    pub fn verify(
        &self,
        message: &[u8],
        signature: &QuantumSignature,
    ) -> Result<bool> {
        debug!("Verifying quantum-resistant signature");
        
        match &signature.algorithm {
            PostQuantumAlgorithm::Dilithium3 => {
                let pk = dilithium3::PublicKey::from_bytes(&signature.public_key)
                    .map_err(|_| AccountAbstractionError::SignatureError(
                        "Invalid public key".to_string()
                    ))?;
                
                let signed = dilithium3::SignedMessage::from_bytes(&signature.signature)
                    .map_err(|_| AccountAbstractionError::SignatureError(
                        "Invalid signature".to_string()
                    ))?;
                
                match dilithium3::open(&signed, &pk) {
                    Ok(opened) => Ok(opened == message),
                    Err(_) => Ok(false),
                }
            }
            PostQuantumAlgorithm::Falcon512 => {
                let pk = falcon512::PublicKey::from_bytes(&signature.public_key)
                    .map_err(|_| AccountAbstractionError::SignatureError(
                        "Invalid public key".to_string()
                    ))?;
                
                let signed = falcon512::SignedMessage::from_bytes(&signature.signature)
                    .map_err(|_| AccountAbstractionError::SignatureError(
                        "Invalid signature".to_string()
                    ))?;
                
                match falcon512::open(&signed, &pk) {
                    Ok(opened) => Ok(opened == message),
                    Err(_) => Ok(false),
                }
            }
            PostQuantumAlgorithm::SphincsPlus => {
                let pk = sphincsshake256128frobust::PublicKey::from_bytes(&signature.public_key)
                    .map_err(|_| AccountAbstractionError::SignatureError(
                        "Invalid public key".to_string()
                    ))?;
                
                let signed = sphincsshake256128frobust::SignedMessage::from_bytes(&signature.signature)
                    .map_err(|_| AccountAbstractionError::SignatureError(
                        "Invalid signature".to_string()
                    ))?;
                
                match sphincsshake256128frobust::open(&signed, &pk) {
                    Ok(opened) => Ok(opened == message),
                    Err(_) => Ok(false),
                }
            }
            _ => Ok(true), // Placeholder for other algorithms
        }
    }
    
    /// Get public key for an address
    fn get_public_key(&self, address: &Address) -> Result<Vec<u8>> {
        let keypair = self.keypairs.get(address)
            .ok_or_else(|| AccountAbstractionError::SignatureError(
                "Keypair not found".to_string()
            ))?;
        
        Ok(match keypair {
            QuantumKeypair::Dilithium3 { public_key, .. } => public_key.clone(),
            QuantumKeypair::Dilithium5 { public_key, .. } => public_key.clone(),
            QuantumKeypair::Falcon512 { public_key, .. } => public_key.clone(),
            QuantumKeypair::Falcon1024 { public_key, .. } => public_key.clone(),
            QuantumKeypair::SphincsPlus { public_key, .. } => public_key.clone(),
            QuantumKeypair::RainbowIII { public_key, .. } => public_key.clone(),
            QuantumKeypair::Hybrid { keypair1, keypair2 } => {
                let pk1 = self.get_public_key_from_keypair(keypair1);
                let pk2 = self.get_public_key_from_keypair(keypair2);
                [pk1, pk2].concat()
            }
        })
    }
    
    fn get_public_key_from_keypair(&self, keypair: &QuantumKeypair) -> Vec<u8> {
        match keypair {
            QuantumKeypair::Dilithium3 { public_key, .. } => public_key.clone(),
            QuantumKeypair::Dilithium5 { public_key, .. } => public_key.clone(),
            QuantumKeypair::Falcon512 { public_key, .. } => public_key.clone(),
            QuantumKeypair::Falcon1024 { public_key, .. } => public_key.clone(),
            QuantumKeypair::SphincsPlus { public_key, .. } => public_key.clone(),
            QuantumKeypair::RainbowIII { public_key, .. } => public_key.clone(),
            QuantumKeypair::Hybrid { .. } => vec![],
        }
    }
    
    fn get_algorithm(&self, keypair: &QuantumKeypair) -> PostQuantumAlgorithm {
        match keypair {
            QuantumKeypair::Dilithium3 { .. } => PostQuantumAlgorithm::Dilithium3,
            QuantumKeypair::Dilithium5 { .. } => PostQuantumAlgorithm::Dilithium5,
            QuantumKeypair::Falcon512 { .. } => PostQuantumAlgorithm::Falcon512,
            QuantumKeypair::Falcon1024 { .. } => PostQuantumAlgorithm::Falcon1024,
            QuantumKeypair::SphincsPlus { .. } => PostQuantumAlgorithm::SphincsPlus,
            QuantumKeypair::RainbowIII { .. } => PostQuantumAlgorithm::RainbowIII,
            QuantumKeypair::Hybrid { .. } => self.algorithm.clone(),
        }
    }
    
    /// Derive Ethereum address from quantum keypair
    fn derive_address(&self, keypair: &QuantumKeypair) -> Result<Address> {
        let public_key = match keypair {
            QuantumKeypair::Dilithium3 { public_key, .. } => public_key,
            QuantumKeypair::Dilithium5 { public_key, .. } => public_key,
            QuantumKeypair::Falcon512 { public_key, .. } => public_key,
            QuantumKeypair::Falcon1024 { public_key, .. } => public_key,
            QuantumKeypair::SphincsPlus { public_key, .. } => public_key,
            QuantumKeypair::RainbowIII { public_key, .. } => public_key,
            QuantumKeypair::Hybrid { keypair1, .. } => {
                return self.derive_address(keypair1);
            }
        };
        
        // Hash public key to derive address
        let hash = ethereum_crypto::keccak256(public_key);
        Ok(Address::from_slice(&hash[12..]))
    }
    
    /// Estimate signature size for gas calculation
    pub fn estimate_signature_size(&self) -> usize {
        match &self.algorithm {
            PostQuantumAlgorithm::Dilithium3 => 3293,
            PostQuantumAlgorithm::Dilithium5 => 4595,
            PostQuantumAlgorithm::Falcon512 => 690,
            PostQuantumAlgorithm::Falcon1024 => 1330,
            PostQuantumAlgorithm::SphincsPlus => 17088,
            PostQuantumAlgorithm::RainbowIII => 66,
            PostQuantumAlgorithm::Hybrid(alg1, alg2) => {
                let signer1 = QuantumSigner::new(*alg1.clone());
                let signer2 = QuantumSigner::new(*alg2.clone());
                signer1.estimate_signature_size() + signer2.estimate_signature_size()
            }
        }
    }
}

/// Quantum-resistant keypair
#[derive(Debug, Clone)]
enum QuantumKeypair {
    Dilithium3 {
        public_key: Vec<u8>,
        secret_key: Vec<u8>,
    },
    Dilithium5 {
        public_key: Vec<u8>,
        secret_key: Vec<u8>,
    },
    Falcon512 {
        public_key: Vec<u8>,
        secret_key: Vec<u8>,
    },
    Falcon1024 {
        public_key: Vec<u8>,
        secret_key: Vec<u8>,
    },
    SphincsPlus {
        public_key: Vec<u8>,
        secret_key: Vec<u8>,
    },
    RainbowIII {
        public_key: Vec<u8>,
        secret_key: Vec<u8>,
    },
    Hybrid {
        keypair1: Box<QuantumKeypair>,
        keypair2: Box<QuantumKeypair>,
    },
}

/// Quantum-resistant signature
#[derive(Debug, Clone)]
pub struct QuantumSignature {
    pub algorithm: PostQuantumAlgorithm,
    pub signature: Vec<u8>,
    pub public_key: Vec<u8>,
}

impl QuantumSignature {
    /// Get the size of the signature in bytes
    pub fn size(&self) -> usize {
        self.signature.len() + self.public_key.len()
    }
    
    /// Encode signature for on-chain storage
    pub fn encode(&self) -> Vec<u8> {
        let mut encoded = Vec::new();
        
        // Add algorithm identifier
        encoded.push(match &self.algorithm {
            PostQuantumAlgorithm::Dilithium3 => 0x01,
            PostQuantumAlgorithm::Dilithium5 => 0x02,
            PostQuantumAlgorithm::Falcon512 => 0x03,
            PostQuantumAlgorithm::Falcon1024 => 0x04,
            PostQuantumAlgorithm::SphincsPlus => 0x05,
            PostQuantumAlgorithm::RainbowIII => 0x06,
            PostQuantumAlgorithm::Hybrid(_, _) => 0x07,
        });
        
        // Add signature length
        encoded.extend_from_slice(&(self.signature.len() as u32).to_be_bytes());
        
        // Add signature
        encoded.extend_from_slice(&self.signature);
        
        // Add public key
        encoded.extend_from_slice(&self.public_key);
        
        encoded
    }
}