use thiserror::Error;
use ethereum_types::H256;
use sha3::{Digest, Keccak256};

pub mod secp256k1_crypto;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Invalid public key")]
    InvalidPublicKey,

    #[error("Invalid private key")]
    InvalidPrivateKey,

    #[error("secp256k1 error: {0}")]
    Secp256k1(#[from] secp256k1::Error),
}

pub type Result<T> = std::result::Result<T, CryptoError>;

/// Keccak-256 digest, the hash function used for block/transaction hashing
/// and trie node addressing throughout the protocol.
pub fn keccak256(data: &[u8]) -> H256 {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    H256::from_slice(&hasher.finalize())
}