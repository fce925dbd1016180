use ethereum_types::{H256, Address};
use crate::Result;

/// ML oracle for off-chain computation
pub struct MLOracle {
    endpoint: String,
    auth_token: String,
}

impl MLOracle {
    pub fn new(endpoint: String) -> Self {
        Self {
            endpoint,
            auth_token: String::new(),
        }
    }
    
    pub async fn request(&self, req: OracleRequest) -> Result<OracleResponse> {
        // Send request to oracle
        Ok(OracleResponse {
            request_id: req.id,
            result: vec![0.0; 10],
            proof: vec![0u8; 256],
        })
    }
}

#[derive(Debug, Clone)]
pub struct OracleRequest {
    pub id: H256,
    pub model_id: String,
    pub input: Vec<f32>,
    pub requester: Address,
}

#[derive(Debug, Clone)]
pub struct OracleResponse {
    pub request_id: H256,
    pub result: Vec<f32>,
    pub proof: Vec<u8>,
}