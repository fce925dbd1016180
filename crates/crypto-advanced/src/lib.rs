pub mod bls;
pub mod kzg;
pub mod precompiles;

pub use bls::{Bls12381, BlsError};
pub use kzg::{KzgCommitment, KzgProof, KzgSettings};
pub use precompiles::{
    Bls12381Add, Bls12381Mul, Bls12381Pairing, Bls12381MapToG1, Bls12381MapToG2,
    KzgPointEvaluation
};