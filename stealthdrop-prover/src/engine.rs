//! Contract of the external proving engine.
//!
//! The engine is an opaque collaborator (a halo2 builder with the plume and
//! merkle gadgets loaded). Its calls are order sensitive: statements are
//! asserted against a configured circuit, instances are materialised from the
//! asserted statements, and keys must be loaded before `prove`. The pipeline
//! in [`crate::pipeline`] is the only caller and always follows that order.

use stealthdrop_common::{CircuitConfig, MerkleData, Nullifier};

use crate::error::EngineError;

/// Arguments of the plume signature-validity statement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignatureStatement {
    pub nullifier: String,
    pub s: String,
    pub c: String,
    pub message: String,
    pub public_key: String,
}

impl From<&Nullifier> for SignatureStatement {
    fn from(n: &Nullifier) -> Self {
        Self {
            nullifier: n.plume.clone(),
            s: n.s.clone(),
            c: n.c.clone(),
            message: n.message.clone(),
            public_key: n.public_key.clone(),
        }
    }
}

/// Arguments of the eligibility-tree membership statement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MembershipStatement {
    pub root: String,
    pub public_key: String,
    pub proof: Vec<String>,
    pub proof_helper: Vec<String>,
}

impl MembershipStatement {
    pub fn new(merkle: MerkleData, public_key: impl Into<String>) -> Self {
        Self {
            root: merkle.root,
            public_key: public_key.into(),
            proof: merkle.merkle_proof,
            proof_helper: merkle.proof_helper,
        }
    }
}

/// One proving engine instance. Instances are never reused across claims and
/// never leave the context thread that created them, so they need not be
/// `Send`.
pub trait ProvingEngine {
    /// Bring up the engine and its worker pool with `threads` workers.
    fn init(&mut self, threads: usize) -> Result<(), EngineError>;

    fn configure(&mut self, config: &CircuitConfig) -> Result<(), EngineError>;

    fn assert_signature_statement(&mut self, args: &SignatureStatement)
        -> Result<(), EngineError>;

    fn assert_membership_statement(
        &mut self,
        args: &MembershipStatement,
    ) -> Result<(), EngineError>;

    /// Expose the asserted public values as circuit instances and return them.
    fn materialize_instances(&mut self) -> Result<Vec<String>, EngineError>;

    fn load_global_params(&mut self, bytes: &[u8]) -> Result<(), EngineError>;

    fn load_proving_key(&mut self, bytes: &[u8]) -> Result<(), EngineError>;

    fn load_verifying_key(&mut self, bytes: &[u8]) -> Result<(), EngineError>;

    fn prove(&mut self) -> Result<Vec<u8>, EngineError>;

    fn verify(&mut self, proof: &[u8]) -> Result<bool, EngineError>;
}

/// Builds a fresh engine for every proving context.
pub trait EngineFactory: Send + Sync {
    fn create(&self) -> Box<dyn ProvingEngine>;
}

impl<F> EngineFactory for F
where
    F: Fn() -> Box<dyn ProvingEngine> + Send + Sync,
{
    fn create(&self) -> Box<dyn ProvingEngine> {
        self()
    }
}
