//! stealthdrop-prover/error

use std::fmt;

use stealthdrop_artifacts::ArtifactError;
use stealthdrop_common::MerkleDataError;
use thiserror::Error;

/// Failure reported by the proving engine itself.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct EngineError(pub String);

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Stages of one proving run, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Init,
    Configure,
    SignatureStatement,
    MembershipStatement,
    Instances,
    GlobalParams,
    Keys,
    Prove,
    Verify,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Init => "init",
            Stage::Configure => "configure",
            Stage::SignatureStatement => "plume verify",
            Stage::MembershipStatement => "merkle verify",
            Stage::Instances => "instances",
            Stage::GlobalParams => "load params",
            Stage::Keys => "load keys",
            Stage::Prove => "prove",
            Stage::Verify => "verify",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum ProverError {
    #[error("{stage} failed: {source}")]
    Engine {
        stage: Stage,
        #[source]
        source: EngineError,
    },

    #[error("artifact error: {0}")]
    Artifact(#[from] ArtifactError),

    #[error("merkle data error: {0}")]
    Merkle(#[from] MerkleDataError),

    #[error("KZG params artifact is empty")]
    EmptyParams,

    #[error("generated proof failed self-verification")]
    SelfVerification,

    #[error("proof generation cancelled before {0}")]
    Cancelled(Stage),

    #[error("a proving context is already running for this claim")]
    Busy,

    #[error("proving context must be spawned from within a tokio runtime")]
    NoRuntime,

    #[error("failed to spawn proving context: {0}")]
    Spawn(#[from] std::io::Error),
}

impl ProverError {
    pub(crate) fn at(stage: Stage) -> impl FnOnce(EngineError) -> ProverError {
        move |source| ProverError::Engine { stage, source }
    }
}
