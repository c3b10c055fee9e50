//! stealthdrop-workflow/error

use std::time::Duration;

use stealthdrop_artifacts::ArtifactError;
use stealthdrop_prover::ProverError;
use thiserror::Error;

use crate::state::Step;

/// Failures of the wallet capability.
#[derive(Debug, Error)]
pub enum WalletError {
    #[error("wallet capability unavailable: {0}")]
    Unavailable(String),

    #[error("user rejected the wallet request")]
    UserRejected,

    #[error("wallet returned no accounts")]
    NoAccounts,

    #[error("wallet rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("malformed wallet response: {0}")]
    Malformed(String),
}

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("wallet capability unavailable: {0}")]
    CapabilityUnavailable(String),

    #[error("user rejected the wallet request")]
    UserRejected,

    #[error("wallet error: {0}")]
    Wallet(WalletError),

    #[error("failed to fetch artifact: {0}")]
    FetchFailure(ArtifactError),

    #[error("proving and verifying keys are not downloaded yet")]
    ArtifactsNotReady,

    #[error("Please connect a different wallet than the public wallet.")]
    DuplicateWallet,

    #[error("claim proof generation failed: {0}")]
    ComputationFailure(String),

    #[error("workflow invariant violated: {0}")]
    InvariantViolation(String),

    #[error("step {0} is locked")]
    StepLocked(Step),

    #[error("another step action is already running")]
    ActionInFlight,

    #[error("step action cancelled")]
    Cancelled,

    #[error("step action timed out after {0:?}")]
    TimedOut(Duration),

    #[error("claim submission failed: {0}")]
    Submission(String),
}

impl From<WalletError> for WorkflowError {
    fn from(err: WalletError) -> Self {
        match err {
            WalletError::Unavailable(reason) => WorkflowError::CapabilityUnavailable(reason),
            WalletError::UserRejected => WorkflowError::UserRejected,
            other => WorkflowError::Wallet(other),
        }
    }
}

impl From<ArtifactError> for WorkflowError {
    fn from(err: ArtifactError) -> Self {
        match err {
            ArtifactError::Missing(_) => WorkflowError::ArtifactsNotReady,
            other => WorkflowError::FetchFailure(other),
        }
    }
}

impl From<ProverError> for WorkflowError {
    fn from(err: ProverError) -> Self {
        match err {
            ProverError::Cancelled(_) => WorkflowError::Cancelled,
            ProverError::Busy => WorkflowError::ActionInFlight,
            ProverError::Artifact(inner) => WorkflowError::from(inner),
            other => WorkflowError::ComputationFailure(other.to_string()),
        }
    }
}
