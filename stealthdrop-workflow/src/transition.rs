//! Pure step-completion transitions.
//!
//! Each successful step action yields one [`StepEvent`]; [`apply`] turns the
//! previous state and that event into the next state, or rejects it without
//! touching anything.

use stealthdrop_common::Nullifier;

use crate::{
    error::WorkflowError,
    gate::StepGate,
    state::{Step, WorkflowState},
};

/// Outcome of a successful step action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StepEvent {
    PublicWalletConnected(String),
    NullifierGenerated(Nullifier),
    ProofGenerated(Vec<u8>),
    AnonWalletConnected(String),
    AirdropClaimed,
}

impl StepEvent {
    pub fn step(&self) -> Step {
        match self {
            StepEvent::PublicWalletConnected(_) => Step::ConnectPublicWallet,
            StepEvent::NullifierGenerated(_) => Step::GenerateNullifier,
            StepEvent::ProofGenerated(_) => Step::GenerateClaimProof,
            StepEvent::AnonWalletConnected(_) => Step::ConnectAnonWallet,
            StepEvent::AirdropClaimed => Step::ClaimAirdrop,
        }
    }
}

pub fn apply(state: &WorkflowState, event: StepEvent) -> Result<WorkflowState, WorkflowError> {
    let step = event.step();
    let mut next = StepGate::mark_complete(state, step)?;

    match event {
        StepEvent::PublicWalletConnected(address) => {
            next.public_wallet_address = Some(address);
        }
        StepEvent::NullifierGenerated(nullifier) => {
            if state.public_wallet_address.is_none() {
                return Err(WorkflowError::InvariantViolation(
                    "nullifier generated without a public wallet".into(),
                ));
            }
            if nullifier.public_key.is_empty() {
                return Err(WorkflowError::InvariantViolation(
                    "nullifier carries no public key".into(),
                ));
            }
            next.nullifier = Some(nullifier);
        }
        StepEvent::ProofGenerated(proof) => {
            if state.nullifier.is_none() {
                return Err(WorkflowError::InvariantViolation(
                    "proof generated without a nullifier".into(),
                ));
            }
            next.proof = Some(proof);
        }
        StepEvent::AnonWalletConnected(address) => {
            // Exact match, as the wallet reports it.
            if state.public_wallet_address.as_deref() == Some(address.as_str()) {
                return Err(WorkflowError::DuplicateWallet);
            }
            next.anon_wallet_address = Some(address);
        }
        StepEvent::AirdropClaimed => {}
    }

    Ok(next)
}
