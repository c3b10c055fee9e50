//! Workflow state and the fixed list of claim steps.

use std::fmt;

use serde::{Deserialize, Serialize};
use stealthdrop_common::Nullifier;
use thiserror::Error;

/// The five claim steps, in their fixed order. Serialized as the 1-based
/// index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Step {
    ConnectPublicWallet = 1,
    GenerateNullifier = 2,
    GenerateClaimProof = 3,
    ConnectAnonWallet = 4,
    ClaimAirdrop = 5,
}

impl Step {
    pub const COUNT: usize = 5;

    pub const ALL: [Step; Step::COUNT] = [
        Step::ConnectPublicWallet,
        Step::GenerateNullifier,
        Step::GenerateClaimProof,
        Step::ConnectAnonWallet,
        Step::ClaimAirdrop,
    ];

    /// 1-based position in the workflow.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Step> {
        index
            .checked_sub(1)
            .and_then(|i| Step::ALL.get(i))
            .copied()
    }

    pub fn previous(self) -> Option<Step> {
        Step::from_index(self.index() - 1)
    }

    pub fn next(self) -> Option<Step> {
        Step::from_index(self.index() + 1)
    }

    pub fn label(self) -> &'static str {
        match self {
            Step::ConnectPublicWallet => "Connect Public Wallet",
            Step::GenerateNullifier => "Generate a Unique Nullifier",
            Step::GenerateClaimProof => "Generate Claim Proof",
            Step::ConnectAnonWallet => "Connect Anon Wallet",
            Step::ClaimAirdrop => "Claim Airdrop",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Step::ConnectPublicWallet => {
                "Connect your public wallet to which is eligible for the airdrop."
            }
            Step::GenerateNullifier => {
                "Generate a unique nullifier for your claiming wallet, this will be used to claim the airdrop and must be kept secret."
            }
            Step::GenerateClaimProof => "Generate a ZK proof to claim the airdrop.",
            Step::ConnectAnonWallet => {
                "Connect your anon wallet to which the airdrop will be claimed."
            }
            Step::ClaimAirdrop => "Claim the airdrop using your anon wallet.",
        }
    }

    pub fn button_label(self) -> &'static str {
        match self {
            Step::ConnectPublicWallet => "Connect",
            Step::GenerateNullifier | Step::GenerateClaimProof => "Generate",
            Step::ConnectAnonWallet | Step::ClaimAirdrop => "Claim",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("no claim step {0}, steps run from 1 to 5")]
pub struct InvalidStep(pub u8);

impl From<Step> for u8 {
    fn from(step: Step) -> u8 {
        step as u8
    }
}

impl TryFrom<u8> for Step {
    type Error = InvalidStep;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        Step::from_index(usize::from(index)).ok_or(InvalidStep(index))
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.index(), self.label())
    }
}

/// Everything the claim workflow has learned so far.
///
/// Only the controller holds one of these, and it is replaced as a whole after
/// each successful step.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowState {
    pub active_step: Option<Step>,
    pub completed: [bool; Step::COUNT],
    pub public_wallet_address: Option<String>,
    pub anon_wallet_address: Option<String>,
    pub nullifier: Option<Nullifier>,
    #[serde(with = "proof_hex", default)]
    pub proof: Option<Vec<u8>>,
}

impl Default for WorkflowState {
    fn default() -> Self {
        Self {
            active_step: Some(Step::ConnectPublicWallet),
            completed: [false; Step::COUNT],
            public_wallet_address: None,
            anon_wallet_address: None,
            nullifier: None,
            proof: None,
        }
    }
}

impl WorkflowState {
    pub fn is_completed(&self, step: Step) -> bool {
        self.completed[step.index() - 1]
    }

    pub fn is_terminal(&self) -> bool {
        self.completed.iter().all(|done| *done)
    }

    /// First step not yet completed, if any.
    pub fn next_pending(&self) -> Option<Step> {
        Step::ALL.into_iter().find(|step| !self.is_completed(*step))
    }
}

mod proof_hex {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(proof: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match proof {
            Some(bytes) => serializer.serialize_some(&format!("0x{}", hex::encode(bytes))),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let Some(s) = Option::<String>::deserialize(deserializer)? else {
            return Ok(None);
        };
        let s = s.strip_prefix("0x").unwrap_or(&s);
        hex::decode(s).map(Some).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_state_opens_on_first_step() {
        let state = WorkflowState::default();
        assert_eq!(state.active_step, Some(Step::ConnectPublicWallet));
        assert_eq!(state.completed, [false; 5]);
        assert_eq!(state.next_pending(), Some(Step::ConnectPublicWallet));
        assert!(!state.is_terminal());
    }

    #[test]
    fn step_indices_round_trip() {
        for step in Step::ALL {
            assert_eq!(Step::from_index(step.index()), Some(step));
        }
        assert_eq!(Step::from_index(0), None);
        assert_eq!(Step::from_index(6), None);
        assert_eq!(Step::ConnectPublicWallet.previous(), None);
        assert_eq!(Step::ClaimAirdrop.next(), None);
    }

    #[test]
    fn proof_serializes_as_hex() {
        let state = WorkflowState {
            proof: Some(vec![0xde, 0xad]),
            ..WorkflowState::default()
        };
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["proof"], "0xdead");
        assert_eq!(json["activeStep"], 1);

        let back: WorkflowState = serde_json::from_value(json).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn steps_serialize_by_index() {
        assert_eq!(serde_json::to_value(Step::GenerateClaimProof).unwrap(), 3);
        assert_eq!(
            serde_json::from_value::<Step>(serde_json::json!(5)).unwrap(),
            Step::ClaimAirdrop
        );
        assert_eq!(Step::try_from(0u8), Err(InvalidStep(0)));
        assert!(serde_json::from_value::<Step>(serde_json::json!(0)).is_err());
        assert!(serde_json::from_value::<Step>(serde_json::json!(6)).is_err());
        assert!(serde_json::from_value::<Step>(serde_json::json!("claimAirdrop")).is_err());
    }
}
