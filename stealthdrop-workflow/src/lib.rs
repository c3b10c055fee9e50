//! Five-step stealth airdrop claim workflow.
//!
//! 1. connect public wallet
//! 2. generate nullifier
//! 3. generate claim proof
//! 4. connect anon wallet
//! 5. claim airdrop
//!
//! [`StepGate`] decides which step may run, [`transition::apply`] computes the
//! state after a step succeeds and [`WorkflowController`] performs the side
//! effects in between.

pub mod controller;
pub mod error;
pub mod gate;
pub mod state;
pub mod transition;
pub mod wallet;

pub use controller::{
    ClaimSubmitter, WorkflowConfig, WorkflowController, WorkflowEvent, CELEBRATION_DURATION,
};
pub use error::{WalletError, WorkflowError};
pub use gate::StepGate;
pub use state::{InvalidStep, Step, WorkflowState};
pub use transition::StepEvent;
pub use wallet::{JsonRpcWallet, WalletCapability};
