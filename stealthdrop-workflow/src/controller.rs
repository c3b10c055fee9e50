//! Workflow controller: runs step actions and owns the workflow state.

use std::{
    future::Future,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use serde::Serialize;
use stealthdrop_artifacts::ArtifactCache;
use stealthdrop_common::{
    claim_key_artifacts, ArtifactSpec, Nullifier, ProofRequest, ProofResponse, CLAIM_MESSAGE,
    PROVING_KEY_NAME, VERIFYING_KEY_NAME,
};
use stealthdrop_prover::ClaimProver;
use tokio::sync::{broadcast, watch, Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::{
    error::WorkflowError,
    gate::StepGate,
    state::{Step, WorkflowState},
    transition::{self, StepEvent},
    wallet::{self, WalletCapability},
};

/// How long the completion celebration stays visible.
pub const CELEBRATION_DURATION: Duration = Duration::from_millis(5000);

const EVENT_CAPACITY: usize = 64;

/// Hands the finished claim to whatever settles it.
#[async_trait]
pub trait ClaimSubmitter: Send + Sync {
    async fn submit_claim(&self, state: &WorkflowState) -> Result<(), WorkflowError>;
}

#[derive(Clone, Debug)]
pub struct WorkflowConfig {
    pub celebration: Duration,
    /// Upper bound on a single step action. `None` waits indefinitely.
    pub action_timeout: Option<Duration>,
    /// Where the claim keys are downloaded from.
    pub key_artifacts: Vec<ArtifactSpec>,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            celebration: CELEBRATION_DURATION,
            action_timeout: None,
            key_artifacts: claim_key_artifacts(),
        }
    }
}

/// User-visible notifications published by the controller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum WorkflowEvent {
    StepCompleted { step: Step },
    StepFailed { step: Step, message: String },
    Warning { step: Step, message: String },
    CelebrationStarted,
    CelebrationEnded,
}

pub struct WorkflowController {
    state: Arc<RwLock<WorkflowState>>,
    wallet: Arc<dyn WalletCapability>,
    cache: Arc<ArtifactCache>,
    prover: Option<Arc<dyn ClaimProver>>,
    submitter: Option<Arc<dyn ClaimSubmitter>>,
    config: WorkflowConfig,
    /// Held for the duration of a step action.
    action: Mutex<()>,
    events: broadcast::Sender<WorkflowEvent>,
    celebration: Arc<watch::Sender<bool>>,
    celebrated: AtomicBool,
}

impl WorkflowController {
    pub fn new(
        wallet: Arc<dyn WalletCapability>,
        cache: Arc<ArtifactCache>,
        config: WorkflowConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (celebration, _) = watch::channel(false);
        Self {
            state: Arc::new(RwLock::new(WorkflowState::default())),
            wallet,
            cache,
            prover: None,
            submitter: None,
            config,
            action: Mutex::new(()),
            events,
            celebration: Arc::new(celebration),
            celebrated: AtomicBool::new(false),
        }
    }

    pub fn with_prover(mut self, prover: Arc<dyn ClaimProver>) -> Self {
        self.prover = Some(prover);
        self
    }

    pub fn with_submitter(mut self, submitter: Arc<dyn ClaimSubmitter>) -> Self {
        self.submitter = Some(submitter);
        self
    }

    pub async fn state(&self) -> WorkflowState {
        self.state.read().await.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.events.subscribe()
    }

    /// `true` while the completion celebration is showing.
    pub fn celebration(&self) -> watch::Receiver<bool> {
        self.celebration.subscribe()
    }

    pub fn is_celebrating(&self) -> bool {
        *self.celebration.borrow()
    }

    pub async fn can_activate(&self, step: Step) -> bool {
        StepGate::can_activate(&*self.state.read().await, step)
    }

    /// Open or close a step card. Locked steps are ignored.
    pub async fn toggle(&self, step: Step) -> WorkflowState {
        let mut state = self.state.write().await;
        *state = StepGate::toggle_active(&state, step);
        state.clone()
    }

    /// Download the claim keys if this device does not hold them yet.
    pub async fn prefetch_artifacts(&self) -> Result<(), WorkflowError> {
        self.cache.prefetch(&self.config.key_artifacts).await?;
        Ok(())
    }

    /// Whether the claim-proof step has its keys available locally.
    pub fn artifacts_ready(&self) -> Result<bool, WorkflowError> {
        Ok(self
            .cache
            .resident(&[PROVING_KEY_NAME, VERIFYING_KEY_NAME])?)
    }

    /// Run the action behind `step` and, on success, complete it.
    ///
    /// Any failure leaves the workflow state exactly as it was and is
    /// published as an event before being returned.
    pub async fn trigger(
        &self,
        step: Step,
        cancel: CancellationToken,
    ) -> Result<WorkflowState, WorkflowError> {
        let _action = self
            .action
            .try_lock()
            .map_err(|_| WorkflowError::ActionInFlight)?;

        match self.run_step(step, &cancel).await {
            Ok(state) => {
                info!(%step, "step completed");
                self.publish(WorkflowEvent::StepCompleted { step });
                if state.is_terminal() {
                    self.start_celebration();
                }
                Ok(state)
            }
            Err(WorkflowError::DuplicateWallet) => {
                let err = WorkflowError::DuplicateWallet;
                warn!(%step, "{}", err);
                self.publish(WorkflowEvent::Warning {
                    step,
                    message: err.to_string(),
                });
                Err(err)
            }
            Err(err) => {
                error!("{}: {}", failure_context(step), err);
                self.publish(WorkflowEvent::StepFailed {
                    step,
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }

    async fn run_step(
        &self,
        step: Step,
        cancel: &CancellationToken,
    ) -> Result<WorkflowState, WorkflowError> {
        let snapshot = self.state().await;
        if !StepGate::can_activate(&snapshot, step) {
            return Err(WorkflowError::StepLocked(step));
        }

        // Cancelled when this returns; abandoned proving work stops at its
        // next checkpoint.
        let action_cancel = cancel.child_token();
        let _abandon = action_cancel.clone().drop_guard();

        let event = self
            .guarded(self.perform(step, &snapshot, &action_cancel), cancel)
            .await?;

        let mut state = self.state.write().await;
        let next = transition::apply(&state, event)?;
        *state = next.clone();
        Ok(next)
    }

    async fn guarded<F>(&self, action: F, cancel: &CancellationToken) -> Result<StepEvent, WorkflowError>
    where
        F: Future<Output = Result<StepEvent, WorkflowError>>,
    {
        let bounded = async {
            match self.config.action_timeout {
                Some(limit) => match tokio::time::timeout(limit, action).await {
                    Ok(result) => result,
                    Err(_) => Err(WorkflowError::TimedOut(limit)),
                },
                None => action.await,
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(WorkflowError::Cancelled),
            result = bounded => result,
        }
    }

    async fn perform(
        &self,
        step: Step,
        snapshot: &WorkflowState,
        cancel: &CancellationToken,
    ) -> Result<StepEvent, WorkflowError> {
        match step {
            Step::ConnectPublicWallet => {
                let address = wallet::connect(self.wallet.as_ref()).await?;
                info!(public_wallet = %address, "public wallet connected");
                Ok(StepEvent::PublicWalletConnected(address))
            }
            Step::GenerateNullifier => {
                let address = snapshot.public_wallet_address.as_deref().ok_or_else(|| {
                    WorkflowError::InvariantViolation("no public wallet connected".into())
                })?;
                let signature = self.wallet.custom_signature(CLAIM_MESSAGE, address).await?;
                let nullifier = Nullifier::from_signature(signature, CLAIM_MESSAGE);
                info!(plume = %nullifier.plume, "nullifier generated");
                Ok(StepEvent::NullifierGenerated(nullifier))
            }
            Step::GenerateClaimProof => self.generate_claim_proof(snapshot, cancel).await,
            Step::ConnectAnonWallet => {
                let address = wallet::connect(self.wallet.as_ref()).await?;
                info!(anon_wallet = %address, "anon wallet connected");
                Ok(StepEvent::AnonWalletConnected(address))
            }
            Step::ClaimAirdrop => {
                if let Some(submitter) = &self.submitter {
                    submitter.submit_claim(snapshot).await?;
                }
                Ok(StepEvent::AirdropClaimed)
            }
        }
    }

    async fn generate_claim_proof(
        &self,
        snapshot: &WorkflowState,
        cancel: &CancellationToken,
    ) -> Result<StepEvent, WorkflowError> {
        let prover = self.prover.as_ref().ok_or_else(|| {
            WorkflowError::CapabilityUnavailable("no proving engine configured".into())
        })?;
        let nullifier = snapshot.nullifier.clone().ok_or_else(|| {
            WorkflowError::InvariantViolation("no nullifier generated".into())
        })?;

        let request = ProofRequest {
            proving_key: self.cache.require(PROVING_KEY_NAME)?,
            verifying_key: self.cache.require(VERIFYING_KEY_NAME)?,
            nullifier,
        };

        match prover.generate_proof(request, cancel.clone()).await? {
            ProofResponse::Success { proof, message } => {
                info!(len = proof.len(), "{}", message);
                Ok(StepEvent::ProofGenerated(proof))
            }
            ProofResponse::Error { message } => Err(WorkflowError::ComputationFailure(message)),
            ProofResponse::Cancelled { .. } => Err(WorkflowError::Cancelled),
        }
    }

    fn start_celebration(&self) {
        if self.celebrated.swap(true, Ordering::SeqCst) {
            return;
        }

        let celebration = Arc::clone(&self.celebration);
        let events = self.events.clone();
        let duration = self.config.celebration;

        celebration.send_replace(true);
        let _ = events.send(WorkflowEvent::CelebrationStarted);
        info!("all steps complete, celebrating");

        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            celebration.send_replace(false);
            let _ = events.send(WorkflowEvent::CelebrationEnded);
        });
    }

    fn publish(&self, event: WorkflowEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

fn failure_context(step: Step) -> &'static str {
    match step {
        Step::ConnectPublicWallet => "Error connecting wallet",
        Step::GenerateNullifier => "Error generating nullifier",
        Step::GenerateClaimProof => "Error generating claim proof",
        Step::ConnectAnonWallet => "Error connecting anon wallet",
        Step::ClaimAirdrop => "Error claiming airdrop",
    }
}
