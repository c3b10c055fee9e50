//! Claim-proof service handed to the workflow controller.

use std::sync::Arc;

use async_trait::async_trait;
use stealthdrop_artifacts::{ArtifactCache, ArtifactFetcher};
use stealthdrop_common::{ProofRequest, ProofResponse, WorkerMessage};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{
    context::ProvingContext,
    engine::EngineFactory,
    error::ProverError,
    pipeline::{ContextDeps, ProverSettings},
};

/// Produces claim proofs. Implemented by [`ProverService`]; the workflow only
/// sees this trait.
#[async_trait]
pub trait ClaimProver: Send + Sync {
    async fn generate_proof(
        &self,
        request: ProofRequest,
        cancel: CancellationToken,
    ) -> Result<ProofResponse, ProverError>;
}

/// Spawns a fresh [`ProvingContext`] per request and allows at most one to be
/// alive at a time.
pub struct ProverService {
    deps: ContextDeps,
    slot: Arc<Semaphore>,
}

impl ProverService {
    pub fn new(
        factory: Arc<dyn EngineFactory>,
        cache: Arc<ArtifactCache>,
        merkle_fetcher: Arc<dyn ArtifactFetcher>,
        settings: ProverSettings,
    ) -> Self {
        Self {
            deps: ContextDeps {
                factory,
                cache,
                merkle_fetcher,
                settings,
            },
            slot: Arc::new(Semaphore::new(1)),
        }
    }

    pub fn settings(&self) -> &ProverSettings {
        &self.deps.settings
    }

    /// True while a context thread is still alive.
    pub fn is_busy(&self) -> bool {
        self.slot.available_permits() == 0
    }
}

#[async_trait]
impl ClaimProver for ProverService {
    async fn generate_proof(
        &self,
        request: ProofRequest,
        cancel: CancellationToken,
    ) -> Result<ProofResponse, ProverError> {
        let permit = Arc::clone(&self.slot)
            .try_acquire_owned()
            .map_err(|_| ProverError::Busy)?;

        let context = ProvingContext::spawn(self.deps.clone(), cancel, Some(permit))?;
        info!(context = %context.id(), ?request, "dispatching claim proof request");
        Ok(context.submit(WorkerMessage::GenerateProof(request)).await)
    }
}
