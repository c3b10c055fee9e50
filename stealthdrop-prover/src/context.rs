//! Single-use proving context.
//!
//! A context is a dedicated OS thread that accepts exactly one
//! [`WorkerMessage`], answers with exactly one [`ProofResponse`] and exits.
//! `submit` consumes the context, so a context can never be handed a second
//! request.

use std::thread;

use stealthdrop_common::{ProofResponse, WorkerMessage};
use tokio::{runtime::Handle, sync::oneshot, sync::OwnedSemaphorePermit};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::{
    error::ProverError,
    pipeline::{run_pipeline, ContextDeps},
};

pub struct ProvingContext {
    id: Uuid,
    request_tx: oneshot::Sender<WorkerMessage>,
    response_rx: oneshot::Receiver<ProofResponse>,
    thread: thread::JoinHandle<()>,
}

impl ProvingContext {
    /// Spawn a context thread waiting for its request.
    ///
    /// Async work inside the context (artifact and merkle fetches) is driven
    /// through the caller's runtime handle, so connections opened there stay
    /// usable after the context exits. `permit`, when given, is released only
    /// once the thread has finished.
    pub fn spawn(
        deps: ContextDeps,
        cancel: CancellationToken,
        permit: Option<OwnedSemaphorePermit>,
    ) -> Result<Self, ProverError> {
        let handle = Handle::try_current().map_err(|_| ProverError::NoRuntime)?;
        let id = Uuid::new_v4();
        let (request_tx, request_rx) = oneshot::channel::<WorkerMessage>();
        let (response_tx, response_rx) = oneshot::channel::<ProofResponse>();

        let thread = thread::Builder::new()
            .name(format!("proving-context-{}", id.simple()))
            .spawn(move || {
                let _permit = permit;
                let span = info_span!("proving_context", %id);
                let _enter = span.enter();

                let Ok(message) = handle.block_on(request_rx) else {
                    debug!("context dropped before receiving a request");
                    return;
                };

                let response = match message {
                    WorkerMessage::GenerateProof(request) => {
                        let mut engine = deps.factory.create();
                        match handle.block_on(run_pipeline(
                            engine.as_mut(),
                            &request,
                            &deps,
                            &cancel,
                        )) {
                            Ok(proof) => ProofResponse::success(proof),
                            Err(ProverError::Cancelled(stage)) => {
                                info!(%stage, "proof generation cancelled");
                                ProofResponse::cancelled(format!(
                                    "proof generation cancelled before {stage}"
                                ))
                            }
                            Err(err) => {
                                error!("Error generating claim proof: {}", err);
                                ProofResponse::error(err.to_string())
                            }
                        }
                    }
                };

                if response_tx.send(response).is_err() {
                    debug!("requester went away before the response was delivered");
                }
            })?;

        debug!(%id, "proving context spawned");
        Ok(Self {
            id,
            request_tx,
            response_rx,
            thread,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Hand the context its one request and wait for the one response. The
    /// context thread is joined before this returns.
    pub async fn submit(self, message: WorkerMessage) -> ProofResponse {
        let ProvingContext {
            id,
            request_tx,
            response_rx,
            thread,
        } = self;

        let response = if request_tx.send(message).is_err() {
            ProofResponse::error("proving context exited before accepting a request")
        } else {
            match response_rx.await {
                Ok(response) => response,
                Err(_) => {
                    error!(%id, "proving context terminated without a response");
                    ProofResponse::error("proving context terminated without a response")
                }
            }
        };

        match tokio::task::spawn_blocking(move || thread.join()).await {
            Ok(Ok(())) => debug!(%id, "proving context terminated"),
            Ok(Err(_)) => warn!(%id, "proving context panicked"),
            Err(err) => warn!(%id, "failed to join proving context: {}", err),
        }

        response
    }
}
