//! Sequencing of one claim proof through the proving engine.

use std::{sync::Arc, time::Instant};

use stealthdrop_artifacts::{ArtifactCache, ArtifactFetcher};
use stealthdrop_common::{
    kzg_params_artifact, ArtifactSpec, CircuitConfig, MerkleData, MerkleTreeFile, ProofRequest,
    CLAIM_CIRCUIT, MERKLE_LEAF_INDEX, MERKLE_TREE_URL,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{
    engine::{EngineFactory, MembershipStatement, ProvingEngine, SignatureStatement},
    error::{ProverError, Stage},
};

/// Fixed inputs of every proving run.
#[derive(Clone, Debug)]
pub struct ProverSettings {
    pub circuit: CircuitConfig,
    /// Worker threads handed to the engine's pool.
    pub threads: usize,
    pub kzg_params: ArtifactSpec,
    pub merkle_tree_url: String,
    pub merkle_leaf_index: usize,
}

impl Default for ProverSettings {
    fn default() -> Self {
        Self {
            circuit: CLAIM_CIRCUIT,
            threads: hardware_concurrency(),
            kzg_params: kzg_params_artifact(),
            merkle_tree_url: MERKLE_TREE_URL.to_string(),
            merkle_leaf_index: MERKLE_LEAF_INDEX,
        }
    }
}

pub fn hardware_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Everything a proving context needs besides the request itself.
#[derive(Clone)]
pub struct ContextDeps {
    pub factory: Arc<dyn EngineFactory>,
    /// Source of the global KZG params.
    pub cache: Arc<ArtifactCache>,
    /// Direct fetch path for the eligibility tree, which is not cached.
    pub merkle_fetcher: Arc<dyn ArtifactFetcher>,
    pub settings: ProverSettings,
}

fn checkpoint(cancel: &CancellationToken, next: Stage) -> Result<(), ProverError> {
    if cancel.is_cancelled() {
        return Err(ProverError::Cancelled(next));
    }
    Ok(())
}

/// Run every stage in order. No stage starts before the previous one has
/// resolved; cancellation is observed between stages only.
pub(crate) async fn run_pipeline(
    engine: &mut dyn ProvingEngine,
    request: &ProofRequest,
    deps: &ContextDeps,
    cancel: &CancellationToken,
) -> Result<Vec<u8>, ProverError> {
    let settings = &deps.settings;

    checkpoint(cancel, Stage::Init)?;
    engine
        .init(settings.threads)
        .map_err(ProverError::at(Stage::Init))?;
    info!(threads = settings.threads, "proving engine initialised");

    checkpoint(cancel, Stage::Configure)?;
    engine
        .configure(&settings.circuit)
        .map_err(ProverError::at(Stage::Configure))?;
    debug!(k = settings.circuit.k, "circuit configured");

    checkpoint(cancel, Stage::SignatureStatement)?;
    engine
        .assert_signature_statement(&SignatureStatement::from(&request.nullifier))
        .map_err(ProverError::at(Stage::SignatureStatement))?;
    info!("plume verify asserted");

    checkpoint(cancel, Stage::MembershipStatement)?;
    let merkle = fetch_merkle_data(deps).await?;
    engine
        .assert_membership_statement(&MembershipStatement::new(
            merkle,
            request.nullifier.public_key.clone(),
        ))
        .map_err(ProverError::at(Stage::MembershipStatement))?;
    info!("merkle verify asserted");

    checkpoint(cancel, Stage::Instances)?;
    let instances = engine
        .materialize_instances()
        .map_err(ProverError::at(Stage::Instances))?;
    debug!(?instances, "instance values");

    checkpoint(cancel, Stage::GlobalParams)?;
    let params = deps
        .cache
        .get_or_fetch(&settings.kzg_params.name, &settings.kzg_params.url)
        .await?;
    if params.is_empty() {
        return Err(ProverError::EmptyParams);
    }
    engine
        .load_global_params(&params)
        .map_err(ProverError::at(Stage::GlobalParams))?;
    debug!(len = params.len(), "KZG params loaded");

    checkpoint(cancel, Stage::Keys)?;
    engine
        .load_verifying_key(&request.verifying_key)
        .map_err(ProverError::at(Stage::Keys))?;
    engine
        .load_proving_key(&request.proving_key)
        .map_err(ProverError::at(Stage::Keys))?;
    debug!("verifying and proving keys loaded");

    checkpoint(cancel, Stage::Prove)?;
    let started = Instant::now();
    let proof = engine.prove().map_err(ProverError::at(Stage::Prove))?;
    info!(
        len = proof.len(),
        seconds = started.elapsed().as_secs_f64(),
        "proof generated"
    );

    checkpoint(cancel, Stage::Verify)?;
    let started = Instant::now();
    let valid = engine
        .verify(&proof)
        .map_err(ProverError::at(Stage::Verify))?;
    if !valid {
        return Err(ProverError::SelfVerification);
    }
    info!(seconds = started.elapsed().as_secs_f64(), "proof verified");

    Ok(proof)
}

async fn fetch_merkle_data(deps: &ContextDeps) -> Result<MerkleData, ProverError> {
    let settings = &deps.settings;
    let raw = deps.merkle_fetcher.fetch(&settings.merkle_tree_url).await?;
    let tree = MerkleTreeFile::from_slice(&raw)?;
    Ok(tree.leaf(settings.merkle_leaf_index)?)
}
