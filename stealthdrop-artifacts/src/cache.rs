//! Get-or-fetch cache over the durable store.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use stealthdrop_common::{hash_bytes_hex, ArtifactSpec};
use tracing::{debug, info};

use crate::{error::ArtifactError, fetch::ArtifactFetcher, store::ArtifactStore};

/// Serves artifacts from the store, downloading each missing one once.
///
/// Concurrent requests for the same missing name queue behind a per-name
/// lock, so only the first caller reaches the network.
pub struct ArtifactCache {
    store: ArtifactStore,
    fetcher: Arc<dyn ArtifactFetcher>,
    in_flight: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl ArtifactCache {
    pub fn new(store: ArtifactStore, fetcher: Arc<dyn ArtifactFetcher>) -> Self {
        Self {
            store,
            fetcher,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Return the artifact stored under `name`, fetching `url` first if it is
    /// not resident yet.
    pub async fn get_or_fetch(&self, name: &str, url: &str) -> Result<Vec<u8>, ArtifactError> {
        if let Some(bytes) = self.store.get(name)? {
            debug!(artifact = name, "artifact already resident, skipping download");
            return Ok(bytes);
        }

        let lock = self.name_lock(name);
        let _guard = lock.lock().await;

        // Another caller may have finished the download while we waited.
        if let Some(bytes) = self.store.get(name)? {
            debug!(artifact = name, "artifact stored by concurrent fetch");
            return Ok(bytes);
        }

        info!(artifact = name, url, "downloading artifact");
        let bytes = self.fetcher.fetch(url).await?;

        let stored = self.store.put_once(name, &bytes)?;
        self.release_name(name);
        if !stored {
            // Written out-of-band (another process sharing the store); the
            // first write wins.
            return self.require(name);
        }
        info!(
            artifact = name,
            size = bytes.len(),
            blake3 = %hash_bytes_hex(&bytes),
            "downloaded and stored artifact"
        );
        Ok(bytes)
    }

    /// Download every artifact in `specs` that is not resident yet, in order.
    pub async fn prefetch(&self, specs: &[ArtifactSpec]) -> Result<(), ArtifactError> {
        info!("Checking and downloading artifacts if necessary");
        for spec in specs {
            self.get_or_fetch(&spec.name, &spec.url).await?;
        }
        info!("Artifact check and download complete");
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<Option<Vec<u8>>, ArtifactError> {
        self.store.get(name)
    }

    /// Read a resident artifact, failing with [`ArtifactError::Missing`]
    /// rather than reaching for the network.
    pub fn require(&self, name: &str) -> Result<Vec<u8>, ArtifactError> {
        self.store
            .get(name)?
            .ok_or_else(|| ArtifactError::Missing(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> Result<bool, ArtifactError> {
        self.store.contains(name)
    }

    /// True when every name in `names` is resident.
    pub fn resident(&self, names: &[&str]) -> Result<bool, ArtifactError> {
        for name in names {
            if !self.store.contains(name)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn lock_table(&self) -> MutexGuard<'_, HashMap<String, Arc<tokio::sync::Mutex<()>>>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn name_lock(&self, name: &str) -> Arc<tokio::sync::Mutex<()>> {
        Arc::clone(self.lock_table().entry(name.to_string()).or_default())
    }

    /// Drop the lock of a stored artifact. Later callers find it in the store
    /// before ever reaching for a lock.
    fn release_name(&self, name: &str) {
        self.lock_table().remove(name);
    }
}
