//! stealthdrop-artifacts/error

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("fetch of {url} failed: {reason}")]
    Fetch { url: String, reason: String },

    #[error("fetch of {url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("artifact store error: {0}")]
    Store(#[from] sled::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("artifact store schema version {found}, expected {expected}")]
    SchemaMismatch { expected: u32, found: u32 },

    #[error("artifact {0} is not resident in the store")]
    Missing(String),
}

impl ArtifactError {
    /// Whether the failure came from the network rather than local storage.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(
            self,
            ArtifactError::Fetch { .. } | ArtifactError::HttpStatus { .. }
        )
    }
}
