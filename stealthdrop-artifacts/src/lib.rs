//! stealthdrop-artifacts
//!
//! Durable, write-once cache for the large binary artifacts the claim proof
//! needs (circuit keys, KZG parameters). Each artifact is downloaded at most
//! once per device; later requests are served from the local sled store
//! without touching the network.

pub mod cache;
pub mod error;
pub mod fetch;
pub mod store;

pub use cache::ArtifactCache;
pub use error::ArtifactError;
pub use fetch::{ArtifactFetcher, HttpFetcher};
pub use store::{ArtifactStore, FILES_TREE, STORE_SCHEMA_VERSION};
