// stealthdrop/stealthdrop-prover/src/lib.rs

//! Claim-proof generation off the controller's execution context.
//!
//! The proving engine is external; this crate only sequences it. Each request
//! runs in a [`ProvingContext`]: a dedicated thread that takes one request,
//! walks the engine through
//!
//! ```text
//! init → configure → plume verify → merkle verify → instances
//!      → load params → load vk/pk → prove → verify
//! ```
//!
//! answers with one [`ProofResponse`](stealthdrop_common::ProofResponse) and
//! exits.

pub mod context;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod service;

pub use context::ProvingContext;
pub use engine::{
    EngineFactory, MembershipStatement, ProvingEngine, SignatureStatement,
};
pub use error::{EngineError, ProverError, Stage};
pub use pipeline::{hardware_concurrency, ContextDeps, ProverSettings};
pub use service::{ClaimProver, ProverService};
