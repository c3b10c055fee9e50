// stealthdrop/stealthdrop-common/src/lib.rs

//! Types shared between the artifact cache, the proving context and the
//! claim workflow.
//!
//! Everything that crosses the proving-context message boundary lives here so
//! both sides agree on a single JSON shape:
//!
//! ```text
//! request : {"action":"generateProof","data":{provingKey, verifyingKey, nullifier}}
//! response: {"status":"success","message":..,"proof":..}
//!         | {"status":"error","message":..}
//!         | {"status":"cancelled","message":..}
//! ```
//!
//! Byte fields are hex encoded on the wire.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Message the claiming wallet signs to derive its nullifier.
pub const CLAIM_MESSAGE: &str = "CLAIM MY MONIII";

/// Store key of the claim circuit verifying key.
pub const VERIFYING_KEY_NAME: &str = "vk";
/// Store key of the claim circuit proving key.
pub const PROVING_KEY_NAME: &str = "pk";
/// Store key of the global KZG parameters for `k = 15`.
pub const KZG_PARAMS_NAME: &str = "kzg_bn254_15";

pub const VERIFYING_KEY_URL: &str =
    "https://storage.googleapis.com/plume-keys/plume_merkle_verify_vk_15_8.bin";
pub const PROVING_KEY_URL: &str =
    "https://storage.googleapis.com/plume-keys/plume_merkle_verify_pk_15_8.bin";
pub const KZG_PARAMS_URL: &str =
    "https://axiom-crypto.s3.amazonaws.com/challenge_0085/kzg_bn254_15.srs";
pub const MERKLE_TREE_URL: &str =
    "https://storage.googleapis.com/plume-keys/merkle_tree_8.json";

/// Leaf of the eligibility tree the claiming key is proven against.
pub const MERKLE_LEAF_INDEX: usize = 0;

/// Size exponent of the claim circuit (`2^k` rows).
pub const CIRCUIT_K: u32 = 15;

/// Circuit shape handed to the proving engine before any statement is
/// asserted. Field names follow the engine's configuration object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CircuitConfig {
    pub k: u32,
    pub num_advice: u32,
    pub num_lookup_advice: u32,
    pub num_instance: u32,
    pub num_lookup_bits: u32,
    pub num_virtual_instance: u32,
}

/// Fixed configuration of the plume + merkle membership claim circuit.
pub const CLAIM_CIRCUIT: CircuitConfig = CircuitConfig {
    k: CIRCUIT_K,
    num_advice: 69,
    num_lookup_advice: 8,
    num_instance: 1,
    num_lookup_bits: 14,
    num_virtual_instance: 1,
};

/// A named artifact and the location it is downloaded from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactSpec {
    pub name: String,
    pub url: String,
}

impl ArtifactSpec {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// The circuit keys that gate the proof step, in download order.
pub fn claim_key_artifacts() -> Vec<ArtifactSpec> {
    vec![
        ArtifactSpec::new(VERIFYING_KEY_NAME, VERIFYING_KEY_URL),
        ArtifactSpec::new(PROVING_KEY_NAME, PROVING_KEY_URL),
    ]
}

pub fn kzg_params_artifact() -> ArtifactSpec {
    ArtifactSpec::new(KZG_PARAMS_NAME, KZG_PARAMS_URL)
}

/// PLUME signature as returned by the wallet's custom signature method.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlumeSignature {
    pub plume: String,
    pub s: String,
    pub c: String,
    pub public_key: String,
}

/// Nullifier recorded by the workflow: the wallet signature plus the message
/// that was signed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Nullifier {
    pub plume: String,
    pub s: String,
    pub c: String,
    pub message: String,
    pub public_key: String,
}

impl Nullifier {
    pub fn from_signature(signature: PlumeSignature, message: impl Into<String>) -> Self {
        Self {
            plume: signature.plume,
            s: signature.s,
            c: signature.c,
            message: message.into(),
            public_key: signature.public_key,
        }
    }
}

/// Payload of a `generateProof` request.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofRequest {
    #[serde(with = "serde_hex_bytes")]
    pub proving_key: Vec<u8>,
    #[serde(with = "serde_hex_bytes")]
    pub verifying_key: Vec<u8>,
    pub nullifier: Nullifier,
}

// Keys run to tens of megabytes; only their sizes are useful in logs.
impl fmt::Debug for ProofRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProofRequest")
            .field("proving_key_len", &self.proving_key.len())
            .field("verifying_key_len", &self.verifying_key.len())
            .field("nullifier", &self.nullifier)
            .finish()
    }
}

/// Message accepted by a proving context.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "data", rename_all = "camelCase")]
pub enum WorkerMessage {
    GenerateProof(ProofRequest),
}

/// The single message a proving context sends back before it terminates.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ProofResponse {
    Success {
        message: String,
        #[serde(with = "serde_hex_bytes")]
        proof: Vec<u8>,
    },
    Error {
        message: String,
    },
    Cancelled {
        message: String,
    },
}

impl ProofResponse {
    pub fn success(proof: Vec<u8>) -> Self {
        ProofResponse::Success {
            message: "Proof generated and verified successfully".to_string(),
            proof,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ProofResponse::Error {
            message: message.into(),
        }
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        ProofResponse::Cancelled {
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ProofResponse::Success { .. })
    }

    pub fn message(&self) -> &str {
        match self {
            ProofResponse::Success { message, .. }
            | ProofResponse::Error { message }
            | ProofResponse::Cancelled { message } => message,
        }
    }
}

/// Membership witness for one leaf of the eligibility tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerkleData {
    pub root: String,
    pub merkle_proof: Vec<String>,
    pub proof_helper: Vec<String>,
}

/// Published eligibility tree: one root and a membership path per leaf.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerkleTreeFile {
    pub root: String,
    pub leaves: Vec<MerkleLeafPath>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MerkleLeafPath {
    pub merkle_proof: Vec<String>,
    pub proof_helper: Vec<String>,
}

#[derive(Debug, Error)]
pub enum MerkleDataError {
    #[error("merkle tree json parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("merkle tree has {len} leaves, index {index} requested")]
    LeafOutOfRange { index: usize, len: usize },

    #[error("merkle path length mismatch: {proof} siblings but {helper} helper bits")]
    PathLengthMismatch { proof: usize, helper: usize },
}

impl MerkleTreeFile {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, MerkleDataError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Extract the membership witness for `index`.
    pub fn leaf(&self, index: usize) -> Result<MerkleData, MerkleDataError> {
        let path = self
            .leaves
            .get(index)
            .ok_or(MerkleDataError::LeafOutOfRange {
                index,
                len: self.leaves.len(),
            })?;
        if path.merkle_proof.len() != path.proof_helper.len() {
            return Err(MerkleDataError::PathLengthMismatch {
                proof: path.merkle_proof.len(),
                helper: path.proof_helper.len(),
            });
        }
        Ok(MerkleData {
            root: self.root.clone(),
            merkle_proof: path.merkle_proof.clone(),
            proof_helper: path.proof_helper.clone(),
        })
    }
}

pub fn hash_bytes_hex(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

/// Hex (de)serialization for byte vectors, accepting an optional `0x` prefix.
pub mod serde_hex_bytes {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let trimmed = s.strip_prefix("0x").unwrap_or(&s);
        hex::decode(trimmed).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_nullifier() -> Nullifier {
        Nullifier {
            plume: "0x02aa".into(),
            s: "0x11".into(),
            c: "0x22".into(),
            message: CLAIM_MESSAGE.into(),
            public_key: "0x03bb".into(),
        }
    }

    #[test]
    fn request_uses_action_envelope() {
        let msg = WorkerMessage::GenerateProof(ProofRequest {
            proving_key: vec![0xde, 0xad],
            verifying_key: vec![0xbe, 0xef],
            nullifier: sample_nullifier(),
        });
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["action"], "generateProof");
        assert_eq!(value["data"]["provingKey"], "0xdead");
        assert_eq!(value["data"]["verifyingKey"], "0xbeef");
        assert_eq!(value["data"]["nullifier"]["publicKey"], "0x03bb");
        assert_eq!(value["data"]["nullifier"]["message"], CLAIM_MESSAGE);
    }

    #[test]
    fn response_status_tags() {
        let ok = serde_json::to_value(ProofResponse::success(vec![1, 2])).unwrap();
        assert_eq!(ok["status"], "success");
        assert_eq!(ok["proof"], "0x0102");

        let err: ProofResponse =
            serde_json::from_value(json!({"status": "error", "message": "x"})).unwrap();
        assert_eq!(err, ProofResponse::error("x"));
        assert!(!err.is_success());
        assert_eq!(err.message(), "x");
    }

    #[test]
    fn hex_bytes_accept_missing_prefix() {
        let resp: ProofResponse = serde_json::from_value(
            json!({"status": "success", "message": "ok", "proof": "abcd"}),
        )
        .unwrap();
        match resp {
            ProofResponse::Success { proof, .. } => assert_eq!(proof, vec![0xab, 0xcd]),
            other => panic!("unexpected response {other:?}"),
        }
    }

    #[test]
    fn nullifier_carries_signed_message() {
        let sig: PlumeSignature = serde_json::from_value(json!({
            "plume": "0x02aa", "s": "0x11", "c": "0x22", "publicKey": "0x03bb"
        }))
        .unwrap();
        assert_eq!(Nullifier::from_signature(sig, CLAIM_MESSAGE), sample_nullifier());
    }

    #[test]
    fn merkle_leaf_extraction() {
        let tree = MerkleTreeFile::from_slice(
            br#"{"root":"42","leaves":[{"merkleProof":["1","2"],"proofHelper":["0","1"]}]}"#,
        )
        .unwrap();
        let data = tree.leaf(MERKLE_LEAF_INDEX).unwrap();
        assert_eq!(data.root, "42");
        assert_eq!(data.merkle_proof, vec!["1", "2"]);
        assert!(matches!(
            tree.leaf(3),
            Err(MerkleDataError::LeafOutOfRange { index: 3, len: 1 })
        ));
    }

    #[test]
    fn merkle_rejects_ragged_paths() {
        let tree = MerkleTreeFile::from_slice(
            br#"{"root":"42","leaves":[{"merkleProof":["1","2"],"proofHelper":["0"]}]}"#,
        )
        .unwrap();
        assert!(matches!(
            tree.leaf(0),
            Err(MerkleDataError::PathLengthMismatch { proof: 2, helper: 1 })
        ));
    }

    #[test]
    fn claim_circuit_shape() {
        assert_eq!(CLAIM_CIRCUIT.k, 15);
        let value = serde_json::to_value(CLAIM_CIRCUIT).unwrap();
        assert_eq!(value["numAdvice"], 69);
        assert_eq!(value["numLookupBits"], 14);
    }
}
