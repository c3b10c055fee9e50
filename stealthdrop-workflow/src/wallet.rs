//! Wallet capability and its EIP-1193 JSON-RPC implementation.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use stealthdrop_common::PlumeSignature;
use tracing::debug;

use crate::error::WalletError;

/// EIP-1193 code for a request the user declined.
pub const USER_REJECTED_CODE: i64 = 4001;

/// Browser-style wallet provider injected into the controller.
#[async_trait]
pub trait WalletCapability: Send + Sync {
    /// Ask the wallet to expose its accounts, prompting the user if needed.
    async fn request_accounts(&self) -> Result<Vec<String>, WalletError>;

    async fn get_accounts(&self) -> Result<Vec<String>, WalletError>;

    /// Signature-derived nullifier over `message` for `address`.
    async fn custom_signature(
        &self,
        message: &str,
        address: &str,
    ) -> Result<PlumeSignature, WalletError>;
}

/// Request access, then return the wallet's current address.
pub async fn connect(wallet: &dyn WalletCapability) -> Result<String, WalletError> {
    wallet.request_accounts().await?;
    wallet
        .get_accounts()
        .await?
        .into_iter()
        .next()
        .ok_or(WalletError::NoAccounts)
}

/// Wallet reached over HTTP JSON-RPC, using the same methods an injected
/// browser provider answers.
#[derive(Clone, Debug)]
pub struct JsonRpcWallet {
    client: reqwest::Client,
    endpoint: String,
    next_id: std::sync::Arc<AtomicU64>,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

impl JsonRpcWallet {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), endpoint)
    }

    pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            next_id: Default::default(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, WalletError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        debug!(method, id, "wallet rpc request");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| WalletError::Unavailable(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(WalletError::Unavailable(format!(
                "request failed with status: {}",
                response.status()
            )));
        }

        let response: RpcResponse = response
            .json()
            .await
            .map_err(|e| WalletError::Malformed(format!("failed to parse JSON: {}", e)))?;

        if let Some(error) = response.error {
            if error.code == USER_REJECTED_CODE {
                return Err(WalletError::UserRejected);
            }
            return Err(WalletError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        let result = response
            .result
            .ok_or_else(|| WalletError::Malformed(format!("{method} returned no result")))?;
        serde_json::from_value(result)
            .map_err(|e| WalletError::Malformed(format!("unexpected {method} result: {}", e)))
    }
}

#[async_trait]
impl WalletCapability for JsonRpcWallet {
    async fn request_accounts(&self) -> Result<Vec<String>, WalletError> {
        self.call("eth_requestAccounts", json!([])).await
    }

    async fn get_accounts(&self) -> Result<Vec<String>, WalletError> {
        self.call("eth_accounts", json!([])).await
    }

    async fn custom_signature(
        &self,
        message: &str,
        address: &str,
    ) -> Result<PlumeSignature, WalletError> {
        self.call("eth_getPlumeSignature", json!([message, address]))
            .await
    }
}
