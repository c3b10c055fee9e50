//! JSON-RPC wallet against a local EIP-1193 style endpoint.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{extract::State, routing::post, Json, Router};
use serde_json::{json, Value};
use stealthdrop_artifacts::{ArtifactCache, ArtifactStore, HttpFetcher};
use stealthdrop_common::CLAIM_MESSAGE;
use stealthdrop_workflow::{
    JsonRpcWallet, Step, WalletCapability, WalletError, WorkflowConfig, WorkflowController,
    WorkflowError,
};
use tokio_util::sync::CancellationToken;

#[derive(Clone, Default)]
struct Node {
    reject_signatures: bool,
    calls: Arc<Mutex<Vec<(String, Value)>>>,
}

async fn rpc(State(node): State<Node>, Json(body): Json<Value>) -> Json<Value> {
    let id = body["id"].clone();
    let method = body["method"].as_str().unwrap_or_default().to_string();
    let params = body["params"].clone();
    node.calls.lock().unwrap().push((method.clone(), params.clone()));

    let outcome = match method.as_str() {
        "eth_requestAccounts" | "eth_accounts" => Ok(json!(["0xAAA"])),
        "eth_getPlumeSignature" if node.reject_signatures => {
            Err(json!({"code": 4001, "message": "User rejected the request."}))
        }
        "eth_getPlumeSignature" => Ok(json!({
            "plume": "0x02aa",
            "s": "0x11",
            "c": "0x22",
            "publicKey": "0x03bb",
        })),
        _ => Err(json!({"code": -32601, "message": "method not found"})),
    };

    Json(match outcome {
        Ok(result) => json!({"jsonrpc": "2.0", "id": id, "result": result}),
        Err(error) => json!({"jsonrpc": "2.0", "id": id, "error": error}),
    })
}

async fn serve(node: Node) -> SocketAddr {
    let app = Router::new().route("/", post(rpc)).with_state(node);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

#[tokio::test]
async fn accounts_and_signature_round_trip() {
    let node = Node::default();
    let addr = serve(node.clone()).await;
    let wallet = JsonRpcWallet::new(format!("http://{addr}/"));

    assert_eq!(wallet.request_accounts().await.unwrap(), vec!["0xAAA"]);
    assert_eq!(wallet.get_accounts().await.unwrap(), vec!["0xAAA"]);
    let signature = wallet
        .custom_signature(CLAIM_MESSAGE, "0xAAA")
        .await
        .unwrap();
    assert_eq!(signature.plume, "0x02aa");
    assert_eq!(signature.public_key, "0x03bb");

    let calls = node.calls.lock().unwrap();
    assert_eq!(calls[2].0, "eth_getPlumeSignature");
    assert_eq!(calls[2].1, json!([CLAIM_MESSAGE, "0xAAA"]));
}

#[tokio::test]
async fn code_4001_is_user_rejection() {
    let addr = serve(Node {
        reject_signatures: true,
        ..Node::default()
    })
    .await;
    let wallet = JsonRpcWallet::new(format!("http://{addr}/"));

    let err = wallet
        .custom_signature(CLAIM_MESSAGE, "0xAAA")
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::UserRejected));
}

#[tokio::test]
async fn unreachable_endpoint_is_unavailable() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let wallet = Arc::new(JsonRpcWallet::new(format!("http://{addr}/")));
    let controller = WorkflowController::new(
        wallet,
        Arc::new(ArtifactCache::new(
            ArtifactStore::temporary().unwrap(),
            Arc::new(HttpFetcher::new()),
        )),
        WorkflowConfig::default(),
    );

    let err = controller
        .trigger(Step::ConnectPublicWallet, CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::CapabilityUnavailable(_)));
}

#[tokio::test]
async fn controller_runs_first_two_steps_over_rpc() {
    let addr = serve(Node::default()).await;
    let controller = WorkflowController::new(
        Arc::new(JsonRpcWallet::new(format!("http://{addr}/"))),
        Arc::new(ArtifactCache::new(
            ArtifactStore::temporary().unwrap(),
            Arc::new(HttpFetcher::new()),
        )),
        WorkflowConfig::default(),
    );

    controller
        .trigger(Step::ConnectPublicWallet, CancellationToken::new())
        .await
        .unwrap();
    let state = controller
        .trigger(Step::GenerateNullifier, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(state.public_wallet_address.as_deref(), Some("0xAAA"));
    assert_eq!(state.completed, [true, true, false, false, false]);
    assert_eq!(state.nullifier.unwrap().message, CLAIM_MESSAGE);
}
