//! Integration tests for ProvChain API endpoints
//!
//! These tests verify that every endpoint responds with the expected status
//! and JSON structure as the node's state changes.

use axum_test::TestServer;
use provchain::api::build_api_router;
use provchain::config::Config;
use provchain::crypto::KeyPair;
use provchain::node::Node;
use provchain::transaction::{Transaction, COINBASE};
use serde_json::{json, Value};
use std::sync::Arc;

fn test_server() -> (TestServer, Arc<Node>) {
    let mut config = Config::default();
    config.mining.difficulty = 2;
    let node = Arc::new(Node::new(config).expect("Failed to create node"));
    let app = build_api_router(node.clone());
    let server = TestServer::new(app).expect("Failed to create test server");
    (server, node)
}

fn signed(keypair: &KeyPair, product_id: &str, event_type: &str) -> Transaction {
    let mut tx = Transaction::new(
        keypair.address(),
        "retailer-3",
        2.0,
        product_id,
        event_type,
        "pallet 4",
        1_700_000_000,
    );
    tx.sign(keypair);
    tx
}

#[tokio::test]
async fn test_health_and_genesis_chain() {
    let (server, _node) = test_server();

    let response = server.get("/health").await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["length"], 1);
    assert!(json["timestamp"].is_string());

    let response = server.get("/chain").await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(json["length"], 1);
    assert_eq!(json["chain"][0]["index"], 1);
    assert_eq!(json["chain"][0]["previous_hash"], "1");
    assert_eq!(json["chain"][0]["proof"], 0);
}

#[tokio::test]
async fn test_submit_mine_and_trace() {
    let (server, _node) = test_server();
    let keypair = KeyPair::generate();

    let response = server
        .post("/transactions/new")
        .json(&signed(&keypair, "SKU-1", "HARVESTED"))
        .await;
    assert_eq!(response.status_code(), 201);
    let json: Value = response.json();
    assert_eq!(json["message"], "Transaction will be added to Block 2");

    let response = server.get("/transactions/pending").await;
    let pending: Vec<Value> = response.json();
    assert_eq!(pending.len(), 1);

    let response = server.post("/mine").await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(json["message"], "Mined");
    assert_eq!(json["index"], 2);
    assert_eq!(json["hash"].as_str().unwrap().len(), 64);

    let pending: Vec<Value> = server.get("/transactions/pending").await.json();
    assert!(pending.is_empty());

    server
        .post("/transactions/new")
        .json(&signed(&keypair, "SKU-1", "SHIPPED"))
        .await;

    let response = server.get("/products/SKU-1").await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(json["product_id"], "SKU-1");
    let events = json["events"].as_array().unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["block"], 2);
    assert_eq!(events[0]["event_type"], "HARVESTED");
    assert!(events[1]["block"].is_null());
    assert_eq!(events[1]["event_type"], "SHIPPED");
}

#[tokio::test]
async fn test_rejected_transactions() {
    let (server, node) = test_server();
    let keypair = KeyPair::generate();

    let mut forged = signed(&keypair, "SKU-2", "PACKED");
    forged.amount = 99.0;
    let response = server.post("/transactions/new").json(&forged).await;
    assert_eq!(response.status_code(), 400);
    let json: Value = response.json();
    assert!(json["error"].as_str().unwrap().contains("signature"));

    let mut missing = serde_json::to_value(signed(&keypair, "SKU-2", "PACKED")).unwrap();
    missing.as_object_mut().unwrap().remove("public_key");
    let response = server.post("/transactions/new").json(&missing).await;
    assert_eq!(response.status_code(), 400);
    let json: Value = response.json();
    assert!(json["error"].as_str().unwrap().contains("public_key"));

    let mut integer = serde_json::to_value(signed(&keypair, "SKU-2", "PACKED")).unwrap();
    integer["amount"] = json!(2);
    let response = server.post("/transactions/new").json(&integer).await;
    assert_eq!(response.status_code(), 400);
    let json: Value = response.json();
    assert!(json["error"].as_str().unwrap().contains("decimal"));

    let coinbase = Transaction::coinbase("me", 1_000.0, 1);
    let response = server.post("/transactions/new").json(&coinbase).await;
    assert_eq!(response.status_code(), 400);
    let json: Value = response.json();
    assert!(json["error"].as_str().unwrap().contains(COINBASE));

    assert!(node.pending().await.is_empty());
}

#[tokio::test]
async fn test_register_nodes() {
    let (server, _node) = test_server();

    let response = server
        .post("/nodes/register")
        .json(&json!({ "nodes": ["http://127.0.0.1:5001/", "bogus", "http://127.0.0.1:5001"] }))
        .await;
    assert_eq!(response.status_code(), 201);
    let json: Value = response.json();
    assert_eq!(json["message"], "Registered");
    assert_eq!(json["count"], 2);
    assert_eq!(json["nodes"], json!(["http://127.0.0.1:5001"]));

    let response = server
        .post("/nodes/register")
        .json(&json!({ "nodes": [] }))
        .await;
    assert_eq!(response.status_code(), 400);
}

#[tokio::test]
async fn test_resolve_without_peers_is_authoritative() {
    let (server, _node) = test_server();
    let response = server.post("/nodes/resolve").await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(json["message"], "authoritative");
    assert_eq!(json["length"], 1);
}
