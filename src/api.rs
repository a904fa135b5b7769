//! REST API server for ProvChain
//!
//! Exposes transaction intake, mining, chain export, peer registration,
//! conflict resolution and product tracing over HTTP.

use axum::{
    extract::{Path, Request, State},
    http::{self, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::blockchain::ProductEvent;
use crate::error::{ChainError, RejectReason};
use crate::network::ChainResponse;
use crate::node::Node;
use crate::transaction::{Transaction, TransactionSubmission, COINBASE};

#[derive(Debug)]
pub enum ApiError {
    Rejected(RejectReason),
    InvalidInput(String),
    Conflict(String),
    Unavailable(String),
    InternalError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Rejected(reason) => (StatusCode::BAD_REQUEST, reason.to_string()),
            ApiError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            ApiError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<RejectReason> for ApiError {
    fn from(reason: RejectReason) -> Self {
        ApiError::Rejected(reason)
    }
}

impl From<ChainError> for ApiError {
    fn from(err: ChainError) -> Self {
        match err {
            ChainError::Rejected(reason) => ApiError::Rejected(reason),
            ChainError::StaleHead => ApiError::Conflict(err.to_string()),
            ChainError::MiningCancelled => ApiError::Unavailable(err.to_string()),
            other => ApiError::InternalError(other.to_string()),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Serialize, Deserialize)]
pub struct MineResponse {
    pub message: String,
    pub index: u64,
    pub hash: String,
}

#[derive(Deserialize)]
pub struct RegisterNodesRequest {
    #[serde(default)]
    pub nodes: Vec<String>,
}

#[derive(Serialize, Deserialize)]
pub struct RegisterNodesResponse {
    pub message: String,
    pub count: usize,
    pub nodes: Vec<String>,
}

#[derive(Serialize, Deserialize)]
pub struct ResolveResponse {
    pub message: String,
    pub length: usize,
}

#[derive(Serialize, Deserialize)]
pub struct ProductResponse {
    pub product_id: String,
    pub events: Vec<ProductEvent>,
}

async fn logging_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = next.run(req).await;

    tracing::info!(
        method = %method,
        path = %path,
        status = %response.status().as_u16(),
        duration_ms = %start.elapsed().as_millis(),
        "api.request"
    );

    response
}

pub fn build_api_router(node: Arc<Node>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(vec![
            http::Method::GET,
            http::Method::POST,
            http::Method::OPTIONS,
        ])
        .allow_headers(vec![http::header::CONTENT_TYPE]);

    Router::new()
        // Transactions
        .route("/transactions/new", post(new_transaction))
        .route("/transactions/pending", get(pending_transactions))
        // Mining
        .route("/mine", post(mine))
        // Chain
        .route("/chain", get(full_chain))
        // Peers and consensus
        .route("/nodes/register", post(register_nodes))
        .route("/nodes/resolve", post(resolve_nodes))
        // Provenance
        .route("/products/:product_id", get(product_events))
        // System
        .route("/health", get(health_check))
        .layer(middleware::from_fn(logging_middleware))
        .with_state(node)
        .layer(cors)
}

/// Serve the API on `addr` until `shutdown` resolves.
pub async fn run_api_server(
    node: Arc<Node>,
    addr: SocketAddr,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = build_api_router(node);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

// ============================================================================
// Route Handlers
// ============================================================================

async fn new_transaction(
    State(node): State<Arc<Node>>,
    Json(submission): Json<TransactionSubmission>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let tx = submission.into_transaction()?;
    if tx.sender == COINBASE {
        return Err(RejectReason::ReservedSender(tx.sender).into());
    }

    let index = node.submit_transaction(tx).await?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: format!("Transaction will be added to Block {index}"),
        }),
    ))
}

async fn pending_transactions(State(node): State<Arc<Node>>) -> Json<Vec<Transaction>> {
    Json(node.pending().await)
}

async fn mine(State(node): State<Arc<Node>>) -> Result<Json<MineResponse>, ApiError> {
    let block = node.mine().await?;
    Ok(Json(MineResponse {
        message: "Mined".to_string(),
        index: block.index,
        hash: block.hash(),
    }))
}

async fn full_chain(State(node): State<Arc<Node>>) -> Json<ChainResponse> {
    Json(ChainResponse::new(node.chain().await))
}

async fn register_nodes(
    State(node): State<Arc<Node>>,
    Json(request): Json<RegisterNodesRequest>,
) -> Result<(StatusCode, Json<RegisterNodesResponse>), ApiError> {
    if request.nodes.is_empty() {
        return Err(ApiError::InvalidInput(
            "Provide non-empty list of node URLs".to_string(),
        ));
    }

    let accepted = node.register_peers(&request.nodes).await;
    Ok((
        StatusCode::CREATED,
        Json(RegisterNodesResponse {
            message: "Registered".to_string(),
            count: accepted.len(),
            nodes: node.peers().await,
        }),
    ))
}

async fn resolve_nodes(State(node): State<Arc<Node>>) -> Json<ResolveResponse> {
    let replaced = node.resolve_conflicts().await;
    let message = if replaced { "replaced" } else { "authoritative" };
    Json(ResolveResponse {
        message: message.to_string(),
        length: node.chain_len().await,
    })
}

async fn product_events(
    State(node): State<Arc<Node>>,
    Path(product_id): Path<String>,
) -> Json<ProductResponse> {
    let events = node.product_history(&product_id).await;
    Json(ProductResponse { product_id, events })
}

async fn health_check(State(node): State<Arc<Node>>) -> impl IntoResponse {
    let ledger = node.ledger.read().await;
    Json(json!({
        "status": "healthy",
        "length": ledger.len(),
        "pending": ledger.pending().len(),
        "peers": ledger.peers().len(),
        "difficulty": ledger.pow().difficulty(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
