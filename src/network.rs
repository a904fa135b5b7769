//! Peer addressing and the outbound chain query used by consensus

use crate::blockchain::Block;
use crate::error::{ChainError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Per-peer request budget when none is configured.
pub const DEFAULT_PEER_TIMEOUT: Duration = Duration::from_secs(5);

/// Body of `GET /chain`, both served and consumed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainResponse {
    pub chain: Vec<Block>,
    pub length: usize,
}

impl ChainResponse {
    pub fn new(chain: Vec<Block>) -> Self {
        let length = chain.len();
        ChainResponse { chain, length }
    }
}

/// Reduce a peer URL to `scheme://host[:port]`. Paths, queries and
/// credentials are dropped; a URL without a scheme or host is refused.
pub fn normalize_peer_url(raw: &str) -> Result<String> {
    let parsed = Url::parse(raw.trim())
        .map_err(|e| ChainError::InvalidPeerUrl(format!("{raw}: {e}")))?;
    let host = parsed
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| ChainError::InvalidPeerUrl(format!("{raw}: missing host")))?;

    Ok(match parsed.port() {
        Some(port) => format!("{}://{}:{}", parsed.scheme(), host, port),
        None => format!("{}://{}", parsed.scheme(), host),
    })
}

/// HTTP client for querying other nodes.
#[derive(Debug, Clone)]
pub struct PeerClient {
    client: Client,
    timeout: Duration,
}

impl PeerClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("provchain/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| ChainError::Config(format!("HTTP client: {e}")))?;
        Ok(PeerClient { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fetch `{peer}/chain`. The response is untrusted: callers must still
    /// validate the chain before adopting it.
    pub async fn fetch_chain(&self, peer: &str) -> Result<Vec<Block>> {
        let failure = |message: String| ChainError::PeerFailure {
            peer: peer.to_string(),
            message,
        };

        let response = self
            .client
            .get(format!("{peer}/chain"))
            .send()
            .await
            .map_err(|e| failure(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(failure(format!("HTTP {status}")));
        }

        let body: ChainResponse = response
            .json()
            .await
            .map_err(|e| failure(format!("undecodable body: {e}")))?;

        if body.length != body.chain.len() {
            return Err(failure(format!(
                "reported length {} but sent {} blocks",
                body.length,
                body.chain.len()
            )));
        }
        Ok(body.chain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_keeps_scheme_host_port() {
        assert_eq!(
            normalize_peer_url("http://10.0.0.5:5001/chain?x=1").unwrap(),
            "http://10.0.0.5:5001"
        );
        assert_eq!(
            normalize_peer_url("https://node.example.org/").unwrap(),
            "https://node.example.org"
        );
    }

    #[test]
    fn test_normalize_drops_default_port() {
        assert_eq!(
            normalize_peer_url("http://peer.local:80").unwrap(),
            "http://peer.local"
        );
    }

    #[test]
    fn test_normalize_rejects_missing_scheme_or_host() {
        for raw in ["127.0.0.1:5000", "not a url", "", "file:///tmp/chain", "http://"] {
            assert!(
                matches!(normalize_peer_url(raw), Err(ChainError::InvalidPeerUrl(_))),
                "{raw:?} should be refused"
            );
        }
    }

    #[test]
    fn test_chain_response_reports_length() {
        let response = ChainResponse::new(vec![Block::genesis()]);
        assert_eq!(response.length, 1);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["length"], 1);
        assert_eq!(json["chain"][0]["previous_hash"], "1");
    }

    #[tokio::test]
    async fn test_unreachable_peer_is_a_peer_failure() {
        let client = PeerClient::new(Duration::from_millis(500)).unwrap();
        // Nothing listens on the loopback discard port.
        let result = client.fetch_chain("http://127.0.0.1:9").await;
        assert!(matches!(result, Err(ChainError::PeerFailure { .. })));
    }
}
