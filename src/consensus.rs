//! Longest-valid-chain conflict resolution

use crate::blockchain::{validate_chain, Block, Ledger, ValidationMode};
use crate::miner::ProofOfWork;
use crate::network::PeerClient;
use futures::future::join_all;
use tokio::sync::RwLock;

/// A peer's chain as received, before validation.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub peer: String,
    pub chain: Vec<Block>,
}

/// Queries peers and adopts the longest valid chain.
#[derive(Debug, Clone)]
pub struct Consensus {
    client: PeerClient,
    mode: ValidationMode,
}

impl Consensus {
    pub fn new(client: PeerClient, mode: ValidationMode) -> Self {
        Self { client, mode }
    }

    pub fn mode(&self) -> ValidationMode {
        self.mode
    }

    /// Pick the longest candidate that is strictly longer than `local_len`
    /// and passes validation. Ties go to whichever candidate came first.
    pub fn select_longest(
        local_len: usize,
        candidates: Vec<Candidate>,
        pow: &ProofOfWork,
        mode: ValidationMode,
    ) -> Option<Candidate> {
        let mut best: Option<Candidate> = None;
        for candidate in candidates {
            let floor = best.as_ref().map_or(local_len, |b| b.chain.len());
            if candidate.chain.len() <= floor {
                continue;
            }
            match validate_chain(&candidate.chain, pow, mode) {
                Ok(()) => best = Some(candidate),
                Err(e) => {
                    tracing::warn!(peer = %candidate.peer, length = candidate.chain.len(), error = %e, "peer chain rejected")
                }
            }
        }
        best
    }

    /// Query every known peer and replace the local chain with the longest
    /// valid one. Returns whether the local chain was replaced. Peers that
    /// fail or time out are skipped.
    pub async fn resolve(&self, ledger: &RwLock<Ledger>) -> bool {
        let (peers, local_len, pow) = {
            let ledger = ledger.read().await;
            let peers: Vec<String> = ledger.peers().iter().cloned().collect();
            (peers, ledger.len(), ledger.pow().clone())
        };
        if peers.is_empty() {
            return false;
        }

        let client = &self.client;
        let queries = peers.into_iter().map(move |peer| async move {
            let result = tokio::time::timeout(client.timeout(), client.fetch_chain(&peer)).await;
            (peer, result)
        });

        let mut candidates = Vec::new();
        for (peer, result) in join_all(queries).await {
            match result {
                Ok(Ok(chain)) => candidates.push(Candidate { peer, chain }),
                Ok(Err(e)) => tracing::warn!(peer = %peer, error = %e, "peer query failed"),
                Err(_) => tracing::warn!(peer = %peer, "peer query timed out"),
            }
        }

        // Strict replay verifies every signature; keep it off the async workers.
        let mode = self.mode;
        let selected = tokio::task::spawn_blocking(move || {
            Self::select_longest(local_len, candidates, &pow, mode)
        })
        .await;
        let best = match selected {
            Ok(Some(best)) => best,
            Ok(None) => {
                tracing::debug!(length = local_len, "local chain is authoritative");
                return false;
            }
            Err(e) => {
                tracing::error!(error = %e, "chain validation task failed");
                return false;
            }
        };

        // The local chain may have grown while peers were being queried.
        let mut ledger = ledger.write().await;
        let replaced = ledger.replace_chain(best.chain);
        if replaced {
            tracing::info!(peer = %best.peer, length = ledger.len(), "adopted peer chain");
        }
        replaced
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grown(blocks: usize) -> Vec<Block> {
        let mut ledger = Ledger::new(ProofOfWork::new(1), 1.0);
        for _ in 0..blocks {
            ledger.mine("m").unwrap();
        }
        ledger.chain().to_vec()
    }

    fn candidate(peer: &str, chain: Vec<Block>) -> Candidate {
        Candidate { peer: peer.to_string(), chain }
    }

    #[test]
    fn test_longest_valid_candidate_wins() {
        let pow = ProofOfWork::new(1);
        let picked = Consensus::select_longest(
            2,
            vec![candidate("a", grown(3)), candidate("b", grown(5)), candidate("c", grown(4))],
            &pow,
            ValidationMode::Strict,
        )
        .unwrap();
        assert_eq!(picked.peer, "b");
        assert_eq!(picked.chain.len(), 6);
    }

    #[test]
    fn test_equal_or_shorter_candidates_ignored() {
        let pow = ProofOfWork::new(1);
        let picked = Consensus::select_longest(
            4,
            vec![candidate("a", grown(2)), candidate("b", grown(3))],
            &pow,
            ValidationMode::Strict,
        );
        assert!(picked.is_none());
    }

    #[test]
    fn test_invalid_longer_candidate_skipped() {
        let pow = ProofOfWork::new(1);
        let mut forged = grown(6);
        forged[3].previous_hash = "0".repeat(64);
        let picked = Consensus::select_longest(
            1,
            vec![candidate("forged", forged), candidate("honest", grown(2))],
            &pow,
            ValidationMode::Linkage,
        )
        .unwrap();
        assert_eq!(picked.peer, "honest");
    }

    #[test]
    fn test_first_seen_wins_ties() {
        let pow = ProofOfWork::new(1);
        let picked = Consensus::select_longest(
            1,
            vec![candidate("first", grown(3)), candidate("second", grown(3))],
            &pow,
            ValidationMode::Strict,
        )
        .unwrap();
        assert_eq!(picked.peer, "first");
    }

    #[tokio::test]
    async fn test_resolve_without_peers_keeps_local() {
        let ledger = RwLock::new(Ledger::new(ProofOfWork::new(1), 1.0));
        let client = PeerClient::new(std::time::Duration::from_secs(1)).unwrap();
        let consensus = Consensus::new(client, ValidationMode::Strict);
        assert!(!consensus.resolve(&ledger).await);
        assert_eq!(ledger.read().await.len(), 1);
    }
}
