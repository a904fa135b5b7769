use crate::blockchain::{Block, Ledger, ProductEvent};
use crate::config::Config;
use crate::consensus::Consensus;
use crate::error::{ChainError, RejectReason, Result};
use crate::miner::ProofOfWork;
use crate::network::PeerClient;
use crate::transaction::Transaction;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

/// A running ledger: shared state plus the machinery that mutates it.
///
/// The ledger lock is only held for short, non-blocking sections. The
/// proof-of-work search runs on the blocking pool against a snapshot, so
/// submissions keep flowing while a block is being mined.
pub struct Node {
    pub config: Config,
    pub ledger: Arc<RwLock<Ledger>>,
    consensus: Consensus,
    mining: Mutex<()>,
    shutdown: Arc<AtomicBool>,
}

impl Node {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let pow = ProofOfWork::new(config.mining.difficulty);
        let ledger = Ledger::new(pow, config.mining.reward);
        let client = PeerClient::new(config.network.peer_timeout())?;
        let consensus = Consensus::new(client, config.consensus.validation_mode());

        info!(
            difficulty = config.mining.difficulty,
            validation = ?config.consensus.validation_mode(),
            "ledger initialized"
        );

        Ok(Self {
            config,
            ledger: Arc::new(RwLock::new(ledger)),
            consensus,
            mining: Mutex::new(()),
            shutdown: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Register the configured bootstrap peers. Invalid entries are logged
    /// and skipped.
    pub async fn bootstrap(&self) -> usize {
        let peers = self.config.network.bootstrap_peers.clone();
        self.register_peers(&peers).await.len()
    }

    /// Abort any in-flight proof-of-work search and refuse new ones.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        self.shutdown.clone()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    pub async fn submit_transaction(
        &self,
        tx: Transaction,
    ) -> std::result::Result<u64, RejectReason> {
        let result = self.ledger.write().await.submit(tx);
        if let Err(reason) = &result {
            warn!(reason = %reason, "transaction rejected");
        }
        result
    }

    /// Mine the pending pool into a block. One search runs at a time; the
    /// ledger is locked only to take the snapshot and to commit.
    pub async fn mine(&self) -> Result<Block> {
        let _guard = self.mining.lock().await;
        if self.is_shutting_down() {
            return Err(ChainError::MiningCancelled);
        }

        let (job, pow) = {
            let ledger = self.ledger.read().await;
            let job = ledger.prepare_mining(&self.config.mining.miner_address);
            (job, ledger.pow().clone())
        };

        let cancel = self.shutdown.clone();
        let (prev_proof, prev_hash, merkle_root) =
            (job.prev_proof, job.previous_hash.clone(), job.merkle_root.clone());
        let proof = tokio::task::spawn_blocking(move || {
            pow.search(prev_proof, &prev_hash, &merkle_root, &cancel)
        })
        .await
        .map_err(|e| ChainError::IoError(format!("mining task failed: {e}")))?
        .ok_or(ChainError::MiningCancelled)?;

        let block = self.ledger.write().await.commit_mined(job, proof)?;
        info!(index = block.index, hash = %block.hash(), "mined block");
        Ok(block)
    }

    pub async fn chain(&self) -> Vec<Block> {
        self.ledger.read().await.chain().to_vec()
    }

    pub async fn pending(&self) -> Vec<Transaction> {
        self.ledger.read().await.pending().to_vec()
    }

    pub async fn chain_len(&self) -> usize {
        self.ledger.read().await.len()
    }

    /// Register each URL, returning the normalized form of those accepted.
    pub async fn register_peers(&self, urls: &[String]) -> Vec<String> {
        let mut ledger = self.ledger.write().await;
        urls.iter()
            .filter_map(|url| match ledger.register_peer(url) {
                Ok(peer) => Some(peer),
                Err(e) => {
                    warn!(url = %url, error = %e, "peer not registered");
                    None
                }
            })
            .collect()
    }

    pub async fn peers(&self) -> Vec<String> {
        self.ledger.read().await.peers().iter().cloned().collect()
    }

    /// Run longest-chain resolution against every known peer.
    pub async fn resolve_conflicts(&self) -> bool {
        self.consensus.resolve(&self.ledger).await
    }

    pub async fn product_history(&self, product_id: &str) -> Vec<ProductEvent> {
        self.ledger.read().await.product_history(product_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;

    fn test_node() -> Node {
        let mut config = Config::default();
        config.mining.difficulty = 2;
        Node::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_mine_appends_block() {
        let node = test_node();
        let block = node.mine().await.unwrap();
        assert_eq!(block.index, 2);
        assert_eq!(node.chain_len().await, 2);
        assert_eq!(block.transactions[0].recipient, "miner-address");
    }

    #[tokio::test]
    async fn test_shutdown_cancels_mining() {
        let node = test_node();
        node.shutdown();
        assert!(matches!(node.mine().await, Err(ChainError::MiningCancelled)));
        assert_eq!(node.chain_len().await, 1);
    }

    #[tokio::test]
    async fn test_hard_search_is_cancelled_mid_flight() {
        let mut config = Config::default();
        config.mining.difficulty = 16;
        let node = Arc::new(Node::new(config).unwrap());

        let miner = {
            let node = node.clone();
            tokio::spawn(async move { node.mine().await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        node.shutdown();

        let result = tokio::time::timeout(std::time::Duration::from_secs(10), miner)
            .await
            .expect("search should stop after shutdown")
            .unwrap();
        assert!(matches!(result, Err(ChainError::MiningCancelled)));
        assert_eq!(node.chain_len().await, 1);
    }

    #[tokio::test]
    async fn test_submissions_flow_while_mining() {
        let node = Arc::new(test_node());
        let keypair = KeyPair::generate();
        let mut tx = Transaction::new(keypair.address(), "r", 1.0, "p", "MADE", "", 1);
        tx.sign(&keypair);

        let miner = {
            let node = node.clone();
            tokio::spawn(async move { node.mine().await })
        };
        assert!(node.submit_transaction(tx).await.is_ok());
        miner.await.unwrap().unwrap();

        // Whether the transaction made it into block 2 depends on timing;
        // either way it is in exactly one place.
        let in_block = node.chain().await[1].transactions.len() == 2;
        let pending = node.pending().await.len();
        assert_eq!(in_block as usize + pending, 1);
    }

    #[tokio::test]
    async fn test_register_peers_skips_invalid() {
        let node = test_node();
        let accepted = node
            .register_peers(&[
                "http://127.0.0.1:5001".to_string(),
                "nonsense".to_string(),
                "http://127.0.0.1:5001/".to_string(),
            ])
            .await;
        assert_eq!(accepted.len(), 2);
        assert_eq!(node.peers().await, vec!["http://127.0.0.1:5001".to_string()]);
    }
}
