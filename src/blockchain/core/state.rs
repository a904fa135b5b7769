use crate::blockchain::core::chain::{Block, GENESIS_PREVIOUS_HASH};
use crate::error::{ChainError, RejectReason, Result};
use crate::miner::ProofOfWork;
use crate::network::normalize_peer_url;
use crate::transaction::Transaction;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::atomic::AtomicBool;

/// Reward credited by the coinbase of every mined block.
pub const DEFAULT_MINING_REWARD: f64 = 1.0;

/// A transaction touching a product, with the block that holds it.
/// `block` is `None` while the transaction is still pending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductEvent {
    pub block: Option<u64>,
    #[serde(flatten)]
    pub transaction: Transaction,
}

/// Everything the proof-of-work search needs, captured at mine-start so the
/// search can run without access to the ledger.
#[derive(Debug, Clone)]
pub struct MiningJob {
    pub index: u64,
    pub timestamp: i64,
    pub prev_proof: u64,
    pub previous_hash: String,
    pub merkle_root: String,
    /// Pending transactions at snapshot time, followed by the reward.
    pub transactions: Vec<Transaction>,
    /// How many entries of the pool this job consumes.
    taken: usize,
}

impl MiningJob {
    fn into_block(self, proof: u64) -> Block {
        Block {
            index: self.index,
            timestamp: self.timestamp,
            transactions: self.transactions,
            merkle_root: self.merkle_root,
            previous_hash: self.previous_hash,
            proof,
        }
    }
}

/// The chain, the pending pool and the known peers.
///
/// Every operation either applies fully or leaves the ledger untouched.
#[derive(Debug, Clone)]
pub struct Ledger {
    chain: Vec<Block>,
    pending: Vec<Transaction>,
    peers: BTreeSet<String>,
    pow: ProofOfWork,
    reward: f64,
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new(ProofOfWork::default(), DEFAULT_MINING_REWARD)
    }
}

impl Ledger {
    pub fn new(pow: ProofOfWork, reward: f64) -> Self {
        Ledger {
            chain: vec![Block::genesis()],
            pending: Vec::new(),
            peers: BTreeSet::new(),
            pow,
            reward,
        }
    }

    pub fn chain(&self) -> &[Block] {
        &self.chain
    }

    pub fn pending(&self) -> &[Transaction] {
        &self.pending
    }

    pub fn peers(&self) -> &BTreeSet<String> {
        &self.peers
    }

    pub fn pow(&self) -> &ProofOfWork {
        &self.pow
    }

    pub fn last_block(&self) -> &Block {
        // The chain always holds at least the genesis block.
        &self.chain[self.chain.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    /// Authenticate `tx` and queue it. Returns the index of the block it
    /// would land in if mined next.
    pub fn submit(&mut self, tx: Transaction) -> std::result::Result<u64, RejectReason> {
        tx.authenticate()?;
        self.pending.push(tx);
        Ok(self.last_block().index + 1)
    }

    /// Snapshot the head and the pool, appending a reward for
    /// `reward_recipient`. The ledger is not modified.
    pub fn prepare_mining(&self, reward_recipient: &str) -> MiningJob {
        let head = self.last_block();
        let timestamp = chrono::Utc::now().timestamp();

        let mut transactions = self.pending.clone();
        transactions.push(Transaction::coinbase(reward_recipient, self.reward, timestamp));

        MiningJob {
            index: head.index + 1,
            timestamp,
            prev_proof: head.proof,
            previous_hash: head.hash(),
            merkle_root: Block::calculate_merkle_root(&transactions),
            transactions,
            taken: self.pending.len(),
        }
    }

    /// Append the block for a finished job. Transactions submitted after
    /// the snapshot stay pending.
    pub fn commit_mined(&mut self, job: MiningJob, proof: u64) -> Result<Block> {
        if job.previous_hash != self.last_block().hash() {
            return Err(ChainError::StaleHead);
        }
        if !self
            .pow
            .valid_proof(job.prev_proof, proof, &job.previous_hash, &job.merkle_root)
        {
            return Err(ChainError::InvalidProofOfWork { index: job.index });
        }

        let taken = job.taken.min(self.pending.len());
        self.pending.drain(..taken);
        let block = job.into_block(proof);
        self.chain.push(block.clone());

        tracing::info!(
            index = block.index,
            transactions = block.transactions.len(),
            proof,
            "block appended"
        );
        Ok(block)
    }

    /// Mine the pool into a new block on the calling thread.
    pub fn mine(&mut self, reward_recipient: &str) -> Result<Block> {
        let job = self.prepare_mining(reward_recipient);
        let never = AtomicBool::new(false);
        let proof = self
            .pow
            .search(job.prev_proof, &job.previous_hash, &job.merkle_root, &never)
            .ok_or(ChainError::MiningCancelled)?;
        self.commit_mined(job, proof)
    }

    /// Remember a peer. Registering the same node twice is a no-op; the
    /// normalized URL is returned either way.
    pub fn register_peer(&mut self, url: &str) -> Result<String> {
        let peer = normalize_peer_url(url)?;
        if self.peers.insert(peer.clone()) {
            tracing::info!(peer = %peer, "peer registered");
        }
        Ok(peer)
    }

    /// Adopt `candidate` if it is strictly longer than the local chain and
    /// starts from a well-formed genesis. Linkage and proofs are the caller's
    /// job. Adoption clears the pool.
    pub fn replace_chain(&mut self, candidate: Vec<Block>) -> bool {
        if candidate.len() <= self.chain.len() {
            return false;
        }
        let genesis = &candidate[0];
        if genesis.previous_hash != GENESIS_PREVIOUS_HASH || genesis.proof != 0 {
            tracing::warn!(
                previous_hash = %genesis.previous_hash,
                proof = genesis.proof,
                "candidate chain has a malformed genesis"
            );
            return false;
        }
        tracing::info!(
            old_length = self.chain.len(),
            new_length = candidate.len(),
            dropped_pending = self.pending.len(),
            "chain replaced"
        );
        self.chain = candidate;
        self.pending.clear();
        true
    }

    /// Every event for `product_id`: mined ones in chain order, then pending.
    pub fn product_history(&self, product_id: &str) -> Vec<ProductEvent> {
        let mined = self.chain.iter().flat_map(|block| {
            block
                .transactions
                .iter()
                .filter(|tx| tx.product_id == product_id)
                .map(|tx| ProductEvent {
                    block: Some(block.index),
                    transaction: tx.clone(),
                })
        });
        let pending = self
            .pending
            .iter()
            .filter(|tx| tx.product_id == product_id)
            .map(|tx| ProductEvent {
                block: None,
                transaction: tx.clone(),
            });
        mined.chain(pending).collect()
    }
}
