use crate::canonical::{canonical_hash, sha256_hex};
use crate::transaction::Transaction;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// `previous_hash` of the genesis block.
pub const GENESIS_PREVIOUS_HASH: &str = "1";

/// Genesis creation time (2023-01-01T00:00:00Z). Fixed so that independent
/// nodes agree on block 1.
pub const GENESIS_TIMESTAMP: i64 = 1_672_531_200;

/// Merkle root of an empty transaction list.
pub const EMPTY_MERKLE_ROOT: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// 1-based position in the chain.
    pub index: u64,
    pub timestamp: i64,
    pub transactions: Vec<Transaction>,
    pub merkle_root: String,
    pub previous_hash: String,
    pub proof: u64,
}

impl Block {
    pub fn new(
        index: u64,
        timestamp: i64,
        transactions: Vec<Transaction>,
        previous_hash: impl Into<String>,
        proof: u64,
    ) -> Self {
        let merkle_root = Block::calculate_merkle_root(&transactions);
        Block {
            index,
            timestamp,
            transactions,
            merkle_root,
            previous_hash: previous_hash.into(),
            proof,
        }
    }

    pub fn genesis() -> Self {
        Block::new(1, GENESIS_TIMESTAMP, Vec::new(), GENESIS_PREVIOUS_HASH, 0)
    }

    fn canonical_value(&self) -> Value {
        let transactions: Vec<Value> = self
            .transactions
            .iter()
            .map(Transaction::canonical_value)
            .collect();
        json!({
            "index": self.index,
            "timestamp": self.timestamp,
            "transactions": transactions,
            "merkle_root": self.merkle_root,
            "previous_hash": self.previous_hash,
            "proof": self.proof,
        })
    }

    /// Digest over every field of the block. Never stored in the block itself;
    /// the next block carries it as `previous_hash`.
    pub fn hash(&self) -> String {
        canonical_hash(&self.canonical_value())
    }

    /// Reduce transactions to one commitment. Leaves are the canonical hashes
    /// of each transaction; an odd node at any level is paired with itself,
    /// and pairs are hashed as concatenated hex text. A lone leaf is the root.
    pub fn calculate_merkle_root(transactions: &[Transaction]) -> String {
        if transactions.is_empty() {
            return EMPTY_MERKLE_ROOT.to_string();
        }
        let mut level: Vec<String> = transactions.iter().map(Transaction::hash).collect();
        while level.len() > 1 {
            level = level
                .chunks(2)
                .map(|pair| {
                    let left = &pair[0];
                    let right = pair.get(1).unwrap_or(left);
                    sha256_hex(format!("{left}{right}"))
                })
                .collect();
        }
        level.swap_remove(0)
    }

    pub fn has_valid_merkle_root(&self) -> bool {
        Block::calculate_merkle_root(&self.transactions) == self.merkle_root
    }
}
