//! Error types for ProvChain

use thiserror::Error;

/// Why a transaction was refused entry into the pending pool.
///
/// Rejections are always recoverable: the caller gets the reason back and
/// the ledger is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("Missing field: {0}")]
    MissingField(&'static str),
    #[error("Amount must be a finite, non-negative number")]
    InvalidAmount,
    #[error("Amount must be a decimal number such as 5.0; it is signed in that form")]
    IntegerAmount,
    #[error("Sender address does not match sha256(public_key)")]
    BadAddressDerivation,
    #[error("Invalid signature: {0}")]
    BadSignature(String),
    #[error("Malformed public key: {0}")]
    MalformedKey(String),
    #[error("Sender {0} is reserved for locally issued rewards")]
    ReservedSender(String),
}

#[derive(Debug, Clone, Error)]
pub enum ChainError {
    #[error("Chain is empty")]
    EmptyChain,
    #[error("Genesis block does not match the local genesis")]
    GenesisMismatch,
    #[error("Block {expected} carries index {found}")]
    IndexGap { expected: u64, found: u64 },
    #[error("Block {index} does not reference the hash of its predecessor")]
    InvalidBlockLinkage { index: u64 },
    #[error("Block {index} carries an invalid proof of work")]
    InvalidProofOfWork { index: u64 },
    #[error("Block {index} Merkle root does not commit to its transactions")]
    InvalidMerkleRoot { index: u64 },
    #[error("Block {index} contains a rejected transaction: {reason}")]
    InvalidTransaction { index: u64, reason: RejectReason },
    #[error("Transaction rejected: {0}")]
    Rejected(#[from] RejectReason),
    #[error("Invalid peer URL: {0}")]
    InvalidPeerUrl(String),
    #[error("Peer {peer} failed: {message}")]
    PeerFailure { peer: String, message: String },
    #[error("Chain head moved while mining; block discarded")]
    StaleHead,
    #[error("Mining was cancelled")]
    MiningCancelled,
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    IoError(String),
}

impl From<std::io::Error> for ChainError {
    fn from(err: std::io::Error) -> Self {
        ChainError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for ChainError {
    fn from(err: serde_json::Error) -> Self {
        ChainError::Serialization(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, ChainError>;
