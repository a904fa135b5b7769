use crate::blockchain::core::chain::Block;
use crate::error::ChainError;
use crate::miner::ProofOfWork;
use serde::{Deserialize, Serialize};

/// How much of a candidate chain is re-checked on replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMode {
    /// Hash linkage and proof-of-work only.
    Linkage,
    /// Linkage and proof-of-work, plus the shared genesis, contiguous
    /// indices, Merkle roots recomputed from contents and every transaction
    /// re-authenticated.
    #[default]
    Strict,
}

/// Walk `chain` from genesis to head, reporting the first block that fails.
pub fn validate_chain(
    chain: &[Block],
    pow: &ProofOfWork,
    mode: ValidationMode,
) -> Result<(), ChainError> {
    let genesis = chain.first().ok_or(ChainError::EmptyChain)?;
    if mode == ValidationMode::Strict && *genesis != Block::genesis() {
        return Err(ChainError::GenesisMismatch);
    }

    for (position, pair) in chain.windows(2).enumerate() {
        let (prev, curr) = (&pair[0], &pair[1]);

        if curr.previous_hash != prev.hash() {
            return Err(ChainError::InvalidBlockLinkage { index: curr.index });
        }
        if !pow.valid_proof(prev.proof, curr.proof, &curr.previous_hash, &curr.merkle_root) {
            return Err(ChainError::InvalidProofOfWork { index: curr.index });
        }

        if mode == ValidationMode::Strict {
            let expected = position as u64 + 2;
            if curr.index != expected {
                return Err(ChainError::IndexGap {
                    expected,
                    found: curr.index,
                });
            }
            if !curr.has_valid_merkle_root() {
                return Err(ChainError::InvalidMerkleRoot { index: curr.index });
            }
            for tx in &curr.transactions {
                tx.authenticate()
                    .map_err(|reason| ChainError::InvalidTransaction {
                        index: curr.index,
                        reason,
                    })?;
            }
        }
    }
    Ok(())
}

pub fn valid_chain(chain: &[Block], pow: &ProofOfWork, mode: ValidationMode) -> bool {
    validate_chain(chain, pow, mode).is_ok()
}
