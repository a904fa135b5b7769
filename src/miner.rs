//! Proof-of-work search and verification
//!
//! A nonce is valid when `sha256("{prev_nonce}{nonce}{prev_hash}{merkle_root}")`
//! starts with `difficulty` zero hex digits. There is no retargeting.

use crate::canonical::sha256_hex;
use std::sync::atomic::{AtomicBool, Ordering};

/// Leading zero hex digits required by default (`"0000"`).
pub const DEFAULT_DIFFICULTY: usize = 4;

/// Nonces tried between checks of the cancellation flag.
const CANCEL_CHECK_INTERVAL: u64 = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofOfWork {
    prefix: String,
}

impl Default for ProofOfWork {
    fn default() -> Self {
        Self::new(DEFAULT_DIFFICULTY)
    }
}

impl ProofOfWork {
    pub fn new(difficulty: usize) -> Self {
        ProofOfWork {
            prefix: "0".repeat(difficulty),
        }
    }

    pub fn difficulty(&self) -> usize {
        self.prefix.len()
    }

    pub fn valid_proof(
        &self,
        prev_nonce: u64,
        candidate_nonce: u64,
        prev_hash: &str,
        merkle_root: &str,
    ) -> bool {
        let guess = format!("{prev_nonce}{candidate_nonce}{prev_hash}{merkle_root}");
        sha256_hex(guess).starts_with(&self.prefix)
    }

    /// Count up from zero until a valid nonce turns up. Returns `None` only
    /// if `cancel` is raised first.
    pub fn search(
        &self,
        prev_nonce: u64,
        prev_hash: &str,
        merkle_root: &str,
        cancel: &AtomicBool,
    ) -> Option<u64> {
        let mut nonce = 0u64;
        loop {
            if nonce % CANCEL_CHECK_INTERVAL == 0 && cancel.load(Ordering::Relaxed) {
                tracing::debug!(tried = nonce, "proof-of-work search cancelled");
                return None;
            }
            if self.valid_proof(prev_nonce, nonce, prev_hash, merkle_root) {
                tracing::debug!(nonce, difficulty = self.difficulty(), "proof-of-work found");
                return Some(nonce);
            }
            nonce += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PREV_HASH: &str = "5f2b8c0e";
    const ROOT: &str = "0000000000000000000000000000000000000000000000000000000000000000";

    #[test]
    fn test_search_finds_valid_proof() {
        let pow = ProofOfWork::new(3);
        let cancel = AtomicBool::new(false);
        let nonce = pow.search(100, PREV_HASH, ROOT, &cancel).unwrap();

        assert!(pow.valid_proof(100, nonce, PREV_HASH, ROOT));
        let digest = sha256_hex(format!("100{nonce}{PREV_HASH}{ROOT}"));
        assert!(digest.starts_with("000"));
    }

    #[test]
    fn test_search_returns_smallest_nonce() {
        let pow = ProofOfWork::new(2);
        let cancel = AtomicBool::new(false);
        let nonce = pow.search(7, PREV_HASH, ROOT, &cancel).unwrap();
        assert!((0..nonce).all(|n| !pow.valid_proof(7, n, PREV_HASH, ROOT)));
    }

    #[test]
    fn test_fields_concatenate_without_delimiters() {
        let pow = ProofOfWork::new(0);
        assert!(pow.valid_proof(12, 3, PREV_HASH, ROOT));
        let strict = ProofOfWork::new(1);
        assert_eq!(
            strict.valid_proof(12, 3, PREV_HASH, ROOT),
            strict.valid_proof(1, 23, PREV_HASH, ROOT)
        );
    }

    #[test]
    fn test_cancelled_search_returns_none() {
        let pow = ProofOfWork::new(64);
        let cancel = AtomicBool::new(true);
        assert_eq!(pow.search(0, PREV_HASH, ROOT, &cancel), None);
    }

    #[test]
    fn test_default_difficulty_prefix() {
        assert_eq!(ProofOfWork::default().difficulty(), 4);
    }
}
