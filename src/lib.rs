//! ProvChain - a provenance ledger of signed supply-chain events
//!
//! # Architecture
//!
//! The crate is organized into logical modules:
//!
//! ## Core Ledger
//! - [`blockchain`] - Blocks, Merkle commitment, chain validation and ledger state
//! - [`transaction`] - Transaction types and authentication
//! - [`canonical`] - Canonical JSON encoding shared by signing and hashing
//!
//! ## Consensus
//! - [`miner`] - Proof-of-work search and verification
//! - [`consensus`] - Longest-valid-chain resolution
//!
//! ## Cryptography
//! - [`crypto`] - Key pairs, addresses and signatures (secp256k1)
//!
//! ## Networking & Integration
//! - [`network`] - Peer URLs and chain queries
//! - [`node`] - Shared ledger handle with off-lock mining
//! - `api` - HTTP endpoints (feature `api`)
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`error`] - Error types

#![forbid(unsafe_code)]

// ============================================================================
// Core Ledger
// ============================================================================
pub mod blockchain;
pub mod canonical;
pub mod transaction;

// ============================================================================
// Consensus & Mining
// ============================================================================
pub mod consensus;
pub mod miner;

// ============================================================================
// Cryptography
// ============================================================================
pub mod crypto;

// ============================================================================
// Networking
// ============================================================================
pub mod network;
pub mod node;

// ============================================================================
// Integration
// ============================================================================
#[cfg(feature = "api")]
pub mod api;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod config;
pub mod error;
