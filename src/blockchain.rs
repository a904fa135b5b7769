// Thin re-export module: implementation lives under `blockchain/core/`
// (block structure and hashing, chain validation, ledger state).

pub mod core;
pub use core::*;
