// core.rs splits the ledger engine into blocks, chain replay and mutable state.
pub mod chain;
pub mod state;
pub mod validation;

pub use chain::*;
pub use state::*;
pub use validation::*;
