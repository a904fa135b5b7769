//! Authentication of transactions, kept apart from the type definitions
use crate::crypto::{address_from_public_key, parse_public_key, public_key_bytes, verify_signature};
use crate::error::RejectReason;
use crate::transaction::types::Transaction;

impl Transaction {
    /// Decide whether this transaction may enter the pending pool.
    ///
    /// Coinbase transactions pass unconditionally. Everything else must be
    /// complete, come from the address derived from its public key, and carry
    /// a signature over its canonical payload. Decoding failures reject.
    pub fn authenticate(&self) -> Result<(), RejectReason> {
        if !self.amount.is_finite() || self.amount < 0.0 {
            return Err(RejectReason::InvalidAmount);
        }
        if self.is_coinbase() {
            return Ok(());
        }

        if self.sender.is_empty() {
            return Err(RejectReason::MissingField("sender"));
        }
        if self.public_key.is_empty() {
            return Err(RejectReason::MissingField("public_key"));
        }
        if self.signature.is_empty() {
            return Err(RejectReason::MissingField("signature"));
        }

        let key_bytes = public_key_bytes(&self.public_key)?;
        if address_from_public_key(&key_bytes) != self.sender {
            return Err(RejectReason::BadAddressDerivation);
        }
        let public_key = parse_public_key(&key_bytes)?;

        verify_signature(&public_key, &self.signable_message(), &self.signature)
    }

    pub fn is_authentic(&self) -> bool {
        self.authenticate().is_ok()
    }
}
