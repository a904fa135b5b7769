//! Transaction types for ProvChain
use crate::canonical::{canonical_hash, encode};
use crate::crypto::KeyPair;
use crate::error::RejectReason;
use serde::{Deserialize, Serialize};
use serde_json::{json, Number, Value};

/// Sender sentinel for locally issued, unsigned reward transactions.
pub const COINBASE: &str = "COINBASE";

/// Event type recorded on mining rewards.
pub const MINING_REWARD_EVENT: &str = "MINING_REWARD";

/// A provenance event, e.g. a custody handoff of `product_id`.
///
/// Accepted transactions are never mutated again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: String,
    pub recipient: String,
    pub amount: f64,
    pub product_id: String,
    pub event_type: String,
    pub metadata: String,
    pub timestamp: i64,
    #[serde(default)]
    pub signature: String,
    #[serde(default)]
    pub public_key: String,
}

impl Transaction {
    /// An unsigned transaction; sign it with [`Transaction::sign`].
    pub fn new(
        sender: impl Into<String>,
        recipient: impl Into<String>,
        amount: f64,
        product_id: impl Into<String>,
        event_type: impl Into<String>,
        metadata: impl Into<String>,
        timestamp: i64,
    ) -> Self {
        Transaction {
            sender: sender.into(),
            recipient: recipient.into(),
            amount,
            product_id: product_id.into(),
            event_type: event_type.into(),
            metadata: metadata.into(),
            timestamp,
            signature: String::new(),
            public_key: String::new(),
        }
    }

    /// The reward credited to whoever mines the next block.
    pub fn coinbase(recipient: impl Into<String>, amount: f64, timestamp: i64) -> Self {
        Transaction::new(
            COINBASE,
            recipient,
            amount,
            "N/A",
            MINING_REWARD_EVENT,
            "",
            timestamp,
        )
    }

    pub fn is_coinbase(&self) -> bool {
        self.sender == COINBASE
    }

    /// Every field except `signature`, as the signer sees it.
    fn signable_value(&self) -> Value {
        json!({
            "sender": self.sender,
            "recipient": self.recipient,
            "amount": self.amount,
            "product_id": self.product_id,
            "event_type": self.event_type,
            "metadata": self.metadata,
            "timestamp": self.timestamp,
            "public_key": self.public_key,
        })
    }

    /// The full record, signature included.
    pub fn canonical_value(&self) -> Value {
        let mut value = self.signable_value();
        value["signature"] = Value::String(self.signature.clone());
        value
    }

    /// Canonical encoding of every field except `signature`.
    pub fn signable_message(&self) -> Vec<u8> {
        encode(&self.signable_value()).into_bytes()
    }

    /// Merkle leaf digest of the full record.
    pub fn hash(&self) -> String {
        canonical_hash(&self.canonical_value())
    }

    /// Fill in `public_key` and `signature` for `keypair`. The sender is
    /// left alone; it must already be `keypair.address()` to authenticate.
    pub fn sign(&mut self, keypair: &KeyPair) {
        self.public_key = keypair.public_key_hex();
        self.signature = hex::encode(keypair.sign(&self.signable_message()));
    }
}

/// A transaction as it arrives from an external caller, before any field is
/// known to be present.
///
/// `amount` keeps its JSON number form: an integer such as `5` would be
/// re-encoded as `5.0` for verification, so integers are refused up front.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionSubmission {
    pub sender: Option<String>,
    pub recipient: Option<String>,
    pub amount: Option<Number>,
    pub product_id: Option<String>,
    pub event_type: Option<String>,
    pub metadata: Option<String>,
    pub timestamp: Option<i64>,
    pub signature: Option<String>,
    pub public_key: Option<String>,
}

impl TransactionSubmission {
    /// Resolve into a [`Transaction`], reporting the first absent required field.
    pub fn into_transaction(self) -> std::result::Result<Transaction, RejectReason> {
        let sender = self.sender.ok_or(RejectReason::MissingField("sender"))?;
        let coinbase = sender == COINBASE;
        let recipient = self.recipient.ok_or(RejectReason::MissingField("recipient"))?;
        let amount = match self.amount {
            None => return Err(RejectReason::MissingField("amount")),
            Some(n) if !n.is_f64() => return Err(RejectReason::IntegerAmount),
            Some(n) => n.as_f64().ok_or(RejectReason::InvalidAmount)?,
        };
        let product_id = self
            .product_id
            .ok_or(RejectReason::MissingField("product_id"))?;
        let event_type = self
            .event_type
            .ok_or(RejectReason::MissingField("event_type"))?;
        let metadata = self.metadata.ok_or(RejectReason::MissingField("metadata"))?;
        let timestamp = self.timestamp.ok_or(RejectReason::MissingField("timestamp"))?;

        let signature = match self.signature {
            Some(s) => s,
            None if coinbase => String::new(),
            None => return Err(RejectReason::MissingField("signature")),
        };
        let public_key = match self.public_key {
            Some(k) => k,
            None if coinbase => String::new(),
            None => return Err(RejectReason::MissingField("public_key")),
        };

        Ok(Transaction {
            sender,
            recipient,
            amount,
            product_id,
            event_type,
            metadata,
            timestamp,
            signature,
            public_key,
        })
    }
}

impl From<Transaction> for TransactionSubmission {
    fn from(tx: Transaction) -> Self {
        TransactionSubmission {
            sender: Some(tx.sender),
            recipient: Some(tx.recipient),
            amount: Number::from_f64(tx.amount),
            product_id: Some(tx.product_id),
            event_type: Some(tx.event_type),
            metadata: Some(tx.metadata),
            timestamp: Some(tx.timestamp),
            signature: Some(tx.signature),
            public_key: Some(tx.public_key),
        }
    }
}
