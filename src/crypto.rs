//! Cryptographic primitives for ProvChain
//!
//! Addresses are `sha256(public_key_bytes)` in lowercase hex. Signatures are
//! compact (64-byte `r || s`) ECDSA over secp256k1, computed on the SHA-256
//! digest of a transaction's canonical payload.

use crate::canonical::sha256_hex;
use crate::error::{ChainError, RejectReason};
use once_cell::sync::Lazy;
use rand::rngs::OsRng;
use secp256k1::{
    constants::{COMPACT_SIGNATURE_SIZE, PUBLIC_KEY_SIZE, SECRET_KEY_SIZE, UNCOMPRESSED_PUBLIC_KEY_SIZE},
    ecdsa::Signature,
    All, Message, PublicKey, Secp256k1, SecretKey,
};
use sha2::{Digest, Sha256};

/// A thread-safe, lazily initialized Secp256k1 context.
static SECP256K1_CONTEXT: Lazy<Secp256k1<All>> = Lazy::new(Secp256k1::new);

/// Raw `x || y` point without the SEC1 tag byte, as written by older wallets.
const RAW_PUBLIC_KEY_SIZE: usize = 64;

/// Derive the address for raw public key bytes.
pub fn address_from_public_key(public_key_bytes: &[u8]) -> String {
    sha256_hex(public_key_bytes)
}

#[derive(Debug, Clone)]
pub struct KeyPair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
}

impl KeyPair {
    /// Generates a new random KeyPair using the OS random number generator.
    pub fn generate() -> Self {
        let secret_key = SecretKey::new(&mut OsRng);
        Self::from_secret_key(secret_key)
    }

    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        let public_key = PublicKey::from_secret_key(&SECP256K1_CONTEXT, &secret_key);
        KeyPair {
            secret_key,
            public_key,
        }
    }

    /// Creates a KeyPair from a hex-encoded 32-byte secret.
    pub fn from_secret_hex(secret_hex: &str) -> Result<Self, ChainError> {
        let bytes = hex::decode(secret_hex.trim())
            .map_err(|e| ChainError::Config(format!("Invalid secret key hex: {}", e)))?;
        let secret_key = SecretKey::from_slice(&bytes).map_err(|e| {
            if bytes.len() != SECRET_KEY_SIZE {
                ChainError::Config(format!(
                    "Secret key must be {} bytes, got {}",
                    SECRET_KEY_SIZE,
                    bytes.len()
                ))
            } else {
                ChainError::Config(format!("Invalid secret key bytes: {}", e))
            }
        })?;
        Ok(Self::from_secret_key(secret_key))
    }

    pub fn secret_key_hex(&self) -> String {
        hex::encode(self.secret_key.secret_bytes())
    }

    /// Compressed SEC1 encoding of the public key.
    pub fn public_key_bytes(&self) -> [u8; PUBLIC_KEY_SIZE] {
        self.public_key.serialize()
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key_bytes())
    }

    pub fn address(&self) -> String {
        address_from_public_key(&self.public_key_bytes())
    }

    /// Signs the SHA-256 digest of `message`, returning the compact signature.
    pub fn sign(&self, message: &[u8]) -> [u8; COMPACT_SIGNATURE_SIZE] {
        let digest: [u8; 32] = Sha256::digest(message).into();
        let message = Message::from_digest(digest);
        SECP256K1_CONTEXT
            .sign_ecdsa(&message, &self.secret_key)
            .serialize_compact()
    }
}

/// Parse a hex-encoded public key. Compressed, uncompressed and raw `x || y`
/// encodings are accepted.
pub fn decode_public_key(public_key_hex: &str) -> Result<(Vec<u8>, PublicKey), RejectReason> {
    let bytes = public_key_bytes(public_key_hex)?;
    let public_key = parse_public_key(&bytes)?;
    Ok((bytes, public_key))
}

/// Hex-decode a public key without interpreting it as a curve point.
pub fn public_key_bytes(public_key_hex: &str) -> Result<Vec<u8>, RejectReason> {
    hex::decode(public_key_hex).map_err(|e| RejectReason::MalformedKey(format!("invalid hex: {}", e)))
}

pub fn parse_public_key(bytes: &[u8]) -> Result<PublicKey, RejectReason> {
    let parsed = match bytes.len() {
        PUBLIC_KEY_SIZE | UNCOMPRESSED_PUBLIC_KEY_SIZE => PublicKey::from_slice(bytes),
        RAW_PUBLIC_KEY_SIZE => {
            let mut tagged = [0u8; UNCOMPRESSED_PUBLIC_KEY_SIZE];
            tagged[0] = 0x04;
            tagged[1..].copy_from_slice(bytes);
            PublicKey::from_slice(&tagged)
        }
        other => {
            return Err(RejectReason::MalformedKey(format!(
                "public key must be {}, {} or {} bytes, got {}",
                PUBLIC_KEY_SIZE, RAW_PUBLIC_KEY_SIZE, UNCOMPRESSED_PUBLIC_KEY_SIZE, other
            )))
        }
    };
    parsed.map_err(|e| RejectReason::MalformedKey(e.to_string()))
}

/// Verifies a hex-encoded compact signature over the SHA-256 digest of `message`.
pub fn verify_signature(
    public_key: &PublicKey,
    message: &[u8],
    signature_hex: &str,
) -> Result<(), RejectReason> {
    let signature_bytes = hex::decode(signature_hex)
        .map_err(|e| RejectReason::BadSignature(format!("invalid hex: {}", e)))?;
    if signature_bytes.len() != COMPACT_SIGNATURE_SIZE {
        return Err(RejectReason::BadSignature(format!(
            "signature must be exactly {} bytes (compact), got {}",
            COMPACT_SIGNATURE_SIZE,
            signature_bytes.len()
        )));
    }
    let mut signature = Signature::from_compact(&signature_bytes)
        .map_err(|e| RejectReason::BadSignature(e.to_string()))?;
    // libsecp256k1 only verifies low-S signatures; other signers may emit high-S.
    signature.normalize_s();

    let digest: [u8; 32] = Sha256::digest(message).into();
    SECP256K1_CONTEXT
        .verify_ecdsa(&Message::from_digest(digest), &signature, public_key)
        .map_err(|_| RejectReason::BadSignature("verification failed".to_string()))
}
