use std::fmt::{Display, Formatter};
use thiserror::Error;
use crate::rsa::keys::KeyType;

/// Which loop of the key generation ran out of attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    PrimeSearch,
    Nudging,
    Verification,
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::PrimeSearch => f.write_str("searching a prime candidate"),
            Stage::Nudging => f.write_str("nudging a candidate past small factors"),
            Stage::Verification => f.write_str("verifying the private exponent"),
        }
    }
}

#[derive(Debug, Error)]
pub enum RsaError {
    #[error("Key type mismatch: need a {expected} key, got a {found} key")]
    KeyTypeMismatch { expected: KeyType, found: KeyType },

    #[error("Malformed ciphertext block #{index}: {reason}")]
    MalformedCiphertext { index: usize, reason: String },

    #[error("Malformed signature `{0}`")]
    MalformedSignature(String),

    #[error("Malformed key component: {0}")]
    MalformedKey(String),

    #[error("Malformed text: {0}")]
    MalformedText(String),

    #[error("Block #{index} encodes a value not below the modulus")]
    BlockOverflow { index: usize },

    #[error("Key generation exhausted after {attempts} attempts while {stage}")]
    KeyGenerationExhausted { stage: Stage, attempts: usize },

    #[error("Generation timeout after {0} ms")]
    Timeout(i64),

    #[error("Key generation cancelled")]
    Cancelled,

    #[error("Worker thread failed: {0}")]
    WorkerFailed(String),

    #[error("Bit length `{bits}` too small, need at least `{min}`")]
    InvalidBitLength { bits: u32, min: u32 },

    #[error("Unknown hash algorithm `{0}`, available: sha256, sha512, md5")]
    UnknownHash(String),

    #[error("Unknown entropy source `{0}`, available: os, clock")]
    UnknownEntropy(String),

    #[error("Unknown run mode `{0}`, available: generate, encrypt, decrypt, sign, verify, test(default)")]
    UnknownMode(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
