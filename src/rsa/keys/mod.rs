pub mod key_data;
pub mod key_pair;

pub use key_data::*;
pub use key_pair::*;

use std::fmt::{Display, Formatter};
use std::str::FromStr;
use num_bigint::BigInt;
use num_traits::{One, Signed};
use crate::rsa::error::RsaError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    Public,
    Private,
}

impl Display for KeyType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyType::Public => f.write_str("public"),
            KeyType::Private => f.write_str("private"),
        }
    }
}

impl FromStr for KeyType {
    type Err = RsaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "public" | "pub" => Ok(KeyType::Public),
            "private" | "priv" => Ok(KeyType::Private),
            _ => Err(RsaError::MalformedKey(format!("unknown key type `{}`", s))),
        }
    }
}

/// Key whose type is only known at runtime, e.g. parts given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Public(PublicKey),
    Private(PrivateKey),
}

impl From<PublicKey> for Key {
    fn from(key: PublicKey) -> Self {
        Key::Public(key)
    }
}

impl From<PrivateKey> for Key {
    fn from(key: PrivateKey) -> Self {
        Key::Private(key)
    }
}

impl Key {
    pub fn from_parts(exponent: BigInt, modulus: BigInt, key_type: KeyType, origin: KeyOrigin) -> Result<Self, RsaError> {
        if modulus <= BigInt::one() {
            return Err(RsaError::MalformedKey(format!("modulus {} must be greater than 1", modulus)));
        }
        if !exponent.is_positive() {
            return Err(RsaError::MalformedKey(format!("exponent {} must be positive", exponent)));
        }
        Ok(match key_type {
            KeyType::Public => Key::Public(PublicKey::new(exponent, modulus, origin)),
            KeyType::Private => Key::Private(PrivateKey::new(exponent, modulus, origin)),
        })
    }

    pub fn key_type(&self) -> KeyType {
        match self {
            Key::Public(_) => KeyType::Public,
            Key::Private(_) => KeyType::Private,
        }
    }

    pub fn exponent(&self) -> &BigInt {
        match self {
            Key::Public(k) => k.exponent(),
            Key::Private(k) => k.exponent(),
        }
    }

    pub fn modulus(&self) -> &BigInt {
        match self {
            Key::Public(k) => k.modulus(),
            Key::Private(k) => k.modulus(),
        }
    }

    pub fn origin(&self) -> &KeyOrigin {
        match self {
            Key::Public(k) => k.origin(),
            Key::Private(k) => k.origin(),
        }
    }

    fn mismatch(&self, expected: KeyType) -> RsaError {
        RsaError::KeyTypeMismatch { expected, found: self.key_type() }
    }

    pub fn encrypt(&self, text: &str) -> Result<String, RsaError> {
        match self {
            Key::Public(k) => k.encrypt(text),
            _ => Err(self.mismatch(KeyType::Public)),
        }
    }

    pub fn decrypt(&self, ciphertext: &str) -> Result<String, RsaError> {
        match self {
            Key::Private(k) => k.decrypt(ciphertext),
            _ => Err(self.mismatch(KeyType::Private)),
        }
    }

    pub fn sign(&self, text: &str) -> Result<String, RsaError> {
        match self {
            Key::Private(k) => Ok(k.sign(text)),
            _ => Err(self.mismatch(KeyType::Private)),
        }
    }

    pub fn check_signature(&self, text: &str, signature: &str) -> Result<bool, RsaError> {
        match self {
            Key::Public(k) => k.check_signature(text, signature),
            _ => Err(self.mismatch(KeyType::Public)),
        }
    }
}
