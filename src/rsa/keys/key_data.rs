use num::Integer;
use num_bigint::BigInt;
use crate::rsa::codec::{decode_block, encode_blocks, join_blocks, split_blocks};
use crate::rsa::entropy::{EntropySource, RngEntropy};
use crate::rsa::error::RsaError;
use crate::rsa::hashes::{bytes_to_text, text_to_bytes, HashAlgorithm};

/// Identity shared by both halves of a generated pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyOrigin {
    pub owner: String,
    pub password_hash: Vec<u8>,
    pub digest: HashAlgorithm,
}

impl KeyOrigin {
    pub fn new(owner: &str, password: &str, digest: HashAlgorithm) -> Self {
        Self { owner: owner.to_string(), password_hash: digest.compute_text(password), digest }
    }

    pub fn from_hash(owner: &str, password_hash: Vec<u8>, digest: HashAlgorithm) -> Self {
        Self { owner: owner.to_string(), password_hash, digest }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    exponent: BigInt,
    modulus: BigInt,
    origin: KeyOrigin,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivateKey {
    exponent: BigInt,
    modulus: BigInt,
    origin: KeyOrigin,
}

/// Integer the signature scheme works on: the digest read as little endian
/// two's complement, so it may be negative.
fn digest_integer(digest: HashAlgorithm, text: &str) -> BigInt {
    BigInt::from_signed_bytes_le(&digest.compute_text(text))
}

impl PublicKey {
    pub(crate) fn new(exponent: BigInt, modulus: BigInt, origin: KeyOrigin) -> Self {
        Self { exponent, modulus, origin }
    }

    pub fn exponent(&self) -> &BigInt {
        &self.exponent
    }

    pub fn modulus(&self) -> &BigInt {
        &self.modulus
    }

    pub fn origin(&self) -> &KeyOrigin {
        &self.origin
    }

    pub fn encrypt(&self, text: &str) -> Result<String, RsaError> {
        self.encrypt_with(text, &mut RngEntropy::from_entropy())
    }

    /// `entropy` only supplies the random digit closing each block.
    pub fn encrypt_with<E: EntropySource>(&self, text: &str, entropy: &mut E) -> Result<String, RsaError> {
        let blocks = encode_blocks(&text_to_bytes(text), &self.modulus, entropy)?;
        let encrypted = blocks.iter()
            .map(|m| m.modpow(&self.exponent, &self.modulus))
            .collect::<Vec<_>>();
        Ok(join_blocks(&encrypted))
    }

    pub fn check_signature(&self, text: &str, signature: &str) -> Result<bool, RsaError> {
        let s = signature.trim().parse::<BigInt>()
            .map_err(|_| RsaError::MalformedSignature(signature.to_string()))?;
        let h = digest_integer(self.origin.digest, text);
        Ok(s.modpow(&self.exponent, &self.modulus) == h.mod_floor(&self.modulus))
    }
}

impl PrivateKey {
    pub(crate) fn new(exponent: BigInt, modulus: BigInt, origin: KeyOrigin) -> Self {
        Self { exponent, modulus, origin }
    }

    pub fn exponent(&self) -> &BigInt {
        &self.exponent
    }

    pub fn modulus(&self) -> &BigInt {
        &self.modulus
    }

    pub fn origin(&self) -> &KeyOrigin {
        &self.origin
    }

    pub fn decrypt(&self, ciphertext: &str) -> Result<String, RsaError> {
        let mut bytes = Vec::new();
        for (index, c) in split_blocks(ciphertext)?.iter().enumerate() {
            if *c >= self.modulus {
                return Err(RsaError::MalformedCiphertext { index, reason: "block not below the modulus".to_string() });
            }
            decode_block(&c.modpow(&self.exponent, &self.modulus), index, &mut bytes)?;
        }
        bytes_to_text(&bytes)
    }

    pub fn sign(&self, text: &str) -> String {
        digest_integer(self.origin.digest, text)
            .modpow(&self.exponent, &self.modulus)
            .to_string()
    }
}
