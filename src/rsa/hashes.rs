use std::fmt::{Display, Formatter};
use std::str::FromStr;
use md5::Md5;
use sha2::{Digest, Sha256, Sha512};
use crate::rsa::error::RsaError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Sha256,
    Sha512,
    Md5,
}

impl Default for HashAlgorithm {
    fn default() -> Self {
        HashAlgorithm::Sha256
    }
}

impl HashAlgorithm {
    pub fn compute(&self, bytes: &[u8]) -> Vec<u8> {
        match self {
            HashAlgorithm::Sha256 => Sha256::digest(bytes).to_vec(),
            HashAlgorithm::Sha512 => Sha512::digest(bytes).to_vec(),
            HashAlgorithm::Md5 => Md5::digest(bytes).to_vec(),
        }
    }

    /// Digest of the UTF-16LE form of `text`.
    pub fn compute_text(&self, text: &str) -> Vec<u8> {
        self.compute(&text_to_bytes(text))
    }

    pub fn output_len(&self) -> usize {
        match self {
            HashAlgorithm::Sha256 => 32,
            HashAlgorithm::Sha512 => 64,
            HashAlgorithm::Md5 => 16,
        }
    }
}

impl FromStr for HashAlgorithm {
    type Err = RsaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "").as_str() {
            "sha256" => Ok(HashAlgorithm::Sha256),
            "sha512" => Ok(HashAlgorithm::Sha512),
            "md5" => Ok(HashAlgorithm::Md5),
            _ => Err(RsaError::UnknownHash(s.to_string())),
        }
    }
}

impl Display for HashAlgorithm {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            HashAlgorithm::Sha256 => f.write_str("sha256"),
            HashAlgorithm::Sha512 => f.write_str("sha512"),
            HashAlgorithm::Md5 => f.write_str("md5"),
        }
    }
}

/// Two bytes per character, little endian code units.
pub fn text_to_bytes(text: &str) -> Vec<u8> {
    text.encode_utf16().flat_map(|u| u.to_le_bytes()).collect()
}

pub fn bytes_to_text(bytes: &[u8]) -> Result<String, RsaError> {
    if bytes.len() % 2 != 0 {
        return Err(RsaError::MalformedText(format!("odd byte length {}", bytes.len())));
    }
    let units = bytes.chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect::<Vec<_>>();
    String::from_utf16(&units).map_err(|e| RsaError::MalformedText(e.to_string()))
}

#[cfg(test)]
mod tests {
    use std::error::Error;
    use super::*;

    #[test]
    fn test_output_len() {
        for algorithm in [HashAlgorithm::Sha256, HashAlgorithm::Sha512, HashAlgorithm::Md5] {
            let digest = algorithm.compute_text("Hello RSA!");
            assert_eq!(digest.len(), algorithm.output_len());
            assert_eq!(digest, algorithm.compute_text("Hello RSA!"));
            assert_ne!(digest, algorithm.compute_text("Hello RSA?"));
        }
    }

    #[test]
    fn test_parse_name() -> Result<(), Box<dyn Error>> {
        assert_eq!("SHA-256".parse::<HashAlgorithm>()?, HashAlgorithm::Sha256);
        assert_eq!("sha512".parse::<HashAlgorithm>()?, HashAlgorithm::Sha512);
        assert_eq!("md5".parse::<HashAlgorithm>()?, HashAlgorithm::Md5);
        assert!(matches!("crc32".parse::<HashAlgorithm>(), Err(RsaError::UnknownHash(_))));
        Ok(())
    }

    #[test]
    fn test_text_codec() -> Result<(), Box<dyn Error>> {
        let bytes = text_to_bytes("Aж€😀");
        assert_eq!(&bytes[0..4], &[0x41, 0x00, 0x36, 0x04]);
        assert_eq!(bytes.len(), 2 * 5);
        assert_eq!(bytes_to_text(&bytes)?, "Aж€😀");
        assert!(bytes_to_text(&[0x41]).is_err());
        // lone high surrogate
        assert!(bytes_to_text(&[0x00, 0xd8]).is_err());
        Ok(())
    }
}
