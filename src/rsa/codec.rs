//! Packs bytes into decimal blocks that stay below the modulus.
//!
//! Each byte is written as its decimal value followed by [`BYTE_DELIMITER`].
//! A block is closed once it grows past `digits(modulus) - BLOCK_MARGIN`
//! characters, with one random digit appended. Blocks go on the wire as
//! decimal integers joined by [`BLOCK_SEPARATOR`].

use num_bigint::BigInt;
use num_traits::Signed;
use crate::rsa::entropy::EntropySource;
use crate::rsa::error::RsaError;

pub const BYTE_DELIMITER: &str = "987";
pub const BLOCK_SEPARATOR: char = ' ';
pub const BLOCK_MARGIN: usize = 10;

pub fn decimal_digits(n: &BigInt) -> usize {
    n.magnitude().to_str_radix(10).len()
}

/// Length a block may reach before it is closed; negative for tiny moduli.
pub fn block_threshold(modulus: &BigInt) -> isize {
    decimal_digits(modulus) as isize - BLOCK_MARGIN as isize
}

pub fn encode_blocks<E: EntropySource>(
    bytes: &[u8], modulus: &BigInt, entropy: &mut E,
) -> Result<Vec<BigInt>, RsaError> {
    let threshold = block_threshold(modulus);
    let mut blocks = Vec::new();
    let mut block = String::new();
    for b in bytes {
        block.push_str(&b.to_string());
        block.push_str(BYTE_DELIMITER);
        if block.len() as isize > threshold {
            block.push(char::from(b'0' + entropy.next_digit()));
            blocks.push(std::mem::take(&mut block));
        }
    }
    if !block.is_empty() { blocks.push(block); }
    blocks.iter().enumerate().map(|(index, block)| {
        let value = block.parse::<BigInt>().map_err(|e| RsaError::MalformedCiphertext {
            index,
            reason: e.to_string(),
        })?;
        if value >= *modulus {
            return Err(RsaError::BlockOverflow { index });
        }
        Ok(value)
    }).collect()
}

/// Appends the bytes carried by one decrypted block to `out`.
pub fn decode_block(value: &BigInt, index: usize, out: &mut Vec<u8>) -> Result<(), RsaError> {
    if value.is_negative() {
        return Err(RsaError::MalformedCiphertext { index, reason: "negative block".to_string() });
    }
    let text = value.to_string();
    let mut rest = text.as_str();
    let mut first = true;
    while let Some(pos) = rest.find(BYTE_DELIMITER) {
        let digits = &rest[..pos];
        // a leading zero byte loses its "0" once the block is read as an integer
        let byte = if digits.is_empty() && first {
            0
        } else {
            digits.parse::<u8>().map_err(|_| RsaError::MalformedCiphertext {
                index,
                reason: format!("`{}` is not a byte value", digits),
            })?
        };
        out.push(byte);
        rest = &rest[pos + BYTE_DELIMITER.len()..];
        first = false;
    }
    Ok(())
}

pub fn join_blocks(blocks: &[BigInt]) -> String {
    blocks.iter().map(|b| b.to_string()).collect::<Vec<_>>().join(&BLOCK_SEPARATOR.to_string())
}

/// Accepts one trailing separator.
pub fn split_blocks(text: &str) -> Result<Vec<BigInt>, RsaError> {
    let text = text.trim_end_matches(&['\r', '\n'][..]);
    let text = text.strip_suffix(BLOCK_SEPARATOR).unwrap_or(text);
    if text.is_empty() { return Ok(Vec::new()); }
    text.split(BLOCK_SEPARATOR).enumerate().map(|(index, part)| {
        if part.is_empty() || !part.bytes().all(|c| c.is_ascii_digit()) {
            return Err(RsaError::MalformedCiphertext { index, reason: format!("`{}` is not a decimal integer", part) });
        }
        part.parse::<BigInt>().map_err(|e| RsaError::MalformedCiphertext { index, reason: e.to_string() })
    }).collect()
}

#[cfg(test)]
mod tests {
    use std::error::Error;
    use num_bigint::BigInt;
    use crate::rsa::codec::*;
    use crate::rsa::entropy::RngEntropy;
    use crate::rsa::error::RsaError;

    fn modulus_of_digits(digits: usize) -> BigInt {
        format!("9{}", "0".repeat(digits - 1)).parse().unwrap()
    }

    #[test]
    fn test_threshold() {
        assert_eq!(decimal_digits(&BigInt::from(12345)), 5);
        assert_eq!(decimal_digits(&BigInt::from(-12345)), 5);
        assert_eq!(block_threshold(&modulus_of_digits(30)), 20);
        assert_eq!(block_threshold(&BigInt::from(3233)), -6);
    }

    #[test]
    fn test_encode_decode() -> Result<(), Box<dyn Error>> {
        let modulus = modulus_of_digits(40);
        let mut entropy = RngEntropy::seeded(9);
        let source = "Hello RSA! \u{0}\u{ff}".bytes().chain([0, 0, 255, 9, 98, 198]).collect::<Vec<_>>();
        let blocks = encode_blocks(&source, &modulus, &mut entropy)?;
        assert!(blocks.len() > 1);
        assert!(blocks.iter().all(|b| *b < modulus));
        let mut out = Vec::new();
        for (i, b) in blocks.iter().enumerate() {
            decode_block(b, i, &mut out)?;
        }
        assert_eq!(out, source);
        Ok(())
    }

    #[test]
    fn test_block_boundary() -> Result<(), Box<dyn Error>> {
        // threshold 20: "65987" five times is exactly 25 > 20, four times is 20
        let modulus = modulus_of_digits(30);
        let mut entropy = RngEntropy::seeded(1);
        let blocks = encode_blocks(&[65; 4], &modulus, &mut entropy)?;
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].to_string(), "65987".repeat(4));
        let blocks = encode_blocks(&[65; 5], &modulus, &mut entropy)?;
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].to_string().len(), 26);
        let blocks = encode_blocks(&[65; 6], &modulus, &mut entropy)?;
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1].to_string(), "65987");
        Ok(())
    }

    #[test]
    fn test_block_overflow() {
        let mut entropy = RngEntropy::seeded(1);
        let res = encode_blocks(&[200], &BigInt::from(3233), &mut entropy);
        assert!(matches!(res, Err(RsaError::BlockOverflow { index: 0 })));
    }

    #[test]
    fn test_wire_format() -> Result<(), Box<dyn Error>> {
        let blocks = vec![BigInt::from(12), BigInt::from(3456)];
        let text = join_blocks(&blocks);
        assert_eq!(text, "12 3456");
        assert_eq!(split_blocks(&text)?, blocks);
        assert_eq!(split_blocks("12 3456 ")?, blocks);
        assert!(split_blocks("")?.is_empty());
        assert!(matches!(split_blocks("12  3456"), Err(RsaError::MalformedCiphertext { index: 1, .. })));
        assert!(matches!(split_blocks("12 -4"), Err(RsaError::MalformedCiphertext { index: 1, .. })));
        assert!(matches!(split_blocks("x"), Err(RsaError::MalformedCiphertext { index: 0, .. })));
        Ok(())
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let mut out = Vec::new();
        let res = decode_block(&BigInt::from(300_987u32), 2, &mut out);
        assert!(matches!(res, Err(RsaError::MalformedCiphertext { index: 2, .. })));
        let res = decode_block(&BigInt::from(659_879_875u32), 0, &mut out);
        assert!(matches!(res, Err(RsaError::MalformedCiphertext { index: 0, .. })));
    }
}
