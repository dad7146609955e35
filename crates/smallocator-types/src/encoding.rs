//! C2: fixed-width encoding between integers, addresses, and byte strings.
//!
//! Contracts (spec §4.2):
//! - `address ↔ 20 bytes`: input hex is case-insensitive, output is EIP-55 checksummed.
//! - `u256 ↔ 32 bytes big-endian`: fixed-width, no short forms.
//! - `hex ↔ bytes`: strict, 0x-prefixed at API boundaries.

use alloy_primitives::{Address, U256};

/// Errors produced by the encoding layer. These map directly onto the
/// structural error tags of spec §7 (`BadAddress`, `BadAmount`).
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EncodingError {
    #[error("not a 0x-prefixed hex string: {0}")]
    MissingHexPrefix(String),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
    #[error("expected {expected} bytes, got {actual}")]
    WrongLength { expected: usize, actual: usize },
    #[error("invalid address: {0}")]
    InvalidAddress(String),
    #[error("amount is not a non-negative decimal integer: {0}")]
    InvalidAmount(String),
}

/// Decodes a strict `0x`-prefixed hex string into raw bytes.
///
/// Rejects input without the `0x` prefix: spec §4.2 requires API boundaries
/// to reject non-prefixed hex rather than silently accepting it.
pub fn decode_hex_strict(input: &str) -> Result<Vec<u8>, EncodingError> {
    let stripped = input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .ok_or_else(|| EncodingError::MissingHexPrefix(input.to_string()))?;
    hex::decode(stripped).map_err(|e| EncodingError::InvalidHex(e.to_string()))
}

/// Encodes raw bytes as a `0x`-prefixed lowercase hex string.
pub fn encode_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Parses a case-insensitive `0x`-prefixed address into a checksum-validated [`Address`].
///
/// The input's own casing is not required to be checksummed (spec §4.2 says
/// input is case-insensitive); only the decoded 20-byte length is enforced.
pub fn parse_address(input: &str) -> Result<Address, EncodingError> {
    let bytes = decode_hex_strict(input)?;
    if bytes.len() != 20 {
        return Err(EncodingError::WrongLength {
            expected: 20,
            actual: bytes.len(),
        });
    }
    let mut buf = [0u8; 20];
    buf.copy_from_slice(&bytes);
    Ok(Address::from(buf))
}

/// Renders an address as its EIP-55 checksummed hex string (output contract of spec §4.2).
pub fn checksum_address(address: &Address) -> String {
    address.to_checksum(None)
}

/// Compares two addresses for equality regardless of casing (spec §4.4/§4.8 "checksum-equal").
pub fn addresses_equal(a: &Address, b: &Address) -> bool {
    a == b
}

/// Decodes a 32-byte big-endian value into a [`U256`]; rejects any other width.
pub fn u256_from_be_bytes(bytes: &[u8]) -> Result<U256, EncodingError> {
    if bytes.len() != 32 {
        return Err(EncodingError::WrongLength {
            expected: 32,
            actual: bytes.len(),
        });
    }
    let mut buf = [0u8; 32];
    buf.copy_from_slice(bytes);
    Ok(U256::from_be_bytes(buf))
}

/// Encodes a [`U256`] as a fixed-width 32-byte big-endian array (storage representation).
pub fn u256_to_be_bytes(value: U256) -> [u8; 32] {
    value.to_be_bytes()
}

/// Parses a decimal string (spec's wire representation for `amount`) into a [`U256`].
///
/// Rejects anything that doesn't match `/^\d+$/` (spec §4.7 stage 2), including
/// signs, whitespace, and leading `0x`.
pub fn parse_decimal_amount(input: &str) -> Result<U256, EncodingError> {
    if input.is_empty() || !input.bytes().all(|b| b.is_ascii_digit()) {
        return Err(EncodingError::InvalidAmount(input.to_string()));
    }
    U256::from_str_radix(input, 10).map_err(|_| EncodingError::InvalidAmount(input.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_hex_without_prefix() {
        assert!(matches!(
            decode_hex_strict("deadbeef"),
            Err(EncodingError::MissingHexPrefix(_))
        ));
    }

    #[test]
    fn address_roundtrip_is_checksummed_on_output() {
        let addr = parse_address("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb9226").unwrap();
        let rendered = checksum_address(&addr);
        assert!(rendered.starts_with("0x"));
        assert_eq!(rendered.len(), 42);
    }

    #[test]
    fn amount_must_be_plain_digits() {
        assert!(parse_decimal_amount("1000000000000000000").is_ok());
        assert!(parse_decimal_amount("-1").is_err());
        assert!(parse_decimal_amount("1.0").is_err());
        assert!(parse_decimal_amount("0x1").is_err());
    }

    #[test]
    fn u256_roundtrips_through_32_bytes() {
        let value = U256::from(123456789u64);
        let bytes = u256_to_be_bytes(value);
        assert_eq!(bytes.len(), 32);
        assert_eq!(u256_from_be_bytes(&bytes).unwrap(), value);
    }
}
