//! Conversions between domain types and the fixed-width `BYTEA` columns
//! spec §6 requires ("Binary columns store fixed-width big-endian values").

use alloy_primitives::{Address, B256, U256};

pub fn address_to_bytes(address: &Address) -> Vec<u8> {
    address.as_slice().to_vec()
}

pub fn bytes_to_address(bytes: &[u8]) -> Result<Address, String> {
    if bytes.len() != 20 {
        return Err(format!("expected 20-byte address, got {}", bytes.len()));
    }
    let mut buf = [0u8; 20];
    buf.copy_from_slice(bytes);
    Ok(Address::from(buf))
}

pub fn u256_to_bytes(value: U256) -> Vec<u8> {
    value.to_be_bytes::<32>().to_vec()
}

pub fn bytes_to_u256(bytes: &[u8]) -> Result<U256, String> {
    if bytes.len() != 32 {
        return Err(format!("expected 32-byte value, got {}", bytes.len()));
    }
    let mut buf = [0u8; 32];
    buf.copy_from_slice(bytes);
    Ok(U256::from_be_bytes(buf))
}

pub fn b256_to_bytes(value: &B256) -> Vec<u8> {
    value.as_slice().to_vec()
}

pub fn bytes_to_b256(bytes: &[u8]) -> Result<B256, String> {
    if bytes.len() != 32 {
        return Err(format!("expected 32-byte hash, got {}", bytes.len()));
    }
    Ok(B256::from_slice(bytes))
}
