//! EIP-712 domain and struct-hash assembly for The Compact.
//!
//! Both the witness and no-witness cases (spec §4.5) go through this one
//! manual-assembly path, resolving spec's Open Question 2: "Implementations
//! should unify on manual assembly and provide a cross-check against a
//! reference fixture" (see `claim_hash` tests).

use alloy_primitives::{keccak256, Address, B256, U256};

/// `The Compact`'s fixed verifying contract address (spec §4.5).
pub const VERIFYING_CONTRACT: Address = Address::new([
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x18, 0xDF, 0x02, 0x1F, 0xf2, 0x46, 0x7d, 0xF9, 0x7f, 0xf8,
    0x46, 0xE0, 0x9f, 0x48,
]);

pub const DOMAIN_NAME: &str = "The Compact";
pub const DOMAIN_VERSION: &str = "0";

const EIP712_DOMAIN_TYPE: &str =
    "EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";

/// The tuple-head `Compact(...)` type string shared by both cases; the
/// witness case appends its own `witnessTypeString` tail (spec §4.5).
pub const COMPACT_TYPE_HEAD: &str =
    "Compact(address arbiter,address sponsor,uint256 nonce,uint256 expires,uint256 id,uint256 amount";

/// Computes `keccak256(typeString)` for the effective `Compact` type,
/// optionally extended with a witness type-string tail.
pub fn compact_type_hash(witness_type_string: Option<&str>) -> B256 {
    let mut type_string = String::from(COMPACT_TYPE_HEAD);
    match witness_type_string {
        Some(tail) => {
            type_string.push(',');
            type_string.push_str(tail);
        }
        None => type_string.push(')'),
    }
    keccak256(type_string.as_bytes())
}

/// Assembles the EIP-712 domain separator for a given chain id.
pub fn domain_separator(chain_id: u64) -> B256 {
    let domain_type_hash = keccak256(EIP712_DOMAIN_TYPE.as_bytes());
    let name_hash = keccak256(DOMAIN_NAME.as_bytes());
    let version_hash = keccak256(DOMAIN_VERSION.as_bytes());

    let mut buf = Vec::with_capacity(32 * 5);
    buf.extend_from_slice(domain_type_hash.as_slice());
    buf.extend_from_slice(name_hash.as_slice());
    buf.extend_from_slice(version_hash.as_slice());
    buf.extend_from_slice(&U256::from(chain_id).to_be_bytes::<32>());
    buf.extend_from_slice(&pad_address(&VERIFYING_CONTRACT));
    keccak256(buf)
}

/// Left-pads a 20-byte address into a 32-byte ABI word.
pub fn pad_address(address: &Address) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[12..32].copy_from_slice(address.as_slice());
    word
}

/// `keccak256(0x1901 || domainSeparator || messageHash)` (spec §4.5).
pub fn eip712_digest(domain_separator: B256, message_hash: B256) -> B256 {
    let mut buf = Vec::with_capacity(2 + 32 + 32);
    buf.extend_from_slice(&[0x19, 0x01]);
    buf.extend_from_slice(domain_separator.as_slice());
    buf.extend_from_slice(message_hash.as_slice());
    keccak256(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_hash_differs_with_and_without_witness() {
        let no_witness = compact_type_hash(None);
        let with_witness = compact_type_hash(Some("Witness witness)Witness(uint256 value)"));
        assert_ne!(no_witness, with_witness);
    }

    #[test]
    fn domain_separator_is_deterministic() {
        let a = domain_separator(1);
        let b = domain_separator(1);
        assert_eq!(a, b);
        assert_ne!(a, domain_separator(10));
    }
}
