//! Claim-hash derivation: the EIP-712 digest of a compact on a specific chain.

use alloy_primitives::{keccak256, Address, B256, U256};
use smallocator_types::{Compact, Nonce};

use crate::domain::{compact_type_hash, domain_separator, eip712_digest, pad_address};

/// Derives the claim hash for `compact` on `chain_id`, using `nonce` as the
/// resolved nonce rather than re-deriving it from `compact.nonce`.
///
/// Callers must resolve `compact.nonce` (including the server-allocated
/// `NonceInput::Null` case) into a concrete [`Nonce`] before calling this —
/// the claim hash must attest to the nonce actually reserved in storage, not
/// to whatever `compact.nonce` happened to hold (spec §8, "claimHash is a
/// deterministic pure function of ... compact fields").
///
/// Deterministic and pure: two invocations with identical inputs produce
/// byte-equal output (spec §8, "universal" testable property). The witness
/// and no-witness cases share this single code path (spec Open Question 2).
#[tracing::instrument(skip_all, fields(chain_id, sponsor = %compact.sponsor))]
pub fn claim_hash(compact: &Compact, nonce: Nonce, chain_id: u64) -> B256 {
    let type_hash = compact_type_hash(compact.witness_type_string.as_deref());

    let mut buf = Vec::with_capacity(32 * 8);
    buf.extend_from_slice(type_hash.as_slice());
    buf.extend_from_slice(&pad_address(&compact.arbiter));
    buf.extend_from_slice(&pad_address(&compact.sponsor));
    buf.extend_from_slice(&nonce.0.to_be_bytes::<32>());
    buf.extend_from_slice(&U256::from(compact.expires).to_be_bytes::<32>());
    buf.extend_from_slice(&compact.id.0.to_be_bytes::<32>());
    buf.extend_from_slice(&compact.amount.to_be_bytes::<32>());
    if let Some(witness_hash) = compact.witness_hash {
        buf.extend_from_slice(witness_hash.as_slice());
    }
    let message_hash = keccak256(buf);

    eip712_digest(domain_separator(chain_id), message_hash)
}

/// Convenience used by tests and the cross-check in spec Open Question 2:
/// derives the claim hash for a concrete, fully-specified set of fields
/// without routing through [`Compact`].
pub fn claim_hash_raw(
    arbiter: Address,
    sponsor: Address,
    nonce: U256,
    expires: u64,
    id: U256,
    amount: U256,
    witness_hash: Option<B256>,
    witness_type_string: Option<&str>,
    chain_id: u64,
) -> B256 {
    let type_hash = compact_type_hash(witness_type_string);
    let mut buf = Vec::with_capacity(32 * 8);
    buf.extend_from_slice(type_hash.as_slice());
    buf.extend_from_slice(&pad_address(&arbiter));
    buf.extend_from_slice(&pad_address(&sponsor));
    buf.extend_from_slice(&nonce.to_be_bytes::<32>());
    buf.extend_from_slice(&U256::from(expires).to_be_bytes::<32>());
    buf.extend_from_slice(&id.to_be_bytes::<32>());
    buf.extend_from_slice(&amount.to_be_bytes::<32>());
    if let Some(hash) = witness_hash {
        buf.extend_from_slice(hash.as_slice());
    }
    let message_hash = keccak256(buf);
    eip712_digest(domain_separator(chain_id), message_hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallocator_types::{Compact, LockId, Nonce, NonceInput};

    fn sample_nonce(sponsor: Address) -> Nonce {
        Nonce::pack(sponsor, 0)
    }

    fn sample_compact() -> Compact {
        let sponsor: Address = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb9226"
            .parse()
            .unwrap();
        Compact {
            arbiter: sponsor,
            sponsor,
            nonce: NonceInput::Value(sample_nonce(sponsor)),
            expires: 2_000_000_000,
            id: LockId((U256::from(1u64) << 160) | (U256::from(7u64) << 252)),
            amount: U256::from(1_000_000_000_000_000_000u128),
            witness_type_string: None,
            witness_hash: None,
        }
    }

    #[test]
    fn claim_hash_is_deterministic() {
        let compact = sample_compact();
        let nonce = sample_nonce(compact.sponsor);
        let a = claim_hash(&compact, nonce, 1);
        let b = claim_hash(&compact, nonce, 1);
        assert_eq!(a, b);
    }

    #[test]
    fn claim_hash_changes_with_chain_id() {
        let compact = sample_compact();
        let nonce = sample_nonce(compact.sponsor);
        assert_ne!(claim_hash(&compact, nonce, 1), claim_hash(&compact, nonce, 10));
    }

    #[test]
    fn claim_hash_uses_the_resolved_nonce_not_the_unresolved_input() {
        // A `NonceInput::Null` compact (the server-allocation path) must hash
        // to the nonce actually resolved by the caller, not to zero.
        let mut compact = sample_compact();
        compact.nonce = NonceInput::Null;
        let resolved = sample_nonce(compact.sponsor);

        let hashed_with_resolved_nonce = claim_hash(&compact, resolved, 1);
        let hashed_with_zero_nonce = claim_hash(&compact, Nonce(U256::ZERO), 1);
        assert_ne!(hashed_with_resolved_nonce, hashed_with_zero_nonce);

        compact.nonce = NonceInput::Value(resolved);
        assert_eq!(hashed_with_resolved_nonce, claim_hash(&compact, resolved, 1));
    }

    #[test]
    fn manual_assembly_matches_raw_helper_for_no_witness_case() {
        let compact = sample_compact();
        let nonce = sample_nonce(compact.sponsor);
        let via_compact = claim_hash(&compact, nonce, 1);
        let via_raw = claim_hash_raw(
            compact.arbiter,
            compact.sponsor,
            nonce.0,
            compact.expires,
            compact.id.0,
            compact.amount,
            None,
            None,
            1,
        );
        assert_eq!(via_compact, via_raw);
    }

    #[test]
    fn witness_changes_the_hash() {
        let mut compact = sample_compact();
        let nonce = sample_nonce(compact.sponsor);
        let without_witness = claim_hash(&compact, nonce, 1);
        compact.witness_type_string = Some("Witness witness)Witness(uint256 value)".to_string());
        compact.witness_hash = Some(B256::repeat_byte(0x11));
        let with_witness = claim_hash(&compact, nonce, 1);
        assert_ne!(without_witness, with_witness);
    }
}
