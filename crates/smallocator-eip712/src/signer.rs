//! Identity and signing: a single secp256k1 key held for process lifetime,
//! producing EIP-2098 compact signatures over raw claim-hash digests.

use alloy_primitives::{Address, B256};
use alloy_signer::Signer as _;
use alloy_signer_local::PrivateKeySigner;

#[derive(Debug, thiserror::Error)]
pub enum Eip2098Error {
    #[error("invalid private key: {0}")]
    InvalidKey(String),
    #[error("signing failed: {0}")]
    SigningFailed(String),
    #[error(
        "configured signing address {expected} does not match address derived from private key {derived}"
    )]
    SigningAddressMismatch { expected: Address, derived: Address },
}

/// A 64-byte EIP-2098 compact secp256k1 signature: `r` followed by
/// `yParityAndS` (the high bit of `s` carries the parity).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompactSignature(pub [u8; 64]);

impl CompactSignature {
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

/// Holds the allocator's private key for the process lifetime and signs
/// claim-hash digests with it (spec §4.5).
pub struct SmallocatorSigner {
    inner: PrivateKeySigner,
}

impl SmallocatorSigner {
    /// Parses a `0x`-prefixed 32-byte private key. If `expected_address` is
    /// `Some`, the derived address is compared case-insensitively and a
    /// mismatch is reported (spec §4.5: "mismatch aborts startup").
    pub fn new(private_key_hex: &str, expected_address: Option<Address>) -> Result<Self, Eip2098Error> {
        let signer: PrivateKeySigner = private_key_hex
            .parse()
            .map_err(|e| Eip2098Error::InvalidKey(format!("{e}")))?;
        let derived = signer.address();
        if let Some(expected) = expected_address {
            if !addresses_match_case_insensitive(&expected, &derived) {
                return Err(Eip2098Error::SigningAddressMismatch {
                    expected,
                    derived,
                });
            }
        }
        Ok(Self { inner: signer })
    }

    pub fn signing_address(&self) -> Address {
        self.inner.address()
    }

    /// Signs `digest` as a raw 32-byte prehash (not an Ethereum-personal-signed
    /// envelope), producing a 64-byte EIP-2098 compact signature (spec §4.5).
    #[tracing::instrument(skip_all, err, fields(digest = %digest))]
    pub async fn sign_digest(&self, digest: &B256) -> Result<CompactSignature, Eip2098Error> {
        let signature = self
            .inner
            .sign_hash(digest)
            .await
            .map_err(|e| Eip2098Error::SigningFailed(e.to_string()))?;
        Ok(CompactSignature(signature.as_erc2098()))
    }
}

fn addresses_match_case_insensitive(a: &Address, b: &Address) -> bool {
    a.to_checksum(None).to_lowercase() == b.to_checksum(None).to_lowercase()
}

/// Recovers the signing address from a 64-byte EIP-2098 compact signature
/// over `digest`, for the round-trip property in spec §8.
pub fn recover_from_compact(
    compact: &CompactSignature,
    digest: &B256,
) -> Result<Address, Eip2098Error> {
    alloy_primitives::Signature::from_erc2098(&compact.0)
        .recover_address_from_prehash(digest)
        .map_err(|e| Eip2098Error::SigningFailed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff8";

    #[tokio::test]
    async fn sign_is_deterministic_and_recovers_the_signing_address() {
        let signer = SmallocatorSigner::new(TEST_KEY, None).unwrap();
        let digest = B256::repeat_byte(0x42);

        let sig1 = signer.sign_digest(&digest).await.unwrap();
        let sig2 = signer.sign_digest(&digest).await.unwrap();
        assert_eq!(sig1, sig2);

        let recovered = recover_from_compact(&sig1, &digest).unwrap();
        assert_eq!(recovered, signer.signing_address());
    }

    #[test]
    fn mismatched_expected_address_is_rejected() {
        let wrong: Address = "0x0000000000000000000000000000000000dEaD".parse().unwrap();
        let result = SmallocatorSigner::new(TEST_KEY, Some(wrong));
        assert!(matches!(result, Err(Eip2098Error::SigningAddressMismatch { .. })));
    }
}
