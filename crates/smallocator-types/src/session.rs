//! Session layer types (C9, spec §3/§4.9): the EIP-4361 payload issued to a
//! client, and the authenticated [`Session`] it redeems into.

use alloy_primitives::Address;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The canonical EIP-4361 ("Sign-In with Ethereum") payload (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Eip4361Payload {
    pub domain: String,
    pub address: Address,
    pub statement: String,
    pub uri: String,
    pub version: String,
    pub chain_id: u64,
    pub nonce: Uuid,
    pub issued_at: DateTime<Utc>,
    pub expiration_time: DateTime<Utc>,
}

impl Eip4361Payload {
    /// Renders the exact newline layout spec §6 mandates, with no trailing
    /// newline. This exact string is what the client signs and what the
    /// server reconstructs byte-for-byte to verify the signature against.
    pub fn to_canonical_message(&self) -> String {
        format!(
            "{domain} wants you to sign in with your Ethereum account:\n{address}\n\n{statement}\n\nURI: {uri}\nVersion: {version}\nChain ID: {chain_id}\nNonce: {nonce}\nIssued At: {issued_at}\nExpiration Time: {expiration_time}",
            domain = self.domain,
            address = self.address,
            statement = self.statement,
            uri = self.uri,
            version = self.version,
            chain_id = self.chain_id,
            nonce = self.nonce,
            issued_at = self.issued_at.to_rfc3339(),
            expiration_time = self.expiration_time.to_rfc3339(),
        )
    }
}

/// An authenticated session (spec §3): opaque id, bound address, expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: Uuid,
    pub address: Address,
    pub expires_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn canonical_message_matches_fixed_layout() {
        let payload = Eip4361Payload {
            domain: "smallocator.example".to_string(),
            address: "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb9226"
                .parse()
                .unwrap(),
            statement: "Sign in to Smallocator".to_string(),
            uri: "https://smallocator.example".to_string(),
            version: "1".to_string(),
            chain_id: 1,
            nonce: Uuid::nil(),
            issued_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            expiration_time: Utc.with_ymd_and_hms(2026, 1, 1, 0, 30, 0).unwrap(),
        };
        let message = payload.to_canonical_message();
        assert!(message.starts_with("smallocator.example wants you to sign in with your Ethereum account:\n"));
        assert!(message.contains("\n\nSign in to Smallocator\n\n"));
        assert!(!message.ends_with('\n'));
    }
}
