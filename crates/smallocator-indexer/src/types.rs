//! Response shapes for the two indexer operations (spec §4.3).

use alloy_primitives::{Address, B256, U256};
use serde::Deserialize;

/// A resource lock's on-chain state, as reported by the indexer.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceLock {
    /// `0` means unlocked, any other value means a forced withdrawal is active.
    pub withdrawal_status: u8,
    pub balance: U256,
}

/// `getCompactDetails` response (spec §4.3a).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompactDetails {
    pub allocator_id: Option<U256>,
    #[serde(default)]
    pub deltas_positive_since_finalization: Vec<U256>,
    pub resource_lock: Option<ResourceLock>,
    #[serde(default)]
    pub recent_claim_hashes_within_window: Vec<B256>,
}

impl CompactDetails {
    pub fn pending_balance(&self) -> U256 {
        self.deltas_positive_since_finalization
            .iter()
            .fold(U256::ZERO, |acc, d| acc + *d)
    }
}

/// One entry of `getAllResourceLocks` (spec §4.3b).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceLockSummary {
    pub chain_id: u64,
    pub lock_id: U256,
    pub allocator_address: Address,
}
