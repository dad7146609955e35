//! C6: the outstanding-allocated-balance engine (spec §4.6).

use alloy_primitives::{Address, B256, U256};
use smallocator_types::{finalization_threshold, ApiError, LockId};
use sqlx::PgPool;

use crate::errors::persistence_failure;

/// Sum of `amount` over local compacts for `(sponsor, chainId, lockId)` that
/// are still outstanding as of now — not yet expired past their finalization
/// cushion, and not yet confirmed processed on-chain.
pub async fn allocated_balance(
    pool: &PgPool,
    sponsor: Address,
    chain_id: u64,
    lock_id: LockId,
    observed_processed_claim_hashes: &[B256],
) -> Result<U256, ApiError> {
    let threshold = finalization_threshold(chain_id);
    smallocator_store::compacts::sum_outstanding(
        pool,
        sponsor,
        chain_id,
        lock_id,
        threshold,
        observed_processed_claim_hashes,
    )
    .await
    .map_err(persistence_failure)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_threshold_chain_falls_back_to_default() {
        assert_eq!(finalization_threshold(999_999), 3);
    }
}
