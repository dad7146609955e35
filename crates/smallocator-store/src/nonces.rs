//! C4 persistence for the anti-replay nonce set (spec §3 ConsumedNonce).
//!
//! Consumption itself happens atomically with the compact insert in
//! [`crate::compacts::insert_compact`]; this module covers the read paths
//! stage 3 of the validation pipeline and advisory nonce allocation need.

use alloy_primitives::Address;
use smallocator_types::Nonce;
use sqlx::{PgPool, Row};

use crate::codec::address_to_bytes;

#[derive(Debug, thiserror::Error)]
pub enum NonceStoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// `(chainId, sponsor, high, low) ∈ compact_nonces` (spec §4.7 stage 3).
#[tracing::instrument(skip_all, err, fields(%chain_id, sponsor = %nonce.sponsor()))]
pub async fn is_consumed(
    pool: &PgPool,
    chain_id: u64,
    nonce: Nonce,
) -> Result<bool, NonceStoreError> {
    let (high, low) = nonce.to_parts();
    let row = sqlx::query(
        "SELECT 1 FROM compact_nonces WHERE chain_id = $1 AND sponsor = $2 AND nonce_high = $3 AND nonce_low = $4",
    )
    .bind(chain_id as i64)
    .bind(address_to_bytes(&nonce.sponsor()))
    .bind(high.to_vec())
    .bind(low.to_vec())
    .fetch_optional(pool)
    .await?;
    Ok(row.is_some())
}

/// The highest consumed counter for `(chainId, sponsor)`, or `None` if the
/// sponsor has never consumed a nonce on this chain (spec §4.8: "allocate
/// the next counter as `max(low) + 1`").
pub async fn max_counter(
    pool: &PgPool,
    chain_id: u64,
    sponsor: Address,
) -> Result<Option<u128>, NonceStoreError> {
    let rows = sqlx::query("SELECT nonce_low FROM compact_nonces WHERE chain_id = $1 AND sponsor = $2")
        .bind(chain_id as i64)
        .bind(address_to_bytes(&sponsor))
        .fetch_all(pool)
        .await?;

    let max = rows
        .into_iter()
        .filter_map(|row| {
            let low: Vec<u8> = row.try_get("nonce_low").ok()?;
            let mut buf = [0u8; 12];
            buf.copy_from_slice(&low);
            let mut padded = [0u8; 16];
            padded[4..16].copy_from_slice(&buf);
            Some(u128::from_be_bytes(padded))
        })
        .max();
    Ok(max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::address_to_bytes;

    fn sponsor() -> Address {
        "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb9226".parse().unwrap()
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn unconsumed_nonce_is_reported_absent(pool: PgPool) {
        let consumed = is_consumed(&pool, 1, Nonce::pack(sponsor(), 0)).await.unwrap();
        assert!(!consumed);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn consumed_nonce_is_reported_present(pool: PgPool) {
        let nonce = Nonce::pack(sponsor(), 7);
        let (high, low) = nonce.to_parts();
        sqlx::query(
            "INSERT INTO compact_nonces (chain_id, sponsor, nonce_high, nonce_low) VALUES ($1, $2, $3, $4)",
        )
        .bind(1_i64)
        .bind(address_to_bytes(&sponsor()))
        .bind(high.to_vec())
        .bind(low.to_vec())
        .execute(&pool)
        .await
        .unwrap();

        assert!(is_consumed(&pool, 1, nonce).await.unwrap());
        // Same nonce on a different chain is a different object (spec §3 "scoped per chain").
        assert!(!is_consumed(&pool, 2, nonce).await.unwrap());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn max_counter_is_none_until_a_nonce_is_consumed(pool: PgPool) {
        assert_eq!(max_counter(&pool, 1, sponsor()).await.unwrap(), None);

        let (high, low) = Nonce::pack(sponsor(), 3).to_parts();
        sqlx::query(
            "INSERT INTO compact_nonces (chain_id, sponsor, nonce_high, nonce_low) VALUES ($1, $2, $3, $4)",
        )
        .bind(1_i64)
        .bind(address_to_bytes(&sponsor()))
        .bind(high.to_vec())
        .bind(low.to_vec())
        .execute(&pool)
        .await
        .unwrap();

        assert_eq!(max_counter(&pool, 1, sponsor()).await.unwrap(), Some(3));
    }
}
