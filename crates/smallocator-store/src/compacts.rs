//! C4 persistence for issued compacts (spec §3 StoredCompact) and the query
//! C6's balance engine is built on.

use alloy_primitives::{Address, B256, U256};
use chrono::Utc;
use smallocator_types::{Compact, LockId, Nonce, StoredCompact};
use sqlx::{PgPool, Row};

use crate::codec::{address_to_bytes, b256_to_bytes, bytes_to_address, bytes_to_b256, bytes_to_u256, u256_to_bytes};

#[derive(Debug, thiserror::Error)]
pub enum CompactStoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("nonce already consumed")]
    NonceAlreadyConsumed,
    #[error("claim hash already stored for this chain")]
    ClaimHashConflict,
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

/// Inserts the consumed-nonce row and the compact row as one atomic unit
/// (spec §4.4, §4.10: "insertion of the consumed nonce and the compact row
/// is one atomic unit"). A nonce race surfaces as
/// [`CompactStoreError::NonceAlreadyConsumed`] so the caller (C8) can retry
/// once with a freshly allocated nonce.
#[tracing::instrument(skip_all, err, fields(%chain_id, sponsor = %compact.sponsor, %claim_hash))]
pub async fn insert_compact(
    pool: &PgPool,
    chain_id: u64,
    compact: &Compact,
    nonce: Nonce,
    claim_hash: B256,
    signature: [u8; 64],
) -> Result<StoredCompact, CompactStoreError> {
    let (high, low) = nonce.to_parts();
    let mut tx = pool.begin().await?;

    let inserted = sqlx::query(
        "INSERT INTO compact_nonces (chain_id, sponsor, nonce_high, nonce_low) VALUES ($1, $2, $3, $4) ON CONFLICT DO NOTHING",
    )
    .bind(chain_id as i64)
    .bind(address_to_bytes(&compact.sponsor))
    .bind(high.to_vec())
    .bind(low.to_vec())
    .execute(&mut *tx)
    .await?;
    if inserted.rows_affected() == 0 {
        return Err(CompactStoreError::NonceAlreadyConsumed);
    }

    let witness_type_string = compact.witness_type_string.clone();
    let witness_hash = compact.witness_hash.map(|h| b256_to_bytes(&h));

    let claim_hash_inserted = sqlx::query(
        "INSERT INTO compacts (chain_id, claim_hash, arbiter, sponsor, nonce_high, nonce_low, expires, lock_id, amount, witness_type_string, witness_hash, signature) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) ON CONFLICT DO NOTHING",
    )
    .bind(chain_id as i64)
    .bind(b256_to_bytes(&claim_hash))
    .bind(address_to_bytes(&compact.arbiter))
    .bind(address_to_bytes(&compact.sponsor))
    .bind(high.to_vec())
    .bind(low.to_vec())
    .bind(compact.expires as i64)
    .bind(u256_to_bytes(compact.id.0))
    .bind(u256_to_bytes(compact.amount))
    .bind(witness_type_string.clone())
    .bind(witness_hash.clone())
    .bind(signature.to_vec())
    .execute(&mut *tx)
    .await?;
    if claim_hash_inserted.rows_affected() == 0 {
        return Err(CompactStoreError::ClaimHashConflict);
    }

    tx.commit().await?;

    Ok(StoredCompact {
        chain_id,
        arbiter: compact.arbiter,
        sponsor: compact.sponsor,
        nonce,
        expires: compact.expires,
        id: compact.id,
        amount: compact.amount,
        witness_type_string: compact.witness_type_string.clone(),
        witness_hash: compact.witness_hash,
        claim_hash,
        signature,
    })
}

pub async fn get_by_claim_hash(
    pool: &PgPool,
    chain_id: u64,
    claim_hash: B256,
) -> Result<Option<StoredCompact>, CompactStoreError> {
    let row = sqlx::query("SELECT * FROM compacts WHERE chain_id = $1 AND claim_hash = $2")
        .bind(chain_id as i64)
        .bind(b256_to_bytes(&claim_hash))
        .fetch_optional(pool)
        .await?;
    row.map(row_to_stored_compact).transpose()
}

pub async fn list_by_sponsor(
    pool: &PgPool,
    sponsor: Address,
) -> Result<Vec<StoredCompact>, CompactStoreError> {
    let rows = sqlx::query("SELECT * FROM compacts WHERE sponsor = $1 ORDER BY id DESC")
        .bind(address_to_bytes(&sponsor))
        .fetch_all(pool)
        .await?;
    rows.into_iter().map(row_to_stored_compact).collect()
}

/// C6: sum of `amount` over compacts matching `(sponsor, chainId, lockId)`
/// that are still outstanding as of `now`, excluding any claim hash the
/// indexer has already confirmed processed (spec §4.6).
pub async fn sum_outstanding(
    pool: &PgPool,
    sponsor: Address,
    chain_id: u64,
    lock_id: LockId,
    finalization_threshold_seconds: u64,
    processed_claim_hashes: &[B256],
) -> Result<U256, CompactStoreError> {
    let rows = sqlx::query("SELECT lock_id, expires, amount, claim_hash FROM compacts WHERE sponsor = $1 AND chain_id = $2")
        .bind(address_to_bytes(&sponsor))
        .bind(chain_id as i64)
        .fetch_all(pool)
        .await?;

    let now = Utc::now().timestamp();
    let mut total = U256::ZERO;
    for row in rows {
        let row_lock_id: Vec<u8> = row.try_get("lock_id")?;
        let row_lock_id = bytes_to_u256(&row_lock_id).map_err(CompactStoreError::Corrupt)?;
        if row_lock_id != lock_id.0 {
            continue;
        }
        let expires: i64 = row.try_get("expires")?;
        if now >= expires + finalization_threshold_seconds as i64 {
            continue;
        }
        let claim_hash_bytes: Vec<u8> = row.try_get("claim_hash")?;
        let claim_hash = bytes_to_b256(&claim_hash_bytes).map_err(CompactStoreError::Corrupt)?;
        if processed_claim_hashes.contains(&claim_hash) {
            continue;
        }
        let amount_bytes: Vec<u8> = row.try_get("amount")?;
        let amount = bytes_to_u256(&amount_bytes).map_err(CompactStoreError::Corrupt)?;
        total += amount;
    }
    Ok(total)
}

fn row_to_stored_compact(row: sqlx::postgres::PgRow) -> Result<StoredCompact, CompactStoreError> {
    let chain_id: i64 = row.try_get("chain_id")?;
    let claim_hash: Vec<u8> = row.try_get("claim_hash")?;
    let arbiter: Vec<u8> = row.try_get("arbiter")?;
    let sponsor: Vec<u8> = row.try_get("sponsor")?;
    let nonce_high: Vec<u8> = row.try_get("nonce_high")?;
    let nonce_low: Vec<u8> = row.try_get("nonce_low")?;
    let expires: i64 = row.try_get("expires")?;
    let lock_id: Vec<u8> = row.try_get("lock_id")?;
    let amount: Vec<u8> = row.try_get("amount")?;
    let witness_type_string: Option<String> = row.try_get("witness_type_string")?;
    let witness_hash: Option<Vec<u8>> = row.try_get("witness_hash")?;
    let signature: Vec<u8> = row.try_get("signature")?;

    let mut high = [0u8; 20];
    high.copy_from_slice(&nonce_high);
    let mut low = [0u8; 12];
    low.copy_from_slice(&nonce_low);

    let witness_hash = witness_hash
        .map(|hash| bytes_to_b256(&hash).map_err(CompactStoreError::Corrupt))
        .transpose()?;

    Ok(StoredCompact {
        chain_id: chain_id as u64,
        arbiter: bytes_to_address(&arbiter).map_err(CompactStoreError::Corrupt)?,
        sponsor: bytes_to_address(&sponsor).map_err(CompactStoreError::Corrupt)?,
        nonce: Nonce::from_parts(high, low),
        expires: expires as u64,
        id: LockId(bytes_to_u256(&lock_id).map_err(CompactStoreError::Corrupt)?),
        amount: bytes_to_u256(&amount).map_err(CompactStoreError::Corrupt)?,
        witness_type_string,
        witness_hash,
        claim_hash: bytes_to_b256(&claim_hash).map_err(CompactStoreError::Corrupt)?,
        signature: signature
            .try_into()
            .map_err(|_| CompactStoreError::Corrupt("signature is not 64 bytes".to_string()))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallocator_types::NonceInput;

    fn sponsor() -> Address {
        "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb9226".parse().unwrap()
    }

    fn sample_compact(sponsor: Address, nonce: Nonce, expires: u64, amount: u64) -> Compact {
        Compact {
            arbiter: sponsor,
            sponsor,
            nonce: NonceInput::Value(nonce),
            expires,
            id: LockId((U256::from(1u64) << 160) | (U256::from(7u64) << 252)),
            amount: U256::from(amount),
            witness_type_string: None,
            witness_hash: None,
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn insert_then_lookup_by_claim_hash_round_trips(pool: PgPool) {
        let nonce = Nonce::pack(sponsor(), 0);
        let compact = sample_compact(sponsor(), nonce, 2_000_000_000, 1_000_000_000_000_000_000);
        let claim_hash = B256::repeat_byte(0x11);
        let signature = [0x22u8; 64];

        let stored = insert_compact(&pool, 1, &compact, nonce, claim_hash, signature)
            .await
            .unwrap();
        assert_eq!(stored.claim_hash, claim_hash);

        let fetched = get_by_claim_hash(&pool, 1, claim_hash).await.unwrap().unwrap();
        assert_eq!(fetched.amount, compact.amount);
        assert_eq!(fetched.nonce, nonce);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn reusing_a_consumed_nonce_is_rejected(pool: PgPool) {
        let nonce = Nonce::pack(sponsor(), 0);
        let first = sample_compact(sponsor(), nonce, 2_000_000_000, 1);
        insert_compact(&pool, 1, &first, nonce, B256::repeat_byte(0x01), [0u8; 64])
            .await
            .unwrap();

        let second = sample_compact(sponsor(), nonce, 2_000_000_001, 2);
        let result = insert_compact(&pool, 1, &second, nonce, B256::repeat_byte(0x02), [0u8; 64]).await;
        assert!(matches!(result, Err(CompactStoreError::NonceAlreadyConsumed)));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn outstanding_balance_excludes_expired_and_processed_claims(pool: PgPool) {
        let now = Utc::now().timestamp() as u64;
        let lock_id = LockId((U256::from(1u64) << 160) | (U256::from(7u64) << 252));

        let outstanding_nonce = Nonce::pack(sponsor(), 0);
        let outstanding = sample_compact(sponsor(), outstanding_nonce, now + 3600, 100);
        let outstanding_hash = B256::repeat_byte(0xAA);
        insert_compact(&pool, 1, &outstanding, outstanding_nonce, outstanding_hash, [0u8; 64])
            .await
            .unwrap();

        let expired_nonce = Nonce::pack(sponsor(), 1);
        let expired = sample_compact(sponsor(), expired_nonce, now - 3600, 50);
        insert_compact(&pool, 1, &expired, expired_nonce, B256::repeat_byte(0xBB), [0u8; 64])
            .await
            .unwrap();

        let processed_nonce = Nonce::pack(sponsor(), 2);
        let processed = sample_compact(sponsor(), processed_nonce, now + 3600, 25);
        let processed_hash = B256::repeat_byte(0xCC);
        insert_compact(&pool, 1, &processed, processed_nonce, processed_hash, [0u8; 64])
            .await
            .unwrap();

        let total = sum_outstanding(&pool, sponsor(), 1, lock_id, 3, &[processed_hash])
            .await
            .unwrap();
        assert_eq!(total, U256::from(100u64));
    }
}
