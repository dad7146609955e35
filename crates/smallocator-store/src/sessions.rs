//! C4 persistence for the session layer (spec §3 Session, §4.9).

use alloy_primitives::Address;
use chrono::{DateTime, Utc};
use smallocator_types::Session;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::codec::{address_to_bytes, bytes_to_address};

#[derive(Debug, thiserror::Error)]
pub enum SessionStoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("session nonce already consumed")]
    NonceReplay,
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

/// Inserts a session and consumes its one-shot nonce atomically (spec §4.9
/// "Creation"). A nonce replay surfaces as [`SessionStoreError::NonceReplay`].
#[tracing::instrument(skip_all, err, fields(%domain, %address))]
pub async fn create_session(
    pool: &PgPool,
    domain: &str,
    nonce: Uuid,
    address: Address,
    expires_at: DateTime<Utc>,
) -> Result<Session, SessionStoreError> {
    let mut tx = pool.begin().await?;

    let inserted = sqlx::query("INSERT INTO session_nonces (domain, nonce) VALUES ($1, $2) ON CONFLICT DO NOTHING")
        .bind(domain)
        .bind(nonce)
        .execute(&mut *tx)
        .await?;
    if inserted.rows_affected() == 0 {
        return Err(SessionStoreError::NonceReplay);
    }

    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO sessions (id, address, expires_at, nonce, domain) VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(id)
    .bind(address_to_bytes(&address))
    .bind(expires_at)
    .bind(nonce)
    .bind(domain)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(Session {
        id,
        address,
        expires_at,
    })
}

/// Looks up a session by id. Expired sessions are deleted on access and
/// reported as absent (spec §4.9 "Verification").
pub async fn get_session(pool: &PgPool, id: Uuid) -> Result<Option<Session>, SessionStoreError> {
    let row = sqlx::query("SELECT id, address, expires_at FROM sessions WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    let Some(row) = row else {
        return Ok(None);
    };

    let expires_at: DateTime<Utc> = row.try_get("expires_at")?;
    if expires_at <= Utc::now() {
        sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        return Ok(None);
    }

    let address_bytes: Vec<u8> = row.try_get("address")?;
    let address = bytes_to_address(&address_bytes).map_err(SessionStoreError::Corrupt)?;
    Ok(Some(Session {
        id,
        address,
        expires_at,
    }))
}

/// Deletes a session (spec §6 `DELETE /session`).
pub async fn delete_session(pool: &PgPool, id: Uuid) -> Result<(), SessionStoreError> {
    sqlx::query("DELETE FROM sessions WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sponsor() -> Address {
        "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb9226".parse().unwrap()
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn session_round_trips_through_create_and_get(pool: PgPool) {
        let nonce = Uuid::new_v4();
        let expires_at = Utc::now() + chrono::Duration::hours(1);
        let session = create_session(&pool, "smallocator.example", nonce, sponsor(), expires_at)
            .await
            .unwrap();

        let fetched = get_session(&pool, session.id).await.unwrap().unwrap();
        assert_eq!(fetched.address, sponsor());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn replaying_a_session_nonce_is_rejected(pool: PgPool) {
        let nonce = Uuid::new_v4();
        let expires_at = Utc::now() + chrono::Duration::hours(1);
        create_session(&pool, "smallocator.example", nonce, sponsor(), expires_at)
            .await
            .unwrap();

        let result = create_session(&pool, "smallocator.example", nonce, sponsor(), expires_at).await;
        assert!(matches!(result, Err(SessionStoreError::NonceReplay)));
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn expired_session_is_deleted_on_access(pool: PgPool) {
        let nonce = Uuid::new_v4();
        let expires_at = Utc::now() - chrono::Duration::seconds(1);
        let session = create_session(&pool, "smallocator.example", nonce, sponsor(), expires_at)
            .await
            .unwrap();

        assert!(get_session(&pool, session.id).await.unwrap().is_none());
        // The row was deleted, not merely filtered: a second access also finds nothing.
        assert!(get_session(&pool, session.id).await.unwrap().is_none());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn deleting_a_session_makes_it_unresolvable(pool: PgPool) {
        let nonce = Uuid::new_v4();
        let expires_at = Utc::now() + chrono::Duration::hours(1);
        let session = create_session(&pool, "smallocator.example", nonce, sponsor(), expires_at)
            .await
            .unwrap();

        delete_session(&pool, session.id).await.unwrap();
        assert!(get_session(&pool, session.id).await.unwrap().is_none());
    }
}
