//! C9: EIP-4361 payload issuance, personal-sign verification, and session
//! lifecycle (spec §4.9).

use std::str::FromStr;

use alloy_primitives::{Address, Signature};
use chrono::{DateTime, Duration, Utc};
use smallocator_types::{ApiError, Eip4361Payload, Session};
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::session_store_failure;

pub const SESSION_REQUEST_TTL_MINUTES: i64 = 30;
pub const SESSION_CREATION_CLOCK_SKEW_SECONDS: i64 = 5;
pub const SESSION_MAX_TTL_SECONDS: i64 = 3600;
pub const STATEMENT: &str = "Sign in to Smallocator";

/// `GET /session/:chainId/:address`: issues a fresh EIP-4361 payload for the
/// client to sign. The payload itself is not persisted — only its nonce is
/// checked for replay when the client redeems it (spec §4.9 "Issuance").
pub fn issue(domain: &str, base_url: &str, chain_id: u64, address: Address) -> Eip4361Payload {
    let now = Utc::now();
    Eip4361Payload {
        domain: domain.to_string(),
        address,
        statement: STATEMENT.to_string(),
        uri: base_url.to_string(),
        version: "1".to_string(),
        chain_id,
        nonce: Uuid::new_v4(),
        issued_at: now,
        expiration_time: now + Duration::minutes(SESSION_REQUEST_TTL_MINUTES),
    }
}

/// `POST /session { signature, payload }`: verifies the personal-sign
/// envelope against `payload.address`, checks every invariant in spec
/// §4.9 "Creation", and on success persists a session while consuming the
/// payload's nonce.
#[allow(clippy::too_many_arguments)]
pub async fn create(
    pool: &PgPool,
    domain: &str,
    base_url: &str,
    signature_hex: &str,
    payload: &Eip4361Payload,
    skip_signing_verification: bool,
) -> Result<Session, ApiError> {
    if payload.domain != domain {
        return Err(ApiError::SessionInvalid);
    }
    if payload.statement != STATEMENT {
        return Err(ApiError::SessionInvalid);
    }
    if !payload.uri.starts_with(base_url) {
        return Err(ApiError::SessionInvalid);
    }
    if payload.chain_id == 0 {
        return Err(ApiError::SessionInvalid);
    }

    let now = Utc::now();
    let issued_skew = (now - payload.issued_at).num_seconds().abs();
    if issued_skew > SESSION_CREATION_CLOCK_SKEW_SECONDS {
        return Err(ApiError::SessionInvalid);
    }
    let ttl = (payload.expiration_time - now).num_seconds();
    if ttl <= 0 || ttl > SESSION_MAX_TTL_SECONDS {
        return Err(ApiError::SessionInvalid);
    }

    if !skip_signing_verification {
        verify_personal_sign(&payload.to_canonical_message(), signature_hex, payload.address)?;
    }

    let expires_at: DateTime<Utc> = now + Duration::hours(1);
    smallocator_store::create_session(pool, domain, payload.nonce, payload.address, expires_at)
        .await
        .map_err(session_store_failure)
}

/// `GET /session` / the `x-session-id` auth middleware: resolves a session
/// id to its bound address, or an error tag distinguishing "missing",
/// "invalid", and "expired" (spec §4.9 "Verification").
pub async fn verify(pool: &PgPool, session_id: Uuid) -> Result<Session, ApiError> {
    smallocator_store::get_session(pool, session_id)
        .await
        .map_err(session_store_failure)?
        .ok_or(ApiError::SessionExpired)
}

/// `DELETE /session`.
pub async fn delete(pool: &PgPool, session_id: Uuid) -> Result<(), ApiError> {
    smallocator_store::delete_session(pool, session_id)
        .await
        .map_err(session_store_failure)
}

fn verify_personal_sign(message: &str, signature_hex: &str, expected: Address) -> Result<(), ApiError> {
    let signature = Signature::from_str(signature_hex).map_err(|_| ApiError::SessionInvalid)?;
    let recovered = signature
        .recover_address_from_msg(message.as_bytes())
        .map_err(|_| ApiError::SessionInvalid)?;
    if recovered != expected {
        return Err(ApiError::SessionInvalid);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_payload_uses_fixed_statement_and_version() {
        let address: Address = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb9226".parse().unwrap();
        let payload = issue("smallocator.example", "https://smallocator.example", 1, address);
        assert_eq!(payload.statement, STATEMENT);
        assert_eq!(payload.version, "1");
        assert!(payload.expiration_time > payload.issued_at);
    }
}
