//! C10: authenticated request dispatch over the compact and session
//! services, plus the balance read path (spec §6).

use std::time::Instant;

use alloy_primitives::{Address, B256, U256};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use smallocator_core::compact_service::{self, CompactSubmission};
use smallocator_core::validation;
use smallocator_core::{balance, session_service};
use smallocator_types::{Compact, Eip4361Payload, LockId, Nonce, StoredCompact};
use tracing::instrument;

use crate::auth::Authenticated;
use crate::error_response::{not_found, ApiErrorResponse};
use crate::json_body::JsonBody;
use crate::state::AppState;

static BOOT_TIME: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

pub fn routes() -> Router<AppState> {
    BOOT_TIME.get_or_init(Instant::now);
    Router::new()
        .route("/health", get(get_health))
        .route("/session/{chain_id}/{address}", get(get_session_payload))
        .route("/session", post(post_session))
        .route("/session", get(get_session))
        .route("/session", delete(delete_session))
        .route("/compact", post(post_compact))
        .route("/compacts", get(get_compacts))
        .route("/compact/{chain_id}/{claim_hash}", get(get_compact))
        .route("/balance/{chain_id}/{lock_id}", get(get_balance))
        .route("/balances", get(get_balances))
        .route("/suggested-nonce/{chain_id}", get(get_suggested_nonce))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChainConfigBody {
    default_finalization_threshold_seconds: u64,
    supported_chains: Vec<smallocator_types::chain_config::SupportedChain>,
}

/// `GET /health` — no auth.
#[instrument(skip_all)]
async fn get_health(State(state): State<AppState>) -> impl IntoResponse {
    let uptime_seconds = BOOT_TIME.get().map(|t| t.elapsed().as_secs()).unwrap_or(0);
    Json(json!({
        "status": "healthy",
        "allocatorAddress": state.config.allocator_address.to_checksum(None),
        "signingAddress": state.signer.signing_address().to_checksum(None),
        "timestamp": Utc::now().to_rfc3339(),
        "uptimeSeconds": uptime_seconds,
        "chainConfig": ChainConfigBody {
            default_finalization_threshold_seconds: smallocator_types::chain_config::DEFAULT_FINALIZATION_SECONDS,
            supported_chains: smallocator_types::chain_config::supported_chains(),
        },
    }))
}

/// `GET /session/:chainId/:address` — no auth.
#[instrument(skip(state))]
async fn get_session_payload(
    State(state): State<AppState>,
    Path((chain_id, address)): Path<(u64, Address)>,
) -> impl IntoResponse {
    let payload = session_service::issue(&state.config.domain, state.config.base_url.as_str(), chain_id, address);
    Json(json!({ "session": payload }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PostSessionRequest {
    signature: String,
    payload: Eip4361Payload,
}

/// `POST /session { signature, payload }` — no auth.
#[instrument(skip_all)]
async fn post_session(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<PostSessionRequest>,
) -> Result<impl IntoResponse, ApiErrorResponse> {
    let session = session_service::create(
        &state.pool,
        &state.config.domain,
        state.config.base_url.as_str(),
        &body.signature,
        &body.payload,
        state.config.skip_signing_verification,
    )
    .await?;
    Ok(Json(json!({ "session": session })))
}

/// `GET /session` — authed.
#[instrument(skip_all)]
async fn get_session(Authenticated(session): Authenticated) -> impl IntoResponse {
    Json(json!({ "session": session }))
}

/// `DELETE /session` — authed.
#[instrument(skip_all)]
async fn delete_session(
    State(state): State<AppState>,
    Authenticated(session): Authenticated,
) -> Result<impl IntoResponse, ApiErrorResponse> {
    session_service::delete(&state.pool, session.id).await?;
    Ok(Json(json!({ "success": true })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PostCompactRequest {
    chain_id: u64,
    compact: Compact,
}

/// `POST /compact { chainId, compact }` — authed.
#[instrument(skip_all)]
async fn post_compact(
    State(state): State<AppState>,
    Authenticated(session): Authenticated,
    JsonBody(body): JsonBody<PostCompactRequest>,
) -> Result<impl IntoResponse, ApiErrorResponse> {
    let now = Utc::now().timestamp() as u64;
    let outcome = compact_service::submit(
        &state.pool,
        state.indexer.as_ref(),
        &state.signer,
        state.config.allocator_address,
        state.config.allow_test_domain_bypass,
        now,
        session.address,
        CompactSubmission {
            chain_id: body.chain_id,
            compact: body.compact,
        },
    )
    .await?;
    Ok(Json(json!({
        "hash": outcome.claim_hash.to_string(),
        "signature": outcome.signature_hex,
        "nonce": outcome.nonce_hex,
    })))
}

/// `GET /compacts` — authed.
#[instrument(skip_all)]
async fn get_compacts(
    State(state): State<AppState>,
    Authenticated(session): Authenticated,
) -> Result<impl IntoResponse, ApiErrorResponse> {
    let compacts: Vec<StoredCompact> = smallocator_store::compacts::list_by_sponsor(&state.pool, session.address)
        .await
        .map_err(smallocator_core::errors::compact_store_failure)?;
    Ok(Json(json!(compacts)))
}

/// `GET /compact/:chainId/:claimHash` — authed.
#[instrument(skip_all)]
async fn get_compact(
    State(state): State<AppState>,
    Authenticated(session): Authenticated,
    Path((chain_id, claim_hash)): Path<(u64, B256)>,
) -> Result<impl IntoResponse, axum::response::Response> {
    let stored = smallocator_store::compacts::get_by_claim_hash(&state.pool, chain_id, claim_hash)
        .await
        .map_err(|e| ApiErrorResponse::from(smallocator_core::errors::compact_store_failure(e)).into_response())?;
    match stored {
        Some(compact) if compact.sponsor == session.address => Ok(Json(json!(compact))),
        _ => Err(not_found("compact not found")),
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BalanceResponse {
    allocatable_balance: String,
    allocated_balance: String,
    balance_available_to_allocate: String,
    withdrawal_status: u8,
}

/// `GET /balance/:chainId/:lockId` — authed.
#[instrument(skip_all)]
async fn get_balance(
    State(state): State<AppState>,
    Authenticated(session): Authenticated,
    Path((chain_id, lock_id)): Path<(u64, U256)>,
) -> Result<impl IntoResponse, ApiErrorResponse> {
    validation::validate_chain_id(chain_id)?;
    let lock_id = LockId(lock_id);
    let response = balance_for_lock(&state, session.address, chain_id, lock_id).await?;
    Ok(Json(json!(response)))
}

async fn balance_for_lock(
    state: &AppState,
    sponsor: Address,
    chain_id: u64,
    lock_id: LockId,
) -> Result<BalanceResponse, ApiErrorResponse> {
    let details = state
        .indexer
        .get_compact_details(state.config.allocator_address, sponsor, lock_id.0, chain_id)
        .await
        .map_err(smallocator_core::errors::indexer_failure)?;
    let resource_lock = details
        .resource_lock
        .as_ref()
        .ok_or(smallocator_types::ApiError::ResourceLockNotFound)?;

    let pending = details.pending_balance();
    let allocatable = resource_lock.balance.saturating_sub(pending);
    let allocated = balance::allocated_balance(
        &state.pool,
        sponsor,
        chain_id,
        lock_id,
        &details.recent_claim_hashes_within_window,
    )
    .await?;

    Ok(BalanceResponse {
        allocatable_balance: allocatable.to_string(),
        allocated_balance: allocated.to_string(),
        balance_available_to_allocate: allocatable.saturating_sub(allocated).to_string(),
        withdrawal_status: resource_lock.withdrawal_status,
    })
}

/// `GET /balances` — authed. Fans out the per-lock balance computation
/// concurrently over every resource lock the indexer reports for this
/// sponsor (spec-supplemented, grounded on the teacher's provider-cache
/// fan-out pattern).
#[instrument(skip_all)]
async fn get_balances(
    State(state): State<AppState>,
    Authenticated(session): Authenticated,
) -> Result<impl IntoResponse, ApiErrorResponse> {
    let locks = state
        .indexer
        .get_all_resource_locks(session.address)
        .await
        .map_err(smallocator_core::errors::indexer_failure)?;

    let futures = locks.into_iter().map(|lock| {
        let state = state.clone();
        async move {
            let result = balance_for_lock(&state, session.address, lock.chain_id, LockId(lock.lock_id)).await;
            (lock.chain_id, lock.lock_id, result)
        }
    });
    let results = futures::future::join_all(futures).await;

    let mut balances = Vec::with_capacity(results.len());
    for (chain_id, lock_id, result) in results {
        let balance = result?;
        balances.push(json!({
            "chainId": chain_id,
            "lockId": lock_id.to_string(),
            "allocatableBalance": balance.allocatable_balance,
            "allocatedBalance": balance.allocated_balance,
            "balanceAvailableToAllocate": balance.balance_available_to_allocate,
            "withdrawalStatus": balance.withdrawal_status,
        }));
    }
    Ok(Json(json!({ "balances": balances })))
}

/// `GET /suggested-nonce/:chainId` — authed. Exposes C8's advisory nonce
/// allocator as a read-only endpoint.
#[instrument(skip_all)]
async fn get_suggested_nonce(
    State(state): State<AppState>,
    Authenticated(session): Authenticated,
    Path(chain_id): Path<u64>,
) -> Result<impl IntoResponse, ApiErrorResponse> {
    let max = smallocator_store::nonces::max_counter(&state.pool, chain_id, session.address)
        .await
        .map_err(smallocator_core::errors::nonce_store_failure)?;
    let counter = max.map(|c| c + 1).unwrap_or(0);
    let nonce = Nonce::pack(session.address, counter);
    Ok(Json(json!({ "nonce": format!("0x{:064x}", nonce.0) })))
}
