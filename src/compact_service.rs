//! C8: orchestrates validation, claim-hash derivation, signing, nonce
//! consumption, and persistence for a single compact submission (spec
//! §4.8, §4.10 "Validating -> Signing -> Persisting -> Acknowledged").

use alloy_primitives::Address;
use smallocator_eip712::{claim_hash, SmallocatorSigner};
use smallocator_indexer::IndexerClient;
use smallocator_types::{ApiError, Compact, Nonce, NonceInput, StoredCompact};
use sqlx::PgPool;

use crate::errors::{compact_store_failure, nonce_store_failure};
use crate::validation;

pub struct CompactSubmission {
    pub chain_id: u64,
    pub compact: Compact,
}

pub struct SubmitOutcome {
    pub claim_hash: alloy_primitives::B256,
    pub signature_hex: String,
    pub nonce_hex: String,
}

/// Allocates the next advisory counter for `(chainId, sponsor)`: `max(low) +
/// 1` over consumed rows, or `0` if the sponsor has never consumed a nonce
/// on this chain (spec §4.8). Advisory only — the uniqueness constraint at
/// consumption time is the source of truth.
async fn allocate_nonce(pool: &PgPool, chain_id: u64, sponsor: Address) -> Result<Nonce, ApiError> {
    let max = smallocator_store::nonces::max_counter(pool, chain_id, sponsor)
        .await
        .map_err(nonce_store_failure)?;
    let next_counter = max.map(|c| c + 1).unwrap_or(0);
    Ok(Nonce::pack(sponsor, next_counter))
}

/// Runs the full validation pipeline (C7) for a concrete, nonce-resolved compact.
async fn validate_all(
    pool: &PgPool,
    indexer: &dyn IndexerClient,
    allocator_address: Address,
    allow_test_domain_bypass: bool,
    now: u64,
    chain_id: u64,
    compact: &Compact,
    nonce: Nonce,
) -> Result<(), ApiError> {
    validation::validate_chain_id(chain_id)?;
    validation::validate_structural(compact)?;
    validation::validate_nonce(pool, chain_id, compact.sponsor, nonce).await?;
    validation::validate_expiration(now, compact.expires)?;
    validation::validate_reset_period(now, compact, allow_test_domain_bypass)?;
    validation::validate_solvency(pool, indexer, allocator_address, chain_id, compact).await
}

/// `submit(submission, authenticatedSponsor) -> { claimHash, signatureHex, nonceHex }`.
#[allow(clippy::too_many_arguments)]
pub async fn submit(
    pool: &PgPool,
    indexer: &dyn IndexerClient,
    signer: &SmallocatorSigner,
    allocator_address: Address,
    allow_test_domain_bypass: bool,
    now: u64,
    authenticated_sponsor: Address,
    submission: CompactSubmission,
) -> Result<SubmitOutcome, ApiError> {
    let CompactSubmission { chain_id, compact } = submission;

    if compact.sponsor != authenticated_sponsor {
        return Err(ApiError::SponsorMismatch);
    }

    let mut nonce = match compact.nonce {
        NonceInput::Value(n) => n,
        NonceInput::Null => allocate_nonce(pool, chain_id, compact.sponsor).await?,
    };

    validate_all(
        pool,
        indexer,
        allocator_address,
        allow_test_domain_bypass,
        now,
        chain_id,
        &compact,
        nonce,
    )
    .await?;

    // The claim hash and signature must attest to the resolved `nonce`, not
    // to whatever `compact.nonce` held (it may still be `NonceInput::Null`):
    // a mismatch would sign a digest the reserved nonce can never redeem.
    let mut digest = claim_hash(&compact, nonce, chain_id);
    let mut signature = signer
        .sign_digest(&digest)
        .await
        .map_err(|e| ApiError::SigningFailure(e.to_string()))?;

    let stored = persist(pool, chain_id, &compact, nonce, digest, signature.0).await;
    let stored = match stored {
        Ok(stored) => stored,
        Err(ApiError::NonceAlreadyConsumed) => {
            // The nonce raced with another submission (server-allocated or
            // client-supplied alike); retry once with a freshly allocated
            // counter (spec §4.8/§4.10 "retry once ... a second failure is
            // fatal"). The digest and signature must be re-derived since
            // they are bound to the nonce.
            nonce = allocate_nonce(pool, chain_id, compact.sponsor).await?;
            validate_all(
                pool,
                indexer,
                allocator_address,
                allow_test_domain_bypass,
                now,
                chain_id,
                &compact,
                nonce,
            )
            .await?;
            digest = claim_hash(&compact, nonce, chain_id);
            signature = signer
                .sign_digest(&digest)
                .await
                .map_err(|e| ApiError::SigningFailure(e.to_string()))?;
            persist(pool, chain_id, &compact, nonce, digest, signature.0)
                .await
                .map_err(|_| ApiError::NonceRaced)?
        }
        Err(e) => return Err(e),
    };

    Ok(SubmitOutcome {
        claim_hash: stored.claim_hash,
        signature_hex: signature.to_hex(),
        nonce_hex: format!("0x{:064x}", nonce.0),
    })
}

async fn persist(
    pool: &PgPool,
    chain_id: u64,
    compact: &Compact,
    nonce: Nonce,
    digest: alloy_primitives::B256,
    signature: [u8; 64],
) -> Result<StoredCompact, ApiError> {
    smallocator_store::compacts::insert_compact(pool, chain_id, compact, nonce, digest, signature)
        .await
        .map_err(compact_store_failure)
}
