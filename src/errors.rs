//! Conversions from the store/indexer crates' local error types into the
//! shared [`ApiError`] taxonomy. Plain functions rather than `From` impls:
//! neither the source error types nor `ApiError` are local to this crate,
//! so a blanket trait impl here would violate the orphan rule.

use smallocator_indexer::IndexerError;
use smallocator_store::{CompactStoreError, NonceStoreError, SessionStoreError, StoreError};
use smallocator_types::ApiError;

pub fn persistence_failure<E: std::fmt::Display>(err: E) -> ApiError {
    tracing::error!(error = %err, "persistence failure");
    ApiError::PersistenceFailure(err.to_string())
}

pub fn indexer_failure(err: IndexerError) -> ApiError {
    tracing::error!(error = %err, "indexer failure");
    ApiError::IndexerUnavailable(err.to_string())
}

pub fn store_boot_failure(err: StoreError) -> ApiError {
    tracing::error!(error = %err, "store connection failure");
    ApiError::PersistenceFailure(err.to_string())
}

pub fn compact_store_failure(err: CompactStoreError) -> ApiError {
    match err {
        CompactStoreError::NonceAlreadyConsumed => ApiError::NonceAlreadyConsumed,
        other => persistence_failure(other),
    }
}

pub fn nonce_store_failure(err: NonceStoreError) -> ApiError {
    persistence_failure(err)
}

pub fn session_store_failure(err: SessionStoreError) -> ApiError {
    match err {
        SessionStoreError::NonceReplay => ApiError::SessionNonceReplay,
        other => persistence_failure(other),
    }
}
