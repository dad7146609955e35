//! The error tags the validation pipeline (C7), compact service (C8), and
//! session service (C9) agree on, and their HTTP status mapping (spec §7).

use alloy_primitives::U256;

/// A user-visible error tag. Each variant names exactly one failure mode
/// from spec §7; `status_code` is the normative HTTP mapping.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    #[error("invalid address: {0}")]
    BadAddress(String),
    #[error("invalid amount: {0}")]
    BadAmount(String),
    #[error("invalid nonce: {0}")]
    BadNonceShape(String),
    #[error("witnessTypeString and witnessHash must both be present or both absent")]
    BadWitnessPair,
    #[error("invalid expires: {0}")]
    BadExpires(String),
    #[error("invalid id: {0}")]
    BadId(String),
    #[error("invalid chainId: {0}")]
    BadChainId(String),

    #[error("compact has already expired")]
    ExpiredCompact,
    #[error("expires is too far in the future (max 7200 seconds)")]
    ExpiresTooFar,

    #[error("reset period too short for the requested expiration")]
    ResetPeriodTooShort,

    #[error("nonce already consumed")]
    NonceAlreadyConsumed,
    #[error("nonce allocation raced; retry exhausted")]
    NonceRaced,

    #[error("sponsor does not match authenticated session")]
    SponsorMismatch,

    #[error("missing x-session-id header")]
    SessionMissing,
    #[error("invalid session")]
    SessionInvalid,
    #[error("session has expired")]
    SessionExpired,
    #[error("session nonce already used")]
    SessionNonceReplay,

    #[error("resource lock not found")]
    ResourceLockNotFound,
    #[error("allocator id mismatch")]
    AllocatorMismatch,
    #[error("forced withdrawal is active for this resource lock")]
    ForcedWithdrawalActive,
    #[error("insufficient balance: have {have}, need {need}")]
    InsufficientBalance { have: U256, need: U256 },

    #[error("indexer unavailable: {0}")]
    IndexerUnavailable(String),
    #[error("persistence failure: {0}")]
    PersistenceFailure(String),
    #[error("signing failure: {0}")]
    SigningFailure(String),
}

/// The three HTTP status families the API surface maps errors onto (spec §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    Internal,
}

impl ApiError {
    pub fn status_class(&self) -> StatusClass {
        use ApiError::*;
        match self {
            BadAddress(_) | BadAmount(_) | BadNonceShape(_) | BadWitnessPair | BadExpires(_)
            | BadId(_) | BadChainId(_) | ExpiredCompact | ExpiresTooFar | ResetPeriodTooShort
            | NonceAlreadyConsumed | NonceRaced | ResourceLockNotFound | AllocatorMismatch
            | ForcedWithdrawalActive | InsufficientBalance { .. } | SessionNonceReplay => {
                StatusClass::BadRequest
            }
            SessionMissing | SessionInvalid | SessionExpired => StatusClass::Unauthorized,
            SponsorMismatch => StatusClass::Forbidden,
            IndexerUnavailable(_) | PersistenceFailure(_) | SigningFailure(_) => {
                StatusClass::Internal
            }
        }
    }

    /// `404` is reserved for "unknown compact/lock" lookups, which are raised
    /// by the API surface directly rather than by the validation pipeline;
    /// callers that need it construct [`StatusClass::NotFound`] themselves.
    pub fn not_found() -> StatusClass {
        StatusClass::NotFound
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sponsor_mismatch_is_forbidden() {
        assert_eq!(ApiError::SponsorMismatch.status_class(), StatusClass::Forbidden);
    }

    #[test]
    fn session_errors_are_unauthorized() {
        assert_eq!(ApiError::SessionExpired.status_class(), StatusClass::Unauthorized);
        assert_eq!(ApiError::SessionMissing.status_class(), StatusClass::Unauthorized);
    }

    #[test]
    fn session_nonce_replay_is_bad_request() {
        assert_eq!(ApiError::SessionNonceReplay.status_class(), StatusClass::BadRequest);
    }

    #[test]
    fn insufficient_balance_is_bad_request() {
        let e = ApiError::InsufficientBalance {
            have: U256::from(1u64),
            need: U256::from(2u64),
        };
        assert_eq!(e.status_class(), StatusClass::BadRequest);
    }
}
