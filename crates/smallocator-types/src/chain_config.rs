//! C1: per-chain finalization delay.
//!
//! A chain's on-chain state is only treated as settled `finalizationSeconds`
//! after it was observed. The indexer (C3) and the balance engine (C6) both
//! consult this table; it is pure data with one fallback default.

/// `(chainId, finalizationSeconds)` entries for chains Smallocator has a
/// tuned finalization window for. Chains absent from this table fall back
/// to [`DEFAULT_FINALIZATION_SECONDS`].
pub const KNOWN_CHAINS: &[(u64, u64)] = &[(1, 25), (10, 2), (8453, 4)];

/// Fallback finalization window for chains not present in [`KNOWN_CHAINS`].
pub const DEFAULT_FINALIZATION_SECONDS: u64 = 3;

/// Returns the finalization threshold, in seconds, for `chain_id`.
pub fn finalization_threshold(chain_id: u64) -> u64 {
    KNOWN_CHAINS
        .iter()
        .find(|(id, _)| *id == chain_id)
        .map(|(_, seconds)| *seconds)
        .unwrap_or(DEFAULT_FINALIZATION_SECONDS)
}

/// A `{chainId, finalizationThresholdSeconds}` entry, as reported by `/health`.
#[derive(Debug, Clone, Copy, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportedChain {
    pub chain_id: u64,
    pub finalization_threshold_seconds: u64,
}

/// All chains with a tuned finalization window, for `/health`'s `chainConfig.supportedChains`.
pub fn supported_chains() -> Vec<SupportedChain> {
    KNOWN_CHAINS
        .iter()
        .map(|(chain_id, seconds)| SupportedChain {
            chain_id: *chain_id,
            finalization_threshold_seconds: *seconds,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_chains_match_s1() {
        assert_eq!(finalization_threshold(1), 25);
        assert_eq!(finalization_threshold(10), 2);
        assert_eq!(finalization_threshold(8453), 4);
    }

    #[test]
    fn unknown_chain_falls_back_to_default() {
        assert_eq!(finalization_threshold(999_999), DEFAULT_FINALIZATION_SECONDS);
    }
}
