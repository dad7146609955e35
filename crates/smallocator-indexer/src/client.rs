//! HTTP transport for the two indexer operations (spec §4.3).
//!
//! No local retry: failures are surfaced to the caller verbatim (spec §4.3,
//! "Caller policy decides"). Policy for the validation pipeline is to map
//! any transport or GraphQL error onto `ApiError::IndexerUnavailable`.

use alloy_primitives::{Address, U256};
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use smallocator_types::finalization_threshold;
use url::Url;

use crate::types::{CompactDetails, ResourceLockSummary};

#[derive(Debug, thiserror::Error)]
pub enum IndexerError {
    #[error("indexer request failed: {0}")]
    Transport(String),
    #[error("indexer returned a GraphQL error: {0}")]
    GraphQl(String),
    #[error("indexer returned a malformed response: {0}")]
    Malformed(String),
}

/// Typed GraphQL operations the validation pipeline (C7) depends on.
///
/// Generic consumers depend on this trait rather than [`HttpIndexerClient`]
/// directly, so tests can substitute a fixed in-memory fixture.
#[async_trait]
pub trait IndexerClient: Send + Sync {
    async fn get_compact_details(
        &self,
        allocator: Address,
        sponsor: Address,
        lock_id: U256,
        chain_id: u64,
    ) -> Result<CompactDetails, IndexerError>;

    async fn get_all_resource_locks(
        &self,
        sponsor: Address,
    ) -> Result<Vec<ResourceLockSummary>, IndexerError>;
}

/// Production [`IndexerClient`] backed by a remote GraphQL endpoint.
#[derive(Clone, Debug)]
pub struct HttpIndexerClient {
    http: reqwest::Client,
    endpoint: Url,
}

impl HttpIndexerClient {
    pub fn new(endpoint: Url) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint,
        }
    }

    async fn execute<T: for<'de> Deserialize<'de>>(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T, IndexerError> {
        #[derive(Deserialize)]
        struct GraphQlError {
            message: String,
        }
        #[derive(Deserialize)]
        struct GraphQlResponse<T> {
            data: Option<T>,
            #[serde(default)]
            errors: Vec<GraphQlError>,
        }

        let response = self
            .http
            .post(self.endpoint.clone())
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await
            .map_err(|e| IndexerError::Transport(e.to_string()))?;

        let body: GraphQlResponse<T> = response
            .json()
            .await
            .map_err(|e| IndexerError::Malformed(e.to_string()))?;

        if let Some(error) = body.errors.into_iter().next() {
            return Err(IndexerError::GraphQl(error.message));
        }
        body.data
            .ok_or_else(|| IndexerError::Malformed("missing data field".to_string()))
    }
}

const COMPACT_DETAILS_QUERY: &str = r#"
query CompactDetails($allocator: String!, $sponsor: String!, $lockId: String!, $chainId: String!, $finalizationTimestamp: String!, $thresholdTimestamp: String!) {
  compactDetails(allocator: $allocator, sponsor: $sponsor, lockId: $lockId, chainId: $chainId, finalizationTimestamp: $finalizationTimestamp, thresholdTimestamp: $thresholdTimestamp) {
    allocatorId
    deltasPositiveSinceFinalization
    resourceLock { withdrawalStatus balance }
    recentClaimHashesWithinWindow
  }
}
"#;

const ALL_RESOURCE_LOCKS_QUERY: &str = r#"
query AllResourceLocks($sponsor: String!) {
  allResourceLocks(sponsor: $sponsor) {
    chainId
    lockId
    allocatorAddress
  }
}
"#;

#[async_trait]
impl IndexerClient for HttpIndexerClient {
    #[tracing::instrument(skip_all, err, fields(%sponsor, %chain_id, %lock_id))]
    async fn get_compact_details(
        &self,
        allocator: Address,
        sponsor: Address,
        lock_id: U256,
        chain_id: u64,
    ) -> Result<CompactDetails, IndexerError> {
        let now = Utc::now().timestamp();
        let finalization_timestamp = now - finalization_threshold(chain_id) as i64;
        let threshold_timestamp = now - 3 * 60 * 60;

        #[derive(Deserialize)]
        struct Data {
            #[serde(rename = "compactDetails")]
            compact_details: CompactDetails,
        }
        let data: Data = self
            .execute(
                COMPACT_DETAILS_QUERY,
                json!({
                    "allocator": allocator.to_checksum(None),
                    "sponsor": sponsor.to_checksum(None),
                    "lockId": lock_id.to_string(),
                    "chainId": chain_id.to_string(),
                    "finalizationTimestamp": finalization_timestamp.to_string(),
                    "thresholdTimestamp": threshold_timestamp.to_string(),
                }),
            )
            .await?;
        Ok(data.compact_details)
    }

    #[tracing::instrument(skip_all, err, fields(%sponsor))]
    async fn get_all_resource_locks(
        &self,
        sponsor: Address,
    ) -> Result<Vec<ResourceLockSummary>, IndexerError> {
        #[derive(Deserialize)]
        struct Data {
            #[serde(rename = "allResourceLocks")]
            all_resource_locks: Vec<ResourceLockSummary>,
        }
        let data: Data = self
            .execute(
                ALL_RESOURCE_LOCKS_QUERY,
                json!({ "sponsor": sponsor.to_checksum(None) }),
            )
            .await?;
        Ok(data.all_resource_locks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_is_retained_verbatim() {
        let url: Url = "https://indexer.example/graphql".parse().unwrap();
        let client = HttpIndexerClient::new(url.clone());
        assert_eq!(client.endpoint, url);
    }
}
