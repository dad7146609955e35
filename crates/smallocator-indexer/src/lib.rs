//! C3: typed GraphQL client over the on-chain-state indexer.
//!
//! The validation pipeline (C7) is generic over [`IndexerClient`], the same
//! seam the teacher uses for `ProviderMap` in its provider cache: production
//! code wires `HttpIndexerClient`, tests wire an in-memory fixture.

pub mod client;
pub mod types;

pub use client::{HttpIndexerClient, IndexerClient, IndexerError};
pub use types::{CompactDetails, ResourceLock, ResourceLockSummary};
