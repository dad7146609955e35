//! Shared application state handed to every axum handler (spec §9
//! "Resource scoping": signer, indexer client, and database pool are
//! initialized once and disposed on shutdown).

use std::sync::Arc;

use smallocator_core::config::Config;
use smallocator_eip712::SmallocatorSigner;
use smallocator_indexer::IndexerClient;
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub indexer: Arc<dyn IndexerClient>,
    pub signer: Arc<SmallocatorSigner>,
    pub config: Arc<Config>,
}
