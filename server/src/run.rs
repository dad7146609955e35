//! Boot sequence: parse config, connect the store, construct the indexer
//! client and signer, verify the signing-address invariant, then serve
//! (spec §9 "Resource scoping": signer/indexer/pool initialized once and
//! disposed on shutdown).

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::http::Method;
use smallocator_core::config::Config;
use smallocator_core::sig_down::SigDown;
use smallocator_eip712::SmallocatorSigner;
use smallocator_indexer::HttpIndexerClient;
use tower_http::cors;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("configuration error: {0}")]
    Config(#[from] smallocator_core::config::ConfigError),
    #[error("signing error: {0}")]
    Signing(#[from] smallocator_eip712::Eip2098Error),
    #[error("store error: {0}")]
    Store(#[from] smallocator_store::StoreError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Initializes the Smallocator HTTP server.
///
/// - Loads configuration from the environment (spec §6).
/// - Connects to Postgres and runs pending migrations.
/// - Derives the signing address from `PRIVATE_KEY` and aborts on mismatch
///   against `SIGNING_ADDRESS` (spec §4.5).
/// - Binds the axum router and serves until a SIGINT/SIGTERM is received.
pub async fn run() -> Result<(), RunError> {
    rustls::crypto::CryptoProvider::install_default(rustls::crypto::ring::default_provider())
        .expect("failed to install rustls crypto provider");

    let config = Config::load();

    let signer = SmallocatorSigner::new(&config.private_key, None)?;
    config.verify_signing_address(signer.signing_address())?;

    let pool = smallocator_store::connect(&config.database_url).await?;
    let indexer = HttpIndexerClient::new(config.graphql_endpoint.clone());

    let state = AppState {
        pool,
        indexer: Arc::new(indexer),
        signer: Arc::new(signer),
        config: Arc::new(config.clone()),
    };

    let cors = if config.cors_origin == "*" {
        cors::CorsLayer::new()
            .allow_origin(cors::Any)
            .allow_methods([Method::GET, Method::POST, Method::DELETE])
            .allow_headers(cors::Any)
    } else {
        let origin: axum::http::HeaderValue = config
            .cors_origin
            .parse()
            .expect("CORS_ORIGIN must be a valid header value");
        cors::CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET, Method::POST, Method::DELETE])
            .allow_headers(cors::Any)
    };

    let app: Router = handlers::routes()
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let (host, port) = config.bind_addr();
    let addr = SocketAddr::from((host, port));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .inspect_err(|e| tracing::error!(%addr, error = %e, "failed to bind"))?;
    tracing::info!(%addr, "smallocator-server listening");

    let sig_down = SigDown::try_new()?;
    let cancellation_token = sig_down.cancellation_token();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancellation_token.cancelled().await })
        .await?;

    Ok(())
}
