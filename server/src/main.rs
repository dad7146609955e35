//! Smallocator HTTP entrypoint.
//!
//! Endpoints (spec §6):
//! - `GET /health` – allocator/signer identity and per-chain finalization config
//! - `GET /session/:chainId/:address`, `POST /session`, `GET /session`, `DELETE /session`
//! - `POST /compact`, `GET /compacts`, `GET /compact/:chainId/:claimHash`
//! - `GET /balance/:chainId/:lockId`, `GET /balances`, `GET /suggested-nonce/:chainId`
//!
//! Environment: see [`smallocator_core::config::Config`] for the full list
//! of recognized variables (`PRIVATE_KEY`, `ALLOCATOR_ADDRESS`, `DATABASE_URL`, ...).

mod auth;
mod error_response;
mod handlers;
mod json_body;
mod run;
mod state;

use std::process;

use crate::run::run;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // With the `telemetry` feature, `Telemetry::new()` installs the tracing
    // subscriber itself (plain `fmt` layer if no `OTEL_*` env var is set, the
    // full OTel pipeline otherwise) and must be held alive until shutdown so
    // its `Drop` impl can flush the exporters. Without the feature, fall back
    // to the plain subscriber the core crate doesn't otherwise install.
    #[cfg(feature = "telemetry")]
    let _telemetry = smallocator_core::telemetry::Telemetry::new();
    #[cfg(not(feature = "telemetry"))]
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "smallocator-server exited with an error");
        process::exit(1)
    }
}
