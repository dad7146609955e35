//! Boot-time configuration (spec §6 environment variables).
//!
//! Parsed once via `clap::Parser` with `env` attributes and treated as an
//! immutable value for the lifetime of the process — no runtime-global
//! toggles (spec §9 "Global mutable state: none required").

use std::net::Ipv4Addr;

use alloy_primitives::Address;
use clap::Parser;
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("SIGNING_ADDRESS {signing} does not match the address derived from PRIVATE_KEY ({derived})")]
    SigningAddressMismatch { signing: Address, derived: Address },
}

/// Server configuration, resolved once at boot from environment variables
/// (spec §6). `clap`'s `env` attribute reads `$PORT`, `$DOMAIN`, etc.
/// directly — no intermediate config file.
#[derive(Parser, Debug, Clone)]
#[command(name = "smallocator", about = "Allocation authority for The Compact")]
pub struct Config {
    /// 0x-hex, 32-byte signing key for compacts this instance issues.
    #[arg(long, env = "PRIVATE_KEY")]
    pub private_key: String,

    /// The allocator's on-chain address (EIP-55 checksummed).
    #[arg(long, env = "ALLOCATOR_ADDRESS")]
    pub allocator_address: Address,

    /// Expected signing address; must equal the address derived from `PRIVATE_KEY`.
    #[arg(long, env = "SIGNING_ADDRESS")]
    pub signing_address: Address,

    /// Full public URL this instance is reachable at, used as the EIP-4361 `uri` prefix.
    #[arg(long, env = "BASE_URL")]
    pub base_url: Url,

    /// Host part clients must present as the EIP-4361 `domain`.
    #[arg(long, env = "DOMAIN")]
    pub domain: String,

    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    #[arg(long, env = "CORS_ORIGIN", default_value = "*")]
    pub cors_origin: String,

    /// GraphQL endpoint for the on-chain indexer (spec §4.3, C3).
    #[arg(long, env = "GRAPHQL_ENDPOINT")]
    pub graphql_endpoint: Url,

    /// Skips signature verification on inbound EIP-4361 session payloads. Test-only.
    #[arg(long, env = "SKIP_SIGNING_VERIFICATION", default_value_t = false)]
    pub skip_signing_verification: bool,

    /// Accepts `id == 1` as valid-for-policy regardless of the decoded reset
    /// period (spec §4.5 note, §9 open question). Test-only; defaults off so
    /// production deployments never get it for free.
    #[arg(long, env = "ALLOW_TEST_DOMAIN_BYPASS", default_value_t = false)]
    pub allow_test_domain_bypass: bool,

    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,
}

impl Config {
    /// Parses CLI args / environment, then loads `.env` first if present
    /// (teacher convention: `dotenvy::dotenv().ok()` before `Config::load`).
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn bind_addr(&self) -> (Ipv4Addr, u16) {
        (Ipv4Addr::UNSPECIFIED, self.port)
    }

    /// Verifies `signing_address` matches the key-derived address. Called
    /// once at boot after the signer is constructed (spec §4.5 "if
    /// configured differently... fail fast at startup").
    pub fn verify_signing_address(&self, derived: Address) -> Result<(), ConfigError> {
        if self.signing_address != derived {
            return Err(ConfigError::SigningAddressMismatch {
                signing: self.signing_address,
                derived,
            });
        }
        Ok(())
    }
}
