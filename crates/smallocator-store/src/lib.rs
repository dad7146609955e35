//! Postgres-backed persistence for Smallocator (spec §3 data model, C4).
//!
//! Every query here runs through sqlx's runtime-checked API rather than the
//! `query!`/`query_as!` macros, so the crate never needs a live database at
//! build time.

pub mod codec;
pub mod compacts;
pub mod nonces;
pub mod pool;
pub mod sessions;

pub use compacts::{insert_compact, CompactStoreError};
pub use nonces::NonceStoreError;
pub use pool::{connect, StoreError};
pub use sessions::{create_session, delete_session, get_session, SessionStoreError};
