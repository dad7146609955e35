//! Core domain types for Smallocator.
//!
//! This crate has no I/O of its own: it defines the `Compact` data model
//! (spec §3), the fixed-width encoding contracts between integers/addresses
//! and bytes (C2), the per-chain finalization-delay table (C1), and the
//! error tags the validation pipeline and API surface agree on (spec §7).

pub mod chain_config;
pub mod compact;
pub mod encoding;
pub mod error;
pub mod session;

pub use chain_config::finalization_threshold;
pub use compact::{Compact, LockId, Nonce, NonceInput, ResetPeriod, StoredCompact, Witness};
pub use error::ApiError;
pub use session::{Eip4361Payload, Session};
