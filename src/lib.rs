//! Core allocation-authority logic for Smallocator: a non-custodial
//! off-chain signer for The Compact's cross-chain resource-lock protocol.
//!
//! This crate holds everything data/control-flow-shaped and nothing
//! transport-shaped: the validation pipeline, balance engine, compact and
//! session services operate over a Postgres pool and an [`IndexerClient`]
//! trait object, independent of HTTP. The `smallocator-server` binary wires
//! these into axum routes.
//!
//! # Modules
//!
//! - [`config`] — boot-time configuration parsed from environment variables.
//! - [`balance`] — C6, the outstanding-allocated-balance engine.
//! - [`validation`] — C7, the six-stage compact validation pipeline.
//! - [`compact_service`] — C8, orchestrates validation, signing, and persistence.
//! - [`session_service`] — C9, EIP-4361 issuance/verification and session lifecycle.
//! - [`telemetry`] — tracing/OpenTelemetry bootstrap.
//! - [`sig_down`] — SIGINT/SIGTERM graceful shutdown.
//! - [`trace_id`] — per-request correlation id middleware.

pub mod balance;
pub mod compact_service;
pub mod config;
pub mod errors;
pub mod session_service;
pub mod sig_down;
#[cfg(feature = "telemetry")]
pub mod telemetry;
pub mod trace_id;
pub mod validation;

pub use smallocator_indexer::{HttpIndexerClient, IndexerClient, IndexerError};
pub use smallocator_types::{finalization_threshold, ApiError, Compact, LockId, Nonce, NonceInput};
