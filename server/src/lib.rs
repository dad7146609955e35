//! Smallocator HTTP server.
//!
//! Wires [`smallocator_core`]'s validation pipeline, balance engine, and
//! compact/session services into an axum [`Router`](axum::Router): route
//! dispatch (`handlers`), `x-session-id` authentication (`auth`), and the
//! [`ApiError`](smallocator_types::ApiError) -> HTTP status mapping
//! (`error_response`) are the only transport-shaped concerns this crate
//! owns (spec §1, "HTTP routing ... thin wrappers").
//!
//! # Modules
//!
//! - [`state`] — shared `AppState` handed to every handler.
//! - [`auth`] — `x-session-id` extractor (spec §6 "Authentication header").
//! - [`handlers`] — C10, the full HTTP surface of spec §6.
//! - [`error_response`] — `ApiError` -> `axum::response::Response`.
//! - [`json_body`] — a `Json<T>` extractor whose rejections are JSON too.
//! - [`run`] — boot sequence: config, store, indexer, signer, router, serve.

pub mod auth;
pub mod error_response;
pub mod handlers;
pub mod json_body;
pub mod run;
pub mod state;

pub use run::run;
