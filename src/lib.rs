//! Library crate for geo-duel-back, exposing modules for binaries and integration tests.

/// Environment-driven runtime settings.
pub mod config;
/// Country reference table and answer normalization.
pub mod countries;
/// Room persistence.
pub mod dao;
/// Wire payloads.
pub mod dto;
/// HTTP-facing error type.
pub mod error;
/// Axum routers.
pub mod routes;
/// Use cases behind the routes.
pub mod services;
/// Shared state and the duel domain model.
pub mod state;
