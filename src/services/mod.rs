/// OpenAPI documentation generation.
pub mod documentation;
/// Duel room operations exposed over HTTP.
pub mod duel_service;
/// Health check service.
pub mod health_service;
/// Optimistic read-modify-write cycle over the room store.
pub mod mutation;
/// Question and target generation per mode.
pub mod questions;
/// Answer evaluation and scoring.
pub mod scoring;
/// Best-of-N series accounting and rematches.
pub mod series;
/// Storage connection supervisor toggling degraded mode.
pub mod storage_supervisor;
