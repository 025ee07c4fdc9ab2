/// Database model definitions.
pub mod models;
/// Duel room persistence and its backends.
pub mod room_store;
/// Storage abstraction layer for database operations.
pub mod storage;
