use mongodb::error::Error as MongoError;
use thiserror::Error;
use uuid::Uuid;

/// Result alias for the MongoDB room store.
pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

/// Failure talking to MongoDB, mapped to a storage error at the trait boundary.
#[derive(Debug, Error)]
pub enum MongoDaoError {
    /// The connection string was rejected.
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        /// URI as configured.
        uri: String,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// The driver refused the parsed options.
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// The server never answered at startup.
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        /// Pings tried before giving up.
        attempts: u32,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// A health ping failed.
    #[error("MongoDB ping health check failed")]
    HealthPing {
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// An index could not be created.
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        /// Target collection.
        collection: &'static str,
        /// Index name.
        index: &'static str,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Inserting a new room failed.
    #[error("failed to insert room `{id}`")]
    InsertRoom {
        /// Room id.
        id: Uuid,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Replacing a room failed.
    #[error("failed to save room `{id}`")]
    SaveRoom {
        /// Room id.
        id: Uuid,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Looking a room up failed.
    #[error("failed to load room `{room_ref}`")]
    LoadRoom {
        /// Id or code that was looked up.
        room_ref: String,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Reading the rooms of a series failed.
    #[error("failed to list rooms of series `{series_id}`")]
    ListSeries {
        /// Series id.
        series_id: Uuid,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Deleting expired rooms failed.
    #[error("failed to sweep expired rooms")]
    SweepRooms {
        /// Driver error.
        #[source]
        source: MongoError,
    },
}
