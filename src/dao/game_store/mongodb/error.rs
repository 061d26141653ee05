use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};
use thiserror::Error;

/// Outcome of a MongoDB store call before it is mapped to a storage error.
pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

const DUPLICATE_KEY_CODE: i32 = 11000;

/// Failures raised by the MongoDB store.
#[derive(Debug, Error)]
pub enum MongoDaoError {
    /// The connection string could not be parsed.
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        /// Rejected connection string.
        uri: String,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// The driver refused the parsed client options.
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// The server never answered a ping while connecting.
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        /// Pings sent before giving up.
        attempts: u32,
        /// Error of the last ping.
        #[source]
        source: MongoError,
    },
    /// A health check ping failed on an established connection.
    #[error("MongoDB ping health check failed")]
    HealthPing {
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// Creating an index at startup failed.
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        /// Collection the index belongs to.
        collection: &'static str,
        /// Index name.
        index: &'static str,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// A read or write failed.
    #[error("failed to {operation} for `{key}`")]
    Query {
        /// What was being attempted, phrased as a verb.
        operation: &'static str,
        /// Game or player the operation targeted.
        key: String,
        /// Driver error.
        #[source]
        source: MongoError,
    },
    /// A unique index rejected the insert.
    #[error("`{key}` already exists in `{collection}`")]
    Duplicate {
        /// Collection holding the clashing document.
        collection: &'static str,
        /// Clashing key.
        key: String,
    },
    /// An update matched no document.
    #[error("`{key}` not found in `{collection}`")]
    Missing {
        /// Collection searched.
        collection: &'static str,
        /// Key that matched nothing.
        key: String,
    },
    /// A stored document could not be interpreted.
    #[error("malformed document in `{collection}`: {message}")]
    Corrupt {
        /// Collection holding the document.
        collection: &'static str,
        /// What was wrong with it.
        message: String,
    },
}

/// True when a write was rejected by a unique index.
pub fn is_duplicate_key(err: &MongoError) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write)) if write.code == DUPLICATE_KEY_CODE
    )
}
