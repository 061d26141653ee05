mod connection;
mod error;
mod models;
/// Store implementation.
pub mod store;

pub use connection::MongoConfig;
pub use error::MongoDaoError;
pub use store::MongoGameStore;

use crate::dao::storage::StorageError;

impl From<MongoDaoError> for StorageError {
    fn from(err: MongoDaoError) -> Self {
        match err {
            MongoDaoError::Duplicate { .. } => StorageError::Conflict(err.to_string()),
            MongoDaoError::Missing { .. } => StorageError::NotFound(err.to_string()),
            other => StorageError::unavailable(other.to_string(), other),
        }
    }
}
