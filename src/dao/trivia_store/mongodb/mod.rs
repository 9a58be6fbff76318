mod config;
mod connection;
mod error;
mod models;
pub mod store;

pub use config::MongoConfig;
pub use error::MongoDaoError;
pub use store::MongoTriviaStore;

use crate::dao::storage::StorageError;

impl From<MongoDaoError> for StorageError {
    fn from(err: MongoDaoError) -> Self {
        match err {
            MongoDaoError::DuplicateKey { collection, .. } => {
                StorageError::duplicate(format!("unique index violated in `{collection}`"))
            }
            missing @ MongoDaoError::MissingParent { .. } => {
                StorageError::missing_parent(missing.to_string())
            }
            other => StorageError::unavailable(other.to_string(), other),
        }
    }
}
