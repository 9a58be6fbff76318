use mongodb::error::{Error as MongoError, ErrorKind, InsertManyError, WriteError, WriteFailure};
use thiserror::Error;
use uuid::Uuid;

/// Server error code reported when a unique index rejects a write.
const DUPLICATE_KEY_CODE: i32 = 11000;

pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

#[derive(Debug, Error)]
pub enum MongoDaoError {
    #[error("missing MongoDB environment variable `{var}`")]
    MissingEnvVar { var: &'static str },
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        attempts: u32,
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping health check failed")]
    HealthPing {
        #[source]
        source: MongoError,
    },
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        collection: &'static str,
        index: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("duplicate key in collection `{collection}`")]
    DuplicateKey {
        collection: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("failed to write to collection `{collection}`")]
    Write {
        collection: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("failed to read `{id}` from collection `{collection}`")]
    Load {
        collection: &'static str,
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("`{id}` referenced by a write to `{collection}` no longer exists")]
    MissingParent { collection: &'static str, id: Uuid },
    #[error("failed to delete game `{id}`")]
    DeleteGame {
        id: Uuid,
        #[source]
        source: MongoError,
    },
}

impl MongoDaoError {
    /// Classify a failed write, separating unique index violations from other failures.
    pub fn write(collection: &'static str, source: MongoError) -> Self {
        if is_duplicate_key(&source) {
            MongoDaoError::DuplicateKey { collection, source }
        } else {
            MongoDaoError::Write { collection, source }
        }
    }
}

fn is_duplicate_key(err: &MongoError) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(WriteError { code, .. })) => {
            *code == DUPLICATE_KEY_CODE
        }
        ErrorKind::InsertMany(InsertManyError {
            write_errors: Some(errors),
            ..
        }) => errors.iter().any(|error| error.code == DUPLICATE_KEY_CODE),
        _ => false,
    }
}
