use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    #[error("Document serialization error: {0}")]
    Bson(#[from] mongodb::bson::ser::Error),

    #[error("MongoDB {operation} timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },
}

pub type Result<T> = std::result::Result<T, StoreError>;
