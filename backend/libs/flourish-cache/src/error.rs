//! Cache error types
//!
//! Reads and writes of typed entries never fail. Only the JSON helpers on the
//! process-wide cache can, when a value does not serialize.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type CacheResult<T> = Result<T, CacheError>;
