//! Error types for taged core

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Query encoding error: {0}")]
    QueryEncode(#[from] serde_urlencoded::ser::Error),

    #[error("Query decoding error: {0}")]
    QueryDecode(#[from] serde_urlencoded::de::Error),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

pub type Result<T> = std::result::Result<T, Error>;
