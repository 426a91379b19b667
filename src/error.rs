/// Error types for the store and its storage adapters
use thiserror::Error;
use wasm_bindgen::JsValue;

/// Failure reported by a persistence adapter
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StorageError {
    /// The key/value backend rejected or failed the call
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// A stored value could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

impl From<serde_wasm_bindgen::Error> for StorageError {
    fn from(err: serde_wasm_bindgen::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

/// Store layer error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Some writes of a flush failed; their dirty markers were kept
    #[error("Flush incomplete: {} group(s) failed, favorites failed: {favorites}, index failed: {index} ({message})", .groups.len())]
    FlushIncomplete {
        groups: Vec<String>,
        favorites: bool,
        index: bool,
        message: String,
    },

    /// A value coming from JavaScript had the wrong shape
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl From<serde_wasm_bindgen::Error> for StoreError {
    fn from(err: serde_wasm_bindgen::Error) -> Self {
        StoreError::InvalidArgument(err.to_string())
    }
}

impl From<StoreError> for JsValue {
    fn from(err: StoreError) -> Self {
        JsValue::from_str(&err.to_string())
    }
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

pub type StoreResult<T> = std::result::Result<T, StoreError>;
