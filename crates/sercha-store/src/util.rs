//! Shared row-mapping helpers used by every logical store.

use sercha_core::ports::StoreError;
use serde::{Serialize, de::DeserializeOwned};

/// Maps a `sqlx::Error` into the store's error taxonomy.
pub fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.into())
}

/// Serializes a value to a JSON column. Domain types are always
/// serializable, so this does not return a `Result`.
pub fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).expect("domain types are always serializable")
}

/// Decodes a JSON column, surfacing malformed data as `StoreError::Decode`
/// rather than panicking — unlike the in-memory domain types, database
/// contents are an external input.
pub fn from_json<T: DeserializeOwned>(context: &str, raw: &str) -> Result<T, StoreError> {
    serde_json::from_str(raw).map_err(|e| StoreError::Decode(format!("{context}: {e}")))
}

/// Decodes a newtype/id column, surfacing validation failures as
/// `StoreError::Decode`.
pub fn decode_id<T, F>(context: &str, raw: String, ctor: F) -> Result<T, StoreError>
where
    F: FnOnce(String) -> Result<T, sercha_core::domain::DomainError>,
{
    ctor(raw).map_err(|e| StoreError::Decode(format!("{context}: {e}")))
}
