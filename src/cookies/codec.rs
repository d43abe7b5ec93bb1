//! String form of a [`Cookie`] as stored in a bucket field.

use crate::cookies::Cookie;
use crate::errors::CookieStoreError;

/// Serializes `cookie` to the JSON string stored as its hash field value.
pub fn encode(cookie: &Cookie) -> Result<String, CookieStoreError> {
    serde_json::to_string(cookie).map_err(CookieStoreError::Encode)
}

/// Deserializes a stored field value.
///
/// A missing value decodes to `None`. A malformed value is a
/// [`CookieStoreError::Decode`]; it is never turned into `None`.
pub fn decode(raw: Option<&str>) -> Result<Option<Cookie>, CookieStoreError> {
    match raw {
        None => Ok(None),
        Some(s) => serde_json::from_str(s).map(Some).map_err(CookieStoreError::Decode),
    }
}
