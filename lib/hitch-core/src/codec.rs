//! Body serialization.
//!
//! A [`Codec`] marshals request bodies and unmarshals response bodies; [`Json`] is the one
//! shipped. Decoding goes through `serde_path_to_error` so failures name the offending field.

use std::io::Read;

use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::{Error, Result};

/// Body format used by [`req::encoded`](crate::req::encoded) and
/// [`resp::decode`](crate::resp::decode).
pub trait Codec {
    /// MIME type set as `Content-Type` on encoded bodies.
    const CONTENT_TYPE: &'static str;

    /// Serialize `value` into a body.
    ///
    /// # Errors
    ///
    /// Returns the format's serialization error.
    fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Bytes>;

    /// Deserialize a body read from `reader`.
    ///
    /// # Errors
    ///
    /// Returns the format's deserialization error, or an I/O error from the reader.
    fn decode<T: DeserializeOwned, R: Read>(reader: R) -> Result<T>;
}

/// `application/json` via `serde_json`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Json;

impl Codec for Json {
    const CONTENT_TYPE: &'static str = "application/json";

    fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Bytes> {
        to_json(value)
    }

    fn decode<T: DeserializeOwned, R: Read>(reader: R) -> Result<T> {
        let mut deserializer = serde_json::Deserializer::from_reader(reader);
        let value = serde_path_to_error::deserialize(&mut deserializer).map_err(path_error)?;
        deserializer
            .end()
            .map_err(|e| Error::json_deserialization(".", e.to_string()))?;
        Ok(value)
    }
}

/// Serialize a value to JSON bytes.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
///
/// # Example
///
/// ```
/// use hitch_core::to_json;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct User { name: String }
///
/// let user = User { name: "Alice".to_string() };
/// let bytes = to_json(&user).expect("serialize");
/// assert_eq!(bytes.as_ref(), br#"{"name":"Alice"}"#);
/// ```
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<Bytes> {
    serde_json::to_vec(value)
        .map(Bytes::from)
        .map_err(Into::into)
}

/// Deserialize JSON bytes to a value with path-aware error messages.
///
/// # Errors
///
/// Returns an error if JSON deserialization fails, with the error message
/// including the path to the problematic field (e.g., "user.address.city").
///
/// # Example
///
/// ```
/// use hitch_core::from_json;
/// use serde::Deserialize;
///
/// #[derive(Debug, PartialEq, Deserialize)]
/// struct User { name: String }
///
/// let bytes = br#"{"name":"Alice"}"#;
/// let user: User = from_json(bytes).expect("deserialize");
/// assert_eq!(user, User { name: "Alice".to_string() });
/// ```
pub fn from_json<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let mut deserializer = serde_json::Deserializer::from_slice(bytes);
    serde_path_to_error::deserialize(&mut deserializer).map_err(path_error)
}

fn path_error(err: serde_path_to_error::Error<serde_json::Error>) -> Error {
    if err.inner().is_io() {
        let message = err.inner().to_string();
        return Error::Io(std::io::Error::other(message));
    }
    Error::json_deserialization(err.path().to_string(), err.inner().to_string())
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, PartialEq, Deserialize)]
    struct Address {
        city: String,
    }

    #[derive(Debug, PartialEq, Deserialize)]
    struct User {
        name: String,
        address: Address,
    }

    #[test]
    fn json_decode_from_reader() {
        let body = br#"{"name":"Alice","address":{"city":"Paris"}}"#;
        let user: User = Json::decode(&body[..]).expect("decode");
        check!(user.name == "Alice");
        check!(user.address.city == "Paris");
    }

    #[test]
    fn json_decode_error_has_path() {
        let body = br#"{"name":"Alice","address":{"city":42}}"#;
        let_assert!(Err(Error::JsonDeserialization { path, .. }) = Json::decode::<User, _>(&body[..]));
        check!(path == "address.city");
    }

    #[test]
    fn json_decode_rejects_trailing_data() {
        let body = br#"{"name":"A","address":{"city":"B"}} {}"#;
        check!(Json::decode::<User, _>(&body[..]).is_err());
    }

    #[test]
    fn json_encode() {
        let bytes = Json::encode(&serde_json::json!({"a": [1, 2]})).expect("encode");
        check!(bytes.as_ref() == br#"{"a":[1,2]}"#);
        check!(Json::CONTENT_TYPE == "application/json");
    }

    #[test]
    fn from_json_error_has_path() {
        let_assert!(Err(Error::JsonDeserialization { path, message }) = from_json::<User>(br#"{"name":1}"#));
        check!(path == "name");
        check!(message.contains("invalid type"));
    }
}
