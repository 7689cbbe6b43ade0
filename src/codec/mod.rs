//! Content codecs: request body encoders, response decoders, response mappers,
//! the error decoder and the query map encoder.
//!
//! Each concern is a narrow trait with a small set of default implementations.
//! Clients hold them as `Arc<dyn ...>` so they can be shared across threads and
//! wrapped by capabilities.

mod decoder;
mod encoder;
mod error_decoder;
mod mapper;
mod query_map;
mod retry_after;

pub use decoder::{Decoder, DefaultDecoder, JsonDecoder, OptionalDecoder, StringDecoder};
pub use encoder::{form_map_type, DefaultEncoder, Encoder, FormEncoder, JsonEncoder};
pub use error_decoder::{DefaultErrorDecoder, ErrorDecoder};
pub use mapper::{ResponseMapper, ResponseMappingDecoder};
pub use query_map::{FieldQueryMapEncoder, QueryMapEncoder};
pub use retry_after::parse_retry_after;

use crate::contract::TypeRef;
use crate::request::Response;
use crate::{Error, Result};
use http::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// The decoded result of a method call.
///
/// Values are type-erased; adapter types convert them back into their declared
/// return type with [`json`](Output::json), [`text`](Output::text) and friends.
#[derive(Debug)]
pub enum Output {
    /// No value: a void method, or an empty result.
    Empty,
    /// A text body.
    Text(String),
    /// A binary body.
    Bytes(Vec<u8>),
    /// A JSON document.
    Json(Value),
    /// The raw HTTP response, for methods declared to return it.
    Response(Response),
}

impl Output {
    /// Returns `true` for [`Output::Empty`].
    pub fn is_empty(&self) -> bool {
        matches!(self, Output::Empty)
    }

    /// Deserializes the output into `T`.
    ///
    /// An empty output deserializes from JSON `null`, so `Option<T>` and `()`
    /// accept it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeserializationFailed`] if the value does not fit `T`.
    ///
    /// # Examples
    ///
    /// ```
    /// use courier::Output;
    /// use serde_json::json;
    ///
    /// let names: Vec<String> = Output::Json(json!(["a", "b"])).json().unwrap();
    /// assert_eq!(names, vec!["a", "b"]);
    ///
    /// let missing: Option<String> = Output::Empty.json().unwrap();
    /// assert_eq!(missing, None);
    /// ```
    pub fn json<T: DeserializeOwned>(self) -> Result<T> {
        let failed = |raw: String, e: serde_json::Error| Error::DeserializationFailed {
            raw_response: raw,
            serde_error: e.to_string(),
            status: StatusCode::OK,
        };
        match self {
            Output::Empty => {
                serde_json::from_value(Value::Null).map_err(|e| failed(String::new(), e))
            }
            Output::Json(value) => {
                let raw = value.to_string();
                serde_json::from_value(value).map_err(|e| failed(raw, e))
            }
            Output::Text(text) => serde_json::from_str(&text).map_err(|e| failed(text, e)),
            Output::Bytes(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| failed(String::from_utf8_lossy(&bytes).into_owned(), e)),
            Output::Response(mut response) => {
                let status = response.status();
                let text = response.text()?;
                serde_json::from_str(&text).map_err(|e| Error::DeserializationFailed {
                    raw_response: text,
                    serde_error: e.to_string(),
                    status,
                })
            }
        }
    }

    /// The output as text; JSON is rendered and bytes are decoded lossily.
    pub fn text(self) -> Option<String> {
        match self {
            Output::Empty | Output::Response(_) => None,
            Output::Text(text) => Some(text),
            Output::Bytes(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
            Output::Json(value) => Some(value.to_string()),
        }
    }

    /// The output as bytes.
    pub fn bytes(self) -> Option<Vec<u8>> {
        match self {
            Output::Empty | Output::Response(_) => None,
            Output::Text(text) => Some(text.into_bytes()),
            Output::Bytes(bytes) => Some(bytes),
            Output::Json(value) => Some(value.to_string().into_bytes()),
        }
    }

    /// The raw response, for methods returning `Response`.
    pub fn into_response(self) -> Option<Response> {
        match self {
            Output::Response(response) => Some(response),
            _ => None,
        }
    }
}

/// The value a decoder returns for an empty (404/204) response.
///
/// Collections decode as empty collections and bytes as an empty buffer;
/// everything else is [`Output::Empty`].
pub fn empty_value_of(ty: &TypeRef) -> Output {
    match ty.raw_name() {
        "List" | "Vec" | "Set" | "HashSet" | "BTreeSet" => Output::Json(Value::Array(Vec::new())),
        _ if ty.is_map() => Output::Json(Value::Object(serde_json::Map::new())),
        _ if ty.is_bytes() => Output::Bytes(Vec::new()),
        _ => Output::Empty,
    }
}

fn is_empty_status(status: StatusCode) -> bool {
    status == StatusCode::NOT_FOUND || status == StatusCode::NO_CONTENT
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct User {
        name: String,
    }

    #[test]
    fn json_output_deserializes() {
        let user: User = Output::Json(json!({ "name": "ada" })).json().unwrap();
        assert_eq!(user.name, "ada");

        let user: User = Output::Text(r#"{"name":"bob"}"#.to_string()).json().unwrap();
        assert_eq!(user.name, "bob");
    }

    #[test]
    fn shape_mismatch_keeps_raw_value() {
        let err = Output::Json(json!({ "id": 1 })).json::<User>().unwrap_err();
        assert_eq!(err.raw_response(), Some(r#"{"id":1}"#));
        assert!(err.is_decode_error());
    }

    #[test]
    fn empty_values_follow_the_declared_type() {
        let list = TypeRef::list(TypeRef::string());
        let names: Vec<String> = empty_value_of(&list).json().unwrap();
        assert!(names.is_empty());

        assert!(empty_value_of(&TypeRef::named("User")).is_empty());
        assert_eq!(empty_value_of(&TypeRef::bytes()).bytes(), Some(Vec::new()));
    }
}
