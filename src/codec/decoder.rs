use super::{empty_value_of, is_empty_status, Output};
use crate::contract::TypeRef;
use crate::request::Response;
use crate::{Error, Result};
use serde_json::Value;
use std::sync::Arc;

/// Turns a successful response into the method's declared return type.
pub trait Decoder: Send + Sync {
    /// Decodes `response` as `ty`.
    ///
    /// # Errors
    ///
    /// Returns a decode error when the body cannot be represented as `ty`, or
    /// an I/O error when the body cannot be read.
    fn decode(&self, response: Response, ty: &TypeRef) -> Result<Output>;
}

fn unsupported(response: &Response, ty: &TypeRef) -> Error {
    Error::DecodeFailed {
        status: response.status(),
        message: format!("{ty} is not a type supported by this decoder."),
    }
}

/// Decodes `String` return types only.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringDecoder;

impl Decoder for StringDecoder {
    fn decode(&self, mut response: Response, ty: &TypeRef) -> Result<Output> {
        if response.body().is_none() {
            return Ok(Output::Empty);
        }
        if !ty.is_string() {
            return Err(unsupported(&response, ty));
        }
        Ok(Output::Text(response.text()?))
    }
}

/// Decodes `String` and `Bytes`; 404 and 204 responses decode as the empty
/// value of the declared type.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultDecoder;

impl Decoder for DefaultDecoder {
    fn decode(&self, mut response: Response, ty: &TypeRef) -> Result<Output> {
        if is_empty_status(response.status()) {
            return Ok(empty_value_of(ty));
        }
        if ty.is_bytes() {
            return match response.take_body() {
                Some(body) => Ok(Output::Bytes(body.into_bytes()?)),
                None => Ok(Output::Empty),
            };
        }
        StringDecoder.decode(response, ty)
    }
}

/// Decodes JSON bodies into [`Output::Json`].
///
/// `String` and `Bytes` return types are passed through as text and bytes. An
/// empty body, or a 404/204 response, decodes as the empty value of the
/// declared type.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDecoder;

impl Decoder for JsonDecoder {
    fn decode(&self, mut response: Response, ty: &TypeRef) -> Result<Output> {
        let status = response.status();
        if is_empty_status(status) {
            return Ok(empty_value_of(ty));
        }
        let bytes = match response.take_body() {
            Some(body) => body.into_bytes()?,
            None => return Ok(empty_value_of(ty)),
        };
        if ty.is_bytes() {
            return Ok(Output::Bytes(bytes));
        }
        if ty.is_string() {
            return Ok(Output::Text(String::from_utf8_lossy(&bytes).into_owned()));
        }
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(empty_value_of(ty));
        }
        serde_json::from_slice::<Value>(&bytes)
            .map(Output::Json)
            .map_err(|e| Error::DeserializationFailed {
                raw_response: String::from_utf8_lossy(&bytes).into_owned(),
                serde_error: e.to_string(),
                status,
            })
    }
}

/// Unwraps `Optional<T>` return types.
///
/// A 404 or 204 answer to an optional method decodes as empty; otherwise the
/// delegate decodes the response as `T`. Other types go straight to the
/// delegate.
#[derive(Clone)]
pub struct OptionalDecoder {
    delegate: Arc<dyn Decoder>,
}

impl OptionalDecoder {
    pub fn new(delegate: Arc<dyn Decoder>) -> Self {
        Self { delegate }
    }
}

impl Decoder for OptionalDecoder {
    fn decode(&self, response: Response, ty: &TypeRef) -> Result<Output> {
        if !ty.is_optional() {
            return self.delegate.decode(response, ty);
        }
        if is_empty_status(response.status()) {
            return Ok(Output::Empty);
        }
        match ty.args().last() {
            Some(inner) => self.delegate.decode(response, inner),
            None => self.delegate.decode(response, &TypeRef::Wildcard),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::ResponseBody;
    use serde_json::json;

    fn response(status: i32, body: &str) -> Response {
        Response::builder(status)
            .body(ResponseBody::from_bytes(body))
            .build()
            .unwrap()
    }

    #[test]
    fn default_decoder_handles_strings_bytes_and_empty_statuses() {
        let out = DefaultDecoder.decode(response(200, "hi"), &TypeRef::string()).unwrap();
        assert_eq!(out.text().as_deref(), Some("hi"));

        let out = DefaultDecoder.decode(response(200, "hi"), &TypeRef::bytes()).unwrap();
        assert_eq!(out.bytes(), Some(b"hi".to_vec()));

        let out = DefaultDecoder
            .decode(response(404, "missing"), &TypeRef::list(TypeRef::string()))
            .unwrap();
        assert!(matches!(out, Output::Json(Value::Array(ref items)) if items.is_empty()));

        let err = DefaultDecoder
            .decode(response(200, "{}"), &TypeRef::named("User"))
            .unwrap_err();
        assert!(err.is_decode_error());
        assert_eq!(err.status(), Some(http::StatusCode::OK));
    }

    #[test]
    fn string_decoder_without_body_is_empty() {
        let response = Response::builder(200).build().unwrap();
        assert!(StringDecoder
            .decode(response, &TypeRef::named("User"))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn json_decoder_parses_documents() {
        let out = JsonDecoder
            .decode(response(200, r#"{"login":"octocat"}"#), &TypeRef::named("User"))
            .unwrap();
        assert_eq!(out.json::<Value>().unwrap(), json!({"login": "octocat"}));

        let out = JsonDecoder.decode(response(200, "  "), &TypeRef::named("User")).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn json_decoder_keeps_raw_body_on_failure() {
        let err = JsonDecoder
            .decode(response(200, "not json"), &TypeRef::named("User"))
            .unwrap_err();
        assert_eq!(err.raw_response(), Some("not json"));
        assert!(err.is_decode_error());
    }

    #[test]
    fn optional_decoder_unwraps_the_inner_type() {
        let decoder = OptionalDecoder::new(Arc::new(JsonDecoder));
        let ty = TypeRef::optional(TypeRef::named("User"));

        assert!(decoder.decode(response(404, ""), &ty).unwrap().is_empty());
        assert!(decoder.decode(response(204, ""), &ty).unwrap().is_empty());

        let out = decoder.decode(response(200, r#"{"id":1}"#), &ty).unwrap();
        assert_eq!(out.json::<Option<Value>>().unwrap(), Some(json!({"id": 1})));

        let out = decoder.decode(response(200, "plain"), &TypeRef::string()).unwrap();
        assert_eq!(out.text().as_deref(), Some("plain"));
    }
}
