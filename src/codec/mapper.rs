//! Response mapping ahead of decoding.

use super::{Decoder, Output};
use crate::contract::TypeRef;
use crate::request::Response;
use crate::Result;
use std::sync::Arc;

/// Transforms a response before a decoder sees it, for example to unwrap an
/// envelope or rewrite headers.
///
/// Closures taking `(Response, &TypeRef)` are mappers.
pub trait ResponseMapper: Send + Sync {
    /// Maps `response`, decoded next as `ty`.
    ///
    /// # Errors
    ///
    /// Typically an I/O error while reading the body.
    fn map(&self, response: Response, ty: &TypeRef) -> Result<Response>;
}

impl<F> ResponseMapper for F
where
    F: Fn(Response, &TypeRef) -> Result<Response> + Send + Sync,
{
    fn map(&self, response: Response, ty: &TypeRef) -> Result<Response> {
        self(response, ty)
    }
}

/// Runs a [`ResponseMapper`] and hands its result to the delegate decoder.
///
/// # Examples
///
/// ```
/// use courier::codec::{Decoder, ResponseMappingDecoder, StringDecoder};
/// use courier::contract::TypeRef;
/// use courier::{Response, ResponseBody};
/// use std::sync::Arc;
///
/// let shout = |mut response: Response, _ty: &TypeRef| -> courier::Result<Response> {
///     let text = response.text()?.to_uppercase();
///     response.set_body(Some(ResponseBody::from_bytes(text)));
///     Ok(response)
/// };
/// let decoder = ResponseMappingDecoder::new(Arc::new(shout), Arc::new(StringDecoder));
///
/// let response = Response::builder(200)
///     .body(ResponseBody::from_bytes("hello"))
///     .build()
///     .unwrap();
/// let output = decoder.decode(response, &TypeRef::string()).unwrap();
/// assert_eq!(output.text().as_deref(), Some("HELLO"));
/// ```
#[derive(Clone)]
pub struct ResponseMappingDecoder {
    mapper: Arc<dyn ResponseMapper>,
    delegate: Arc<dyn Decoder>,
}

impl ResponseMappingDecoder {
    pub fn new(mapper: Arc<dyn ResponseMapper>, delegate: Arc<dyn Decoder>) -> Self {
        Self { mapper, delegate }
    }
}

impl Decoder for ResponseMappingDecoder {
    fn decode(&self, response: Response, ty: &TypeRef) -> Result<Output> {
        let response = self.mapper.map(response, ty)?;
        self.delegate.decode(response, ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::JsonDecoder;
    use crate::request::ResponseBody;
    use crate::Error;
    use serde_json::{json, Value};

    fn response(body: &str) -> Response {
        Response::builder(200)
            .body(ResponseBody::from_bytes(body))
            .build()
            .unwrap()
    }

    /// Replaces `{"data": x}` with `x`.
    fn unwrap_data(mut response: Response, _ty: &TypeRef) -> Result<Response> {
        let envelope: Value = serde_json::from_str(&response.text()?)
            .map_err(|e| Error::SerializationFailed(e.to_string()))?;
        let data = envelope.get("data").cloned().unwrap_or(Value::Null);
        response.set_body(Some(ResponseBody::from_bytes(data.to_string())));
        Ok(response)
    }

    #[test]
    fn mapper_runs_before_the_delegate() {
        let decoder = ResponseMappingDecoder::new(Arc::new(unwrap_data), Arc::new(JsonDecoder));
        let output = decoder
            .decode(response(r#"{"data": {"id": 3}}"#), &TypeRef::named("Item"))
            .unwrap();
        assert_eq!(output.json::<Value>().unwrap(), json!({ "id": 3 }));
    }

    #[test]
    fn mapper_errors_skip_the_delegate() {
        let decoder = ResponseMappingDecoder::new(Arc::new(unwrap_data), Arc::new(JsonDecoder));
        let err = decoder
            .decode(response("not json"), &TypeRef::named("Item"))
            .unwrap_err();
        assert!(matches!(err, Error::SerializationFailed(_)));
    }
}
