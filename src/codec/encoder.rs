use crate::arg::Arg;
use crate::contract::TypeRef;
use crate::metadata::value_to_string;
use crate::template::RequestTemplate;
use crate::{Error, Result};
use serde_json::Value;
use std::sync::Arc;

const CONTENT_TYPE: &str = "Content-Type";

/// Writes a body argument into a request template.
pub trait Encoder: Send + Sync {
    /// Encodes `value`, declared as `body_type`, into `template`'s body.
    ///
    /// # Errors
    ///
    /// Returns an encode error ([`Error::is_encode_error`]) when the value cannot
    /// be represented.
    fn encode(&self, value: &Arg, body_type: &TypeRef, template: &mut RequestTemplate)
        -> Result<()>;
}

/// The type under which form parameters are handed to an encoder:
/// `Map<String, ?>`.
pub fn form_map_type() -> TypeRef {
    TypeRef::map(TypeRef::string(), TypeRef::Wildcard)
}

/// Accepts strings and raw bytes only.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultEncoder;

impl Encoder for DefaultEncoder {
    fn encode(
        &self,
        value: &Arg,
        body_type: &TypeRef,
        template: &mut RequestTemplate,
    ) -> Result<()> {
        match value {
            Arg::Value(Value::String(text)) => {
                template.set_body(text.clone());
                Ok(())
            }
            Arg::Bytes(bytes) => {
                template.set_body(bytes.clone());
                Ok(())
            }
            _ => Err(Error::encode(
                format!("{body_type} is not a type supported by this encoder."),
                None,
            )),
        }
    }
}

/// Serializes body arguments as JSON.
///
/// Sets `Content-Type: application/json` unless the template already declares
/// a content type. Raw bytes are passed through untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonEncoder;

impl Encoder for JsonEncoder {
    fn encode(
        &self,
        value: &Arg,
        body_type: &TypeRef,
        template: &mut RequestTemplate,
    ) -> Result<()> {
        let body = match value {
            Arg::Bytes(bytes) => bytes.clone(),
            Arg::Value(value) => serde_json::to_vec(value).map_err(|e| {
                Error::encode(format!("failed to write {body_type} as JSON"), Some(e.into()))
            })?,
            Arg::Null => b"null".to_vec(),
            Arg::Uri(_) | Arg::Options(_) => {
                return Err(Error::encode(
                    format!("{body_type} is not a type supported by this encoder."),
                    None,
                ))
            }
        };
        if !template.headers().contains(CONTENT_TYPE) {
            template.header(CONTENT_TYPE, ["application/json"]);
        }
        template.set_body(body);
        Ok(())
    }
}

/// Writes form parameters as `application/x-www-form-urlencoded`, delegating
/// every other body to `delegate`.
#[derive(Clone)]
pub struct FormEncoder {
    delegate: Arc<dyn Encoder>,
}

impl FormEncoder {
    pub fn new(delegate: Arc<dyn Encoder>) -> Self {
        Self { delegate }
    }
}

impl Default for FormEncoder {
    fn default() -> Self {
        Self::new(Arc::new(DefaultEncoder))
    }
}

impl Encoder for FormEncoder {
    fn encode(
        &self,
        value: &Arg,
        body_type: &TypeRef,
        template: &mut RequestTemplate,
    ) -> Result<()> {
        let form = match value {
            Arg::Value(Value::Object(form)) if *body_type == form_map_type() => form,
            _ => return self.delegate.encode(value, body_type, template),
        };

        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (name, value) in form {
            match value {
                Value::Null => {}
                Value::Array(items) => {
                    for item in items.iter().filter(|v| !v.is_null()) {
                        serializer.append_pair(name, &value_to_string(item));
                    }
                }
                other => {
                    serializer.append_pair(name, &value_to_string(other));
                }
            }
        }
        if !template.headers().contains(CONTENT_TYPE) {
            template.header(
                CONTENT_TYPE,
                ["application/x-www-form-urlencoded; charset=UTF-8"],
            );
        }
        template.set_body(serializer.finish());
        Ok(())
    }
}
