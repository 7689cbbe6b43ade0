use crate::{Error, Result};
use serde_json::Value;

/// Flattens a query map argument that is not already a map into
/// `(name, value)` pairs.
pub trait QueryMapEncoder: Send + Sync {
    fn encode(&self, value: &Value) -> Result<Vec<(String, Value)>>;
}

/// Uses the fields of a serialized record, skipping `null` fields.
///
/// # Examples
///
/// ```
/// use courier::codec::{FieldQueryMapEncoder, QueryMapEncoder};
/// use serde_json::json;
///
/// let pairs = FieldQueryMapEncoder
///     .encode(&json!({ "page": 2, "sort": null }))
///     .unwrap();
/// assert_eq!(pairs, vec![("page".to_string(), json!(2))]);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldQueryMapEncoder;

impl QueryMapEncoder for FieldQueryMapEncoder {
    fn encode(&self, value: &Value) -> Result<Vec<(String, Value)>> {
        match value {
            Value::Object(fields) => Ok(fields
                .iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()),
            Value::Null => Ok(Vec::new()),
            other => Err(Error::encode(
                format!("QueryMap argument must be a map or a record, got {other}"),
                None,
            )),
        }
    }
}
