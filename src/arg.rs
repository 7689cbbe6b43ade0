//! Runtime call arguments.
//!
//! Adapter types convert their typed parameters into a slice of [`Arg`] values
//! before handing them to the dispatch table. Plain data travels as a
//! `serde_json::Value`; URIs, request options and raw bytes get dedicated
//! variants because the pipeline treats them specially.

use crate::request::Options;
use crate::{Error, Result};
use serde::Serialize;
use serde_json::Value;
use url::Url;

/// A single runtime argument of a declarative method call.
///
/// # Examples
///
/// ```
/// use courier::{args, Arg};
///
/// let args = args!["octocat", 42, Option::<String>::None];
/// assert_eq!(args[0], Arg::from("octocat"));
/// assert!(args[2].is_null());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    /// An absent value. Placeholders bound to it are left unresolved.
    Null,
    /// Plain data: strings, numbers, booleans, lists or objects.
    Value(Value),
    /// Raw bytes, typically a request body.
    Bytes(Vec<u8>),
    /// A URI overriding the target's base URL for one call.
    Uri(Url),
    /// Per-call request options overriding the client defaults.
    Options(Options),
}

impl Arg {
    /// Serializes any `Serialize` value into an argument.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SerializationFailed`] if serialization fails.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        serde_json::to_value(value)
            .map(Arg::Value)
            .map_err(|e| Error::SerializationFailed(e.to_string()))
    }

    /// Returns `true` for [`Arg::Null`] and for a JSON `null` value.
    pub fn is_null(&self) -> bool {
        matches!(self, Arg::Null | Arg::Value(Value::Null))
    }

    /// Returns the wrapped JSON value, if this is a data argument.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Arg::Value(value) => Some(value),
            _ => None,
        }
    }

    /// Returns the request options carried by this argument.
    pub fn as_options(&self) -> Option<&Options> {
        match self {
            Arg::Options(options) => Some(options),
            _ => None,
        }
    }

    /// Interprets this argument as a URI string.
    pub fn as_uri(&self) -> Option<String> {
        match self {
            Arg::Uri(url) => Some(url.to_string()),
            Arg::Value(Value::String(s)) => Some(s.clone()),
            _ => None,
        }
    }
}

impl From<Value> for Arg {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Arg::Null,
            other => Arg::Value(other),
        }
    }
}

impl From<&str> for Arg {
    fn from(value: &str) -> Self {
        Arg::Value(Value::String(value.to_string()))
    }
}

impl From<String> for Arg {
    fn from(value: String) -> Self {
        Arg::Value(Value::String(value))
    }
}

impl From<&String> for Arg {
    fn from(value: &String) -> Self {
        Arg::Value(Value::String(value.clone()))
    }
}

macro_rules! arg_from_scalar {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Arg {
                fn from(value: $ty) -> Self {
                    Arg::Value(Value::from(value))
                }
            }
        )*
    };
}

arg_from_scalar!(bool, i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);

impl<T: Into<Value>> From<Vec<T>> for Arg {
    fn from(values: Vec<T>) -> Self {
        Arg::Value(Value::Array(values.into_iter().map(Into::into).collect()))
    }
}

impl<T: Into<Arg>> From<Option<T>> for Arg {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Arg::Null)
    }
}

impl From<Url> for Arg {
    fn from(url: Url) -> Self {
        Arg::Uri(url)
    }
}

impl From<Options> for Arg {
    fn from(options: Options) -> Self {
        Arg::Options(options)
    }
}

/// Builds a `Vec<Arg>` from a list of expressions convertible into [`Arg`].
#[macro_export]
macro_rules! args {
    () => {
        ::std::vec::Vec::<$crate::Arg>::new()
    };
    ($($arg:expr),+ $(,)?) => {
        ::std::vec![$($crate::Arg::from($arg)),+]
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn options_collapse_to_null() {
        assert_eq!(Arg::from(Option::<i32>::None), Arg::Null);
        assert_eq!(Arg::from(Some(7)), Arg::Value(json!(7)));
        assert_eq!(Arg::from(Value::Null), Arg::Null);
    }

    #[test]
    fn lists_become_arrays() {
        assert_eq!(Arg::from(vec!["a", "b"]), Arg::Value(json!(["a", "b"])));
    }

    #[test]
    fn json_serializes_structs() {
        #[derive(Serialize)]
        struct User {
            name: &'static str,
        }
        assert_eq!(
            Arg::json(&User { name: "ada" }).unwrap(),
            Arg::Value(json!({ "name": "ada" }))
        );
    }
}
