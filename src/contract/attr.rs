//! Attributes understood by [`DefaultContract`](super::DefaultContract).

use crate::metadata::Expander;
use crate::template::CollectionFormat;
use std::fmt;
use std::sync::Arc;

/// Static headers, each written as `"Name: value"`. Valid on interfaces and
/// methods; values may contain `{name}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Headers(pub Vec<String>);

impl Headers {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Headers(lines.into_iter().map(Into::into).collect())
    }
}

/// The HTTP verb and URI of a method, e.g. `"GET /users/{id}?active={flag}"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    pub line: String,
    /// Keep `/` literal in expanded path values.
    pub decode_slash: bool,
    pub collection_format: CollectionFormat,
}

impl RequestLine {
    pub fn new(line: impl Into<String>) -> Self {
        Self {
            line: line.into(),
            decode_slash: true,
            collection_format: CollectionFormat::Exploded,
        }
    }

    pub fn decode_slash(mut self, decode_slash: bool) -> Self {
        self.decode_slash = decode_slash;
        self
    }

    pub fn collection_format(mut self, format: CollectionFormat) -> Self {
        self.collection_format = format;
        self
    }
}

/// A literal body, or a body template when it contains `{name}` placeholders.
/// Literal braces in a template are written `%7B` and `%7D`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Body(pub String);

/// Binds a parameter to the placeholder `name`.
///
/// A name that appears in neither the URI, the queries nor the headers becomes a
/// form parameter.
#[derive(Clone)]
pub struct Param {
    pub name: String,
    pub expander: Option<Arc<dyn Expander>>,
}

impl Param {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            expander: None,
        }
    }

    /// Uses `expander` instead of the default value rendering.
    pub fn with_expander(mut self, expander: impl Expander + 'static) -> Self {
        self.expander = Some(Arc::new(expander));
        self
    }
}

impl fmt::Debug for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Param")
            .field("name", &self.name)
            .field("expander", &self.expander.is_some())
            .finish()
    }
}

/// Marks a parameter whose entries are appended as query parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryMap {
    /// The names and values are already percent-encoded.
    pub encoded: bool,
}

/// Marks a parameter whose entries are appended as headers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeaderMap;
