//! `{name}` expression templates.
//!
//! A [`Template`] is a sequence of literal chunks and `{name}` expressions. An
//! expression may carry a `:pattern` suffix, which is accepted and ignored. A
//! `{` that does not open a well-formed expression is kept as a literal, so JSON
//! bodies can be templated without escaping every brace.

use super::CollectionFormat;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;

const PATH: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

const PATH_SEGMENT: &AsciiSet = &PATH.add(b'/');

const QUERY: &AsciiSet = &PATH.add(b'&').add(b'=').add(b'+').add(b'/');

/// A resolved value for one placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Variable {
    /// A single value.
    One(String),
    /// A multi-valued (iterable) argument.
    Many(Vec<String>),
}

impl From<&str> for Variable {
    fn from(value: &str) -> Self {
        Variable::One(value.to_string())
    }
}

impl From<String> for Variable {
    fn from(value: String) -> Self {
        Variable::One(value)
    }
}

impl From<Vec<String>> for Variable {
    fn from(values: Vec<String>) -> Self {
        Variable::Many(values)
    }
}

/// The variable map a template is resolved against.
pub type Variables = HashMap<String, Variable>;

/// How expanded values are escaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Encoding {
    /// Path values; `/` is kept literal when `decode_slash` is set.
    Path { decode_slash: bool },
    /// Query names and values.
    Query,
    /// Headers and bodies are not escaped.
    Raw,
}

impl Encoding {
    pub(crate) fn encode<'a>(&self, value: &'a str) -> Cow<'a, str> {
        match self {
            Encoding::Path { decode_slash: true } => utf8_percent_encode(value, PATH).into(),
            Encoding::Path {
                decode_slash: false,
            } => utf8_percent_encode(value, PATH_SEGMENT).into(),
            Encoding::Query => utf8_percent_encode(value, QUERY).into(),
            Encoding::Raw => Cow::Borrowed(value),
        }
    }
}

/// Percent-encodes a query name or value.
pub(crate) fn encode_query(value: &str) -> String {
    Encoding::Query.encode(value).into_owned()
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Chunk {
    Literal(String),
    Expression(String),
}

/// A parsed template string.
///
/// # Examples
///
/// ```
/// use courier::template::{Template, Variable, Variables};
///
/// let template = Template::parse("/users/{id}");
/// let mut vars = Variables::new();
/// vars.insert("id".to_string(), Variable::from("42"));
///
/// assert_eq!(template.variables().collect::<Vec<_>>(), vec!["id"]);
/// assert_eq!(template.expand_raw(&vars), "/users/42");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Template {
    chunks: Vec<Chunk>,
}

/// The outcome of expanding a template.
pub(crate) struct Expansion {
    pub(crate) text: String,
    pub(crate) defined: usize,
    pub(crate) undefined: usize,
}

impl Expansion {
    /// `true` when the template had expressions and none of them resolved.
    pub(crate) fn is_unresolved(&self) -> bool {
        self.defined == 0 && self.undefined > 0
    }
}

fn expression_name(inner: &str) -> Option<&str> {
    let name = inner.split(':').next().unwrap_or_default().trim();
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    valid.then_some(name)
}

impl Template {
    /// Parses a template string.
    pub fn parse(input: &str) -> Self {
        let mut chunks = Vec::new();
        let mut literal = String::new();
        let mut rest = input;

        while let Some(open) = rest.find('{') {
            literal.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let name = after
                .find('}')
                .and_then(|close| expression_name(&after[..close]).map(|n| (n, close)));
            match name {
                Some((name, close)) => {
                    if !literal.is_empty() {
                        chunks.push(Chunk::Literal(std::mem::take(&mut literal)));
                    }
                    chunks.push(Chunk::Expression(name.to_string()));
                    rest = &after[close + 1..];
                }
                None => {
                    literal.push('{');
                    rest = after;
                }
            }
        }
        literal.push_str(rest);
        if !literal.is_empty() {
            chunks.push(Chunk::Literal(literal));
        }
        Self { chunks }
    }

    /// Creates a template that is taken verbatim, braces included.
    pub fn literal(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.is_empty() {
            return Self::default();
        }
        Self {
            chunks: vec![Chunk::Literal(value)],
        }
    }

    /// Returns `true` if the template renders to an empty string.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Names of the expressions, in order of appearance.
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.chunks.iter().filter_map(|c| match c {
            Chunk::Expression(name) => Some(name.as_str()),
            Chunk::Literal(_) => None,
        })
    }

    fn as_single_expression(&self) -> Option<&str> {
        match self.chunks.as_slice() {
            [Chunk::Expression(name)] => Some(name),
            _ => None,
        }
    }

    /// Expands the template without escaping; undefined expressions expand to
    /// nothing.
    pub fn expand_raw(&self, vars: &Variables) -> String {
        self.expand(vars, Encoding::Raw, CollectionFormat::Exploded)
            .text
    }

    pub(crate) fn expand(
        &self,
        vars: &Variables,
        encoding: Encoding,
        format: CollectionFormat,
    ) -> Expansion {
        let mut expansion = Expansion {
            text: String::new(),
            defined: 0,
            undefined: 0,
        };
        for chunk in &self.chunks {
            match chunk {
                Chunk::Literal(text) => expansion.text.push_str(text),
                Chunk::Expression(name) => match vars.get(name) {
                    Some(Variable::One(value)) => {
                        expansion.defined += 1;
                        expansion.text.push_str(&encoding.encode(value));
                    }
                    Some(Variable::Many(values)) if !values.is_empty() => {
                        expansion.defined += 1;
                        let separator = encoding.encode(format.separator());
                        let joined = values
                            .iter()
                            .map(|v| encoding.encode(v))
                            .collect::<Vec<_>>()
                            .join(&separator);
                        expansion.text.push_str(&joined);
                    }
                    _ => expansion.undefined += 1,
                },
            }
        }
        expansion
    }

    /// Expands a query or header value into zero or more values.
    ///
    /// A value consisting of a single multi-valued expression becomes one value
    /// per element under the exploded format. `None` means every expression was
    /// undefined and the value should be dropped.
    pub(crate) fn expand_values(
        &self,
        vars: &Variables,
        encoding: Encoding,
        format: CollectionFormat,
    ) -> Option<Vec<String>> {
        if let (Some(name), CollectionFormat::Exploded) = (self.as_single_expression(), format) {
            if let Some(Variable::Many(values)) = vars.get(name) {
                if values.is_empty() {
                    return None;
                }
                return Some(values.iter().map(|v| encoding.encode(v).into_owned()).collect());
            }
        }
        let expansion = self.expand(vars, encoding, format);
        (!expansion.is_unresolved()).then_some(vec![expansion.text])
    }

    /// Renders literal chunks, replacing the `%7B`/`%7D` brace escapes.
    pub(crate) fn unescape_braces(&self) -> Self {
        let chunks = self
            .chunks
            .iter()
            .map(|c| match c {
                Chunk::Literal(text) => {
                    Chunk::Literal(text.replace("%7B", "{").replace("%7D", "}"))
                }
                expr => expr.clone(),
            })
            .collect();
        Self { chunks }
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for chunk in &self.chunks {
            match chunk {
                Chunk::Literal(text) => f.write_str(text)?,
                Chunk::Expression(name) => write!(f, "{{{name}}}")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, Variable)]) -> Variables {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn parses_expressions_and_literals() {
        let template = Template::parse("/repos/{owner}/{repo}/contributors");
        assert_eq!(
            template.variables().collect::<Vec<_>>(),
            vec!["owner", "repo"]
        );
        assert_eq!(template.to_string(), "/repos/{owner}/{repo}/contributors");
    }

    #[test]
    fn pattern_suffix_is_ignored() {
        let template = Template::parse("/items/{id:[0-9]+}");
        assert_eq!(template.variables().collect::<Vec<_>>(), vec!["id"]);
    }

    #[test]
    fn json_braces_stay_literal() {
        let template = Template::parse(r#"{"name": "{name}", "tags": {}}"#);
        assert_eq!(template.variables().collect::<Vec<_>>(), vec!["name"]);
        let out = template.expand_raw(&vars(&[("name", "ada".into())]));
        assert_eq!(out, r#"{"name": "ada", "tags": {}}"#);
    }

    #[test]
    fn undefined_expressions_expand_to_nothing() {
        let template = Template::parse("/a/{missing}/b");
        assert_eq!(template.expand_raw(&Variables::new()), "/a//b");
    }

    #[test]
    fn path_values_are_percent_encoded() {
        let template = Template::parse("/files/{name}");
        let vars = vars(&[("name", "a b/c".into())]);

        let kept = template.expand(
            &vars,
            Encoding::Path { decode_slash: true },
            CollectionFormat::Exploded,
        );
        assert_eq!(kept.text, "/files/a%20b/c");

        let encoded = template.expand(
            &vars,
            Encoding::Path { decode_slash: false },
            CollectionFormat::Exploded,
        );
        assert_eq!(encoded.text, "/files/a%20b%2Fc");
    }

    #[test]
    fn multi_values_explode_or_join() {
        let template = Template::parse("{ids}");
        let vars = vars(&[("ids", Variable::Many(vec!["1".into(), "2".into()]))]);

        assert_eq!(
            template.expand_values(&vars, Encoding::Query, CollectionFormat::Exploded),
            Some(vec!["1".to_string(), "2".to_string()])
        );
        assert_eq!(
            template.expand_values(&vars, Encoding::Query, CollectionFormat::Csv),
            Some(vec!["1,2".to_string()])
        );
        assert_eq!(
            template.expand_values(&vars, Encoding::Query, CollectionFormat::Pipes),
            Some(vec!["1%7C2".to_string()])
        );
    }

    #[test]
    fn fully_undefined_values_are_dropped() {
        let template = Template::parse("{flag}");
        assert_eq!(
            template.expand_values(&Variables::new(), Encoding::Query, CollectionFormat::Exploded),
            None
        );
        let literal = Template::parse("true");
        assert_eq!(
            literal.expand_values(&Variables::new(), Encoding::Query, CollectionFormat::Exploded),
            Some(vec!["true".to_string()])
        );
    }
}
