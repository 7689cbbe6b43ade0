//! Mutable HTTP request templates.
//!
//! A [`RequestTemplate`] is built up by a contract from attribute data, copied
//! for each call, filled in from the call arguments, and finally resolved into a
//! concrete [`Request`](crate::Request).
//!
//! # Examples
//!
//! ```
//! use courier::template::{RequestTemplate, Variable, Variables};
//! use http::Method;
//!
//! let mut template = RequestTemplate::new();
//! template.set_method(Method::GET).set_uri("/users/{id}?active={flag}");
//!
//! let mut vars = Variables::new();
//! vars.insert("id".to_string(), Variable::from("42"));
//! vars.insert("flag".to_string(), Variable::from("true"));
//! assert_eq!(template.resolve(&vars).url(), "/users/42?active=true");
//!
//! vars.remove("flag");
//! assert_eq!(template.resolve(&vars).url(), "/users/42");
//! ```

mod expression;

pub use expression::{Template, Variable, Variables};

pub(crate) use expression::encode_query;
use expression::Encoding;

use crate::request::{Headers, Request};
use crate::{Error, Result};
use http::Method;
use url::Url;

/// How a multi-valued argument is rendered in a query or header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CollectionFormat {
    /// One `name=value` pair per element.
    #[default]
    Exploded,
    /// Comma separated.
    Csv,
    /// Space separated.
    Ssv,
    /// Tab separated.
    Tsv,
    /// Pipe separated.
    Pipes,
}

impl CollectionFormat {
    /// The raw separator joining the elements.
    pub fn separator(&self) -> &'static str {
        match self {
            CollectionFormat::Exploded | CollectionFormat::Csv => ",",
            CollectionFormat::Ssv => " ",
            CollectionFormat::Tsv => "\t",
            CollectionFormat::Pipes => "|",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Param {
    name: String,
    values: Vec<Template>,
}

/// Finds a parameter by name; header names compare case-insensitively.
fn position(params: &[Param], name: &str, ignore_case: bool) -> Option<usize> {
    params.iter().position(|p| {
        if ignore_case {
            p.name.eq_ignore_ascii_case(name)
        } else {
            p.name == name
        }
    })
}

fn append(params: &mut Vec<Param>, name: &str, values: Vec<Template>, ignore_case: bool) {
    match position(params, name, ignore_case) {
        Some(idx) => params[idx].values.extend(values),
        None => params.push(Param {
            name: name.to_string(),
            values,
        }),
    }
}

/// A mutable description of an HTTP request with `{name}` placeholders.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestTemplate {
    method: Option<Method>,
    target: Option<String>,
    uri: Template,
    queries: Vec<Param>,
    headers: Vec<Param>,
    body: Option<Vec<u8>>,
    body_template: Option<Template>,
    decode_slash: bool,
    collection_format: CollectionFormat,
    resolved: bool,
}

impl Default for RequestTemplate {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestTemplate {
    /// Creates an empty template. Slashes in path values are not encoded.
    pub fn new() -> Self {
        Self {
            method: None,
            target: None,
            uri: Template::default(),
            queries: Vec::new(),
            headers: Vec::new(),
            body: None,
            body_template: None,
            decode_slash: true,
            collection_format: CollectionFormat::Exploded,
            resolved: false,
        }
    }

    /// Sets the HTTP method.
    pub fn set_method(&mut self, method: Method) -> &mut Self {
        self.method = Some(method);
        self
    }

    /// The HTTP method, if set.
    pub fn method(&self) -> Option<&Method> {
        self.method.as_ref()
    }

    /// Replaces the path template.
    ///
    /// A `?query` suffix is split off into query parameters. An absolute
    /// `http(s)://host` prefix becomes the target.
    pub fn set_uri(&mut self, uri: &str) -> &mut Self {
        self.uri = Template::default();
        self.append_uri(uri)
    }

    /// Appends to the path template, splitting off any query string.
    pub fn append_uri(&mut self, uri: &str) -> &mut Self {
        let mut uri = uri;
        if self.uri.is_empty() && (uri.starts_with("http://") || uri.starts_with("https://")) {
            let authority_start = uri.find("://").map(|i| i + 3).unwrap_or(0);
            let path_start = uri[authority_start..]
                .find(|c| c == '/' || c == '?')
                .map(|i| i + authority_start)
                .unwrap_or(uri.len());
            self.target = Some(uri[..path_start].to_string());
            uri = &uri[path_start..];
        }
        let (path, query) = match uri.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (uri, None),
        };
        let combined = format!("{}{}", self.uri, path);
        self.uri = Template::parse(&combined);
        if let Some(query) = query {
            self.parse_query_line(query);
        }
        self
    }

    fn parse_query_line(&mut self, line: &str) {
        for pair in line.split('&').filter(|p| !p.is_empty()) {
            match pair.split_once('=') {
                Some((name, value)) => {
                    append(&mut self.queries, name, vec![Template::parse(value)], false)
                }
                None => append(&mut self.queries, pair, Vec::new(), false),
            }
        }
    }

    /// The path template as written.
    pub fn path(&self) -> String {
        self.uri.to_string()
    }

    /// Sets the scheme and authority (and optional base path) the path is
    /// appended to. A trailing `/` is dropped; a query string is merged into the
    /// query parameters.
    pub fn set_target(&mut self, target: &str) -> &mut Self {
        let (base, query) = match target.split_once('?') {
            Some((base, query)) => (base, Some(query)),
            None => (target, None),
        };
        let base = base.strip_suffix('/').unwrap_or(base);
        self.target = (!base.is_empty()).then(|| base.to_string());
        if let Some(query) = query {
            self.parse_query_line(query);
        }
        self
    }

    /// The target, if set.
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// The full URL: target, path and query line. No trailing `?` is emitted
    /// when there are no queries.
    pub fn url(&self) -> String {
        let mut url = format!("{}{}", self.target.as_deref().unwrap_or(""), self.uri);
        let line = self.query_line();
        if !line.is_empty() {
            url.push('?');
            url.push_str(&line);
        }
        url
    }

    /// The rendered query string without the leading `?`.
    pub fn query_line(&self) -> String {
        let mut pairs = Vec::new();
        for param in &self.queries {
            if param.values.is_empty() {
                pairs.push(param.name.clone());
            }
            for value in &param.values {
                pairs.push(format!("{}={}", param.name, value));
            }
        }
        pairs.join("&")
    }

    /// Appends query values under `name`. An empty list removes the query.
    pub fn query<I, S>(&mut self, name: &str, values: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let values: Vec<Template> = values
            .into_iter()
            .map(|v| Template::parse(v.as_ref()))
            .collect();
        if values.is_empty() {
            self.remove_query(name);
        } else {
            append(&mut self.queries, name, values, false);
        }
        self
    }

    /// Removes every value of the query `name`.
    pub fn remove_query(&mut self, name: &str) -> &mut Self {
        if let Some(idx) = position(&self.queries, name, false) {
            self.queries.remove(idx);
        }
        self
    }

    /// The query parameters and their (possibly templated) values.
    pub fn queries(&self) -> Vec<(String, Vec<String>)> {
        self.queries
            .iter()
            .map(|p| (p.name.clone(), p.values.iter().map(ToString::to_string).collect()))
            .collect()
    }

    /// Appends header values under `name`. An empty list removes the header.
    pub fn header<I, S>(&mut self, name: &str, values: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let values: Vec<Template> = values
            .into_iter()
            .map(|v| Template::parse(v.as_ref()))
            .collect();
        if values.is_empty() {
            self.remove_header(name);
        } else {
            append(&mut self.headers, name, values, true);
        }
        self
    }

    /// Removes every value of the header `name`.
    pub fn remove_header(&mut self, name: &str) -> &mut Self {
        if let Some(idx) = position(&self.headers, name, true) {
            self.headers.remove(idx);
        }
        self
    }

    /// The headers and their (possibly templated) values.
    pub fn headers(&self) -> Headers {
        let mut headers = Headers::new();
        for param in &self.headers {
            headers.extend(param.name.clone(), param.values.iter().map(ToString::to_string));
        }
        headers
    }

    /// Sets a literal body, replacing any body template.
    pub fn set_body(&mut self, body: impl Into<Vec<u8>>) -> &mut Self {
        self.body = Some(body.into());
        self.body_template = None;
        self
    }

    /// The literal body, if any.
    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    /// The literal body as UTF-8 text.
    pub fn body_text(&self) -> Option<String> {
        self.body
            .as_deref()
            .map(|b| String::from_utf8_lossy(b).into_owned())
    }

    /// Sets a body template. `%7B` and `%7D` in its literal text expand to
    /// braces.
    pub fn set_body_template(&mut self, template: &str) -> &mut Self {
        self.body_template = Some(Template::parse(template));
        self.body = None;
        self
    }

    /// The body template as written, if any.
    pub fn body_template(&self) -> Option<String> {
        self.body_template.as_ref().map(ToString::to_string)
    }

    /// Whether `/` in path values is kept literal.
    pub fn set_decode_slash(&mut self, decode_slash: bool) -> &mut Self {
        self.decode_slash = decode_slash;
        self
    }

    /// See [`set_decode_slash`](Self::set_decode_slash).
    pub fn decode_slash(&self) -> bool {
        self.decode_slash
    }

    /// Sets how multi-valued query and header arguments are rendered.
    pub fn set_collection_format(&mut self, format: CollectionFormat) -> &mut Self {
        self.collection_format = format;
        self
    }

    /// See [`set_collection_format`](Self::set_collection_format).
    pub fn collection_format(&self) -> CollectionFormat {
        self.collection_format
    }

    /// Returns `true` if the path, a query or a header references `name`.
    ///
    /// The body template is not consulted.
    pub fn has_request_variable(&self, name: &str) -> bool {
        self.uri.variables().any(|v| v == name)
            || self
                .queries
                .iter()
                .chain(&self.headers)
                .flat_map(|p| &p.values)
                .any(|t| t.variables().any(|v| v == name))
    }

    /// Every placeholder name, including those of the body template.
    pub fn variables(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        let templates = std::iter::once(&self.uri)
            .chain(self.queries.iter().chain(&self.headers).flat_map(|p| &p.values))
            .chain(self.body_template.as_ref());
        for template in templates {
            for name in template.variables() {
                if !names.iter().any(|n| n == name) {
                    names.push(name.to_string());
                }
            }
        }
        names
    }

    /// Returns `true` once the template has been resolved.
    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    /// Produces a copy with every placeholder substituted.
    ///
    /// Path placeholders without a value expand to nothing. Query and header
    /// values whose placeholders are all undefined are dropped, and the query or
    /// header disappears when none of its values remain. A body template is
    /// rendered into the literal body.
    pub fn resolve(&self, vars: &Variables) -> RequestTemplate {
        let format = self.collection_format;
        let path = self
            .uri
            .expand(
                vars,
                Encoding::Path {
                    decode_slash: self.decode_slash,
                },
                format,
            )
            .text;

        let mut resolved = self.clone();
        resolved.uri = Template::literal(path);
        resolved.queries = resolve_params(&self.queries, vars, Encoding::Query, format);
        resolved.headers = resolve_params(&self.headers, vars, Encoding::Raw, format);
        if let Some(body) = &self.body_template {
            resolved.body = Some(body.unescape_braces().expand_raw(vars).into_bytes());
            resolved.body_template = None;
        }
        resolved.resolved = true;
        resolved
    }

    /// Builds the final request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigurationError`] when no method is set and
    /// [`Error::InvalidUrl`] when the URL is not absolute.
    pub fn request(&self) -> Result<Request> {
        let method = self.method.clone().ok_or_else(|| {
            Error::ConfigurationError(format!("no HTTP method set for {}", self.url()))
        })?;
        let url = Url::parse(&self.url())?;
        Ok(Request::new(method, url, self.headers(), self.body.clone()))
    }
}

fn resolve_params(
    params: &[Param],
    vars: &Variables,
    encoding: Encoding,
    format: CollectionFormat,
) -> Vec<Param> {
    params
        .iter()
        .filter_map(|param| {
            if param.values.is_empty() {
                return Some(param.clone());
            }
            let values: Vec<Template> = param
                .values
                .iter()
                .filter_map(|t| t.expand_values(vars, encoding, format))
                .flatten()
                .map(Template::literal)
                .collect();
            (!values.is_empty()).then(|| Param {
                name: param.name.clone(),
                values,
            })
        })
        .collect()
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
    fn uri_splits_queries() {
        let mut template = RequestTemplate::new();
        template.set_uri("/search?q={q}&sort=asc&verbose");

        assert_eq!(template.path(), "/search");
        assert_eq!(
            template.queries(),
            vec![
                ("q".to_string(), vec!["{q}".to_string()]),
                ("sort".to_string(), vec!["asc".to_string()]),
                ("verbose".to_string(), vec![]),
            ]
        );
        assert_eq!(template.url(), "/search?q={q}&sort=asc&verbose");
    }

    #[test]
    fn absolute_uri_sets_target() {
        let mut template = RequestTemplate::new();
        template.set_uri("https://api.example.com/v1/items?page=2");

        assert_eq!(template.target(), Some("https://api.example.com"));
        assert_eq!(template.path(), "/v1/items");
        assert_eq!(template.url(), "https://api.example.com/v1/items?page=2");
    }

    #[test]
    fn append_uri_extends_the_path() {
        let mut template = RequestTemplate::new();
        template.set_uri("/repos").append_uri("/{owner}?per_page=10");
        assert_eq!(template.url(), "/repos/{owner}?per_page=10");
    }

    #[test]
    fn target_drops_trailing_slash() {
        let mut template = RequestTemplate::new();
        template.set_uri("/x").set_target("http://localhost:8080/api/");
        assert_eq!(template.url(), "http://localhost:8080/api/x");
    }

    #[test]
    fn empty_values_remove_queries_and_headers() {
        let mut template = RequestTemplate::new();
        template
            .query("a", ["1"])
            .header("Accept", ["text/plain"])
            .query("a", Vec::<String>::new())
            .header("accept", Vec::<String>::new());

        assert!(template.queries().is_empty());
        assert!(template.headers().is_empty());
    }

    #[test]
    fn headers_append_case_insensitively() {
        let mut template = RequestTemplate::new();
        template
            .header("Accept", ["text/plain"])
            .header("ACCEPT", ["application/json"]);

        let headers = template.headers();
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("accept").unwrap().len(), 2);
    }

    #[test]
    fn resolve_drops_undefined_queries_and_headers() {
        let mut template = RequestTemplate::new();
        template
            .set_method(Method::GET)
            .set_uri("/users/{id}?active={flag}&fixed=1")
            .header("X-Token", ["{token}"])
            .header("X-Static", ["yes"]);

        let resolved = template.resolve(&vars(&[("id", "42".into())]));
        assert_eq!(resolved.url(), "/users/42?fixed=1");
        assert!(!resolved.headers().contains("X-Token"));
        assert_eq!(resolved.headers().first("X-Static"), Some("yes"));
        assert!(resolved.is_resolved());
    }

    #[test]
    fn resolve_explodes_multi_values() {
        let mut template = RequestTemplate::new();
        template.set_uri("/items?id={ids}");
        let vars = vars(&[("ids", Variable::Many(vec!["1".into(), "2".into()]))]);

        assert_eq!(template.resolve(&vars).url(), "/items?id=1&id=2");

        template.set_collection_format(CollectionFormat::Csv);
        assert_eq!(template.resolve(&vars).url(), "/items?id=1,2");

        template.set_collection_format(CollectionFormat::Ssv);
        assert_eq!(template.resolve(&vars).url(), "/items?id=1%202");
    }

    #[test]
    fn resolve_encodes_path_and_query_values() {
        let mut template = RequestTemplate::new();
        template.set_uri("/files/{path}?q={q}");
        let vars = vars(&[("path", "a/b c".into()), ("q", "x&y=z".into())]);

        assert_eq!(template.resolve(&vars).url(), "/files/a/b%20c?q=x%26y%3Dz");

        template.set_decode_slash(false);
        assert_eq!(
            template.resolve(&vars).url(),
            "/files/a%2Fb%20c?q=x%26y%3Dz"
        );
    }

    #[test]
    fn resolve_renders_body_template() {
        let mut template = RequestTemplate::new();
        template.set_body_template("%7B\"user\": \"{user}\"%7D");

        let resolved = template.resolve(&vars(&[("user", "ada".into())]));
        assert_eq!(resolved.body_text().as_deref(), Some("{\"user\": \"ada\"}"));
        assert_eq!(resolved.body_template(), None);
    }

    #[test]
    fn body_template_is_not_a_request_variable() {
        let mut template = RequestTemplate::new();
        template.set_uri("/a/{x}").set_body_template("{y}");

        assert!(template.has_request_variable("x"));
        assert!(!template.has_request_variable("y"));
        assert_eq!(template.variables(), vec!["x", "y"]);
    }

    #[test]
    fn request_requires_method_and_absolute_url() {
        let mut template = RequestTemplate::new();
        template.set_uri("/x");
        assert!(matches!(
            template.request(),
            Err(Error::ConfigurationError(_))
        ));

        template.set_method(Method::GET);
        assert!(matches!(template.request(), Err(Error::InvalidUrl(_))));

        template.set_target("http://localhost");
        let request = template.request().unwrap();
        assert_eq!(request.url().as_str(), "http://localhost/x");
    }
}
