//! Immutable request and response values exchanged with a transport.
//!
//! A [`Request`] is produced by a [`Target`](crate::Target) from a fully resolved
//! [`RequestTemplate`](crate::RequestTemplate). A [`Response`] is produced by a
//! [`Transport`](crate::Transport) and consumed by the decoders.

use crate::{Error, Result};
use http::{HeaderMap, Method, StatusCode};
use std::borrow::Cow;
use std::fmt;
use std::io::{self, Cursor, Read};
use std::time::Duration;
use url::Url;

/// Per-call transport options.
///
/// The client holds a default instance; a method may accept an `Options`
/// argument to override it for a single call.
///
/// # Examples
///
/// ```
/// use courier::Options;
/// use std::time::Duration;
///
/// let options = Options::new(Duration::from_secs(2), Duration::from_secs(5), false);
/// assert!(!options.follow_redirects());
/// assert_eq!(Options::default().read_timeout(), Duration::from_secs(60));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    connect_timeout: Duration,
    read_timeout: Duration,
    follow_redirects: bool,
}

impl Options {
    /// Creates options with explicit timeouts and redirect behavior.
    pub fn new(connect_timeout: Duration, read_timeout: Duration, follow_redirects: bool) -> Self {
        Self {
            connect_timeout,
            read_timeout,
            follow_redirects,
        }
    }

    /// Time allowed to establish a connection.
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Time allowed between sending the request and reading the response.
    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// Whether the transport follows 3xx redirects.
    pub fn follow_redirects(&self) -> bool {
        self.follow_redirects
    }
}

impl Default for Options {
    fn default() -> Self {
        Self::new(Duration::from_secs(10), Duration::from_secs(60), true)
    }
}

/// An ordered, case-insensitive header multimap.
///
/// Names keep the spelling of their first insertion and the order in which they
/// were first seen; values of one name keep their insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, Vec<String>)>,
}

impl Headers {
    /// Creates an empty header map.
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(existing, _)| existing.eq_ignore_ascii_case(name))
    }

    /// Appends one value to `name`.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.extend(name, std::iter::once(value.into()));
    }

    /// Appends several values to `name`, creating it if needed.
    pub fn extend(&mut self, name: impl Into<String>, values: impl IntoIterator<Item = String>) {
        let name = name.into();
        match self.position(&name) {
            Some(idx) => self.entries[idx].1.extend(values),
            None => self.entries.push((name, values.into_iter().collect())),
        }
    }

    /// Replaces every value of `name`.
    pub fn insert(&mut self, name: impl Into<String>, values: Vec<String>) {
        let name = name.into();
        match self.position(&name) {
            Some(idx) => self.entries[idx].1 = values,
            None => self.entries.push((name, values)),
        }
    }

    /// Removes `name`, returning its values.
    pub fn remove(&mut self, name: &str) -> Option<Vec<String>> {
        self.position(name).map(|idx| self.entries.remove(idx).1)
    }

    /// Returns every value of `name`.
    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.position(name).map(|idx| self.entries[idx].1.as_slice())
    }

    /// Returns the first value of `name`.
    pub fn first(&self, name: &str) -> Option<&str> {
        self.get(name)?.first().map(String::as_str)
    }

    /// Returns `true` if `name` is present.
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Iterates over names and their values in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    /// Number of distinct header names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no headers.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A final, immutable outbound HTTP request.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    method: Method,
    url: Url,
    headers: Headers,
    body: Option<Vec<u8>>,
}

impl Request {
    /// Creates a request.
    pub fn new(method: Method, url: Url, headers: Headers, body: Option<Vec<u8>>) -> Self {
        Self {
            method,
            url,
            headers,
            body,
        }
    }

    /// The HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The absolute URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The ordered request headers.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// The body payload, if any.
    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    /// The body decoded as UTF-8, replacing invalid sequences.
    pub fn body_text(&self) -> Option<Cow<'_, str>> {
        self.body.as_deref().map(String::from_utf8_lossy)
    }

    /// The declared body length, `None` when there is no body.
    pub fn length(&self) -> Option<usize> {
        self.body.as_ref().map(Vec::len)
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// A response body backed by a reader.
///
/// Bodies are read at most once; decoders consume them.
pub struct ResponseBody {
    reader: Box<dyn Read + Send>,
    length: Option<u64>,
}

impl ResponseBody {
    /// Creates a fully buffered body.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        let bytes = bytes.into();
        let length = Some(bytes.len() as u64);
        Self {
            reader: Box::new(Cursor::new(bytes)),
            length,
        }
    }

    /// Creates a streaming body of optionally known length.
    pub fn from_reader(reader: impl Read + Send + 'static, length: Option<u64>) -> Self {
        Self {
            reader: Box::new(reader),
            length,
        }
    }

    /// The length announced by the server, when known.
    pub fn length(&self) -> Option<u64> {
        self.length
    }

    /// Reads the whole body into memory.
    pub fn into_bytes(mut self) -> io::Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.length.unwrap_or(0) as usize);
        self.reader.read_to_end(&mut buf)?;
        Ok(buf)
    }

    /// Reads the whole body as UTF-8, replacing invalid sequences.
    pub fn into_string(self) -> io::Result<String> {
        let bytes = self.into_bytes()?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

impl Read for ResponseBody {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseBody")
            .field("length", &self.length)
            .finish_non_exhaustive()
    }
}

/// An HTTP response as returned by a transport.
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    reason: Option<String>,
    headers: HeaderMap,
    body: Option<ResponseBody>,
    request: Option<Request>,
}

impl Response {
    /// Starts building a response with the given raw status code.
    ///
    /// The status is validated by [`ResponseBuilder::build`], so transports can
    /// pass through whatever the wire reported.
    pub fn builder(status: i32) -> ResponseBuilder {
        ResponseBuilder {
            status,
            reason: None,
            headers: HeaderMap::new(),
            body: None,
            request: None,
        }
    }

    /// The HTTP status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// The reason phrase, if the transport reported one.
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    /// The response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns a header value by name.
    ///
    /// # Examples
    ///
    /// ```
    /// use courier::Response;
    /// use http::{HeaderMap, HeaderValue};
    ///
    /// let mut headers = HeaderMap::new();
    /// headers.insert("content-type", HeaderValue::from_static("application/json"));
    /// let response = Response::builder(200).headers(headers).build().unwrap();
    ///
    /// assert_eq!(response.header("content-type"), Some("application/json"));
    /// ```
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }

    /// The body, if the response has one.
    pub fn body(&self) -> Option<&ResponseBody> {
        self.body.as_ref()
    }

    /// Takes the body out of the response.
    pub fn take_body(&mut self) -> Option<ResponseBody> {
        self.body.take()
    }

    /// Replaces the body.
    pub fn set_body(&mut self, body: Option<ResponseBody>) {
        self.body = body;
    }

    /// Reads the remaining body as UTF-8 text; an absent body reads as empty.
    pub fn text(&mut self) -> io::Result<String> {
        match self.body.take() {
            Some(body) => body.into_string(),
            None => Ok(String::new()),
        }
    }

    /// The request that produced this response.
    pub fn request(&self) -> Option<&Request> {
        self.request.as_ref()
    }

    /// Attaches the originating request.
    pub fn with_request(mut self, request: Request) -> Self {
        self.request = Some(request);
        self
    }
}

/// Builder for [`Response`].
pub struct ResponseBuilder {
    status: i32,
    reason: Option<String>,
    headers: HeaderMap,
    body: Option<ResponseBody>,
    request: Option<Request>,
}

impl ResponseBuilder {
    /// Sets the reason phrase.
    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Sets the response headers.
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Sets the response body.
    pub fn body(mut self, body: ResponseBody) -> Self {
        self.body = Some(body);
        self
    }

    /// Sets the originating request.
    pub fn request(mut self, request: Request) -> Self {
        self.request = Some(request);
        self
    }

    /// Builds the response.
    ///
    /// # Errors
    ///
    /// A status outside `100..=999` is a malformed response and is reported as
    /// an [`Error::Io`], so the pipeline treats it like any other transport
    /// failure.
    pub fn build(self) -> Result<Response> {
        let status = u16::try_from(self.status)
            .ok()
            .and_then(|code| StatusCode::from_u16(code).ok())
            .ok_or_else(|| {
                let target = self
                    .request
                    .as_ref()
                    .map(|r| format!(" executing {r}"))
                    .unwrap_or_default();
                Error::Io(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("Invalid status({}){}", self.status, target),
                ))
            })?;
        Ok(Response {
            status,
            reason: self.reason,
            headers: self.headers,
            body: self.body,
            request: self.request,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_are_case_insensitive_and_ordered() {
        let mut headers = Headers::new();
        headers.append("Accept", "text/plain");
        headers.append("X-Trace", "1");
        headers.append("accept", "application/json");

        assert_eq!(
            headers.get("ACCEPT").unwrap(),
            &["text/plain".to_string(), "application/json".to_string()]
        );
        let names: Vec<_> = headers.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["Accept", "X-Trace"]);

        headers.remove("x-trace");
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn negative_status_is_a_transport_error() {
        let err = Response::builder(-1).build().unwrap_err();
        assert!(err.is_transport());
    }

    #[test]
    fn body_reads_once() {
        let mut response = Response::builder(200)
            .body(ResponseBody::from_bytes("hello"))
            .build()
            .unwrap();
        assert_eq!(response.body().and_then(|b| b.length()), Some(5));
        assert_eq!(response.text().unwrap(), "hello");
        assert_eq!(response.text().unwrap(), "");
    }
}
