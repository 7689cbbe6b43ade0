//! Error types for contract parsing, request building and execution.
//!
//! A single [`Error`] enum covers the whole life of a client: configuration
//! problems found while parsing an interface, argument problems found before any
//! request is sent, codec failures, transport failures and HTTP status failures.
//! Every variant keeps as much context as is available (status, raw body, headers,
//! the failing method) so callers can debug production failures from the error
//! alone.

use http::{HeaderMap, Method, StatusCode};
use std::time::SystemTime;

/// A boxed error used as the source of codec failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The main error type for building and invoking declarative clients.
///
/// # Classification
///
/// | Kind          | Variants                                               | Retried |
/// |---------------|--------------------------------------------------------|---------|
/// | configuration | `ConfigurationError`                                   | never   |
/// | argument      | `InvalidArgument`                                      | never   |
/// | encode        | `EncodeFailed`, `SerializationFailed`                  | never   |
/// | transport     | `Network`, `Io`, `Timeout`                             | yes     |
/// | decode        | `DecodeFailed`, `DeserializationFailed`, `HttpError`   | never   |
/// | retryable     | `Retryable` (wraps one of the above as its cause)      | yes     |
///
/// # Examples
///
/// ```
/// use courier::Error;
/// use http::{HeaderMap, Method, StatusCode};
///
/// let err = Error::HttpError {
///     status: StatusCode::NOT_FOUND,
///     reason: Some("Not Found".to_string()),
///     method: Method::GET,
///     url: "https://api.example.com/users/42".to_string(),
///     raw_response: "no such user".to_string(),
///     headers: HeaderMap::new(),
/// };
///
/// assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
/// assert!(!err.is_retryable());
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The interface description or the client configuration is invalid.
    ///
    /// Raised while parsing a contract (missing HTTP verb, conflicting body and
    /// form parameters, duplicate method identity, unsupported inheritance...) or
    /// when invoking a method the contract marked as ignored.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// A call argument is missing or has the wrong shape.
    ///
    /// Raised before any network activity, for example when a URI or body
    /// argument is null.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The request body could not be encoded.
    #[error("Failed to encode request body: {message}")]
    EncodeFailed {
        /// What went wrong
        message: String,
        /// The underlying codec error, if any
        source: Option<BoxError>,
    },

    /// The request body could not be serialized to JSON.
    #[error("Failed to serialize request: {0}")]
    SerializationFailed(String),

    /// A successful response could not be decoded into the declared return type.
    #[error("Failed to decode response (status {status}): {message}")]
    DecodeFailed {
        /// The HTTP status code
        status: StatusCode,
        /// What went wrong
        message: String,
    },

    /// Failed to deserialize a JSON response body.
    ///
    /// Preserves both the raw response text and the serde error message.
    #[error("Failed to deserialize response (status {status}): {serde_error}")]
    DeserializationFailed {
        /// The raw response body that failed to deserialize
        raw_response: String,
        /// The serde error message
        serde_error: String,
        /// The HTTP status code
        status: StatusCode,
    },

    /// The server answered with a status the error decoder maps to a failure.
    #[error("HTTP error {status} during [{method}] to [{url}]: {raw_response}")]
    HttpError {
        /// The HTTP status code
        status: StatusCode,
        /// The reason phrase, when the transport reports one
        reason: Option<String>,
        /// The request method
        method: Method,
        /// The request URL
        url: String,
        /// The raw response body
        raw_response: String,
        /// The response headers
        headers: HeaderMap,
    },

    /// A failure the retry policy may act on.
    ///
    /// Transport failures are wrapped into this variant by the invocation
    /// pipeline, and the default error decoder produces it for responses that
    /// carry a `Retry-After` header. With
    /// [`ExceptionPropagationPolicy::Unwrap`](crate::ExceptionPropagationPolicy)
    /// the `cause` is surfaced instead once retries are exhausted.
    #[error("{message}")]
    Retryable {
        /// What went wrong
        message: String,
        /// The method of the request that failed
        method: Method,
        /// The earliest instant the server asked us to retry at
        retry_after: Option<SystemTime>,
        /// The failure that triggered the retry
        #[source]
        cause: Option<Box<Error>>,
    },

    /// A network-level error reported by the reqwest transport.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// An I/O error reported by a transport or while reading a body.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The request timed out.
    #[error("Request timed out")]
    Timeout,

    /// An invalid URL was produced or provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl Error {
    /// Creates a [`Error::Retryable`] wrapping `cause`.
    pub fn retryable(
        message: impl Into<String>,
        method: Method,
        retry_after: Option<SystemTime>,
        cause: Option<Error>,
    ) -> Self {
        Error::Retryable {
            message: message.into(),
            method,
            retry_after,
            cause: cause.map(Box::new),
        }
    }

    /// Creates an [`Error::EncodeFailed`] from a message and an optional source.
    pub fn encode(message: impl Into<String>, source: Option<BoxError>) -> Self {
        Error::EncodeFailed {
            message: message.into(),
            source,
        }
    }

    /// Returns `true` for failures raised by the transport layer.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Network(_) | Error::Io(_) | Error::Timeout)
    }

    /// Returns `true` if the retry policy may act on this error.
    ///
    /// Transport failures and explicit [`Error::Retryable`] errors are retryable.
    /// Configuration, argument, codec and HTTP status errors are not.
    ///
    /// # Examples
    ///
    /// ```
    /// use courier::Error;
    ///
    /// assert!(Error::Timeout.is_retryable());
    /// assert!(!Error::InvalidArgument("body was null".to_string()).is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Retryable { .. } => true,
            Error::Network(_) | Error::Io(_) | Error::Timeout => true,
            Error::ConfigurationError(_)
            | Error::InvalidArgument(_)
            | Error::EncodeFailed { .. }
            | Error::SerializationFailed(_)
            | Error::DecodeFailed { .. }
            | Error::DeserializationFailed { .. }
            | Error::HttpError { .. }
            | Error::InvalidUrl(_) => false,
        }
    }

    /// Returns `true` for failures raised while encoding a request body.
    pub fn is_encode_error(&self) -> bool {
        matches!(self, Error::EncodeFailed { .. } | Error::SerializationFailed(_))
    }

    /// Returns `true` for failures raised while interpreting a response.
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self,
            Error::DecodeFailed { .. } | Error::DeserializationFailed { .. }
        )
    }

    /// Returns the HTTP status code if this error has one.
    ///
    /// A retryable error reports the status of its cause.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::HttpError { status, .. } => Some(*status),
            Error::DecodeFailed { status, .. } => Some(*status),
            Error::DeserializationFailed { status, .. } => Some(*status),
            Error::Retryable { cause, .. } => cause.as_ref().and_then(|c| c.status()),
            _ => None,
        }
    }

    /// Returns the raw response body if this error has one.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Error::HttpError { raw_response, .. } => Some(raw_response),
            Error::DeserializationFailed { raw_response, .. } => Some(raw_response),
            Error::Retryable { cause, .. } => cause.as_ref().and_then(|c| c.raw_response()),
            _ => None,
        }
    }

    /// Returns the server-requested retry instant of a retryable error.
    pub fn retry_after(&self) -> Option<SystemTime> {
        match self {
            Error::Retryable { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Returns the error that triggered a retryable error.
    pub fn cause(&self) -> Option<&Error> {
        match self {
            Error::Retryable { cause, .. } => cause.as_deref(),
            _ => None,
        }
    }

    /// Unwraps a retryable error into its cause.
    ///
    /// Errors without a cause are returned unchanged.
    pub fn into_cause(self) -> Error {
        match self {
            Error::Retryable {
                cause: Some(cause), ..
            } => *cause,
            other => other,
        }
    }
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_reports_cause_status() {
        let cause = Error::HttpError {
            status: StatusCode::SERVICE_UNAVAILABLE,
            reason: None,
            method: Method::GET,
            url: "http://localhost/x".to_string(),
            raw_response: "busy".to_string(),
            headers: HeaderMap::new(),
        };
        let err = Error::retryable("try later", Method::GET, None, Some(cause));

        assert!(err.is_retryable());
        assert_eq!(err.status(), Some(StatusCode::SERVICE_UNAVAILABLE));
        assert_eq!(err.raw_response(), Some("busy"));
    }

    #[test]
    fn into_cause_unwraps_only_retryable_errors() {
        let err = Error::retryable(
            "connection reset",
            Method::POST,
            None,
            Some(Error::Timeout),
        );
        assert!(matches!(err.into_cause(), Error::Timeout));

        let err = Error::retryable("no cause", Method::POST, None, None);
        assert!(matches!(err.into_cause(), Error::Retryable { .. }));

        assert!(matches!(Error::Timeout.into_cause(), Error::Timeout));
    }

    #[test]
    fn classification() {
        assert!(Error::Timeout.is_transport());
        assert!(Error::encode("bad", None).is_encode_error());
        assert!(Error::SerializationFailed("bad".into()).is_encode_error());
        assert!(Error::DecodeFailed {
            status: StatusCode::OK,
            message: "bad".into()
        }
        .is_decode_error());
        assert!(!Error::ConfigurationError("x".into()).is_retryable());
    }
}
