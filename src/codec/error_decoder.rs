use super::parse_retry_after;
use crate::request::Response;
use crate::Error;
use http::Method;
use std::time::SystemTime;

/// Maps a non-success response to an error.
///
/// Returning [`Error::Retryable`] hands the failure to the retry policy;
/// anything else is surfaced to the caller as is.
pub trait ErrorDecoder: Send + Sync {
    /// Decodes the failed `response` of the method identified by `config_key`.
    fn decode(&self, config_key: &str, response: Response) -> Error;
}

/// Produces [`Error::HttpError`], wrapped in a retryable error when the
/// response carries a `Retry-After` header.
///
/// # Examples
///
/// ```
/// use courier::codec::{DefaultErrorDecoder, ErrorDecoder};
/// use courier::{Response, ResponseBody};
/// use http::{HeaderMap, StatusCode};
///
/// let mut headers = HeaderMap::new();
/// headers.insert("retry-after", "1".parse().unwrap());
/// let response = Response::builder(503)
///     .headers(headers)
///     .body(ResponseBody::from_bytes("busy"))
///     .build()
///     .unwrap();
///
/// let err = DefaultErrorDecoder::default().decode("Api#get()", response);
/// assert!(err.is_retryable());
/// assert_eq!(err.status(), Some(StatusCode::SERVICE_UNAVAILABLE));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct DefaultErrorDecoder {
    clock: fn() -> SystemTime,
}

impl DefaultErrorDecoder {
    /// Uses `clock` to resolve delay-seconds `Retry-After` values.
    pub fn with_clock(clock: fn() -> SystemTime) -> Self {
        Self { clock }
    }
}

impl Default for DefaultErrorDecoder {
    fn default() -> Self {
        Self::with_clock(SystemTime::now)
    }
}

impl ErrorDecoder for DefaultErrorDecoder {
    fn decode(&self, config_key: &str, mut response: Response) -> Error {
        let (method, url) = response
            .request()
            .map(|r| (r.method().clone(), r.url().to_string()))
            .unwrap_or_else(|| (Method::GET, config_key.to_string()));
        let retry_after = parse_retry_after(response.headers(), (self.clock)());
        let raw_response = response.text().unwrap_or_default();

        let error = Error::HttpError {
            status: response.status(),
            reason: response.reason().map(str::to_string),
            method: method.clone(),
            url,
            raw_response,
            headers: response.headers().clone(),
        };
        match retry_after {
            Some(at) => Error::retryable(error.to_string(), method, Some(at), Some(error)),
            None => error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{Headers, Request, ResponseBody};
    use http::{HeaderMap, StatusCode};
    use std::time::Duration;

    fn fixed_now() -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_000)
    }

    fn request() -> Request {
        Request::new(
            Method::POST,
            "https://api.example.com/orders".parse().unwrap(),
            Headers::new(),
            None,
        )
    }

    #[test]
    fn plain_failures_become_http_errors() {
        let response = Response::builder(400)
            .reason("Bad Request")
            .body(ResponseBody::from_bytes("bad order"))
            .request(request())
            .build()
            .unwrap();

        let err = DefaultErrorDecoder::default().decode("Orders#create(Order)", response);
        match err {
            Error::HttpError {
                status,
                reason,
                method,
                url,
                raw_response,
                ..
            } => {
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert_eq!(reason.as_deref(), Some("Bad Request"));
                assert_eq!(method, Method::POST);
                assert_eq!(url, "https://api.example.com/orders");
                assert_eq!(raw_response, "bad order");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn retry_after_makes_failures_retryable() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", "30".parse().unwrap());
        let response = Response::builder(429)
            .headers(headers)
            .request(request())
            .build()
            .unwrap();

        let err = DefaultErrorDecoder::with_clock(fixed_now)
            .decode("Orders#create(Order)", response);
        assert!(err.is_retryable());
        assert_eq!(err.retry_after(), Some(fixed_now() + Duration::from_secs(30)));
        assert_eq!(err.status(), Some(StatusCode::TOO_MANY_REQUESTS));
        assert!(matches!(err.cause(), Some(Error::HttpError { .. })));
    }

    #[test]
    fn unrepresentable_retry_after_is_a_plain_failure() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", u64::MAX.to_string().parse().unwrap());
        let response = Response::builder(503)
            .headers(headers)
            .body(ResponseBody::from_bytes("busy"))
            .request(request())
            .build()
            .unwrap();

        let err = DefaultErrorDecoder::default().decode("Orders#create(Order)", response);
        assert!(!err.is_retryable());
        assert_eq!(err.status(), Some(StatusCode::SERVICE_UNAVAILABLE));
        assert_eq!(err.raw_response(), Some("busy"));
    }
}
