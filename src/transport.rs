//! The HTTP transport abstraction and its reqwest implementation.

use crate::request::{Options, Request, Response, ResponseBody};
use crate::{Error, Result};
use reqwest::redirect::Policy;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Executes a single HTTP exchange.
///
/// Transports must not retry; the invocation pipeline owns the retry policy.
pub trait Transport: Send + Sync {
    /// Sends `request` under `options` and returns the response.
    ///
    /// # Errors
    ///
    /// Network and I/O failures are reported as transport errors
    /// ([`Error::is_transport`]), which the pipeline treats as retryable.
    fn execute(&self, request: &Request, options: &Options) -> Result<Response>;
}

/// A blocking transport built on `reqwest`.
///
/// Connect timeout and redirect policy are fixed per `reqwest` client, so one
/// client is kept per `(connect_timeout, follow_redirects)` pair. The read
/// timeout is applied per request.
///
/// Blocking clients must not be created or dropped inside an async runtime;
/// call them from `tokio::task::spawn_blocking` when mixing the two.
#[derive(Default)]
pub struct ReqwestTransport {
    clients: Mutex<HashMap<(Duration, bool), reqwest::blocking::Client>>,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn client_for(&self, options: &Options) -> Result<reqwest::blocking::Client> {
        let key = (options.connect_timeout(), options.follow_redirects());
        let mut clients = self.clients.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(client) = clients.get(&key) {
            return Ok(client.clone());
        }

        let redirect = if options.follow_redirects() {
            Policy::default()
        } else {
            Policy::none()
        };
        let client = reqwest::blocking::Client::builder()
            .connect_timeout(options.connect_timeout())
            .timeout(None)
            .redirect(redirect)
            .build()
            .map_err(|e| {
                Error::ConfigurationError(format!("Failed to build HTTP client: {}", e))
            })?;

        tracing::debug!(
            connect_timeout_ms = options.connect_timeout().as_millis() as u64,
            follow_redirects = options.follow_redirects(),
            "Created HTTP client"
        );
        clients.insert(key, client.clone());
        Ok(client)
    }
}

impl Transport for ReqwestTransport {
    fn execute(&self, request: &Request, options: &Options) -> Result<Response> {
        let client = self.client_for(options)?;

        let mut builder = client
            .request(request.method().clone(), request.url().clone())
            .timeout(options.read_timeout());
        for (name, values) in request.headers().iter() {
            for value in values {
                builder = builder.header(name, value.as_str());
            }
        }
        if let Some(body) = request.body() {
            builder = builder.body(body.to_vec());
        }

        tracing::debug!(
            method = %request.method(),
            url = %request.url(),
            "Executing HTTP request"
        );
        let response = builder.send().map_err(|e| {
            if e.is_timeout() {
                Error::Timeout
            } else {
                Error::Network(e)
            }
        })?;

        let status = response.status();
        let headers = response.headers().clone();
        let length = response.content_length();
        let mut builder = Response::builder(i32::from(status.as_u16()))
            .headers(headers)
            .body(ResponseBody::from_reader(response, length))
            .request(request.clone());
        if let Some(reason) = status.canonical_reason() {
            builder = builder.reason(reason);
        }
        builder.build()
    }
}

impl fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cached = self
            .clients
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        f.debug_struct("ReqwestTransport")
            .field("cached_clients", &cached)
            .finish()
    }
}
