//! Per-call HTTP logging.
//!
//! The pipeline reports requests, responses, retries and transport failures to
//! a [`Logger`] when the client's [`LogLevel`] is above [`LogLevel::None`].
//! [`TracingLogger`] forwards the lines to `tracing`; install a subscriber to
//! see them.

use crate::request::{Request, Response, ResponseBody};
use crate::{Error, Result};
use serde::Deserialize;
use std::time::Duration;

/// How much of each exchange is logged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Nothing.
    #[default]
    None,
    /// Request line, response status and elapsed time.
    Basic,
    /// `Basic` plus request and response headers.
    Headers,
    /// `Headers` plus bodies.
    Full,
}

/// Receives the lines describing each HTTP exchange.
///
/// Implementations only need [`log`](Logger::log); the other methods format the
/// exchange according to the level and call it.
pub trait Logger: Send + Sync {
    /// Emits one line for the method identified by `config_key`.
    fn log(&self, config_key: &str, message: &str);

    fn log_request(&self, config_key: &str, level: LogLevel, request: &Request) {
        self.log(
            config_key,
            &format!("---> {} {} HTTP/1.1", request.method(), request.url()),
        );
        if level < LogLevel::Headers {
            return;
        }
        for (name, values) in request.headers().iter() {
            for value in values {
                self.log(config_key, &format!("{name}: {value}"));
            }
        }
        let length = request.length().unwrap_or(0);
        if level >= LogLevel::Full {
            if let Some(body) = request.body_text() {
                self.log(config_key, "");
                self.log(config_key, &body);
            }
        }
        self.log(
            config_key,
            &format!("---> END HTTP ({length}-byte body)"),
        );
    }

    /// Logs the response and returns it; at [`LogLevel::Full`] the body is read
    /// and replaced with an in-memory copy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the body cannot be read.
    fn log_and_rebuffer_response(
        &self,
        config_key: &str,
        level: LogLevel,
        mut response: Response,
        elapsed: Duration,
    ) -> Result<Response> {
        let reason = response
            .reason()
            .map(|r| format!(" {r}"))
            .unwrap_or_default();
        self.log(
            config_key,
            &format!(
                "<--- HTTP/1.1 {}{} ({}ms)",
                response.status().as_u16(),
                reason,
                elapsed.as_millis()
            ),
        );
        if level < LogLevel::Headers {
            return Ok(response);
        }
        for (name, value) in response.headers() {
            let value = value.to_str().unwrap_or("<binary>");
            self.log(config_key, &format!("{name}: {value}"));
        }

        if level >= LogLevel::Full {
            if let Some(body) = response.take_body() {
                let bytes = body.into_bytes()?;
                self.log(config_key, "");
                match std::str::from_utf8(&bytes) {
                    Ok(text) => self.log(config_key, text),
                    Err(_) => self.log(config_key, "Binary data"),
                }
                self.log(
                    config_key,
                    &format!("<--- END HTTP ({}-byte body)", bytes.len()),
                );
                response.set_body(Some(ResponseBody::from_bytes(bytes)));
                return Ok(response);
            }
        }
        let length = response.body().and_then(ResponseBody::length).unwrap_or(0);
        self.log(config_key, &format!("<--- END HTTP ({length}-byte body)"));
        Ok(response)
    }

    fn log_retry(&self, config_key: &str, _level: LogLevel) {
        self.log(config_key, "---> RETRYING");
    }

    fn log_io_error(&self, config_key: &str, _level: LogLevel, error: &Error, elapsed: Duration) {
        self.log(
            config_key,
            &format!("<--- ERROR {} ({}ms)", error, elapsed.as_millis()),
        );
    }
}

/// Emits each line as a `tracing` debug event carrying the config key.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, config_key: &str, message: &str) {
        tracing::debug!(config_key = config_key, "{}", message);
    }

    fn log_io_error(&self, config_key: &str, _level: LogLevel, error: &Error, elapsed: Duration) {
        tracing::warn!(
            config_key = config_key,
            error = %error,
            elapsed_ms = elapsed.as_millis() as u64,
            "Transport error"
        );
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpLogger;

impl Logger for NoOpLogger {
    fn log(&self, _config_key: &str, _message: &str) {}

    fn log_and_rebuffer_response(
        &self,
        _config_key: &str,
        _level: LogLevel,
        response: Response,
        _elapsed: Duration,
    ) -> Result<Response> {
        Ok(response)
    }
}
