//! The per-call invocation pipeline.
//!
//! A call moves through build, intercept, bind, execute and decode. Retryable
//! failures loop back to bind with the same intercepted template, under a
//! retryer cloned fresh for the call.

use crate::arg::Arg;
use crate::build::TemplateFactory;
use crate::codec::{Decoder, Encoder, ErrorDecoder, Output, QueryMapEncoder};
use crate::interceptor::RequestInterceptor;
use crate::log::{LogLevel, Logger};
use crate::metadata::MethodMetadata;
use crate::request::{Options, Response, ResponseBody};
use crate::retry::{ExceptionPropagationPolicy, Retryer};
use crate::target::Target;
use crate::template::RequestTemplate;
use crate::transport::Transport;
use crate::{Error, Result};
use std::sync::Arc;
use std::time::Instant;

/// Largest response body buffered in memory when a method returns the raw
/// response.
const MAX_RESPONSE_BUFFER_SIZE: u64 = 8192;

/// Executes calls of one interface method.
pub trait MethodHandler: Send + Sync {
    /// Runs the method with its runtime arguments.
    ///
    /// # Errors
    ///
    /// Argument, encode, transport, HTTP status and decode failures; see
    /// [`Error`].
    fn invoke(&self, args: &[Arg]) -> Result<Output>;
}

/// The components shared by every method handler of a client.
#[derive(Clone)]
pub(crate) struct Components {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) retryer: Arc<dyn Retryer>,
    pub(crate) interceptors: Arc<[Arc<dyn RequestInterceptor>]>,
    pub(crate) logger: Arc<dyn Logger>,
    pub(crate) log_level: LogLevel,
    pub(crate) options: Options,
    pub(crate) encoder: Arc<dyn Encoder>,
    pub(crate) decoder: Arc<dyn Decoder>,
    pub(crate) error_decoder: Arc<dyn ErrorDecoder>,
    pub(crate) query_map_encoder: Arc<dyn QueryMapEncoder>,
    pub(crate) decode_404: bool,
    pub(crate) close_after_decode: bool,
    pub(crate) propagation_policy: ExceptionPropagationPolicy,
}

/// Runs calls on the calling thread.
pub(crate) struct SynchronousMethodHandler {
    target: Arc<dyn Target>,
    metadata: Arc<MethodMetadata>,
    factory: TemplateFactory,
    components: Arc<Components>,
}

impl SynchronousMethodHandler {
    pub(crate) fn new(
        target: Arc<dyn Target>,
        metadata: Arc<MethodMetadata>,
        components: Arc<Components>,
    ) -> Self {
        let factory = TemplateFactory::new(
            metadata.clone(),
            components.encoder.clone(),
            components.query_map_encoder.clone(),
        );
        Self {
            target,
            metadata,
            factory,
            components,
        }
    }

    fn config_key(&self) -> &str {
        self.metadata.config_key()
    }

    /// The first `Options` argument overrides the client defaults.
    fn find_options(&self, args: &[Arg]) -> Options {
        let mut found = args.iter().filter_map(Arg::as_options);
        let options = found.next().copied();
        if found.next().is_some() {
            tracing::warn!(
                config_key = self.config_key(),
                "Multiple Options arguments passed; using the first"
            );
        }
        options.unwrap_or(self.components.options)
    }

    fn execute_and_decode(&self, template: &RequestTemplate, options: &Options) -> Result<Output> {
        let components = &self.components;
        let level = components.log_level;
        let request = self.target.apply(&mut template.clone())?;

        if level > LogLevel::None {
            components.logger.log_request(self.config_key(), level, &request);
        }

        let start = Instant::now();
        let response = match components.transport.execute(&request, options) {
            Ok(response) => response,
            Err(e) if e.is_transport() => {
                if level > LogLevel::None {
                    components
                        .logger
                        .log_io_error(self.config_key(), level, &e, start.elapsed());
                }
                return Err(Error::retryable(
                    format!("{} executing {}", e, request),
                    request.method().clone(),
                    None,
                    Some(e),
                ));
            }
            Err(e) => return Err(e),
        };
        let elapsed = start.elapsed();

        let response = match response.request() {
            Some(_) => response,
            None => response.with_request(request),
        };
        let response = if level > LogLevel::None {
            components
                .logger
                .log_and_rebuffer_response(self.config_key(), level, response, elapsed)?
        } else {
            response
        };

        self.handle_response(response)
    }

    fn handle_response(&self, mut response: Response) -> Result<Output> {
        let components = &self.components;
        let return_type = self.metadata.return_type();

        if return_type.is_response() {
            if components.close_after_decode {
                let small = response
                    .body()
                    .and_then(ResponseBody::length)
                    .is_some_and(|length| length <= MAX_RESPONSE_BUFFER_SIZE);
                if small {
                    if let Some(body) = response.take_body() {
                        response.set_body(Some(ResponseBody::from_bytes(body.into_bytes()?)));
                    }
                }
            }
            return Ok(Output::Response(response));
        }

        let status = response.status();
        if status.is_success() {
            if return_type.is_void() {
                return Ok(Output::Empty);
            }
            return self.decode(response);
        }
        if components.decode_404 && status.as_u16() == 404 && !return_type.is_void() {
            return self.decode(response);
        }

        tracing::debug!(
            config_key = self.config_key(),
            status = status.as_u16(),
            "Decoding error response"
        );
        Err(components.error_decoder.decode(self.config_key(), response))
    }

    fn decode(&self, response: Response) -> Result<Output> {
        let status = response.status();
        self.components
            .decoder
            .decode(response, self.metadata.return_type())
            .map_err(|e| match e {
                e @ Error::Retryable { .. } => e,
                e if e.is_decode_error() => e,
                e => Error::DecodeFailed {
                    status,
                    message: e.to_string(),
                },
            })
    }
}

impl MethodHandler for SynchronousMethodHandler {
    fn invoke(&self, args: &[Arg]) -> Result<Output> {
        let mut template = self.factory.create(args)?;
        for interceptor in self.components.interceptors.iter() {
            interceptor.apply(&mut template);
        }
        let options = self.find_options(args);
        let mut retryer = self.components.retryer.clone_box();

        loop {
            let error = match self.execute_and_decode(&template, &options) {
                Ok(output) => return Ok(output),
                Err(error @ Error::Retryable { .. }) => error,
                Err(error) => return Err(error),
            };

            tracing::debug!(
                config_key = self.config_key(),
                error = %error,
                "Request failed"
            );
            if let Err(error) = retryer.continue_or_propagate(error) {
                return Err(match self.components.propagation_policy {
                    ExceptionPropagationPolicy::Unwrap => error.into_cause(),
                    ExceptionPropagationPolicy::None => error,
                });
            }

            let level = self.components.log_level;
            if level > LogLevel::None {
                self.components.logger.log_retry(self.config_key(), level);
            }
            tracing::debug!(config_key = self.config_key(), "Retrying request");
        }
    }
}
