//! Client construction and interface instances.
//!
//! A [`Client`] holds the configured components. Creating an [`Instance`] for a
//! [`Target`] parses the target's interface with the contract and builds one
//! method handler per method. Use [`ClientBuilder`] to configure clients.

use crate::arg::Arg;
use crate::capability::{enrich, Capability};
use crate::codec::{
    Decoder, DefaultDecoder, DefaultEncoder, DefaultErrorDecoder, Encoder, ErrorDecoder,
    FieldQueryMapEncoder, Output, QueryMapEncoder, ResponseMapper, ResponseMappingDecoder,
};
use crate::config::ClientConfig;
use crate::contract::{Contract, DefaultContract, InterfaceDescriptor};
use crate::dispatch::{
    DefaultInvocationHandlerFactory, Dispatch, IgnoredMethodHandler, InvocationHandler,
    InvocationHandlerFactory,
};
use crate::handler::{Components, MethodHandler, SynchronousMethodHandler};
use crate::interceptor::{HeaderInterceptor, RequestInterceptor};
use crate::log::{LogLevel, Logger, NoOpLogger};
use crate::request::Options;
use crate::retry::{Backoff, ExceptionPropagationPolicy, Retryer};
use crate::target::{HardCodedTarget, Target};
use crate::transport::{ReqwestTransport, Transport};
use crate::{Error, Result};
use http::{HeaderName, HeaderValue};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A configured factory of interface instances.
///
/// The client is cheap to clone and meant to be shared; every instance it
/// creates shares its transport, codecs and retry prototype.
///
/// # Examples
///
/// ```no_run
/// use courier::contract::{attr, InterfaceDescriptor, MethodDescriptor, ParamDescriptor, TypeRef};
/// use courier::codec::JsonDecoder;
/// use courier::{args, Client, HardCodedTarget, LogLevel, TracingLogger};
/// use std::sync::Arc;
///
/// # fn example() -> Result<(), courier::Error> {
/// let github = Arc::new(
///     InterfaceDescriptor::new("GitHub").method(
///         MethodDescriptor::new("contributors")
///             .attribute(attr::RequestLine::new("GET /repos/{owner}/{repo}/contributors"))
///             .param(ParamDescriptor::new(TypeRef::string()).attribute(attr::Param::new("owner")))
///             .param(ParamDescriptor::new(TypeRef::string()).attribute(attr::Param::new("repo")))
///             .returns(TypeRef::list(TypeRef::named("Contributor"))),
///     ),
/// );
///
/// let client = Client::builder()
///     .decoder(JsonDecoder)
///     .logger(TracingLogger)
///     .log_level(LogLevel::Basic)
///     .build();
///
/// let api = client.new_instance(HardCodedTarget::new(github, "https://api.github.com"))?;
/// let contributors = api.call("contributors", &args!["rust-lang", "rust"])?;
/// println!("{:?}", contributors);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    components: Arc<Components>,
    contract: Arc<dyn Contract>,
    invocation_handler_factory: Arc<dyn InvocationHandlerFactory>,
}

impl Client {
    /// Creates a new `ClientBuilder` for configuring a client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Parses the target's interface and creates a callable instance of it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigurationError`] if the interface description is
    /// invalid or two methods share a config key.
    pub fn new_instance(&self, target: impl Target + 'static) -> Result<Instance> {
        let target: Arc<dyn Target> = Arc::new(target);
        let metadata = self.inner.contract.parse_and_validate(target.interface())?;

        let mut dispatch = Dispatch::new();
        let mut methods: HashMap<String, Vec<String>> = HashMap::new();
        for data in metadata {
            let data = Arc::new(data);
            let key = data.config_key().to_string();
            for warning in data.warnings() {
                tracing::warn!(
                    config_key = %key,
                    warning = %warning,
                    "Unused declarative attribute"
                );
            }

            let handler: Arc<dyn MethodHandler> = if data.is_ignored() {
                Arc::new(IgnoredMethodHandler::new(key.clone()))
            } else {
                Arc::new(SynchronousMethodHandler::new(
                    target.clone(),
                    data.clone(),
                    self.inner.components.clone(),
                ))
            };
            if dispatch.insert(key.clone(), handler).is_some() {
                return Err(Error::ConfigurationError(format!(
                    "Duplicate method identity: {key}"
                )));
            }
            methods
                .entry(data.method_name().to_string())
                .or_default()
                .push(key);
        }

        tracing::debug!(
            interface = target.interface().name(),
            target = target.name(),
            methods = dispatch.len(),
            "Created client instance"
        );
        let handler = self
            .inner
            .invocation_handler_factory
            .create(target.clone(), dispatch);
        Ok(Instance {
            target,
            handler,
            methods: Arc::new(methods),
        })
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let components = &self.inner.components;
        f.debug_struct("Client")
            .field("options", &components.options)
            .field("log_level", &components.log_level)
            .field("interceptors", &components.interceptors.len())
            .field("decode_404", &components.decode_404)
            .field("close_after_decode", &components.close_after_decode)
            .field("propagation_policy", &components.propagation_policy)
            .finish_non_exhaustive()
    }
}

/// A callable instance of an interface, bound to a target.
///
/// Adapter types wrap an instance and forward each typed method to
/// [`invoke`](Instance::invoke) or [`call`](Instance::call).
#[derive(Clone)]
pub struct Instance {
    target: Arc<dyn Target>,
    handler: Arc<dyn InvocationHandler>,
    methods: Arc<HashMap<String, Vec<String>>>,
}

impl Instance {
    /// Invokes the method identified by its config key.
    ///
    /// # Errors
    ///
    /// See [`InvocationHandler::invoke`].
    pub fn invoke(&self, config_key: &str, args: &[Arg]) -> Result<Output> {
        self.handler.invoke(config_key, args)
    }

    /// Invokes a method by name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if no method or several overloads
    /// have that name, and whatever the call returns otherwise.
    pub fn call(&self, method: &str, args: &[Arg]) -> Result<Output> {
        match self.methods.get(method).map(Vec::as_slice) {
            Some([key]) => self.invoke(key, args),
            Some(keys) if keys.len() > 1 => Err(Error::InvalidArgument(format!(
                "{} is overloaded; invoke one of {:?} by config key",
                method, keys
            ))),
            _ => Err(Error::InvalidArgument(format!(
                "{} has no method {}",
                self.target.interface().name(),
                method
            ))),
        }
    }

    pub fn target(&self) -> &Arc<dyn Target> {
        &self.target
    }

    /// The config keys of every dispatched method, sorted.
    pub fn config_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self
            .methods
            .values()
            .flatten()
            .map(String::as_str)
            .collect();
        keys.sort_unstable();
        keys
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("interface", &self.target.interface().name())
            .field("target", &self.target.name())
            .field("url", &self.target.url())
            .finish()
    }
}

/// Builder for configuring and creating a [`Client`].
///
/// Every component has a default: the reqwest transport, exponential backoff,
/// the default contract and codecs, and no logging.
///
/// # Examples
///
/// ```
/// use courier::retry::Backoff;
/// use courier::{ClientBuilder, ExceptionPropagationPolicy, Options};
/// use std::time::Duration;
///
/// # fn example() -> Result<(), courier::Error> {
/// let client = ClientBuilder::new()
///     .options(Options::new(Duration::from_secs(2), Duration::from_secs(10), true))
///     .retryer(Backoff::new(Duration::from_millis(50), Duration::from_secs(2), 3))
///     .default_header("User-Agent", "my-app/1.0")?
///     .exception_propagation_policy(ExceptionPropagationPolicy::Unwrap)
///     .build();
/// # Ok(())
/// # }
/// # example().unwrap();
/// ```
pub struct ClientBuilder {
    transport: Arc<dyn Transport>,
    retryer: Arc<dyn Retryer>,
    interceptors: Vec<Arc<dyn RequestInterceptor>>,
    logger: Arc<dyn Logger>,
    log_level: LogLevel,
    contract: Arc<dyn Contract>,
    options: Options,
    encoder: Arc<dyn Encoder>,
    decoder: Arc<dyn Decoder>,
    error_decoder: Arc<dyn ErrorDecoder>,
    query_map_encoder: Arc<dyn QueryMapEncoder>,
    invocation_handler_factory: Arc<dyn InvocationHandlerFactory>,
    decode_404: bool,
    close_after_decode: bool,
    propagation_policy: ExceptionPropagationPolicy,
    capabilities: Vec<Arc<dyn Capability>>,
}

impl ClientBuilder {
    /// Creates a new `ClientBuilder` with default settings.
    pub fn new() -> Self {
        Self {
            transport: Arc::new(ReqwestTransport::new()),
            retryer: Arc::new(Backoff::default()),
            interceptors: Vec::new(),
            logger: Arc::new(NoOpLogger),
            log_level: LogLevel::None,
            contract: Arc::new(DefaultContract::new()),
            options: Options::default(),
            encoder: Arc::new(DefaultEncoder),
            decoder: Arc::new(DefaultDecoder),
            error_decoder: Arc::new(DefaultErrorDecoder::default()),
            query_map_encoder: Arc::new(FieldQueryMapEncoder),
            invocation_handler_factory: Arc::new(DefaultInvocationHandlerFactory),
            decode_404: false,
            close_after_decode: true,
            propagation_policy: ExceptionPropagationPolicy::None,
            capabilities: Vec::new(),
        }
    }

    /// Creates a builder seeded from plain configuration.
    pub fn from_config(config: &ClientConfig) -> Self {
        let builder = Self::new()
            .options(config.options())
            .retryer(config.retryer())
            .log_level(config.log_level)
            .exception_propagation_policy(config.propagation_policy);
        let builder = if config.decode_404 {
            builder.decode_404()
        } else {
            builder
        };
        if config.close_after_decode {
            builder
        } else {
            builder.do_not_close_after_decode()
        }
    }

    /// Sets the HTTP transport.
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Arc::new(transport);
        self
    }

    /// Sets the retry policy prototype. Each call works on a fresh clone.
    pub fn retryer(mut self, retryer: impl Retryer + 'static) -> Self {
        self.retryer = Arc::new(retryer);
        self
    }

    /// Appends a request interceptor. Interceptors run in registration order.
    pub fn request_interceptor(mut self, interceptor: impl RequestInterceptor + 'static) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    /// Replaces every registered interceptor.
    pub fn request_interceptors(
        mut self,
        interceptors: impl IntoIterator<Item = Arc<dyn RequestInterceptor>>,
    ) -> Self {
        self.interceptors = interceptors.into_iter().collect();
        self
    }

    /// Adds a header sent with every request.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn default_header(self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header value: {}", e)))?;
        let value = value
            .to_str()
            .map_err(|e| Error::ConfigurationError(format!("Invalid header value: {}", e)))?
            .to_string();
        Ok(self.request_interceptor(HeaderInterceptor::new(name.as_str(), value)))
    }

    pub fn logger(mut self, logger: impl Logger + 'static) -> Self {
        self.logger = Arc::new(logger);
        self
    }

    pub fn log_level(mut self, level: LogLevel) -> Self {
        self.log_level = level;
        self
    }

    /// Sets the contract dialect used to parse interfaces.
    pub fn contract(mut self, contract: impl Contract + 'static) -> Self {
        self.contract = Arc::new(contract);
        self
    }

    /// Sets the default request options. A method's `Options` argument
    /// overrides them per call.
    pub fn options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    pub fn encoder(mut self, encoder: impl Encoder + 'static) -> Self {
        self.encoder = Arc::new(encoder);
        self
    }

    pub fn decoder(mut self, decoder: impl Decoder + 'static) -> Self {
        self.decoder = Arc::new(decoder);
        self
    }

    /// Sets `decoder` as the decoder, with `mapper` applied to every response
    /// before it is decoded.
    pub fn map_and_decode(
        mut self,
        mapper: impl ResponseMapper + 'static,
        decoder: impl Decoder + 'static,
    ) -> Self {
        self.decoder = Arc::new(ResponseMappingDecoder::new(
            Arc::new(mapper),
            Arc::new(decoder),
        ));
        self
    }

    pub fn error_decoder(mut self, error_decoder: impl ErrorDecoder + 'static) -> Self {
        self.error_decoder = Arc::new(error_decoder);
        self
    }

    pub fn query_map_encoder(mut self, encoder: impl QueryMapEncoder + 'static) -> Self {
        self.query_map_encoder = Arc::new(encoder);
        self
    }

    pub fn invocation_handler_factory(
        mut self,
        factory: impl InvocationHandlerFactory + 'static,
    ) -> Self {
        self.invocation_handler_factory = Arc::new(factory);
        self
    }

    /// Hands 404 responses of non-void methods to the decoder instead of the
    /// error decoder, so they decode as empty values.
    pub fn decode_404(mut self) -> Self {
        self.decode_404 = true;
        self
    }

    /// Keeps raw responses streaming instead of buffering small bodies.
    pub fn do_not_close_after_decode(mut self) -> Self {
        self.close_after_decode = false;
        self
    }

    /// Sets what is surfaced once retries are exhausted.
    pub fn exception_propagation_policy(mut self, policy: ExceptionPropagationPolicy) -> Self {
        self.propagation_policy = policy;
        self
    }

    /// Registers a capability. Capabilities are applied in registration order.
    pub fn add_capability(mut self, capability: impl Capability + 'static) -> Self {
        self.capabilities.push(Arc::new(capability));
        self
    }

    /// Applies the capabilities and builds the configured `Client`.
    pub fn build(self) -> Client {
        let capabilities = &self.capabilities;
        let interceptors: Vec<Arc<dyn RequestInterceptor>> = self
            .interceptors
            .into_iter()
            .map(|interceptor| enrich(interceptor, capabilities))
            .collect();

        let components = Components {
            transport: enrich(self.transport, capabilities),
            retryer: enrich(self.retryer, capabilities),
            interceptors: interceptors.into(),
            logger: enrich(self.logger, capabilities),
            log_level: enrich(self.log_level, capabilities),
            options: enrich(self.options, capabilities),
            encoder: enrich(self.encoder, capabilities),
            decoder: enrich(self.decoder, capabilities),
            error_decoder: self.error_decoder,
            query_map_encoder: enrich(self.query_map_encoder, capabilities),
            decode_404: self.decode_404,
            close_after_decode: self.close_after_decode,
            propagation_policy: self.propagation_policy,
        };

        tracing::debug!(
            capabilities = capabilities.len(),
            interceptors = components.interceptors.len(),
            "Built client"
        );
        Client {
            inner: Arc::new(ClientInner {
                components: Arc::new(components),
                contract: enrich(self.contract, capabilities),
                invocation_handler_factory: enrich(self.invocation_handler_factory, capabilities),
            }),
        }
    }

    /// Builds the client and an instance for `interface` served at `url`.
    ///
    /// # Errors
    ///
    /// See [`Client::new_instance`].
    pub fn target(
        self,
        interface: Arc<InterfaceDescriptor>,
        url: impl Into<String>,
    ) -> Result<Instance> {
        self.build().new_instance(HardCodedTarget::new(interface, url))
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
