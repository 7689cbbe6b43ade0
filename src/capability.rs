//! Capabilities decorate the pluggable components of a client.
//!
//! A [`Capability`] overrides the `enrich_*` methods for the components it
//! wraps; every other component passes through unchanged. The client builder
//! folds its capabilities over each component, in registration order, before
//! assembling the pipeline.

use crate::codec::{Decoder, Encoder, QueryMapEncoder};
use crate::contract::Contract;
use crate::dispatch::InvocationHandlerFactory;
use crate::interceptor::RequestInterceptor;
use crate::log::{LogLevel, Logger};
use crate::request::Options;
use crate::retry::Retryer;
use crate::transport::Transport;
use std::sync::Arc;

/// Wraps or replaces client components.
///
/// # Examples
///
/// ```
/// use courier::{Capability, Options};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// /// Halves every read timeout.
/// struct Impatient;
///
/// impl Capability for Impatient {
///     fn enrich_options(&self, options: Options) -> Options {
///         Options::new(
///             options.connect_timeout(),
///             options.read_timeout() / 2,
///             options.follow_redirects(),
///         )
///     }
/// }
///
/// let capabilities: Vec<Arc<dyn Capability>> = vec![Arc::new(Impatient)];
/// let options = courier::enrich(Options::default(), &capabilities);
/// assert_eq!(options.read_timeout(), Duration::from_secs(30));
/// ```
pub trait Capability: Send + Sync {
    fn enrich_transport(&self, transport: Arc<dyn Transport>) -> Arc<dyn Transport> {
        transport
    }

    fn enrich_retryer(&self, retryer: Arc<dyn Retryer>) -> Arc<dyn Retryer> {
        retryer
    }

    /// Called once per registered interceptor.
    fn enrich_interceptor(
        &self,
        interceptor: Arc<dyn RequestInterceptor>,
    ) -> Arc<dyn RequestInterceptor> {
        interceptor
    }

    fn enrich_logger(&self, logger: Arc<dyn Logger>) -> Arc<dyn Logger> {
        logger
    }

    fn enrich_log_level(&self, level: LogLevel) -> LogLevel {
        level
    }

    fn enrich_contract(&self, contract: Arc<dyn Contract>) -> Arc<dyn Contract> {
        contract
    }

    fn enrich_options(&self, options: Options) -> Options {
        options
    }

    fn enrich_encoder(&self, encoder: Arc<dyn Encoder>) -> Arc<dyn Encoder> {
        encoder
    }

    fn enrich_decoder(&self, decoder: Arc<dyn Decoder>) -> Arc<dyn Decoder> {
        decoder
    }

    fn enrich_invocation_handler_factory(
        &self,
        factory: Arc<dyn InvocationHandlerFactory>,
    ) -> Arc<dyn InvocationHandlerFactory> {
        factory
    }

    fn enrich_query_map_encoder(
        &self,
        encoder: Arc<dyn QueryMapEncoder>,
    ) -> Arc<dyn QueryMapEncoder> {
        encoder
    }
}

/// A component a [`Capability`] can enrich.
pub trait Enrich: Sized {
    fn enrich_with(self, capability: &dyn Capability) -> Self;
}

/// Applies `capabilities` to `component` left to right: `[a, b]` yields
/// `b.enrich(a.enrich(component))`.
pub fn enrich<C: Enrich>(component: C, capabilities: &[Arc<dyn Capability>]) -> C {
    capabilities
        .iter()
        .fold(component, |component, capability| {
            component.enrich_with(capability.as_ref())
        })
}

macro_rules! enrich_impl {
    ($ty:ty, $method:ident) => {
        impl Enrich for $ty {
            fn enrich_with(self, capability: &dyn Capability) -> Self {
                capability.$method(self)
            }
        }
    };
}

enrich_impl!(Arc<dyn Transport>, enrich_transport);
enrich_impl!(Arc<dyn Retryer>, enrich_retryer);
enrich_impl!(Arc<dyn RequestInterceptor>, enrich_interceptor);
enrich_impl!(Arc<dyn Logger>, enrich_logger);
enrich_impl!(LogLevel, enrich_log_level);
enrich_impl!(Arc<dyn Contract>, enrich_contract);
enrich_impl!(Options, enrich_options);
enrich_impl!(Arc<dyn Encoder>, enrich_encoder);
enrich_impl!(Arc<dyn Decoder>, enrich_decoder);
enrich_impl!(Arc<dyn InvocationHandlerFactory>, enrich_invocation_handler_factory);
enrich_impl!(Arc<dyn QueryMapEncoder>, enrich_query_map_encoder);
