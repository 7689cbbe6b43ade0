//! Dispatch tables: from method identity to method handler.
//!
//! Adapter types implementing an interface call through an
//! [`InvocationHandler`] with the config key of the method being invoked.
//! Default, static and identity methods never enter the table; adapters
//! implement them directly.

use crate::arg::Arg;
use crate::codec::Output;
use crate::handler::MethodHandler;
use crate::target::Target;
use crate::{Error, Result};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Method handlers keyed by config key.
pub type Dispatch = HashMap<String, Arc<dyn MethodHandler>>;

/// Routes calls of an interface instance to their method handlers.
pub trait InvocationHandler: Send + Sync {
    /// Invokes the method identified by `config_key`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for unknown methods, and whatever
    /// the method handler returns otherwise.
    fn invoke(&self, config_key: &str, args: &[Arg]) -> Result<Output>;
}

/// Creates the invocation handler of each new interface instance.
pub trait InvocationHandlerFactory: Send + Sync {
    fn create(&self, target: Arc<dyn Target>, dispatch: Dispatch) -> Arc<dyn InvocationHandler>;
}

/// Looks the method up and invokes it.
pub struct DefaultInvocationHandler {
    target: Arc<dyn Target>,
    dispatch: Dispatch,
}

impl DefaultInvocationHandler {
    pub fn new(target: Arc<dyn Target>, dispatch: Dispatch) -> Self {
        Self { target, dispatch }
    }

    pub fn target(&self) -> &Arc<dyn Target> {
        &self.target
    }

    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }
}

impl InvocationHandler for DefaultInvocationHandler {
    fn invoke(&self, config_key: &str, args: &[Arg]) -> Result<Output> {
        let handler = self.dispatch.get(config_key).ok_or_else(|| {
            Error::InvalidArgument(format!(
                "{} has no method {}",
                self.target.interface().name(),
                config_key
            ))
        })?;
        handler.invoke(args)
    }
}

impl fmt::Debug for DefaultInvocationHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.dispatch.keys().collect();
        keys.sort();
        f.debug_struct("DefaultInvocationHandler")
            .field("target", &self.target.name())
            .field("methods", &keys)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultInvocationHandlerFactory;

impl InvocationHandlerFactory for DefaultInvocationHandlerFactory {
    fn create(&self, target: Arc<dyn Target>, dispatch: Dispatch) -> Arc<dyn InvocationHandler> {
        Arc::new(DefaultInvocationHandler::new(target, dispatch))
    }
}

/// Stands in for methods the contract marked as ignored.
#[derive(Debug)]
pub(crate) struct IgnoredMethodHandler {
    config_key: String,
}

impl IgnoredMethodHandler {
    pub(crate) fn new(config_key: impl Into<String>) -> Self {
        Self {
            config_key: config_key.into(),
        }
    }
}

impl MethodHandler for IgnoredMethodHandler {
    fn invoke(&self, _args: &[Arg]) -> Result<Output> {
        Err(Error::ConfigurationError(format!(
            "Method {} is ignored and cannot be invoked",
            self.config_key
        )))
    }
}
