//! Targets bind resolved templates to a base URL.

use crate::contract::InterfaceDescriptor;
use crate::request::Request;
use crate::template::RequestTemplate;
use crate::{Error, Result};
use std::fmt;
use std::sync::Arc;

/// The interface being called and the address it is served at.
pub trait Target: Send + Sync {
    /// The interface description calls are parsed from.
    fn interface(&self) -> &InterfaceDescriptor;

    /// A logical name, used in logs.
    fn name(&self) -> &str;

    /// The base URL.
    fn url(&self) -> &str;

    /// Produces the final request, prefixing the base URL unless the template
    /// URL is already absolute.
    ///
    /// # Errors
    ///
    /// Returns an error if the resulting URL is invalid or the method is unset.
    fn apply(&self, template: &mut RequestTemplate) -> Result<Request>;
}

fn is_absolute(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// A target with a fixed base URL.
///
/// # Examples
///
/// ```
/// use courier::contract::InterfaceDescriptor;
/// use courier::template::{RequestTemplate, Variables};
/// use courier::{HardCodedTarget, Target};
/// use http::Method;
/// use std::sync::Arc;
///
/// let api = Arc::new(InterfaceDescriptor::new("Api"));
/// let target = HardCodedTarget::new(api, "https://api.example.com");
///
/// let mut template = RequestTemplate::new();
/// template.set_method(Method::GET).set_uri("/ping");
/// let request = target.apply(&mut template.resolve(&Variables::new())).unwrap();
///
/// assert_eq!(request.url().as_str(), "https://api.example.com/ping");
/// assert_eq!(target.name(), "https://api.example.com");
/// ```
#[derive(Clone)]
pub struct HardCodedTarget {
    interface: Arc<InterfaceDescriptor>,
    name: String,
    url: String,
}

impl HardCodedTarget {
    /// A target named after its URL.
    pub fn new(interface: Arc<InterfaceDescriptor>, url: impl Into<String>) -> Self {
        let url = url.into();
        Self::named(interface, url.clone(), url)
    }

    /// A target with an explicit logical name.
    pub fn named(
        interface: Arc<InterfaceDescriptor>,
        name: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            interface,
            name: name.into(),
            url: url.into(),
        }
    }
}

impl Target for HardCodedTarget {
    fn interface(&self) -> &InterfaceDescriptor {
        &self.interface
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn apply(&self, template: &mut RequestTemplate) -> Result<Request> {
        if !is_absolute(&template.url()) {
            template.set_target(&self.url);
        }
        template.request()
    }
}

impl fmt::Debug for HardCodedTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HardCodedTarget")
            .field("type", &self.interface.name())
            .field("name", &self.name)
            .field("url", &self.url)
            .finish()
    }
}

/// A target without a base URL: every call must pass an absolute URI
/// argument.
#[derive(Clone)]
pub struct EmptyTarget {
    interface: Arc<InterfaceDescriptor>,
    name: String,
}

impl EmptyTarget {
    pub fn new(interface: Arc<InterfaceDescriptor>) -> Self {
        let name = format!("empty:{}", interface.name());
        Self { interface, name }
    }
}

impl Target for EmptyTarget {
    fn interface(&self) -> &InterfaceDescriptor {
        &self.interface
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn url(&self) -> &str {
        ""
    }

    fn apply(&self, template: &mut RequestTemplate) -> Result<Request> {
        if !is_absolute(&template.url()) {
            return Err(Error::InvalidArgument(format!(
                "Request with non-absolute URL not supported with empty target: {}",
                template.url()
            )));
        }
        template.request()
    }
}

impl fmt::Debug for EmptyTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmptyTarget")
            .field("type", &self.interface.name())
            .finish()
    }
}
