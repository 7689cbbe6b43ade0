//! Contract parsing: turning interface descriptions into [`MethodMetadata`].
//!
//! A [`Contract`] validates an [`InterfaceDescriptor`] and produces one
//! metadata record per API method. Dialects usually implement the
//! [`BaseContract`] hooks, which get the shared validation algorithm through a
//! blanket implementation, or register attribute processors on a
//! [`DeclarativeContract`].

pub mod attr;
mod declarative;
mod default;
mod descriptor;

pub use declarative::DeclarativeContract;
pub use default::DefaultContract;
pub use descriptor::{
    config_key, Attribute, InterfaceDescriptor, MethodDescriptor, MethodKind, ParamDescriptor,
    Supertype, TypeRef,
};

use crate::metadata::MethodMetadata;
use crate::{Error, Result};
use std::collections::HashMap;

/// Validates an interface description and extracts per-method metadata.
pub trait Contract: Send + Sync {
    /// Parses every API method of `interface`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigurationError`] for invalid descriptions: generic
    /// interfaces, multiple or nested inheritance, duplicate method identities,
    /// missing HTTP verbs, conflicting body and form parameters, and malformed
    /// bulk-map parameters.
    fn parse_and_validate(&self, interface: &InterfaceDescriptor) -> Result<Vec<MethodMetadata>>;
}

/// Attribute hooks of a contract dialect.
///
/// Every `BaseContract` is a [`Contract`]; the shared algorithm calls these
/// hooks for the parent interface, the interface itself, each method attribute
/// and each parameter, in that order.
pub trait BaseContract: Send + Sync {
    /// Applies the interface-level attributes of `interface`.
    fn process_class(&self, data: &mut MethodMetadata, interface: &InterfaceDescriptor)
        -> Result<()>;

    /// Applies one method-level attribute.
    fn process_method(
        &self,
        data: &mut MethodMetadata,
        attribute: &Attribute,
        method: &MethodDescriptor,
    ) -> Result<()>;

    /// Applies the attributes of parameter `index`.
    ///
    /// Returns `true` if the parameter is bound to the HTTP request and must not
    /// be considered as the body.
    fn process_parameter(
        &self,
        data: &mut MethodMetadata,
        param: &ParamDescriptor,
        index: usize,
    ) -> Result<bool>;
}

impl<T: BaseContract> Contract for T {
    fn parse_and_validate(&self, interface: &InterfaceDescriptor) -> Result<Vec<MethodMetadata>> {
        if !interface.type_params().is_empty() {
            return Err(Error::ConfigurationError(format!(
                "Parameterized types unsupported: {}",
                interface.name()
            )));
        }
        if interface.supertypes().len() > 1 {
            return Err(Error::ConfigurationError(format!(
                "Only single inheritance supported: {}",
                interface.name()
            )));
        }
        let mut methods = Vec::new();
        if let Some(parent) = interface.supertypes().first() {
            let parent_iface = &parent.interface;
            if !parent_iface.supertypes().is_empty() {
                return Err(Error::ConfigurationError(format!(
                    "Only single-level inheritance supported: {}",
                    interface.name()
                )));
            }
            if parent_iface.type_params().len() != parent.type_args.len() {
                return Err(Error::ConfigurationError(format!(
                    "{} binds {} type arguments but {} declares {}",
                    interface.name(),
                    parent.type_args.len(),
                    parent_iface.name(),
                    parent_iface.type_params().len()
                )));
            }
            let bindings: HashMap<String, TypeRef> = parent_iface
                .type_params()
                .iter()
                .cloned()
                .zip(parent.type_args.iter().cloned())
                .collect();
            methods.extend(parent_iface.methods().iter().map(|m| m.resolved(&bindings)));
        }
        methods.extend(interface.methods().iter().cloned());

        let mut result: Vec<MethodMetadata> = Vec::new();
        for method in methods
            .iter()
            .filter(|m| m.method_kind() == MethodKind::Abstract)
        {
            check_resolved(interface, method)?;
            let metadata = parse_method(self, interface, method)?;
            if result
                .iter()
                .any(|existing| existing.config_key() == metadata.config_key())
            {
                return Err(Error::ConfigurationError(format!(
                    "Overrides unsupported: {}",
                    metadata.config_key()
                )));
            }
            result.push(metadata);
        }
        Ok(result)
    }
}

fn parse_method<C: BaseContract + ?Sized>(
    contract: &C,
    interface: &InterfaceDescriptor,
    method: &MethodDescriptor,
) -> Result<MethodMetadata> {
    let mut data = MethodMetadata::new(
        config_key(interface.name(), method),
        method.name(),
        method.return_type().clone(),
        method.params().iter().map(|p| p.ty().clone()).collect(),
    );

    if let Some(parent) = interface.supertypes().first() {
        contract.process_class(&mut data, &parent.interface)?;
    }
    contract.process_class(&mut data, interface)?;

    for attribute in method.attributes() {
        contract.process_method(&mut data, attribute, method)?;
    }
    if data.is_ignored() {
        return Ok(data);
    }
    if data.template().method().is_none() {
        return Err(Error::ConfigurationError(format!(
            "Method {} not annotated with HTTP method type (ex. GET, POST){}",
            method.name(),
            data.warnings_text()
        )));
    }

    for (index, param) in method.params().iter().enumerate() {
        let is_http = !param.attributes().is_empty()
            && contract.process_parameter(&mut data, param, index)?;

        if param.ty().is_uri() {
            data.set_url_index(index);
        } else if !is_http && !param.ty().is_options() {
            if data.is_already_processed(index) {
                check_body_and_form(&data)?;
            } else {
                if !data.form_params().is_empty() {
                    return Err(body_with_form_params(&data));
                }
                if data.body_index().is_some() {
                    return Err(Error::ConfigurationError(format!(
                        "Method has too many Body parameters: {}{}",
                        data.config_key(),
                        data.warnings_text()
                    )));
                }
                data.set_body_index(index, param.ty().clone());
            }
        }
    }
    check_body_and_form(&data)?;

    if let Some(param) = data.header_map_index().and_then(|i| method.params().get(i)) {
        check_map_keys("HeaderMap", param, true)?;
    }
    if let Some(param) = data.query_map_index().and_then(|i| method.params().get(i)) {
        check_map_keys("QueryMap", param, false)?;
    }
    Ok(data)
}

/// Rejects methods whose signature still mentions a type variable once the
/// parent's type arguments are substituted.
fn check_resolved(interface: &InterfaceDescriptor, method: &MethodDescriptor) -> Result<()> {
    let unresolved = std::iter::once(method.return_type())
        .chain(method.params().iter().map(ParamDescriptor::ty))
        .find(|ty| ty.has_unresolved());
    match unresolved {
        Some(ty) => Err(Error::ConfigurationError(format!(
            "Unresolved type variable in {}#{}: {}",
            interface.name(),
            method.name(),
            ty
        ))),
        None => Ok(()),
    }
}

fn body_with_form_params(data: &MethodMetadata) -> Error {
    Error::ConfigurationError(format!(
        "Body parameters cannot be used with form parameters.{}",
        data.warnings_text()
    ))
}

/// A body parameter and form parameters are mutually exclusive whichever was
/// declared first.
fn check_body_and_form(data: &MethodMetadata) -> Result<()> {
    if data.body_index().is_some() && !data.form_params().is_empty() {
        return Err(body_with_form_params(data));
    }
    Ok(())
}

/// Bulk maps need string keys. Header maps must be maps; query maps may be
/// arbitrary records flattened by the query map encoder.
fn check_map_keys(kind: &str, param: &ParamDescriptor, must_be_map: bool) -> Result<()> {
    let ty = param.ty();
    if !ty.is_map() {
        if must_be_map {
            return Err(Error::ConfigurationError(format!(
                "{kind} parameter must be a Map: {ty}"
            )));
        }
        return Ok(());
    }
    match ty.map_key() {
        Some(key @ TypeRef::Named { .. }) if !key.is_string() => Err(Error::ConfigurationError(
            format!("{kind} key must be a String: {key}"),
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests;
