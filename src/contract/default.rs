//! The built-in dialect: `RequestLine`, `Headers`, `Body`, `Param`, `QueryMap`
//! and `HeaderMap` attributes.

use super::attr::{Body, HeaderMap, Headers, Param, QueryMap, RequestLine};
use super::{
    Attribute, BaseContract, DeclarativeContract, InterfaceDescriptor, MethodDescriptor,
    ParamDescriptor,
};
use crate::metadata::MethodMetadata;
use crate::{Error, Result};
use http::Method;

const VERBS: [Method; 9] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::PATCH,
    Method::HEAD,
    Method::OPTIONS,
    Method::TRACE,
    Method::CONNECT,
];

/// Parses `"Name: value"` lines into ordered `(name, values)` groups.
fn header_groups(lines: &[String]) -> Result<Vec<(String, Vec<String>)>> {
    let mut groups: Vec<(String, Vec<String>)> = Vec::new();
    for line in lines {
        let (name, value) = line.split_once(':').ok_or_else(|| {
            Error::ConfigurationError(format!(
                "Headers annotation value must be in the form 'Name: value': {line}"
            ))
        })?;
        let (name, value) = (name.trim(), value.trim().to_string());
        match groups.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(name)) {
            Some((_, values)) => values.push(value),
            None => groups.push((name.to_string(), vec![value])),
        }
    }
    Ok(groups)
}

/// Splits `"VERB uri"` at the end of the leading upper-case verb.
fn parse_request_line(line: &str, method: &str) -> Result<(Method, String)> {
    let line = line.trim();
    if line.is_empty() {
        return Err(Error::ConfigurationError(format!(
            "RequestLine annotation was empty on method {method}."
        )));
    }
    let verb_end = line
        .find(|c: char| !c.is_ascii_uppercase())
        .unwrap_or(line.len());
    let verb = &line[..verb_end];
    let verb = VERBS
        .iter()
        .find(|m| m.as_str() == verb)
        .cloned()
        .ok_or_else(|| {
            Error::ConfigurationError(format!(
                "RequestLine annotation didn't start with an HTTP verb on method {method}"
            ))
        })?;
    Ok((verb, line[verb_end..].trim().to_string()))
}

fn dialect() -> DeclarativeContract {
    let mut contract = DeclarativeContract::new("DefaultContract");

    contract.register_class_attribute::<Headers, _>(|data, headers, interface| {
        if headers.0.is_empty() {
            return Err(Error::ConfigurationError(format!(
                "Headers annotation was empty on type {}.",
                interface.name()
            )));
        }
        for (name, values) in header_groups(&headers.0)? {
            data.template_mut().remove_header(&name).header(&name, values);
        }
        Ok(())
    });

    contract.register_method_attribute::<RequestLine, _>(|data, request_line, method| {
        let (verb, uri) = parse_request_line(&request_line.line, method.name())?;
        data.template_mut()
            .set_method(verb)
            .append_uri(&uri)
            .set_decode_slash(request_line.decode_slash)
            .set_collection_format(request_line.collection_format);
        Ok(())
    });

    contract.register_method_attribute::<Body, _>(|data, body, _method| {
        if body.0.contains('{') {
            data.template_mut().set_body_template(&body.0);
        } else {
            data.template_mut().set_body(body.0.clone());
        }
        Ok(())
    });

    contract.register_method_attribute::<Headers, _>(|data, headers, method| {
        if headers.0.is_empty() {
            return Err(Error::ConfigurationError(format!(
                "Headers annotation was empty on method {}.",
                method.name()
            )));
        }
        for (name, values) in header_groups(&headers.0)? {
            data.template_mut().header(&name, values);
        }
        Ok(())
    });

    contract.register_parameter_attribute::<Param, _>(|data, param, index| {
        if param.name.trim().is_empty() {
            return Err(Error::ConfigurationError(format!(
                "Param annotation was empty on param {index}."
            )));
        }
        data.name_param(index, param.name.clone());
        if let Some(expander) = &param.expander {
            data.set_expander(index, expander.clone());
        }
        if !data.template().has_request_variable(&param.name) {
            data.add_form_param(param.name.clone());
        }
        Ok(())
    });

    contract.register_parameter_attribute::<QueryMap, _>(|data, query_map, index| {
        if data.query_map_index().is_some() {
            return Err(Error::ConfigurationError(
                "QueryMap annotation was present on multiple parameters.".to_string(),
            ));
        }
        data.set_query_map_index(index, query_map.encoded);
        Ok(())
    });

    contract.register_parameter_attribute::<HeaderMap, _>(|data, _header_map, index| {
        if data.header_map_index().is_some() {
            return Err(Error::ConfigurationError(
                "HeaderMap annotation was present on multiple parameters.".to_string(),
            ));
        }
        data.set_header_map_index(index);
        Ok(())
    });

    contract
}

/// The default contract dialect.
///
/// The interface's own `Headers` replace same-named headers inherited from its
/// parent; method-level `Headers` are appended to the interface-level values.
#[derive(Debug)]
pub struct DefaultContract {
    inner: DeclarativeContract,
}

impl DefaultContract {
    pub fn new() -> Self {
        Self { inner: dialect() }
    }
}

impl Default for DefaultContract {
    fn default() -> Self {
        Self::new()
    }
}

impl BaseContract for DefaultContract {
    fn process_class(
        &self,
        data: &mut MethodMetadata,
        interface: &InterfaceDescriptor,
    ) -> Result<()> {
        self.inner.process_class(data, interface)
    }

    fn process_method(
        &self,
        data: &mut MethodMetadata,
        attribute: &Attribute,
        method: &MethodDescriptor,
    ) -> Result<()> {
        self.inner.process_method(data, attribute, method)
    }

    fn process_parameter(
        &self,
        data: &mut MethodMetadata,
        param: &ParamDescriptor,
        index: usize,
    ) -> Result<bool> {
        self.inner.process_parameter(data, param, index)
    }
}
