//! Building a resolved request template from call arguments.
//!
//! Each method gets one [`TemplateFactory`] at client construction. Its
//! [`BodyEncoding`] is picked once from the shape of the metadata.

use crate::arg::Arg;
use crate::codec::{form_map_type, Encoder, QueryMapEncoder};
use crate::contract::TypeRef;
use crate::metadata::{value_to_string, Expander, MethodMetadata};
use crate::template::{encode_query, RequestTemplate, Variable, Variables};
use crate::{Error, Result};
use serde_json::{Map, Value};
use std::sync::Arc;

/// How the body of a method's request is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BodyEncoding {
    /// Literal or templated body, or none.
    Plain,
    /// Form parameters handed to the encoder as a map.
    Form,
    /// The body argument handed to the encoder as is.
    Object,
}

impl BodyEncoding {
    pub(crate) fn select(metadata: &MethodMetadata) -> Self {
        if !metadata.form_params().is_empty() && metadata.template().body_template().is_none() {
            BodyEncoding::Form
        } else if metadata.body_index().is_some() {
            BodyEncoding::Object
        } else {
            BodyEncoding::Plain
        }
    }
}

pub(crate) struct TemplateFactory {
    metadata: Arc<MethodMetadata>,
    encoding: BodyEncoding,
    encoder: Arc<dyn Encoder>,
    query_map_encoder: Arc<dyn QueryMapEncoder>,
}

impl TemplateFactory {
    pub(crate) fn new(
        metadata: Arc<MethodMetadata>,
        encoder: Arc<dyn Encoder>,
        query_map_encoder: Arc<dyn QueryMapEncoder>,
    ) -> Self {
        let encoding = BodyEncoding::select(&metadata);
        Self {
            metadata,
            encoding,
            encoder,
            query_map_encoder,
        }
    }

    pub(crate) fn encoding(&self) -> BodyEncoding {
        self.encoding
    }

    /// Copies the skeleton template and resolves it against `args`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] for a wrong argument count or a null
    /// URI or body argument, and an encode error when the body cannot be encoded.
    pub(crate) fn create(&self, args: &[Arg]) -> Result<RequestTemplate> {
        let metadata = &self.metadata;
        if args.len() != metadata.param_types().len() {
            return Err(Error::InvalidArgument(format!(
                "{} expects {} arguments, got {}",
                metadata.config_key(),
                metadata.param_types().len(),
                args.len()
            )));
        }

        let mut template = metadata.template().clone();
        if let Some(index) = metadata.url_index() {
            let uri = args[index].as_uri().ok_or_else(|| {
                Error::InvalidArgument(format!("URI parameter {index} was null"))
            })?;
            template.set_target(&uri);
        }

        let mut vars = Variables::new();
        for (&index, names) in metadata.index_to_name() {
            let expander = metadata.expander(index).map(|e| &**e);
            if let Some(variable) = variable_of(&args[index], expander) {
                for name in names {
                    vars.insert(name.clone(), variable.clone());
                }
            }
        }

        let mut resolved = match self.encoding {
            BodyEncoding::Plain => template.resolve(&vars),
            BodyEncoding::Form => {
                let form = form_variables(&vars, metadata.form_params());
                self.encode(&Arg::Value(Value::Object(form)), &form_map_type(), &mut template)?;
                template.resolve(&vars)
            }
            BodyEncoding::Object => {
                if let (Some(index), Some(body_type)) =
                    (metadata.body_index(), metadata.body_type())
                {
                    let body = &args[index];
                    if body.is_null() {
                        return Err(Error::InvalidArgument(format!(
                            "Body parameter {index} was null"
                        )));
                    }
                    self.encode(body, body_type, &mut template)?;
                }
                template.resolve(&vars)
            }
        };

        if let Some(index) = metadata.query_map_index() {
            if !args[index].is_null() {
                self.add_query_map(&mut resolved, &args[index])?;
            }
        }
        if let Some(index) = metadata.header_map_index() {
            if !args[index].is_null() {
                add_header_map(&mut resolved, &args[index])?;
            }
        }
        Ok(resolved)
    }

    fn encode(&self, value: &Arg, ty: &TypeRef, template: &mut RequestTemplate) -> Result<()> {
        self.encoder.encode(value, ty, template).map_err(|e| {
            if e.is_encode_error() {
                e
            } else {
                Error::encode(e.to_string(), Some(e.into()))
            }
        })
    }

    fn add_query_map(&self, template: &mut RequestTemplate, arg: &Arg) -> Result<()> {
        let pairs = match arg {
            Arg::Value(Value::Object(fields)) => fields
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            Arg::Value(value) => self.query_map_encoder.encode(value)?,
            _ => {
                return Err(Error::InvalidArgument(format!(
                    "QueryMap parameter of {} must be a map or a record",
                    self.metadata.config_key()
                )))
            }
        };

        let encoded = self.metadata.query_map_encoded();
        let encode = |s: &str| if encoded { s.to_string() } else { encode_query(s) };
        for (name, value) in pairs {
            let values: Vec<String> = match &value {
                Value::Null => continue,
                Value::Array(items) => items
                    .iter()
                    .filter(|v| !v.is_null())
                    .map(|v| encode(&value_to_string(v)))
                    .collect(),
                other => vec![encode(&value_to_string(other))],
            };
            if !values.is_empty() {
                template.query(&encode(&name), values);
            }
        }
        Ok(())
    }
}

/// Turns an argument into the value its placeholders expand to. Lists become
/// multi-valued variables; null arguments leave their placeholders undefined.
fn variable_of(arg: &Arg, expander: Option<&dyn Expander>) -> Option<Variable> {
    let expand = |value: &Value| match expander {
        Some(expander) => expander.expand(value),
        None => value_to_string(value),
    };
    match arg {
        Arg::Null | Arg::Value(Value::Null) | Arg::Options(_) => None,
        Arg::Value(Value::Array(items)) => Some(Variable::Many(
            items.iter().filter(|v| !v.is_null()).map(expand).collect(),
        )),
        Arg::Value(value) => Some(Variable::One(expand(value))),
        Arg::Bytes(bytes) => Some(Variable::One(String::from_utf8_lossy(bytes).into_owned())),
        Arg::Uri(url) => Some(Variable::One(url.to_string())),
    }
}

fn form_variables(vars: &Variables, form_params: &[String]) -> Map<String, Value> {
    let mut form = Map::new();
    for name in form_params {
        match vars.get(name) {
            Some(Variable::One(value)) => {
                form.insert(name.clone(), Value::String(value.clone()));
            }
            Some(Variable::Many(values)) => {
                form.insert(
                    name.clone(),
                    Value::Array(values.iter().cloned().map(Value::String).collect()),
                );
            }
            None => {}
        }
    }
    form
}

fn add_header_map(template: &mut RequestTemplate, arg: &Arg) -> Result<()> {
    let Some(Value::Object(fields)) = arg.as_value() else {
        return Err(Error::InvalidArgument(
            "HeaderMap parameter must be a map".to_string(),
        ));
    };
    for (name, value) in fields {
        let values: Vec<String> = match value {
            Value::Null => continue,
            Value::Array(items) => items
                .iter()
                .filter(|v| !v.is_null())
                .map(value_to_string)
                .collect(),
            other => vec![value_to_string(other)],
        };
        template.header(name, values);
    }
    Ok(())
}
