//! A contract assembled from registered attribute processors.

use super::{Attribute, BaseContract, InterfaceDescriptor, MethodDescriptor, ParamDescriptor};
use crate::metadata::MethodMetadata;
use crate::Result;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

type Predicate = Arc<dyn Fn(&Attribute) -> bool + Send + Sync>;
type ClassProcessor =
    Arc<dyn Fn(&mut MethodMetadata, &Attribute, &InterfaceDescriptor) -> Result<()> + Send + Sync>;
type MethodProcessor =
    Arc<dyn Fn(&mut MethodMetadata, &Attribute, &MethodDescriptor) -> Result<()> + Send + Sync>;
type ParameterProcessor =
    Arc<dyn Fn(&mut MethodMetadata, &Attribute, usize) -> Result<()> + Send + Sync>;

struct Guarded<P> {
    predicate: Predicate,
    processor: P,
}

fn guard<A, P>(predicate: P) -> Predicate
where
    A: Any + Send + Sync,
    P: Fn(&A) -> bool + Send + Sync + 'static,
{
    Arc::new(move |attribute| attribute.downcast_ref::<A>().is_some_and(&predicate))
}

/// A contract whose dialect is a table of attribute processors.
///
/// Processors are registered per attribute type, optionally guarded by a
/// predicate. Attributes nobody handles are recorded as warnings on the method
/// metadata instead of failing the parse.
///
/// # Examples
///
/// ```
/// use courier::contract::{Contract, DeclarativeContract, InterfaceDescriptor, MethodDescriptor};
/// use http::Method;
///
/// struct Get(&'static str);
///
/// let mut contract = DeclarativeContract::new("GetOnly");
/// contract.register_method_attribute::<Get, _>(|data, get, _method| {
///     data.template_mut().set_method(Method::GET).set_uri(get.0);
///     Ok(())
/// });
///
/// let api = InterfaceDescriptor::new("Api")
///     .method(MethodDescriptor::new("ping").attribute(Get("/ping")));
/// let parsed = contract.parse_and_validate(&api).unwrap();
/// assert_eq!(parsed[0].template().path(), "/ping");
/// ```
pub struct DeclarativeContract {
    name: String,
    class_processors: Vec<Guarded<ClassProcessor>>,
    method_processors: Vec<Guarded<MethodProcessor>>,
    parameter_processors: HashMap<TypeId, ParameterProcessor>,
}

impl DeclarativeContract {
    /// Creates an empty dialect; `name` appears in warnings.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            class_processors: Vec::new(),
            method_processors: Vec::new(),
            parameter_processors: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registers a processor for interface attributes of type `A`.
    pub fn register_class_attribute<A, F>(&mut self, processor: F) -> &mut Self
    where
        A: Any + Send + Sync,
        F: Fn(&mut MethodMetadata, &A, &InterfaceDescriptor) -> Result<()> + Send + Sync + 'static,
    {
        self.register_class_attribute_when(|_: &A| true, processor)
    }

    /// Registers a processor for interface attributes of type `A` accepted by
    /// `predicate`.
    pub fn register_class_attribute_when<A, P, F>(
        &mut self,
        predicate: P,
        processor: F,
    ) -> &mut Self
    where
        A: Any + Send + Sync,
        P: Fn(&A) -> bool + Send + Sync + 'static,
        F: Fn(&mut MethodMetadata, &A, &InterfaceDescriptor) -> Result<()> + Send + Sync + 'static,
    {
        self.class_processors.push(Guarded {
            predicate: guard(predicate),
            processor: Arc::new(move |data, attribute, interface| {
                match attribute.downcast_ref::<A>() {
                    Some(a) => processor(data, a, interface),
                    None => Ok(()),
                }
            }),
        });
        self
    }

    /// Registers a processor for method attributes of type `A`.
    pub fn register_method_attribute<A, F>(&mut self, processor: F) -> &mut Self
    where
        A: Any + Send + Sync,
        F: Fn(&mut MethodMetadata, &A, &MethodDescriptor) -> Result<()> + Send + Sync + 'static,
    {
        self.register_method_attribute_when(|_: &A| true, processor)
    }

    /// Registers a processor for method attributes of type `A` accepted by
    /// `predicate`.
    pub fn register_method_attribute_when<A, P, F>(
        &mut self,
        predicate: P,
        processor: F,
    ) -> &mut Self
    where
        A: Any + Send + Sync,
        P: Fn(&A) -> bool + Send + Sync + 'static,
        F: Fn(&mut MethodMetadata, &A, &MethodDescriptor) -> Result<()> + Send + Sync + 'static,
    {
        self.method_processors.push(Guarded {
            predicate: guard(predicate),
            processor: Arc::new(move |data, attribute, method| {
                match attribute.downcast_ref::<A>() {
                    Some(a) => processor(data, a, method),
                    None => Ok(()),
                }
            }),
        });
        self
    }

    /// Registers the processor for parameter attributes of type `A`, replacing
    /// any earlier one.
    pub fn register_parameter_attribute<A, F>(&mut self, processor: F) -> &mut Self
    where
        A: Any + Send + Sync,
        F: Fn(&mut MethodMetadata, &A, usize) -> Result<()> + Send + Sync + 'static,
    {
        self.parameter_processors.insert(
            TypeId::of::<A>(),
            Arc::new(move |data, attribute, index| match attribute.downcast_ref::<A>() {
                Some(a) => processor(data, a, index),
                None => Ok(()),
            }),
        );
        self
    }
}

fn attribute_names(attributes: &[Attribute]) -> String {
    let names: Vec<&str> = attributes.iter().map(Attribute::name).collect();
    format!("[{}]", names.join(", "))
}

impl BaseContract for DeclarativeContract {
    fn process_class(
        &self,
        data: &mut MethodMetadata,
        interface: &InterfaceDescriptor,
    ) -> Result<()> {
        let attributes = interface.attributes();
        let mut matched = false;
        for attribute in attributes {
            for guarded in &self.class_processors {
                if (guarded.predicate)(attribute) {
                    matched = true;
                    (guarded.processor)(data, attribute, interface)?;
                }
            }
        }
        if !matched {
            let warning = if attributes.is_empty() {
                format!(
                    "Class {} has no annotations, it may affect contract {}",
                    interface.name(),
                    self.name
                )
            } else {
                format!(
                    "Class {} has annotations {} that are not used by contract {}",
                    interface.name(),
                    attribute_names(attributes),
                    self.name
                )
            };
            data.add_warning(warning);
        }
        Ok(())
    }

    fn process_method(
        &self,
        data: &mut MethodMetadata,
        attribute: &Attribute,
        method: &MethodDescriptor,
    ) -> Result<()> {
        let mut matched = false;
        for guarded in &self.method_processors {
            if (guarded.predicate)(attribute) {
                matched = true;
                (guarded.processor)(data, attribute, method)?;
            }
        }
        if !matched {
            data.add_warning(format!(
                "Method {} has an annotation {} that is not used by contract {}",
                method.name(),
                attribute.name(),
                self.name
            ));
        }
        Ok(())
    }

    /// Always returns `false`: bound parameters are recognised through
    /// [`MethodMetadata::is_already_processed`].
    fn process_parameter(
        &self,
        data: &mut MethodMetadata,
        param: &ParamDescriptor,
        index: usize,
    ) -> Result<bool> {
        let mut matched = false;
        for attribute in param.attributes() {
            if let Some(processor) = self.parameter_processors.get(&attribute.type_id()) {
                matched = true;
                processor(data, attribute, index)?;
            }
        }
        if !matched && !param.attributes().is_empty() {
            data.add_warning(format!(
                "Parameter {} has annotations {} that are not used by contract {}",
                param.name().map_or_else(|| format!("#{index}"), str::to_string),
                attribute_names(param.attributes()),
                self.name
            ));
        }
        Ok(false)
    }
}

impl fmt::Debug for DeclarativeContract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeclarativeContract")
            .field("name", &self.name)
            .field("class_processors", &self.class_processors.len())
            .field("method_processors", &self.method_processors.len())
            .field("parameter_processors", &self.parameter_processors.len())
            .finish()
    }
}
