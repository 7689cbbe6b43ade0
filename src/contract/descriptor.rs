//! Explicit descriptions of declarative interfaces.
//!
//! Rust has no runtime reflection, so an interface is described as data: its
//! name, generic parameters, parent, attributes and methods. Adapter types build
//! one [`InterfaceDescriptor`] and hand it to a [`Contract`](crate::Contract).

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A lightweight type descriptor used for parameters and return types.
///
/// # Examples
///
/// ```
/// use courier::contract::TypeRef;
///
/// let ty = TypeRef::list(TypeRef::named("Contributor"));
/// assert_eq!(ty.to_string(), "List<Contributor>");
/// assert_eq!(ty.raw_name(), "List");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    /// A concrete type, possibly generic.
    Named {
        /// The raw type name.
        name: String,
        /// Generic arguments.
        args: Vec<TypeRef>,
    },
    /// An unresolved generic type variable.
    Var(String),
    /// A wildcard argument.
    Wildcard,
}

impl TypeRef {
    /// A non-generic type.
    pub fn named(name: impl Into<String>) -> Self {
        TypeRef::Named {
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// A generic type applied to `args`.
    pub fn generic(name: impl Into<String>, args: Vec<TypeRef>) -> Self {
        TypeRef::Named {
            name: name.into(),
            args,
        }
    }

    /// A generic type variable.
    pub fn var(name: impl Into<String>) -> Self {
        TypeRef::Var(name.into())
    }

    /// `String`.
    pub fn string() -> Self {
        Self::named("String")
    }

    /// `Uri`: a parameter of this type overrides the target URL.
    pub fn uri() -> Self {
        Self::named("Uri")
    }

    /// `Options`: a parameter of this type overrides the request options.
    pub fn options() -> Self {
        Self::named("Options")
    }

    /// `Void`: the method returns nothing.
    pub fn void() -> Self {
        Self::named("Void")
    }

    /// `Bytes`: raw body bytes.
    pub fn bytes() -> Self {
        Self::named("Bytes")
    }

    /// `Response`: the raw HTTP response.
    pub fn response() -> Self {
        Self::named("Response")
    }

    /// `Map<K, V>`.
    pub fn map(key: TypeRef, value: TypeRef) -> Self {
        Self::generic("Map", vec![key, value])
    }

    /// `List<T>`.
    pub fn list(item: TypeRef) -> Self {
        Self::generic("List", vec![item])
    }

    /// `Optional<T>`.
    pub fn optional(item: TypeRef) -> Self {
        Self::generic("Optional", vec![item])
    }

    /// The raw name, without generic arguments.
    pub fn raw_name(&self) -> &str {
        match self {
            TypeRef::Named { name, .. } => name,
            TypeRef::Var(name) => name,
            TypeRef::Wildcard => "?",
        }
    }

    /// Generic arguments of a named type.
    pub fn args(&self) -> &[TypeRef] {
        match self {
            TypeRef::Named { args, .. } => args,
            _ => &[],
        }
    }

    fn is_named(&self, raw: &str) -> bool {
        matches!(self, TypeRef::Named { name, .. } if name == raw)
    }

    /// Returns `true` for `String`.
    pub fn is_string(&self) -> bool {
        self.is_named("String")
    }

    /// Returns `true` for `Uri`.
    pub fn is_uri(&self) -> bool {
        self.is_named("Uri")
    }

    /// Returns `true` for `Options`.
    pub fn is_options(&self) -> bool {
        self.is_named("Options")
    }

    /// Returns `true` for `Void`.
    pub fn is_void(&self) -> bool {
        self.is_named("Void")
    }

    /// Returns `true` for `Bytes`.
    pub fn is_bytes(&self) -> bool {
        self.is_named("Bytes")
    }

    /// Returns `true` for `Response`.
    pub fn is_response(&self) -> bool {
        self.is_named("Response")
    }

    /// Returns `true` for `Optional<T>`.
    pub fn is_optional(&self) -> bool {
        self.is_named("Optional")
    }

    /// Returns `true` for `Map`, `HashMap` and `BTreeMap`.
    pub fn is_map(&self) -> bool {
        ["Map", "HashMap", "BTreeMap"]
            .iter()
            .any(|name| self.is_named(name))
    }

    /// The key type of a map, when it is statically known.
    pub fn map_key(&self) -> Option<&TypeRef> {
        if self.is_map() {
            self.args().first()
        } else {
            None
        }
    }

    /// Substitutes generic variables with their bindings.
    pub fn resolve(&self, bindings: &HashMap<String, TypeRef>) -> TypeRef {
        match self {
            TypeRef::Var(name) => bindings.get(name).cloned().unwrap_or_else(|| self.clone()),
            TypeRef::Named { name, args } => TypeRef::Named {
                name: name.clone(),
                args: args.iter().map(|a| a.resolve(bindings)).collect(),
            },
            TypeRef::Wildcard => TypeRef::Wildcard,
        }
    }

    /// Returns `true` if a generic variable remains anywhere in the type.
    pub fn has_unresolved(&self) -> bool {
        match self {
            TypeRef::Var(_) => true,
            TypeRef::Named { args, .. } => args.iter().any(TypeRef::has_unresolved),
            TypeRef::Wildcard => false,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Named { name, args } if args.is_empty() => f.write_str(name),
            TypeRef::Named { name, args } => {
                let args: Vec<String> = args.iter().map(ToString::to_string).collect();
                write!(f, "{}<{}>", name, args.join(", "))
            }
            TypeRef::Var(name) => f.write_str(name),
            TypeRef::Wildcard => f.write_str("?"),
        }
    }
}

/// A type-erased declarative attribute attached to an interface, method or
/// parameter.
///
/// Any `'static` value can be an attribute; dialects register processors keyed
/// by the attribute's Rust type.
#[derive(Clone)]
pub struct Attribute {
    name: &'static str,
    value: Arc<dyn Any + Send + Sync>,
}

impl Attribute {
    /// Wraps `value` as an attribute.
    pub fn new<A: Any + Send + Sync>(value: A) -> Self {
        let full = std::any::type_name::<A>();
        Self {
            name: full.rsplit("::").next().unwrap_or(full),
            value: Arc::new(value),
        }
    }

    /// The short type name of the attribute, used in warnings.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The type identity of the wrapped value.
    pub fn type_id(&self) -> TypeId {
        (*self.value).type_id()
    }

    /// Returns `true` if the attribute is an `A`.
    pub fn is<A: Any>(&self) -> bool {
        self.value.is::<A>()
    }

    /// Returns the attribute as an `A`.
    pub fn downcast_ref<A: Any>(&self) -> Option<&A> {
        self.value.downcast_ref::<A>()
    }
}

impl fmt::Debug for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.name)
    }
}

/// A parent interface together with the type arguments it is applied to.
#[derive(Debug, Clone)]
pub struct Supertype {
    /// The parent interface.
    pub interface: Arc<InterfaceDescriptor>,
    /// Bindings for the parent's type parameters, in declaration order.
    pub type_args: Vec<TypeRef>,
}

/// What kind of method a descriptor describes.
///
/// Only abstract methods become API calls; the others are implemented by the
/// adapter type itself.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MethodKind {
    /// An API call.
    #[default]
    Abstract,
    /// A method with a provided implementation.
    Default,
    /// An associated function.
    Static,
    /// Identity methods such as `eq`, `hash` or `to_string`.
    Identity,
}

/// Describes one parameter of a method.
#[derive(Debug, Clone)]
pub struct ParamDescriptor {
    name: Option<String>,
    ty: TypeRef,
    attributes: Vec<Attribute>,
}

impl ParamDescriptor {
    /// An unnamed parameter of type `ty`.
    pub fn new(ty: TypeRef) -> Self {
        Self {
            name: None,
            ty,
            attributes: Vec::new(),
        }
    }

    /// A named parameter of type `ty`.
    pub fn named(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::new(ty)
        }
    }

    /// Attaches an attribute.
    pub fn attribute<A: Any + Send + Sync>(mut self, attribute: A) -> Self {
        self.attributes.push(Attribute::new(attribute));
        self
    }

    /// The declared name, if known.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The parameter type.
    pub fn ty(&self) -> &TypeRef {
        &self.ty
    }

    /// The attached attributes, in declaration order.
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }
}

/// Describes one method of an interface.
#[derive(Debug, Clone)]
pub struct MethodDescriptor {
    name: String,
    kind: MethodKind,
    attributes: Vec<Attribute>,
    params: Vec<ParamDescriptor>,
    return_type: TypeRef,
}

impl MethodDescriptor {
    /// An abstract method returning `Void`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: MethodKind::Abstract,
            attributes: Vec::new(),
            params: Vec::new(),
            return_type: TypeRef::void(),
        }
    }

    /// Sets the method kind.
    pub fn kind(mut self, kind: MethodKind) -> Self {
        self.kind = kind;
        self
    }

    /// Attaches a method attribute.
    pub fn attribute<A: Any + Send + Sync>(mut self, attribute: A) -> Self {
        self.attributes.push(Attribute::new(attribute));
        self
    }

    /// Appends a parameter.
    pub fn param(mut self, param: ParamDescriptor) -> Self {
        self.params.push(param);
        self
    }

    /// Sets the return type.
    pub fn returns(mut self, return_type: TypeRef) -> Self {
        self.return_type = return_type;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn method_kind(&self) -> MethodKind {
        self.kind
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn params(&self) -> &[ParamDescriptor] {
        &self.params
    }

    pub fn return_type(&self) -> &TypeRef {
        &self.return_type
    }

    /// A copy with every type resolved against `bindings`.
    pub(crate) fn resolved(&self, bindings: &HashMap<String, TypeRef>) -> Self {
        let mut method = self.clone();
        method.return_type = self.return_type.resolve(bindings);
        for param in &mut method.params {
            param.ty = param.ty.resolve(bindings);
        }
        method
    }
}

/// Describes a declarative API interface.
///
/// # Examples
///
/// ```
/// use courier::contract::{attr, InterfaceDescriptor, MethodDescriptor, ParamDescriptor, TypeRef};
///
/// let github = InterfaceDescriptor::new("GitHub").method(
///     MethodDescriptor::new("contributors")
///         .attribute(attr::RequestLine::new("GET /repos/{owner}/{repo}/contributors"))
///         .param(ParamDescriptor::new(TypeRef::string()).attribute(attr::Param::new("owner")))
///         .param(ParamDescriptor::new(TypeRef::string()).attribute(attr::Param::new("repo")))
///         .returns(TypeRef::list(TypeRef::named("Contributor"))),
/// );
/// assert_eq!(github.methods().len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct InterfaceDescriptor {
    name: String,
    type_params: Vec<String>,
    supertypes: Vec<Supertype>,
    attributes: Vec<Attribute>,
    methods: Vec<MethodDescriptor>,
}

impl InterfaceDescriptor {
    /// An empty interface named `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Declares a generic type parameter.
    pub fn type_param(mut self, name: impl Into<String>) -> Self {
        self.type_params.push(name.into());
        self
    }

    /// Declares a parent interface applied to `type_args`.
    pub fn extends(mut self, parent: Arc<InterfaceDescriptor>, type_args: Vec<TypeRef>) -> Self {
        self.supertypes.push(Supertype {
            interface: parent,
            type_args,
        });
        self
    }

    /// Attaches an interface-level attribute.
    pub fn attribute<A: Any + Send + Sync>(mut self, attribute: A) -> Self {
        self.attributes.push(Attribute::new(attribute));
        self
    }

    /// Declares a method.
    pub fn method(mut self, method: MethodDescriptor) -> Self {
        self.methods.push(method);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_params(&self) -> &[String] {
        &self.type_params
    }

    pub fn supertypes(&self) -> &[Supertype] {
        &self.supertypes
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn methods(&self) -> &[MethodDescriptor] {
        &self.methods
    }
}

/// Builds the identity of a method: `Type#method(Param,Param)`.
///
/// Only raw type names are used, so `List<String>` contributes `List`.
///
/// # Examples
///
/// ```
/// use courier::contract::{config_key, MethodDescriptor, ParamDescriptor, TypeRef};
///
/// let method = MethodDescriptor::new("find")
///     .param(ParamDescriptor::new(TypeRef::string()))
///     .param(ParamDescriptor::new(TypeRef::list(TypeRef::string())));
/// assert_eq!(config_key("Users", &method), "Users#find(String,List)");
/// ```
pub fn config_key(interface: &str, method: &MethodDescriptor) -> String {
    let params: Vec<&str> = method.params().iter().map(|p| p.ty().raw_name()).collect();
    format!("{}#{}({})", interface, method.name(), params.join(","))
}
