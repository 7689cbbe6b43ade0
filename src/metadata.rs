//! Normalized per-method metadata produced by a contract.

use crate::contract::TypeRef;
use crate::template::RequestTemplate;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

/// Converts a parameter value into the string substituted for its placeholders.
///
/// Multi-valued arguments are expanded element by element.
pub trait Expander: Send + Sync {
    fn expand(&self, value: &Value) -> String;
}

impl<F> Expander for F
where
    F: Fn(&Value) -> String + Send + Sync,
{
    fn expand(&self, value: &Value) -> String {
        self(value)
    }
}

/// Renders a JSON value the way it appears in a URL: strings without quotes,
/// everything else in its JSON form.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Everything a contract learned about one interface method.
///
/// Built once when a client is created and shared read-only by every call.
#[derive(Clone)]
pub struct MethodMetadata {
    config_key: String,
    method_name: String,
    return_type: TypeRef,
    param_types: Vec<TypeRef>,
    template: RequestTemplate,
    index_to_name: BTreeMap<usize, Vec<String>>,
    index_to_expander: BTreeMap<usize, Arc<dyn Expander>>,
    body_index: Option<usize>,
    body_type: Option<TypeRef>,
    form_params: Vec<String>,
    url_index: Option<usize>,
    query_map_index: Option<usize>,
    query_map_encoded: bool,
    header_map_index: Option<usize>,
    ignored: bool,
    ignored_params: BTreeSet<usize>,
    warnings: Vec<String>,
}

impl MethodMetadata {
    /// Creates empty metadata for the method identified by `config_key`.
    pub fn new(
        config_key: impl Into<String>,
        method_name: impl Into<String>,
        return_type: TypeRef,
        param_types: Vec<TypeRef>,
    ) -> Self {
        Self {
            config_key: config_key.into(),
            method_name: method_name.into(),
            return_type,
            param_types,
            template: RequestTemplate::new(),
            index_to_name: BTreeMap::new(),
            index_to_expander: BTreeMap::new(),
            body_index: None,
            body_type: None,
            form_params: Vec::new(),
            url_index: None,
            query_map_index: None,
            query_map_encoded: false,
            header_map_index: None,
            ignored: false,
            ignored_params: BTreeSet::new(),
            warnings: Vec::new(),
        }
    }

    /// `Type#method(Param,...)`.
    pub fn config_key(&self) -> &str {
        &self.config_key
    }

    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    /// The declared return type, with the parent's generics resolved.
    pub fn return_type(&self) -> &TypeRef {
        &self.return_type
    }

    pub fn param_types(&self) -> &[TypeRef] {
        &self.param_types
    }

    /// The skeleton request template.
    pub fn template(&self) -> &RequestTemplate {
        &self.template
    }

    pub fn template_mut(&mut self) -> &mut RequestTemplate {
        &mut self.template
    }

    /// Binds parameter `index` to the placeholder `name`. One parameter may
    /// fill several placeholders.
    pub fn name_param(&mut self, index: usize, name: impl Into<String>) -> &mut Self {
        let name = name.into();
        let names = self.index_to_name.entry(index).or_default();
        if !names.contains(&name) {
            names.push(name);
        }
        self
    }

    pub fn index_to_name(&self) -> &BTreeMap<usize, Vec<String>> {
        &self.index_to_name
    }

    pub fn set_expander(&mut self, index: usize, expander: Arc<dyn Expander>) -> &mut Self {
        self.index_to_expander.insert(index, expander);
        self
    }

    pub fn expander(&self, index: usize) -> Option<&Arc<dyn Expander>> {
        self.index_to_expander.get(&index)
    }

    pub fn set_body_index(&mut self, index: usize, body_type: TypeRef) -> &mut Self {
        self.body_index = Some(index);
        self.body_type = Some(body_type);
        self
    }

    pub fn body_index(&self) -> Option<usize> {
        self.body_index
    }

    pub fn body_type(&self) -> Option<&TypeRef> {
        self.body_type.as_ref()
    }

    pub fn add_form_param(&mut self, name: impl Into<String>) -> &mut Self {
        let name = name.into();
        if !self.form_params.contains(&name) {
            self.form_params.push(name);
        }
        self
    }

    pub fn form_params(&self) -> &[String] {
        &self.form_params
    }

    pub fn set_url_index(&mut self, index: usize) -> &mut Self {
        self.url_index = Some(index);
        self
    }

    pub fn url_index(&self) -> Option<usize> {
        self.url_index
    }

    /// Marks parameter `index` as a bulk query map; `encoded` maps are not
    /// percent-encoded again.
    pub fn set_query_map_index(&mut self, index: usize, encoded: bool) -> &mut Self {
        self.query_map_index = Some(index);
        self.query_map_encoded = encoded;
        self
    }

    pub fn query_map_index(&self) -> Option<usize> {
        self.query_map_index
    }

    pub fn query_map_encoded(&self) -> bool {
        self.query_map_encoded
    }

    pub fn set_header_map_index(&mut self, index: usize) -> &mut Self {
        self.header_map_index = Some(index);
        self
    }

    pub fn header_map_index(&self) -> Option<usize> {
        self.header_map_index
    }

    /// Excludes the method from dispatch.
    pub fn ignore_method(&mut self) -> &mut Self {
        self.ignored = true;
        self
    }

    pub fn is_ignored(&self) -> bool {
        self.ignored
    }

    /// Excludes parameter `index` from body detection.
    pub fn ignore_param(&mut self, index: usize) -> &mut Self {
        self.ignored_params.insert(index);
        self
    }

    pub fn is_param_ignored(&self, index: usize) -> bool {
        self.ignored_params.contains(&index)
    }

    /// Returns `true` if some attribute already claimed parameter `index`.
    pub fn is_already_processed(&self, index: usize) -> bool {
        self.index_to_name.contains_key(&index)
            || self.ignored_params.contains(&index)
            || self.url_index == Some(index)
            || self.query_map_index == Some(index)
            || self.header_map_index == Some(index)
            || self.body_index == Some(index)
    }

    pub fn add_warning(&mut self, warning: impl Into<String>) -> &mut Self {
        self.warnings.push(warning.into());
        self
    }

    /// Non-fatal diagnostics about unused attributes.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// The warnings formatted for inclusion in an error message.
    pub fn warnings_text(&self) -> String {
        if self.warnings.is_empty() {
            return String::new();
        }
        format!("\nWarnings:\n- {}", self.warnings.join("\n- "))
    }
}

impl fmt::Debug for MethodMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodMetadata")
            .field("config_key", &self.config_key)
            .field("return_type", &self.return_type)
            .field("template", &self.template)
            .field("index_to_name", &self.index_to_name)
            .field("expanders", &self.index_to_expander.keys().collect::<Vec<_>>())
            .field("body_index", &self.body_index)
            .field("form_params", &self.form_params)
            .field("url_index", &self.url_index)
            .field("query_map_index", &self.query_map_index)
            .field("header_map_index", &self.header_map_index)
            .field("ignored", &self.ignored)
            .field("warnings", &self.warnings)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn metadata() -> MethodMetadata {
        MethodMetadata::new(
            "Api#find(String,String)",
            "find",
            TypeRef::string(),
            vec![TypeRef::string(), TypeRef::string()],
        )
    }

    #[test]
    fn one_parameter_can_fill_several_placeholders() {
        let mut data = metadata();
        data.name_param(0, "id").name_param(0, "key").name_param(0, "id");

        assert_eq!(data.index_to_name()[&0], vec!["id", "key"]);
        assert!(data.is_already_processed(0));
        assert!(!data.is_already_processed(1));
    }

    #[test]
    fn closures_are_expanders() {
        let upper = |v: &Value| value_to_string(v).to_uppercase();
        let mut data = metadata();
        data.set_expander(1, Arc::new(upper));

        let expander = data.expander(1).unwrap();
        assert_eq!(expander.expand(&json!("abc")), "ABC");
    }

    #[test]
    fn warnings_share_one_header() {
        let mut data = metadata();
        assert_eq!(data.warnings_text(), "");

        data.add_warning("first").add_warning("second");
        assert_eq!(data.warnings_text(), "\nWarnings:\n- first\n- second");
    }

    #[test]
    fn values_render_without_quotes() {
        assert_eq!(value_to_string(&json!("x")), "x");
        assert_eq!(value_to_string(&json!(42)), "42");
        assert_eq!(value_to_string(&json!(true)), "true");
    }
}
