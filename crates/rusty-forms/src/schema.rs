// File: src/schema.rs
// Purpose: Data-driven form model declarations (name, fields, labels, validators, hooks)

use crate::config::FileFieldMappings;
use crate::error::{FormError, Result};
use crate::events::Outcome;
use crate::model::{EventArgs, FormModel, ModelEvents};
use crate::store::{Attributes, SetOptions};
use crate::value::Value;
use crate::validator::Validator;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

type Initializer = Arc<dyn Fn(&mut FormModel) + Send + Sync>;

struct SchemaInner {
    name: String,
    fields: Vec<String>,
    labels: HashMap<String, String>,
    defaults: Attributes,
    validators: HashMap<String, Vec<Validator>>,
    handlers: ModelEvents,
    initializers: Vec<Initializer>,
    file_mappings: FileFieldMappings,
}

/// A declared form model type.
///
/// Cheap to clone; every [`FormModel`] built from it shares the declaration.
///
/// ```rust
/// use rusty_forms::{define_model, validators};
///
/// let login = define_model("loginForm")
///     .fields(["email_address", "password"])
///     .validators("email_address", [validators::required(), validators::email()])
///     .build()
///     .unwrap();
///
/// let model = login.create();
/// assert_eq!(model.get_field_identifier("password").unwrap(), "loginForm_password");
/// ```
#[derive(Clone)]
pub struct FormSchema {
    inner: Arc<SchemaInner>,
}

impl fmt::Debug for FormSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormSchema")
            .field("name", &self.inner.name)
            .field("fields", &self.inner.fields)
            .field("labels", &self.inner.labels)
            .field("validators", &self.inner.validators)
            .finish()
    }
}

/// Start declaring a model type
pub fn define_model(name: impl Into<String>) -> SchemaBuilder {
    SchemaBuilder::new(name)
}

impl FormSchema {
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Declared fields in declaration order
    pub fn fields(&self) -> &[String] {
        &self.inner.fields
    }

    pub fn declares(&self, field: &str) -> bool {
        self.inner.fields.iter().any(|f| f == field)
    }

    /// Explicit label, if one was declared
    pub fn label(&self, field: &str) -> Option<&str> {
        self.inner.labels.get(field).map(String::as_str)
    }

    /// Validators for `field`, in declaration order
    pub fn validators_for(&self, field: &str) -> &[Validator] {
        self.inner
            .validators
            .get(field)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn defaults(&self) -> &Attributes {
        &self.inner.defaults
    }

    pub fn file_mappings(&self) -> &FileFieldMappings {
        &self.inner.file_mappings
    }

    pub(crate) fn handlers(&self) -> &ModelEvents {
        &self.inner.handlers
    }

    pub(crate) fn initializers(&self) -> impl Iterator<Item = &Initializer> {
        self.inner.initializers.iter()
    }

    /// New instance holding only the defaults
    pub fn create(&self) -> FormModel {
        FormModel::new(self)
    }

    /// New instance with initial attributes layered over the defaults
    pub fn create_with<K, V, I>(&self, attrs: I, options: SetOptions) -> FormModel
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        FormModel::with_attributes(self, attrs, options)
    }
}

/// Builder for [`FormSchema`]
pub struct SchemaBuilder {
    name: String,
    fields: Vec<String>,
    labels: HashMap<String, String>,
    defaults: Attributes,
    validators: Vec<(String, Validator)>,
    handlers: ModelEvents,
    initializers: Vec<Initializer>,
    file_mappings: FileFieldMappings,
}

impl SchemaBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            labels: HashMap::new(),
            defaults: Attributes::new(),
            validators: Vec::new(),
            handlers: ModelEvents::new(),
            initializers: Vec::new(),
            file_mappings: FileFieldMappings::default(),
        }
    }

    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.fields.push(field.into());
        self
    }

    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields.extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn label(mut self, field: impl Into<String>, label: impl Into<String>) -> Self {
        self.labels.insert(field.into(), label.into());
        self
    }

    pub fn labels<I, K, L>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = (K, L)>,
        K: Into<String>,
        L: Into<String>,
    {
        self.labels
            .extend(labels.into_iter().map(|(k, l)| (k.into(), l.into())));
        self
    }

    /// Value a new instance starts with
    pub fn default_value(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.defaults.insert(field.into(), value.into());
        self
    }

    /// Append one validator to a field's chain
    pub fn validator(mut self, field: impl Into<String>, validator: Validator) -> Self {
        self.validators.push((field.into(), validator));
        self
    }

    /// Append several validators to a field's chain
    pub fn validators<I>(mut self, field: impl Into<String>, validators: I) -> Self
    where
        I: IntoIterator<Item = Validator>,
    {
        let field = field.into();
        for validator in validators {
            self.validators.push((field.clone(), validator));
        }
        self
    }

    /// Upload attribute names used by `has_file`
    pub fn file_mappings(mut self, mappings: FileFieldMappings) -> Self {
        self.file_mappings = mappings;
        self
    }

    /// Handler installed on every instance
    pub fn on<F>(mut self, event: impl Into<String>, handler: F) -> Self
    where
        F: for<'a> Fn(&'a mut FormModel, &'a mut EventArgs) -> Outcome<'a> + Send + Sync + 'static,
    {
        self.handlers.on(event, handler);
        self
    }

    /// Hook run once per instance, after the initial attributes are set
    pub fn initialize<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut FormModel) + Send + Sync + 'static,
    {
        self.initializers.push(Arc::new(hook));
        self
    }

    /// Check the declaration and freeze it
    pub fn build(self) -> Result<FormSchema> {
        if self.name.trim().is_empty() {
            return Err(FormError::MissingName);
        }

        let mut seen = HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.as_str()) {
                return Err(FormError::DuplicateField {
                    field: field.clone(),
                    model: self.name.clone(),
                });
            }
        }

        let undeclared = self
            .labels
            .keys()
            .chain(self.validators.iter().map(|(field, _)| field))
            .find(|field| !seen.contains(field.as_str()));
        if let Some(field) = undeclared {
            return Err(FormError::unknown_field(field, &self.name));
        }

        let mut validators: HashMap<String, Vec<Validator>> = HashMap::new();
        for (field, validator) in self.validators {
            validators.entry(field).or_default().push(validator);
        }

        tracing::debug!(model = %self.name, fields = self.fields.len(), "form schema built");

        Ok(FormSchema {
            inner: Arc::new(SchemaInner {
                name: self.name,
                fields: self.fields,
                labels: self.labels,
                defaults: self.defaults,
                validators,
                handlers: self.handlers,
                initializers: self.initializers,
                file_mappings: self.file_mappings,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validators;

    #[test]
    fn test_missing_name_is_rejected() {
        let err = define_model("").field("a").build().unwrap_err();
        assert!(matches!(err, FormError::MissingName));
    }

    #[test]
    fn test_duplicate_field_is_rejected() {
        let err = define_model("f").fields(["a", "a"]).build().unwrap_err();
        assert!(matches!(err, FormError::DuplicateField { .. }));
    }

    #[test]
    fn test_validator_on_undeclared_field_is_rejected() {
        let err = define_model("f")
            .field("a")
            .validator("b", validators::required())
            .build()
            .unwrap_err();
        assert_eq!(err.to_string(), "Field 'b' Not Found In Model 'f'");
    }

    #[test]
    fn test_validators_keep_declaration_order() {
        let schema = define_model("f")
            .field("a")
            .validator("a", validators::required())
            .validators("a", [validators::email(), validators::max_length(5)])
            .build()
            .unwrap();

        let names: Vec<_> = schema.validators_for("a").iter().map(Validator::name).collect();
        assert_eq!(names, vec!["required", "email", "max_length"]);
        assert!(schema.validators_for("missing").is_empty());
        assert!(schema.declares("a"));
        assert!(!schema.declares("b"));
    }
}
