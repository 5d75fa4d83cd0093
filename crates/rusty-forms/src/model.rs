// File: src/model.rs
// Purpose: Form model instances: attributes, request parsing, validation pipelines, error bookkeeping

use crate::error::{FormError, Result};
use crate::events::{EventHub, Outcome};
use crate::inflect::titleize;
use crate::request::FormRequest;
use crate::schema::FormSchema;
use crate::store::{AttributeStore, Attributes, SetOptions};
use crate::validator::{Candidate, Verdict};
use crate::validators::file::has_file;
use crate::value::Value;
use futures::FutureExt;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Extra values handed to validators and message templates for one run
pub type Context = HashMap<String, Value>;

/// Handler registry of a model instance
pub type ModelEvents = EventHub<FormModel, EventArgs>;

/// Lifecycle event names
pub mod lifecycle {
    pub const CHANGE: &str = "change";
    pub const BEFORE_PARSE_REQUEST: &str = "beforeParseRequest";
    pub const AFTER_PARSE_REQUEST: &str = "afterParseRequest";
    pub const BEFORE_VALIDATE: &str = "beforeValidate";
    pub const AFTER_VALIDATE: &str = "afterValidate";
}

/// Payload handed to event handlers
#[derive(Debug, Clone, PartialEq)]
pub enum EventArgs {
    Change(SetOptions),
    /// The request being parsed; before-handlers may rewrite it
    ParseRequest(FormRequest),
    /// The validation context; before-handlers may add to it
    BeforeValidate(Context),
    AfterValidate { valid: bool, errors: ErrorMap },
    Custom(Vec<Value>),
}

impl EventArgs {
    pub fn request(&self) -> Option<&FormRequest> {
        match self {
            EventArgs::ParseRequest(request) => Some(request),
            _ => None,
        }
    }

    pub fn request_mut(&mut self) -> Option<&mut FormRequest> {
        match self {
            EventArgs::ParseRequest(request) => Some(request),
            _ => None,
        }
    }

    pub fn context_mut(&mut self) -> Option<&mut Context> {
        match self {
            EventArgs::BeforeValidate(context) => Some(context),
            _ => None,
        }
    }

    /// Result of the validation run that just finished
    pub fn validation(&self) -> Option<(bool, &ErrorMap)> {
        match self {
            EventArgs::AfterValidate { valid, errors } => Some((*valid, errors)),
            _ => None,
        }
    }

    fn into_context(self) -> Context {
        match self {
            EventArgs::BeforeValidate(context) => context,
            _ => Context::new(),
        }
    }
}

/// Field name → messages, in the order they were recorded
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ErrorMap {
    errors: BTreeMap<String, Vec<String>>,
}

impl ErrorMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    /// Messages for `field`; empty if none
    pub fn get(&self, field: &str) -> &[String] {
        self.errors.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn first(&self, field: &str) -> Option<&str> {
        self.get(field).first().map(String::as_str)
    }

    pub fn has(&self, field: &str) -> bool {
        !self.get(field).is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.values().all(Vec::is_empty)
    }

    /// Total number of messages across all fields
    pub fn count(&self) -> usize {
        self.errors.values().map(Vec::len).sum()
    }

    pub fn clear(&mut self) {
        self.errors.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.errors.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

/// One form instance built from a [`FormSchema`].
///
/// Holds the attribute values, its own copy of the event handlers, and the
/// error map produced by the most recent validation run.
#[derive(Clone)]
pub struct FormModel {
    schema: FormSchema,
    store: AttributeStore,
    events: ModelEvents,
    errors: ErrorMap,
}

impl fmt::Debug for FormModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormModel")
            .field("name", &self.name())
            .field("attributes", self.store.attributes())
            .field("errors", &self.errors)
            .field("events", &self.events)
            .finish()
    }
}

impl FormModel {
    /// Instance holding only the schema defaults
    pub fn new(schema: &FormSchema) -> Self {
        Self::with_attributes(schema, Attributes::new(), SetOptions::default())
    }

    /// Instance whose initial attributes are the defaults overridden by `attrs`.
    ///
    /// Schema handlers are installed after the initial set, then the
    /// initialize hooks run.
    pub fn with_attributes<K, V, I>(schema: &FormSchema, attrs: I, options: SetOptions) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut initial = schema.defaults().clone();
        initial.extend(attrs.into_iter().map(|(k, v)| (k.into(), v.into())));

        let mut store = AttributeStore::new();
        store.set_many(initial, options);

        let mut model = Self {
            schema: schema.clone(),
            store,
            events: schema.handlers().clone(),
            errors: ErrorMap::new(),
        };
        for hook in schema.initializers() {
            hook(&mut model);
        }

        tracing::trace!(model = %model.name(), "form model created");
        model
    }

    pub fn name(&self) -> &str {
        self.schema.name()
    }

    pub fn schema(&self) -> &FormSchema {
        &self.schema
    }

    pub fn fields(&self) -> &[String] {
        self.schema.fields()
    }

    fn ensure_declared(&self, field: &str) -> Result<()> {
        if self.schema.declares(field) {
            Ok(())
        } else {
            Err(FormError::unknown_field(field, self.name()))
        }
    }

    // ===== Attributes =====

    /// Current value of any attribute, declared or not
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.store.get(key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.store.has(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.set_with(key, value, SetOptions::default())
    }

    /// Write one attribute; fires `change` unless silent or nothing changed
    pub fn set_with(
        &mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
        options: SetOptions,
    ) -> &mut Self {
        if self.store.set(key, value, options) && !options.silent {
            self.emit_change(options);
        }
        self
    }

    /// Write several attributes; fires `change` at most once
    pub fn set_many<K, V, I>(&mut self, attrs: I, options: SetOptions) -> &mut Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        if self.store.set_many(attrs, options) && !options.silent {
            self.emit_change(options);
        }
        self
    }

    pub fn unset(&mut self, key: impl Into<String>) -> &mut Self {
        self.set_with(key, Value::Null, SetOptions::unset())
    }

    fn emit_change(&mut self, options: SetOptions) {
        let listeners = self.events.listeners(lifecycle::CHANGE);
        if !listeners.is_empty() {
            listeners.trigger(self, &mut EventArgs::Change(options));
        }
    }

    pub fn attributes(&self) -> &Attributes {
        self.store.attributes()
    }

    pub fn changed_attributes(&self) -> &Attributes {
        self.store.changed_attributes()
    }

    pub fn has_changed(&self, key: Option<&str>) -> bool {
        self.store.has_changed(key)
    }

    pub fn previous(&self, key: &str) -> Option<&Value> {
        self.store.previous(key)
    }

    /// Attributes as of the last `reset_changes`
    pub fn previous_attributes(&self) -> &Attributes {
        self.store.previous_attributes()
    }

    /// Snapshot the current attributes; nothing counts as changed afterwards
    pub fn reset_changes(&mut self) -> &mut Self {
        self.store.reset();
        self
    }

    pub fn to_json(&self) -> JsonValue {
        self.store.to_json()
    }

    // ===== Events =====

    pub fn on<F>(&mut self, event: impl Into<String>, handler: F) -> &mut Self
    where
        F: for<'a> Fn(&'a mut FormModel, &'a mut EventArgs) -> Outcome<'a> + Send + Sync + 'static,
    {
        self.events.on(event, handler);
        self
    }

    pub fn off(&mut self, event: &str) -> &mut Self {
        self.events.off(event);
        self
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.events.listener_count(event)
    }

    /// Fire-and-forget dispatch; handler failures are logged
    pub fn trigger(&mut self, event: &str, args: &mut EventArgs) {
        let listeners = self.events.listeners(event);
        listeners.trigger(self, args);
    }

    /// Run handlers one after another, stopping at the first failure
    pub async fn trigger_sequential(&mut self, event: &str, args: &mut EventArgs) -> Result<()> {
        let listeners = self.events.listeners(event);
        listeners.trigger_sequential(self, args).await
    }

    // ===== Errors and labels =====

    /// Record a message against a field by hand
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) -> &mut Self {
        self.errors.add(field, message);
        self
    }

    pub fn clear_errors(&mut self) -> &mut Self {
        self.errors.clear();
        self
    }

    pub fn errors(&self) -> &ErrorMap {
        &self.errors
    }

    pub fn get_errors(&self, field: &str) -> Result<&[String]> {
        self.ensure_declared(field)?;
        Ok(self.errors.get(field))
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn field_has_errors(&self, field: &str) -> Result<bool> {
        self.ensure_declared(field)?;
        Ok(self.errors.has(field))
    }

    /// First message for `field`, or an empty string
    pub fn get_first_error(&self, field: &str) -> Result<&str> {
        self.ensure_declared(field)?;
        Ok(self.errors.first(field).unwrap_or(""))
    }

    /// True if any validator on `field` is a required check
    pub fn is_required(&self, field: &str) -> Result<bool> {
        self.ensure_declared(field)?;
        Ok(self
            .schema
            .validators_for(field)
            .iter()
            .any(|v| v.is_required()))
    }

    /// External name of `field` in requests: `<model>_<field>`
    pub fn get_field_identifier(&self, field: &str) -> Result<String> {
        self.ensure_declared(field)?;
        Ok(self.identifier_for(field))
    }

    /// Declared label, or the titleized field name
    pub fn get_label_text(&self, field: &str) -> Result<String> {
        self.ensure_declared(field)?;
        Ok(self.label_for(field))
    }

    /// True if `field` holds a non-empty upload descriptor
    pub fn has_file(&self, field: &str) -> Result<bool> {
        self.ensure_declared(field)?;
        Ok(self
            .store
            .get(field)
            .is_some_and(|value| has_file(value, self.schema.file_mappings())))
    }

    fn identifier_for(&self, field: &str) -> String {
        format!("{}_{}", self.name(), field)
    }

    fn label_for(&self, field: &str) -> String {
        self.schema
            .label(field)
            .map(str::to_string)
            .unwrap_or_else(|| titleize(field))
    }

    // ===== Request parsing =====

    /// Copy every declared field found in `request` into the model.
    ///
    /// Body wins over query, query over files. Handler failures are logged.
    pub fn parse_request_sync(&mut self, request: FormRequest) -> &mut Self {
        let mut args = EventArgs::ParseRequest(request);
        self.trigger(lifecycle::BEFORE_PARSE_REQUEST, &mut args);
        self.apply_request(&args);
        self.trigger(lifecycle::AFTER_PARSE_REQUEST, &mut args);
        self
    }

    /// As [`parse_request_sync`](Self::parse_request_sync), awaiting each
    /// handler in turn; a failing handler aborts the parse.
    pub async fn parse_request(&mut self, request: FormRequest) -> Result<&mut Self> {
        let mut args = EventArgs::ParseRequest(request);
        self.trigger_sequential(lifecycle::BEFORE_PARSE_REQUEST, &mut args)
            .await?;
        self.apply_request(&args);
        self.trigger_sequential(lifecycle::AFTER_PARSE_REQUEST, &mut args)
            .await?;
        Ok(self)
    }

    fn apply_request(&mut self, args: &EventArgs) {
        let Some(request) = args.request() else {
            tracing::warn!(model = %self.name(), "request replaced by a handler; nothing parsed");
            return;
        };

        let schema = self.schema.clone();
        let mut found = 0usize;
        for field in schema.fields() {
            let identifier = self.identifier_for(field);
            if let Some((source, value)) = request.lookup(&identifier) {
                tracing::trace!(model = %self.name(), %field, ?source, "field read from request");
                self.set(field.as_str(), value.clone());
                found += 1;
            }
        }
        tracing::debug!(model = %self.name(), found, "request parsed");
    }

    // ===== Validation =====

    /// Run every synchronous validator.
    ///
    /// Fails with `NotInvocable` before anything runs if the schema holds a
    /// deferred validator. The result is false only when a validator failed;
    /// messages a handler adds by hand stay in the error map but do not
    /// change it.
    pub fn validate_sync(&mut self) -> Result<bool> {
        self.validate_sync_with(Context::new())
    }

    pub fn validate_sync_with(&mut self, context: Context) -> Result<bool> {
        let schema = self.schema.clone();
        for field in schema.fields() {
            if let Some(validator) = schema.validators_for(field).iter().find(|v| v.is_deferred()) {
                return Err(FormError::NotInvocable {
                    validator: validator.name().to_string(),
                    field: field.clone(),
                    model: self.name().to_string(),
                    reason: "deferred validators require the asynchronous pipeline",
                });
            }
        }

        self.errors.clear();
        let mut before = EventArgs::BeforeValidate(context);
        self.trigger(lifecycle::BEFORE_VALIDATE, &mut before);
        let context = before.into_context();

        let mut failures = Vec::new();
        for field in schema.fields() {
            let validators = schema.validators_for(field);
            if validators.is_empty() {
                continue;
            }
            let label = self.label_for(field);
            let value = Candidate::value_or_null(self.store.get(field));
            let candidate = Candidate {
                value,
                label: &label,
                field,
                model: Some(&*self),
                context: &context,
            };
            for validator in validators {
                if let Verdict::Invalid(message) = validator.check(&candidate)? {
                    tracing::trace!(%field, validator = validator.name(), "validator failed");
                    failures.push((field.clone(), message));
                }
            }
        }

        let valid = failures.is_empty();
        self.finish_validation(failures);
        let mut after = EventArgs::AfterValidate {
            valid,
            errors: self.errors.clone(),
        };
        self.trigger(lifecycle::AFTER_VALIDATE, &mut after);
        Ok(valid)
    }

    /// Run every validator, synchronous and deferred, concurrently.
    ///
    /// Messages are recorded in declaration order regardless of completion
    /// order. A failing validator or handler aborts the run.
    pub async fn validate(&mut self) -> Result<bool> {
        self.validate_with(Context::new()).await
    }

    pub async fn validate_with(&mut self, context: Context) -> Result<bool> {
        self.errors.clear();
        let mut before = EventArgs::BeforeValidate(context);
        self.trigger_sequential(lifecycle::BEFORE_VALIDATE, &mut before)
            .await?;
        let context = before.into_context();

        let failures = self.run_validators(&context).await?;

        let valid = failures.is_empty();
        self.finish_validation(failures);
        let mut after = EventArgs::AfterValidate {
            valid,
            errors: self.errors.clone(),
        };
        self.trigger_sequential(lifecycle::AFTER_VALIDATE, &mut after)
            .await?;
        Ok(valid)
    }

    async fn run_validators(&self, context: &Context) -> Result<Vec<(String, String)>> {
        let schema = &self.schema;
        let labelled: Vec<(&str, String)> = schema
            .fields()
            .iter()
            .filter(|field| !schema.validators_for(field).is_empty())
            .map(|field| (field.as_str(), self.label_for(field)))
            .collect();

        let pending = labelled.iter().flat_map(|(field, label)| {
            let candidate = Candidate {
                value: Candidate::value_or_null(self.store.get(field)),
                label: label.as_str(),
                field: *field,
                model: Some(self),
                context,
            };
            schema.validators_for(field).iter().map(move |validator| {
                validator
                    .evaluate(candidate)
                    .map(move |verdict| verdict.map(|verdict| (candidate.field, verdict)))
            })
        });

        let verdicts = futures::future::try_join_all(pending).await?;
        Ok(verdicts
            .into_iter()
            .filter_map(|(field, verdict)| match verdict {
                Verdict::Valid => None,
                Verdict::Invalid(message) => Some((field.to_string(), message)),
            })
            .collect())
    }

    fn finish_validation(&mut self, failures: Vec<(String, String)>) {
        for (field, message) in failures {
            self.errors.add(field, message);
        }
        tracing::debug!(
            model = %self.name(),
            errors = self.errors.count(),
            "validation finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::define_model;
    use crate::validators;
    use pretty_assertions::assert_eq;

    fn contact() -> FormSchema {
        define_model("contact")
            .fields(["name", "email_address"])
            .label("name", "Your Name")
            .default_value("name", "anonymous")
            .validators("email_address", [validators::required(), validators::email()])
            .build()
            .unwrap()
    }

    #[test]
    fn test_defaults_then_attributes() {
        let schema = contact();
        assert_eq!(schema.create().get("name"), Some(&Value::from("anonymous")));

        let model = schema.create_with([("name", "Ross")], SetOptions::default());
        assert_eq!(model.get("name"), Some(&Value::from("Ross")));
    }

    #[test]
    fn test_labels_and_identifiers() {
        let model = contact().create();
        assert_eq!(model.get_label_text("name").unwrap(), "Your Name");
        assert_eq!(model.get_label_text("email_address").unwrap(), "Email Address");
        assert_eq!(model.get_field_identifier("name").unwrap(), "contact_name");
        assert!(model.is_required("email_address").unwrap());
        assert!(!model.is_required("name").unwrap());
    }

    #[test]
    fn test_unknown_field_accessors() {
        let model = contact().create();
        assert!(model.get("nope").is_none());
        assert!(matches!(model.get_errors("nope"), Err(FormError::UnknownField { .. })));
        assert!(model.get_label_text("nope").is_err());
        assert!(model.is_required("nope").is_err());
        assert!(model.has_file("nope").is_err());
    }

    #[test]
    fn test_error_map_bookkeeping() {
        let mut model = contact().create();
        model.add_error("name", "first").add_error("name", "second");
        assert!(model.has_errors());
        assert_eq!(model.get_first_error("name").unwrap(), "first");
        assert_eq!(model.get_errors("name").unwrap().len(), 2);
        assert_eq!(model.get_first_error("email_address").unwrap(), "");
        model.clear_errors();
        assert!(!model.has_errors());
    }

    #[test]
    fn test_validate_sync_clears_previous_errors() {
        let mut model = contact().create();
        model.add_error("name", "stale");
        assert!(!model.validate_sync().unwrap());
        assert!(!model.field_has_errors("name").unwrap());
        assert_eq!(
            model.get_first_error("email_address").unwrap(),
            "Email Address is a required field."
        );

        model.set("email_address", "a@b.com");
        assert!(model.validate_sync().unwrap());
        assert!(!model.has_errors());
    }

    #[test]
    fn test_change_event_fires_only_on_real_change() {
        let mut model = contact().create();
        model.on(lifecycle::CHANGE, |m: &mut FormModel, _: &mut EventArgs| {
            let count = m.get("changes").and_then(Value::as_number).unwrap_or(0.0);
            m.set_with("changes", count + 1.0, SetOptions::silent());
            Outcome::done()
        });

        model.set("name", "Ross");
        model.set("name", "Ross");
        model.set_with("name", "Other", SetOptions::silent());
        assert_eq!(model.get("changes"), Some(&Value::from(1.0)));
    }

    #[test]
    fn test_error_map_serializes_as_object() {
        let mut errors = ErrorMap::new();
        errors.add("b", "two");
        errors.add("a", "one");
        assert_eq!(
            serde_json::to_value(&errors).unwrap(),
            serde_json::json!({"a": ["one"], "b": ["two"]})
        );
        assert_eq!(errors.count(), 2);
    }
}
