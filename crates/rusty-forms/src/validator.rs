// File: src/validator.rs
// Purpose: The validator contract shared by built-in and user-supplied checks

use crate::error::{FormError, Result};
use crate::model::{Context, FormModel};
use crate::template::{render, MessageParams};
use crate::value::{Value, NULL};
use futures::future::BoxFuture;
use futures::FutureExt;
use once_cell::sync::Lazy;
use std::fmt;
use std::sync::Arc;

static EMPTY_CONTEXT: Lazy<Context> = Lazy::new(Context::new);

/// Outcome of one check: the success marker or a rendered error message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Valid,
    Invalid(String),
}

impl Verdict {
    pub fn is_valid(&self) -> bool {
        matches!(self, Verdict::Valid)
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Verdict::Valid => None,
            Verdict::Invalid(msg) => Some(msg),
        }
    }
}

/// Everything a validator gets to look at
#[derive(Clone, Copy)]
pub struct Candidate<'a> {
    pub value: &'a Value,
    pub label: &'a str,
    pub field: &'a str,
    pub model: Option<&'a FormModel>,
    pub context: &'a Context,
}

impl<'a> Candidate<'a> {
    /// A value checked outside any model
    pub fn new(value: &'a Value, label: &'a str) -> Self {
        Self {
            value,
            label,
            field: "",
            model: None,
            context: &EMPTY_CONTEXT,
        }
    }

    pub fn with_model(mut self, field: &'a str, model: &'a FormModel) -> Self {
        self.field = field;
        self.model = Some(model);
        self
    }

    pub fn with_context(mut self, context: &'a Context) -> Self {
        self.context = context;
        self
    }

    /// The value, or `Null` when the caller has none
    pub fn value_or_null(value: Option<&'a Value>) -> &'a Value {
        value.unwrap_or(&NULL)
    }

    pub(crate) fn model_name(&self) -> &str {
        self.model.map(FormModel::name).unwrap_or("")
    }
}

/// Tag used to answer "is this field required?" without inspecting closures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidatorKind {
    Required,
    RequiredFile,
    Other,
}

/// Call shape for validator families that take options and/or a message
#[derive(Debug, Clone, PartialEq)]
pub enum CallShape<O> {
    Plain,
    Message(String),
    Options(O),
    OptionsAndMessage(O, String),
}

impl<O> CallShape<O> {
    /// Split into `(options, message)`
    pub fn into_parts(self) -> (Option<O>, Option<String>) {
        match self {
            CallShape::Plain => (None, None),
            CallShape::Message(m) => (None, Some(m)),
            CallShape::Options(o) => (Some(o), None),
            CallShape::OptionsAndMessage(o, m) => (Some(o), Some(m)),
        }
    }
}

impl<O> Default for CallShape<O> {
    fn default() -> Self {
        CallShape::Plain
    }
}

impl<O> From<&str> for CallShape<O> {
    fn from(message: &str) -> Self {
        CallShape::Message(message.to_string())
    }
}

impl<O> From<String> for CallShape<O> {
    fn from(message: String) -> Self {
        CallShape::Message(message)
    }
}

type SyncRule = dyn Fn(&Candidate<'_>, Option<&str>) -> Result<Verdict> + Send + Sync;
type AsyncRule =
    dyn for<'a> Fn(Candidate<'a>, Option<&'a str>) -> BoxFuture<'a, Result<Verdict>> + Send + Sync;

#[derive(Clone)]
enum Rule {
    Sync(Arc<SyncRule>),
    Async(Arc<AsyncRule>),
}

/// One pass/fail check for one field.
///
/// Synchronous validators run in both pipelines; deferred ones only in the
/// asynchronous pipeline. A custom message template, when set, replaces the
/// default message of a failing check.
#[derive(Clone)]
pub struct Validator {
    name: &'static str,
    kind: ValidatorKind,
    message: Option<Arc<str>>,
    rule: Rule,
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("message", &self.message)
            .field("deferred", &self.is_deferred())
            .finish()
    }
}

impl Validator {
    /// A user-supplied synchronous validator
    pub fn new<F>(name: &'static str, check: F) -> Self
    where
        F: Fn(&Candidate<'_>) -> Result<Verdict> + Send + Sync + 'static,
    {
        Self::from_rule(name, move |candidate, custom| {
            let verdict = check(candidate)?;
            Ok(override_message(verdict, candidate, custom))
        })
    }

    /// A user-supplied asynchronous validator
    pub fn deferred<F>(name: &'static str, check: F) -> Self
    where
        F: for<'a> Fn(Candidate<'a>) -> BoxFuture<'a, Result<Verdict>> + Send + Sync + 'static,
    {
        let check = Arc::new(check);
        Self::from_async_rule(name, move |candidate, custom| {
            let check = Arc::clone(&check);
            async move {
                let verdict = check(candidate).await?;
                Ok(override_message(verdict, &candidate, custom))
            }
            .boxed()
        })
    }

    /// Built-in synchronous rule; the rule receives the custom template
    pub(crate) fn from_rule<F>(name: &'static str, rule: F) -> Self
    where
        F: Fn(&Candidate<'_>, Option<&str>) -> Result<Verdict> + Send + Sync + 'static,
    {
        Self {
            name,
            kind: ValidatorKind::Other,
            message: None,
            rule: Rule::Sync(Arc::new(rule)),
        }
    }

    pub(crate) fn from_async_rule<F>(name: &'static str, rule: F) -> Self
    where
        F: for<'a> Fn(Candidate<'a>, Option<&'a str>) -> BoxFuture<'a, Result<Verdict>>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name,
            kind: ValidatorKind::Other,
            message: None,
            rule: Rule::Async(Arc::new(rule)),
        }
    }

    pub(crate) fn with_kind(mut self, kind: ValidatorKind) -> Self {
        self.kind = kind;
        self
    }

    /// Mark a custom validator as making its field required
    pub fn required_kind(self) -> Self {
        self.with_kind(ValidatorKind::Required)
    }

    /// Replace the default failure message with a `{{placeholder}}` template
    pub fn with_message(mut self, template: impl Into<String>) -> Self {
        self.message = Some(Arc::from(template.into()));
        self
    }

    pub(crate) fn with_optional_message(self, template: Option<String>) -> Self {
        match template {
            Some(template) => self.with_message(template),
            None => self,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> ValidatorKind {
        self.kind
    }

    pub fn is_required(&self) -> bool {
        matches!(self.kind, ValidatorKind::Required | ValidatorKind::RequiredFile)
    }

    /// True if this validator can only run in the asynchronous pipeline
    pub fn is_deferred(&self) -> bool {
        matches!(self.rule, Rule::Async(_))
    }

    /// Run synchronously. Deferred validators fail with `NotInvocable`.
    pub fn check(&self, candidate: &Candidate<'_>) -> Result<Verdict> {
        match &self.rule {
            Rule::Sync(rule) => rule(candidate, self.message.as_deref()),
            Rule::Async(_) => Err(self.not_invocable(
                candidate,
                "deferred validators require the asynchronous pipeline",
            )),
        }
    }

    /// Run in an asynchronous context; works for both kinds
    pub fn evaluate<'a>(&'a self, candidate: Candidate<'a>) -> BoxFuture<'a, Result<Verdict>> {
        match &self.rule {
            Rule::Sync(rule) => {
                let verdict = rule(&candidate, self.message.as_deref());
                futures::future::ready(verdict).boxed()
            }
            Rule::Async(rule) => rule(candidate, self.message.as_deref()),
        }
    }

    pub(crate) fn not_invocable(&self, candidate: &Candidate<'_>, reason: &'static str) -> FormError {
        FormError::NotInvocable {
            validator: self.name.to_string(),
            field: candidate.field.to_string(),
            model: candidate.model_name().to_string(),
            reason,
        }
    }
}

/// Build a failing verdict: the custom template (with context) if given,
/// otherwise the default template with the validator's own params.
pub(crate) fn reject(
    candidate: &Candidate<'_>,
    custom: Option<&str>,
    default_template: &str,
    params: MessageParams,
) -> Verdict {
    let params = params.with("label", candidate.label);
    let message = match custom {
        Some(template) => render(template, &params.with_context(candidate.context)),
        None => render(default_template, &params),
    };
    Verdict::Invalid(message)
}

fn override_message(verdict: Verdict, candidate: &Candidate<'_>, custom: Option<&str>) -> Verdict {
    match (verdict, custom) {
        (Verdict::Invalid(_), Some(template)) => {
            let params = MessageParams::labelled(candidate.label).with_context(candidate.context);
            Verdict::Invalid(render(template, &params))
        }
        (verdict, _) => verdict,
    }
}
