// File: src/error.rs
// Purpose: Error taxonomy for schema, validator and pipeline failures

use thiserror::Error;

/// Result alias used across the crate
pub type Result<T, E = FormError> = std::result::Result<T, E>;

/// Errors raised by form models, schemas and validators.
///
/// Validation failures are *not* errors: a failing validator yields
/// [`Verdict::Invalid`](crate::Verdict::Invalid) and the message lands in the
/// model's error map. Everything here is either a programming mistake in the
/// schema (configuration) or a failure of something outside the crate
/// (environment).
#[derive(Debug, Error)]
pub enum FormError {
    /// The schema was built without a model name
    #[error("You must specify a name for this form model")]
    MissingName,

    /// A field was referenced that the model does not declare
    #[error("Field '{field}' Not Found In Model '{model}'")]
    UnknownField { field: String, model: String },

    /// The same field was declared twice
    #[error("Field '{field}' is declared more than once in model '{model}'")]
    DuplicateField { field: String, model: String },

    /// A validator cannot be run in the current context
    #[error("Validator `{validator}` for `{field}` on `{model}` cannot be invoked here: {reason}")]
    NotInvocable {
        validator: String,
        field: String,
        model: String,
        reason: &'static str,
    },

    /// A validator factory was called with an unusable argument list
    #[error("{0}")]
    InvalidArguments(String),

    /// A human size string could not be parsed
    #[error("Unable to parse the file size '{0}' - use either a number, or JEDEC denomination under 1TB, e.g. 2M, 120kB")]
    InvalidSize(String),

    /// Failure of an external collaborator (I/O, content sniffing, handler)
    #[error(transparent)]
    Environment(#[from] anyhow::Error),
}

impl FormError {
    pub(crate) fn unknown_field(field: &str, model: &str) -> Self {
        Self::UnknownField {
            field: field.to_string(),
            model: model.to_string(),
        }
    }

    /// True for programmer mistakes that retrying cannot fix
    pub fn is_configuration(&self) -> bool {
        !matches!(self, Self::Environment(_))
    }
}

impl From<std::io::Error> for FormError {
    fn from(err: std::io::Error) -> Self {
        Self::Environment(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_field_message_names_field_and_model() {
        let err = FormError::unknown_field("nope", "loginForm");
        assert_eq!(err.to_string(), "Field 'nope' Not Found In Model 'loginForm'");
        assert!(err.is_configuration());
    }

    #[test]
    fn test_environment_errors_are_not_configuration() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = FormError::from(io);
        assert!(!err.is_configuration());
        assert_eq!(err.to_string(), "gone");
    }
}
