// File: src/validators/field.rs
// Purpose: Validators that compare a field with another field of the same model

use crate::error::FormError;
use crate::template::MessageParams;
use crate::validator::{reject, Candidate, Validator, Verdict};
use crate::value::{Value, NULL};

/// Value must equal the value of `other` on the same model.
///
/// Unlike most validators this one does not skip empty values: an empty
/// confirmation next to a filled-in original is a mismatch. Running it
/// without a model, or naming an undeclared field, is an error.
pub fn match_property(other: impl Into<String>) -> Validator {
    let other = other.into();
    Validator::from_rule("match_property", move |candidate, custom| {
        let Some(model) = candidate.model else {
            return Err(without_model(candidate));
        };
        let other_label = model.get_label_text(&other)?;
        let other_value = model.get(&other).unwrap_or(&NULL);

        if same_value(candidate.value, other_value) {
            Ok(Verdict::Valid)
        } else {
            Ok(reject(
                candidate,
                custom,
                "The value of {{label}} must be the same as {{otherLabel}}.",
                MessageParams::default().with("otherLabel", other_label),
            ))
        }
    })
}

fn without_model(candidate: &Candidate<'_>) -> FormError {
    FormError::NotInvocable {
        validator: "match_property".to_string(),
        field: candidate.field.to_string(),
        model: String::new(),
        reason: "comparing fields needs a model",
    }
}

// Null and missing compare equal to each other only
fn same_value(a: &Value, b: &Value) -> bool {
    a == b || (!a.is_null() && !b.is_null() && a.to_string() == b.to_string())
}
