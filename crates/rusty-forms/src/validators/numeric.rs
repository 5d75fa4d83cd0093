// File: src/validators/numeric.rs
// Purpose: Numeric format and bound validators

use super::{text_rule, value_rule};
use crate::error::{FormError, Result};
use crate::template::MessageParams;
use crate::validator::Validator;
use crate::value::Value;
use once_cell::sync::Lazy;
use regex::Regex;

static NUMERIC_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[-+]?[0-9]+$").expect("numeric regex"));

static INT_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[-+]?(?:0|[1-9][0-9]*)$").expect("int regex"));

static FLOAT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[-+]?(?:[0-9]+\.?[0-9]*|\.[0-9]+)(?:[eE][-+]?[0-9]+)?$").expect("float regex")
});

/// Digits with an optional sign
pub fn numeric() -> Validator {
    text_rule(
        "numeric",
        "{{label}} must be a numeric value.",
        MessageParams::default(),
        |text| NUMERIC_REGEX.is_match(text),
    )
}

/// Integer without leading zeros
pub fn int() -> Validator {
    text_rule(
        "int",
        "{{label}} must be an integer.",
        MessageParams::default(),
        |text| INT_REGEX.is_match(text),
    )
}

pub fn float() -> Validator {
    text_rule(
        "float",
        "{{label}} must be a decimal number.",
        MessageParams::default(),
        |text| FLOAT_REGEX.is_match(text),
    )
}

/// Numeric value no smaller than `bound`; non-numeric values fail
pub fn min(bound: f64) -> Validator {
    value_rule(
        "min",
        "{{label}} must be at least {{min}}.",
        MessageParams::default().with("min", Value::from(bound)),
        move |value| value.as_number().is_some_and(|n| n >= bound),
    )
}

/// Numeric value no larger than `bound`; non-numeric values fail
pub fn max(bound: f64) -> Validator {
    value_rule(
        "max",
        "{{label}} must be no more than {{max}}.",
        MessageParams::default().with("max", Value::from(bound)),
        move |value| value.as_number().is_some_and(|n| n <= bound),
    )
}

/// Inclusive numeric range
pub fn range(low: f64, high: f64) -> Result<Validator> {
    if low > high {
        return Err(FormError::InvalidArguments(format!(
            "range lower bound {low} is greater than upper bound {high}"
        )));
    }
    Ok(value_rule(
        "range",
        "{{label}} must be between {{min}} and {{max}}.",
        MessageParams::default()
            .with("min", Value::from(low))
            .with("max", Value::from(high)),
        move |value| value.as_number().is_some_and(|n| (low..=high).contains(&n)),
    ))
}
