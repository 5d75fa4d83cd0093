// File: src/validators/string.rs
// Purpose: Presence, length, character-class and comparison validators

use super::{text_rule, value_rule};
use crate::error::{FormError, Result};
use crate::template::MessageParams;
use crate::validator::{reject, Validator, ValidatorKind, Verdict};
use crate::value::Value;
use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*\.[a-zA-Z]{2,}$")
        .expect("email regex")
});

static ALPHA_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z]+$").expect("alpha regex"));

static ALPHANUMERIC_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9]+$").expect("alphanumeric regex"));

/// Fails on null, empty strings and empty lists
pub fn required() -> Validator {
    Validator::from_rule("required", |candidate, custom| {
        if candidate.value.is_blank() {
            Ok(reject(
                candidate,
                custom,
                "{{label}} is a required field.",
                MessageParams::default(),
            ))
        } else {
            Ok(Verdict::Valid)
        }
    })
    .with_kind(ValidatorKind::Required)
}

pub fn email() -> Validator {
    text_rule(
        "email",
        "{{label}} must be a valid email address.",
        MessageParams::default(),
        |text| EMAIL_REGEX.is_match(text),
    )
}

pub fn min_length(min: usize) -> Validator {
    text_rule(
        "min_length",
        "{{label}} must be at least {{minLength}} characters long.",
        MessageParams::default().with("minLength", min),
        move |text| text.chars().count() >= min,
    )
}

pub fn max_length(max: usize) -> Validator {
    text_rule(
        "max_length",
        "{{label}} must be no more than {{maxLength}} characters long.",
        MessageParams::default().with("maxLength", max),
        move |text| text.chars().count() <= max,
    )
}

/// One argument to [`length`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LengthArg {
    Count(usize),
    Message(String),
}

impl From<usize> for LengthArg {
    fn from(count: usize) -> Self {
        LengthArg::Count(count)
    }
}

impl From<&str> for LengthArg {
    fn from(message: &str) -> Self {
        LengthArg::Message(message.to_string())
    }
}

impl From<String> for LengthArg {
    fn from(message: String) -> Self {
        LengthArg::Message(message)
    }
}

/// Exact or bounded length, depending on the arguments:
///
/// - `[n]` or `[n, message]`: exactly `n` characters
/// - `[min, max]` or `[min, max, message]`: between `min` and `max` inclusive
///
/// Any other shape is rejected when the validator is built.
pub fn length(args: &[LengthArg]) -> Result<Validator> {
    use LengthArg::{Count, Message};

    let (bounds, message) = match args {
        [] => {
            return Err(FormError::InvalidArguments(
                "length needs at least one argument".to_string(),
            ))
        }
        [Count(n)] => ((*n, None), None),
        [Count(n), Message(m)] => ((*n, None), Some(m.clone())),
        [Count(min), Count(max)] => ((*min, Some(*max)), None),
        [Count(min), Count(max), Message(m)] => ((*min, Some(*max)), Some(m.clone())),
        _ if args.len() > 3 => {
            return Err(FormError::InvalidArguments(format!(
                "length takes at most three arguments, got {}",
                args.len()
            )))
        }
        _ => {
            return Err(FormError::InvalidArguments(
                "length expects (count), (min, max) or either followed by a message".to_string(),
            ))
        }
    };

    let validator = match bounds {
        (exact, None) => text_rule(
            "length",
            "{{label}} must be exactly {{exactLength}} characters long.",
            MessageParams::default().with("exactLength", exact),
            move |text| text.chars().count() == exact,
        ),
        (min, Some(max)) if min > max => {
            return Err(FormError::InvalidArguments(format!(
                "length minimum {min} is greater than maximum {max}"
            )))
        }
        (min, Some(max)) => text_rule(
            "length",
            "{{label}} must be between {{minLength}} and {{maxLength}} characters long.",
            MessageParams::default()
                .with("minLength", min)
                .with("maxLength", max),
            move |text| (min..=max).contains(&text.chars().count()),
        ),
    };

    Ok(validator.with_optional_message(message))
}

/// ASCII letters only
pub fn alpha() -> Validator {
    text_rule(
        "alpha",
        "{{label}} must consist of only letters.",
        MessageParams::default(),
        |text| ALPHA_REGEX.is_match(text),
    )
}

pub fn alphanumeric() -> Validator {
    text_rule(
        "alphanumeric",
        "{{label}} must contain only letters and numbers.",
        MessageParams::default(),
        |text| ALPHANUMERIC_REGEX.is_match(text),
    )
}

/// String-wise equality with `expected`
pub fn equals(expected: impl Into<Value>) -> Validator {
    let expected = expected.into().to_string();
    text_rule(
        "equals",
        "{{label}} must equal {{equalValue}}.",
        MessageParams::default().with("equalValue", &expected),
        move |text| text == expected,
    )
}

pub fn not_equals(forbidden: impl Into<Value>) -> Validator {
    let forbidden = forbidden.into().to_string();
    text_rule(
        "not_equals",
        "{{label}} must not equal {{forbiddenValue}}.",
        MessageParams::default().with("forbiddenValue", &forbidden),
        move |text| text != forbidden,
    )
}

/// Value must be one of `allowed` (compared as text)
pub fn one_of<I, S>(allowed: I) -> Validator
where
    I: IntoIterator<Item = S>,
    S: Into<Value>,
{
    let allowed: Vec<String> = allowed.into_iter().map(|v| v.into().to_string()).collect();
    let listed = allowed.join(", ");
    text_rule(
        "one_of",
        "{{label}} must be one of: {{allowedValues}}.",
        MessageParams::default().with("allowedValues", listed),
        move |text| allowed.iter().any(|a| a == text),
    )
}

pub fn contains(needle: impl Into<String>) -> Validator {
    let needle = needle.into();
    text_rule(
        "contains",
        "{{label}} must contain the characters \"{{containsValue}}\".",
        MessageParams::default().with("containsValue", &needle),
        move |text| text.contains(needle.as_str()),
    )
}

pub fn matches(pattern: Regex) -> Validator {
    let shown = format!("/{}/", pattern.as_str());
    text_rule(
        "matches",
        "{{label}} must match the pattern {{pattern}}.",
        MessageParams::default().with("pattern", shown),
        move |text| pattern.is_match(text),
    )
}

/// Card number passing the Luhn checksum; spaces and dashes are ignored
pub fn credit_card() -> Validator {
    value_rule(
        "credit_card",
        "{{label}} must be a valid credit card.",
        MessageParams::default(),
        |value| luhn_valid(&value.as_text()),
    )
}

fn luhn_valid(text: &str) -> bool {
    let digits: Option<Vec<u32>> = text
        .chars()
        .filter(|c| *c != ' ' && *c != '-')
        .map(|c| c.to_digit(10))
        .collect();
    let Some(digits) = digits else {
        return false;
    };
    if !(13..=19).contains(&digits.len()) {
        return false;
    }

    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                d
            }
        })
        .sum();
    sum % 10 == 0
}
