// File: src/validators/mod.rs
// Purpose: Built-in validator catalog

//! Built-in validators.
//!
//! Every factory returns a [`Validator`](crate::Validator); chain
//! [`with_message`](crate::Validator::with_message) to replace the default
//! message. Apart from `required`, `match_property` and the file `required`,
//! all of them accept empty values: absence is the required check's business.

pub mod field;
pub mod file;
pub mod format;
pub mod numeric;
pub mod string;

pub use field::match_property;
pub use file::{FileValidators, has_file, humanize_bytes, parse_size};
pub use format::{date, date_format, ip_address, ip_address_with, url, url_with, IpVersion, UrlOptions};
pub use numeric::{float, int, max, min, numeric, range};
pub use string::{
    alpha, alphanumeric, contains, credit_card, email, equals, length, matches, max_length,
    min_length, not_equals, one_of, required, LengthArg,
};

use crate::template::MessageParams;
use crate::validator::{reject, Validator, Verdict};
use crate::value::Value;

/// A rule over the text of a non-empty value.
///
/// Empty values pass; otherwise `test` decides and a failure renders
/// `template` with `params`.
pub(crate) fn text_rule<T>(
    name: &'static str,
    template: &'static str,
    params: MessageParams,
    test: T,
) -> Validator
where
    T: Fn(&str) -> bool + Send + Sync + 'static,
{
    value_rule(name, template, params, move |value| test(&value.as_text()))
}

/// Like [`text_rule`], but the test sees the raw value
pub(crate) fn value_rule<T>(
    name: &'static str,
    template: &'static str,
    params: MessageParams,
    test: T,
) -> Validator
where
    T: Fn(&Value) -> bool + Send + Sync + 'static,
{
    Validator::from_rule(name, move |candidate, custom| {
        if candidate.value.is_blank() || test(candidate.value) {
            Ok(Verdict::Valid)
        } else {
            Ok(reject(candidate, custom, template, params.clone()))
        }
    })
}
