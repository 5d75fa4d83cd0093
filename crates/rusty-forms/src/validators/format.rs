// File: src/validators/format.rs
// Purpose: URL, IP address and date validators

use super::text_rule;
use crate::template::MessageParams;
use crate::validator::{CallShape, Validator};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use url::{Host, Url};

/// Knobs for [`url_with`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlOptions {
    /// Accepted schemes
    pub protocols: Vec<String>,
    /// Reject `example.com`, accept only `http://example.com`
    pub require_protocol: bool,
    /// Host names need a dotted top-level domain
    pub require_tld: bool,
}

impl Default for UrlOptions {
    fn default() -> Self {
        Self {
            protocols: vec!["http".into(), "https".into(), "ftp".into()],
            require_protocol: false,
            require_tld: true,
        }
    }
}

/// http, https or ftp URL; the scheme may be omitted
pub fn url() -> Validator {
    url_with(CallShape::Plain)
}

pub fn url_with(shape: CallShape<UrlOptions>) -> Validator {
    let (options, message) = shape.into_parts();
    let options = options.unwrap_or_default();
    text_rule(
        "url",
        "{{label}} must be a valid URL.",
        MessageParams::default(),
        move |text| is_url(text, &options),
    )
    .with_optional_message(message)
}

fn is_url(text: &str, options: &UrlOptions) -> bool {
    if text.chars().any(char::is_whitespace) {
        return false;
    }

    let parsed = if text.contains("://") {
        Url::parse(text)
    } else if options.require_protocol {
        return false;
    } else {
        Url::parse(&format!("http://{text}"))
    };
    let Ok(parsed) = parsed else {
        return false;
    };

    if !options.protocols.iter().any(|p| p == parsed.scheme()) {
        return false;
    }

    match parsed.host() {
        Some(Host::Domain(domain)) => !options.require_tld || has_tld(domain),
        Some(Host::Ipv4(_)) | Some(Host::Ipv6(_)) => true,
        None => false,
    }
}

fn has_tld(domain: &str) -> bool {
    match domain.trim_end_matches('.').rsplit_once('.') {
        Some((rest, tld)) => {
            !rest.is_empty() && tld.len() >= 2 && tld.chars().all(|c| c.is_alphabetic())
        }
        None => false,
    }
}

/// IP protocol version accepted by [`ip_address_with`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpVersion {
    V4,
    V6,
}

impl IpVersion {
    fn number(&self) -> u8 {
        match self {
            IpVersion::V4 => 4,
            IpVersion::V6 => 6,
        }
    }
}

/// IPv4 or IPv6 address
pub fn ip_address() -> Validator {
    ip_address_with(CallShape::Plain)
}

pub fn ip_address_with(shape: CallShape<IpVersion>) -> Validator {
    let (version, message) = shape.into_parts();
    let validator = match version {
        Some(version) => text_rule(
            "ip_address",
            "{{label}} must be a version {{version}} IP address.",
            MessageParams::default().with("version", version.number()),
            move |text| match version {
                IpVersion::V4 => text.parse::<Ipv4Addr>().is_ok(),
                IpVersion::V6 => text.parse::<Ipv6Addr>().is_ok(),
            },
        ),
        None => text_rule(
            "ip_address",
            "{{label}} must be a version 4 or 6 IP address.",
            MessageParams::default(),
            |text| text.parse::<IpAddr>().is_ok(),
        ),
    };
    validator.with_optional_message(message)
}

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d %B %Y",
    "%B %d, %Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Anything that reads as a calendar date or timestamp
pub fn date() -> Validator {
    text_rule(
        "date",
        "{{label}} must be a valid date.",
        MessageParams::default(),
        |text| is_date(text.trim()),
    )
}

fn is_date(text: &str) -> bool {
    DateTime::parse_from_rfc3339(text).is_ok()
        || DateTime::parse_from_rfc2822(text).is_ok()
        || DATETIME_FORMATS
            .iter()
            .any(|f| NaiveDateTime::parse_from_str(text, f).is_ok())
        || DATE_FORMATS
            .iter()
            .any(|f| NaiveDate::parse_from_str(text, f).is_ok())
}

/// Date matching a strftime-style `format` exactly, e.g. `%d/%m/%Y`
pub fn date_format(format: impl Into<String>) -> Validator {
    let format = format.into();
    text_rule(
        "date_format",
        "{{label}} must be a valid date in the format {{dateFormat}}.",
        MessageParams::default().with("dateFormat", &format),
        move |text| {
            NaiveDateTime::parse_from_str(text, &format).is_ok()
                || NaiveDate::parse_from_str(text, &format).is_ok()
                || NaiveTime::parse_from_str(text, &format).is_ok()
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validator::{Candidate, Verdict};
    use crate::value::Value;
    use rstest::rstest;

    fn run(validator: &Validator, value: &str) -> Verdict {
        let value = Value::from(value);
        validator.check(&Candidate::new(&value, "Website")).unwrap()
    }

    #[rstest]
    #[case("http://example.com", true)]
    #[case("https://sub.example.co.uk/path?q=1", true)]
    #[case("example.com", true)]
    #[case("ftp://files.example.com", true)]
    #[case("javascript://alert(1)", false)]
    #[case("http://localhost", false)]
    #[case("http://127.0.0.1:8080", true)]
    #[case("not a url", false)]
    #[case("gopher://example.com", false)]
    fn test_url_defaults(#[case] input: &str, #[case] valid: bool) {
        assert_eq!(run(&url(), input).is_valid(), valid, "{input}");
    }

    #[test]
    fn test_url_options_and_message() {
        let strict = url_with(CallShape::Options(UrlOptions {
            require_protocol: true,
            ..UrlOptions::default()
        }));
        assert!(!run(&strict, "example.com").is_valid());

        let local = url_with(CallShape::OptionsAndMessage(
            UrlOptions {
                require_tld: false,
                ..UrlOptions::default()
            },
            "{{label}} is not a link".into(),
        ));
        assert!(run(&local, "http://localhost").is_valid());
        assert_eq!(run(&local, "http://").message(), Some("Website is not a link"));
        assert_eq!(run(&url(), "nope nope").message(), Some("Website must be a valid URL."));
    }

    #[test]
    fn test_ip_address_versions() {
        assert!(run(&ip_address(), "192.168.0.1").is_valid());
        assert!(run(&ip_address(), "::1").is_valid());
        assert_eq!(
            run(&ip_address(), "300.1.1.1").message(),
            Some("Website must be a version 4 or 6 IP address.")
        );

        let v4 = ip_address_with(CallShape::Options(IpVersion::V4));
        assert_eq!(
            run(&v4, "::1").message(),
            Some("Website must be a version 4 IP address.")
        );
        let v6 = ip_address_with(CallShape::Options(IpVersion::V6));
        assert!(run(&v6, "fe80::1").is_valid());
    }

    #[rstest]
    #[case("2024-02-29", true)]
    #[case("2023-02-29", false)]
    #[case("2024-05-01T10:30:00Z", true)]
    #[case("05/01/2024", true)]
    #[case("1 May 2024", true)]
    #[case("yesterday", false)]
    fn test_date(#[case] input: &str, #[case] valid: bool) {
        assert_eq!(run(&date(), input).is_valid(), valid, "{input}");
    }

    #[test]
    fn test_date_format() {
        let dmy = date_format("%d/%m/%Y");
        assert!(run(&dmy, "31/12/2024").is_valid());
        assert_eq!(
            run(&dmy, "2024-12-31").message(),
            Some("Website must be a valid date in the format %d/%m/%Y.")
        );
    }
}
