// File: src/validators/file.rs
// Purpose: Upload validators: presence, size bounds, MIME whitelist, content sniffing

use crate::config::{Config, FileField, FileFieldMappings};
use crate::error::{FormError, Result};
use crate::sniff::{ContentSniffer, SignatureSniffer};
use crate::template::MessageParams;
use crate::validator::{reject, Candidate, Validator, ValidatorKind, Verdict};
use crate::value::Value;
use anyhow::anyhow;
use futures::FutureExt;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

static SIZE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+(?:\.\d+)?)\s*([A-Za-z]+)$").expect("size regex"));

static WILDCARD_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([^/]+)/\*$").expect("wildcard regex"));

const KB: f64 = 1024.0;
const MB: f64 = KB * 1024.0;
const GB: f64 = MB * 1024.0;

/// Parse a human size (`"50kb"`, `"2M"`, `"1024"`) into bytes.
///
/// Units follow JEDEC: k/K/kb/KB/kB are 1024 bytes, m/M/MB are 1024²,
/// g/G/GB are 1024³. A bare number is bytes.
pub fn parse_size(size: &str) -> Result<u64> {
    let trimmed = size.trim();
    if let Ok(bytes) = trimmed.parse::<u64>() {
        return Ok(bytes);
    }

    let invalid = || FormError::InvalidSize(size.to_string());
    let caps = SIZE_REGEX.captures(trimmed).ok_or_else(invalid)?;
    let amount: f64 = caps[1].parse().map_err(|_| invalid())?;
    let unit = match &caps[2] {
        "k" | "K" | "kb" | "KB" | "kB" | "Kb" => KB,
        "m" | "M" | "mb" | "MB" | "Mb" => MB,
        "g" | "G" | "gb" | "GB" | "Gb" => GB,
        "b" | "B" => 1.0,
        _ => return Err(invalid()),
    };
    Ok((amount * unit).round() as u64)
}

/// Render a byte count with the largest JEDEC unit that keeps it below 1024:
/// `51200` → `"50kB"`, `1048576` → `"1MB"`.
pub fn humanize_bytes(bytes: u64) -> String {
    let bytes = bytes as f64;
    let (amount, unit) = if bytes < MB {
        (bytes / KB, "kB")
    } else if bytes < GB {
        (bytes / MB, "MB")
    } else {
        (bytes / GB, "GB")
    };
    let rounded = (amount * 100.0).round() / 100.0;
    format!("{}{}", Value::from(rounded), unit)
}

/// True unless `value` is empty or an upload descriptor with a zero size or
/// an empty file name
pub fn has_file(value: &Value, mappings: &FileFieldMappings) -> bool {
    if value.is_blank() {
        return false;
    }
    let size_is_zero = mappings
        .lookup(value, FileField::Size)
        .and_then(Value::as_number)
        .is_some_and(|size| size == 0.0);
    let empty_name = [FileField::Name, FileField::OriginalFilename]
        .into_iter()
        .any(|field| mappings.lookup(value, field).and_then(Value::as_str) == Some(""));
    !(size_is_zero || empty_name)
}

/// Factory for upload validators sharing one attribute mapping and sniffer.
///
/// ```rust
/// use rusty_forms::validators::FileValidators;
///
/// let files = FileValidators::default();
/// let avatar = [files.required(), files.max_size("2M").unwrap(), files.mime_types(["image/*"])];
/// assert_eq!(avatar.len(), 3);
/// ```
#[derive(Clone)]
pub struct FileValidators {
    mappings: Arc<FileFieldMappings>,
    sniffer: Arc<dyn ContentSniffer>,
    sniff_timeout: Option<Duration>,
}

impl Default for FileValidators {
    fn default() -> Self {
        Self::new(FileFieldMappings::default())
    }
}

impl FileValidators {
    pub fn new(mappings: FileFieldMappings) -> Self {
        Self {
            mappings: Arc::new(mappings),
            sniffer: Arc::new(SignatureSniffer::new()),
            sniff_timeout: None,
        }
    }

    /// Mappings and sniff timeout taken from a loaded [`Config`]
    pub fn from_config(config: &Config) -> Self {
        Self {
            sniff_timeout: config.validation.sniff_timeout(),
            ..Self::new(config.file_mappings())
        }
    }

    /// Swap the content detection backend
    pub fn with_sniffer(mut self, sniffer: impl ContentSniffer + 'static) -> Self {
        self.sniffer = Arc::new(sniffer);
        self
    }

    pub fn with_sniff_timeout(mut self, timeout: Duration) -> Self {
        self.sniff_timeout = Some(timeout);
        self
    }

    pub fn mappings(&self) -> &FileFieldMappings {
        &self.mappings
    }

    /// Fails unless the field holds a non-empty upload
    pub fn required(&self) -> Validator {
        let mappings = Arc::clone(&self.mappings);
        Validator::from_rule("file_required", move |candidate, custom| {
            if has_file(candidate.value, &mappings) {
                Ok(Verdict::Valid)
            } else {
                Ok(reject(
                    candidate,
                    custom,
                    "{{label}} is a required field.",
                    MessageParams::default(),
                ))
            }
        })
        .with_kind(ValidatorKind::RequiredFile)
    }

    /// Upload must be at least `size` bytes. Zero-sized uploads pass.
    pub fn min_size(&self, size: &str) -> Result<Validator> {
        let bound = parse_size(size)?;
        Ok(self.size_rule(
            "min_size",
            "{{label}} must be at least {{size}}.",
            bound,
            move |bytes| bytes >= bound,
        ))
    }

    /// Upload must not exceed `size` bytes. Zero-sized uploads pass.
    pub fn max_size(&self, size: &str) -> Result<Validator> {
        let bound = parse_size(size)?;
        Ok(self.size_rule(
            "max_size",
            "{{label}} must be smaller than {{size}}.",
            bound,
            move |bytes| bytes <= bound,
        ))
    }

    fn size_rule<T>(&self, name: &'static str, template: &'static str, bound: u64, test: T) -> Validator
    where
        T: Fn(u64) -> bool + Send + Sync + 'static,
    {
        let mappings = Arc::clone(&self.mappings);
        let params = MessageParams::default().with("size", humanize_bytes(bound));
        Validator::from_rule(name, move |candidate, custom| {
            if candidate.value.is_blank() {
                return Ok(Verdict::Valid);
            }
            let bytes = mappings
                .lookup(candidate.value, FileField::Size)
                .and_then(Value::as_number)
                .map_or(0, |n| n.max(0.0) as u64);
            if bytes == 0 || test(bytes) {
                Ok(Verdict::Valid)
            } else {
                Ok(reject(candidate, custom, template, params.clone()))
            }
        })
    }

    /// Declared type must be in `allowed`; entries like `image/*` match a
    /// whole family
    pub fn mime_types<I, S>(&self, allowed: I) -> Validator
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let allowed: Vec<String> = allowed.into_iter().map(Into::into).collect();
        let listed = allowed.join(", ");
        let (families, exact): (Vec<String>, Vec<String>) = allowed
            .into_iter()
            .partition(|mime| WILDCARD_REGEX.is_match(mime));
        let families: Vec<String> = families
            .iter()
            .filter_map(|mime| WILDCARD_REGEX.captures(mime).map(|c| c[1].to_lowercase()))
            .collect();

        let mappings = Arc::clone(&self.mappings);
        let params = MessageParams::default().with("mimeTypes", listed);
        Validator::from_rule("mime_types", move |candidate, custom| {
            if !has_file(candidate.value, &mappings) {
                return Ok(Verdict::Valid);
            }
            let declared = mappings
                .lookup(candidate.value, FileField::Type)
                .map(|v| v.as_text().to_lowercase())
                .unwrap_or_default();
            // Wildcards only apply to a complete `type/subtype`
            let family = declared
                .split_once('/')
                .filter(|(family, subtype)| !family.is_empty() && !subtype.is_empty())
                .map(|(family, _)| family);

            let accepted = exact.iter().any(|mime| mime.eq_ignore_ascii_case(&declared))
                || family.is_some_and(|family| families.iter().any(|f| f == family));
            if accepted {
                Ok(Verdict::Valid)
            } else {
                Ok(reject(
                    candidate,
                    custom,
                    "{{label}} must be one of the following file types: {{mimeTypes}}.",
                    params.clone(),
                ))
            }
        })
    }

    /// Declared type must agree with what the file contents look like.
    ///
    /// Reads the upload from disk, so it only runs in the asynchronous
    /// pipeline. Sniffing failures abort the validation run.
    pub fn enforce_mime_match(&self) -> Validator {
        let mappings = Arc::clone(&self.mappings);
        let sniffer = Arc::clone(&self.sniffer);
        let timeout = self.sniff_timeout;

        Validator::from_async_rule("enforce_mime_match", move |candidate, custom| {
            let mappings = Arc::clone(&mappings);
            let sniffer = Arc::clone(&sniffer);
            async move { mime_match(candidate, custom, &mappings, sniffer.as_ref(), timeout).await }.boxed()
        })
    }
}

async fn mime_match(
    candidate: Candidate<'_>,
    custom: Option<&str>,
    mappings: &FileFieldMappings,
    sniffer: &dyn ContentSniffer,
    timeout: Option<Duration>,
) -> Result<Verdict> {
    if !has_file(candidate.value, mappings) {
        return Ok(Verdict::Valid);
    }
    let path = mappings
        .lookup(candidate.value, FileField::Path)
        .and_then(Value::as_str)
        .map(PathBuf::from)
        .ok_or_else(|| anyhow!("upload for '{}' has no path to sniff", candidate.field))?;
    let declared = mappings
        .lookup(candidate.value, FileField::Type)
        .map(|v| v.as_text().to_lowercase())
        .unwrap_or_default();

    let sniffing = sniffer.sniff(&path);
    let detected = match timeout {
        Some(limit) => tokio::time::timeout(limit, sniffing)
            .await
            .map_err(|_| anyhow!("sniffing {:?} timed out after {:?}", path, limit))??,
        None => sniffing.await?,
    };

    tracing::debug!(field = candidate.field, %declared, %detected, sniffer = sniffer.name(), "mime check");
    if detected.eq_ignore_ascii_case(&declared) {
        Ok(Verdict::Valid)
    } else {
        Ok(reject(
            &candidate,
            custom,
            "The MIME Type of {{label}} does not match its contents.",
            MessageParams::default(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn upload(json: serde_json::Value) -> Value {
        Value::from(json)
    }

    #[rstest]
    #[case("1024", 1024)]
    #[case("50kb", 51200)]
    #[case("50kB", 51200)]
    #[case("2M", 2 * 1024 * 1024)]
    #[case("1GB", 1024 * 1024 * 1024)]
    #[case("1.5k", 1536)]
    fn test_parse_size(#[case] input: &str, #[case] bytes: u64) {
        assert_eq!(parse_size(input).unwrap(), bytes);
    }

    #[rstest]
    #[case("")]
    #[case("lots")]
    #[case("5TB")]
    #[case("-5k")]
    fn test_parse_size_rejects(#[case] input: &str) {
        let err = parse_size(input).unwrap_err();
        assert!(matches!(err, FormError::InvalidSize(_)));
    }

    #[rstest]
    #[case(51200, "50kB")]
    #[case(512, "0.5kB")]
    #[case(1536, "1.5kB")]
    #[case(1048576, "1MB")]
    #[case(3 * 1024 * 1024 * 1024, "3GB")]
    fn test_humanize_bytes(#[case] bytes: u64, #[case] expected: &str) {
        assert_eq!(humanize_bytes(bytes), expected);
    }

    #[test]
    fn test_has_file() {
        let mappings = FileFieldMappings::default();
        assert!(!has_file(&Value::Null, &mappings));
        assert!(!has_file(&upload(json!({"name": "a.txt", "size": 0})), &mappings));
        assert!(!has_file(&upload(json!({"name": "", "size": 10})), &mappings));
        assert!(has_file(&upload(json!({"name": "a.txt", "size": 10})), &mappings));

        let multer = FileFieldMappings::multer();
        assert!(!has_file(&upload(json!({"originalname": "", "size": 10})), &multer));
    }

    #[test]
    fn test_max_size_message() {
        let files = FileValidators::default();
        let rule = files.max_size("50kb").unwrap();
        let big = upload(json!({"name": "a.png", "size": 51201}));
        assert_eq!(
            rule.check(&Candidate::new(&big, "Avatar")).unwrap().message(),
            Some("Avatar must be smaller than 50kB.")
        );

        let empty = upload(json!({"name": "a.png", "size": 0}));
        assert!(rule.check(&Candidate::new(&empty, "Avatar")).unwrap().is_valid());
        assert!(matches!(files.max_size("huge"), Err(FormError::InvalidSize(_))));
    }

    #[test]
    fn test_min_size() {
        let rule = FileValidators::default().min_size("1k").unwrap();
        let tiny = upload(json!({"name": "a.txt", "size": 10}));
        assert_eq!(
            rule.check(&Candidate::new(&tiny, "Notes")).unwrap().message(),
            Some("Notes must be at least 1kB.")
        );
    }

    #[test]
    fn test_mime_types_with_wildcards() {
        let rule = FileValidators::new(FileFieldMappings::multer()).mime_types(["image/*", "application/pdf"]);
        let check = |mime: &str| {
            let file = upload(json!({"originalname": "f", "mimetype": mime, "size": 5}));
            rule.check(&Candidate::new(&file, "Scan")).unwrap()
        };

        assert!(check("image/png").is_valid());
        assert!(check("application/pdf").is_valid());
        assert_eq!(
            check("text/plain").message(),
            Some("Scan must be one of the following file types: image/*, application/pdf.")
        );
    }

    #[rstest]
    #[case("image")]
    #[case("IMAGE")]
    #[case("image/")]
    #[case("/png")]
    #[case("")]
    fn test_wildcard_needs_full_mime_type(#[case] declared: &str) {
        let rule = FileValidators::default().mime_types(["image/*"]);
        let file = upload(json!({"name": "evil.exe", "type": declared, "size": 10}));
        assert!(!rule.check(&Candidate::new(&file, "Scan")).unwrap().is_valid());

        let png = upload(json!({"name": "ok.png", "type": "IMAGE/PNG", "size": 10}));
        assert!(rule.check(&Candidate::new(&png, "Scan")).unwrap().is_valid());
    }

    #[test]
    fn test_enforce_mime_match_is_deferred() {
        assert!(FileValidators::default().enforce_mime_match().is_deferred());
        assert!(FileValidators::default().required().is_required());
    }
}
