// File: src/config.rs
// Purpose: Configuration parsing from rusty-forms.toml and upload field mappings

use crate::value::Value;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Library configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub files: FileConfig,

    #[serde(default)]
    pub validation: ValidationConfig,
}

/// Upload descriptor conventions
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    /// Which upload library's attribute names to expect
    #[serde(default)]
    pub preset: MappingPreset,

    /// Per-attribute overrides on top of the preset (canonical → native)
    #[serde(default)]
    pub mappings: HashMap<String, String>,
}

/// Validation pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ValidationConfig {
    /// Upper bound on content sniffing in `enforce_mime_match`; unbounded if absent
    #[serde(default)]
    pub sniff_timeout_ms: Option<u64>,
}

impl ValidationConfig {
    pub fn sniff_timeout(&self) -> Option<Duration> {
        self.sniff_timeout_ms.map(Duration::from_millis)
    }
}

/// Known upload-library conventions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MappingPreset {
    #[default]
    Default,
    Multer,
    BodyParser,
}

/// Canonical attribute names of an upload descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileField {
    Size,
    Name,
    OriginalFilename,
    Type,
    Path,
}

impl FileField {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileField::Size => "size",
            FileField::Name => "name",
            FileField::OriginalFilename => "originalFilename",
            FileField::Type => "type",
            FileField::Path => "path",
        }
    }
}

/// Translation table from canonical upload attribute names to the names a
/// particular upload library uses. Unmapped attributes are read as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileFieldMappings {
    mappings: HashMap<String, String>,
}

impl FileFieldMappings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table for a known upload library
    pub fn preset(preset: MappingPreset) -> Self {
        let pairs: &[(&str, &str)] = match preset {
            MappingPreset::Multer => &[("originalFilename", "originalname"), ("type", "mimetype")],
            MappingPreset::BodyParser | MappingPreset::Default => {
                &[("originalFilename", "originalFilename"), ("type", "type")]
            }
        };
        pairs.iter().copied().collect()
    }

    pub fn multer() -> Self {
        Self::preset(MappingPreset::Multer)
    }

    /// Map a canonical attribute onto a native one
    pub fn map(mut self, canonical: FileField, native: impl Into<String>) -> Self {
        self.mappings.insert(canonical.as_str().to_string(), native.into());
        self
    }

    /// Native attribute name for `field`
    pub fn resolve(&self, field: FileField) -> &str {
        self.mappings
            .get(field.as_str())
            .map(String::as_str)
            .unwrap_or(field.as_str())
    }

    /// Read a canonical attribute from an upload descriptor
    pub fn lookup<'v>(&self, descriptor: &'v Value, field: FileField) -> Option<&'v Value> {
        descriptor.get(self.resolve(field))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FileFieldMappings {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            mappings: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

impl FileConfig {
    /// Preset table with overrides applied
    pub fn mappings(&self) -> FileFieldMappings {
        let mut table = FileFieldMappings::preset(self.preset);
        for (canonical, native) in &self.mappings {
            table.mappings.insert(canonical.clone(), native.clone());
        }
        table
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        // If file doesn't exist or is empty, return default config
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        tracing::debug!(?path, preset = ?config.files.preset, "loaded form configuration");
        Ok(config)
    }

    /// Load configuration from default path (./rusty-forms.toml)
    pub fn load_default() -> Result<Self> {
        Self::load("rusty-forms.toml")
    }

    pub fn file_mappings(&self) -> FileFieldMappings {
        self.files.mappings()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.files.preset, MappingPreset::Default);
        assert!(config.validation.sniff_timeout().is_none());
        assert_eq!(config.file_mappings().resolve(FileField::Type), "type");
        assert_eq!(config.file_mappings().resolve(FileField::Size), "size");
    }

    #[test]
    fn test_empty_config() {
        let config = toml::from_str::<Config>("").unwrap_or_default();
        assert_eq!(config.files.preset, MappingPreset::Default);
    }

    #[test]
    fn test_preset_with_overrides() {
        let toml = r#"
            [files]
            preset = "multer"

            [files.mappings]
            path = "tmpPath"

            [validation]
            sniff_timeout_ms = 250
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        let table = config.file_mappings();
        assert_eq!(table.resolve(FileField::OriginalFilename), "originalname");
        assert_eq!(table.resolve(FileField::Type), "mimetype");
        assert_eq!(table.resolve(FileField::Path), "tmpPath");
        assert_eq!(config.validation.sniff_timeout(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_load_missing_and_real_file() {
        let missing = Config::load("/definitely/not/here.toml").unwrap();
        assert_eq!(missing.files.preset, MappingPreset::Default);

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[files]\npreset = \"body_parser\"").unwrap();
        let loaded = Config::load(file.path()).unwrap();
        assert_eq!(loaded.files.preset, MappingPreset::BodyParser);
    }

    #[test]
    fn test_load_reports_parse_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[files\npreset = ").unwrap();
        let err = Config::load(file.path()).unwrap_err();
        assert!(err.to_string().starts_with("Failed to parse config file"));
    }

    #[test]
    fn test_lookup_reads_native_names() {
        let descriptor = Value::from(serde_json::json!({"originalname": "me.jpg", "mimetype": "image/jpeg"}));
        let table = FileFieldMappings::multer();
        assert_eq!(
            table.lookup(&descriptor, FileField::OriginalFilename),
            Some(&Value::from("me.jpg"))
        );
        assert_eq!(table.lookup(&descriptor, FileField::Type), Some(&Value::from("image/jpeg")));
        assert_eq!(table.lookup(&descriptor, FileField::Size), None);
    }
}
