//! Configuration management for the class generator
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (classgen.toml)
//! - Environment variables (CLASSGEN__*)
//!
//! ## Example config file (classgen.toml):
//! ```toml
//! search_locations = ["./schemas/common"]
//! dialect = "draft4"
//! suppress_validation = ["Accessor.byteOffset"]
//!
//! [[roots]]
//! uri = "./schemas/glTF.schema.json"
//! package = "de.example.gltf.impl"
//! header = "// Generated code, do not edit"
//!
//! [features]
//! bulk_accessors = true
//! default_value_accessor = true
//!
//! [naming]
//! vendor_prefixes = ["KHR", "EXT"]
//! class_names = { GlTF = "GlTFRoot" }
//!
//! [[type_overrides]]
//! pattern = ".*glTFid\\.schema\\.json$"
//! target = "integer"
//! ```
//!
//! The pipeline never reads these structs directly; it queries a [`Settings`]
//! implementation, normally [`CompiledSettings`].

use config_crate::{Config, ConfigError, Environment, File};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use crate::error::{GenError, Result};
use crate::schema::Draft;

/// Main configuration for a generator run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Root documents, each with its output namespace
    #[serde(default)]
    pub roots: Vec<RootConfig>,

    /// Extra base locations for relative references
    #[serde(default)]
    pub search_locations: Vec<String>,

    /// Fixed dialect; detected per document from `$schema` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialect: Option<Draft>,

    /// Feature switches
    #[serde(default)]
    pub features: FeatureConfig,

    /// Class naming
    #[serde(default)]
    pub naming: NamingConfig,

    /// URI pattern -> fixed target type, first match wins
    #[serde(default)]
    pub type_overrides: Vec<TypeOverride>,

    /// `ClassName.fieldName` entries without validation statements
    #[serde(default)]
    pub suppress_validation: BTreeSet<String>,

    /// Descriptor output
    #[serde(default)]
    pub output: OutputConfig,
}

/// One root document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootConfig {
    /// URI or local path
    pub uri: String,

    /// Namespace/package of the classes first reached from this root
    pub package: String,

    /// Raw text prepended to every generated file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<String>,
}

/// Feature switches
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureConfig {
    /// add/remove accessor pairs for collection and map fields
    #[serde(default)]
    pub bulk_accessors: bool,

    /// An accessor returning the declared default value
    #[serde(default)]
    pub default_value_accessor: bool,
}

/// Class naming configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamingConfig {
    /// Tokens dropped while deriving class names from file names
    #[serde(default = "default_vendor_prefixes")]
    pub vendor_prefixes: Vec<String>,

    /// Generated class name -> replacement
    #[serde(default)]
    pub class_names: BTreeMap<String, String>,
}

/// Fixed target type for schemas whose URI matches `pattern`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeOverride {
    pub pattern: String,
    pub target: String,
}

/// Descriptor output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,

    #[serde(default)]
    pub format: OutputFormat,
}

/// Output format for JSON
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pretty,
    Compact,
}

fn default_vendor_prefixes() -> Vec<String> {
    vec!["KHR".to_string(), "EXT".to_string()]
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("generated")
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            vendor_prefixes: default_vendor_prefixes(),
            class_names: BTreeMap::new(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            format: OutputFormat::Pretty,
        }
    }
}

impl GeneratorConfig {
    /// Load configuration from default locations
    pub fn load() -> std::result::Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration from a specific file
    pub fn load_from(config_path: Option<&str>) -> std::result::Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = ["classgen.toml", ".classgen.toml", "config/classgen.toml"];
        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // Load from XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "classgen", "schema-classgen") {
            let xdg_config = config_dir.config_dir().join("classgen.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Load from environment variables (CLASSGEN__*)
        builder = builder.add_source(
            Environment::with_prefix("CLASSGEN")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }
}

// =============================================================================
// Query interface
// =============================================================================

/// Feature switches the core asks about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    BulkAccessors,
    DefaultValueAccessor,
}

/// What the type builder needs to know about a run's configuration
pub trait Settings {
    fn feature(&self, feature: Feature) -> bool;

    /// Fixed target type for a schema URI, if an override matches
    fn type_override(&self, uri: &str) -> Option<&str>;

    /// Replacement for a generated class name
    fn class_name_override(&self, generated: &str) -> Option<&str>;

    fn validation_suppressed(&self, class_name: &str, field_name: &str) -> bool;

    fn vendor_prefixes(&self) -> &[String];
}

/// [`Settings`] backed by a [`GeneratorConfig`] with its patterns compiled
#[derive(Debug, Clone)]
pub struct CompiledSettings {
    features: FeatureConfig,
    type_overrides: Vec<(Regex, String)>,
    class_names: BTreeMap<String, String>,
    suppressed: BTreeSet<String>,
    vendor_prefixes: Vec<String>,
}

impl CompiledSettings {
    pub fn from_config(config: &GeneratorConfig) -> Result<Self> {
        let type_overrides = config
            .type_overrides
            .iter()
            .map(|o| {
                Regex::new(&o.pattern)
                    .map(|re| (re, o.target.clone()))
                    .map_err(|source| GenError::Pattern {
                        pattern: o.pattern.clone(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            features: config.features.clone(),
            type_overrides,
            class_names: config.naming.class_names.clone(),
            suppressed: config.suppress_validation.clone(),
            vendor_prefixes: config.naming.vendor_prefixes.clone(),
        })
    }
}

impl Default for CompiledSettings {
    fn default() -> Self {
        Self {
            features: FeatureConfig::default(),
            type_overrides: Vec::new(),
            class_names: BTreeMap::new(),
            suppressed: BTreeSet::new(),
            vendor_prefixes: default_vendor_prefixes(),
        }
    }
}

impl Settings for CompiledSettings {
    fn feature(&self, feature: Feature) -> bool {
        match feature {
            Feature::BulkAccessors => self.features.bulk_accessors,
            Feature::DefaultValueAccessor => self.features.default_value_accessor,
        }
    }

    fn type_override(&self, uri: &str) -> Option<&str> {
        self.type_overrides
            .iter()
            .find(|(re, _)| re.is_match(uri))
            .map(|(_, target)| target.as_str())
    }

    fn class_name_override(&self, generated: &str) -> Option<&str> {
        self.class_names.get(generated).map(String::as_str)
    }

    fn validation_suppressed(&self, class_name: &str, field_name: &str) -> bool {
        self.suppressed.contains(&format!("{}.{}", class_name, field_name))
    }

    fn vendor_prefixes(&self) -> &[String] {
        &self.vendor_prefixes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GeneratorConfig::default();
        assert!(config.roots.is_empty());
        assert!(!config.features.bulk_accessors);
        assert_eq!(config.naming.vendor_prefixes, vec!["KHR", "EXT"]);
        assert_eq!(config.output.format, OutputFormat::Pretty);
    }

    #[test]
    fn test_serialize_config() {
        let mut config = GeneratorConfig::default();
        config.roots.push(RootConfig {
            uri: "schemas/glTF.schema.json".to_string(),
            package: "gltf".to_string(),
            header: None,
        });
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[[roots]]"));
        assert!(toml_str.contains("[features]"));

        let parsed: GeneratorConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.roots, config.roots);
    }

    #[test]
    fn test_compiled_settings_queries() {
        let mut config = GeneratorConfig::default();
        config.features.bulk_accessors = true;
        config.type_overrides.push(TypeOverride {
            pattern: r"glTFid\.schema\.json$".to_string(),
            target: "integer".to_string(),
        });
        config.naming.class_names.insert("GlTF".to_string(), "GlTFRoot".to_string());
        config.suppress_validation.insert("Accessor.byteOffset".to_string());

        let settings = CompiledSettings::from_config(&config).unwrap();
        assert!(settings.feature(Feature::BulkAccessors));
        assert!(!settings.feature(Feature::DefaultValueAccessor));
        assert_eq!(settings.type_override("file:///s/glTFid.schema.json"), Some("integer"));
        assert_eq!(settings.type_override("file:///s/node.schema.json"), None);
        assert_eq!(settings.class_name_override("GlTF"), Some("GlTFRoot"));
        assert!(settings.validation_suppressed("Accessor", "byteOffset"));
        assert!(!settings.validation_suppressed("Accessor", "count"));
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let mut config = GeneratorConfig::default();
        config.type_overrides.push(TypeOverride {
            pattern: "(unclosed".to_string(),
            target: "string".to_string(),
        });
        assert!(matches!(
            CompiledSettings::from_config(&config),
            Err(GenError::Pattern { .. })
        ));
    }
}
