use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use object_store::ObjectMeta;
use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, SetupError};
use crate::rules::StoragePluginOptimizerRule;
use crate::scan::{FileSelection, PhysicalScan, SchemaPath};
use crate::storage::FileSystemHandle;

mod easy;
mod json_format;
mod matcher;
mod parquet_format;
mod text_format;

pub use easy::EasyFormatPlugin;
pub use json_format::JsonFormatConfig;
pub use matcher::BasicFormatMatcher;
pub use parquet_format::ParquetFormatConfig;
pub use text_format::TextFormatConfig;

/// Tag used by selections that refer to a format by name.
const NAMED_TYPE: &str = "named";

/// Tunable parameters of a format.
///
/// Acts as a value-equality key: two configs with identical fields describe
/// the same format for lookup purposes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FormatPluginConfig {
    Text(TextFormatConfig),
    Parquet(ParquetFormatConfig),
    Json(JsonFormatConfig),
}

/// Reference to a format by its registered name rather than by value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NamedFormatPluginConfig {
    pub name: String,
}

/// How a selection identifies the format it wants.
///
/// Serialized as `{"type": "named", "name": ...}` for names, or as the plain
/// [`FormatPluginConfig`] otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FormatReference {
    Named(NamedFormatPluginConfig),
    Config(FormatPluginConfig),
}

impl FormatReference {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(NamedFormatPluginConfig { name: name.into() })
    }
}

impl From<FormatPluginConfig> for FormatReference {
    fn from(config: FormatPluginConfig) -> Self {
        Self::Config(config)
    }
}

impl fmt::Display for FormatReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(named) => write!(f, "named '{}'", named.name),
            Self::Config(config) => match serde_json::to_string(config) {
                Ok(json) => write!(f, "with config {json}"),
                Err(_) => write!(f, "with config {config:?}"),
            },
        }
    }
}

impl Serialize for FormatReference {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Named(named) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("type", NAMED_TYPE)?;
                map.serialize_entry("name", &named.name)?;
                map.end()
            }
            Self::Config(config) => config.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for FormatReference {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        if value.get("type").and_then(serde_json::Value::as_str) == Some(NAMED_TYPE) {
            NamedFormatPluginConfig::deserialize(value)
                .map(Self::Named)
                .map_err(de::Error::custom)
        } else {
            FormatPluginConfig::deserialize(value)
                .map(Self::Config)
                .map_err(de::Error::custom)
        }
    }
}

/// Decides whether a file found while browsing a workspace belongs to a format.
#[async_trait]
pub trait FormatMatcher: Send + Sync {
    /// Config of the format this matcher recognizes.
    fn format_config(&self) -> &FormatPluginConfig;

    async fn is_readable(
        &self,
        fs: &FileSystemHandle,
        file: &ObjectMeta,
    ) -> object_store::Result<bool>;
}

/// A format engine able to match and plan scans over one kind of file.
#[async_trait]
pub trait FormatPlugin: Send + Sync {
    /// Name the engine is registered under.
    fn name(&self) -> &str;

    fn config(&self) -> &FormatPluginConfig;

    fn matcher(&self) -> Arc<dyn FormatMatcher>;

    /// Plan a scan of `selection`, reading only `columns` (empty means all).
    async fn physical_scan(
        &self,
        selection: FileSelection,
        columns: &[SchemaPath],
    ) -> Result<PhysicalScan, EngineError>;

    /// Planner rules contributed by this engine.
    fn optimizer_rules(&self) -> Vec<StoragePluginOptimizerRule> {
        Vec::new()
    }
}

/// Format engines keyed by registered name.
pub type FormatPlugins = BTreeMap<String, Arc<dyn FormatPlugin>>;

/// Builds the format engines of a plugin from its configured formats.
pub trait FormatCreator {
    fn create_formats(
        &self,
        fs: &FileSystemHandle,
        formats: &BTreeMap<String, FormatPluginConfig>,
    ) -> Result<FormatPlugins, SetupError>;
}

impl<F> FormatCreator for F
where
    F: Fn(&FileSystemHandle, &BTreeMap<String, FormatPluginConfig>) -> Result<FormatPlugins, SetupError>,
{
    fn create_formats(
        &self,
        fs: &FileSystemHandle,
        formats: &BTreeMap<String, FormatPluginConfig>,
    ) -> Result<FormatPlugins, SetupError> {
        self(fs, formats)
    }
}

/// Creates one [`EasyFormatPlugin`] per configured format.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinFormats;

impl FormatCreator for BuiltinFormats {
    fn create_formats(
        &self,
        fs: &FileSystemHandle,
        formats: &BTreeMap<String, FormatPluginConfig>,
    ) -> Result<FormatPlugins, SetupError> {
        Ok(formats
            .iter()
            .map(|(name, config)| {
                let plugin: Arc<dyn FormatPlugin> =
                    Arc::new(EasyFormatPlugin::from_config(name, config.clone(), fs.clone()));
                (name.clone(), plugin)
            })
            .collect())
    }
}

/// Formats registered when a storage config does not list any.
pub fn default_formats() -> BTreeMap<String, FormatPluginConfig> {
    let mut formats = BTreeMap::new();
    formats.insert(
        "csv".to_string(),
        FormatPluginConfig::Text(TextFormatConfig::new(["csv"], ',')),
    );
    formats.insert(
        "tsv".to_string(),
        FormatPluginConfig::Text(TextFormatConfig::new(["tsv"], '\t')),
    );
    formats.insert(
        "psv".to_string(),
        FormatPluginConfig::Text(TextFormatConfig::new(["psv", "tbl"], '|')),
    );
    formats.insert(
        "parquet".to_string(),
        FormatPluginConfig::Parquet(ParquetFormatConfig::default()),
    );
    formats.insert(
        "json".to_string(),
        FormatPluginConfig::Json(JsonFormatConfig::default()),
    );
    formats
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_config_value_equality() {
        let a = FormatPluginConfig::Text(TextFormatConfig::new(["csv"], ','));
        let b: FormatPluginConfig =
            serde_json::from_value(json!({"type": "text", "extensions": ["csv"], "delimiter": ","}))
                .unwrap();
        assert_eq!(a, b);

        let semicolon = FormatPluginConfig::Text(TextFormatConfig::new(["csv"], ';'));
        assert_ne!(a, semicolon);
    }

    #[test]
    fn test_decode_named_reference() {
        let reference: FormatReference =
            serde_json::from_value(json!({"type": "named", "name": "json"})).unwrap();
        assert_eq!(reference, FormatReference::named("json"));
    }

    #[test]
    fn test_decode_config_reference() {
        let reference: FormatReference = serde_json::from_value(json!({"type": "parquet"})).unwrap();
        assert_eq!(
            reference,
            FormatReference::Config(FormatPluginConfig::Parquet(ParquetFormatConfig::default()))
        );
    }

    #[test]
    fn test_unknown_format_type_is_rejected() {
        let result = serde_json::from_value::<FormatReference>(json!({"type": "avro"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_named_reference_serializes_with_tag() {
        let value = serde_json::to_value(FormatReference::named("csv")).unwrap();
        assert_eq!(value, json!({"type": "named", "name": "csv"}));
    }

    #[test]
    fn test_default_formats_are_distinct() {
        let formats = default_formats();
        assert_eq!(formats.len(), 5);
        let distinct: std::collections::HashSet<_> = formats.values().collect();
        assert_eq!(distinct.len(), formats.len());
    }
}
