use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::{
    json_format, parquet_format, text_format, BasicFormatMatcher, FormatMatcher, FormatPlugin,
    FormatPluginConfig,
};
use crate::error::EngineError;
use crate::rules::StoragePluginOptimizerRule;
use crate::scan::{FileSelection, PhysicalScan, SchemaPath};
use crate::storage::FileSystemHandle;

/// Format engine for file types that plan a scan as "every file in the selection".
pub struct EasyFormatPlugin {
    name: String,
    config: FormatPluginConfig,
    fs: FileSystemHandle,
    matcher: Arc<BasicFormatMatcher>,
    rules: Vec<StoragePluginOptimizerRule>,
}

impl EasyFormatPlugin {
    pub fn new(
        name: impl Into<String>,
        config: FormatPluginConfig,
        fs: FileSystemHandle,
        matcher: BasicFormatMatcher,
    ) -> Self {
        Self {
            name: name.into(),
            config,
            fs,
            matcher: Arc::new(matcher),
            rules: Vec::new(),
        }
    }

    /// Build the engine with the matcher that belongs to `config`.
    pub fn from_config(
        name: impl Into<String>,
        config: FormatPluginConfig,
        fs: FileSystemHandle,
    ) -> Self {
        let matcher = match &config {
            FormatPluginConfig::Text(text) => text_format::matcher(text),
            FormatPluginConfig::Parquet(parquet) => parquet_format::matcher(parquet),
            FormatPluginConfig::Json(json) => json_format::matcher(json),
        };
        Self::new(name, config, fs, matcher)
    }

    pub fn with_optimizer_rules(mut self, rules: Vec<StoragePluginOptimizerRule>) -> Self {
        self.rules = rules;
        self
    }
}

impl fmt::Debug for EasyFormatPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EasyFormatPlugin")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("rules", &self.rules.len())
            .finish()
    }
}

#[async_trait]
impl FormatPlugin for EasyFormatPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn config(&self) -> &FormatPluginConfig {
        &self.config
    }

    fn matcher(&self) -> Arc<dyn FormatMatcher> {
        self.matcher.clone()
    }

    async fn physical_scan(
        &self,
        selection: FileSelection,
        columns: &[SchemaPath],
    ) -> Result<PhysicalScan, EngineError> {
        let files = selection.expand(&self.fs).await?;
        debug!(
            format = %self.name,
            files = files.len(),
            "planned file scan"
        );
        Ok(PhysicalScan {
            format: self.name.clone(),
            config: self.config.clone(),
            selection_root: selection.selection_root,
            files,
            columns: SchemaPath::normalize(columns),
        })
    }

    fn optimizer_rules(&self) -> Vec<StoragePluginOptimizerRule> {
        self.rules.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::TextFormatConfig;
    use crate::storage;
    use bytes::Bytes;
    use object_store::path::Path;

    fn csv_plugin(fs: FileSystemHandle) -> EasyFormatPlugin {
        EasyFormatPlugin::from_config(
            "csv",
            FormatPluginConfig::Text(TextFormatConfig::new(["csv"], ',')),
            fs,
        )
    }

    #[tokio::test]
    async fn test_scan_expands_directories() {
        let fs = storage::from_url("memory:///").unwrap();
        for name in ["data/b.csv", "data/a.csv", "data/nested/c.csv"] {
            fs.put(&Path::from(name), Bytes::from_static(b"x,y\n1,2\n"))
                .await
                .unwrap();
        }

        let plugin = csv_plugin(fs);
        let scan = plugin
            .physical_scan(FileSelection::new(["data"]), &[])
            .await
            .unwrap();

        let paths: Vec<_> = scan.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["data/a.csv", "data/b.csv", "data/nested/c.csv"]);
        assert_eq!(scan.columns, vec![SchemaPath::star()]);
        assert_eq!(scan.format, "csv");
        assert_eq!(scan.total_bytes(), 24);
    }

    #[tokio::test]
    async fn test_scan_keeps_requested_columns() {
        let fs = storage::from_url("memory:///").unwrap();
        fs.put(&Path::from("y.csv"), Bytes::from_static(b"a,b\n"))
            .await
            .unwrap();

        let plugin = csv_plugin(fs);
        let columns = vec![SchemaPath::from("a"), SchemaPath::from("b")];
        let scan = plugin
            .physical_scan(FileSelection::new(["/y.csv"]), &columns)
            .await
            .unwrap();
        assert_eq!(scan.columns, columns);
        assert_eq!(scan.files.len(), 1);
    }

    #[tokio::test]
    async fn test_scan_of_missing_path_fails() {
        let fs = storage::from_url("memory:///").unwrap();
        let plugin = csv_plugin(fs);
        let err = plugin
            .physical_scan(FileSelection::new(["nowhere"]), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::SelectionNotFound { path } if path == "nowhere"));
    }

    #[tokio::test]
    async fn test_scan_of_empty_selection_fails() {
        let fs = storage::from_url("memory:///").unwrap();
        let plugin = csv_plugin(fs);
        let err = plugin
            .physical_scan(FileSelection::new(Vec::<String>::new()), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::EmptySelection));
    }
}
