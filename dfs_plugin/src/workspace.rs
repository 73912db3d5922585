//! Workspaces: named roots inside a plugin's filesystem, exposed as schemas.
//!
//! A [`WorkspaceSchemaFactory`] is built once per configured workspace and
//! creates a [`WorkspaceSchema`] for each user session. Tables are files or
//! directories under the workspace location; their format is decided by the
//! registered matchers, falling back to the workspace's default input format.
//! Views are stored as JSON documents in the plugin's persistent store.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use futures::TryStreamExt;
use object_store::path::Path;
use object_store::{ObjectMeta, ObjectStore};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{StorageConfig, WorkspaceConfig};
use crate::error::WorkspaceError;
use crate::formats::{FormatMatcher, FormatReference};
use crate::scan::{FileSelection, FormatSelection};
use crate::schema::{Schema, UserSession};
use crate::storage::FileSystemHandle;

/// Name of the workspace every plugin exposes.
pub const DEFAULT_WORKSPACE: &str = "default";

const VIEW_SUFFIX: &str = ".view.json";

/// Configured workspaces plus the implicit `default` one when it is not configured.
pub fn normalize_workspaces(config: &StorageConfig) -> Vec<(String, WorkspaceConfig)> {
    let mut workspaces: Vec<(String, WorkspaceConfig)> = config
        .workspaces
        .iter()
        .flatten()
        .map(|(name, workspace)| (name.clone(), workspace.clone()))
        .collect();
    if !workspaces.iter().any(|(name, _)| name == DEFAULT_WORKSPACE) {
        workspaces.push((DEFAULT_WORKSPACE.to_string(), WorkspaceConfig::default()));
    }
    workspaces
}

/// A browsable entry of a workspace.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableEntry {
    /// Path relative to the workspace location
    pub name: String,
    /// `None` for directories and for files nothing can read
    pub format: Option<FormatReference>,
    /// `None` for directories
    pub size: Option<usize>,
}

/// A stored view definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct View {
    pub name: String,
    pub sql: String,
    #[serde(default)]
    pub fields: Vec<String>,
    pub owner: String,
}

pub struct WorkspaceSchemaFactory {
    plugin_name: String,
    name: String,
    config: WorkspaceConfig,
    fs: FileSystemHandle,
    matchers: Vec<Arc<dyn FormatMatcher>>,
    views: Arc<dyn ObjectStore>,
}

impl WorkspaceSchemaFactory {
    pub fn new(
        plugin_name: impl Into<String>,
        name: impl Into<String>,
        config: WorkspaceConfig,
        fs: FileSystemHandle,
        matchers: Vec<Arc<dyn FormatMatcher>>,
        views: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            plugin_name: plugin_name.into(),
            name: name.into(),
            config,
            fs,
            matchers,
            views,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &WorkspaceConfig {
        &self.config
    }

    /// Schema of this workspace as seen by `session`.
    pub fn create_schema(self: &Arc<Self>, session: &UserSession) -> WorkspaceSchema {
        WorkspaceSchema {
            factory: Arc::clone(self),
            user: session.user().to_string(),
        }
    }
}

impl fmt::Debug for WorkspaceSchemaFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkspaceSchemaFactory")
            .field("plugin", &self.plugin_name)
            .field("name", &self.name)
            .field("config", &self.config)
            .field("matchers", &self.matchers.len())
            .finish()
    }
}

pub struct WorkspaceSchema {
    factory: Arc<WorkspaceSchemaFactory>,
    user: String,
}

impl WorkspaceSchema {
    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn config(&self) -> &WorkspaceConfig {
        &self.factory.config
    }

    fn fs(&self) -> &FileSystemHandle {
        &self.factory.fs
    }

    fn root(&self) -> Path {
        Path::from(self.factory.config.location.as_str())
    }

    /// Files under the workspace location, plus its directories when not recursive.
    pub async fn list_tables(&self) -> Result<Vec<TableEntry>, WorkspaceError> {
        let root = self.root();
        let recursive = self.factory.config.recursive;

        let mut tables = Vec::new();
        for file in self.fs().list(&root, recursive).await? {
            let format = self.match_format(&file).await?;
            tables.push(TableEntry {
                name: relative_name(&root, &file.location),
                format,
                size: Some(file.size),
            });
        }
        if !recursive {
            for dir in self.fs().list_directories(&root).await? {
                tables.push(TableEntry {
                    name: relative_name(&root, &dir),
                    format: None,
                    size: None,
                });
            }
        }
        tables.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tables)
    }

    /// Selection for the table `name`, or `None` when it does not exist or no format can read it.
    ///
    /// A directory is read with the format of its first file some matcher accepts;
    /// hidden files inside it are ignored.
    pub async fn table(&self, name: &str) -> Result<Option<FormatSelection>, WorkspaceError> {
        if name.trim().is_empty() {
            return Ok(None);
        }
        let root = self.root();
        let relative = Path::from(name);
        let path: Path = root.parts().chain(relative.parts()).collect();

        let files = match self.fs().status(&path).await? {
            Some(file) => vec![file],
            None => self.fs().list(&path, true).await?,
        };
        if files.is_empty() {
            return Ok(None);
        }

        let mut format = None;
        for file in &files {
            format = self.matched_format(file).await?;
            if format.is_some() {
                break;
            }
        }
        let Some(format) = format.or_else(|| self.default_format()) else {
            debug!(workspace = %self.factory.name, table = name, "no format matches table");
            return Ok(None);
        };

        let selection = FileSelection::new([path.to_string()]).with_root(root.to_string());
        Ok(Some(FormatSelection::new(format, selection)))
    }

    async fn match_format(&self, file: &ObjectMeta) -> Result<Option<FormatReference>, WorkspaceError> {
        Ok(self.matched_format(file).await?.or_else(|| self.default_format()))
    }

    /// Format of the first matcher accepting `file`.
    async fn matched_format(&self, file: &ObjectMeta) -> Result<Option<FormatReference>, WorkspaceError> {
        for matcher in &self.factory.matchers {
            if matcher.is_readable(self.fs(), file).await? {
                return Ok(Some(FormatReference::Config(matcher.format_config().clone())));
            }
        }
        Ok(None)
    }

    fn default_format(&self) -> Option<FormatReference> {
        self.factory
            .config
            .default_input_format
            .as_ref()
            .map(|format| FormatReference::named(format.clone()))
    }

    fn check_writable(&self) -> Result<(), WorkspaceError> {
        if self.factory.config.writable {
            Ok(())
        } else {
            Err(WorkspaceError::ReadOnly {
                workspace: self.factory.name.clone(),
            })
        }
    }

    fn view_dir(&self) -> Path {
        Path::from_iter([self.factory.plugin_name.as_str(), self.factory.name.as_str()])
    }

    fn view_path(&self, name: &str) -> Result<Path, WorkspaceError> {
        if name.trim().is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(WorkspaceError::InvalidViewName {
                name: name.to_string(),
            });
        }
        Ok(self.view_dir().child(format!("{name}{VIEW_SUFFIX}")))
    }

    /// Store a view owned by the session user, replacing any view of the same name.
    pub async fn create_view(
        &self,
        name: &str,
        sql: impl Into<String>,
        fields: Vec<String>,
    ) -> Result<View, WorkspaceError> {
        self.check_writable()?;
        let path = self.view_path(name)?;
        let view = View {
            name: name.to_string(),
            sql: sql.into(),
            fields,
            owner: self.user.clone(),
        };
        let data = serde_json::to_vec_pretty(&view).map_err(|source| WorkspaceError::View {
            name: name.to_string(),
            source,
        })?;
        self.factory.views.put(&path, Bytes::from(data).into()).await?;

        info!(workspace = %self.factory.name, view = name, owner = %self.user, "created view");
        Ok(view)
    }

    pub async fn view(&self, name: &str) -> Result<Option<View>, WorkspaceError> {
        let path = self.view_path(name)?;
        let data = match self.factory.views.get(&path).await {
            Ok(result) => result.bytes().await?,
            Err(object_store::Error::NotFound { .. }) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_slice(&data)
            .map(Some)
            .map_err(|source| WorkspaceError::View {
                name: name.to_string(),
                source,
            })
    }

    pub async fn view_names(&self) -> Result<Vec<String>, WorkspaceError> {
        let dir = self.view_dir();
        let stored: Vec<ObjectMeta> = self.factory.views.list(Some(&dir)).try_collect().await?;
        let mut names: Vec<String> = stored
            .iter()
            .filter_map(|meta| meta.location.filename()?.strip_suffix(VIEW_SUFFIX))
            .map(str::to_string)
            .collect();
        names.sort();
        Ok(names)
    }

    /// Returns false when no such view exists.
    pub async fn drop_view(&self, name: &str) -> Result<bool, WorkspaceError> {
        self.check_writable()?;
        let path = self.view_path(name)?;
        match self.factory.views.head(&path).await {
            Ok(_) => {}
            Err(object_store::Error::NotFound { .. }) => return Ok(false),
            Err(e) => return Err(e.into()),
        }
        self.factory.views.delete(&path).await?;
        info!(workspace = %self.factory.name, view = name, "dropped view");
        Ok(true)
    }
}

impl Schema for WorkspaceSchema {
    fn name(&self) -> &str {
        &self.factory.name
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Debug for WorkspaceSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkspaceSchema")
            .field("name", &self.factory.name)
            .field("user", &self.user)
            .finish()
    }
}

fn relative_name(root: &Path, location: &Path) -> String {
    match location.prefix_match(root) {
        Some(parts) => parts
            .map(|part| part.as_ref().to_string())
            .collect::<Vec<_>>()
            .join("/"),
        None => location.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::{default_formats, BuiltinFormats, FormatCreator, FormatPluginConfig, TextFormatConfig};
    use crate::registry::FormatRegistry;
    use crate::storage;
    use object_store::memory::InMemory;

    async fn workspace(config: WorkspaceConfig) -> WorkspaceSchema {
        let fs = storage::from_url("memory:///").unwrap();
        for (path, data) in [
            ("data/a.csv", "x,y\n1,2\n"),
            ("data/b.json", "{\"x\": 1}"),
            ("data/part.parquet", "PAR1....PAR1"),
            ("data/README", "hello"),
            ("data/nested/c.csv", "3,4\n"),
        ] {
            fs.put(&Path::from(path), Bytes::from(data)).await.unwrap();
        }

        let formats = BuiltinFormats.create_formats(&fs, &default_formats()).unwrap();
        let registry = FormatRegistry::build(formats).unwrap();
        let factory = Arc::new(WorkspaceSchemaFactory::new(
            "dfs",
            "data",
            config,
            fs,
            registry.matchers(),
            Arc::new(InMemory::new()),
        ));
        factory.create_schema(&UserSession::new("alice"))
    }

    fn csv() -> FormatReference {
        FormatReference::Config(FormatPluginConfig::Text(TextFormatConfig::new(["csv"], ',')))
    }

    #[test]
    fn test_default_workspace_is_added() {
        let workspaces = normalize_workspaces(&StorageConfig::new("memory:///"));
        assert_eq!(
            workspaces,
            vec![(DEFAULT_WORKSPACE.to_string(), WorkspaceConfig::default())]
        );

        let config = StorageConfig::new("memory:///").with_workspace("reports", WorkspaceConfig::new("/reports"));
        let names: Vec<_> = normalize_workspaces(&config).into_iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["reports", DEFAULT_WORKSPACE]);
    }

    #[test]
    fn test_default_workspace_is_added_to_empty_map() {
        let config = StorageConfig::from_json(r#"{"connection": "memory:///", "workspaces": {}}"#).unwrap();
        assert_eq!(config.workspaces, Some(Default::default()));
        assert_eq!(
            normalize_workspaces(&config),
            vec![(DEFAULT_WORKSPACE.to_string(), WorkspaceConfig::default())]
        );
    }

    #[test]
    fn test_configured_default_is_kept() {
        let config = StorageConfig::new("memory:///")
            .with_workspace(DEFAULT_WORKSPACE, WorkspaceConfig::new("/home").writable());
        let workspaces = normalize_workspaces(&config);
        assert_eq!(workspaces.len(), 1);
        assert_eq!(workspaces[0].1.location, "/home");
        assert!(workspaces[0].1.writable);
    }

    #[tokio::test]
    async fn test_list_tables() {
        let schema = workspace(WorkspaceConfig::new("/data")).await;
        let tables = schema.list_tables().await.unwrap();

        let names: Vec<_> = tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["README", "a.csv", "b.json", "nested", "part.parquet"]);

        assert_eq!(tables[0].format, None);
        assert_eq!(tables[1].format, Some(csv()));
        assert_eq!(tables[1].size, Some(8));
        assert_eq!(tables[3].format, None);
        assert_eq!(tables[3].size, None);
        assert!(matches!(
            &tables[4].format,
            Some(FormatReference::Config(FormatPluginConfig::Parquet(_)))
        ));
    }

    #[tokio::test]
    async fn test_list_tables_recursive() {
        let schema = workspace(WorkspaceConfig::new("/data").recursive()).await;
        let names: Vec<_> = schema
            .list_tables()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert!(names.contains(&"nested/c.csv".to_string()));
        assert!(!names.contains(&"nested".to_string()));
    }

    #[tokio::test]
    async fn test_table_resolution() {
        let schema = workspace(WorkspaceConfig::new("/data")).await;

        let selection = schema.table("a.csv").await.unwrap().unwrap();
        assert_eq!(selection.format, csv());
        assert_eq!(selection.selection, FileSelection::new(["data/a.csv"]).with_root("data"));

        let selection = schema.table("nested").await.unwrap().unwrap();
        assert_eq!(selection.format, csv());
        assert_eq!(selection.selection.files, vec!["data/nested".to_string()]);

        assert!(schema.table("missing.csv").await.unwrap().is_none());
        assert!(schema.table("README").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_blank_table_name_is_not_a_table() {
        let schema = workspace(WorkspaceConfig::new("/data").with_default_input_format("csv")).await;
        assert!(schema.table("").await.unwrap().is_none());
        assert!(schema.table("  ").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_marker_files_do_not_hide_directory_tables() {
        let schema = workspace(WorkspaceConfig::new("/data")).await;
        let fs = schema.fs().clone();
        for (path, data) in [
            ("data/out/_SUCCESS", ""),
            ("data/out/.part-0.parquet.crc", "crc"),
            ("data/out/_temporary/part-9.parquet", "PAR1....PAR1"),
            ("data/out/part-0.parquet", "PAR1....PAR1"),
            ("data/out/part-1.parquet", "PAR1....PAR1"),
        ] {
            fs.put(&Path::from(path), Bytes::from(data)).await.unwrap();
        }

        let selection = schema.table("out").await.unwrap().unwrap();
        assert!(matches!(
            &selection.format,
            FormatReference::Config(FormatPluginConfig::Parquet(_))
        ));

        let files = selection.selection.expand(&fs).await.unwrap();
        let paths: Vec<_> = files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["data/out/part-0.parquet", "data/out/part-1.parquet"]);

        let names: Vec<_> = schema
            .list_tables()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert!(names.contains(&"out".to_string()));
        assert!(!names.iter().any(|name| name.starts_with('_') || name.starts_with('.')));
    }

    #[tokio::test]
    async fn test_directory_uses_first_matching_file() {
        let schema = workspace(WorkspaceConfig::new("/data")).await;
        let fs = schema.fs().clone();
        fs.put(&Path::from("data/logs/NOTES"), Bytes::from("notes")).await.unwrap();
        fs.put(&Path::from("data/logs/day1.json"), Bytes::from("{}")).await.unwrap();

        let selection = schema.table("logs").await.unwrap().unwrap();
        assert!(matches!(
            &selection.format,
            FormatReference::Config(FormatPluginConfig::Json(_))
        ));
    }

    #[tokio::test]
    async fn test_default_input_format_applies_to_unmatched_files() {
        let schema = workspace(WorkspaceConfig::new("/data").with_default_input_format("psv")).await;
        let selection = schema.table("README").await.unwrap().unwrap();
        assert_eq!(selection.format, FormatReference::named("psv"));

        let selection = schema.table("a.csv").await.unwrap().unwrap();
        assert_eq!(selection.format, csv());
    }

    #[tokio::test]
    async fn test_views() {
        let schema = workspace(WorkspaceConfig::new("/data").writable()).await;
        assert!(schema.view_names().await.unwrap().is_empty());

        let view = schema
            .create_view("recent", "SELECT * FROM dfs.data.`a.csv`", vec!["x".to_string()])
            .await
            .unwrap();
        assert_eq!(view.owner, "alice");
        schema.create_view("all_rows", "SELECT 1", vec![]).await.unwrap();

        assert_eq!(schema.view_names().await.unwrap(), vec!["all_rows", "recent"]);
        assert_eq!(schema.view("recent").await.unwrap(), Some(view));
        assert_eq!(schema.view("other").await.unwrap(), None);

        assert!(schema.drop_view("recent").await.unwrap());
        assert!(!schema.drop_view("recent").await.unwrap());
        assert_eq!(schema.view_names().await.unwrap(), vec!["all_rows"]);
    }

    #[tokio::test]
    async fn test_views_need_writable_workspace() {
        let schema = workspace(WorkspaceConfig::new("/data")).await;
        let err = schema.create_view("v", "SELECT 1", vec![]).await.unwrap_err();
        assert!(matches!(err, WorkspaceError::ReadOnly { workspace } if workspace == "data"));
        assert!(schema.drop_view("v").await.is_err());
    }

    #[tokio::test]
    async fn test_invalid_view_names() {
        let schema = workspace(WorkspaceConfig::new("/data").writable()).await;
        for name in ["", "a/b", ".hidden"] {
            let err = schema.create_view(name, "SELECT 1", vec![]).await.unwrap_err();
            assert!(matches!(err, WorkspaceError::InvalidViewName { .. }));
        }
    }

    #[test]
    fn test_relative_name() {
        assert_eq!(relative_name(&Path::from("data"), &Path::from("data/x/y.csv")), "x/y.csv");
        assert_eq!(relative_name(&Path::from(""), &Path::from("y.csv")), "y.csv");
        assert_eq!(relative_name(&Path::from("other"), &Path::from("y.csv")), "y.csv");
    }
}
