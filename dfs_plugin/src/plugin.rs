use std::fmt;
use std::sync::Arc;

use object_store::memory::InMemory;
use object_store::ObjectStore;
use tracing::{debug, info};

use crate::config::StorageConfig;
use crate::error::{ScanError, SetupError};
use crate::formats::{BuiltinFormats, FormatCreator, FormatPlugin, FormatReference};
use crate::registry::FormatRegistry;
use crate::rules::OptimizerRuleSet;
use crate::scan::{FormatSelection, PhysicalScan, SchemaPath};
use crate::schema::{FileSystemSchema, SchemaParent, UserSession};
use crate::storage::{self, FileSystemHandle};
use crate::validation::validate_config;
use crate::workspace::{normalize_workspaces, WorkspaceSchemaFactory};

/// Services the hosting engine lends to every storage plugin.
#[derive(Clone)]
pub struct PluginContext {
    persistent_store: Arc<dyn ObjectStore>,
}

impl PluginContext {
    pub fn new(persistent_store: Arc<dyn ObjectStore>) -> Self {
        Self { persistent_store }
    }

    /// Store holding view definitions.
    pub fn persistent_store(&self) -> &Arc<dyn ObjectStore> {
        &self.persistent_store
    }
}

impl Default for PluginContext {
    fn default() -> Self {
        Self::new(Arc::new(InMemory::new()))
    }
}

impl fmt::Debug for PluginContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginContext")
            .field("persistent_store", &self.persistent_store.to_string())
            .finish()
    }
}

/// A storage plugin exposing a filesystem as workspaces of queryable files.
///
/// Everything is built up front by [`FileSystemPlugin::new`]; afterwards the
/// plugin is read-only and can be shared across query threads.
pub struct FileSystemPlugin {
    name: String,
    config: StorageConfig,
    fs: FileSystemHandle,
    registry: FormatRegistry,
    workspaces: Vec<Arc<WorkspaceSchemaFactory>>,
}

impl FileSystemPlugin {
    /// Build a plugin with the built-in format engines.
    pub fn new(
        name: impl Into<String>,
        config: StorageConfig,
        context: &PluginContext,
    ) -> Result<Self, SetupError> {
        Self::with_format_creator(name, config, context, &BuiltinFormats)
    }

    /// Build a plugin whose format engines come from `creator`.
    ///
    /// Fails without side effects if the connection cannot be opened, two
    /// engines share a config, or a workspace names an unknown default format.
    pub fn with_format_creator(
        name: impl Into<String>,
        config: StorageConfig,
        context: &PluginContext,
        creator: &dyn FormatCreator,
    ) -> Result<Self, SetupError> {
        let name = name.into();
        validate_config(&config)?;

        let fs = storage::from_url(&config.connection)?;
        let registry = FormatRegistry::build(creator.create_formats(&fs, &config.formats())?)?;

        let matchers = registry.matchers();
        let mut workspaces = Vec::new();
        for (workspace, workspace_config) in normalize_workspaces(&config) {
            if let Some(format) = &workspace_config.default_input_format {
                if registry.by_name(format).is_none() {
                    return Err(SetupError::UnknownDefaultFormat {
                        workspace,
                        format: format.clone(),
                    });
                }
            }
            debug!(
                plugin = %name,
                workspace = %workspace,
                location = %workspace_config.location,
                "adding workspace"
            );
            workspaces.push(Arc::new(WorkspaceSchemaFactory::new(
                &name,
                workspace,
                workspace_config,
                fs.clone(),
                matchers.clone(),
                Arc::clone(context.persistent_store()),
            )));
        }

        info!(
            plugin = %name,
            connection = %config.connection,
            formats = registry.len(),
            workspaces = workspaces.len(),
            "file system plugin ready"
        );
        Ok(Self {
            name,
            config,
            fs,
            registry,
            workspaces,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Filesystems are always readable.
    pub fn supports_read(&self) -> bool {
        true
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    pub fn file_system(&self) -> &FileSystemHandle {
        &self.fs
    }

    pub fn registry(&self) -> &FormatRegistry {
        &self.registry
    }

    /// Decode a planner selection and plan its scan with the owning format engine.
    pub async fn physical_scan(
        &self,
        selection: &serde_json::Value,
        columns: &[SchemaPath],
    ) -> Result<PhysicalScan, ScanError> {
        let selection = FormatSelection::decode(selection)?;
        self.physical_scan_for(selection, columns).await
    }

    /// Plan the scan of an already decoded selection.
    pub async fn physical_scan_for(
        &self,
        selection: FormatSelection,
        columns: &[SchemaPath],
    ) -> Result<PhysicalScan, ScanError> {
        let plugin = self.registry.resolve(&selection.format)?;
        debug!(plugin = %self.name, format = plugin.name(), "resolved format {}", selection.format);
        Ok(plugin.physical_scan(selection.selection, columns).await?)
    }

    /// Attach this plugin's schema, with one sub-schema per workspace, under `parent`.
    pub fn register_schemas(&self, session: &UserSession, parent: &mut dyn SchemaParent) {
        let schema = FileSystemSchema::new(
            &self.name,
            self.workspaces
                .iter()
                .map(|workspace| workspace.create_schema(session)),
        );
        parent.add_sub_schema(Arc::new(schema));
    }

    pub fn format_plugin(&self, name: &str) -> Option<&Arc<dyn FormatPlugin>> {
        self.registry.by_name(name)
    }

    /// Engine for a format reference, by name or by config.
    pub fn format_plugin_for(&self, reference: &FormatReference) -> Option<&Arc<dyn FormatPlugin>> {
        self.registry.lookup(reference)
    }

    pub fn optimizer_rules(&self) -> OptimizerRuleSet {
        self.registry.optimizer_rules()
    }

    pub fn workspace_names(&self) -> Vec<&str> {
        self.workspaces.iter().map(|workspace| workspace.name()).collect()
    }

    pub fn workspace(&self, name: &str) -> Option<&Arc<WorkspaceSchemaFactory>> {
        self.workspaces.iter().find(|workspace| workspace.name() == name)
    }
}

impl fmt::Debug for FileSystemPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileSystemPlugin")
            .field("name", &self.name)
            .field("fs", &self.fs)
            .field("formats", &self.registry)
            .field("workspaces", &self.workspace_names())
            .finish()
    }
}
