//! Lookup indices over a plugin's format engines.
//!
//! Every engine is reachable by its registered name and by its config value.
//! Both indices share the engine through an `Arc`.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::{ScanError, SetupError};
use crate::formats::{FormatMatcher, FormatPlugin, FormatPluginConfig, FormatPlugins, FormatReference};
use crate::rules::OptimizerRuleSet;

pub struct FormatRegistry {
    by_name: BTreeMap<String, Arc<dyn FormatPlugin>>,
    by_config: HashMap<FormatPluginConfig, Arc<dyn FormatPlugin>>,
}

impl FormatRegistry {
    /// Index `plugins` by name and by config.
    ///
    /// Two engines reporting equal configs are ambiguous for lookup by config
    /// and fail the build.
    pub fn build(plugins: FormatPlugins) -> Result<Self, SetupError> {
        let mut owners: HashMap<&FormatPluginConfig, &str> = HashMap::with_capacity(plugins.len());
        for (name, plugin) in &plugins {
            if let Some(first) = owners.insert(plugin.config(), name) {
                return Err(SetupError::DuplicateFormatConfig {
                    first: first.to_string(),
                    second: name.clone(),
                });
            }
        }
        drop(owners);

        let by_config = plugins
            .values()
            .map(|plugin| (plugin.config().clone(), Arc::clone(plugin)))
            .collect();

        debug!(formats = ?plugins.keys().collect::<Vec<_>>(), "built format registry");
        Ok(Self {
            by_name: plugins,
            by_config,
        })
    }

    pub fn by_name(&self, name: &str) -> Option<&Arc<dyn FormatPlugin>> {
        self.by_name.get(name)
    }

    pub fn by_config(&self, config: &FormatPluginConfig) -> Option<&Arc<dyn FormatPlugin>> {
        self.by_config.get(config)
    }

    /// Names go through the name index, configs through the config index.
    pub fn lookup(&self, reference: &FormatReference) -> Option<&Arc<dyn FormatPlugin>> {
        match reference {
            FormatReference::Named(named) => self.by_name(&named.name),
            FormatReference::Config(config) => self.by_config(config),
        }
    }

    /// Like [`lookup`](Self::lookup), but a miss is a reportable error naming the reference.
    pub fn resolve(&self, reference: &FormatReference) -> Result<&Arc<dyn FormatPlugin>, ScanError> {
        self.lookup(reference)
            .ok_or_else(|| ScanError::FormatNotRegistered(reference.clone()))
    }

    /// Matchers of every registered engine, used when browsing workspaces.
    pub fn matchers(&self) -> Vec<Arc<dyn FormatMatcher>> {
        self.by_name.values().map(|plugin| plugin.matcher()).collect()
    }

    /// Union of the rules contributed by every engine.
    pub fn optimizer_rules(&self) -> OptimizerRuleSet {
        self.by_name
            .values()
            .flat_map(|plugin| plugin.optimizer_rules())
            .collect()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(String::as_str)
    }

    pub fn plugins(&self) -> impl Iterator<Item = &Arc<dyn FormatPlugin>> {
        self.by_name.values()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

impl fmt::Debug for FormatRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.by_name.iter().map(|(name, plugin)| (name, plugin.config())))
            .finish()
    }
}
