use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use datafusion::physical_optimizer::PhysicalOptimizerRule;

/// A planner rule contributed by a format engine.
pub type StoragePluginOptimizerRule = Arc<dyn PhysicalOptimizerRule + Send + Sync>;

/// De-duplicated collection of optimizer rules.
///
/// Rules are compared by identity (the `Arc` allocation), not by structure:
/// two distinct rule instances are both kept even if they behave the same.
#[derive(Clone, Default)]
pub struct OptimizerRuleSet {
    rules: Vec<StoragePluginOptimizerRule>,
    seen: HashSet<usize>,
}

fn identity(rule: &StoragePluginOptimizerRule) -> usize {
    Arc::as_ptr(rule) as *const () as usize
}

impl OptimizerRuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `rule`, returning false if this exact instance is already present.
    pub fn insert(&mut self, rule: StoragePluginOptimizerRule) -> bool {
        if !self.seen.insert(identity(&rule)) {
            return false;
        }
        self.rules.push(rule);
        true
    }

    pub fn contains(&self, rule: &StoragePluginOptimizerRule) -> bool {
        self.seen.contains(&identity(rule))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StoragePluginOptimizerRule> {
        self.rules.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.rules.iter().map(|rule| rule.name()).collect()
    }

    /// Rules in insertion order, ready to hand to a session builder.
    pub fn into_vec(self) -> Vec<StoragePluginOptimizerRule> {
        self.rules
    }
}

impl Extend<StoragePluginOptimizerRule> for OptimizerRuleSet {
    fn extend<I: IntoIterator<Item = StoragePluginOptimizerRule>>(&mut self, iter: I) {
        for rule in iter {
            self.insert(rule);
        }
    }
}

impl FromIterator<StoragePluginOptimizerRule> for OptimizerRuleSet {
    fn from_iter<I: IntoIterator<Item = StoragePluginOptimizerRule>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl fmt::Debug for OptimizerRuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use datafusion::config::ConfigOptions;
    use datafusion::error::Result;
    use datafusion::physical_plan::ExecutionPlan;

    /// Rule that leaves every plan untouched.
    #[derive(Debug)]
    pub(crate) struct PassThroughRule(pub &'static str);

    impl PhysicalOptimizerRule for PassThroughRule {
        fn optimize(
            &self,
            plan: Arc<dyn ExecutionPlan>,
            _config: &ConfigOptions,
        ) -> Result<Arc<dyn ExecutionPlan>> {
            Ok(plan)
        }

        fn name(&self) -> &str {
            self.0
        }

        fn schema_check(&self) -> bool {
            true
        }
    }

    pub(crate) fn rule(name: &'static str) -> StoragePluginOptimizerRule {
        Arc::new(PassThroughRule(name))
    }

    #[test]
    fn test_same_instance_is_kept_once() {
        let shared = rule("prune");
        let mut set = OptimizerRuleSet::new();
        assert!(set.insert(shared.clone()));
        assert!(!set.insert(shared.clone()));
        assert_eq!(set.len(), 1);
        assert!(set.contains(&shared));
    }

    #[test]
    fn test_distinct_instances_are_both_kept() {
        let set: OptimizerRuleSet = vec![rule("prune"), rule("prune")].into_iter().collect();
        assert_eq!(set.len(), 2);
        assert_eq!(set.names(), vec!["prune", "prune"]);
    }

    #[test]
    fn test_empty_set() {
        let set = OptimizerRuleSet::new();
        assert!(set.is_empty());
        assert!(set.into_vec().is_empty());
    }
}
