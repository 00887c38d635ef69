//! Optimizer and executor configuration.

use crate::query::JoinAlgorithm;

/// How hash and sort-merge joins pick their key columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinKeyMode {
    /// Resolve `a = b` against the input schemas, falling back to
    /// [`JoinKeyMode::FixedPositions`] when the condition cannot be resolved.
    #[default]
    Resolve,
    /// Always join left column 0 against right column 1.
    FixedPositions,
}

/// Configuration for plan enumeration.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizerConfig {
    /// Join algorithms tried for every candidate, in enumeration order.
    pub join_algorithms: Vec<JoinAlgorithm>,

    /// Also try the swapped table order for single-join statements.
    pub explore_join_order: bool,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            join_algorithms: JoinAlgorithm::ALL.to_vec(),
            explore_join_order: true,
        }
    }
}

impl OptimizerConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict enumeration to the given algorithms.
    pub fn with_join_algorithms(mut self, algorithms: Vec<JoinAlgorithm>) -> Self {
        self.join_algorithms = algorithms;
        self
    }

    /// Enable or disable join order exploration.
    pub fn with_join_order_exploration(mut self, enabled: bool) -> Self {
        self.explore_join_order = enabled;
        self
    }
}

/// Configuration for plan execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecutorConfig {
    /// Key column selection for hash and sort-merge joins.
    pub join_key_mode: JoinKeyMode,

    /// Evaluate the join condition in nested-loop joins instead of
    /// emitting the full cross product.
    pub nested_loop_applies_condition: bool,
}

impl ExecutorConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the join key mode.
    pub fn with_join_key_mode(mut self, mode: JoinKeyMode) -> Self {
        self.join_key_mode = mode;
        self
    }

    /// Apply the join condition in nested-loop joins.
    pub fn with_nested_loop_condition(mut self, enabled: bool) -> Self {
        self.nested_loop_applies_condition = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optimizer_defaults() {
        let config = OptimizerConfig::default();
        assert_eq!(
            config.join_algorithms,
            vec![
                JoinAlgorithm::NestedLoop,
                JoinAlgorithm::Hash,
                JoinAlgorithm::SortMerge
            ]
        );
        assert!(config.explore_join_order);
    }

    #[test]
    fn test_builders() {
        let optimizer = OptimizerConfig::new()
            .with_join_algorithms(vec![JoinAlgorithm::Hash])
            .with_join_order_exploration(false);
        assert_eq!(optimizer.join_algorithms, vec![JoinAlgorithm::Hash]);
        assert!(!optimizer.explore_join_order);

        let executor = ExecutorConfig::new()
            .with_join_key_mode(JoinKeyMode::FixedPositions)
            .with_nested_loop_condition(true);
        assert_eq!(executor.join_key_mode, JoinKeyMode::FixedPositions);
        assert!(executor.nested_loop_applies_condition);
        assert_eq!(ExecutorConfig::default().join_key_mode, JoinKeyMode::Resolve);
    }
}
