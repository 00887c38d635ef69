//! qopt core - statistics catalog, cost-based optimizer, and plan executor.
//!
//! A [`SelectStatement`](qopt_proto::SelectStatement) is planned by the
//! [`QueryOptimizer`], which prices candidate plans with the [`CostModel`]
//! and keeps the cheapest. The [`QueryExecutor`] runs the chosen plan against
//! a [`TableManager`].

pub mod catalog;
pub mod config;
pub mod error;
pub mod query;
pub mod storage;

pub use catalog::{StatisticsCatalog, TableStatistics};
pub use config::{ExecutorConfig, JoinKeyMode, OptimizerConfig};
pub use error::Error;
pub use query::{
    CostEstimate, CostModel, JoinAlgorithm, PlanBuilder, PlanCandidate, PlanNode, PlanOperator,
    QueryExecutor, QueryOptimizer,
};
pub use storage::{Table, TableManager};

/// Re-export protocol types.
pub use qopt_proto as proto;
