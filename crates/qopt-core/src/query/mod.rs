//! Query engine for qopt.
//!
//! This module turns parsed statements into priced physical plans, selects
//! the cheapest one, and executes it against the in-memory tables.

mod cost;
mod executor;
mod explain;
mod filter;
mod join;
mod optimizer;
mod plan;
mod planner;

pub use cost::{CostConstants, CostEstimate, CostModel, NodeEstimate};
pub use executor::QueryExecutor;
pub use explain::{explain_candidates, optimization_report, render_plan, summarize};
pub use filter::{resolve_column, FilterEvaluator, PredicateError};
pub use join::{
    execute_join, HashJoinExecutor, JoinKeys, NestedLoopExecutor, SortMergeExecutor,
};
pub use optimizer::{PlanCandidate, QueryOptimizer};
pub use plan::{
    Filter, Join, JoinAlgorithm, JoinType, PlanNode, PlanOperator, Project, Statistics, TableScan,
};
pub use planner::{PlanBuilder, JOIN_ROW_DIVISOR};
