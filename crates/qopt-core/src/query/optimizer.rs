//! Cost-based plan selection.
//!
//! The optimizer enumerates one left-deep candidate per join algorithm, and
//! for single-join statements the same candidates with the two tables
//! swapped. Each candidate is priced by the cost model and the cheapest one
//! wins; ties go to the candidate enumerated first.

use tracing::{debug, info, instrument, warn};

use qopt_proto::{ExplainResult, SelectStatement};

use crate::catalog::{StatisticsCatalog, TableStatistics};
use crate::config::OptimizerConfig;
use crate::error::Error;

use super::cost::{CostEstimate, CostModel};
use super::explain;
use super::plan::{JoinAlgorithm, PlanNode};
use super::planner::PlanBuilder;

/// A priced candidate plan.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanCandidate {
    /// The plan, with costs written on every node.
    pub plan: PlanNode,
    /// Cost of the whole plan.
    pub cost: CostEstimate,
    /// Algorithm used for every join.
    pub algorithm: JoinAlgorithm,
    /// Whether the joined table is scanned first.
    pub swapped: bool,
}

/// Cost-based optimizer owning its statistics.
#[derive(Debug, Clone, Default)]
pub struct QueryOptimizer {
    catalog: StatisticsCatalog,
    config: OptimizerConfig,
}

impl QueryOptimizer {
    /// Create an optimizer with no statistics and the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an optimizer reading from `catalog`.
    pub fn with_catalog(catalog: StatisticsCatalog) -> Self {
        Self {
            catalog,
            config: OptimizerConfig::default(),
        }
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: OptimizerConfig) -> Self {
        self.config = config;
        self
    }

    /// Set or replace the statistics for `table`.
    pub fn set_table_statistics(&mut self, table: impl Into<String>, stats: TableStatistics) {
        self.catalog.set_table_statistics(table, stats);
    }

    pub fn catalog(&self) -> &StatisticsCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Produce the cheapest plan for `statement`.
    ///
    /// Statements without joins have exactly one plan shape, which is built
    /// and priced directly.
    #[instrument(skip(self, statement), fields(table = %statement.from.name, joins = statement.joins.len()))]
    pub fn optimize(&self, statement: &SelectStatement) -> Result<PlanNode, Error> {
        if statement.joins.is_empty() {
            let builder = PlanBuilder::new(&self.catalog);
            let mut plan = builder.build_plan(statement)?;
            let cost = CostModel::new(&self.catalog).annotate(&mut plan);
            debug!(total_cost = cost.total_cost, "priced single-table plan");
            return Ok(plan);
        }

        let candidates = self.generate_all_plans(statement);
        let best = Self::select_best_plan(candidates).ok_or(Error::NoViablePlan)?;
        info!(
            algorithm = %best.algorithm,
            swapped = best.swapped,
            total_cost = best.cost.total_cost,
            "selected plan"
        );
        Ok(best.plan)
    }

    /// Build and price every candidate for `statement`.
    ///
    /// A candidate that fails to build is logged and skipped.
    pub fn generate_all_plans(&self, statement: &SelectStatement) -> Vec<PlanCandidate> {
        let builder = PlanBuilder::new(&self.catalog);
        let model = CostModel::new(&self.catalog);
        let explore_order = self.config.explore_join_order && statement.joins.len() == 1;

        let mut orders = vec![false];
        if explore_order {
            orders.push(true);
        }

        let mut candidates = Vec::new();
        for swapped in orders {
            for &algorithm in &self.config.join_algorithms {
                let built = if swapped {
                    builder.build_swapped_plan(statement, algorithm)
                } else {
                    builder.build_plan_with_algorithm(statement, algorithm)
                };

                match built {
                    Ok(mut plan) => {
                        let cost = model.annotate(&mut plan);
                        debug!(
                            %algorithm,
                            swapped,
                            io_cost = cost.io_cost,
                            cpu_cost = cost.cpu_cost,
                            total_cost = cost.total_cost,
                            "priced candidate"
                        );
                        candidates.push(PlanCandidate {
                            plan,
                            cost,
                            algorithm,
                            swapped,
                        });
                    }
                    Err(e) => {
                        warn!(error = %e, %algorithm, swapped, "skipping candidate plan");
                    }
                }
            }
        }

        candidates
    }

    /// Take the cheapest candidate. `None` only when there are none.
    pub fn select_best_plan(candidates: Vec<PlanCandidate>) -> Option<PlanCandidate> {
        let index = Self::best_index(&candidates)?;
        candidates.into_iter().nth(index)
    }

    /// Position of the cheapest candidate; the first one wins ties.
    pub fn best_index(candidates: &[PlanCandidate]) -> Option<usize> {
        let mut best: Option<usize> = None;
        for (i, candidate) in candidates.iter().enumerate() {
            match best {
                Some(b) if !candidate.cost.is_cheaper_than(&candidates[b].cost) => {}
                _ => best = Some(i),
            }
        }
        best
    }

    /// Describe every candidate for `statement` and which one is selected.
    pub fn explain(&self, statement: &SelectStatement) -> Result<ExplainResult, Error> {
        let candidates = if statement.joins.is_empty() {
            let plan = self.optimize(statement)?;
            vec![PlanCandidate {
                cost: plan.cost,
                plan,
                algorithm: JoinAlgorithm::NestedLoop,
                swapped: false,
            }]
        } else {
            self.generate_all_plans(statement)
        };

        let selected = Self::best_index(&candidates).ok_or(Error::NoViablePlan)?;
        Ok(explain::explain_candidates(&candidates, selected))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qopt_proto::{Expr, JoinClause, TableRef};

    fn create_test_optimizer() -> QueryOptimizer {
        let mut optimizer = QueryOptimizer::new();
        optimizer.set_table_statistics(
            "users",
            TableStatistics::new(1000, 10).with_selectivity("age > 25", 0.88),
        );
        optimizer.set_table_statistics("orders", TableStatistics::new(5000, 50));
        optimizer
    }

    fn join_statement() -> SelectStatement {
        SelectStatement::new(TableRef::new("users")).join(JoinClause::inner(
            TableRef::new("orders"),
            Expr::eq(Expr::qualified("users", "id"), Expr::qualified("orders", "user_id")),
        ))
    }

    fn candidate(total: f64, algorithm: JoinAlgorithm) -> PlanCandidate {
        let catalog = StatisticsCatalog::new();
        let plan = PlanBuilder::new(&catalog).build_scan_node(&TableRef::new("t"));
        PlanCandidate {
            plan,
            cost: CostEstimate::new(total, 0.0),
            algorithm,
            swapped: false,
        }
    }

    #[test]
    fn test_single_join_candidates() {
        let optimizer = create_test_optimizer();
        let candidates = optimizer.generate_all_plans(&join_statement());

        assert_eq!(candidates.len(), 6);
        let shapes: Vec<_> = candidates.iter().map(|c| (c.algorithm, c.swapped)).collect();
        assert_eq!(
            shapes,
            vec![
                (JoinAlgorithm::NestedLoop, false),
                (JoinAlgorithm::Hash, false),
                (JoinAlgorithm::SortMerge, false),
                (JoinAlgorithm::NestedLoop, true),
                (JoinAlgorithm::Hash, true),
                (JoinAlgorithm::SortMerge, true),
            ]
        );
        for c in &candidates {
            assert_eq!(c.plan.cost, c.cost);
            assert_eq!(c.cost.total_cost, c.cost.io_cost + c.cost.cpu_cost);
        }
    }

    #[test]
    fn test_two_joins_are_not_reordered() {
        let optimizer = create_test_optimizer();
        let stmt = join_statement().join(JoinClause::inner(
            TableRef::new("products"),
            Expr::eq(Expr::qualified("orders", "product"), Expr::qualified("products", "name")),
        ));
        let candidates = optimizer.generate_all_plans(&stmt);
        assert_eq!(candidates.len(), 3);
        assert!(candidates.iter().all(|c| !c.swapped));
    }

    #[test]
    fn test_select_best_plan() {
        let candidates = vec![
            candidate(30.0, JoinAlgorithm::NestedLoop),
            candidate(10.0, JoinAlgorithm::Hash),
            candidate(10.0, JoinAlgorithm::SortMerge),
        ];
        let best = QueryOptimizer::select_best_plan(candidates).unwrap();
        assert_eq!(best.algorithm, JoinAlgorithm::Hash);

        assert!(QueryOptimizer::select_best_plan(vec![]).is_none());
    }

    #[test]
    fn test_optimize_picks_sort_merge() {
        let optimizer = create_test_optimizer();
        let plan = optimizer.optimize(&join_statement()).unwrap();

        assert_eq!(plan.join_algorithms(), vec![JoinAlgorithm::SortMerge]);
        // Ties with the swapped order go to the written order.
        assert_eq!(plan.table_names(), vec!["users", "orders"]);
    }

    #[test]
    fn test_optimize_without_joins() {
        let optimizer = create_test_optimizer();
        let stmt = SelectStatement::new(TableRef::new("users"))
            .with_where(Expr::gt(Expr::column("age"), Expr::literal(25)));

        let plan = optimizer.optimize(&stmt).unwrap();
        assert_eq!(plan.operator.name(), "Project");
        assert!(plan.cost.total_cost > 0.0);
        assert_eq!(plan.cost.total_cost, plan.cost.io_cost + plan.cost.cpu_cost);
    }

    #[test]
    fn test_failed_candidates_are_skipped() {
        let optimizer = create_test_optimizer();
        let stmt = SelectStatement::new(TableRef::new("users"))
            .join(JoinClause::inner(TableRef::new("orders"), Expr::column("flag")));

        assert!(optimizer.generate_all_plans(&stmt).is_empty());
        assert!(matches!(optimizer.optimize(&stmt), Err(Error::NoViablePlan)));
    }

    #[test]
    fn test_restricted_algorithms() {
        let optimizer = create_test_optimizer().with_config(
            OptimizerConfig::new()
                .with_join_algorithms(vec![JoinAlgorithm::NestedLoop])
                .with_join_order_exploration(false),
        );
        let candidates = optimizer.generate_all_plans(&join_statement());
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].algorithm, JoinAlgorithm::NestedLoop);
    }
}
