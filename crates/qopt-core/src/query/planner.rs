//! Plan builder for turning parsed statements into physical plans.
//!
//! The builder produces left-deep trees: the FROM table is scanned first,
//! each join adds one scanned table on the right, and the WHERE filter and
//! the projection are stacked on top. Statistics come from the catalog.

use qopt_proto::{Column, DataType, Expr, JoinClause, Schema, SelectItem, SelectStatement, TableRef};

use crate::catalog::StatisticsCatalog;
use crate::error::Error;

use super::cost::CostConstants;
use super::plan::{
    Filter, Join, JoinAlgorithm, JoinType, PlanNode, PlanOperator, Project, Statistics, TableScan,
};

/// Join nodes estimate `left * right / JOIN_ROW_DIVISOR` rows, independent
/// of the cost model's join selectivity.
pub const JOIN_ROW_DIVISOR: u64 = 10;

/// Builds plan trees with statistics from the catalog.
pub struct PlanBuilder<'a> {
    catalog: &'a StatisticsCatalog,
}

impl<'a> PlanBuilder<'a> {
    /// Create a builder reading from `catalog`.
    pub fn new(catalog: &'a StatisticsCatalog) -> Self {
        Self { catalog }
    }

    /// Scan of `table`. The output schema is a single `table.*` column.
    pub fn build_scan_node(&self, table: &TableRef) -> PlanNode {
        let stats = self
            .catalog
            .get(&table.name)
            .map(|s| Statistics::new(s.tuple_count, s.page_count))
            .unwrap_or_default();
        let mut wildcard = Column::new(table.name.clone(), "*", DataType::Any);
        if let Some(alias) = &table.alias {
            wildcard = wildcard.with_table_alias(alias.clone());
        }

        PlanNode::new(
            PlanOperator::TableScan(TableScan {
                table_name: table.name.clone(),
                alias: table.alias.clone(),
            }),
            vec![],
            Schema::new(vec![wildcard]),
            stats,
        )
    }

    /// Filter `child` by `predicate`. Any expression is accepted; rows for
    /// which it is not a predicate never match at execution.
    pub fn build_filter_node(&self, child: PlanNode, predicate: &Expr) -> Result<PlanNode, Error> {
        let selectivity = self
            .catalog
            .estimate_predicate_selectivity(predicate, &child.table_names());
        let stats = Statistics {
            row_count: (child.stats.row_count as f64 * selectivity).floor() as u64,
            page_count: child.stats.page_count,
            selectivity,
        };
        let schema = child.output_schema.clone();

        Ok(PlanNode::new(
            PlanOperator::Filter(Filter {
                condition: predicate.clone(),
                condition_text: predicate.to_string(),
            }),
            vec![child],
            schema,
            stats,
        ))
    }

    /// Project `items` from `child`. Schema and statistics pass through.
    pub fn build_project_node(&self, child: PlanNode, items: &[SelectItem]) -> Result<PlanNode, Error> {
        if items.is_empty() {
            return Err(Error::PlanBuild("select list is empty".into()));
        }

        let projections = items
            .iter()
            .map(|item| {
                if item.is_wildcard() {
                    "*".to_string()
                } else {
                    item.expr.to_string()
                }
            })
            .collect();
        let aliases = items.iter().map(|item| item.alias.clone()).collect();
        let stats = child.stats;
        let schema = child.output_schema.clone();

        Ok(PlanNode::new(
            PlanOperator::Project(Project {
                projections,
                aliases,
            }),
            vec![child],
            schema,
            stats,
        ))
    }

    /// Join `left` and `right` on `clause` using `algorithm`.
    pub fn build_join_node(
        &self,
        left: PlanNode,
        right: PlanNode,
        clause: &JoinClause,
        algorithm: JoinAlgorithm,
    ) -> Result<PlanNode, Error> {
        if !clause.condition.is_binary() {
            return Err(Error::PlanBuild(format!(
                "join condition {} is not a binary expression",
                clause.condition
            )));
        }

        let row_count = left.stats.row_count.saturating_mul(right.stats.row_count) / JOIN_ROW_DIVISOR;
        let stats = Statistics {
            row_count,
            page_count: row_count / CostConstants::TUPLES_PER_PAGE,
            selectivity: 1.0 / JOIN_ROW_DIVISOR as f64,
        };
        let schema = Schema::concat(&left.output_schema, &right.output_schema);
        let join = Join {
            join_type: JoinType::from(clause.kind),
            condition: clause.condition.clone(),
            condition_text: clause.condition.to_string(),
        };

        Ok(PlanNode::new(
            PlanOperator::join(algorithm, join),
            vec![left, right],
            schema,
            stats,
        ))
    }

    /// Unoptimized plan: nested-loop for every join.
    pub fn build_plan(&self, statement: &SelectStatement) -> Result<PlanNode, Error> {
        self.build_plan_with_algorithm(statement, JoinAlgorithm::NestedLoop)
    }

    /// Left-deep plan in written table order using `algorithm` for every join.
    pub fn build_plan_with_algorithm(
        &self,
        statement: &SelectStatement,
        algorithm: JoinAlgorithm,
    ) -> Result<PlanNode, Error> {
        let mut plan = self.build_scan_node(&statement.from);
        for clause in &statement.joins {
            let right = self.build_scan_node(&clause.table);
            plan = self.build_join_node(plan, right, clause, algorithm)?;
        }
        self.finish_plan(plan, statement)
    }

    /// Plan for a single-join statement with the joined table scanned first.
    pub fn build_swapped_plan(
        &self,
        statement: &SelectStatement,
        algorithm: JoinAlgorithm,
    ) -> Result<PlanNode, Error> {
        let clause = match statement.joins.as_slice() {
            [clause] => clause,
            joins => {
                return Err(Error::PlanBuild(format!(
                    "join order swap needs exactly one join, statement has {}",
                    joins.len()
                )))
            }
        };

        let left = self.build_scan_node(&clause.table);
        let right = self.build_scan_node(&statement.from);
        let plan = self.build_join_node(left, right, clause, algorithm)?;
        self.finish_plan(plan, statement)
    }

    fn finish_plan(&self, mut plan: PlanNode, statement: &SelectStatement) -> Result<PlanNode, Error> {
        if let Some(predicate) = &statement.where_clause {
            plan = self.build_filter_node(plan, predicate)?;
        }
        self.build_project_node(plan, &statement.select_list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TableStatistics;

    fn create_test_catalog() -> StatisticsCatalog {
        let mut catalog = StatisticsCatalog::new();
        catalog.set_table_statistics(
            "users",
            TableStatistics::new(1000, 10).with_selectivity("age > 25", 0.88),
        );
        catalog.set_table_statistics("orders", TableStatistics::new(5000, 50));
        catalog
    }

    fn join_statement() -> SelectStatement {
        SelectStatement::new(TableRef::new("users")).join(JoinClause::inner(
            TableRef::new("orders"),
            Expr::eq(Expr::qualified("users", "id"), Expr::qualified("orders", "user_id")),
        ))
    }

    #[test]
    fn test_scan_node() {
        let catalog = create_test_catalog();
        let builder = PlanBuilder::new(&catalog);

        let scan = builder.build_scan_node(&TableRef::new("users"));
        assert_eq!(scan.stats.row_count, 1000);
        assert_eq!(scan.stats.page_count, 10);
        assert_eq!(scan.output_schema.columns[0].full_name(), "users.*");

        let unknown = builder.build_scan_node(&TableRef::new("missing"));
        assert_eq!(unknown.stats, Statistics::default());
    }

    #[test]
    fn test_filter_uses_catalog_selectivity() {
        let catalog = create_test_catalog();
        let builder = PlanBuilder::new(&catalog);
        let scan = builder.build_scan_node(&TableRef::new("users"));

        let known = Expr::gt(Expr::column("age"), Expr::literal(25));
        let filter = builder.build_filter_node(scan.clone(), &known).unwrap();
        assert_eq!(filter.stats.selectivity, 0.88);
        assert_eq!(filter.stats.row_count, 880);

        let unknown = Expr::eq(Expr::column("city"), Expr::literal("NYC"));
        let filter = builder.build_filter_node(scan, &unknown).unwrap();
        assert_eq!(filter.stats.row_count, 100);
        match &filter.operator {
            PlanOperator::Filter(f) => assert_eq!(f.condition_text, "(city = 'NYC')"),
            other => panic!("expected filter, got {:?}", other),
        }
    }

    #[test]
    fn test_join_node_stats() {
        let catalog = create_test_catalog();
        let builder = PlanBuilder::new(&catalog);
        let stmt = join_statement();

        let plan = builder
            .build_join_node(
                builder.build_scan_node(&stmt.from),
                builder.build_scan_node(&stmt.joins[0].table),
                &stmt.joins[0],
                JoinAlgorithm::Hash,
            )
            .unwrap();

        assert_eq!(plan.stats.row_count, 500_000);
        assert_eq!(plan.stats.page_count, 5_000);
        assert_eq!(plan.output_schema.column_count(), 2);
        assert_eq!(plan.operator.name(), "HashJoin");
    }

    #[test]
    fn test_build_plan_shape() {
        let catalog = create_test_catalog();
        let builder = PlanBuilder::new(&catalog);
        let stmt = join_statement().with_where(Expr::gt(Expr::column("age"), Expr::literal(25)));

        let plan = builder.build_plan(&stmt).unwrap();
        assert_eq!(plan.operator.name(), "Project");
        assert_eq!(plan.children[0].operator.name(), "Filter");
        assert_eq!(plan.children[0].children[0].operator.name(), "NestedLoopJoin");
        assert_eq!(plan.table_names(), vec!["users", "orders"]);
    }

    #[test]
    fn test_swapped_plan() {
        let catalog = create_test_catalog();
        let builder = PlanBuilder::new(&catalog);

        let plan = builder
            .build_swapped_plan(&join_statement(), JoinAlgorithm::SortMerge)
            .unwrap();
        assert_eq!(plan.table_names(), vec!["orders", "users"]);

        let two_joins = join_statement().join(JoinClause::inner(
            TableRef::new("products"),
            Expr::eq(Expr::qualified("orders", "product"), Expr::qualified("products", "name")),
        ));
        assert!(matches!(
            builder.build_swapped_plan(&two_joins, JoinAlgorithm::Hash),
            Err(Error::PlanBuild(_))
        ));
    }

    #[test]
    fn test_invalid_inputs() {
        let catalog = create_test_catalog();
        let builder = PlanBuilder::new(&catalog);
        let scan = builder.build_scan_node(&TableRef::new("users"));

        assert!(matches!(
            builder.build_project_node(scan.clone(), &[]),
            Err(Error::PlanBuild(_))
        ));
        let filter = builder.build_filter_node(scan, &Expr::column("active")).unwrap();
        assert_eq!(filter.operator.detail(), "active");
        assert_eq!(filter.stats.row_count, 100);

        let bad_join = SelectStatement::new(TableRef::new("users"))
            .join(JoinClause::inner(TableRef::new("orders"), Expr::literal(1)));
        assert!(builder.build_plan(&bad_join).is_err());
    }
}
