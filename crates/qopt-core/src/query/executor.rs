//! Plan executor for running physical plans.
//!
//! The executor walks a plan tree bottom-up against the in-memory tables,
//! materializing a fresh [`ResultSet`] at every operator.

use tracing::{debug, instrument, warn};

use qopt_proto::{Column, ResultSet, Row, Schema};

use crate::config::ExecutorConfig;
use crate::error::Error;
use crate::storage::TableManager;

use super::filter::{resolve_column, FilterEvaluator};
use super::join::{execute_join, JoinKeys};
use super::plan::{Filter, Join, JoinAlgorithm, JoinType, PlanNode, PlanOperator, Project, TableScan};

/// Executes plans against a read-only table store.
pub struct QueryExecutor<'a> {
    storage: &'a TableManager,
    config: ExecutorConfig,
}

impl<'a> QueryExecutor<'a> {
    /// Create an executor with the default configuration.
    pub fn new(storage: &'a TableManager) -> Self {
        Self {
            storage,
            config: ExecutorConfig::default(),
        }
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: ExecutorConfig) -> Self {
        self.config = config;
        self
    }

    /// Execute `plan` and return its complete result.
    #[instrument(skip_all, fields(root = plan.operator.name(), nodes = plan.node_count()))]
    pub fn execute(&self, plan: &PlanNode) -> Result<ResultSet, Error> {
        let result = self.execute_node(plan)?;
        debug!(rows = result.len(), "plan executed");
        Ok(result)
    }

    fn execute_node(&self, node: &PlanNode) -> Result<ResultSet, Error> {
        let expected = node.operator.arity();
        if node.children.len() != expected {
            return Err(Error::MissingChild {
                operator: node.operator.name(),
                expected,
                actual: node.children.len(),
            });
        }

        let result = match &node.operator {
            PlanOperator::TableScan(scan) => self.execute_scan(scan)?,
            PlanOperator::Filter(filter) => {
                let input = self.execute_node(&node.children[0])?;
                execute_filter(filter, input)
            }
            PlanOperator::Project(project) => {
                let input = self.execute_node(&node.children[0])?;
                execute_project(project, input)
            }
            PlanOperator::NestedLoopJoin(join) => self.execute_join(JoinAlgorithm::NestedLoop, join, node)?,
            PlanOperator::HashJoin(join) => self.execute_join(JoinAlgorithm::Hash, join, node)?,
            PlanOperator::SortMergeJoin(join) => self.execute_join(JoinAlgorithm::SortMerge, join, node)?,
        };

        debug!(operator = node.operator.name(), rows = result.len(), "operator finished");
        Ok(result)
    }

    fn execute_scan(&self, scan: &TableScan) -> Result<ResultSet, Error> {
        let table = self
            .storage
            .get_table(&scan.table_name)
            .ok_or_else(|| Error::TableNotFound(scan.table_name.clone()))?;
        let schema = match &scan.alias {
            Some(alias) => Schema::new(
                table
                    .schema()
                    .columns
                    .iter()
                    .map(|c| c.clone().with_table_alias(alias.clone()))
                    .collect(),
            ),
            None => table.schema().clone(),
        };
        Ok(ResultSet::with_rows(schema, table.rows().to_vec()))
    }

    fn execute_join(
        &self,
        algorithm: JoinAlgorithm,
        join: &Join,
        node: &PlanNode,
    ) -> Result<ResultSet, Error> {
        if join.join_type != JoinType::Inner {
            return Err(Error::UnsupportedNode(format!(
                "{} with {} join",
                algorithm,
                join.join_type.as_str()
            )));
        }

        let left = self.execute_node(&node.children[0])?;
        let right = self.execute_node(&node.children[1])?;
        let keys = JoinKeys::resolve(
            &join.condition,
            &left.schema,
            &right.schema,
            self.config.join_key_mode,
        );
        let nested_condition = self
            .config
            .nested_loop_applies_condition
            .then_some(&join.condition);

        debug!(
            %algorithm,
            left_rows = left.len(),
            right_rows = right.len(),
            left_key = keys.left,
            right_key = keys.right,
            "joining"
        );
        Ok(execute_join(algorithm, &left, &right, keys, nested_condition))
    }
}

/// Keep the rows of `input` that satisfy the filter condition.
fn execute_filter(filter: &Filter, input: ResultSet) -> ResultSet {
    let ResultSet { schema, rows } = input;
    let rows = rows
        .into_iter()
        .filter(|row| FilterEvaluator::matches(&filter.condition, row, &schema))
        .collect();
    ResultSet::with_rows(schema, rows)
}

/// Project `input` onto the named columns. The wildcard projection returns
/// `input` itself.
fn execute_project(project: &Project, input: ResultSet) -> ResultSet {
    if project.is_wildcard() {
        return input;
    }

    let mut positions = Vec::with_capacity(project.projections.len());
    let mut schema = Schema::default();
    for (name, alias) in project.projections.iter().zip(&project.aliases) {
        if name == "*" {
            continue;
        }
        let Some(index) = resolve_projection(&input.schema, name) else {
            warn!(column = %name, "dropping unresolved projection column");
            continue;
        };

        let source = &input.schema.columns[index];
        schema.add_column(match alias {
            Some(alias) => Column::unqualified(alias.clone(), source.data_type),
            None => source.clone(),
        });
        positions.push(index);
    }

    let rows = input
        .rows
        .iter()
        .map(|row| Row::new(positions.iter().filter_map(|&i| row.get(i).cloned()).collect()))
        .collect();
    ResultSet::with_rows(schema, rows)
}

fn resolve_projection(schema: &Schema, name: &str) -> Option<usize> {
    match name.split_once('.') {
        Some((table, column)) => resolve_column(schema, Some(table), column),
        None => resolve_column(schema, None, name),
    }
}
