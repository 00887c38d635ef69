//! Physical plan representation.
//!
//! A plan is a tree of [`PlanNode`]s. Every node owns its children, carries
//! its output schema, planner statistics, and the cost written by the cost
//! model once the tree is priced.

use std::fmt;

use qopt_proto::{Expr, JoinKind, Schema};

use super::cost::CostEstimate;

/// Join algorithm chosen for a join node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinAlgorithm {
    NestedLoop,
    Hash,
    SortMerge,
}

impl JoinAlgorithm {
    /// All algorithms in enumeration order.
    pub const ALL: [JoinAlgorithm; 3] = [
        JoinAlgorithm::NestedLoop,
        JoinAlgorithm::Hash,
        JoinAlgorithm::SortMerge,
    ];

    /// Operator name of the node this algorithm produces.
    pub fn operator_name(&self) -> &'static str {
        match self {
            JoinAlgorithm::NestedLoop => "NestedLoopJoin",
            JoinAlgorithm::Hash => "HashJoin",
            JoinAlgorithm::SortMerge => "SortMergeJoin",
        }
    }
}

impl fmt::Display for JoinAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.operator_name())
    }
}

/// Logical join type recorded on a join node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinType {
    #[default]
    Inner,
    LeftOuter,
    RightOuter,
}

impl JoinType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JoinType::Inner => "INNER",
            JoinType::LeftOuter => "LEFT",
            JoinType::RightOuter => "RIGHT",
        }
    }
}

impl From<JoinKind> for JoinType {
    fn from(kind: JoinKind) -> Self {
        match kind {
            JoinKind::Inner => JoinType::Inner,
            JoinKind::Left => JoinType::LeftOuter,
            JoinKind::Right => JoinType::RightOuter,
        }
    }
}

/// Planner statistics attached to every node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Statistics {
    /// Estimated output rows.
    pub row_count: u64,
    /// Estimated output pages.
    pub page_count: u64,
    /// Fraction of input rows kept by this node.
    pub selectivity: f64,
}

impl Statistics {
    pub fn new(row_count: u64, page_count: u64) -> Self {
        Self {
            row_count,
            page_count,
            selectivity: 1.0,
        }
    }
}

impl Default for Statistics {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

/// Scan of a stored table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableScan {
    pub table_name: String,
    pub alias: Option<String>,
}

/// Row filter.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    /// Predicate evaluated per row.
    pub condition: Expr,
    /// Canonical text of `condition`.
    pub condition_text: String,
}

/// Column projection.
#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    /// Rendered select items; exactly `["*"]` means pass-through.
    pub projections: Vec<String>,
    /// Output alias per projection.
    pub aliases: Vec<Option<String>>,
}

impl Project {
    /// Whether this projection passes its input through unchanged.
    pub fn is_wildcard(&self) -> bool {
        self.projections.len() == 1 && self.projections[0] == "*"
    }
}

/// Join payload shared by the three join operators.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub join_type: JoinType,
    /// Join condition.
    pub condition: Expr,
    /// Canonical text of `condition`.
    pub condition_text: String,
}

/// Operator of a plan node.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanOperator {
    TableScan(TableScan),
    Filter(Filter),
    Project(Project),
    NestedLoopJoin(Join),
    HashJoin(Join),
    SortMergeJoin(Join),
}

impl PlanOperator {
    /// Operator name, e.g. `HashJoin`.
    pub fn name(&self) -> &'static str {
        match self {
            PlanOperator::TableScan(_) => "TableScan",
            PlanOperator::Filter(_) => "Filter",
            PlanOperator::Project(_) => "Project",
            PlanOperator::NestedLoopJoin(_) => "NestedLoopJoin",
            PlanOperator::HashJoin(_) => "HashJoin",
            PlanOperator::SortMergeJoin(_) => "SortMergeJoin",
        }
    }

    /// Number of children this operator requires.
    pub fn arity(&self) -> usize {
        match self {
            PlanOperator::TableScan(_) => 0,
            PlanOperator::Filter(_) | PlanOperator::Project(_) => 1,
            PlanOperator::NestedLoopJoin(_)
            | PlanOperator::HashJoin(_)
            | PlanOperator::SortMergeJoin(_) => 2,
        }
    }

    /// Join payload and algorithm, for join operators.
    pub fn as_join(&self) -> Option<(JoinAlgorithm, &Join)> {
        match self {
            PlanOperator::NestedLoopJoin(join) => Some((JoinAlgorithm::NestedLoop, join)),
            PlanOperator::HashJoin(join) => Some((JoinAlgorithm::Hash, join)),
            PlanOperator::SortMergeJoin(join) => Some((JoinAlgorithm::SortMerge, join)),
            _ => None,
        }
    }

    /// Build the join operator for `algorithm`.
    pub fn join(algorithm: JoinAlgorithm, join: Join) -> Self {
        match algorithm {
            JoinAlgorithm::NestedLoop => PlanOperator::NestedLoopJoin(join),
            JoinAlgorithm::Hash => PlanOperator::HashJoin(join),
            JoinAlgorithm::SortMerge => PlanOperator::SortMergeJoin(join),
        }
    }

    /// Short operator detail used in plan rendering.
    pub fn detail(&self) -> String {
        match self {
            PlanOperator::TableScan(scan) => match &scan.alias {
                Some(alias) => format!("{} as {}", scan.table_name, alias),
                None => scan.table_name.clone(),
            },
            PlanOperator::Filter(filter) => filter.condition_text.clone(),
            PlanOperator::Project(project) => project
                .projections
                .iter()
                .zip(&project.aliases)
                .map(|(p, alias)| match alias {
                    Some(alias) => format!("{} AS {}", p, alias),
                    None => p.clone(),
                })
                .collect::<Vec<_>>()
                .join(", "),
            PlanOperator::NestedLoopJoin(join)
            | PlanOperator::HashJoin(join)
            | PlanOperator::SortMergeJoin(join) => {
                format!("{}, {}", join.join_type.as_str(), join.condition_text)
            }
        }
    }
}

/// A node of a physical plan.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanNode {
    pub operator: PlanOperator,
    /// Children in input order (left before right for joins).
    pub children: Vec<PlanNode>,
    pub output_schema: Schema,
    pub stats: Statistics,
    /// Written once by the cost model; zero until the plan is priced.
    pub cost: CostEstimate,
}

impl PlanNode {
    /// Create an unpriced node.
    pub fn new(
        operator: PlanOperator,
        children: Vec<PlanNode>,
        output_schema: Schema,
        stats: Statistics,
    ) -> Self {
        Self {
            operator,
            children,
            output_schema,
            stats,
            cost: CostEstimate::zero(),
        }
    }

    /// Names of the tables scanned in this subtree, left to right.
    pub fn table_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_tables(&mut names);
        names
    }

    fn collect_tables<'a>(&'a self, out: &mut Vec<&'a str>) {
        if let PlanOperator::TableScan(scan) = &self.operator {
            out.push(&scan.table_name);
        }
        for child in &self.children {
            child.collect_tables(out);
        }
    }

    /// Join algorithms used in this subtree, in pre-order.
    pub fn join_algorithms(&self) -> Vec<JoinAlgorithm> {
        let mut algorithms = Vec::new();
        self.visit(&mut |node| {
            if let Some((algorithm, _)) = node.operator.as_join() {
                algorithms.push(algorithm);
            }
        });
        algorithms
    }

    /// Number of nodes in this subtree.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(PlanNode::node_count).sum::<usize>()
    }

    /// Visit every node in pre-order.
    pub fn visit<F: FnMut(&PlanNode)>(&self, f: &mut F) {
        f(self);
        for child in &self.children {
            child.visit(f);
        }
    }
}

impl fmt::Display for PlanNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&super::explain::render_plan(self))
    }
}
