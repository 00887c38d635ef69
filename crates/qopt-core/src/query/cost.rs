//! Cost model for query planning.
//!
//! This module prices plan nodes in abstract I/O and CPU units so the
//! optimizer can compare candidate plans. Every estimate is derived from the
//! statistics catalog and the already-priced children of a node; children
//! are never modified while their parent is priced.

use crate::catalog::{StatisticsCatalog, DEFAULT_SELECTIVITY};

use super::plan::{JoinAlgorithm, PlanNode, PlanOperator};

/// Fixed cost model tuning constants.
pub struct CostConstants;

impl CostConstants {
    /// Reading one page sequentially.
    pub const SEQUENTIAL_IO_COST: f64 = 1.0;
    /// Reading one page at a random position.
    pub const RANDOM_IO_COST: f64 = 4.0;
    /// Producing one tuple from a scan.
    pub const CPU_TUPLE_COST: f64 = 0.01;
    /// Applying an operator to one tuple.
    pub const CPU_OPERATOR_COST: f64 = 0.0025;
    /// Multiplier for in-memory sorting.
    pub const MEMORY_SORT_COST: f64 = 2.0;
    /// Inserting one tuple into a hash table.
    pub const HASH_BUILD_COST: f64 = 1.0;
    /// Probing a hash table with one tuple.
    pub const HASH_PROBE_COST: f64 = 0.5;
    /// Join selectivity for range conditions.
    pub const RANGE_JOIN_SELECTIVITY: f64 = 0.33;
    /// Row count assumed for tables without statistics.
    pub const DEFAULT_CARDINALITY: u64 = 1000;
    /// Scan cost assumed for tables without statistics, as (io, cpu).
    pub const UNKNOWN_SCAN_COST: (f64, f64) = (10.0, 1.0);
    /// Tuples per page when converting cardinalities into pages.
    pub const TUPLES_PER_PAGE: u64 = 100;
}

/// Cost estimate for a plan or sub-plan.
///
/// `total_cost` is always `io_cost + cpu_cost`. Only `total_cost` is used to
/// order two estimates.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CostEstimate {
    /// Modeled page I/O.
    pub io_cost: f64,
    /// Modeled per-tuple work.
    pub cpu_cost: f64,
    /// Sum of both.
    pub total_cost: f64,
}

impl CostEstimate {
    /// Create a new cost estimate.
    pub fn new(io_cost: f64, cpu_cost: f64) -> Self {
        Self {
            io_cost,
            cpu_cost,
            total_cost: io_cost + cpu_cost,
        }
    }

    /// Create a zero-cost estimate.
    pub fn zero() -> Self {
        Self::default()
    }

    /// Add another cost estimate to this one.
    pub fn add(&self, other: &CostEstimate) -> CostEstimate {
        CostEstimate::new(self.io_cost + other.io_cost, self.cpu_cost + other.cpu_cost)
    }

    /// Whether this estimate is strictly cheaper than `other`.
    pub fn is_cheaper_than(&self, other: &CostEstimate) -> bool {
        self.total_cost < other.total_cost
    }
}

/// Cost and output cardinality of a priced subtree.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NodeEstimate {
    pub cost: CostEstimate,
    pub cardinality: u64,
}

/// Cost model for query planning decisions.
pub struct CostModel<'a> {
    catalog: &'a StatisticsCatalog,
}

impl<'a> CostModel<'a> {
    /// Create a new cost model with statistics reference.
    pub fn new(catalog: &'a StatisticsCatalog) -> Self {
        Self { catalog }
    }

    /// Cost of scanning `table` in full.
    pub fn estimate_table_scan_cost(&self, table: &str) -> CostEstimate {
        match self.catalog.get(table) {
            Some(stats) => CostEstimate::new(
                stats.page_count as f64 * CostConstants::SEQUENTIAL_IO_COST,
                stats.tuple_count as f64 * CostConstants::CPU_TUPLE_COST,
            ),
            None => {
                let (io, cpu) = CostConstants::UNKNOWN_SCAN_COST;
                CostEstimate::new(io, cpu)
            }
        }
    }

    /// Rows produced by scanning `table`.
    pub fn estimate_table_cardinality(&self, table: &str) -> u64 {
        self.catalog
            .get(table)
            .map(|stats| stats.tuple_count)
            .unwrap_or(CostConstants::DEFAULT_CARDINALITY)
    }

    /// Cost of filtering `input`: one operator application per input row.
    pub fn estimate_filter_cost(&self, input: &NodeEstimate) -> CostEstimate {
        CostEstimate::new(
            input.cost.io_cost,
            input.cost.cpu_cost + input.cardinality as f64 * CostConstants::CPU_OPERATOR_COST,
        )
    }

    /// Cost of projecting `input`: half an operator application per row.
    pub fn estimate_project_cost(&self, input: &NodeEstimate) -> CostEstimate {
        CostEstimate::new(
            input.cost.io_cost,
            input.cost.cpu_cost
                + input.cardinality as f64 * CostConstants::CPU_OPERATOR_COST * 0.5,
        )
    }

    /// Cost of joining two priced inputs with `algorithm`.
    pub fn estimate_join_cost(
        &self,
        algorithm: JoinAlgorithm,
        left: &NodeEstimate,
        right: &NodeEstimate,
    ) -> CostEstimate {
        let base = left.cost.add(&right.cost);
        let left_card = left.cardinality as f64;
        let right_card = right.cardinality as f64;

        match algorithm {
            JoinAlgorithm::NestedLoop => {
                // Every left row rescans the right input.
                let right_pages = pages(right.cardinality) as f64;
                CostEstimate::new(
                    base.io_cost + left_card * right_pages * CostConstants::RANDOM_IO_COST,
                    base.cpu_cost + left_card * right_card * CostConstants::CPU_OPERATOR_COST,
                )
            }
            JoinAlgorithm::Hash => {
                let (build, probe) = if left.cardinality <= right.cardinality {
                    (left.cardinality, right.cardinality)
                } else {
                    (right.cardinality, left.cardinality)
                };
                CostEstimate::new(
                    base.io_cost + pages(build) as f64 * CostConstants::SEQUENTIAL_IO_COST,
                    base.cpu_cost
                        + build as f64 * CostConstants::HASH_BUILD_COST
                        + probe as f64 * CostConstants::HASH_PROBE_COST,
                )
            }
            JoinAlgorithm::SortMerge => CostEstimate::new(
                base.io_cost,
                // Grouped so swapping the inputs gives the identical total.
                base.cpu_cost
                    + (sort_cost(left.cardinality) + sort_cost(right.cardinality))
                    + (left_card + right_card) * CostConstants::CPU_OPERATOR_COST,
            ),
        }
    }

    /// Join selectivity from the condition text: equality-like conditions
    /// keep 10%, range conditions 33%.
    pub fn estimate_join_selectivity(&self, condition_text: &str) -> f64 {
        if condition_text.contains('=') {
            DEFAULT_SELECTIVITY
        } else if condition_text.contains('>') || condition_text.contains('<') {
            CostConstants::RANGE_JOIN_SELECTIVITY
        } else {
            DEFAULT_SELECTIVITY
        }
    }

    /// Estimated output rows of `node`.
    pub fn estimate_output_cardinality(&self, node: &PlanNode) -> u64 {
        self.estimate(node).cardinality
    }

    /// Estimated cost of the whole subtree rooted at `node`.
    pub fn estimate_plan_cost(&self, node: &PlanNode) -> CostEstimate {
        self.estimate(node).cost
    }

    /// Price `node` bottom-up without modifying it.
    pub fn estimate(&self, node: &PlanNode) -> NodeEstimate {
        let children: Vec<NodeEstimate> = node.children.iter().map(|c| self.estimate(c)).collect();
        self.estimate_operator(node, &children)
    }

    /// Price `node` bottom-up and write each node's cost onto it.
    ///
    /// Returns the cost of the root.
    pub fn annotate(&self, node: &mut PlanNode) -> CostEstimate {
        self.annotate_node(node).cost
    }

    fn annotate_node(&self, node: &mut PlanNode) -> NodeEstimate {
        let children: Vec<NodeEstimate> = node
            .children
            .iter_mut()
            .map(|c| self.annotate_node(c))
            .collect();
        let estimate = self.estimate_operator(node, &children);
        node.cost = estimate.cost;
        estimate
    }

    /// Price one node given its children's estimates. A missing child is
    /// priced as an empty input.
    fn estimate_operator(&self, node: &PlanNode, children: &[NodeEstimate]) -> NodeEstimate {
        let child = |i: usize| children.get(i).copied().unwrap_or_default();

        match &node.operator {
            PlanOperator::TableScan(scan) => NodeEstimate {
                cost: self.estimate_table_scan_cost(&scan.table_name),
                cardinality: self.estimate_table_cardinality(&scan.table_name),
            },
            PlanOperator::Filter(filter) => {
                let input = child(0);
                let tables = node.table_names();
                let selectivity = self
                    .catalog
                    .estimate_predicate_selectivity(&filter.condition, &tables);
                NodeEstimate {
                    cost: self.estimate_filter_cost(&input),
                    cardinality: scale(input.cardinality, selectivity),
                }
            }
            PlanOperator::Project(_) => {
                let input = child(0);
                NodeEstimate {
                    cost: self.estimate_project_cost(&input),
                    cardinality: input.cardinality,
                }
            }
            PlanOperator::NestedLoopJoin(join)
            | PlanOperator::HashJoin(join)
            | PlanOperator::SortMergeJoin(join) => {
                let (left, right) = (child(0), child(1));
                let algorithm = node
                    .operator
                    .as_join()
                    .map_or(JoinAlgorithm::NestedLoop, |(algorithm, _)| algorithm);
                let selectivity = self.estimate_join_selectivity(&join.condition_text);
                NodeEstimate {
                    cost: self.estimate_join_cost(algorithm, &left, &right),
                    cardinality: scale(left.cardinality.saturating_mul(right.cardinality), selectivity),
                }
            }
        }
    }
}

/// Pages needed for `cardinality` rows, at least one.
fn pages(cardinality: u64) -> u64 {
    (cardinality / CostConstants::TUPLES_PER_PAGE).max(1)
}

/// In-memory sort cost: `n log2 n` comparisons, zero for `n <= 1`.
fn sort_cost(cardinality: u64) -> f64 {
    if cardinality <= 1 {
        return 0.0;
    }
    let n = cardinality as f64;
    n * n.log2() * CostConstants::CPU_OPERATOR_COST * CostConstants::MEMORY_SORT_COST
}

fn scale(cardinality: u64, selectivity: f64) -> u64 {
    (cardinality as f64 * selectivity).floor() as u64
}
