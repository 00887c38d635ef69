//! Join algorithms over materialized inputs.
//!
//! This module provides the three physical joins the optimizer chooses from:
//! - NestedLoop: pairs every left row with every right row
//! - Hash: builds a table on the left key, probes with the right key
//! - SortMerge: sorts both inputs by key and merges equal-key runs
//!
//! Hash and sort-merge joins are integer equi-joins on one key column per
//! side. Rows whose key is not an integer never join.

use std::collections::HashMap;

use qopt_proto::{BinaryOp, Expr, ResultSet, Row, Schema};

use crate::config::JoinKeyMode;

use super::filter::{resolve_column, FilterEvaluator};
use super::plan::JoinAlgorithm;

/// Key column positions for an equi-join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinKeys {
    /// Key position in the left input.
    pub left: usize,
    /// Key position in the right input.
    pub right: usize,
}

impl JoinKeys {
    /// Left column 0 against right column 1.
    pub const FIXED: JoinKeys = JoinKeys { left: 0, right: 1 };

    /// Pick key columns for `condition` according to `mode`.
    ///
    /// In [`JoinKeyMode::Resolve`] an `a = b` condition is matched against
    /// the input schemas in either orientation. Anything else uses
    /// [`JoinKeys::FIXED`].
    pub fn resolve(condition: &Expr, left: &Schema, right: &Schema, mode: JoinKeyMode) -> Self {
        if mode == JoinKeyMode::FixedPositions {
            return Self::FIXED;
        }

        let (a, b) = match condition {
            Expr::Binary {
                left: a,
                op: BinaryOp::Eq,
                right: b,
            } => (a.as_ref(), b.as_ref()),
            _ => return Self::FIXED,
        };

        let position = |expr: &Expr, schema: &Schema| match expr {
            Expr::Column { table, column } => resolve_column(schema, table.as_deref(), column),
            _ => None,
        };

        let orientations = [
            (position(a, left), position(b, right)),
            (position(b, left), position(a, right)),
        ];
        orientations
            .into_iter()
            .find_map(|pair| match pair {
                (Some(l), Some(r)) => Some(JoinKeys { left: l, right: r }),
                _ => None,
            })
            .unwrap_or(Self::FIXED)
    }
}

/// Nested loop join executor.
///
/// Algorithm:
/// For each left row, for each right row, emit the concatenation, optionally
/// keeping only pairs that satisfy the join condition.
///
/// Complexity: O(N * M)
pub struct NestedLoopExecutor;

impl NestedLoopExecutor {
    /// Join `left` and `right`. Without a condition this is the full cross
    /// product of `left.len() * right.len()` rows.
    pub fn execute(left: &ResultSet, right: &ResultSet, condition: Option<&Expr>) -> ResultSet {
        let schema = Schema::concat(&left.schema, &right.schema);
        let mut result = ResultSet::new(schema);

        for l in &left.rows {
            for r in &right.rows {
                let row = Row::concat(l, r);
                let keep = match condition {
                    Some(cond) => FilterEvaluator::matches(cond, &row, &result.schema),
                    None => true,
                };
                if keep {
                    result.add_row(row);
                }
            }
        }

        result
    }
}

/// Hash join executor.
///
/// Algorithm:
/// 1. Build phase: index every left row by its integer key
/// 2. Probe phase: for each right row, emit every left row with the same key
///
/// Complexity: O(N + M) plus output size
pub struct HashJoinExecutor;

impl HashJoinExecutor {
    /// Join `left` and `right` on `keys`.
    pub fn execute(left: &ResultSet, right: &ResultSet, keys: JoinKeys) -> ResultSet {
        let schema = Schema::concat(&left.schema, &right.schema);
        let mut result = ResultSet::new(schema);

        // Build phase
        let mut table: HashMap<i64, Vec<&Row>> = HashMap::new();
        for row in &left.rows {
            if let Some(key) = row.get_int(keys.left) {
                table.entry(key).or_default().push(row);
            }
        }

        // Probe phase
        for r in &right.rows {
            let Some(key) = r.get_int(keys.right) else {
                continue;
            };
            if let Some(matches) = table.get(&key) {
                for l in matches {
                    result.add_row(Row::concat(l, r));
                }
            }
        }

        result
    }
}

/// Sort-merge join executor.
///
/// Algorithm:
/// 1. Sort both inputs by their integer key, dropping rows without one
/// 2. Advance the side with the smaller key
/// 3. On equal keys, emit the cross product of both equal-key runs
///
/// Complexity: O(N log N + M log M) plus output size
pub struct SortMergeExecutor;

impl SortMergeExecutor {
    /// Join `left` and `right` on `keys`.
    pub fn execute(left: &ResultSet, right: &ResultSet, keys: JoinKeys) -> ResultSet {
        let schema = Schema::concat(&left.schema, &right.schema);
        let mut result = ResultSet::new(schema);

        let left_sorted = sorted_by_key(&left.rows, keys.left);
        let right_sorted = sorted_by_key(&right.rows, keys.right);

        let (mut i, mut j) = (0, 0);
        while i < left_sorted.len() && j < right_sorted.len() {
            let (lk, rk) = (left_sorted[i].0, right_sorted[j].0);
            if lk < rk {
                i += 1;
            } else if lk > rk {
                j += 1;
            } else {
                let left_end = run_end(&left_sorted, i);
                let right_end = run_end(&right_sorted, j);
                for (_, l) in &left_sorted[i..left_end] {
                    for (_, r) in &right_sorted[j..right_end] {
                        result.add_row(Row::concat(l, r));
                    }
                }
                i = left_end;
                j = right_end;
            }
        }

        result
    }
}

fn sorted_by_key(rows: &[Row], position: usize) -> Vec<(i64, &Row)> {
    let mut keyed: Vec<(i64, &Row)> = rows
        .iter()
        .filter_map(|row| row.get_int(position).map(|key| (key, row)))
        .collect();
    keyed.sort_by_key(|(key, _)| *key);
    keyed
}

/// End of the run of equal keys starting at `start`.
fn run_end(rows: &[(i64, &Row)], start: usize) -> usize {
    let key = rows[start].0;
    rows[start..]
        .iter()
        .position(|(k, _)| *k != key)
        .map_or(rows.len(), |offset| start + offset)
}

/// Execute a join using the specified algorithm.
///
/// `nested_condition` is only consulted by nested-loop joins.
pub fn execute_join(
    algorithm: JoinAlgorithm,
    left: &ResultSet,
    right: &ResultSet,
    keys: JoinKeys,
    nested_condition: Option<&Expr>,
) -> ResultSet {
    match algorithm {
        JoinAlgorithm::NestedLoop => NestedLoopExecutor::execute(left, right, nested_condition),
        JoinAlgorithm::Hash => HashJoinExecutor::execute(left, right, keys),
        JoinAlgorithm::SortMerge => SortMergeExecutor::execute(left, right, keys),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qopt_proto::{Column, DataType, Value};

    fn users() -> ResultSet {
        let schema = Schema::new(vec![
            Column::new("users", "id", DataType::Int),
            Column::new("users", "name", DataType::String),
        ]);
        let rows = (1..=3)
            .map(|i| Row::new(vec![Value::Int(i), Value::String(format!("User{}", i))]))
            .collect();
        ResultSet::with_rows(schema, rows)
    }

    fn orders() -> ResultSet {
        let schema = Schema::new(vec![
            Column::new("orders", "id", DataType::Int),
            Column::new("orders", "user_id", DataType::Int),
        ]);
        let rows = vec![
            Row::new(vec![10.into(), 1.into()]),
            Row::new(vec![11.into(), 1.into()]),
            Row::new(vec![12.into(), 3.into()]),
            Row::new(vec![13.into(), Value::Null]),
            Row::new(vec![14.into(), 9.into()]),
        ];
        ResultSet::with_rows(schema, rows)
    }

    fn condition() -> Expr {
        Expr::eq(Expr::qualified("users", "id"), Expr::qualified("orders", "user_id"))
    }

    fn sorted_pairs(rs: &ResultSet) -> Vec<(i64, i64)> {
        let mut pairs: Vec<_> = rs
            .rows
            .iter()
            .map(|r| (r.get_int(0).unwrap(), r.get_int(2).unwrap()))
            .collect();
        pairs.sort();
        pairs
    }

    #[test]
    fn test_resolve_keys() {
        let (l, r) = (users(), orders());
        let keys = JoinKeys::resolve(&condition(), &l.schema, &r.schema, JoinKeyMode::Resolve);
        assert_eq!(keys, JoinKeys { left: 0, right: 1 });

        // Written the other way round.
        let flipped = Expr::eq(Expr::qualified("orders", "user_id"), Expr::qualified("users", "id"));
        let keys = JoinKeys::resolve(&flipped, &l.schema, &r.schema, JoinKeyMode::Resolve);
        assert_eq!(keys, JoinKeys { left: 0, right: 1 });

        // Swapped inputs.
        let keys = JoinKeys::resolve(&condition(), &r.schema, &l.schema, JoinKeyMode::Resolve);
        assert_eq!(keys, JoinKeys { left: 1, right: 0 });

        let range = Expr::gt(Expr::qualified("users", "id"), Expr::qualified("orders", "user_id"));
        let keys = JoinKeys::resolve(&range, &r.schema, &l.schema, JoinKeyMode::Resolve);
        assert_eq!(keys, JoinKeys::FIXED);

        let keys =
            JoinKeys::resolve(&condition(), &r.schema, &l.schema, JoinKeyMode::FixedPositions);
        assert_eq!(keys, JoinKeys::FIXED);
    }

    fn with_alias(rs: ResultSet, alias: &str) -> ResultSet {
        let columns = rs
            .schema
            .columns
            .into_iter()
            .map(|c| c.with_table_alias(alias))
            .collect();
        ResultSet::with_rows(Schema::new(columns), rs.rows)
    }

    #[test]
    fn test_resolve_keys_by_alias() {
        let (l, r) = (with_alias(users(), "u"), with_alias(orders(), "o"));
        let aliased = Expr::eq(Expr::qualified("o", "user_id"), Expr::qualified("u", "id"));
        let keys = JoinKeys::resolve(&aliased, &l.schema, &r.schema, JoinKeyMode::Resolve);
        assert_eq!(keys, JoinKeys { left: 0, right: 1 });

        // `o.id` must not fall back to `users.id`.
        let (l, r) = (users(), with_alias(orders(), "o"));
        let other = Expr::eq(Expr::qualified("x", "id"), Expr::qualified("o", "id"));
        let keys = JoinKeys::resolve(&other, &l.schema, &r.schema, JoinKeyMode::Resolve);
        assert_eq!(keys, JoinKeys::FIXED);
    }

    #[test]
    fn test_nested_loop_cross_product() {
        let result = NestedLoopExecutor::execute(&users(), &orders(), None);
        assert_eq!(result.len(), 15);
        assert_eq!(result.schema.column_count(), 4);
    }

    #[test]
    fn test_nested_loop_with_condition() {
        let cond = condition();
        let result = NestedLoopExecutor::execute(&users(), &orders(), Some(&cond));
        assert_eq!(sorted_pairs(&result), vec![(1, 10), (1, 11), (3, 12)]);
    }

    #[test]
    fn test_hash_join() {
        let result = HashJoinExecutor::execute(&users(), &orders(), JoinKeys::FIXED);
        assert_eq!(sorted_pairs(&result), vec![(1, 10), (1, 11), (3, 12)]);
        // Probe order is preserved.
        assert_eq!(result.rows[0].get_int(2), Some(10));
    }

    #[test]
    fn test_sort_merge_join() {
        let result = SortMergeExecutor::execute(&users(), &orders(), JoinKeys::FIXED);
        assert_eq!(sorted_pairs(&result), vec![(1, 10), (1, 11), (3, 12)]);
    }

    #[test]
    fn test_sort_merge_duplicate_keys_on_both_sides() {
        let schema = Schema::new(vec![
            Column::unqualified("k", DataType::Int),
            Column::unqualified("v", DataType::Int),
        ]);
        let left = ResultSet::with_rows(
            schema.clone(),
            vec![
                Row::new(vec![2.into(), 0.into()]),
                Row::new(vec![2.into(), 1.into()]),
                Row::new(vec![1.into(), 2.into()]),
            ],
        );
        let right = ResultSet::with_rows(
            schema,
            vec![
                Row::new(vec![0.into(), 2.into()]),
                Row::new(vec![1.into(), 2.into()]),
                Row::new(vec![2.into(), 2.into()]),
                Row::new(vec![3.into(), 7.into()]),
            ],
        );

        let merge = SortMergeExecutor::execute(&left, &right, JoinKeys::FIXED);
        let hash = HashJoinExecutor::execute(&left, &right, JoinKeys::FIXED);
        assert_eq!(merge.len(), 6);
        assert_eq!(hash.len(), 6);
    }

    #[test]
    fn test_empty_inputs() {
        let empty = ResultSet::new(users().schema);
        for algorithm in JoinAlgorithm::ALL {
            let result = execute_join(algorithm, &empty, &orders(), JoinKeys::FIXED, None);
            assert!(result.is_empty());
            assert_eq!(result.schema.column_count(), 4);
        }
    }

    #[test]
    fn test_execute_join_agreement() {
        let keys = JoinKeys::FIXED;
        let cond = condition();
        let hash = execute_join(JoinAlgorithm::Hash, &users(), &orders(), keys, None);
        let merge = execute_join(JoinAlgorithm::SortMerge, &users(), &orders(), keys, None);
        let nested = execute_join(JoinAlgorithm::NestedLoop, &users(), &orders(), keys, Some(&cond));

        assert_eq!(sorted_pairs(&hash), sorted_pairs(&merge));
        assert_eq!(sorted_pairs(&hash), sorted_pairs(&nested));
    }
}
