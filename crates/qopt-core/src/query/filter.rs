//! Predicate evaluation for query execution.
//!
//! This module provides the `FilterEvaluator` that evaluates expression trees
//! carried on filter and join nodes against rows of a result set.

use std::cmp::Ordering;

use thiserror::Error;

use qopt_proto::{BinaryOp, Expr, Row, Schema, Value};

/// Why a row could not be evaluated. Callers treat it as a non-match.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredicateError {
    /// The column is not part of the row's schema.
    #[error("column not found: {0}")]
    ColumnNotFound(String),

    /// The two operands cannot be compared.
    #[error("cannot compare {left} with {right}")]
    TypeMismatch { left: String, right: String },

    /// The expression does not produce a boolean.
    #[error("not a predicate: {0}")]
    NotAPredicate(String),
}

/// Evaluates predicates against rows.
pub struct FilterEvaluator;

impl FilterEvaluator {
    /// Evaluate `predicate` against `row`, laid out according to `schema`.
    pub fn evaluate(predicate: &Expr, row: &Row, schema: &Schema) -> Result<bool, PredicateError> {
        match predicate {
            Expr::Binary {
                left,
                op: BinaryOp::And,
                right,
            } => Ok(Self::evaluate(left, row, schema)? && Self::evaluate(right, row, schema)?),
            Expr::Binary {
                left,
                op: BinaryOp::Or,
                right,
            } => {
                // Either side matching is enough, even if the other fails.
                let lhs = Self::evaluate(left, row, schema);
                if matches!(lhs, Ok(true)) {
                    return lhs;
                }
                match Self::evaluate(right, row, schema) {
                    Ok(true) => Ok(true),
                    rhs => lhs.and(rhs),
                }
            }
            Expr::Binary { left, op, right } => {
                let lhs = Self::operand(left, row, schema)?;
                let rhs = Self::operand(right, row, schema)?;
                Self::compare(lhs, *op, rhs)
            }
            other => Err(PredicateError::NotAPredicate(other.to_string())),
        }
    }

    /// Like [`FilterEvaluator::evaluate`], with evaluation errors counted as
    /// non-matching rows.
    pub fn matches(predicate: &Expr, row: &Row, schema: &Schema) -> bool {
        Self::evaluate(predicate, row, schema).unwrap_or(false)
    }

    fn operand<'r>(
        expr: &'r Expr,
        row: &'r Row,
        schema: &Schema,
    ) -> Result<&'r Value, PredicateError> {
        match expr {
            Expr::Column { table, column } => {
                let index = resolve_column(schema, table.as_deref(), column)
                    .ok_or_else(|| PredicateError::ColumnNotFound(expr.to_string()))?;
                row.get(index)
                    .ok_or_else(|| PredicateError::ColumnNotFound(expr.to_string()))
            }
            Expr::Literal(value) => Ok(value),
            Expr::Binary { .. } => Err(PredicateError::NotAPredicate(expr.to_string())),
        }
    }

    fn compare(lhs: &Value, op: BinaryOp, rhs: &Value) -> Result<bool, PredicateError> {
        let ordering = match (lhs, rhs) {
            // Comparisons with null never match.
            (Value::Null, _) | (_, Value::Null) => return Ok(false),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (a, b) => {
                return Err(PredicateError::TypeMismatch {
                    left: a.to_string(),
                    right: b.to_string(),
                })
            }
        };

        Ok(match op {
            BinaryOp::Eq => ordering == Ordering::Equal,
            BinaryOp::NotEq => ordering != Ordering::Equal,
            BinaryOp::Gt => ordering == Ordering::Greater,
            BinaryOp::Lt => ordering == Ordering::Less,
            BinaryOp::GtEq => ordering != Ordering::Less,
            BinaryOp::LtEq => ordering != Ordering::Greater,
            BinaryOp::And | BinaryOp::Or => {
                return Err(PredicateError::NotAPredicate(format!("{} {} {}", lhs, op, rhs)))
            }
        })
    }
}

/// Position of a column reference in `schema`.
///
/// A qualifier must name the column's table or the alias it was scanned
/// under; a qualifier naming anything else resolves to nothing.
pub fn resolve_column(schema: &Schema, table: Option<&str>, column: &str) -> Option<usize> {
    match table {
        Some(table) => schema
            .columns
            .iter()
            .position(|c| c.column_name == column && c.is_qualified_by(table)),
        None => schema.index_of(column),
    }
}
