//! Parsed statement types consumed by the optimizer.
//!
//! A parser produces a [`SelectStatement`]; the optimizer reads it without
//! modification. Expressions render to a canonical, fully parenthesized text
//! form through `Display`, e.g. `(users.id = orders.user_id)`.
//!
//! Note: expressions are recursive, so these types derive serde only. Rows and
//! results in [`crate::result`] carry the rkyv derives.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Binary operator in an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    /// `=`
    Eq,
    /// `!=`
    NotEq,
    /// `>`
    Gt,
    /// `<`
    Lt,
    /// `>=`
    GtEq,
    /// `<=`
    LtEq,
    /// `AND`
    And,
    /// `OR`
    Or,
}

impl BinaryOp {
    /// Operator symbol used in canonical text.
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Eq => "=",
            BinaryOp::NotEq => "!=",
            BinaryOp::Gt => ">",
            BinaryOp::Lt => "<",
            BinaryOp::GtEq => ">=",
            BinaryOp::LtEq => "<=",
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
        }
    }

    /// Whether this operator compares two values.
    pub fn is_comparison(&self) -> bool {
        !self.is_logical()
    }

    /// Whether this operator combines two predicates.
    pub fn is_logical(&self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Expression tree node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// Column reference, optionally qualified by table name.
    Column {
        table: Option<String>,
        column: String,
    },
    /// Constant value.
    Literal(Value),
    /// Binary operation.
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
}

impl Expr {
    /// Unqualified column reference.
    pub fn column(column: impl Into<String>) -> Self {
        Expr::Column {
            table: None,
            column: column.into(),
        }
    }

    /// Column reference qualified by table name.
    pub fn qualified(table: impl Into<String>, column: impl Into<String>) -> Self {
        Expr::Column {
            table: Some(table.into()),
            column: column.into(),
        }
    }

    /// Literal value.
    pub fn literal(value: impl Into<Value>) -> Self {
        Expr::Literal(value.into())
    }

    /// Binary operation.
    pub fn binary(left: Expr, op: BinaryOp, right: Expr) -> Self {
        Expr::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    pub fn eq(left: Expr, right: Expr) -> Self {
        Self::binary(left, BinaryOp::Eq, right)
    }

    pub fn gt(left: Expr, right: Expr) -> Self {
        Self::binary(left, BinaryOp::Gt, right)
    }

    pub fn lt(left: Expr, right: Expr) -> Self {
        Self::binary(left, BinaryOp::Lt, right)
    }

    pub fn and(left: Expr, right: Expr) -> Self {
        Self::binary(left, BinaryOp::And, right)
    }

    pub fn or(left: Expr, right: Expr) -> Self {
        Self::binary(left, BinaryOp::Or, right)
    }

    /// Whether this expression is a binary operation.
    pub fn is_binary(&self) -> bool {
        matches!(self, Expr::Binary { .. })
    }

    /// Qualified name for a column reference (`table.column` or `column`).
    pub fn column_name(&self) -> Option<String> {
        match self {
            Expr::Column {
                table: Some(table),
                column,
            } => Some(format!("{}.{}", table, column)),
            Expr::Column { table: None, column } => Some(column.clone()),
            _ => None,
        }
    }

    /// Table qualifiers referenced anywhere in this expression.
    pub fn referenced_tables(&self) -> Vec<&str> {
        let mut tables = Vec::new();
        self.collect_tables(&mut tables);
        tables
    }

    fn collect_tables<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Column {
                table: Some(table), ..
            } => {
                if !out.contains(&table.as_str()) {
                    out.push(table);
                }
            }
            Expr::Column { .. } | Expr::Literal(_) => {}
            Expr::Binary { left, right, .. } => {
                left.collect_tables(out);
                right.collect_tables(out);
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Column {
                table: Some(table),
                column,
            } => write!(f, "{}.{}", table, column),
            Expr::Column { table: None, column } => f.write_str(column),
            Expr::Literal(value) => write!(f, "{}", value),
            Expr::Binary { left, op, right } => write!(f, "({} {} {})", left, op, right),
        }
    }
}

/// One item of the select list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectItem {
    /// Selected expression (`*` is a bare column named `*`).
    pub expr: Expr,
    /// Output alias.
    pub alias: Option<String>,
}

impl SelectItem {
    /// Select an expression without alias.
    pub fn new(expr: Expr) -> Self {
        Self { expr, alias: None }
    }

    /// The `*` item.
    pub fn wildcard() -> Self {
        Self::new(Expr::column("*"))
    }

    /// Set the output alias.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Whether this item is the `*` wildcard.
    pub fn is_wildcard(&self) -> bool {
        matches!(&self.expr, Expr::Column { table: None, column } if column == "*")
    }
}

/// Table reference in FROM or JOIN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRef {
    /// Table name.
    pub name: String,
    /// Optional alias.
    pub alias: Option<String>,
}

impl TableRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }
}

/// Join kind as written in the statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum JoinKind {
    #[default]
    Inner,
    Left,
    Right,
}

/// A `JOIN table ON condition` clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinClause {
    /// Join kind.
    pub kind: JoinKind,
    /// Joined table.
    pub table: TableRef,
    /// Join condition.
    pub condition: Expr,
}

impl JoinClause {
    /// Inner join on `condition`.
    pub fn inner(table: TableRef, condition: Expr) -> Self {
        Self {
            kind: JoinKind::Inner,
            table,
            condition,
        }
    }

    /// Set the join kind.
    pub fn with_kind(mut self, kind: JoinKind) -> Self {
        self.kind = kind;
        self
    }
}

/// A single-statement `SELECT ... FROM ... [JOIN ...] [WHERE ...]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectStatement {
    /// Select list; never empty for a valid statement.
    pub select_list: Vec<SelectItem>,
    /// FROM table.
    pub from: TableRef,
    /// Join clauses in written order.
    pub joins: Vec<JoinClause>,
    /// WHERE predicate.
    pub where_clause: Option<Expr>,
}

impl SelectStatement {
    /// `SELECT * FROM table`.
    pub fn new(from: TableRef) -> Self {
        Self {
            select_list: vec![SelectItem::wildcard()],
            from,
            joins: vec![],
            where_clause: None,
        }
    }

    /// Replace the select list.
    pub fn with_select_list(mut self, items: Vec<SelectItem>) -> Self {
        self.select_list = items;
        self
    }

    /// Append a join clause.
    pub fn join(mut self, clause: JoinClause) -> Self {
        self.joins.push(clause);
        self
    }

    /// Set the WHERE predicate.
    pub fn with_where(mut self, predicate: Expr) -> Self {
        self.where_clause = Some(predicate);
        self
    }
}
