//! Table statistics used for cardinality and cost estimation.
//!
//! Statistics are injected by the caller; nothing here scans data.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;

use qopt_proto::{BinaryOp, Expr};

use crate::error::Error;

/// Selectivity assumed for predicates with no recorded statistics.
pub const DEFAULT_SELECTIVITY: f64 = 0.1;

/// Tuple width assumed when none is given.
pub const DEFAULT_TUPLE_WIDTH: u32 = 100;

fn default_tuple_width() -> u32 {
    DEFAULT_TUPLE_WIDTH
}

/// Statistics for a single table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableStatistics {
    /// Number of rows.
    pub tuple_count: u64,
    /// Number of storage pages.
    pub page_count: u64,
    /// Average row width in bytes.
    #[serde(default = "default_tuple_width")]
    pub tuple_width: u32,
    /// Selectivity per predicate key, e.g. `"age > 25" -> 0.88`.
    #[serde(default)]
    pub column_selectivity: BTreeMap<String, f64>,
    /// Distinct value count per column.
    #[serde(default)]
    pub distinct_values: BTreeMap<String, u64>,
}

impl Default for TableStatistics {
    fn default() -> Self {
        Self {
            tuple_count: 0,
            page_count: 0,
            tuple_width: DEFAULT_TUPLE_WIDTH,
            column_selectivity: BTreeMap::new(),
            distinct_values: BTreeMap::new(),
        }
    }
}

impl TableStatistics {
    /// Create statistics with row and page counts.
    pub fn new(tuple_count: u64, page_count: u64) -> Self {
        Self {
            tuple_count,
            page_count,
            ..Default::default()
        }
    }

    /// Set the average row width.
    pub fn with_tuple_width(mut self, width: u32) -> Self {
        self.tuple_width = width;
        self
    }

    /// Record the selectivity of a predicate key.
    pub fn with_selectivity(mut self, predicate: impl Into<String>, selectivity: f64) -> Self {
        self.column_selectivity
            .insert(predicate.into(), clamp_selectivity(selectivity));
        self
    }

    /// Record the distinct value count of a column.
    pub fn with_distinct_values(mut self, column: impl Into<String>, count: u64) -> Self {
        self.distinct_values.insert(column.into(), count);
        self
    }

    /// Selectivity of `predicate`, or [`DEFAULT_SELECTIVITY`] when unknown.
    pub fn get_selectivity(&self, predicate: &str) -> f64 {
        self.column_selectivity
            .get(predicate)
            .copied()
            .unwrap_or(DEFAULT_SELECTIVITY)
    }

    /// Distinct value count of `column`, if recorded.
    pub fn distinct(&self, column: &str) -> Option<u64> {
        self.distinct_values.get(column).copied()
    }
}

/// Statistics for every known table.
///
/// Owned by the optimizer; several catalogs can coexist.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatisticsCatalog {
    tables: HashMap<String, TableStatistics>,
}

impl StatisticsCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a catalog from a JSON object keyed by table name.
    ///
    /// Selectivities outside `0.0..=1.0` are clamped, as with
    /// [`TableStatistics::with_selectivity`].
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let mut catalog: Self =
            serde_json::from_str(json).map_err(|e| Error::Serialization(e.to_string()))?;
        for stats in catalog.tables.values_mut() {
            for selectivity in stats.column_selectivity.values_mut() {
                *selectivity = clamp_selectivity(*selectivity);
            }
        }
        Ok(catalog)
    }

    /// Encode the catalog as JSON.
    pub fn to_json(&self) -> Result<String, Error> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Set or replace the statistics for `table`.
    pub fn set_table_statistics(&mut self, table: impl Into<String>, stats: TableStatistics) {
        self.tables.insert(table.into(), stats);
    }

    /// Statistics for `table`.
    pub fn get(&self, table: &str) -> Option<&TableStatistics> {
        self.tables.get(table)
    }

    /// Number of tables with statistics.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Check if the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Estimate the fraction of rows satisfying `predicate`.
    ///
    /// Each comparison is looked up by its predicate key in the statistics of
    /// `tables` (a column qualified by a known table narrows the lookup to
    /// that table).
    /// `AND` multiplies, `OR` adds with a cap of 1.0, and anything unknown
    /// falls back to [`DEFAULT_SELECTIVITY`].
    pub fn estimate_predicate_selectivity(&self, predicate: &Expr, tables: &[&str]) -> f64 {
        match predicate {
            Expr::Binary {
                left,
                op: BinaryOp::And,
                right,
            } => {
                self.estimate_predicate_selectivity(left, tables)
                    * self.estimate_predicate_selectivity(right, tables)
            }
            Expr::Binary {
                left,
                op: BinaryOp::Or,
                right,
            } => (self.estimate_predicate_selectivity(left, tables)
                + self.estimate_predicate_selectivity(right, tables))
            .min(1.0),
            Expr::Binary { .. } => {
                let key = predicate_key(predicate);
                // Qualifiers that are not known tables (aliases) widen the
                // lookup to every scanned table.
                let qualified = predicate.referenced_tables();
                let scope: Vec<&str> =
                    if !qualified.is_empty() && qualified.iter().all(|t| self.tables.contains_key(*t)) {
                        qualified
                    } else {
                        tables.to_vec()
                    };

                let found = scope.iter().find_map(|table| {
                    self.tables
                        .get(*table)
                        .and_then(|stats| stats.column_selectivity.get(&key))
                        .copied()
                });
                if found.is_none() {
                    debug!(predicate = %key, "no recorded selectivity, using default");
                }
                found.unwrap_or(DEFAULT_SELECTIVITY)
            }
            Expr::Column { .. } | Expr::Literal(_) => DEFAULT_SELECTIVITY,
        }
    }
}

/// Clamp to `0.0..=1.0`; NaN becomes [`DEFAULT_SELECTIVITY`].
fn clamp_selectivity(selectivity: f64) -> f64 {
    if selectivity.is_nan() {
        DEFAULT_SELECTIVITY
    } else {
        selectivity.clamp(0.0, 1.0)
    }
}

/// Statistics key of a comparison: operands with table qualifiers dropped and
/// no outer parentheses, e.g. `users.age > 25` becomes `"age > 25"`.
pub fn predicate_key(expr: &Expr) -> String {
    match expr {
        Expr::Binary { left, op, right } => {
            format!("{} {} {}", operand_key(left), op, operand_key(right))
        }
        other => operand_key(other),
    }
}

fn operand_key(expr: &Expr) -> String {
    match expr {
        Expr::Column { column, .. } => column.clone(),
        Expr::Literal(value) => value.to_string(),
        Expr::Binary { .. } => format!("({})", predicate_key(expr)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_catalog() -> StatisticsCatalog {
        let mut catalog = StatisticsCatalog::new();
        catalog.set_table_statistics(
            "users",
            TableStatistics::new(1000, 10)
                .with_tuple_width(120)
                .with_selectivity("age > 25", 0.88)
                .with_selectivity("age < 30", 0.20)
                .with_distinct_values("id", 1000)
                .with_distinct_values("age", 50),
        );
        catalog.set_table_statistics(
            "orders",
            TableStatistics::new(5000, 50)
                .with_tuple_width(80)
                .with_selectivity("amount > 100", 0.30),
        );
        catalog
    }

    #[test]
    fn test_get_selectivity_default() {
        let stats = TableStatistics::new(10, 1).with_selectivity("x = 1", 0.5);
        assert_eq!(stats.get_selectivity("x = 1"), 0.5);
        assert_eq!(stats.get_selectivity("y = 2"), DEFAULT_SELECTIVITY);
        assert_eq!(stats.tuple_width, DEFAULT_TUPLE_WIDTH);
    }

    #[test]
    fn test_predicate_key() {
        let expr = Expr::gt(Expr::qualified("users", "age"), Expr::literal(25));
        assert_eq!(predicate_key(&expr), "age > 25");

        let expr = Expr::eq(Expr::column("city"), Expr::literal("NYC"));
        assert_eq!(predicate_key(&expr), "city = 'NYC'");
    }

    #[test]
    fn test_comparison_selectivity() {
        let catalog = create_test_catalog();
        let age = Expr::gt(Expr::column("age"), Expr::literal(25));

        assert_eq!(catalog.estimate_predicate_selectivity(&age, &["users"]), 0.88);
        assert_eq!(
            catalog.estimate_predicate_selectivity(&age, &["orders", "users"]),
            0.88
        );
        // Not visible from orders alone.
        assert_eq!(
            catalog.estimate_predicate_selectivity(&age, &["orders"]),
            DEFAULT_SELECTIVITY
        );
    }

    #[test]
    fn test_qualified_column_narrows_lookup() {
        let catalog = create_test_catalog();
        let expr = Expr::gt(Expr::qualified("orders", "age"), Expr::literal(25));
        assert_eq!(
            catalog.estimate_predicate_selectivity(&expr, &["users", "orders"]),
            DEFAULT_SELECTIVITY
        );

        // An alias qualifier is not a table; every scanned table is searched.
        let aliased = Expr::gt(Expr::qualified("u", "age"), Expr::literal(25));
        assert_eq!(catalog.estimate_predicate_selectivity(&aliased, &["users"]), 0.88);
    }

    #[test]
    fn test_compound_selectivity() {
        let catalog = create_test_catalog();
        let over = Expr::gt(Expr::column("age"), Expr::literal(25));
        let under = Expr::lt(Expr::column("age"), Expr::literal(30));

        let and = Expr::and(over.clone(), under.clone());
        let sel = catalog.estimate_predicate_selectivity(&and, &["users"]);
        assert!((sel - 0.176).abs() < 1e-9);

        let or = Expr::or(over, under);
        assert_eq!(catalog.estimate_predicate_selectivity(&or, &["users"]), 1.0);
    }

    #[test]
    fn test_catalog_json() {
        let catalog = create_test_catalog();
        let json = catalog.to_json().unwrap();
        let decoded = StatisticsCatalog::from_json(&json).unwrap();
        assert_eq!(catalog, decoded);

        let minimal = StatisticsCatalog::from_json(
            r#"{"items": {"tuple_count": 7, "page_count": 1}}"#,
        )
        .unwrap();
        let items = minimal.get("items").unwrap();
        assert_eq!(items.tuple_count, 7);
        assert_eq!(items.tuple_width, DEFAULT_TUPLE_WIDTH);

        assert!(matches!(
            StatisticsCatalog::from_json("not json"),
            Err(Error::Serialization(_))
        ));
    }

    #[test]
    fn test_json_selectivity_is_clamped() {
        let catalog = StatisticsCatalog::from_json(
            r#"{"users": {"tuple_count": 1000, "page_count": 10,
                          "column_selectivity": {"age > 25": 1.5, "age < 20": -0.2}}}"#,
        )
        .unwrap();
        let users = catalog.get("users").unwrap();
        assert_eq!(users.get_selectivity("age > 25"), 1.0);
        assert_eq!(users.get_selectivity("age < 20"), 0.0);

        let over = Expr::gt(Expr::column("age"), Expr::literal(25));
        assert!(catalog.estimate_predicate_selectivity(&over, &["users"]) <= 1.0);
        assert_eq!(
            TableStatistics::new(1, 1)
                .with_selectivity("x = 1", f64::NAN)
                .get_selectivity("x = 1"),
            DEFAULT_SELECTIVITY
        );
    }
}
