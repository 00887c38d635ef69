//! qopt protocol types.
//!
//! This crate defines the types exchanged between the optimizer and its
//! collaborators: parsed statements, schemas, rows, result sets, and EXPLAIN
//! summaries.
//!
//! # Modules
//!
//! - [`value`] - Runtime value and column data types
//! - [`query`] - Parsed statement and expression types
//! - [`result`] - Schema, row, and result set types
//! - [`explain`] - EXPLAIN summaries
//! - [`error`] - Protocol error types
//!
//! # Serialization
//!
//! Values, schemas, rows, result sets, and EXPLAIN summaries derive
//! `rkyv::Archive`, `rkyv::Serialize`, and `rkyv::Deserialize`:
//!
//! ```ignore
//! use qopt_proto::{ResultSet, Schema};
//!
//! let rs = ResultSet::new(Schema::default());
//! let bytes = rkyv::to_bytes::<rkyv::rancor::Error>(&rs).unwrap();
//! let archived = rkyv::access::<ArchivedResultSet, rkyv::rancor::Error>(&bytes).unwrap();
//! let decoded: ResultSet = rkyv::deserialize::<ResultSet, rkyv::rancor::Error>(archived).unwrap();
//! ```

pub mod error;
pub mod explain;
pub mod query;
pub mod result;
pub mod value;

pub use error::Error;

pub use explain::{CandidateSummary, CostSummary, ExplainResult, PlanStepSummary};
pub use query::{BinaryOp, Expr, JoinClause, JoinKind, SelectItem, SelectStatement, TableRef};
pub use result::{Column, ResultSet, Row, Schema};
pub use value::{DataType, Value};
