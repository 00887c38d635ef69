//! EXPLAIN result types.
//!
//! Plans are flattened into depth-annotated steps so the summaries stay
//! non-recursive and archivable alongside the other result types.

use rkyv::{Archive, Deserialize, Serialize};
use serde::{Deserialize as SerdeDeserialize, Serialize as SerdeSerialize};

use crate::error::Error;

/// Result of an EXPLAIN request.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize)]
pub struct ExplainResult {
    /// Every priced candidate in enumeration order.
    pub candidates: Vec<CandidateSummary>,
    /// Index of the selected candidate in `candidates`.
    pub selected: u32,
    /// Human-readable explanation text.
    pub explanation: String,
}

impl ExplainResult {
    /// The selected candidate.
    pub fn selected_candidate(&self) -> Option<&CandidateSummary> {
        self.candidates.get(self.selected as usize)
    }

    /// Encode as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, Error> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }
}

/// One candidate plan.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize)]
pub struct CandidateSummary {
    /// Position in enumeration order, starting at 1.
    pub number: u32,
    /// Plan steps in pre-order.
    pub steps: Vec<PlanStepSummary>,
    /// Cost of the whole plan.
    pub cost: CostSummary,
}

/// One operator of a plan.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize)]
pub struct PlanStepSummary {
    /// Distance from the root.
    pub depth: u32,
    /// Operator name, e.g. `HashJoin`.
    pub operator: String,
    /// Operator detail, e.g. the join condition.
    pub detail: String,
    /// Estimated output rows.
    pub estimated_rows: u64,
    /// Cost of the subtree rooted here.
    pub cost: CostSummary,
}

/// Cost breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize)]
pub struct CostSummary {
    /// Modeled page I/O cost.
    pub io_cost: f64,
    /// Modeled per-tuple CPU cost.
    pub cpu_cost: f64,
    /// `io_cost + cpu_cost`.
    pub total_cost: f64,
}
