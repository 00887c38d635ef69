//! EXPLAIN support: plan rendering and optimization reports.

use std::fmt::Write;

use qopt_proto::{CandidateSummary, CostSummary, ExplainResult, PlanStepSummary};

use super::cost::CostEstimate;
use super::optimizer::PlanCandidate;
use super::plan::PlanNode;

/// Render `plan` as an indented tree, two spaces per level.
///
/// ```text
/// Project(*)
///   HashJoin(INNER, (users.id = orders.user_id))
///     TableScan(users)
///     TableScan(orders)
/// ```
pub fn render_plan(plan: &PlanNode) -> String {
    let mut out = String::new();
    render_into(plan, 0, &mut out);
    out
}

fn render_into(node: &PlanNode, depth: usize, out: &mut String) {
    if !out.is_empty() {
        out.push('\n');
    }
    let _ = write!(
        out,
        "{:indent$}{}({})",
        "",
        node.operator.name(),
        node.operator.detail(),
        indent = depth * 2
    );
    for child in &node.children {
        render_into(child, depth + 1, out);
    }
}

/// Flatten `plan` into pre-order steps.
pub fn summarize(plan: &PlanNode) -> Vec<PlanStepSummary> {
    let mut steps = Vec::with_capacity(plan.node_count());
    summarize_into(plan, 0, &mut steps);
    steps
}

fn summarize_into(node: &PlanNode, depth: u32, steps: &mut Vec<PlanStepSummary>) {
    steps.push(PlanStepSummary {
        depth,
        operator: node.operator.name().to_string(),
        detail: node.operator.detail(),
        estimated_rows: node.stats.row_count,
        cost: cost_summary(&node.cost),
    });
    for child in &node.children {
        summarize_into(child, depth + 1, steps);
    }
}

fn cost_summary(cost: &CostEstimate) -> CostSummary {
    CostSummary {
        io_cost: cost.io_cost,
        cpu_cost: cost.cpu_cost,
        total_cost: cost.total_cost,
    }
}

/// Build the EXPLAIN result for priced `candidates`, `selected` being the
/// index of the chosen one.
pub fn explain_candidates(candidates: &[PlanCandidate], selected: usize) -> ExplainResult {
    let summaries = candidates
        .iter()
        .enumerate()
        .map(|(i, c)| CandidateSummary {
            number: (i + 1) as u32,
            steps: summarize(&c.plan),
            cost: cost_summary(&c.cost),
        })
        .collect();

    let explanation = match candidates.get(selected) {
        Some(best) => format!(
            "Selected plan {} of {}: {}{} with total cost {:.2}",
            selected + 1,
            candidates.len(),
            best.algorithm,
            if best.swapped { " (join order swapped)" } else { "" },
            best.cost.total_cost
        ),
        None => "No plan selected".to_string(),
    };

    ExplainResult {
        candidates: summaries,
        selected: selected as u32,
        explanation,
    }
}

/// Text report listing every candidate with its cost and the selected plan.
pub fn optimization_report(candidates: &[PlanCandidate], selected: Option<usize>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Query Optimization Report ===");
    let _ = writeln!(out, "Generated {} plan alternatives:", candidates.len());

    for (i, candidate) in candidates.iter().enumerate() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Plan {}:", i + 1);
        let _ = writeln!(out, "{}", render_plan(&candidate.plan));
        let _ = writeln!(
            out,
            "Cost: I/O={}, CPU={}, Total={}",
            candidate.cost.io_cost, candidate.cost.cpu_cost, candidate.cost.total_cost
        );
    }

    if let Some(best) = selected.and_then(|i| candidates.get(i).map(|c| (i, c))) {
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "*** SELECTED PLAN {} (Lowest Cost: {}) ***",
            best.0 + 1,
            best.1.cost.total_cost
        );
    }

    out
}
