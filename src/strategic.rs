//! The Strategic Compiler: expands wildcard strategic-constraint rows
//! (IUGUConstraint.csv, post-normalisation) into concrete linear
//! constraint descriptors the MILP Builder can add to the model.
//!
//! Mirrors `_apply_strategic_constraints_advanced` /
//! `_get_matching_vars` from the original optimizer: each row selects a
//! set of shipment-quantity variables by scope (global / mode-specific /
//! route-specific) and bounds their sum.

use crate::types::{BoundKind, Route, StrategicConstraintRow};
use good_lp::{Expression, Variable};
use std::collections::BTreeMap;

/// A fully resolved strategic constraint, ready to be handed to
/// `good_lp`'s `constraint!` machinery by the Builder.
pub struct CompiledConstraint {
    pub name: String,
    pub expression: Expression,
    pub bound: BoundKind,
    pub value: f64,
}

/// Expands every row into zero or one `CompiledConstraint`. A row whose
/// period falls outside the horizon, or whose scope matches no shipment
/// variable at all, is silently skipped — the original treats an empty
/// selection as a no-op rather than an error.
pub fn compile(
    rows: &[StrategicConstraintRow],
    routes: &[Route],
    horizon: usize,
    qty_vars: &BTreeMap<(String, String, usize), Variable>,
) -> Vec<CompiledConstraint> {
    let mut out = Vec::new();

    for (idx, row) in rows.iter().enumerate() {
        if row.period < 1 || row.period > horizon {
            continue;
        }

        let matches = matching_vars(row, routes, qty_vars);
        if matches.is_empty() {
            continue;
        }

        let mut expression = Expression::from(0.0);
        for v in matches {
            expression += v;
        }

        let name = format!(
            "Strategic_{}_{}_T{}_{}",
            row.producer_id,
            scope_label(row),
            row.period,
            idx
        );

        out.push(CompiledConstraint {
            name,
            expression,
            bound: row.bound,
            value: row.value,
        });
    }

    out
}

fn matching_vars(
    row: &StrategicConstraintRow,
    routes: &[Route],
    qty_vars: &BTreeMap<(String, String, usize), Variable>,
) -> Vec<Variable> {
    let target_mode = row.mode.as_deref().map(str::to_lowercase);
    let mut matches = Vec::new();

    for r in routes {
        if r.origin_id != row.producer_id {
            continue;
        }
        if let Some(dst) = &row.destination_id {
            if &r.destination_id != dst {
                continue;
            }
        }
        for m in &r.modes {
            if let Some(target) = &target_mode {
                if m.mode.to_lowercase() != *target {
                    continue;
                }
            }
            if let Some(v) = qty_vars.get(&(r.id.clone(), m.mode.clone(), row.period)) {
                matches.push(*v);
            }
        }
    }

    matches
}

fn scope_label(row: &StrategicConstraintRow) -> String {
    match (&row.destination_id, &row.mode) {
        (None, None) => "global".to_string(),
        (None, Some(mode)) => format!("mode_{mode}"),
        (Some(dst), mode) => format!("route_{dst}_{}", mode.as_deref().unwrap_or("any")),
    }
}
