//! Unified error type for the planning pipeline.
//!
//! Every stage reports failures through [`PlannerError`] rather than
//! panicking, so callers always get a `Result` they can match on. The
//! variants line up with the error taxonomy the pipeline is built around:
//! schema problems at load time, dangling references once tables are
//! cross-checked, invariant violations in the assembled data, and solver
//! outcomes that aren't a clean optimum.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type PlannerResult<T> = Result<T, PlannerError>;

#[derive(Error, Debug)]
pub enum PlannerError {
    /// A row in one of the input tables is structurally invalid: a
    /// required column is missing, a value has the wrong type, or a
    /// non-negative field is negative.
    #[error("schema error in table '{table}' row {row}, field '{field}': {reason}")]
    Schema {
        table: String,
        row: usize,
        field: String,
        reason: String,
    },

    /// A route or demand row refers to a plant identifier that doesn't
    /// exist, or a route's origin is not a producer, or a route is a
    /// self-loop.
    #[error("reference error: {reason} (id '{id}')")]
    Reference { id: String, reason: String },

    /// A plant's initial inventory or safety stock exceeds its maximum
    /// capacity.
    #[error("invariant violated for plant '{plant}': {reason}")]
    Invariant { plant: String, reason: String },

    /// The MILP backend failed to construct or solve the model.
    #[error("solver error: {0}")]
    Solver(String),

    /// The base model (and, if attempted, the fallback model) is
    /// infeasible. Carried separately from `Solver` because
    /// infeasibility is a normal terminal status, not a backend failure.
    #[error("model is infeasible")]
    Infeasible,
}

impl PlannerError {
    pub fn schema(table: impl Into<String>, row: usize, field: impl Into<String>, reason: impl Into<String>) -> Self {
        PlannerError::Schema {
            table: table.into(),
            row,
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn reference(id: impl Into<String>, reason: impl Into<String>) -> Self {
        PlannerError::Reference {
            id: id.into(),
            reason: reason.into(),
        }
    }

    pub fn invariant(plant: impl Into<String>, reason: impl Into<String>) -> Self {
        PlannerError::Invariant {
            plant: plant.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_error_renders_table_row_field() {
        let err = PlannerError::schema("LogisticsIUGU", 3, "FREIGHT COST", "negative value");
        let msg = err.to_string();
        assert!(msg.contains("LogisticsIUGU"));
        assert!(msg.contains('3'));
        assert!(msg.contains("FREIGHT COST"));
    }

    #[test]
    fn invariant_error_names_the_plant() {
        let err = PlannerError::invariant("IU_01", "safety_stock exceeds max_capacity");
        assert!(matches!(err, PlannerError::Invariant { .. }));
        assert!(err.to_string().contains("IU_01"));
    }
}
