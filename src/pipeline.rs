//! Ties the pipeline together end to end: Load → Assemble → Solve
//! (with the Fallback Orchestrator folded in) → Done/Report, following
//! the state machine in spec.md §4.8. This is the one function the CLI
//! (and any future transport layer) needs to call.

use crate::assemble;
use crate::config::SolverConfig;
use crate::diagnostics::Diagnostics;
use crate::error::PlannerResult;
use crate::fallback;
use crate::tables;
use crate::types::Plan;
use std::path::Path;

/// Runs the whole pipeline against a directory of the eight canonical
/// CSV tables (see spec.md §6.1 for file names) and the given solver
/// configuration. Returns the plan plus any non-fatal warnings collected
/// while assembling the network (e.g. a skipped strategic row).
///
/// Schema errors are fatal: if the loader rejects any row, the first
/// such error is returned (after every rejected row has been logged at
/// `error` level) rather than silently solving over a partial table.
pub fn run(dir: &Path, config: &SolverConfig) -> PlannerResult<(Plan, Diagnostics)> {
    let (input, load_errors) = tables::load_directory(dir)?;
    if !load_errors.is_empty() {
        for err in &load_errors {
            log::error!("{err}");
        }
        return Err(load_errors.into_iter().next().unwrap());
    }

    let (network, diagnostics) = assemble::assemble(&input)?;
    for plant in &network.plants {
        plant.validate()?;
    }

    let plan = fallback::solve_with_fallback(&network, config);
    Ok((plan, diagnostics))
}
