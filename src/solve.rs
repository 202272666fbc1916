//! The Solver Driver: hands a [`BuiltModel`] to `good_lp`'s HiGHS
//! backend with the configured time limit, relative gap and thread
//! hint, and classifies the outcome into the public
//! [`TerminationStatus`] domain.
//!
//! HiGHS is chosen over CBC because it exposes a wall-clock time limit
//! and MIP gap tolerance through stable, platform-independent options —
//! `coin_cbc`'s wrapper does not (see
//! `examples/other_examples/.../optimizer-strategies-milp.rs`, which
//! notes exactly this tradeoff). `coin_cbc`, `microlp` and `scip` remain
//! available Cargo features for callers who want another backend.

use crate::builder::BuiltModel;
use crate::config::SolverConfig;
use crate::types::TerminationStatus;
use good_lp::{highs, Solution, SolverModel, Variable};
use std::collections::BTreeMap;

/// Everything the Plan Extractor needs once a solve attempt has
/// finished: the classified status, the raw solution (when one exists),
/// and the variable-index maps carried over from the `BuiltModel` that
/// was consumed to construct the backend problem.
pub struct SolvedModel {
    pub status: TerminationStatus,
    pub solution: Option<Box<dyn Solution>>,
    pub message: Option<String>,

    pub production: BTreeMap<(String, usize), Variable>,
    pub qty: BTreeMap<(String, String, usize), Variable>,
    pub trips: BTreeMap<(String, String, usize), Variable>,
    pub inventory: BTreeMap<(String, usize), Variable>,
    pub emergency: Option<BTreeMap<(String, usize), Variable>>,
}

/// Solves the given model, applying the configured time limit, gap
/// tolerance and thread hint to the HiGHS backend. The variable maps on
/// `built` are carried through onto the returned [`SolvedModel`] so the
/// Plan Extractor can read values back out without `good_lp` requiring
/// the `BuiltModel` to outlive the solve call.
pub fn solve(built: BuiltModel, config: &SolverConfig) -> SolvedModel {
    let BuiltModel {
        vars,
        objective,
        constraints,
        production,
        qty,
        trips,
        inventory,
        emergency,
    } = built;

    let mut model = vars.minimise(objective).using(highs);
    model.set_option("time_limit", config.time_limit.as_secs_f64());
    model.set_option("mip_rel_gap", config.relative_gap);
    if let Some(threads) = config.threads {
        model.set_option("threads", threads as i32);
    }

    for c in constraints {
        model = model.with(c);
    }

    // good_lp's HiGHS backend only returns `Ok` once HiGHS itself reports
    // an optimal status; a time-limited run that stops on a feasible but
    // unproven incumbent, or one that never finds a feasible point at
    // all, comes back through the `Err` branch below (see
    // `classify_error`), not this one. There is no separate "solved but
    // not proven optimal" signal on the `Ok` path to additionally guard
    // against here.
    match model.solve() {
        Ok(solution) => SolvedModel {
            status: TerminationStatus::Optimal,
            solution: Some(Box::new(solution)),
            message: None,
            production,
            qty,
            trips,
            inventory,
            emergency,
        },
        Err(e) => classify_error(e, production, qty, trips, inventory, emergency),
    }
}

/// Maps a backend failure onto the public [`TerminationStatus`] domain.
///
/// `good_lp::ResolutionError` only carries dedicated variants for
/// `Infeasible` and `Unbounded`; every other backend outcome (HiGHS
/// hitting its time limit without a feasible incumbent, an unset/unknown
/// status, ...) comes back as an opaque message in `Other`/`Str`. Lacking
/// a structured variant to match on, this inspects that message for the
/// vocabulary HiGHS itself uses for those outcomes and reports
/// `NotSolved` rather than `Error` when it matches, per this crate's own
/// "anything else ... -> NotSolved" mapping. A message that doesn't match
/// any of those is treated as a genuine backend error.
fn classify_error(
    e: good_lp::ResolutionError,
    production: BTreeMap<(String, usize), Variable>,
    qty: BTreeMap<(String, String, usize), Variable>,
    trips: BTreeMap<(String, String, usize), Variable>,
    inventory: BTreeMap<(String, usize), Variable>,
    emergency: Option<BTreeMap<(String, usize), Variable>>,
) -> SolvedModel {
    use good_lp::ResolutionError;
    let (status, message) = match e {
        ResolutionError::Infeasible => (TerminationStatus::Infeasible, "model is infeasible".to_string()),
        ResolutionError::Unbounded => (TerminationStatus::Unbounded, "model is unbounded".to_string()),
        other => {
            let message = other.to_string();
            log::warn!("solver did not reach an optimal solution: {message}");
            if is_not_solved_status(&message) {
                (TerminationStatus::NotSolved, message)
            } else {
                (TerminationStatus::Error, message)
            }
        }
    };
    SolvedModel {
        status,
        solution: None,
        message: Some(message),
        production,
        qty,
        trips,
        inventory,
        emergency,
    }
}

/// Recognises the vocabulary HiGHS uses for "ran, but no optimum was
/// established" outcomes (time/iteration limit reached without a
/// feasible incumbent, solve never attempted, status left unset), as
/// opposed to a genuine construction or solver exception.
fn is_not_solved_status(message: &str) -> bool {
    let lower = message.to_lowercase();
    ["time limit", "time_limit", "iteration limit", "not set", "notset", "not_set"]
        .iter()
        .any(|needle| lower.contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder;
    use crate::types::{Network, Plant, PlantKind};
    use std::collections::BTreeMap as Map;
    use std::time::Duration;

    fn trivially_feasible_network() -> Network {
        Network {
            horizon: 1,
            plants: vec![Plant {
                id: "IU_01".into(),
                name: None,
                kind: PlantKind::Producer,
                initial_inventory: 10.0,
                max_capacity: 100.0,
                safety_stock: 0.0,
                holding_cost: 0.0,
                production_cost: 1.0,
                max_production_per_period: None,
            }],
            routes: vec![],
            demand: Map::new(),
            min_fulfillment: Map::new(),
            strategic_constraints: vec![],
        }
    }

    #[test]
    fn solves_a_trivially_feasible_model_to_optimality() {
        let net = trivially_feasible_network();
        let built = builder::build(&net, None);
        let config = SolverConfig {
            time_limit: Duration::from_secs(5),
            ..SolverConfig::default()
        };
        let solved = solve(built, &config);
        assert_eq!(solved.status, TerminationStatus::Optimal);
    }

    #[test]
    fn time_limit_message_classifies_as_not_solved() {
        assert!(is_not_solved_status("reached time limit"));
        assert!(is_not_solved_status("Time Limit Reached"));
        assert!(is_not_solved_status("status NotSet"));
        assert!(!is_not_solved_status("model is infeasible"));
    }

    #[test]
    fn infeasible_model_classifies_without_a_solution() {
        let mut net = trivially_feasible_network();
        net.plants[0].safety_stock = 50.0;
        net.plants[0].initial_inventory = 0.0;
        net.plants[0].max_production_per_period = Some(0.0);
        let built = builder::build(&net, None);
        let config = SolverConfig {
            time_limit: Duration::from_secs(5),
            ..SolverConfig::default()
        };
        let solved = solve(built, &config);
        assert_eq!(solved.status, TerminationStatus::Infeasible);
        assert!(solved.solution.is_none());
    }
}
