//! The Fallback Orchestrator: detects an infeasible base solve and
//! re-issues the model with a penalised `Emergency[p,t]` inflow term,
//! reporting which mode produced the returned [`Plan`].
//!
//! Grounded on `original_source/backend/solver_logic.py`'s
//! `solve_with_emergency_fallback`: solve once without emergency
//! sourcing; if the result is `Infeasible` and the caller has opted in,
//! re-solve with it enabled and annotate the message. Any other
//! non-optimal status (`Unbounded`, `Error`) is returned as-is — the
//! orchestrator only ever intervenes on `Infeasible`, per spec.md §4.7
//! and §7.

use crate::builder;
use crate::config::SolverConfig;
use crate::extract;
use crate::solve;
use crate::types::{Network, Plan, TerminationStatus};

const EMERGENCY_RECOVERY_MESSAGE: &str =
    "Base model infeasible; used high-cost emergency sourcing to produce a feasible plan.";
const EMERGENCY_EXHAUSTED_MESSAGE: &str = "Base model infeasible and emergency fallback did not solve.";

/// Runs the base solve; on `Infeasible` with fallback enabled, re-solves
/// with emergency inflow and penalty cost `config.emergency_unit_cost`.
pub fn solve_with_fallback(network: &Network, config: &SolverConfig) -> Plan {
    let base_built = builder::build(network, None);
    let base_solved = solve::solve(base_built, config);

    if base_solved.status == TerminationStatus::Optimal {
        let solution = base_solved.solution.is_some();
        debug_assert!(solution);
        return extract::extract(network, &base_solved, config, None);
    }

    if base_solved.status != TerminationStatus::Infeasible || !config.enable_emergency_fallback {
        return Plan::unsolved(
            base_solved.status,
            base_solved
                .message
                .unwrap_or_else(|| "model did not reach an optimal solution".to_string()),
        );
    }

    log::warn!("base model infeasible; re-solving with emergency inflow enabled");
    let fallback_built = builder::build(network, Some(config.emergency_unit_cost));
    let fallback_solved = solve::solve(fallback_built, config);

    if fallback_solved.status == TerminationStatus::Optimal {
        return extract::extract(
            network,
            &fallback_solved,
            config,
            Some(EMERGENCY_RECOVERY_MESSAGE.to_string()),
        );
    }

    Plan::unsolved(fallback_solved.status, EMERGENCY_EXHAUSTED_MESSAGE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Plant, PlantKind, Route, RouteMode};
    use std::collections::BTreeMap;
    use std::time::Duration;

    fn infeasible_network() -> Network {
        Network {
            horizon: 1,
            plants: vec![
                Plant {
                    id: "IU_01".into(),
                    name: None,
                    kind: PlantKind::Producer,
                    initial_inventory: 0.0,
                    max_capacity: 100.0,
                    safety_stock: 0.0,
                    holding_cost: 0.0,
                    production_cost: 10.0,
                    max_production_per_period: Some(0.0),
                },
                Plant {
                    id: "GU_01".into(),
                    name: None,
                    kind: PlantKind::Consumer,
                    initial_inventory: 0.0,
                    max_capacity: 100.0,
                    safety_stock: 0.0,
                    holding_cost: 1.0,
                    production_cost: 0.0,
                    max_production_per_period: None,
                },
            ],
            routes: vec![Route {
                id: "IU_01->GU_01".into(),
                origin_id: "IU_01".into(),
                destination_id: "GU_01".into(),
                minimum_shipment_batch_quantity: 0.0,
                modes: vec![RouteMode {
                    mode: "road".into(),
                    unit_cost: 2.0,
                    handling_cost: 0.0,
                    capacity_per_trip: 10.0,
                }],
            }],
            demand: {
                let mut m = BTreeMap::new();
                m.insert("GU_01".to_string(), vec![10.0]);
                m
            },
            min_fulfillment: BTreeMap::new(),
            strategic_constraints: vec![],
        }
    }

    #[test]
    fn reports_infeasible_when_fallback_disabled() {
        let net = infeasible_network();
        let config = SolverConfig {
            time_limit: Duration::from_secs(5),
            enable_emergency_fallback: false,
            ..SolverConfig::default()
        };
        let plan = solve_with_fallback(&net, &config);
        assert_eq!(plan.status, TerminationStatus::Infeasible);
        assert!(plan.total_cost.is_none());
    }

    #[test]
    fn recovers_feasibility_with_emergency_inflow() {
        let net = infeasible_network();
        let config = SolverConfig {
            time_limit: Duration::from_secs(5),
            enable_emergency_fallback: true,
            emergency_unit_cost: 1_000_000.0,
            ..SolverConfig::default()
        };
        let plan = solve_with_fallback(&net, &config);
        assert_eq!(plan.status, TerminationStatus::Optimal);
        assert!(plan.message.as_deref() == Some(EMERGENCY_RECOVERY_MESSAGE));
        // Emergency inflow at 10 units and the 10^6 penalty dominate the cost.
        assert!(plan.total_cost.unwrap() > 9_000_000.0);
    }

    #[test]
    fn fallback_never_changes_a_feasible_optimum() {
        let mut net = infeasible_network();
        net.plants[0].max_production_per_period = Some(50.0);
        let config_without = SolverConfig {
            time_limit: Duration::from_secs(5),
            enable_emergency_fallback: false,
            ..SolverConfig::default()
        };
        let config_with = SolverConfig {
            enable_emergency_fallback: true,
            ..config_without.clone()
        };
        let plan_without = solve_with_fallback(&net, &config_without);
        let plan_with = solve_with_fallback(&net, &config_with);
        assert_eq!(plan_without.status, TerminationStatus::Optimal);
        assert!((plan_without.total_cost.unwrap() - plan_with.total_cost.unwrap()).abs() < 1e-6);
        assert!(plan_with.message.is_none());
    }
}
