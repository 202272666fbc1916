//! The Plan Extractor: reads solved variable values back out of a
//! [`SolvedModel`] and assembles the [`Plan`] — the scheduled trips,
//! re-evaluated cost breakdown, and (optionally) diagnostics.
//!
//! Grounded on `advanced_optimizer.py`'s solution-extraction block: round
//! trip counts to the nearest integer, keep a trip record only when it
//! carries a trip or a non-negligible quantity, sort by
//! `(period, route id, mode)`, and re-evaluate each cost component from
//! solved values rather than trusting the objective value directly.

use crate::config::SolverConfig;
use crate::diagnostics;
use crate::solve::SolvedModel;
use crate::types::{CostBreakdown, Network, Plan, ScheduledTrip, TerminationStatus};
use good_lp::{Solution, Variable};
use std::collections::BTreeMap;

const QUANTITY_EPSILON: f64 = 1e-9;

/// Builds the final [`Plan`] from a solved model. `message` carries any
/// note the caller wants attached (e.g. the Fallback Orchestrator's
/// emergency-inflow notice); pass `None` for a base-model solve.
///
/// Panics only if called with a `solved.status` other than `Optimal` or
/// a `solved.solution` of `None` — callers are expected to check the
/// status first (the pipeline in `pipeline.rs` does exactly this).
pub fn extract(network: &Network, solved: &SolvedModel, config: &SolverConfig, message: Option<String>) -> Plan {
    let solution = solved
        .solution
        .as_deref()
        .expect("extract called without a solved model");

    let production = read_map(&solved.production, solution);
    let qty = read_map(&solved.qty, solution);
    let inventory = read_map(&solved.inventory, solution);

    let mut scheduled_trips = Vec::new();
    for r in &network.routes {
        for m in &r.modes {
            for t in 1..=network.horizon {
                let key = (r.id.clone(), m.mode.clone(), t);
                let trips_val = solved.trips.get(&key).map(|v| solution.value(*v)).unwrap_or(0.0);
                let qty_val = qty.get(&key).copied().unwrap_or(0.0);
                let num_trips = trips_val.round().max(0.0);

                if num_trips <= 0.0 && qty_val <= QUANTITY_EPSILON {
                    continue;
                }

                scheduled_trips.push(ScheduledTrip {
                    period: t,
                    route_id: r.id.clone(),
                    origin_id: r.origin_id.clone(),
                    destination_id: r.destination_id.clone(),
                    mode: m.mode.clone(),
                    num_trips: num_trips as u64,
                    quantity_shipped: qty_val.max(0.0),
                });
            }
        }
    }
    scheduled_trips.sort_by(|a, b| (a.period, &a.route_id, &a.mode).cmp(&(b.period, &b.route_id, &b.mode)));

    let cost_breakdown = cost_breakdown(network, &production, &qty, &inventory);

    let diagnostics = if config.enable_diagnostics {
        Some(diagnostics::aggregate(network, &scheduled_trips, &production, &inventory))
    } else {
        None
    };

    Plan {
        status: TerminationStatus::Optimal,
        total_cost: Some(cost_breakdown.total()),
        scheduled_trips,
        cost_breakdown: Some(cost_breakdown),
        diagnostics,
        message,
    }
}

fn read_map<K: Clone + Ord>(vars: &BTreeMap<K, Variable>, solution: &dyn Solution) -> BTreeMap<K, f64> {
    vars.iter().map(|(k, v)| (k.clone(), solution.value(*v))).collect()
}

/// Re-evaluates the objective's three sub-sums on solved values. This is
/// deliberately independent of the objective value `good_lp` reports so
/// the cost-identity property holds even when an emergency-penalty term
/// is present in the objective but has no place in the public breakdown.
fn cost_breakdown(
    network: &Network,
    production: &BTreeMap<(String, usize), f64>,
    qty: &BTreeMap<(String, String, usize), f64>,
    inventory: &BTreeMap<(String, usize), f64>,
) -> CostBreakdown {
    let mut breakdown = CostBreakdown::default();

    for p in network.producers() {
        for t in 1..=network.horizon {
            let produced = production.get(&(p.id.clone(), t)).copied().unwrap_or(0.0);
            breakdown.production += p.production_cost * produced;
        }
    }

    for r in &network.routes {
        for m in &r.modes {
            for t in 1..=network.horizon {
                let shipped = qty.get(&(r.id.clone(), m.mode.clone(), t)).copied().unwrap_or(0.0);
                breakdown.transport += (m.unit_cost + m.handling_cost) * shipped;
            }
        }
    }

    for p in &network.plants {
        for t in 1..=network.horizon {
            let inv = inventory.get(&(p.id.clone(), t)).copied().unwrap_or(0.0);
            breakdown.holding += p.holding_cost * inv;
        }
    }

    breakdown
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder;
    use crate::solve;
    use crate::types::{Plant, PlantKind, Route, RouteMode};
    use std::collections::BTreeMap as Map;
    use std::time::Duration;

    fn tiny_network() -> Network {
        Network {
            horizon: 1,
            plants: vec![
                Plant {
                    id: "IU_01".into(),
                    name: None,
                    kind: PlantKind::Producer,
                    initial_inventory: 0.0,
                    max_capacity: 1000.0,
                    safety_stock: 0.0,
                    holding_cost: 0.0,
                    production_cost: 10.0,
                    max_production_per_period: Some(50.0),
                },
                Plant {
                    id: "GU_01".into(),
                    name: None,
                    kind: PlantKind::Consumer,
                    initial_inventory: 0.0,
                    max_capacity: 1000.0,
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
                let mut m = Map::new();
                m.insert("GU_01".to_string(), vec![20.0]);
                m
            },
            min_fulfillment: Map::new(),
            strategic_constraints: vec![],
        }
    }

    #[test]
    fn extracts_scenario_s1_exactly() {
        let net = tiny_network();
        let built = builder::build(&net, None);
        let config = SolverConfig {
            time_limit: Duration::from_secs(5),
            ..SolverConfig::default()
        };
        let solved = solve::solve(built, &config);
        assert_eq!(solved.status, TerminationStatus::Optimal);

        let plan = extract(&net, &solved, &config, None);
        assert_eq!(plan.status, TerminationStatus::Optimal);
        assert_eq!(plan.scheduled_trips.len(), 1);
        let trip = &plan.scheduled_trips[0];
        assert_eq!(trip.num_trips, 2);
        assert!((trip.quantity_shipped - 20.0).abs() < 1e-6);
        assert!((plan.total_cost.unwrap() - 240.0).abs() < 1e-6);
        assert!((plan.cost_breakdown.unwrap().production - 200.0).abs() < 1e-6);
    }

    #[test]
    fn diagnostics_are_omitted_when_disabled() {
        let net = tiny_network();
        let built = builder::build(&net, None);
        let config = SolverConfig {
            time_limit: Duration::from_secs(5),
            enable_diagnostics: false,
            ..SolverConfig::default()
        };
        let solved = solve::solve(built, &config);
        let plan = extract(&net, &solved, &config, None);
        assert!(plan.diagnostics.is_none());
    }
}
