//! The MILP Builder: declares the decision variables, objective, and
//! structural constraints (spec families 1–7) over an assembled
//! [`Network`], producing a model the Solver Driver can hand straight to
//! `good_lp`.
//!
//! `Network.min_fulfillment` is parsed and carried through assembly but is
//! not wired into a constraint here: the upstream service this crate is
//! modelled on parses `MIN FULFILLMENT (%)` but never turns it into a
//! solver constraint either (see DESIGN.md).
//!
//! Grounded on `advanced_optimizer.py`'s `solve_clinker_transport_advanced`
//! for the variable/constraint shape, and on
//! `examples/other_examples/.../balance_engine__examples-multi-period.rs`
//! for the `good_lp` builder calls themselves (`variables!`, `Expression`,
//! `constraint!`).

use crate::strategic;
use crate::types::{BoundKind, Network};
use good_lp::{constraint, variable, Constraint, Expression, ProblemVariables, Variable};
use itertools::iproduct;
use std::collections::BTreeMap;

/// Variable handles plus the fully-built objective and constraint list.
/// `solve.rs` turns this into a solver-bound model; `extract.rs` reads
/// the solved values back out through these same maps.
pub struct BuiltModel {
    pub vars: ProblemVariables,
    pub objective: Expression,
    pub constraints: Vec<Constraint>,

    /// Production[producer_id, period]
    pub production: BTreeMap<(String, usize), Variable>,
    /// Qty[route_id, mode, period]
    pub qty: BTreeMap<(String, String, usize), Variable>,
    /// Trips[route_id, mode, period]
    pub trips: BTreeMap<(String, String, usize), Variable>,
    /// Inv[plant_id, period]
    pub inventory: BTreeMap<(String, usize), Variable>,
    /// Emergency[plant_id, period], present only when the Fallback
    /// Orchestrator has asked for a penalised-inflow model.
    pub emergency: Option<BTreeMap<(String, usize), Variable>>,
}

/// Builds the base model, or — when `emergency_unit_cost` is `Some` — the
/// fallback model with a penalised `Emergency[p,t]` inflow term added to
/// every plant's balance equation and to the objective.
pub fn build(network: &Network, emergency_unit_cost: Option<f64>) -> BuiltModel {
    let mut vars = ProblemVariables::new();

    let mut production = BTreeMap::new();
    for p in network.producers() {
        for t in 1..=network.horizon {
            let v = vars.add(
                variable()
                    .min(0.0)
                    .name(format!("Production_{}_{}", p.id, t)),
            );
            production.insert((p.id.clone(), t), v);
        }
    }

    let mut qty = BTreeMap::new();
    let mut trips = BTreeMap::new();
    for r in &network.routes {
        for (m, t) in iproduct!(&r.modes, 1..=network.horizon) {
            let q = vars.add(
                variable()
                    .min(0.0)
                    .name(format!("Qty_{}_{}_{}", r.id, m.mode, t)),
            );
            let n = vars.add(
                variable()
                    .min(0.0)
                    .integer()
                    .name(format!("Trips_{}_{}_{}", r.id, m.mode, t)),
            );
            qty.insert((r.id.clone(), m.mode.clone(), t), q);
            trips.insert((r.id.clone(), m.mode.clone(), t), n);
        }
    }

    let mut inventory = BTreeMap::new();
    for p in &network.plants {
        for t in 1..=network.horizon {
            let v = vars.add(variable().min(0.0).name(format!("Inv_{}_{}", p.id, t)));
            inventory.insert((p.id.clone(), t), v);
        }
    }

    let emergency = emergency_unit_cost.map(|_| {
        let mut map = BTreeMap::new();
        for p in &network.plants {
            for t in 1..=network.horizon {
                let v = vars.add(
                    variable()
                        .min(0.0)
                        .name(format!("Emergency_{}_{}", p.id, t)),
                );
                map.insert((p.id.clone(), t), v);
            }
        }
        map
    });

    let mut objective = Expression::from(0.0);
    for p in network.producers() {
        for t in 1..=network.horizon {
            objective += p.production_cost * production[&(p.id.clone(), t)];
        }
    }
    for r in &network.routes {
        for m in &r.modes {
            for t in 1..=network.horizon {
                let key = (r.id.clone(), m.mode.clone(), t);
                objective += m.unit_cost * qty[&key];
                if m.handling_cost > 0.0 {
                    objective += m.handling_cost * qty[&key];
                }
            }
        }
    }
    for p in &network.plants {
        for t in 1..=network.horizon {
            objective += p.holding_cost * inventory[&(p.id.clone(), t)];
        }
    }
    if let (Some(unit_cost), Some(emergency)) = (emergency_unit_cost, &emergency) {
        for v in emergency.values() {
            objective += unit_cost * *v;
        }
    }

    let mut constraints = Vec::new();

    // 1/2. Shipment capacity and minimum batch link.
    for r in &network.routes {
        for (m, t) in iproduct!(&r.modes, 1..=network.horizon) {
            let key = (r.id.clone(), m.mode.clone(), t);
            let q = qty[&key];
            let n = trips[&key];
            constraints.push(constraint!(q <= n * m.capacity_per_trip));
            if r.minimum_shipment_batch_quantity > 0.0 {
                constraints.push(constraint!(q >= n * r.minimum_shipment_batch_quantity));
            }
        }
    }

    // 3. Production cap.
    for p in network.producers() {
        if let Some(cap) = p.max_production_per_period {
            for t in 1..=network.horizon {
                constraints.push(constraint!(production[&(p.id.clone(), t)] <= cap));
            }
        }
    }

    // 4. Inventory balance, 5. safety stock, 6. maximum inventory.
    for p in &network.plants {
        for t in 1..=network.horizon {
            let prev: Expression = if t == 1 {
                Expression::from(p.initial_inventory)
            } else {
                inventory[&(p.id.clone(), t - 1)].into()
            };

            let produced: Expression = if p.is_producer() {
                production[&(p.id.clone(), t)].into()
            } else {
                Expression::from(0.0)
            };

            let mut inflow = Expression::from(0.0);
            let mut outflow = Expression::from(0.0);
            for r in &network.routes {
                for m in &r.modes {
                    let q = qty[&(r.id.clone(), m.mode.clone(), t)];
                    if r.destination_id == p.id {
                        inflow += q;
                    }
                    if r.origin_id == p.id {
                        outflow += q;
                    }
                }
            }
            if let Some(emergency) = &emergency {
                inflow += emergency[&(p.id.clone(), t)];
            }

            let demand = network.demand_at(&p.id, t);
            let inv = inventory[&(p.id.clone(), t)];
            constraints.push(constraint!(inv == prev + produced + inflow - outflow - demand));
            constraints.push(constraint!(inv >= p.safety_stock));
            constraints.push(constraint!(inv <= p.max_capacity));
        }
    }

    // Strategic constraints (wildcard-expanded). Names are kept on
    // CompiledConstraint for logging only; good_lp constraints are
    // anonymous once added.
    let compiled = strategic::compile(&network.strategic_constraints, &network.routes, network.horizon, &qty);
    for c in compiled {
        log::debug!("strategic constraint {}", c.name);
        let constraint = match c.bound {
            BoundKind::Lower => constraint!(c.expression >= c.value),
            BoundKind::Upper => constraint!(c.expression <= c.value),
            BoundKind::Equal => constraint!(c.expression == c.value),
        };
        constraints.push(constraint);
    }

    BuiltModel {
        vars,
        objective,
        constraints,
        production,
        qty,
        trips,
        inventory,
        emergency,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Plant, PlantKind, Route, RouteMode};
    use std::collections::BTreeMap as Map;

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
                    max_production_per_period: None,
                },
                Plant {
                    id: "GU_01".into(),
                    name: None,
                    kind: PlantKind::Consumer,
                    initial_inventory: 0.0,
                    max_capacity: 1000.0,
                    safety_stock: 0.0,
                    holding_cost: 0.0,
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
                    mode: "Road".into(),
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
    fn builds_one_variable_per_index() {
        let net = tiny_network();
        let built = build(&net, None);
        assert_eq!(built.production.len(), 1);
        assert_eq!(built.qty.len(), 1);
        assert_eq!(built.trips.len(), 1);
        assert_eq!(built.inventory.len(), 2);
        assert!(built.emergency.is_none());
    }

    #[test]
    fn emergency_variables_are_added_only_when_requested() {
        let net = tiny_network();
        let built = build(&net, Some(1_000_000.0));
        assert!(built.emergency.is_some());
        assert_eq!(built.emergency.unwrap().len(), 2);
    }

    #[test]
    fn constraint_count_matches_expected_families() {
        let net = tiny_network();
        let built = build(&net, None);
        // 1 shipment-capacity + 0 min-batch (sbq=0) + 0 production-cap (unbounded)
        // + (balance + safety + max) * 2 plants = 6.
        assert_eq!(built.constraints.len(), 1 + 6);
    }
}
