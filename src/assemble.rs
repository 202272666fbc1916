//! The Model Assembler: turns loaded table rows into a [`Network`] —
//! plants with derived bounds, deduplicated routes with averaged costs,
//! the sparse demand map, and the horizon.
//!
//! Grounded on `_build_optimization_request_from_csvs`
//! (`original_source/backend/app/advanced_endpoints.py`), adapted to
//! follow this crate's own averaging/clamping policy rather than the
//! original's period-1-only heuristic (see DESIGN.md).

use crate::diagnostics::Diagnostics;
use crate::error::{PlannerError, PlannerResult};
use crate::tables::OptimizationInput;
use crate::types::{BoundKind, Network, Plant, PlantKind, Route, RouteMode, StrategicConstraintRow};
use std::collections::{BTreeMap, BTreeSet};

pub fn assemble(input: &OptimizationInput) -> PlannerResult<(Network, Diagnostics)> {
    let mut diagnostics = Diagnostics::new();

    let horizon = observed_horizon(input);

    let plants = assemble_plants(input, &mut diagnostics)?;
    let plant_ids: BTreeSet<String> = plants.iter().map(|p| p.id.clone()).collect();
    let producer_ids: BTreeSet<String> = plants
        .iter()
        .filter(|p| p.is_producer())
        .map(|p| p.id.clone())
        .collect();

    let routes = assemble_routes(input, &plant_ids, &producer_ids)?;
    let demand = assemble_demand(input, horizon, &plant_ids)?;
    let min_fulfillment = assemble_min_fulfillment(input);
    let strategic_constraints = assemble_strategic_constraints(input, &producer_ids, horizon, &mut diagnostics);

    let network = Network {
        horizon,
        plants,
        routes,
        demand,
        min_fulfillment,
        strategic_constraints,
    };

    Ok((network, diagnostics))
}

fn observed_horizon(input: &OptimizationInput) -> usize {
    let mut max_period = 0usize;
    for r in &input.iugu_closing_stock {
        max_period = max_period.max(r.time_period);
    }
    for r in &input.production_cost {
        max_period = max_period.max(r.time_period);
    }
    for r in &input.clinker_capacity {
        max_period = max_period.max(r.time_period);
    }
    for r in &input.clinker_demand {
        max_period = max_period.max(r.time_period);
    }
    for r in &input.logistics_iugu {
        max_period = max_period.max(r.time_period);
    }
    for r in &input.iugu_constraints {
        max_period = max_period.max(r.time_period);
    }
    max_period.max(1)
}

fn assemble_plants(input: &OptimizationInput, diagnostics: &mut Diagnostics) -> PlannerResult<Vec<Plant>> {
    let mut seen = BTreeSet::new();
    for row in &input.iugu_type {
        if !seen.insert(row.iugu_code.clone()) {
            return Err(PlannerError::reference(
                row.iugu_code.clone(),
                "duplicate plant identifier",
            ));
        }
    }

    let opening_stock: BTreeMap<&str, f64> = input
        .iugu_opening_stock
        .iter()
        .map(|r| (r.iugu_code.as_str(), r.opening_stock))
        .collect();

    let mut min_close: BTreeMap<&str, f64> = BTreeMap::new();
    let mut max_close: BTreeMap<&str, f64> = BTreeMap::new();
    for r in &input.iugu_closing_stock {
        min_close
            .entry(r.iugu_code.as_str())
            .and_modify(|v| *v = v.min(r.min_close_stock))
            .or_insert(r.min_close_stock);
        let max_candidate = r.max_close_stock.unwrap_or(r.min_close_stock);
        max_close
            .entry(r.iugu_code.as_str())
            .and_modify(|v| *v = v.max(max_candidate))
            .or_insert(max_candidate);
    }

    let mut production_costs: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for r in &input.production_cost {
        production_costs
            .entry(r.iu_code.as_str())
            .or_default()
            .push(r.production_cost);
    }

    let mut capacities: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for r in &input.clinker_capacity {
        capacities.entry(r.iu_code.as_str()).or_default().push(r.capacity);
    }

    let mut plants = Vec::with_capacity(input.iugu_type.len());
    for row in &input.iugu_type {
        let kind = match row.plant_type.trim().to_uppercase().as_str() {
            "IU" => PlantKind::Producer,
            "GU" => PlantKind::Consumer,
            other => {
                diagnostics.add_warning_with_entity(
                    "assembly",
                    format!("unrecognised plant type '{other}', defaulting to consumer"),
                    &row.iugu_code,
                );
                PlantKind::Consumer
            }
        };

        let initial_inventory = opening_stock.get(row.iugu_code.as_str()).copied().unwrap_or(0.0);
        let safety_stock = min_close.get(row.iugu_code.as_str()).copied().unwrap_or(0.0);
        let mut max_capacity = max_close.get(row.iugu_code.as_str()).copied().unwrap_or(0.0);
        let floor = initial_inventory.max(safety_stock).max(1.0);
        if max_capacity < floor {
            diagnostics.add_warning_with_entity(
                "assembly",
                format!("max_capacity clamped to {floor} to respect initial inventory and safety stock"),
                &row.iugu_code,
            );
            max_capacity = floor;
        }

        let (production_cost, max_production_per_period) = if kind == PlantKind::Producer {
            let costs = production_costs.get(row.iugu_code.as_str());
            let avg_cost = costs.map(|v| v.iter().sum::<f64>() / v.len() as f64).unwrap_or(0.0);

            let caps = capacities.get(row.iugu_code.as_str());
            let avg_cap = caps.map(|v| v.iter().sum::<f64>() / v.len() as f64);
            let avg_cap = avg_cap.filter(|v| *v > 0.0);

            (avg_cost, avg_cap)
        } else {
            (0.0, None)
        };

        plants.push(Plant {
            id: row.iugu_code.clone(),
            name: None,
            kind,
            initial_inventory,
            max_capacity,
            safety_stock,
            holding_cost: 0.0,
            production_cost,
            max_production_per_period,
        });
    }

    Ok(plants)
}

fn assemble_routes(
    input: &OptimizationInput,
    plant_ids: &BTreeSet<String>,
    producer_ids: &BTreeSet<String>,
) -> PlannerResult<Vec<Route>> {
    struct ModeAccum {
        unit_cost_sum: f64,
        handling_cost_sum: f64,
        capacity_sum: f64,
        n: usize,
    }

    let mut by_route: BTreeMap<(String, String), BTreeMap<String, ModeAccum>> = BTreeMap::new();

    for row in &input.logistics_iugu {
        if !plant_ids.contains(&row.from_iu_code) {
            return Err(PlannerError::reference(
                row.from_iu_code.clone(),
                "route origin references an unknown plant",
            ));
        }
        if !plant_ids.contains(&row.to_iugu_code) {
            return Err(PlannerError::reference(
                row.to_iugu_code.clone(),
                "route destination references an unknown plant",
            ));
        }
        if row.from_iu_code == row.to_iugu_code {
            return Err(PlannerError::reference(row.from_iu_code.clone(), "route is a self-loop"));
        }
        if !producer_ids.contains(&row.from_iu_code) {
            return Err(PlannerError::reference(
                row.from_iu_code.clone(),
                "route origin is not a producer",
            ));
        }

        let key = (row.from_iu_code.clone(), row.to_iugu_code.clone());
        let modes = by_route.entry(key).or_default();
        let accum = modes.entry(row.transport_code.clone()).or_insert(ModeAccum {
            unit_cost_sum: 0.0,
            handling_cost_sum: 0.0,
            capacity_sum: 0.0,
            n: 0,
        });
        accum.unit_cost_sum += row.freight_cost;
        accum.handling_cost_sum += row.handling_cost;
        accum.capacity_sum += row.quantity_multiplier;
        accum.n += 1;
    }

    let mut routes = Vec::with_capacity(by_route.len());
    for ((origin, destination), modes) in by_route {
        let mut route_modes = Vec::with_capacity(modes.len());
        for (mode, accum) in modes {
            let n = accum.n.max(1) as f64;
            route_modes.push(RouteMode {
                mode,
                unit_cost: accum.unit_cost_sum / n,
                handling_cost: accum.handling_cost_sum / n,
                // `QUANTITY MULTIPLIER` is validated strictly positive at load
                // time (tables.rs), so the average of one or more positive
                // values is itself always positive; no floor clamp needed.
                capacity_per_trip: accum.capacity_sum / n,
            });
        }
        routes.push(Route {
            id: format!("{origin}->{destination}"),
            origin_id: origin,
            destination_id: destination,
            minimum_shipment_batch_quantity: 0.0,
            modes: route_modes,
        });
    }

    Ok(routes)
}

fn assemble_demand(
    input: &OptimizationInput,
    horizon: usize,
    plant_ids: &BTreeSet<String>,
) -> PlannerResult<BTreeMap<String, Vec<f64>>> {
    let mut demand: BTreeMap<String, Vec<f64>> = BTreeMap::new();

    for row in &input.clinker_demand {
        if !plant_ids.contains(&row.iugu_code) {
            return Err(PlannerError::reference(
                row.iugu_code.clone(),
                "demand references an unknown plant",
            ));
        }
        let series = demand.entry(row.iugu_code.clone()).or_insert_with(|| vec![0.0; horizon]);
        if row.time_period >= 1 && row.time_period <= horizon {
            series[row.time_period - 1] = row.demand;
        }
    }

    Ok(demand)
}

fn assemble_min_fulfillment(input: &OptimizationInput) -> BTreeMap<(String, usize), f64> {
    input
        .clinker_demand
        .iter()
        .filter_map(|r| r.min_fulfillment_pct.map(|pct| ((r.iugu_code.clone(), r.time_period), pct)))
        .collect()
}

fn assemble_strategic_constraints(
    input: &OptimizationInput,
    producer_ids: &BTreeSet<String>,
    horizon: usize,
    diagnostics: &mut Diagnostics,
) -> Vec<StrategicConstraintRow> {
    let mut rows = Vec::with_capacity(input.iugu_constraints.len());
    for row in &input.iugu_constraints {
        if !producer_ids.contains(&row.iu_code) {
            diagnostics.add_warning_with_entity(
                "strategic",
                "strategic row references a plant that is not a producer; skipped",
                &row.iu_code,
            );
            continue;
        }
        if row.time_period < 1 || row.time_period > horizon {
            diagnostics.add_warning_with_entity(
                "strategic",
                format!("strategic row period {} is outside the horizon; skipped", row.time_period),
                &row.iu_code,
            );
            continue;
        }

        let bound = match row.bound_typeid.trim().to_uppercase().as_str() {
            "L" | "G" => BoundKind::Lower,
            "U" => BoundKind::Upper,
            "E" => BoundKind::Equal,
            other => {
                diagnostics.add_warning_with_entity(
                    "strategic",
                    format!("unrecognised bound type '{other}', defaulting to lower"),
                    &row.iu_code,
                );
                BoundKind::Lower
            }
        };

        rows.push(StrategicConstraintRow {
            producer_id: row.iu_code.clone(),
            destination_id: row.iugu_code.clone(),
            mode: row.transport_code.clone(),
            period: row.time_period,
            bound,
            value: row.value,
        });
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::{
        ClinkerCapacityRow, ClinkerDemandRow, IuguClosingStockRow, IuguOpeningStockRow, IuguTypeRow,
        LogisticsIuguRow, ProductionCostRow,
    };

    fn sample_input() -> OptimizationInput {
        OptimizationInput {
            iugu_type: vec![
                IuguTypeRow {
                    iugu_code: "IU_01".into(),
                    plant_type: "IU".into(),
                },
                IuguTypeRow {
                    iugu_code: "GU_01".into(),
                    plant_type: "GU".into(),
                },
            ],
            iugu_closing_stock: vec![IuguClosingStockRow {
                iugu_code: "IU_01".into(),
                time_period: 1,
                min_close_stock: 5.0,
                max_close_stock: Some(200.0),
            }],
            iugu_opening_stock: vec![IuguOpeningStockRow {
                iugu_code: "IU_01".into(),
                opening_stock: 50.0,
            }],
            iugu_constraints: vec![],
            logistics_iugu: vec![
                LogisticsIuguRow {
                    from_iu_code: "IU_01".into(),
                    to_iugu_code: "GU_01".into(),
                    transport_code: "Road".into(),
                    time_period: 1,
                    freight_cost: 2.0,
                    handling_cost: 0.5,
                    quantity_multiplier: 25.0,
                },
                LogisticsIuguRow {
                    from_iu_code: "IU_01".into(),
                    to_iugu_code: "GU_01".into(),
                    transport_code: "Road".into(),
                    time_period: 2,
                    freight_cost: 4.0,
                    handling_cost: 0.5,
                    quantity_multiplier: 25.0,
                },
            ],
            production_cost: vec![ProductionCostRow {
                iu_code: "IU_01".into(),
                time_period: 1,
                production_cost: 10.0,
            }],
            clinker_capacity: vec![ClinkerCapacityRow {
                iu_code: "IU_01".into(),
                time_period: 1,
                capacity: 500.0,
            }],
            clinker_demand: vec![ClinkerDemandRow {
                iugu_code: "GU_01".into(),
                time_period: 1,
                demand: 20.0,
                min_fulfillment_pct: Some(0.8),
            }],
        }
    }

    #[test]
    fn assembles_plants_routes_and_demand() {
        let (net, diag) = assemble(&sample_input()).unwrap();
        assert_eq!(net.horizon, 2);
        assert_eq!(net.plants.len(), 2);
        assert_eq!(net.routes.len(), 1);
        let route = &net.routes[0];
        assert_eq!(route.modes.len(), 1);
        assert!((route.modes[0].unit_cost - 3.0).abs() < 1e-9);
        assert_eq!(net.demand_at("GU_01", 1), 20.0);
        assert_eq!(net.demand_at("GU_01", 2), 0.0);
        assert_eq!(net.min_fulfillment.get(&("GU_01".to_string(), 1)), Some(&0.8));
        assert!(!diag.has_warnings());
    }

    #[test]
    fn rejects_duplicate_plant_identifiers() {
        let mut input = sample_input();
        input.iugu_type.push(IuguTypeRow {
            iugu_code: "IU_01".into(),
            plant_type: "IU".into(),
        });
        let err = assemble(&input).unwrap_err();
        assert!(matches!(err, PlannerError::Reference { .. }));
    }

    #[test]
    fn rejects_self_loop_routes() {
        let mut input = sample_input();
        input.logistics_iugu.push(LogisticsIuguRow {
            from_iu_code: "IU_01".into(),
            to_iugu_code: "IU_01".into(),
            transport_code: "Road".into(),
            time_period: 1,
            freight_cost: 1.0,
            handling_cost: 0.0,
            quantity_multiplier: 10.0,
        });
        let err = assemble(&input).unwrap_err();
        assert!(matches!(err, PlannerError::Reference { .. }));
    }

    #[test]
    fn rejects_routes_whose_origin_is_not_a_producer() {
        let mut input = sample_input();
        input.logistics_iugu.push(LogisticsIuguRow {
            from_iu_code: "GU_01".into(),
            to_iugu_code: "IU_01".into(),
            transport_code: "Road".into(),
            time_period: 1,
            freight_cost: 1.0,
            handling_cost: 0.0,
            quantity_multiplier: 10.0,
        });
        let err = assemble(&input).unwrap_err();
        assert!(matches!(err, PlannerError::Reference { .. }));
    }
}
