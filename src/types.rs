//! Core domain types: plants, routes, the assembled network, and the
//! plan the solver produces. These are the shapes every other module
//! passes around; the tabular loader produces raw rows (see `tables.rs`),
//! the assembler turns those rows into the types below.

use serde::Serialize;
use std::collections::BTreeMap;

/// A plant node: either a producer (Integrated Unit) or a consumer
/// (Grinding Unit). Inventory is tracked at every plant across every
/// period; only producers may produce.
#[derive(Debug, Clone, PartialEq)]
pub struct Plant {
    pub id: String,
    pub name: Option<String>,
    pub kind: PlantKind,

    pub initial_inventory: f64,
    pub max_capacity: f64,
    pub safety_stock: f64,

    pub holding_cost: f64,
    /// Meaningful only when `kind == Producer`.
    pub production_cost: f64,
    /// Optional per-period production cap; producers only.
    pub max_production_per_period: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PlantKind {
    Producer,
    Consumer,
}

impl Plant {
    pub fn is_producer(&self) -> bool {
        matches!(self.kind, PlantKind::Producer)
    }

    /// Checks the invariant the Assembler otherwise enforces by
    /// construction (clamping `max_capacity` upward): useful when a
    /// `Plant` is built directly rather than derived from CSV rows.
    pub fn validate(&self) -> crate::error::PlannerResult<()> {
        if self.safety_stock > self.max_capacity {
            return Err(crate::error::PlannerError::invariant(
                self.id.clone(),
                "safety_stock exceeds max_capacity",
            ));
        }
        if self.initial_inventory > self.max_capacity {
            return Err(crate::error::PlannerError::invariant(
                self.id.clone(),
                "initial_inventory exceeds max_capacity",
            ));
        }
        Ok(())
    }
}

/// A transport option on a route: a symbolic mode code with its own
/// per-unit cost and per-trip vehicle capacity.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteMode {
    pub mode: String,
    pub unit_cost: f64,
    /// Handling cost component, added to the objective separately from
    /// `unit_cost` (which represents freight) when populated.
    pub handling_cost: f64,
    pub capacity_per_trip: f64,
}

/// A directed (origin, destination) pair, deduplicated across transport
/// modes. The origin must be a producer; self-loops are rejected by the
/// assembler before a `Route` is ever constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub id: String,
    pub origin_id: String,
    pub destination_id: String,
    pub minimum_shipment_batch_quantity: f64,
    pub modes: Vec<RouteMode>,
}

/// A single strategic policy row, already normalised (legacy `G` bound
/// coalesced to `Lower`, codes trimmed).
#[derive(Debug, Clone, PartialEq)]
pub struct StrategicConstraintRow {
    pub producer_id: String,
    pub destination_id: Option<String>,
    pub mode: Option<String>,
    pub period: usize,
    pub bound: BoundKind,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundKind {
    Lower,
    Upper,
    Equal,
}

/// The fully assembled network the MILP Builder consumes: plants, routes,
/// the demand series per plant, and the derived horizon.
#[derive(Debug, Clone)]
pub struct Network {
    pub horizon: usize,
    pub plants: Vec<Plant>,
    pub routes: Vec<Route>,
    /// demand[plant_id][t-1], t in 1..=horizon. Missing plants default to
    /// an all-zero series.
    pub demand: BTreeMap<String, Vec<f64>>,
    /// demand[(plant_id, period)] minimum fulfilment fraction, 0..=1, when
    /// the input table supplied one for that plant/period.
    pub min_fulfillment: BTreeMap<(String, usize), f64>,
    pub strategic_constraints: Vec<StrategicConstraintRow>,
}

impl Network {
    pub fn plant(&self, id: &str) -> Option<&Plant> {
        self.plants.iter().find(|p| p.id == id)
    }

    pub fn producers(&self) -> impl Iterator<Item = &Plant> {
        self.plants.iter().filter(|p| p.is_producer())
    }

    pub fn demand_at(&self, plant_id: &str, period: usize) -> f64 {
        self.demand
            .get(plant_id)
            .and_then(|series| series.get(period - 1))
            .copied()
            .unwrap_or(0.0)
    }
}

/// Public termination status, independent of any particular MILP backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TerminationStatus {
    Optimal,
    Infeasible,
    Unbounded,
    NotSolved,
    Error,
}

/// One dispatched-trip record in the final schedule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduledTrip {
    pub period: usize,
    pub route_id: String,
    pub origin_id: String,
    pub destination_id: String,
    pub mode: String,
    pub num_trips: u64,
    pub quantity_shipped: f64,
}

/// Objective sub-sums, re-evaluated on solved variable values rather than
/// read back from the objective value directly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CostBreakdown {
    pub production: f64,
    pub transport: f64,
    pub holding: f64,
}

impl CostBreakdown {
    pub fn total(&self) -> f64 {
        self.production + self.transport + self.holding
    }
}

/// Per-plant post-solve metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PlantMetrics {
    pub total_production: f64,
    pub avg_inventory: f64,
    pub capacity_utilisation: f64,
}

/// Per-period post-solve metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PeriodMetrics {
    pub production: f64,
    pub transport: f64,
    pub num_trips: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PlanDiagnostics {
    pub per_plant: BTreeMap<String, PlantMetrics>,
    pub per_period: BTreeMap<usize, PeriodMetrics>,
    pub num_active_routes: usize,
    pub avg_inventory_utilisation: f64,
}

/// The pipeline's terminal output: status, cost, schedule, diagnostics,
/// and an optional human-readable message (used by the fallback
/// orchestrator to record that emergency inflow was used).
#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    pub status: TerminationStatus,
    pub total_cost: Option<f64>,
    pub scheduled_trips: Vec<ScheduledTrip>,
    pub cost_breakdown: Option<CostBreakdown>,
    pub diagnostics: Option<PlanDiagnostics>,
    pub message: Option<String>,
}

impl Plan {
    pub fn unsolved(status: TerminationStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            total_cost: None,
            scheduled_trips: Vec::new(),
            cost_breakdown: None,
            diagnostics: None,
            message: Some(message.into()),
        }
    }
}
