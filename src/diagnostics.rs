//! Two distinct kinds of diagnostics:
//!
//! - [`Diagnostics`]/[`DiagnosticIssue`]: warnings collected while loading
//!   and assembling the network (e.g. a defaulted closing-stock bound, a
//!   strategic row with no matching triples). Grounded on the pack's
//!   `Diagnostics`/`DiagnosticIssue` shape.
//! - [`aggregate`]: the numeric per-plant/per-period/global metrics spec'd
//!   for the post-solve `PlanDiagnostics`, computed from the solved
//!   schedule rather than collected during loading.

use crate::types::{Network, PeriodMetrics, PlantMetrics, PlanDiagnostics, ScheduledTrip};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticIssue {
    pub severity: Severity,
    pub category: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
}

impl DiagnosticIssue {
    pub fn new(severity: Severity, category: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity,
            category: category.into(),
            message: message.into(),
            entity: None,
        }
    }

    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }
}

impl std::fmt::Display for DiagnosticIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let severity = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "[{}:{}] {}", severity, self.category, self.message)?;
        if let Some(entity) = &self.entity {
            write!(f, " ({entity})")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<DiagnosticIssue>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_warning(&mut self, category: &str, message: impl Into<String>) {
        self.issues
            .push(DiagnosticIssue::new(Severity::Warning, category, message));
    }

    pub fn add_warning_with_entity(&mut self, category: &str, message: impl Into<String>, entity: &str) {
        self.issues
            .push(DiagnosticIssue::new(Severity::Warning, category, message).with_entity(entity));
    }

    pub fn has_warnings(&self) -> bool {
        !self.issues.is_empty()
    }

    pub fn merge(&mut self, other: Diagnostics) {
        self.issues.extend(other.issues);
    }

    pub fn summary(&self) -> String {
        let n = self.issues.len();
        if n == 0 {
            "No issues".to_string()
        } else {
            format!("{n} warning{}", if n == 1 { "" } else { "s" })
        }
    }
}

impl std::fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Diagnostics: {}", self.summary())?;
        for issue in &self.issues {
            writeln!(f, "  {issue}")?;
        }
        Ok(())
    }
}

/// Builds the post-solve `PlanDiagnostics`: per-plant totals/averages,
/// per-period totals, the count of routes that carried at least one
/// nonzero shipment, and the average inventory-capacity utilisation
/// across all (plant, period) pairs.
pub fn aggregate(
    network: &Network,
    trips: &[ScheduledTrip],
    production: &BTreeMap<(String, usize), f64>,
    inventory: &BTreeMap<(String, usize), f64>,
) -> PlanDiagnostics {
    let mut per_plant: BTreeMap<String, PlantMetrics> = BTreeMap::new();
    let mut per_period: BTreeMap<usize, PeriodMetrics> = BTreeMap::new();
    let mut utilisation_sum = 0.0;
    let mut utilisation_count = 0usize;

    for plant in &network.plants {
        let mut total_production = 0.0;
        let mut inventory_sum = 0.0;
        let mut capacity_sum = 0.0;

        for t in 1..=network.horizon {
            let inv = inventory.get(&(plant.id.clone(), t)).copied().unwrap_or(0.0);
            inventory_sum += inv;
            if plant.max_capacity > 0.0 {
                utilisation_sum += inv / plant.max_capacity;
                utilisation_count += 1;
                capacity_sum += plant.max_capacity;
            }
            if plant.is_producer() {
                total_production += production.get(&(plant.id.clone(), t)).copied().unwrap_or(0.0);
            }
        }

        let avg_inventory = if network.horizon > 0 {
            inventory_sum / network.horizon as f64
        } else {
            0.0
        };
        let capacity_utilisation = if capacity_sum > 0.0 {
            inventory_sum / capacity_sum
        } else {
            0.0
        };

        per_plant.insert(
            plant.id.clone(),
            PlantMetrics {
                total_production,
                avg_inventory,
                capacity_utilisation,
            },
        );
    }

    for trip in trips {
        let entry = per_period.entry(trip.period).or_default();
        entry.transport += trip.quantity_shipped;
        entry.num_trips += trip.num_trips;
    }
    for ((_, t), qty) in production {
        per_period.entry(*t).or_default().production += qty;
    }

    let num_active_routes = trips
        .iter()
        .filter(|t| t.quantity_shipped > 1e-9)
        .map(|t| t.route_id.clone())
        .collect::<BTreeSet<_>>()
        .len();

    let avg_inventory_utilisation = if utilisation_count > 0 {
        utilisation_sum / utilisation_count as f64
    } else {
        0.0
    };

    PlanDiagnostics {
        per_plant,
        per_period,
        num_active_routes,
        avg_inventory_utilisation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Plant, PlantKind};

    fn network_with_one_plant() -> Network {
        Network {
            horizon: 2,
            plants: vec![Plant {
                id: "IU_1".into(),
                name: None,
                kind: PlantKind::Producer,
                initial_inventory: 0.0,
                max_capacity: 100.0,
                safety_stock: 0.0,
                holding_cost: 1.0,
                production_cost: 10.0,
                max_production_per_period: None,
            }],
            routes: vec![],
            demand: BTreeMap::new(),
            min_fulfillment: BTreeMap::new(),
            strategic_constraints: vec![],
        }
    }

    #[test]
    fn aggregate_computes_average_inventory_and_utilisation() {
        let net = network_with_one_plant();
        let mut inventory = BTreeMap::new();
        inventory.insert(("IU_1".to_string(), 1), 50.0);
        inventory.insert(("IU_1".to_string(), 2), 100.0);

        let diag = aggregate(&net, &[], &BTreeMap::new(), &inventory);
        let m = diag.per_plant.get("IU_1").unwrap();
        assert!((m.avg_inventory - 75.0).abs() < 1e-9);
        assert!((m.capacity_utilisation - 0.75).abs() < 1e-9);
    }

    #[test]
    fn diagnostics_summary_counts_issues() {
        let mut d = Diagnostics::new();
        assert_eq!(d.summary(), "No issues");
        d.add_warning("assembly", "defaulted max_capacity for plant");
        assert_eq!(d.summary(), "1 warning");
    }
}
