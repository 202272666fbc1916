//! The Tabular Loader: reads the eight canonical CSV input tables and
//! parses each row into a typed record, collecting every invalid row
//! (not just the first) as a structured [`PlannerError::Schema`].
//!
//! Header matching is case/whitespace-insensitive: column names are
//! compared after trimming and uppercasing, following the canonical
//! names the original service used as pydantic field aliases
//! (`IUGU CODE`, `TRANSPORT CODE`, `TIME PERIOD`, ...).

use crate::error::{PlannerError, PlannerResult};
use std::collections::HashMap;
use std::path::Path;

/// IUGUType.csv — declares whether a plant is a producer (`IU`) or
/// consumer (`GU`).
#[derive(Debug, Clone, PartialEq)]
pub struct IuguTypeRow {
    pub iugu_code: String,
    pub plant_type: String,
}

/// IUGUClosingStock.csv — end-of-horizon stock bounds per plant.
#[derive(Debug, Clone, PartialEq)]
pub struct IuguClosingStockRow {
    pub iugu_code: String,
    pub time_period: usize,
    pub min_close_stock: f64,
    pub max_close_stock: Option<f64>,
}

/// IUGUOpeningStock.csv — initial inventory per plant.
#[derive(Debug, Clone, PartialEq)]
pub struct IuguOpeningStockRow {
    pub iugu_code: String,
    pub opening_stock: f64,
}

/// IUGUConstraint.csv — strategic policy rows, pre-expansion.
#[derive(Debug, Clone, PartialEq)]
pub struct IuguConstraintRow {
    pub iu_code: String,
    pub transport_code: Option<String>,
    pub iugu_code: Option<String>,
    pub time_period: usize,
    pub bound_typeid: String,
    pub value_typeid: String,
    pub value: f64,
}

/// LogisticsIUGU.csv — per (origin, destination, mode, period) freight,
/// handling and trip-capacity-multiplier data.
#[derive(Debug, Clone, PartialEq)]
pub struct LogisticsIuguRow {
    pub from_iu_code: String,
    pub to_iugu_code: String,
    pub transport_code: String,
    pub time_period: usize,
    pub freight_cost: f64,
    pub handling_cost: f64,
    pub quantity_multiplier: f64,
}

/// ProductionCost.csv — per (IU, period) production cost.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductionCostRow {
    pub iu_code: String,
    pub time_period: usize,
    pub production_cost: f64,
}

/// ClinkerCapacity.csv — per (IU, period) production capacity.
#[derive(Debug, Clone, PartialEq)]
pub struct ClinkerCapacityRow {
    pub iu_code: String,
    pub time_period: usize,
    pub capacity: f64,
}

/// ClinkerDemand.csv — per (IUGU, period) demand, with an optional
/// minimum-fulfilment percentage.
#[derive(Debug, Clone, PartialEq)]
pub struct ClinkerDemandRow {
    pub iugu_code: String,
    pub time_period: usize,
    pub demand: f64,
    pub min_fulfillment_pct: Option<f64>,
}

/// The eight loaded tables, bundled for the Model Assembler.
#[derive(Debug, Clone, Default)]
pub struct OptimizationInput {
    pub iugu_type: Vec<IuguTypeRow>,
    pub iugu_closing_stock: Vec<IuguClosingStockRow>,
    pub iugu_opening_stock: Vec<IuguOpeningStockRow>,
    pub iugu_constraints: Vec<IuguConstraintRow>,
    pub logistics_iugu: Vec<LogisticsIuguRow>,
    pub production_cost: Vec<ProductionCostRow>,
    pub clinker_capacity: Vec<ClinkerCapacityRow>,
    pub clinker_demand: Vec<ClinkerDemandRow>,
}

/// Loads all eight tables from the given directory, using the canonical
/// file names. Returns the parsed input plus every row-level error
/// encountered across every table.
pub fn load_directory(dir: &Path) -> PlannerResult<(OptimizationInput, Vec<PlannerError>)> {
    let mut errors = Vec::new();
    let mut input = OptimizationInput::default();

    let (rows, mut errs) = load_table(&dir.join("IUGUType.csv"), "IUGUType", parse_iugu_type)?;
    input.iugu_type = rows;
    errors.append(&mut errs);

    let (rows, mut errs) = load_table(
        &dir.join("IUGUClosingStock.csv"),
        "IUGUClosingStock",
        parse_closing_stock,
    )?;
    input.iugu_closing_stock = rows;
    errors.append(&mut errs);

    let (rows, mut errs) = load_table(
        &dir.join("IUGUOpeningStock.csv"),
        "IUGUOpeningStock",
        parse_opening_stock,
    )?;
    input.iugu_opening_stock = rows;
    errors.append(&mut errs);

    let (rows, mut errs) = load_table(
        &dir.join("IUGUConstraint.csv"),
        "IUGUConstraint",
        parse_constraint,
    )?;
    input.iugu_constraints = rows;
    errors.append(&mut errs);

    let (rows, mut errs) = load_table(
        &dir.join("LogisticsIUGU.csv"),
        "LogisticsIUGU",
        parse_logistics,
    )?;
    input.logistics_iugu = rows;
    errors.append(&mut errs);

    let (rows, mut errs) = load_table(
        &dir.join("ProductionCost.csv"),
        "ProductionCost",
        parse_production_cost,
    )?;
    input.production_cost = rows;
    errors.append(&mut errs);

    let (rows, mut errs) = load_table(
        &dir.join("ClinkerCapacity.csv"),
        "ClinkerCapacity",
        parse_capacity,
    )?;
    input.clinker_capacity = rows;
    errors.append(&mut errs);

    let (rows, mut errs) = load_table(
        &dir.join("ClinkerDemand.csv"),
        "ClinkerDemand",
        parse_demand,
    )?;
    input.clinker_demand = rows;
    errors.append(&mut errs);

    Ok((input, errors))
}

/// A single CSV row, indexed by normalised (trimmed, uppercased) header
/// name so lookups are resilient to the header casing/whitespace
/// variation seen across real export files.
struct NormalizedRow<'a> {
    table: &'a str,
    row: usize,
    fields: HashMap<String, String>,
}

impl<'a> NormalizedRow<'a> {
    fn get(&self, column: &str) -> Option<&str> {
        self.fields.get(column).map(|s| s.as_str())
    }

    fn required(&self, column: &str) -> Result<&str, PlannerError> {
        match self.get(column).map(str::trim).filter(|s| !s.is_empty()) {
            Some(v) => Ok(v),
            None => Err(PlannerError::schema(
                self.table,
                self.row,
                column,
                "missing or empty required field",
            )),
        }
    }

    fn required_f64(&self, column: &str) -> Result<f64, PlannerError> {
        let raw = self.required(column)?;
        raw.parse::<f64>().map_err(|_| {
            PlannerError::schema(self.table, self.row, column, format!("'{raw}' is not a number"))
        })
    }

    fn required_usize(&self, column: &str) -> Result<usize, PlannerError> {
        let raw = self.required(column)?;
        raw.parse::<usize>().map_err(|_| {
            PlannerError::schema(
                self.table,
                self.row,
                column,
                format!("'{raw}' is not a positive integer"),
            )
        })
    }

    fn optional_f64(&self, column: &str) -> Result<Option<f64>, PlannerError> {
        match self.get(column).map(str::trim).filter(|s| !s.is_empty()) {
            None => Ok(None),
            Some(raw) => raw.parse::<f64>().map(Some).map_err(|_| {
                PlannerError::schema(self.table, self.row, column, format!("'{raw}' is not a number"))
            }),
        }
    }

    /// Like [`Self::required_f64`], but rejects negative values instead of
    /// silently clamping them at assembly time.
    fn required_f64_nonneg(&self, column: &str) -> Result<f64, PlannerError> {
        let value = self.required_f64(column)?;
        if value < 0.0 {
            return Err(PlannerError::schema(
                self.table,
                self.row,
                column,
                format!("'{value}' is negative, expected a non-negative value"),
            ));
        }
        Ok(value)
    }

    /// Like [`Self::required_f64_nonneg`], but also rejects zero. Used for
    /// fields that are divided into or multiplied against (trip capacity,
    /// quantity multipliers) where zero would make the row meaningless.
    fn required_f64_positive(&self, column: &str) -> Result<f64, PlannerError> {
        let value = self.required_f64(column)?;
        if value <= 0.0 {
            return Err(PlannerError::schema(
                self.table,
                self.row,
                column,
                format!("'{value}' is not positive, expected a value greater than zero"),
            ));
        }
        Ok(value)
    }

    /// Like [`Self::optional_f64`], but rejects a negative value when present.
    fn optional_f64_nonneg(&self, column: &str) -> Result<Option<f64>, PlannerError> {
        match self.optional_f64(column)? {
            None => Ok(None),
            Some(value) if value < 0.0 => Err(PlannerError::schema(
                self.table,
                self.row,
                column,
                format!("'{value}' is negative, expected a non-negative value"),
            )),
            some => Ok(some),
        }
    }

    /// Like [`Self::optional_f64_nonneg`], but also bounds the value to
    /// `0.0..=1.0`. Used for the demand table's fulfilment percentage.
    fn optional_f64_fraction(&self, column: &str) -> Result<Option<f64>, PlannerError> {
        match self.optional_f64(column)? {
            None => Ok(None),
            Some(value) if !(0.0..=1.0).contains(&value) => Err(PlannerError::schema(
                self.table,
                self.row,
                column,
                format!("'{value}' is outside the 0..=1 range expected for a fraction"),
            )),
            some => Ok(some),
        }
    }

    fn optional_string(&self, column: &str) -> Option<String> {
        self.get(column)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }
}

fn load_table<T>(
    path: &Path,
    table: &str,
    parse_row: impl Fn(&NormalizedRow) -> Result<T, PlannerError>,
) -> PlannerResult<(Vec<T>, Vec<PlannerError>)> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|e| PlannerError::schema(table, 0, "<file>", e.to_string()))?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| PlannerError::schema(table, 0, "<header>", e.to_string()))?
        .iter()
        .map(normalize_header)
        .collect();

    let mut rows = Vec::new();
    let mut errors = Vec::new();

    for (idx, record) in reader.records().enumerate() {
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                errors.push(PlannerError::schema(table, idx, "<row>", e.to_string()));
                continue;
            }
        };

        let mut fields = HashMap::with_capacity(headers.len());
        for (col, value) in headers.iter().zip(record.iter()) {
            fields.insert(col.clone(), value.to_string());
        }

        let normalized = NormalizedRow {
            table,
            row: idx,
            fields,
        };

        match parse_row(&normalized) {
            Ok(row) => rows.push(row),
            Err(e) => errors.push(e),
        }
    }

    Ok((rows, errors))
}

fn normalize_header(raw: &str) -> String {
    raw.trim().to_uppercase()
}

fn parse_iugu_type(row: &NormalizedRow) -> Result<IuguTypeRow, PlannerError> {
    Ok(IuguTypeRow {
        iugu_code: row.required("IUGU CODE")?.to_string(),
        plant_type: row.required("PLANT TYPE")?.to_string(),
    })
}

fn parse_closing_stock(row: &NormalizedRow) -> Result<IuguClosingStockRow, PlannerError> {
    Ok(IuguClosingStockRow {
        iugu_code: row.required("IUGU CODE")?.to_string(),
        time_period: row.required_usize("TIME PERIOD")?,
        min_close_stock: row.required_f64_nonneg("MIN CLOSE STOCK")?,
        max_close_stock: row.optional_f64_nonneg("MAX CLOSE STOCK")?,
    })
}

fn parse_opening_stock(row: &NormalizedRow) -> Result<IuguOpeningStockRow, PlannerError> {
    Ok(IuguOpeningStockRow {
        iugu_code: row.required("IUGU CODE")?.to_string(),
        opening_stock: row.required_f64_nonneg("OPENING STOCK")?,
    })
}

fn parse_constraint(row: &NormalizedRow) -> Result<IuguConstraintRow, PlannerError> {
    Ok(IuguConstraintRow {
        iu_code: row.required("IU CODE")?.to_string(),
        transport_code: row.optional_string("TRANSPORT CODE"),
        iugu_code: row.optional_string("IUGU CODE"),
        time_period: row.required_usize("TIME PERIOD")?,
        bound_typeid: row.required("BOUND TYPEID")?.to_string(),
        value_typeid: row.optional_string("VALUE TYPEID").unwrap_or_default(),
        value: row.required_f64_nonneg("VALUE")?,
    })
}

fn parse_logistics(row: &NormalizedRow) -> Result<LogisticsIuguRow, PlannerError> {
    Ok(LogisticsIuguRow {
        from_iu_code: row.required("FROM IU CODE")?.to_string(),
        to_iugu_code: row.required("TO IUGU CODE")?.to_string(),
        transport_code: row.required("TRANSPORT CODE")?.to_string(),
        time_period: row.required_usize("TIME PERIOD")?,
        freight_cost: row.required_f64_nonneg("FREIGHT COST")?,
        handling_cost: row.required_f64_nonneg("HANDLING COST")?,
        quantity_multiplier: row.required_f64_positive("QUANTITY MULTIPLIER")?,
    })
}

fn parse_production_cost(row: &NormalizedRow) -> Result<ProductionCostRow, PlannerError> {
    Ok(ProductionCostRow {
        iu_code: row.required("IU CODE")?.to_string(),
        time_period: row.required_usize("TIME PERIOD")?,
        production_cost: row.required_f64_nonneg("PRODUCTION COST")?,
    })
}

fn parse_capacity(row: &NormalizedRow) -> Result<ClinkerCapacityRow, PlannerError> {
    Ok(ClinkerCapacityRow {
        iu_code: row.required("IU CODE")?.to_string(),
        time_period: row.required_usize("TIME PERIOD")?,
        capacity: row.required_f64_nonneg("CAPACITY")?,
    })
}

fn parse_demand(row: &NormalizedRow) -> Result<ClinkerDemandRow, PlannerError> {
    Ok(ClinkerDemandRow {
        iugu_code: row.required("IUGU CODE")?.to_string(),
        time_period: row.required_usize("TIME PERIOD")?,
        demand: row.required_f64_nonneg("DEMAND")?,
        min_fulfillment_pct: row.optional_f64_fraction("MIN FULFILLMENT (%)")?,
    })
}
