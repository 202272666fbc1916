//! Solver and diagnostics configuration.
//!
//! Mirrors the recognised options of the external interface: time and gap
//! limits for the MILP backend, an optional thread hint, whether to run
//! the post-solve diagnostics pass, and whether the fallback orchestrator
//! may kick in on infeasibility. Values can be built from `Default`, from
//! CLI flags (see `main.rs`), or from environment variables prefixed
//! `CLINKER_`, in that order of increasing trust — the same layering the
//! original service applied via `pydantic_settings`, just expressed as a
//! plain struct with an explicit override method instead of a settings
//! framework.

use std::env;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct SolverConfig {
    /// Wall-clock budget for a single solve call.
    pub time_limit: Duration,
    /// Relative optimality gap tolerance, e.g. 0.01 for 1%.
    pub relative_gap: f64,
    /// Optional hint for the number of worker threads the backend may use.
    pub threads: Option<u32>,
    /// Whether to compute the post-solve diagnostics aggregations.
    pub enable_diagnostics: bool,
    /// Whether an infeasible base model triggers a re-solve with
    /// emergency inflow enabled.
    pub enable_emergency_fallback: bool,
    /// Per-unit penalty cost applied to emergency inflow. Must exceed the
    /// largest plausible legitimate per-unit cost in the model, or the
    /// fallback will prefer emergency inflow over a genuinely feasible
    /// allocation.
    pub emergency_unit_cost: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            time_limit: Duration::from_secs(300),
            relative_gap: 0.01,
            threads: None,
            enable_diagnostics: true,
            enable_emergency_fallback: false,
            emergency_unit_cost: 1_000_000.0,
        }
    }
}

impl SolverConfig {
    /// Overlays environment-variable overrides on top of the defaults.
    /// Unset or unparsable variables are left at their current value.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Some(v) = env_u64("CLINKER_TIME_LIMIT_SECONDS") {
            cfg.time_limit = Duration::from_secs(v);
        }
        if let Some(v) = env_f64("CLINKER_RELATIVE_GAP") {
            cfg.relative_gap = v;
        }
        if let Some(v) = env_u64("CLINKER_THREADS") {
            cfg.threads = Some(v as u32);
        }
        if let Some(v) = env_bool("CLINKER_ENABLE_DIAGNOSTICS") {
            cfg.enable_diagnostics = v;
        }
        if let Some(v) = env_bool("CLINKER_ENABLE_EMERGENCY_FALLBACK") {
            cfg.enable_emergency_fallback = v;
        }
        if let Some(v) = env_f64("CLINKER_EMERGENCY_UNIT_COST") {
            cfg.emergency_unit_cost = v;
        }

        cfg
    }
}

fn env_u64(key: &str) -> Option<u64> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}

fn env_f64(key: &str) -> Option<f64> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}

fn env_bool(key: &str) -> Option<bool> {
    env::var(key).ok().and_then(|v| match v.to_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_documented_values() {
        let cfg = SolverConfig::default();
        assert_eq!(cfg.time_limit, Duration::from_secs(300));
        assert!((cfg.relative_gap - 0.01).abs() < 1e-12);
        assert_eq!(cfg.threads, None);
        assert!(cfg.enable_diagnostics);
        assert!(!cfg.enable_emergency_fallback);
        assert!(cfg.emergency_unit_cost > 0.0);
    }

    #[test]
    fn env_bool_parses_common_spellings() {
        assert_eq!(env_bool_for_test("true"), Some(true));
        assert_eq!(env_bool_for_test("0"), Some(false));
        assert_eq!(env_bool_for_test("maybe"), None);
    }

    fn env_bool_for_test(v: &str) -> Option<bool> {
        match v.to_lowercase().as_str() {
            "1" | "true" | "yes" => Some(true),
            "0" | "false" | "no" => Some(false),
            _ => None,
        }
    }
}
