use clap::{Parser, Subcommand, ValueEnum};
use clinkerflow_planner::config::SolverConfig;
use clinkerflow_planner::pipeline;
use clinkerflow_planner::types::TerminationStatus;
use color_eyre::eyre::Result;
use env_logger::{Builder, Env};
use owo_colors::{colors::{Green, Red, Yellow}, OwoColorize};
use std::path::PathBuf;
use std::process::exit;
use std::time::Duration;
use thousands::Separable;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Parser)]
#[command(name = "clinkerplan")]
#[command(about = format!("clinkerplan v{VERSION}: multi-period clinker flow planner"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Loads the eight canonical CSV tables from a directory, assembles
    /// the network, and solves the multi-period MILP.
    Solve {
        #[arg(long)]
        /// Directory containing the eight canonical input CSVs.
        input_dir: PathBuf,

        #[arg(long, default_value_t = 300)]
        /// Wall-clock time limit for the solver, in seconds.
        time_limit_seconds: u64,

        #[arg(long, default_value_t = 0.01)]
        /// Relative MIP optimality gap tolerance (0..=1).
        relative_gap: f64,

        #[arg(long)]
        /// Optional worker-thread hint passed through to the backend.
        threads: Option<u32>,

        #[arg(long, default_value_t = false)]
        /// If the base model is infeasible, re-solve with penalised
        /// emergency inflow rather than reporting Infeasible.
        enable_emergency_fallback: bool,

        #[arg(long, default_value_t = 1_000_000.0)]
        /// Per-unit penalty cost for emergency inflow. Must exceed the
        /// largest plausible legitimate per-unit cost in the model.
        emergency_unit_cost: f64,

        #[arg(long, default_value_t = true)]
        /// Compute the post-solve per-plant/per-period/global diagnostics.
        enable_diagnostics: bool,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Prints version information.
    #[command()]
    Version {},
}

fn main() -> Result<()> {
    let env = Env::new().filter_or("RUST_LOG", "info");
    Builder::from_env(env).init();
    color_eyre::install()?;

    let args = Cli::parse();

    match args.command {
        Commands::Version {} => {
            println!(
                "{} v{VERSION}: multi-period clinker flow planner",
                "clinkerplan".bold().fg::<Green>()
            );
            Ok(())
        }

        Commands::Solve {
            input_dir,
            time_limit_seconds,
            relative_gap,
            threads,
            enable_emergency_fallback,
            emergency_unit_cost,
            enable_diagnostics,
            format,
        } => {
            if !(0.0..=1.0).contains(&relative_gap) {
                eprintln!("Illegal relative_gap value: {relative_gap}");
                exit(1);
            }

            let config = SolverConfig {
                time_limit: Duration::from_secs(time_limit_seconds),
                relative_gap,
                threads,
                enable_diagnostics,
                enable_emergency_fallback,
                emergency_unit_cost,
            };

            let (plan, diagnostics) = pipeline::run(&input_dir, &config)?;

            if diagnostics.has_warnings() {
                log::warn!("{}", diagnostics.summary());
                for issue in &diagnostics.issues {
                    log::warn!("{issue}");
                }
            }

            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&plan)?),
                OutputFormat::Text => print_text(&plan),
            }

            match plan.status {
                TerminationStatus::Optimal => Ok(()),
                _ => exit(2),
            }
        }
    }
}

fn print_text(plan: &clinkerflow_planner::types::Plan) {
    match plan.status {
        TerminationStatus::Optimal => {
            println!("{}", "Optimal".bold().fg::<Green>());
            if let Some(cost) = plan.total_cost {
                println!("  total cost: {}", cost.round().separate_with_commas());
            }
            if let Some(breakdown) = &plan.cost_breakdown {
                println!(
                    "    production {} | transport {} | holding {}",
                    breakdown.production.round().separate_with_commas(),
                    breakdown.transport.round().separate_with_commas(),
                    breakdown.holding.round().separate_with_commas(),
                );
            }
            println!("  scheduled trips: {}", plan.scheduled_trips.len());
            for trip in &plan.scheduled_trips {
                println!(
                    "    T{} {} ({} -> {}, {}): {} trips, {} units",
                    trip.period,
                    trip.route_id,
                    trip.origin_id,
                    trip.destination_id,
                    trip.mode,
                    trip.num_trips,
                    trip.quantity_shipped
                );
            }
            if let Some(diag) = &plan.diagnostics {
                println!(
                    "  active routes: {} | avg inventory utilisation: {:.1}%",
                    diag.num_active_routes,
                    diag.avg_inventory_utilisation * 100.0
                );
            }
            if let Some(message) = &plan.message {
                println!("  {}", message.fg::<Yellow>());
            }
        }
        TerminationStatus::Infeasible => {
            println!("{}", "Infeasible".bold().fg::<Red>());
            if let Some(message) = &plan.message {
                println!("  {message}");
            }
        }
        other => {
            println!("{}", format!("{other:?}").bold().fg::<Red>());
            if let Some(message) = &plan.message {
                println!("  {message}");
            }
        }
    }
}
