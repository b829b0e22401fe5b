//! Method calibration CLI.
//!
//! Provides the `mcal` binary:
//!
//! - `validate` loads a configuration directory and reports its weights
//! - `requirements` prints the role table
//! - `calibrate` runs a scenario file through the engine
//!
//! Results go to stdout as JSON; logs go to stderr and honour `RUST_LOG`.

mod scenario;

use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use mcal_config::{load_configuration, ConfigPaths, ConfigValidationError};
use mcal_core::Role;
use mcal_engine::{
    role_profile, role_table, CalibrationOrchestrator, CancellationToken, EngineError,
};

use crate::scenario::Scenario;

/// Exit codes shared by every subcommand.
const EXIT_OK: i32 = 0;
const EXIT_CALIBRATION: i32 = 1;
const EXIT_CONFIG: i32 = 2;
const EXIT_IO: i32 = 3;

/// Method calibration engine tools.
#[derive(Parser)]
#[command(name = "mcal", about = "Method calibration engine tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a configuration directory.
    Validate {
        /// Directory holding the weights, penalties and thresholds documents.
        dir: PathBuf,
    },

    /// Print the layers each role requires.
    Requirements {
        /// Only print this role (e.g. META_TOOL).
        #[arg(short, long, value_parser = parse_role)]
        role: Option<Role>,
    },

    /// Calibrate every subject of a scenario file.
    Calibrate {
        /// Configuration directory.
        config: PathBuf,

        /// Scenario JSON file.
        scenario: PathBuf,

        /// Minimum acceptable final score.
        #[arg(long)]
        min_score: Option<f64>,

        /// Fail instead of warning when a subject is below `--min-score`.
        #[arg(long, requires = "min_score")]
        enforce: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let exit_code = match cli.command {
        Commands::Validate { dir } => run_validate(&dir),
        Commands::Requirements { role } => run_requirements(role),
        Commands::Calibrate {
            config,
            scenario,
            min_score,
            enforce,
        } => run_calibrate(&config, &scenario, min_score, enforce),
    };
    process::exit(exit_code);
}

fn parse_role(raw: &str) -> Result<Role, String> {
    raw.parse::<Role>().map_err(|e| e.to_string())
}

fn print_json(value: &serde_json::Value) {
    let json = serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize output: {}\"}}", e));
    println!("{}", json);
}

fn config_exit_code(err: &ConfigValidationError) -> i32 {
    match err {
        ConfigValidationError::Io { .. } | ConfigValidationError::Parse { .. } => EXIT_IO,
        _ => EXIT_CONFIG,
    }
}

/// Execute the validate subcommand.
///
/// Returns exit code: 0 = valid, 2 = invalid configuration,
/// 3 = unreadable or malformed document.
fn run_validate(dir: &Path) -> i32 {
    let store = match load_configuration(&ConfigPaths::in_dir(dir)) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Error: {}", e);
            return config_exit_code(&e);
        }
    };

    let aggregation = store.aggregation();
    let linear: serde_json::Map<String, serde_json::Value> = aggregation
        .linear_weights()
        .iter()
        .map(|(layer, w)| (layer.to_string(), serde_json::json!(w.value)))
        .collect();
    let interactions: Vec<serde_json::Value> = aggregation
        .interactions()
        .iter()
        .map(|t| {
            serde_json::json!({
                "key": t.key,
                "pair": [t.pair.0.as_str(), t.pair.1.as_str()],
                "value": t.value,
            })
        })
        .collect();

    print_json(&serde_json::json!({
        "config_hash": store.config_hash(),
        "linear_total": aggregation.linear_total(),
        "interaction_total": aggregation.interaction_total(),
        "linear_weights": linear,
        "interaction_weights": interactions,
        "penalties": store.penalties().len(),
        "thresholds": store.thresholds().len(),
    }));
    EXIT_OK
}

/// Execute the requirements subcommand. Always succeeds.
fn run_requirements(role: Option<Role>) -> i32 {
    let rows = match role {
        Some(role) => serde_json::json!([role_profile(role)]),
        None => serde_json::json!(role_table()),
    };
    print_json(&rows);
    EXIT_OK
}

/// Execute the calibrate subcommand.
///
/// Returns exit code: 0 = every subject calibrated (and passed, when
/// enforcing), 1 = a calibration failed or was rejected, 2 = invalid
/// configuration, 3 = unreadable or malformed input.
fn run_calibrate(
    config: &Path,
    scenario_path: &Path,
    min_score: Option<f64>,
    enforce: bool,
) -> i32 {
    let scenario = match Scenario::load(scenario_path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {}", e);
            return EXIT_IO;
        }
    };
    let requests = match scenario.requests() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: {}", e);
            return EXIT_IO;
        }
    };

    let orchestrator = CalibrationOrchestrator::new(Arc::new(scenario.evidence.clone()));
    if let Err(e) = orchestrator.load(&ConfigPaths::in_dir(config)) {
        eprintln!("Error: {}", e);
        return config_exit_code(&e);
    }

    let results = orchestrator.calibrate_batch(&requests, &CancellationToken::new());

    let mut exit_code = EXIT_OK;
    let mut report = Vec::with_capacity(results.len());
    for (request, outcome) in requests.iter().zip(results) {
        let method = &request.subject.method_id;
        match outcome {
            Ok(result) => {
                let passed = min_score.map_or(true, |min| result.passes(min));
                if !passed {
                    tracing::warn!(
                        %method,
                        score = result.final_score,
                        min_score = min_score.unwrap_or_default(),
                        "calibration below threshold"
                    );
                    if enforce {
                        exit_code = EXIT_CALIBRATION;
                    }
                }
                report.push(serde_json::json!({
                    "method_id": method,
                    "passed": passed,
                    "result": result,
                }));
            }
            Err(e) => {
                exit_code = EXIT_CALIBRATION;
                report.push(serde_json::json!({
                    "method_id": method,
                    "error": e.to_string(),
                    "kind": error_kind(&e),
                }));
            }
        }
    }

    print_json(&serde_json::Value::Array(report));
    exit_code
}

fn error_kind(err: &EngineError) -> &'static str {
    match err {
        EngineError::NotReady => "not_ready",
        EngineError::UnknownMethod { .. } => "unknown_method",
        EngineError::Graph(_) | EngineError::SubjectMismatch { .. } => "graph",
        EngineError::CompletenessViolation { .. } => "completeness",
        EngineError::Evidence { .. } => "evidence",
        EngineError::NoActiveWeights { .. } => "no_active_weights",
        EngineError::Cancelled => "cancelled",
    }
}
