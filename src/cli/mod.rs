//! Command-line interface for the telemetry pipeline.

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::LogSchema;
use crate::core::loaders::{self, TelemetryTable};
use crate::PipelineConfig;

#[derive(Parser)]
#[command(name = "fleet-telemetry")]
#[command(about = "Energy analysis for fleet simulation telemetry logs", version)]
pub struct Cli {
    /// Path to YAML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Parse logs in the 12-field legacy layout
    #[arg(long, global = true)]
    legacy: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resample every unit's trajectory onto a uniform time grid
    Resample {
        /// Telemetry log file
        log_file: PathBuf,
        /// Output CSV file
        output: PathBuf,
        /// Grid points per unit
        #[arg(short, long)]
        num_points: Option<usize>,
    },

    /// Attribute one unit's energy consumption to planar grid cells
    Heatmap {
        /// Telemetry log file
        log_file: PathBuf,
        /// Output CSV file
        output: PathBuf,
        /// Cell edge length in position units
        #[arg(long)]
        cell_size: Option<f64>,
        /// Unit to attribute (defaults to the lowest unit id)
        #[arg(short, long)]
        unit: Option<i64>,
    },

    /// Break down component current draw by mission state
    Breakdown {
        /// Telemetry log file
        log_file: PathBuf,
        /// Output CSV file
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Unit to break down (defaults to the first unit with enough states)
        #[arg(short, long)]
        unit: Option<i64>,
        /// Distinct states a unit needs to be picked automatically
        #[arg(long)]
        min_states: Option<usize>,
    },

    /// Print a mission summary for every unit
    Summary {
        /// Telemetry log file
        log_file: PathBuf,
    },
}

/// Create a spinner for indeterminate operations
fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Print a summary box
fn print_summary(title: &str, items: &[(&str, String)]) {
    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║ {:<60} ║", title);
    println!("╠══════════════════════════════════════════════════════════════╣");
    for (key, value) in items {
        println!("║ {:<20}: {:<38} ║", key, summary_value(value));
    }
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
}

/// Fit a value into the summary box's value column.
fn summary_value(value: &str) -> String {
    if value.chars().count() > 38 {
        format!("{}...", value.chars().take(35).collect::<String>())
    } else {
        value.to_string()
    }
}

fn display_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{:.3}", v))
}

fn fail(spinner: &ProgressBar, context: &str, err: impl std::fmt::Display) -> ! {
    spinner.finish_and_clear();
    error!("{}: {}", context, err);
    std::process::exit(1);
}

pub fn run() {
    let cli = Cli::parse();

    // Initialize logging based on verbosity (must come first)
    env_logger::Builder::new()
        .filter_level(match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .format_timestamp_secs()
        .init();

    // Load config
    let mut config = match &cli.config {
        Some(path) => match PipelineConfig::from_yaml(path) {
            Ok(cfg) => {
                info!("Loaded config from: {}", path.display());
                cfg
            }
            Err(e) => {
                warn!("Failed to load config from {}: {}, using defaults", path.display(), e);
                PipelineConfig::default()
            }
        },
        None => PipelineConfig::default(),
    };

    if cli.legacy {
        config.parser.schema = LogSchema::Legacy;
    }

    // Dispatch to subcommands
    match cli.command {
        Commands::Resample { log_file, output, num_points } => {
            if let Some(n) = num_points {
                config.resample.num_points = n;
            }
            cmd_resample(&log_file, &output, &config);
        }
        Commands::Heatmap { log_file, output, cell_size, unit } => {
            if let Some(size) = cell_size {
                config.heatmap.cell_size = size;
            }
            if unit.is_some() {
                config.heatmap.unit = unit;
            }
            cmd_heatmap(&log_file, &output, &config);
        }
        Commands::Breakdown { log_file, output, unit, min_states } => {
            if let Some(n) = min_states {
                config.breakdown.min_states = n;
            }
            cmd_breakdown(&log_file, output.as_deref(), unit, &config);
        }
        Commands::Summary { log_file } => {
            cmd_summary(&log_file, &config);
        }
    }
}

/// Load the log behind a spinner, exiting on failure.
fn load_log(log_file: &Path, config: &PipelineConfig) -> (TelemetryTable, ProgressBar) {
    let spinner = create_spinner("Parsing telemetry log...");

    let table = match loaders::load_telemetry_log(log_file, &config.parser) {
        Ok(table) => table,
        Err(e) => fail(&spinner, "Failed to load telemetry log", e),
    };

    info!(
        "Parsed {} rows for {} units ({} malformed fields)",
        table.len(),
        table.unit_ids().len(),
        table.malformed.len()
    );

    (table, spinner)
}

fn cmd_resample(log_file: &Path, output: &Path, config: &PipelineConfig) {
    use crate::core::writers;
    use crate::processors::resampling;

    let start = Instant::now();
    let (table, spinner) = load_log(log_file, config);

    spinner.set_message("Resampling trajectories...");
    let trajectories = table.trajectories();
    let resampled = match resampling::resample_units(&trajectories, &config.resample) {
        Ok(resampled) => resampled,
        Err(e) => fail(&spinner, "Resampling failed", e),
    };

    spinner.set_message("Writing resampled table...");
    if let Err(e) = writers::write_resampled_csv(output, &resampled) {
        fail(&spinner, "Write failed", e);
    }
    spinner.finish_and_clear();

    print_summary(
        "Resampling Complete",
        &[
            ("Input log", log_file.display().to_string()),
            ("Output CSV", output.display().to_string()),
            ("Rows parsed", table.len().to_string()),
            ("Malformed fields", table.malformed.len().to_string()),
            ("Units", resampled.unit_ids.len().to_string()),
            ("Points per unit", resampled.num_points.to_string()),
            ("Rows written", resampled.len().to_string()),
            ("Duration", format!("{:.2?}", start.elapsed())),
        ],
    );
}

fn cmd_heatmap(log_file: &Path, output: &Path, config: &PipelineConfig) {
    use crate::core::writers;
    use crate::processors::heatmap;

    let start = Instant::now();
    let (table, spinner) = load_log(log_file, config);

    spinner.set_message("Attributing energy to grid cells...");
    let trajectories = table.trajectories();
    let grid = match heatmap::attribute_unit_energy(&trajectories, &config.heatmap) {
        Ok(grid) => grid,
        Err(e) => fail(&spinner, "Heatmap failed", e),
    };

    spinner.set_message("Writing heatmap...");
    if let Err(e) = writers::write_heatmap_csv(output, &grid) {
        fail(&spinner, "Write failed", e);
    }
    spinner.finish_and_clear();

    print_summary(
        "Energy Heatmap Complete",
        &[
            ("Input log", log_file.display().to_string()),
            ("Output CSV", output.display().to_string()),
            ("Unit", grid.unit_id().to_string()),
            ("Cell size", grid.cell_size().to_string()),
            ("Grid", format!("{} x {}", grid.cols(), grid.rows())),
            ("Segments", grid.segments.to_string()),
            ("Stationary segments", grid.stationary_segments.to_string()),
            ("Total energy share", format!("{:.3}", grid.total())),
            ("Peak cell", format!("{:.3}", grid.max_cell())),
            ("Duration", format!("{:.2?}", start.elapsed())),
        ],
    );
}

fn cmd_breakdown(log_file: &Path, output: Option<&Path>, unit: Option<i64>, config: &PipelineConfig) {
    use crate::core::trajectory::find_trajectory;
    use crate::core::writers;
    use crate::processors::breakdown;

    let start = Instant::now();
    let (table, spinner) = load_log(log_file, config);

    spinner.set_message("Selecting unit...");
    let trajectories = table.trajectories();
    let selected = match unit {
        Some(_) => match find_trajectory(&trajectories, unit) {
            Ok(t) => t,
            Err(e) => fail(&spinner, "Unit selection failed", e),
        },
        None => match breakdown::select_breakdown_unit(&trajectories, config.breakdown.min_states) {
            Some(t) => t,
            None => fail(
                &spinner,
                "Unit selection failed",
                format!("no unit visits {} distinct states", config.breakdown.min_states),
            ),
        },
    };

    let rows = breakdown::state_breakdown(selected);
    if rows.is_empty() {
        warn!("Unit {} has no transit or AoI samples", selected.unit_id());
    }

    if let Some(path) = output {
        spinner.set_message("Writing breakdown...");
        if let Err(e) = writers::write_breakdown_csv(path, &rows) {
            fail(&spinner, "Write failed", e);
        }
    }
    spinner.finish_and_clear();

    let mut items: Vec<(&str, String)> = vec![
        ("Input log", log_file.display().to_string()),
        ("Unit", selected.unit_id().to_string()),
    ];
    for row in &rows {
        items.push((
            row.state.label(),
            format!(
                "mob {} hw {} cpu {} = {:.3} A",
                display_opt(row.mobility),
                display_opt(row.hardware),
                display_opt(row.computing),
                row.total()
            ),
        ));
    }
    if let Some(path) = output {
        items.push(("Output CSV", path.display().to_string()));
    }
    items.push(("Duration", format!("{:.2?}", start.elapsed())));

    print_summary("Current Breakdown", &items);
}

fn cmd_summary(log_file: &Path, config: &PipelineConfig) {
    use crate::processors::breakdown;

    let (table, spinner) = load_log(log_file, config);
    let trajectories = table.trajectories();
    spinner.finish_and_clear();

    for trajectory in &trajectories {
        let summary = breakdown::summarize_unit(trajectory);
        let position = |p: Option<[f64; 3]>| {
            p.map_or_else(
                || "n/a".to_string(),
                |[x, y, z]| format!("({:.1}, {:.1}, {:.1})", x, y, z),
            )
        };

        print_summary(
            &format!("Unit {}", summary.unit_id),
            &[
                ("Samples", summary.samples.to_string()),
                ("Time span (s)", format!("{:.3} .. {:.3}", summary.t_start, summary.t_end)),
                ("Takeoff", position(summary.takeoff)),
                ("Landing", position(summary.landing)),
                ("Energy consumed (J)", display_opt(summary.energy_consumed)),
                ("Final percentage", display_opt(summary.final_percentage)),
                ("Peak current (A)", display_opt(summary.peak_current)),
            ],
        );
    }

    if !table.malformed.is_empty() {
        warn!("{} malformed fields in {}", table.malformed.len(), log_file.display());
    }
}
