//! Energy analysis for fleet simulation telemetry.
//!
//! This crate provides tools for:
//! - Parsing whitespace-delimited per-unit telemetry logs
//! - Resampling each unit's trajectory onto a uniform time grid
//! - Attributing energy consumption to the planar cells a unit traversed
//! - Breaking down sub-component current draw by mission state
//!
//! # Example
//!
//! ```no_run
//! use fleet_telemetry::config::ParserConfig;
//! use fleet_telemetry::core::loaders::load_telemetry_log;
//! use fleet_telemetry::processors::heatmap::build_energy_heatmap;
//!
//! let table = load_telemetry_log("results.csv", &ParserConfig::default()).unwrap();
//! let trajectories = table.trajectories();
//! let grid = build_energy_heatmap(&trajectories[0], 10.0).unwrap();
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod processors;

pub use config::{BreakdownConfig, HeatmapConfig, LogSchema, ParserConfig, PipelineConfig, ResampleConfig};
pub use crate::core::loaders::{Sample, TelemetryTable};
pub use crate::core::trajectory::Trajectory;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
