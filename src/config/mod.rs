//! Configuration types for the telemetry pipeline.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Positional layout of a telemetry log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogSchema {
    /// 18 fields, including current breakdown and state columns.
    #[default]
    Full,
    /// 12 fields: identity, position, energy, time and AoI bounds only.
    Legacy,
}

/// Configuration for log parsing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParserConfig {
    /// Expected line layout
    #[serde(default)]
    pub schema: LogSchema,

    /// Unit suffix stripped from the raw time token
    #[serde(default = "default_time_suffix")]
    pub time_suffix: String,

    /// Factor converting the raw time value to seconds
    #[serde(default = "default_time_scale")]
    pub time_scale: f64,
}

fn default_time_suffix() -> String {
    "ns".to_string()
}

fn default_time_scale() -> f64 {
    1e-9
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            schema: LogSchema::Full,
            time_suffix: default_time_suffix(),
            time_scale: default_time_scale(),
        }
    }
}

impl ParserConfig {
    /// Parser configuration for the 12-field legacy layout.
    pub fn legacy() -> Self {
        Self {
            schema: LogSchema::Legacy,
            ..Self::default()
        }
    }
}

/// Configuration for uniform-time resampling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResampleConfig {
    /// Number of grid points generated per unit
    #[serde(default = "default_num_points")]
    pub num_points: usize,
}

fn default_num_points() -> usize {
    500
}

impl Default for ResampleConfig {
    fn default() -> Self {
        Self {
            num_points: default_num_points(),
        }
    }
}

/// Configuration for the spatial energy heatmap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeatmapConfig {
    /// Cell edge length, in position units
    #[serde(default = "default_cell_size")]
    pub cell_size: f64,

    /// Unit to attribute; the lowest unit id when unset
    #[serde(default)]
    pub unit: Option<i64>,
}

fn default_cell_size() -> f64 {
    10.0
}

impl Default for HeatmapConfig {
    fn default() -> Self {
        Self {
            cell_size: default_cell_size(),
            unit: None,
        }
    }
}

/// Configuration for the per-state current breakdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakdownConfig {
    /// Minimum number of distinct state codes a unit needs to be selected
    #[serde(default = "default_min_states")]
    pub min_states: usize,
}

fn default_min_states() -> usize {
    3
}

impl Default for BreakdownConfig {
    fn default() -> Self {
        Self {
            min_states: default_min_states(),
        }
    }
}

/// Main pipeline configuration combining all sub-configs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub parser: ParserConfig,

    #[serde(default)]
    pub resample: ResampleConfig,

    #[serde(default)]
    pub heatmap: HeatmapConfig,

    #[serde(default)]
    pub breakdown: BreakdownConfig,
}

impl PipelineConfig {
    /// Load configuration from a YAML file.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: PipelineConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a YAML file.
    pub fn to_yaml<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
