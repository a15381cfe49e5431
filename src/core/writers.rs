//! CSV writers handing analysis tables to the rendering side.
//!
//! This module writes:
//! - Resampled per-unit trajectories (one row per grid point)
//! - Energy heatmaps in long format, one row per cell with its bin origin
//! - Per-state current breakdowns

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use thiserror::Error;

use crate::processors::breakdown::CurrentBreakdown;
use crate::processors::heatmap::EnergyGrid;
use crate::processors::resampling::ResampledTable;

/// Errors that can occur during write operations.
#[derive(Error, Debug)]
pub enum WriteError {
    /// Failed to create parent directories.
    #[error("failed to create parent directories for '{path}': {source}")]
    CreateDirectory {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to create or open file for writing.
    #[error("failed to create file '{path}': {source}")]
    CreateFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write data to file.
    #[error("failed to write to file '{path}': {source}")]
    WriteFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// CSV writing error.
    #[error("CSV write error for '{path}': {source}")]
    CsvError {
        path: String,
        #[source]
        source: csv::Error,
    },
}

/// Result type for write operations.
pub type Result<T> = std::result::Result<T, WriteError>;

/// Header of the resampled table export.
pub const RESAMPLED_HEADER: [&str; 13] = [
    "unit_id",
    "time",
    "energy_used",
    "x",
    "y",
    "z",
    "current_draw",
    "aoi_start_x",
    "aoi_end_x",
    "aoi_start_y",
    "aoi_end_y",
    "aoi_start_z",
    "aoi_end_z",
];

/// Creates parent directories for a file path if they don't exist.
fn ensure_parent_dirs(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| WriteError::CreateDirectory {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
    }
    Ok(())
}

/// Opens a buffered CSV writer at `path`, creating parent directories.
fn create_csv_writer(path: &Path) -> Result<csv::Writer<BufWriter<File>>> {
    ensure_parent_dirs(path)?;
    let file = File::create(path).map_err(|e| WriteError::CreateFile {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(csv::Writer::from_writer(BufWriter::new(file)))
}

/// Formats an optional value; missing values become empty cells.
fn fmt_opt(value: Option<f64>) -> String {
    value.map(|v| format!("{:.6}", v)).unwrap_or_default()
}

/// Write the resampled table, one row per grid point.
///
/// Columns follow [`RESAMPLED_HEADER`]. Missing values are written as empty
/// cells.
///
/// # Example
///
/// ```no_run
/// use fleet_telemetry::core::writers::write_resampled_csv;
/// use fleet_telemetry::processors::resampling::ResampledTable;
/// use std::path::Path;
///
/// let table = ResampledTable::default();
/// write_resampled_csv(Path::new("resampled.csv"), &table).unwrap();
/// ```
pub fn write_resampled_csv(path: &Path, table: &ResampledTable) -> Result<()> {
    let mut csv_writer = create_csv_writer(path)?;
    let path_str = path.display().to_string();
    let csv_err = |e: csv::Error| WriteError::CsvError {
        path: path_str.clone(),
        source: e,
    };

    csv_writer.write_record(RESAMPLED_HEADER).map_err(csv_err)?;

    for p in &table.points {
        csv_writer
            .write_record(&[
                p.unit_id.to_string(),
                format!("{:.6}", p.time),
                fmt_opt(p.energy_used),
                fmt_opt(p.x),
                fmt_opt(p.y),
                fmt_opt(p.z),
                fmt_opt(p.current_draw),
                fmt_opt(p.aoi.start_x),
                fmt_opt(p.aoi.end_x),
                fmt_opt(p.aoi.start_y),
                fmt_opt(p.aoi.end_y),
                fmt_opt(p.aoi.start_z),
                fmt_opt(p.aoi.end_z),
            ])
            .map_err(csv_err)?;
    }

    csv_writer.flush().map_err(|e| WriteError::WriteFile {
        path: path_str.clone(),
        source: e,
    })?;

    Ok(())
}

/// Write an energy heatmap with headers "col,row,x_start,y_start,energy".
///
/// `x_start`/`y_start` are the lower bin boundaries of the cell, so the
/// grid can be drawn without recomputing bins.
pub fn write_heatmap_csv(path: &Path, grid: &EnergyGrid) -> Result<()> {
    let mut csv_writer = create_csv_writer(path)?;
    let path_str = path.display().to_string();
    let csv_err = |e: csv::Error| WriteError::CsvError {
        path: path_str.clone(),
        source: e,
    };

    csv_writer
        .write_record(["col", "row", "x_start", "y_start", "energy"])
        .map_err(csv_err)?;

    let (x_bins, y_bins) = (grid.x_bins(), grid.y_bins());
    for (col, row, value) in grid.cells() {
        csv_writer
            .write_record(&[
                col.to_string(),
                row.to_string(),
                format!("{:.6}", x_bins[col]),
                format!("{:.6}", y_bins[row]),
                format!("{:.6}", value),
            ])
            .map_err(csv_err)?;
    }

    csv_writer.flush().map_err(|e| WriteError::WriteFile {
        path: path_str.clone(),
        source: e,
    })?;

    Ok(())
}

/// Write per-state current breakdown rows.
pub fn write_breakdown_csv(path: &Path, rows: &[CurrentBreakdown]) -> Result<()> {
    let mut csv_writer = create_csv_writer(path)?;
    let path_str = path.display().to_string();
    let csv_err = |e: csv::Error| WriteError::CsvError {
        path: path_str.clone(),
        source: e,
    };

    csv_writer
        .write_record([
            "unit_id",
            "state",
            "label",
            "line",
            "time",
            "mobility_current",
            "hardware_current",
            "computing_current",
            "total_current",
        ])
        .map_err(csv_err)?;

    for row in rows {
        csv_writer
            .write_record(&[
                row.unit_id.to_string(),
                row.state.code().to_string(),
                row.state.label().to_string(),
                row.line.to_string(),
                format!("{:.6}", row.time),
                fmt_opt(row.mobility),
                fmt_opt(row.hardware),
                fmt_opt(row.computing),
                format!("{:.6}", row.total()),
            ])
            .map_err(csv_err)?;
    }

    csv_writer.flush().map_err(|e| WriteError::WriteFile {
        path: path_str.clone(),
        source: e,
    })?;

    Ok(())
}
