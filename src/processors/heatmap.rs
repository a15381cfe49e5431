//! Spatial attribution of energy consumption onto a planar grid.
//!
//! A unit's raw trajectory is cut into consecutive movement segments. Each
//! segment's energy delta is divided by its Manhattan length and that share
//! is added to every cell of the rectangular bin span between the segment's
//! endpoints. The span is a coarse over-approximation of the cells the
//! segment actually crosses and is kept that way so totals stay comparable
//! with earlier analyses.

use log::debug;
use thiserror::Error;

use crate::config::HeatmapConfig;
use crate::core::trajectory::{find_trajectory, Trajectory, TrajectoryError};
use crate::core::transforms::AxisBins;

/// Errors that can occur while building a heatmap.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum HeatmapError {
    #[error("cell size must be a positive finite number, got {0}")]
    InvalidCellSize(f64),

    #[error("unit {unit_id} has no samples with position and energy")]
    EmptyTrajectory { unit_id: i64 },

    #[error(
        "unit {unit_id}: extent {x_span} x {y_span} at cell size {cell_size} exceeds the grid limit"
    )]
    GridTooLarge {
        unit_id: i64,
        x_span: f64,
        y_span: f64,
        cell_size: f64,
    },

    #[error(transparent)]
    Selection(#[from] TrajectoryError),
}

/// Result type for heatmap operations.
pub type Result<T> = std::result::Result<T, HeatmapError>;

/// Largest number of cells a single grid may hold.
pub const MAX_GRID_CELLS: usize = 16_000_000;

/// Accumulated energy per planar cell of one unit's bounding box.
///
/// Cells are addressed by `(col, row)`: `col` indexes the X bins, `row` the
/// Y bins. Values are in energy units per unit of traversal length, summed
/// over every segment touching the cell.
#[derive(Debug, Clone, PartialEq)]
pub struct EnergyGrid {
    unit_id: i64,
    cell_size: f64,
    x_bins: AxisBins,
    y_bins: AxisBins,
    /// Dense storage, index `col * rows + row`.
    values: Vec<f64>,
    /// Number of movement segments processed.
    pub segments: usize,
    /// Segments with zero Manhattan length.
    pub stationary_segments: usize,
}

impl EnergyGrid {
    fn new(unit_id: i64, cell_size: f64, x_bins: AxisBins, y_bins: AxisBins) -> Self {
        let values = vec![0.0; x_bins.len() * y_bins.len()];
        Self {
            unit_id,
            cell_size,
            x_bins,
            y_bins,
            values,
            segments: 0,
            stationary_segments: 0,
        }
    }

    #[inline]
    pub fn unit_id(&self) -> i64 {
        self.unit_id
    }

    #[inline]
    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Lower boundaries of the X bins.
    #[inline]
    pub fn x_bins(&self) -> &[f64] {
        self.x_bins.edges()
    }

    /// Lower boundaries of the Y bins.
    #[inline]
    pub fn y_bins(&self) -> &[f64] {
        self.y_bins.edges()
    }

    /// Number of X bins.
    #[inline]
    pub fn cols(&self) -> usize {
        self.x_bins.len()
    }

    /// Number of Y bins.
    #[inline]
    pub fn rows(&self) -> usize {
        self.y_bins.len()
    }

    /// Accumulated value of one cell.
    pub fn get(&self, col: usize, row: usize) -> Option<f64> {
        if col < self.cols() && row < self.rows() {
            Some(self.values[col * self.rows() + row])
        } else {
            None
        }
    }

    /// Dense values, column-major by X bin.
    #[inline]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Iterate `(col, row, value)` over every cell.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        let rows = self.rows();
        self.values
            .iter()
            .enumerate()
            .map(move |(i, &v)| (i / rows, i % rows, v))
    }

    /// Sum over all cells, counting replicated contributions once per cell.
    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Largest cell value.
    pub fn max_cell(&self) -> f64 {
        self.values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    fn add(&mut self, col: usize, row: usize, amount: f64) {
        let rows = self.rows();
        self.values[col * rows + row] += amount;
    }
}

/// Build the energy heatmap of one trajectory.
///
/// Samples lacking a planar position or energy reading are skipped. A
/// segment with zero Manhattan length credits its whole energy delta to the
/// cell containing it.
///
/// # Errors
///
/// Returns an error if `cell_size` is not positive and finite, if no
/// sample of the trajectory has both position and energy, or if the
/// trajectory's extent needs more than [`MAX_GRID_CELLS`] cells.
pub fn build_energy_heatmap(trajectory: &Trajectory, cell_size: f64) -> Result<EnergyGrid> {
    if !(cell_size.is_finite() && cell_size > 0.0) {
        return Err(HeatmapError::InvalidCellSize(cell_size));
    }

    let unit_id = trajectory.unit_id();
    let points: Vec<(f64, f64, f64)> = trajectory
        .samples()
        .iter()
        .filter_map(|s| Some((s.x?, s.y?, s.energy_used?)))
        .collect();

    let skipped = trajectory.len() - points.len();
    if skipped > 0 {
        debug!("unit {}: {} samples without position or energy skipped", unit_id, skipped);
    }

    let (x0, y0, _) = *points
        .first()
        .ok_or(HeatmapError::EmptyTrajectory { unit_id })?;
    let (x_min, x_max, y_min, y_max) = points.iter().fold(
        (x0, x0, y0, y0),
        |(x_min, x_max, y_min, y_max), &(x, y, _)| {
            (x_min.min(x), x_max.max(x), y_min.min(y), y_max.max(y))
        },
    );

    let too_large = || HeatmapError::GridTooLarge {
        unit_id,
        x_span: x_max - x_min,
        y_span: y_max - y_min,
        cell_size,
    };
    let x_bins = AxisBins::new(x_min, x_max, cell_size).ok_or_else(too_large)?;
    let y_bins = AxisBins::new(y_min, y_max, cell_size).ok_or_else(too_large)?;
    if x_bins.len().saturating_mul(y_bins.len()) > MAX_GRID_CELLS {
        return Err(too_large());
    }
    let mut grid = EnergyGrid::new(unit_id, cell_size, x_bins, y_bins);

    for pair in points.windows(2) {
        let (x1, y1, e1) = pair[0];
        let (x2, y2, e2) = pair[1];
        let delta = e2 - e1;

        let (c1, c2) = (grid.x_bins.index_of(x1), grid.x_bins.index_of(x2));
        let (r1, r2) = (grid.y_bins.index_of(y1), grid.y_bins.index_of(y2));

        grid.segments += 1;
        let length = (x2 - x1).abs() + (y2 - y1).abs();
        if length == 0.0 {
            grid.stationary_segments += 1;
            grid.add(c1, r1, delta);
            continue;
        }

        let share = delta / length;
        for col in c1.min(c2)..=c1.max(c2) {
            for row in r1.min(r2)..=r1.max(r2) {
                grid.add(col, row, share);
            }
        }
    }

    debug!(
        "unit {}: {}x{} grid, {} segments ({} stationary)",
        unit_id,
        grid.cols(),
        grid.rows(),
        grid.segments,
        grid.stationary_segments
    );

    Ok(grid)
}

/// Select the configured unit (lowest id by default) and build its heatmap.
pub fn attribute_unit_energy(trajectories: &[Trajectory], config: &HeatmapConfig) -> Result<EnergyGrid> {
    let trajectory = find_trajectory(trajectories, config.unit)?;
    build_energy_heatmap(trajectory, config.cell_size)
}
