//! Numeric primitives shared by the resampler and the heatmap.
//!
//! Uniform grids, piecewise-linear interpolation over sorted samples, and
//! axis binning for planar rasterization.

/// `n` evenly spaced values from `start` to `end`, both inclusive.
///
/// The last value is exactly `end`. When `start == end` all values coincide.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            let mut values: Vec<f64> = (0..n).map(|i| start + step * i as f64).collect();
            values[n - 1] = end;
            values
        }
    }
}

/// How to evaluate points outside the observed range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    /// Hold the nearest endpoint value.
    Clamp,
    /// Continue the slope of the nearest segment with distinct timestamps.
    Extrapolate,
}

/// Piecewise-linear interpolation of `(xs, ys)` at `x`.
///
/// `xs` must be sorted ascending and have the same length as `ys`; duplicate
/// abscissae are allowed. Returns `None` for an empty series and the single
/// value for a one-point series.
///
/// # Example
///
/// ```ignore
/// let y = interpolate(&[0.0, 2.0], &[0.0, 10.0], 0.5, Boundary::Clamp);
/// assert_eq!(y, Some(2.5));
/// ```
pub fn interpolate(xs: &[f64], ys: &[f64], x: f64, boundary: Boundary) -> Option<f64> {
    debug_assert_eq!(xs.len(), ys.len(), "xs and ys must have same length");

    let n = xs.len();
    match n {
        0 => return None,
        1 => return Some(ys[0]),
        _ => {}
    }

    if x <= xs[0] {
        if x == xs[0] || boundary == Boundary::Clamp {
            return Some(ys[0]);
        }
        return Some(match (1..n).find(|&k| xs[k] > xs[0]) {
            Some(k) => lerp(xs[0], ys[0], xs[k], ys[k], x),
            None => ys[0],
        });
    }

    if x >= xs[n - 1] {
        if x == xs[n - 1] || boundary == Boundary::Clamp {
            return Some(ys[n - 1]);
        }
        return Some(match (0..n - 1).rev().find(|&k| xs[k] < xs[n - 1]) {
            Some(k) => lerp(xs[k], ys[k], xs[n - 1], ys[n - 1], x),
            None => ys[n - 1],
        });
    }

    // xs[i] <= x < xs[j], with xs[j] strictly greater
    let j = xs.partition_point(|&v| v <= x);
    let i = j - 1;
    if xs[i] == x {
        return Some(ys[i]);
    }
    Some(lerp(xs[i], ys[i], xs[j], ys[j], x))
}

#[inline]
fn lerp(x0: f64, y0: f64, x1: f64, y1: f64, x: f64) -> f64 {
    y0 + (y1 - y0) * (x - x0) / (x1 - x0)
}

/// Interpolate a whole grid at once.
pub fn interpolate_grid(xs: &[f64], ys: &[f64], grid: &[f64], boundary: Boundary) -> Vec<Option<f64>> {
    grid.iter().map(|&x| interpolate(xs, ys, x, boundary)).collect()
}

/// Largest number of bins [`AxisBins::new`] will allocate for one axis.
pub const MAX_AXIS_BINS: usize = 100_000;

/// Relative slack absorbing rounding when a value sits on a bin edge.
const EDGE_TOLERANCE: f64 = 1e-9;

/// Whole cell steps from `origin` to `value`, tolerant of rounding just
/// below an edge.
fn cell_steps(origin: f64, value: f64, cell_size: f64) -> f64 {
    let steps = (value - origin) / cell_size;
    (steps + steps.abs() * EDGE_TOLERANCE).floor()
}

/// Uniform bins along one axis, anchored at the axis minimum.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisBins {
    edges: Vec<f64>,
    origin: f64,
    cell_size: f64,
}

impl AxisBins {
    /// Bins stepping from `min` towards `max` in increments of `cell_size`.
    ///
    /// The bin count is `floor((max - min) / cell_size) + 1`, so the bin
    /// holding `max` always exists. A degenerate axis yields one bin.
    /// Returns `None` for a non-finite extent or when more than
    /// [`MAX_AXIS_BINS`] bins would be needed.
    pub fn new(min: f64, max: f64, cell_size: f64) -> Option<Self> {
        if !(min.is_finite() && max.is_finite() && cell_size.is_finite() && cell_size > 0.0) {
            return None;
        }
        let steps = cell_steps(min, max.max(min), cell_size);
        if !steps.is_finite() || steps >= MAX_AXIS_BINS as f64 {
            return None;
        }
        let count = steps as usize + 1;
        let edges = (0..count).map(|k| min + k as f64 * cell_size).collect();
        Some(Self {
            edges,
            origin: min,
            cell_size,
        })
    }

    /// Lower bin boundaries.
    #[inline]
    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Index of the bin containing `value`, clamped to the valid range.
    pub fn index_of(&self, value: f64) -> usize {
        let offset = cell_steps(self.origin, value, self.cell_size);
        if offset.is_nan() || offset <= 0.0 {
            0
        } else {
            (offset as usize).min(self.edges.len() - 1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linspace_endpoints() {
        let grid = linspace(1.0, 2.0, 5);
        assert_eq!(grid, vec![1.0, 1.25, 1.5, 1.75, 2.0]);

        let grid = linspace(0.1, 0.7, 7);
        assert_eq!(grid[0], 0.1);
        assert_eq!(grid[6], 0.7);
    }

    #[test]
    fn test_linspace_degenerate() {
        assert_eq!(linspace(3.0, 3.0, 4), vec![3.0; 4]);
        assert_eq!(linspace(3.0, 9.0, 1), vec![3.0]);
        assert!(linspace(0.0, 1.0, 0).is_empty());
    }

    #[test]
    fn test_interpolate_inside_range() {
        let xs = [0.0, 1.0, 3.0];
        let ys = [0.0, 10.0, 30.0];

        assert_eq!(interpolate(&xs, &ys, 0.5, Boundary::Clamp), Some(5.0));
        assert_eq!(interpolate(&xs, &ys, 2.0, Boundary::Clamp), Some(20.0));
        assert_eq!(interpolate(&xs, &ys, 1.0, Boundary::Clamp), Some(10.0));
        assert_eq!(interpolate(&xs, &ys, 3.0, Boundary::Extrapolate), Some(30.0));
    }

    #[test]
    fn test_interpolate_outside_range() {
        let xs = [1.0, 2.0];
        let ys = [10.0, 20.0];

        assert_eq!(interpolate(&xs, &ys, 0.0, Boundary::Clamp), Some(10.0));
        assert_eq!(interpolate(&xs, &ys, 3.0, Boundary::Clamp), Some(20.0));
        assert_eq!(interpolate(&xs, &ys, 0.0, Boundary::Extrapolate), Some(0.0));
        assert_eq!(interpolate(&xs, &ys, 3.0, Boundary::Extrapolate), Some(30.0));
    }

    #[test]
    fn test_interpolate_duplicate_times() {
        let xs = [0.0, 1.0, 1.0, 2.0];
        let ys = [0.0, 5.0, 7.0, 9.0];

        assert_eq!(interpolate(&xs, &ys, 1.0, Boundary::Clamp), Some(7.0));
        assert_eq!(interpolate(&xs, &ys, 1.5, Boundary::Clamp), Some(8.0));
        // Extrapolation skips the zero-width segment at the end
        let xs = [0.0, 2.0, 2.0];
        let ys = [0.0, 4.0, 6.0];
        assert_eq!(interpolate(&xs, &ys, 3.0, Boundary::Extrapolate), Some(9.0));
    }

    #[test]
    fn test_interpolate_short_series() {
        assert_eq!(interpolate(&[], &[], 1.0, Boundary::Clamp), None);
        assert_eq!(interpolate(&[2.0], &[4.0], 9.0, Boundary::Extrapolate), Some(4.0));
        assert_eq!(interpolate(&[2.0, 2.0], &[4.0, 6.0], 3.0, Boundary::Extrapolate), Some(6.0));
    }

    #[test]
    fn test_axis_bins() {
        let bins = AxisBins::new(0.0, 5.0, 5.0).unwrap();
        assert_eq!(bins.edges(), &[0.0, 5.0]);
        assert_eq!(bins.index_of(0.0), 0);
        assert_eq!(bins.index_of(4.999), 0);
        assert_eq!(bins.index_of(5.0), 1);

        let bins = AxisBins::new(-3.0, 14.0, 10.0).unwrap();
        assert_eq!(bins.edges(), &[-3.0, 7.0]);
        assert_eq!(bins.index_of(14.0), 1);
    }

    #[test]
    fn test_axis_bins_degenerate() {
        let bins = AxisBins::new(2.0, 2.0, 10.0).unwrap();
        assert_eq!(bins.len(), 1);
        assert_eq!(bins.index_of(2.0), 0);
    }

    #[test]
    fn test_axis_bins_max_on_rounded_edge() {
        // 0.3 - 0.1 divides to just under 2 cells
        let bins = AxisBins::new(0.1, 0.3, 0.1).unwrap();
        assert_eq!(bins.len(), 3);
        assert_eq!(bins.index_of(0.3), 2);
        assert_eq!(bins.index_of(0.1), 0);
        assert_eq!(bins.index_of(0.25), 1);
    }

    #[test]
    fn test_axis_bins_rejects_unbounded_extent() {
        assert!(AxisBins::new(0.0, f64::INFINITY, 10.0).is_none());
        assert!(AxisBins::new(f64::NEG_INFINITY, 0.0, 10.0).is_none());
        assert!(AxisBins::new(0.0, f64::NAN, 10.0).is_none());
        assert!(AxisBins::new(0.0, 1e12, 10.0).is_none());
        assert!(AxisBins::new(-f64::MAX, f64::MAX, 1.0).is_none());
        assert!(AxisBins::new(0.0, (MAX_AXIS_BINS - 1) as f64, 1.0).is_some());
    }
}
