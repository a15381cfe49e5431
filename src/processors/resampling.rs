//! Uniform-time resampling of per-unit trajectories.
//!
//! Each unit's irregular samples are mapped onto `num_points` evenly spaced
//! timestamps between its first and last observation. Cumulative energy is
//! interpolated with linear extrapolation at the edges; every other carried
//! field is interpolated with endpoint clamping.

use log::debug;
use rayon::prelude::*;
use thiserror::Error;

use crate::config::ResampleConfig;
use crate::core::loaders::{AreaOfInterest, Field};
use crate::core::trajectory::Trajectory;
use crate::core::transforms::{interpolate_grid, linspace, Boundary};

/// Errors that can occur during resampling.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ResampleError {
    #[error("number of grid points must be positive")]
    InvalidPointCount,

    #[error("no samples for unit {unit_id}")]
    EmptyTrajectory { unit_id: i64 },
}

/// Fields interpolated without extrapolation.
const CLAMPED_FIELDS: [Field; 10] = [
    Field::X,
    Field::Y,
    Field::Z,
    Field::CurrentDraw,
    Field::AoiStartX,
    Field::AoiEndX,
    Field::AoiStartY,
    Field::AoiEndY,
    Field::AoiStartZ,
    Field::AoiEndZ,
];

/// A synthetic sample on a unit's uniform time grid.
#[derive(Debug, Clone, PartialEq)]
pub struct ResampledPoint {
    pub unit_id: i64,
    pub time: f64,
    pub energy_used: Option<f64>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
    pub current_draw: Option<f64>,
    pub aoi: AreaOfInterest,
}

/// Resampled rows of all units, unit-major.
#[derive(Debug, Clone, Default)]
pub struct ResampledTable {
    pub points: Vec<ResampledPoint>,
    /// Units in output order.
    pub unit_ids: Vec<i64>,
    pub num_points: usize,
}

impl ResampledTable {
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Rows belonging to one unit.
    pub fn unit_points(&self, unit_id: i64) -> &[ResampledPoint] {
        match self.unit_ids.iter().position(|&id| id == unit_id) {
            Some(slot) => {
                let start = slot * self.num_points;
                &self.points[start..start + self.num_points]
            }
            None => &[],
        }
    }
}

/// Resample one trajectory onto `num_points` uniform timestamps.
///
/// A trajectory with a single timestamp yields `num_points` identical rows
/// carrying that sample's values.
pub fn resample_trajectory(
    trajectory: &Trajectory,
    num_points: usize,
) -> Result<Vec<ResampledPoint>, ResampleError> {
    if num_points == 0 {
        return Err(ResampleError::InvalidPointCount);
    }

    let unit_id = trajectory.unit_id();
    let (t_min, t_max) = match (trajectory.t_min(), trajectory.t_max()) {
        (Some(a), Some(b)) => (a, b),
        _ => return Err(ResampleError::EmptyTrajectory { unit_id }),
    };

    if t_min == t_max {
        debug!("unit {}: single timestamp {}, flat resampling", unit_id, t_min);
    }

    let grid = linspace(t_min, t_max, num_points);

    let (t_energy, energy) = trajectory.series(Field::EnergyUsed);
    let energy = interpolate_grid(&t_energy, &energy, &grid, Boundary::Extrapolate);

    let clamped: Vec<Vec<Option<f64>>> = CLAMPED_FIELDS
        .iter()
        .map(|&field| {
            let (t, values) = trajectory.series(field);
            interpolate_grid(&t, &values, &grid, Boundary::Clamp)
        })
        .collect();

    // Column order follows CLAMPED_FIELDS
    let value_at = |column: usize, i: usize| clamped[column][i];

    let points = grid
        .iter()
        .enumerate()
        .map(|(i, &time)| ResampledPoint {
            unit_id,
            time,
            energy_used: energy[i],
            x: value_at(0, i),
            y: value_at(1, i),
            z: value_at(2, i),
            current_draw: value_at(3, i),
            aoi: AreaOfInterest {
                start_x: value_at(4, i),
                end_x: value_at(5, i),
                start_y: value_at(6, i),
                end_y: value_at(7, i),
                start_z: value_at(8, i),
                end_z: value_at(9, i),
            },
        })
        .collect();

    Ok(points)
}

/// Resample every unit and concatenate the results unit-major.
///
/// Units are processed in parallel; the output keeps the order of
/// `trajectories`.
pub fn resample_units(
    trajectories: &[Trajectory],
    config: &ResampleConfig,
) -> Result<ResampledTable, ResampleError> {
    let num_points = config.num_points;
    if num_points == 0 {
        return Err(ResampleError::InvalidPointCount);
    }

    let per_unit: Vec<Vec<ResampledPoint>> = trajectories
        .par_iter()
        .filter(|t| !t.is_empty())
        .map(|t| resample_trajectory(t, num_points))
        .collect::<Result<_, _>>()?;

    let unit_ids: Vec<i64> = trajectories
        .iter()
        .filter(|t| !t.is_empty())
        .map(Trajectory::unit_id)
        .collect();

    let mut points = Vec::with_capacity(num_points * per_unit.len());
    for unit_points in per_unit {
        points.extend(unit_points);
    }

    Ok(ResampledTable {
        points,
        unit_ids,
        num_points,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::loaders::Sample;
    use crate::core::trajectory::group_by_unit;

    fn sample(unit_id: i64, time: f64, x: f64, energy: f64) -> Sample {
        Sample {
            unit_id: Some(unit_id),
            time: Some(time),
            x: Some(x),
            y: Some(2.0 * x),
            z: Some(50.0),
            energy_used: Some(energy),
            current_draw: Some(x + 1.0),
            aoi: AreaOfInterest {
                start_x: Some(0.0),
                end_x: Some(100.0),
                ..AreaOfInterest::default()
            },
            ..Sample::default()
        }
    }

    fn fleet() -> Vec<Trajectory> {
        group_by_unit(&[
            sample(2, 1.3, 4.0, 12.0),
            sample(1, 0.0, 0.0, 0.0),
            sample(2, 0.2, 1.0, 3.0),
            sample(1, 2.0, 10.0, 40.0),
            sample(2, 0.7, 2.0, 5.0),
            sample(1, 1.0, 5.0, 10.0),
        ])
    }

    #[test]
    fn test_row_count_per_unit() {
        let table = resample_units(&fleet(), &ResampleConfig { num_points: 7 }).unwrap();

        assert_eq!(table.len(), 14);
        assert_eq!(table.unit_ids, vec![2, 1]);
        assert_eq!(table.unit_points(2).len(), 7);
        assert_eq!(table.unit_points(1).len(), 7);
        assert!(table.unit_points(99).is_empty());
        assert!(table.points[..7].iter().all(|p| p.unit_id == 2));
    }

    #[test]
    fn test_time_grid_spans_observed_range() {
        let trajectories = fleet();
        let table = resample_units(&trajectories, &ResampleConfig { num_points: 11 }).unwrap();

        for trajectory in &trajectories {
            let points = table.unit_points(trajectory.unit_id());
            assert_eq!(points.first().unwrap().time, trajectory.t_min().unwrap());
            assert_eq!(points.last().unwrap().time, trajectory.t_max().unwrap());
            assert!(points.windows(2).all(|w| w[0].time <= w[1].time));
        }
    }

    #[test]
    fn test_endpoints_match_raw_samples() {
        let trajectories = fleet();
        let unit = &trajectories[0];
        let points = resample_trajectory(unit, 9).unwrap();

        let first = &unit.samples()[0];
        let last = &unit.samples()[unit.len() - 1];
        assert_eq!(points[0].x, first.x);
        assert_eq!(points[0].current_draw, first.current_draw);
        assert_eq!(points[8].x, last.x);
        assert_eq!(points[8].y, last.y);
        assert_eq!(points[8].energy_used, last.energy_used);
        assert_eq!(points[8].aoi.end_x, Some(100.0));
    }

    #[test]
    fn test_linear_interpolation_between_samples() {
        let trajectories = fleet();
        let unit = trajectories.iter().find(|t| t.unit_id() == 1).unwrap();
        let points = resample_trajectory(unit, 5).unwrap();

        let times: Vec<f64> = points.iter().map(|p| p.time).collect();
        assert_eq!(times, vec![0.0, 0.5, 1.0, 1.5, 2.0]);
        assert_eq!(points[1].energy_used, Some(5.0));
        assert_eq!(points[3].energy_used, Some(25.0));
        assert_eq!(points[3].x, Some(7.5));
    }

    #[test]
    fn test_single_sample_unit_is_flat() {
        let trajectories = group_by_unit(&[sample(4, 3.0, 6.0, 9.0)]);
        let points = resample_trajectory(&trajectories[0], 5).unwrap();

        assert_eq!(points.len(), 5);
        for point in &points {
            assert_eq!(point.time, 3.0);
            assert_eq!(point.energy_used, Some(9.0));
            assert_eq!(point.x, Some(6.0));
            assert_eq!(point.y, Some(12.0));
            assert_eq!(point.z, Some(50.0));
            assert_eq!(point.current_draw, Some(7.0));
        }
    }

    #[test]
    fn test_fully_missing_field_stays_missing() {
        let mut a = sample(1, 0.0, 0.0, 0.0);
        let mut b = sample(1, 1.0, 1.0, 1.0);
        a.current_draw = None;
        b.current_draw = None;

        let trajectories = group_by_unit(&[a, b]);
        let points = resample_trajectory(&trajectories[0], 3).unwrap();

        assert!(points.iter().all(|p| p.current_draw.is_none()));
        assert!(points.iter().all(|p| p.energy_used.is_some()));
        assert!(points.iter().all(|p| p.aoi.start_y.is_none()));
    }

    #[test]
    fn test_energy_extrapolates_past_missing_endpoint() {
        let mut last = sample(1, 2.0, 2.0, 0.0);
        last.energy_used = None;

        let trajectories = group_by_unit(&[
            sample(1, 0.0, 0.0, 0.0),
            sample(1, 1.0, 1.0, 10.0),
            last,
        ]);
        let points = resample_trajectory(&trajectories[0], 3).unwrap();

        assert_eq!(points[2].time, 2.0);
        assert_eq!(points[2].energy_used, Some(20.0));
        assert_eq!(points[2].x, Some(2.0));
    }

    #[test]
    fn test_zero_points_rejected() {
        let result = resample_units(&fleet(), &ResampleConfig { num_points: 0 });
        assert_eq!(result.unwrap_err(), ResampleError::InvalidPointCount);
    }
}
