//! Per-unit trajectories built from a parsed telemetry table.

use std::collections::HashMap;

use log::warn;
use thiserror::Error;

use super::loaders::{Field, Sample};

/// Errors raised when selecting a trajectory.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrajectoryError {
    #[error("no samples for unit {unit_id}")]
    EmptyTrajectory { unit_id: i64 },

    #[error("no trajectories to select from")]
    NoUnits,
}

/// Time-ordered samples of one unit.
///
/// Owns its samples; transformations produce new sequences rather than
/// mutating this one.
#[derive(Debug, Clone)]
pub struct Trajectory {
    unit_id: i64,
    samples: Vec<Sample>,
}

impl Trajectory {
    /// Builds a trajectory, ordering the samples by time.
    ///
    /// Samples without a timestamp cannot be placed and are dropped. The
    /// sort is stable, so equal timestamps keep their input order.
    pub fn new(unit_id: i64, samples: Vec<Sample>) -> Self {
        let mut samples: Vec<Sample> = samples.into_iter().filter(|s| s.time.is_some()).collect();
        samples.sort_by(|a, b| a.time.unwrap_or(0.0).total_cmp(&b.time.unwrap_or(0.0)));
        Self { unit_id, samples }
    }

    #[inline]
    pub fn unit_id(&self) -> i64 {
        self.unit_id
    }

    #[inline]
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Timestamps in ascending order.
    pub fn times(&self) -> Vec<f64> {
        self.samples.iter().filter_map(|s| s.time).collect()
    }

    /// Earliest timestamp.
    pub fn t_min(&self) -> Option<f64> {
        self.samples.first().and_then(|s| s.time)
    }

    /// Latest timestamp.
    pub fn t_max(&self) -> Option<f64> {
        self.samples.last().and_then(|s| s.time)
    }

    /// Duration between the first and last sample, in seconds.
    pub fn time_span(&self) -> f64 {
        match (self.t_min(), self.t_max()) {
            (Some(a), Some(b)) => b - a,
            _ => 0.0,
        }
    }

    /// `(time, value)` pairs for the samples where `field` is present.
    pub fn series(&self, field: Field) -> (Vec<f64>, Vec<f64>) {
        self.samples
            .iter()
            .filter_map(|s| Some((s.time?, s.value(field)?)))
            .unzip()
    }

    /// Planar bounding box `(x_min, x_max, y_min, y_max)` over samples with
    /// both coordinates present.
    pub fn planar_bounds(&self) -> Option<(f64, f64, f64, f64)> {
        let mut points = self.samples.iter().filter_map(Sample::planar);
        let (x0, y0) = points.next()?;

        let bounds = points.fold((x0, x0, y0, y0), |(x_min, x_max, y_min, y_max), (x, y)| {
            (x_min.min(x), x_max.max(x), y_min.min(y), y_max.max(y))
        });
        Some(bounds)
    }
}

/// Partition samples by unit id into time-ordered trajectories.
///
/// Units are returned in order of first appearance. Rows without a unit id
/// or timestamp cannot be grouped and are skipped with a warning.
pub fn group_by_unit(samples: &[Sample]) -> Vec<Trajectory> {
    let mut index: HashMap<i64, usize> = HashMap::new();
    let mut groups: Vec<(i64, Vec<Sample>)> = Vec::new();
    let mut skipped = 0usize;

    for sample in samples {
        let unit_id = match (sample.unit_id, sample.time) {
            (Some(id), Some(_)) => id,
            _ => {
                skipped += 1;
                continue;
            }
        };

        let slot = *index.entry(unit_id).or_insert_with(|| {
            groups.push((unit_id, Vec::new()));
            groups.len() - 1
        });
        groups[slot].1.push(sample.clone());
    }

    if skipped > 0 {
        warn!("{} rows without unit id or timestamp left out of trajectories", skipped);
    }

    groups
        .into_iter()
        .map(|(unit_id, samples)| Trajectory::new(unit_id, samples))
        .collect()
}

/// Select one trajectory by unit id, or the lowest unit id when `unit` is
/// `None`.
pub fn find_trajectory(
    trajectories: &[Trajectory],
    unit: Option<i64>,
) -> Result<&Trajectory, TrajectoryError> {
    let selected = match unit {
        Some(unit_id) => trajectories
            .iter()
            .find(|t| t.unit_id() == unit_id)
            .ok_or(TrajectoryError::EmptyTrajectory { unit_id })?,
        None => trajectories
            .iter()
            .min_by_key(|t| t.unit_id())
            .ok_or(TrajectoryError::NoUnits)?,
    };

    if selected.is_empty() {
        return Err(TrajectoryError::EmptyTrajectory {
            unit_id: selected.unit_id(),
        });
    }
    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(line: usize, unit_id: i64, time: f64, x: f64) -> Sample {
        Sample {
            line,
            unit_id: Some(unit_id),
            time: Some(time),
            x: Some(x),
            y: Some(-x),
            ..Sample::default()
        }
    }

    #[test]
    fn test_group_by_unit_first_appearance_and_sorted() {
        let samples = vec![
            sample(1, 7, 2.0, 20.0),
            sample(2, 3, 1.0, 1.0),
            sample(3, 7, 0.5, 5.0),
            sample(4, 3, 0.0, 0.0),
            sample(5, 7, 1.0, 10.0),
        ];

        let trajectories = group_by_unit(&samples);

        assert_eq!(trajectories.len(), 2);
        assert_eq!(trajectories[0].unit_id(), 7);
        assert_eq!(trajectories[1].unit_id(), 3);
        assert_eq!(trajectories[0].times(), vec![0.5, 1.0, 2.0]);
        assert_eq!(trajectories[0].samples()[0].line, 3);
        assert_eq!(trajectories[1].t_min(), Some(0.0));
        assert_eq!(trajectories[1].t_max(), Some(1.0));
    }

    #[test]
    fn test_group_by_unit_skips_unplaceable_rows() {
        let mut no_time = sample(2, 1, 0.0, 0.0);
        no_time.time = None;
        let mut no_unit = sample(3, 1, 0.0, 0.0);
        no_unit.unit_id = None;

        let trajectories = group_by_unit(&[sample(1, 1, 0.0, 0.0), no_time, no_unit]);

        assert_eq!(trajectories.len(), 1);
        assert_eq!(trajectories[0].len(), 1);
    }

    #[test]
    fn test_stable_order_for_equal_timestamps() {
        let trajectory = Trajectory::new(1, vec![sample(1, 1, 1.0, 1.0), sample(2, 1, 1.0, 2.0)]);
        let lines: Vec<usize> = trajectory.samples().iter().map(|s| s.line).collect();
        assert_eq!(lines, vec![1, 2]);
    }

    #[test]
    fn test_series_skips_missing_values() {
        let mut gap = sample(2, 1, 1.0, 0.0);
        gap.x = None;
        let trajectory = Trajectory::new(1, vec![sample(1, 1, 0.0, 3.0), gap, sample(3, 1, 2.0, 4.0)]);

        let (t, x) = trajectory.series(Field::X);
        assert_eq!(t, vec![0.0, 2.0]);
        assert_eq!(x, vec![3.0, 4.0]);
    }

    #[test]
    fn test_planar_bounds() {
        let trajectory = Trajectory::new(1, vec![sample(1, 1, 0.0, 3.0), sample(2, 1, 1.0, -2.0)]);
        assert_eq!(trajectory.planar_bounds(), Some((-2.0, 3.0, -3.0, 2.0)));
    }

    #[test]
    fn test_find_trajectory_defaults_to_lowest_id() {
        let trajectories = group_by_unit(&[sample(1, 9, 0.0, 0.0), sample(2, 4, 0.0, 0.0)]);

        assert_eq!(find_trajectory(&trajectories, None).unwrap().unit_id(), 4);
        assert_eq!(find_trajectory(&trajectories, Some(9)).unwrap().unit_id(), 9);
        assert_eq!(
            find_trajectory(&trajectories, Some(5)).unwrap_err(),
            TrajectoryError::EmptyTrajectory { unit_id: 5 }
        );
        assert_eq!(find_trajectory(&[], None).unwrap_err(), TrajectoryError::NoUnits);
    }
}
