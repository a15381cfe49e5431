//! Mission-state current breakdown and per-unit summaries.

use std::collections::HashSet;
use std::fmt;

use crate::core::loaders::Sample;
use crate::core::trajectory::Trajectory;

/// Mission phase encoded by a sample's `state` code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MissionState {
    /// Flying towards the area of interest.
    Transit,
    /// Outside the area of interest after having worked it.
    OutsideAoi,
    /// Working inside the area of interest.
    InsideAoi,
    /// Vertical take-off or landing.
    Vertical,
}

impl MissionState {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(MissionState::Transit),
            1 => Some(MissionState::OutsideAoi),
            2 => Some(MissionState::InsideAoi),
            3 => Some(MissionState::Vertical),
            _ => None,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            MissionState::Transit => 0,
            MissionState::OutsideAoi => 1,
            MissionState::InsideAoi => 2,
            MissionState::Vertical => 3,
        }
    }

    /// Label used in breakdown exports.
    pub fn label(self) -> &'static str {
        match self {
            MissionState::Transit => "Phase 1",
            MissionState::OutsideAoi => "OUT AoI",
            MissionState::InsideAoi => "IN AoI",
            MissionState::Vertical => "Vertical",
        }
    }
}

impl fmt::Display for MissionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Current drawn by each sub-component at one representative sample.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentBreakdown {
    pub unit_id: i64,
    pub state: MissionState,
    /// Source line of the representative sample.
    pub line: usize,
    pub time: f64,
    pub mobility: Option<f64>,
    pub hardware: Option<f64>,
    pub computing: Option<f64>,
}

impl CurrentBreakdown {
    /// Sum of the component currents; missing components count as zero.
    pub fn total(&self) -> f64 {
        [self.mobility, self.hardware, self.computing]
            .iter()
            .map(|c| c.unwrap_or(0.0))
            .sum()
    }
}

/// Lowest unit id whose trajectory visits at least `min_states` distinct
/// state codes.
pub fn select_breakdown_unit(trajectories: &[Trajectory], min_states: usize) -> Option<&Trajectory> {
    trajectories
        .iter()
        .filter(|t| distinct_states(t) >= min_states)
        .min_by_key(|t| t.unit_id())
}

fn distinct_states(trajectory: &Trajectory) -> usize {
    trajectory
        .samples()
        .iter()
        .filter_map(|s| s.state)
        .collect::<HashSet<i32>>()
        .len()
}

/// Representative current breakdown for the transit, inside-AoI and
/// outside-AoI phases of one unit.
///
/// Uses the first transit sample, the first inside-AoI sample and the last
/// outside-AoI sample, in time order. Phases the unit never entered are
/// omitted.
pub fn state_breakdown(trajectory: &Trajectory) -> Vec<CurrentBreakdown> {
    let samples = trajectory.samples();
    let in_state = |state: MissionState| {
        move |s: &&Sample| s.state == Some(state.code())
    };

    let picks = [
        (MissionState::Transit, samples.iter().find(in_state(MissionState::Transit))),
        (MissionState::InsideAoi, samples.iter().find(in_state(MissionState::InsideAoi))),
        (MissionState::OutsideAoi, samples.iter().rev().find(in_state(MissionState::OutsideAoi))),
    ];

    picks
        .into_iter()
        .filter_map(|(state, sample)| {
            let sample = sample?;
            Some(CurrentBreakdown {
                unit_id: trajectory.unit_id(),
                state,
                line: sample.line,
                time: sample.time.unwrap_or_default(),
                mobility: sample.mobility_current,
                hardware: sample.hardware_current,
                computing: sample.computing_current,
            })
        })
        .collect()
}

/// Mission overview of one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitSummary {
    pub unit_id: i64,
    pub samples: usize,
    pub t_start: f64,
    pub t_end: f64,
    /// First position, `[x, y, z]`.
    pub takeoff: Option<[f64; 3]>,
    /// Last position, `[x, y, z]`.
    pub landing: Option<[f64; 3]>,
    /// Last minus first energy reading.
    pub energy_consumed: Option<f64>,
    pub final_percentage: Option<f64>,
    pub peak_current: Option<f64>,
}

impl UnitSummary {
    #[inline]
    pub fn duration(&self) -> f64 {
        self.t_end - self.t_start
    }
}

/// Summarize one trajectory.
pub fn summarize_unit(trajectory: &Trajectory) -> UnitSummary {
    let samples = trajectory.samples();
    let position = |s: &Sample| Some([s.x?, s.y?, s.z?]);

    let first_energy = samples.iter().find_map(|s| s.energy_used);
    let last_energy = samples.iter().rev().find_map(|s| s.energy_used);

    UnitSummary {
        unit_id: trajectory.unit_id(),
        samples: samples.len(),
        t_start: trajectory.t_min().unwrap_or_default(),
        t_end: trajectory.t_max().unwrap_or_default(),
        takeoff: samples.iter().find_map(position),
        landing: samples.iter().rev().find_map(position),
        energy_consumed: first_energy.zip(last_energy).map(|(a, b)| b - a),
        final_percentage: samples.iter().rev().find_map(|s| s.percentage),
        peak_current: samples
            .iter()
            .filter_map(|s| s.current_draw)
            .reduce(f64::max),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::trajectory::group_by_unit;

    fn sample(line: usize, unit_id: i64, time: f64, state: i32, mobility: f64) -> Sample {
        Sample {
            line,
            unit_id: Some(unit_id),
            time: Some(time),
            x: Some(time * 10.0),
            y: Some(0.0),
            z: Some(5.0),
            energy_used: Some(time * 2.0),
            current_draw: Some(mobility + 2.0),
            percentage: Some(100.0 - time),
            mobility_current: Some(mobility),
            hardware_current: Some(1.0),
            computing_current: Some(0.5),
            state: Some(state),
            ..Sample::default()
        }
    }

    fn mission() -> Vec<Sample> {
        vec![
            sample(1, 4, 0.0, 3, 9.0),
            sample(2, 4, 1.0, 0, 8.0),
            sample(3, 4, 2.0, 0, 7.5),
            sample(4, 4, 3.0, 2, 4.0),
            sample(5, 4, 4.0, 1, 6.0),
            sample(6, 4, 5.0, 2, 4.2),
            sample(7, 4, 6.0, 1, 6.5),
            sample(8, 1, 0.0, 0, 1.0),
            sample(9, 1, 1.0, 0, 1.0),
        ]
    }

    #[test]
    fn test_state_codes() {
        assert_eq!(MissionState::from_code(2), Some(MissionState::InsideAoi));
        assert_eq!(MissionState::from_code(7), None);
        assert_eq!(MissionState::OutsideAoi.code(), 1);
        assert_eq!(MissionState::Transit.to_string(), "Phase 1");
    }

    #[test]
    fn test_select_breakdown_unit() {
        let trajectories = group_by_unit(&mission());

        let unit = select_breakdown_unit(&trajectories, 3).unwrap();
        assert_eq!(unit.unit_id(), 4);

        let unit = select_breakdown_unit(&trajectories, 1).unwrap();
        assert_eq!(unit.unit_id(), 1);

        assert!(select_breakdown_unit(&trajectories, 5).is_none());
    }

    #[test]
    fn test_state_breakdown_picks() {
        let trajectories = group_by_unit(&mission());
        let rows = state_breakdown(&trajectories[0]);

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].state, MissionState::Transit);
        assert_eq!(rows[0].line, 2);
        assert_eq!(rows[1].state, MissionState::InsideAoi);
        assert_eq!(rows[1].line, 4);
        assert_eq!(rows[2].state, MissionState::OutsideAoi);
        assert_eq!(rows[2].line, 7);
        assert_eq!(rows[2].total(), 8.0);
    }

    #[test]
    fn test_state_breakdown_skips_unvisited_states() {
        let trajectories = group_by_unit(&mission());
        let rows = state_breakdown(&trajectories[1]);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].state, MissionState::Transit);
    }

    #[test]
    fn test_breakdown_total_with_missing_component() {
        let row = CurrentBreakdown {
            unit_id: 1,
            state: MissionState::Transit,
            line: 1,
            time: 0.0,
            mobility: Some(2.0),
            hardware: None,
            computing: Some(0.25),
        };
        assert_eq!(row.total(), 2.25);
    }

    #[test]
    fn test_summarize_unit() {
        let trajectories = group_by_unit(&mission());
        let summary = summarize_unit(&trajectories[0]);

        assert_eq!(summary.unit_id, 4);
        assert_eq!(summary.samples, 7);
        assert_eq!(summary.duration(), 6.0);
        assert_eq!(summary.takeoff, Some([0.0, 0.0, 5.0]));
        assert_eq!(summary.landing, Some([60.0, 0.0, 5.0]));
        assert_eq!(summary.energy_consumed, Some(12.0));
        assert_eq!(summary.final_percentage, Some(94.0));
        assert_eq!(summary.peak_current, Some(11.0));
    }
}
