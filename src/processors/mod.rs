//! Analysis stages consuming parsed trajectories.

pub mod breakdown;
pub mod heatmap;
pub mod resampling;

// Re-export key types for convenience
pub use breakdown::{
    select_breakdown_unit, state_breakdown, summarize_unit, CurrentBreakdown, MissionState,
    UnitSummary,
};
pub use heatmap::{attribute_unit_energy, build_energy_heatmap, EnergyGrid, HeatmapError};
pub use resampling::{
    resample_trajectory, resample_units, ResampleError, ResampledPoint, ResampledTable,
};
