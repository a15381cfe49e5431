//! Core data types, numeric primitives and I/O operations.

pub mod loaders;
pub mod trajectory;
pub mod transforms;
pub mod writers;

pub use loaders::{load_telemetry_log, Field, MalformedRecord, Sample, TelemetryTable};
pub use trajectory::{group_by_unit, Trajectory, TrajectoryError};
pub use writers::{write_breakdown_csv, write_heatmap_csv, write_resampled_csv, WriteError};
