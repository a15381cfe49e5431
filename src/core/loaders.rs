//! Loader for whitespace-delimited fleet telemetry logs.
//!
//! Each physical line of a log is one sample of one unit, written as a fixed
//! positional sequence of tokens (see [`Field`]). Parsing is lenient: a token
//! that fails numeric conversion becomes a missing value and the row is kept,
//! with the problem recorded as a [`MalformedRecord`] on the table.

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use log::warn;
use thiserror::Error;

use crate::config::{LogSchema, ParserConfig};
use crate::core::trajectory::{group_by_unit, Trajectory};

/// Number of malformed records logged individually before summarizing.
const MAX_LOGGED_ISSUES: usize = 5;

/// Errors that can occur during log loading.
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No telemetry records in {0}")]
    EmptyFile(String),
}

/// Result type for loader operations.
pub type Result<T> = std::result::Result<T, LoaderError>;

/// Positional columns of a telemetry log line, in file order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    UnitId,
    X,
    Y,
    Z,
    EnergyUsed,
    Time,
    AoiStartX,
    AoiEndX,
    AoiStartY,
    AoiEndY,
    AoiStartZ,
    AoiEndZ,
    CurrentDraw,
    Percentage,
    MobilityCurrent,
    HardwareCurrent,
    ComputingCurrent,
    State,
}

impl Field {
    /// All columns of the full 18-field layout. The legacy layout is the
    /// first 12 entries.
    pub const ALL: [Field; 18] = [
        Field::UnitId,
        Field::X,
        Field::Y,
        Field::Z,
        Field::EnergyUsed,
        Field::Time,
        Field::AoiStartX,
        Field::AoiEndX,
        Field::AoiStartY,
        Field::AoiEndY,
        Field::AoiStartZ,
        Field::AoiEndZ,
        Field::CurrentDraw,
        Field::Percentage,
        Field::MobilityCurrent,
        Field::HardwareCurrent,
        Field::ComputingCurrent,
        Field::State,
    ];

    /// Column name as used in exported tables.
    pub fn name(self) -> &'static str {
        match self {
            Field::UnitId => "unit_id",
            Field::X => "x",
            Field::Y => "y",
            Field::Z => "z",
            Field::EnergyUsed => "energy_used",
            Field::Time => "time",
            Field::AoiStartX => "aoi_start_x",
            Field::AoiEndX => "aoi_end_x",
            Field::AoiStartY => "aoi_start_y",
            Field::AoiEndY => "aoi_end_y",
            Field::AoiStartZ => "aoi_start_z",
            Field::AoiEndZ => "aoi_end_z",
            Field::CurrentDraw => "current_draw",
            Field::Percentage => "percentage",
            Field::MobilityCurrent => "mobility_current",
            Field::HardwareCurrent => "hardware_current",
            Field::ComputingCurrent => "computing_current",
            Field::State => "state",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Columns present in a line of the given layout.
pub fn schema_fields(schema: LogSchema) -> &'static [Field] {
    match schema {
        LogSchema::Full => &Field::ALL,
        LogSchema::Legacy => &Field::ALL[..12],
    }
}

/// Bounds of the area of interest a unit was tasked with.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AreaOfInterest {
    pub start_x: Option<f64>,
    pub end_x: Option<f64>,
    pub start_y: Option<f64>,
    pub end_y: Option<f64>,
    pub start_z: Option<f64>,
    pub end_z: Option<f64>,
}

/// One observation of one unit at one instant.
///
/// Every numeric field is optional: unparsable tokens are kept as missing
/// values rather than discarding the row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sample {
    /// 1-based line number in the source log.
    pub line: usize,
    pub unit_id: Option<i64>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
    /// Cumulative energy consumed (battery usage), Joules.
    pub energy_used: Option<f64>,
    /// Timestamp in seconds.
    pub time: Option<f64>,
    pub aoi: AreaOfInterest,
    pub current_draw: Option<f64>,
    pub percentage: Option<f64>,
    pub mobility_current: Option<f64>,
    pub hardware_current: Option<f64>,
    pub computing_current: Option<f64>,
    pub state: Option<i32>,
}

impl Sample {
    /// Returns the value of `field` as a float, if present.
    pub fn value(&self, field: Field) -> Option<f64> {
        match field {
            Field::UnitId => self.unit_id.map(|id| id as f64),
            Field::X => self.x,
            Field::Y => self.y,
            Field::Z => self.z,
            Field::EnergyUsed => self.energy_used,
            Field::Time => self.time,
            Field::AoiStartX => self.aoi.start_x,
            Field::AoiEndX => self.aoi.end_x,
            Field::AoiStartY => self.aoi.start_y,
            Field::AoiEndY => self.aoi.end_y,
            Field::AoiStartZ => self.aoi.start_z,
            Field::AoiEndZ => self.aoi.end_z,
            Field::CurrentDraw => self.current_draw,
            Field::Percentage => self.percentage,
            Field::MobilityCurrent => self.mobility_current,
            Field::HardwareCurrent => self.hardware_current,
            Field::ComputingCurrent => self.computing_current,
            Field::State => self.state.map(f64::from),
        }
    }

    /// Planar position, if both coordinates are present.
    #[inline]
    pub fn planar(&self) -> Option<(f64, f64)> {
        Some((self.x?, self.y?))
    }

    fn set_float(&mut self, field: Field, value: Option<f64>) {
        let slot = match field {
            Field::X => &mut self.x,
            Field::Y => &mut self.y,
            Field::Z => &mut self.z,
            Field::EnergyUsed => &mut self.energy_used,
            Field::Time => &mut self.time,
            Field::AoiStartX => &mut self.aoi.start_x,
            Field::AoiEndX => &mut self.aoi.end_x,
            Field::AoiStartY => &mut self.aoi.start_y,
            Field::AoiEndY => &mut self.aoi.end_y,
            Field::AoiStartZ => &mut self.aoi.start_z,
            Field::AoiEndZ => &mut self.aoi.end_z,
            Field::CurrentDraw => &mut self.current_draw,
            Field::Percentage => &mut self.percentage,
            Field::MobilityCurrent => &mut self.mobility_current,
            Field::HardwareCurrent => &mut self.hardware_current,
            Field::ComputingCurrent => &mut self.computing_current,
            Field::UnitId | Field::State => return,
        };
        *slot = value;
    }
}

/// What was wrong with a record.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordIssue {
    /// The line did not tokenize into the expected number of fields.
    FieldCount { expected: usize, found: usize },
    /// A token could not be converted; the field was left missing.
    InvalidField { field: Field, token: String },
}

/// A non-fatal problem found while parsing one line.
#[derive(Debug, Clone, PartialEq)]
pub struct MalformedRecord {
    /// 1-based line number in the source log.
    pub line: usize,
    /// Unit id of the row, when it could be parsed.
    pub unit_id: Option<i64>,
    pub issue: RecordIssue,
}

impl fmt::Display for MalformedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}", self.line)?;
        if let Some(id) = self.unit_id {
            write!(f, " (unit {})", id)?;
        }
        match &self.issue {
            RecordIssue::FieldCount { expected, found } => {
                write!(f, ": expected {} fields, found {}", expected, found)
            }
            RecordIssue::InvalidField { field, token } => {
                write!(f, ": invalid {} value {:?}", field, token)
            }
        }
    }
}

/// Parsed telemetry log: one typed sample per line, in file order.
#[derive(Debug, Clone)]
pub struct TelemetryTable {
    pub samples: Vec<Sample>,
    pub schema: LogSchema,
    /// Problems found while parsing; the affected rows are still in `samples`.
    pub malformed: Vec<MalformedRecord>,
    pub source_path: Option<PathBuf>,
}

impl TelemetryTable {
    /// Returns the number of rows.
    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns true if the table has no rows.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Distinct unit ids in first-appearance order.
    pub fn unit_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = Vec::new();
        for id in self.samples.iter().filter_map(|s| s.unit_id) {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }

    /// Groups the rows into time-ordered per-unit trajectories.
    pub fn trajectories(&self) -> Vec<Trajectory> {
        group_by_unit(&self.samples)
    }
}

/// Load a telemetry log from disk.
///
/// # Errors
///
/// Returns an error if the file cannot be read or contains no records.
/// Malformed lines are not errors; see [`TelemetryTable::malformed`].
pub fn load_telemetry_log<P: AsRef<Path>>(path: P, config: &ParserConfig) -> Result<TelemetryTable> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let reader = BufReader::with_capacity(64 * 1024, file);

    let mut table = read_records(reader, config, &path.display().to_string())?;
    table.source_path = Some(path.to_path_buf());
    Ok(table)
}

/// Parse a telemetry log from any buffered reader.
pub fn parse_telemetry<R: BufRead>(reader: R, config: &ParserConfig) -> Result<TelemetryTable> {
    read_records(reader, config, "<input>")
}

fn read_records<R: BufRead>(reader: R, config: &ParserConfig, source: &str) -> Result<TelemetryTable> {
    let mut samples = Vec::new();
    let mut malformed = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let (sample, issues) = parse_record(idx + 1, &line, config);
        for issue in issues {
            if malformed.len() < MAX_LOGGED_ISSUES {
                warn!("{}: {}", source, issue);
            }
            malformed.push(issue);
        }
        samples.push(sample);
    }

    if malformed.len() > MAX_LOGGED_ISSUES {
        warn!(
            "{}: {} malformed fields in total, affected values left missing",
            source,
            malformed.len()
        );
    }

    if samples.is_empty() {
        return Err(LoaderError::EmptyFile(source.to_string()));
    }

    Ok(TelemetryTable {
        samples,
        schema: config.schema,
        malformed,
        source_path: None,
    })
}

/// Parse one log line into a sample.
///
/// Never fails: fields that are absent or unparsable are left missing and
/// reported in the returned issue list.
pub fn parse_record(line_no: usize, line: &str, config: &ParserConfig) -> (Sample, Vec<MalformedRecord>) {
    let fields = schema_fields(config.schema);
    let tokens: Vec<&str> = line.split_whitespace().collect();

    let mut sample = Sample {
        line: line_no,
        ..Sample::default()
    };
    let mut issues: Vec<RecordIssue> = Vec::new();

    if tokens.len() != fields.len() {
        issues.push(RecordIssue::FieldCount {
            expected: fields.len(),
            found: tokens.len(),
        });
    }

    for (&field, &token) in fields.iter().zip(tokens.iter()) {
        let parsed = match field {
            Field::UnitId => parse_integral(token).map(|v| sample.unit_id = Some(v)),
            Field::State => parse_integral(token)
                .and_then(|v| i32::try_from(v).ok())
                .map(|v| sample.state = Some(v)),
            Field::Time => parse_time(token, config).map(|v| sample.time = v),
            _ => parse_float(token).map(|v| sample.set_float(field, v)),
        };

        if parsed.is_none() {
            issues.push(RecordIssue::InvalidField {
                field,
                token: token.to_string(),
            });
        }
    }

    let unit_id = sample.unit_id;
    let records = issues
        .into_iter()
        .map(|issue| MalformedRecord {
            line: line_no,
            unit_id,
            issue,
        })
        .collect();

    (sample, records)
}

/// `None` on conversion failure or an infinite value; `Some(None)` for an
/// explicit NaN.
fn parse_float(token: &str) -> Option<Option<f64>> {
    let value: f64 = token.parse().ok()?;
    if value.is_nan() {
        Some(None)
    } else if value.is_infinite() {
        None
    } else {
        Some(Some(value))
    }
}

fn parse_integral(token: &str) -> Option<i64> {
    if let Ok(v) = token.parse::<i64>() {
        return Some(v);
    }
    // Integral floats such as "3.0" are accepted
    let v: f64 = token.parse().ok()?;
    if v.is_finite() && v.fract() == 0.0 && v.abs() < i64::MAX as f64 {
        Some(v as i64)
    } else {
        None
    }
}

fn parse_time(token: &str, config: &ParserConfig) -> Option<Option<f64>> {
    let raw = token.strip_suffix(config.time_suffix.as_str()).unwrap_or(token);
    parse_float(raw).map(|v| v.map(|t| t * config.time_scale))
}
