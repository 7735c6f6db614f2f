//! In-memory columnar sensor table
//!
//! Every column is optional so that an absent column is reported as a data
//! error by [`SensorTable::samples`] instead of failing deserialization.
//! Cells are nullable; null channel readings become NaN and are handled by the
//! window fill policy.

use crate::error::DetectError;
use crate::schema::timestamp::{format_timestamp, normalize_timestamp};
use crate::types::{RawSample, REQUIRED_COLUMNS};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Columnar sensor readings for one or more series
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorTable {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series_id: Option<Vec<Option<String>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<Vec<Option<i64>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Vec<Option<String>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anglez: Option<Vec<Option<f64>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enmo: Option<Vec<Option<f64>>>,
}

impl SensorTable {
    /// Parse a JSON array of row objects
    pub fn from_records_json(json: &str) -> Result<Self, DetectError> {
        let records: Vec<Map<String, Value>> = serde_json::from_str(json)?;
        Self::from_records(&records)
    }

    /// Parse NDJSON, one row object per line
    pub fn from_ndjson(ndjson: &str) -> Result<Self, DetectError> {
        let mut records = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<Map<String, Value>>(trimmed) {
                Ok(record) => records.push(record),
                Err(e) => {
                    return Err(DetectError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Self::from_records(&records)
    }

    /// Parse a columnar object: `{"series_id": [...], "step": [...], ...}`
    pub fn from_columns_json(json: &str) -> Result<Self, DetectError> {
        let table: SensorTable = serde_json::from_str(json)?;
        Ok(table)
    }

    /// Build a table from row objects. A column exists when any row carries it;
    /// rows lacking the key hold a null cell. No rows gives every column empty.
    pub fn from_records(records: &[Map<String, Value>]) -> Result<Self, DetectError> {
        let mut columns: HashMap<&str, Vec<Value>> = HashMap::new();
        for name in REQUIRED_COLUMNS {
            if records.is_empty() || records.iter().any(|r| r.contains_key(name)) {
                let cells = records
                    .iter()
                    .map(|r| r.get(name).cloned().unwrap_or(Value::Null))
                    .collect();
                columns.insert(name, cells);
            }
        }

        Ok(SensorTable {
            series_id: columns
                .get("series_id")
                .map(|cells| convert_column(cells, "series_id", string_cell))
                .transpose()?,
            step: columns
                .get("step")
                .map(|cells| convert_column(cells, "step", integer_cell))
                .transpose()?,
            timestamp: columns
                .get("timestamp")
                .map(|cells| convert_column(cells, "timestamp", string_cell))
                .transpose()?,
            anglez: columns
                .get("anglez")
                .map(|cells| convert_column(cells, "anglez", float_cell))
                .transpose()?,
            enmo: columns
                .get("enmo")
                .map(|cells| convert_column(cells, "enmo", float_cell))
                .transpose()?,
        })
    }

    /// Build a fully populated table from samples
    pub fn from_samples(samples: &[RawSample]) -> Self {
        SensorTable {
            series_id: Some(samples.iter().map(|s| Some(s.series_id.clone())).collect()),
            step: Some(samples.iter().map(|s| Some(s.step)).collect()),
            timestamp: Some(
                samples
                    .iter()
                    .map(|s| Some(format_timestamp(&s.timestamp)))
                    .collect(),
            ),
            anglez: Some(samples.iter().map(|s| Some(s.anglez)).collect()),
            enmo: Some(samples.iter().map(|s| Some(s.enmo)).collect()),
        }
    }

    /// Number of rows, taken from the longest present column
    pub fn len(&self) -> usize {
        self.column_lengths()
            .into_iter()
            .filter_map(|(_, len)| len)
            .max()
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Names of required columns that are absent
    pub fn missing_columns(&self) -> Vec<String> {
        self.column_lengths()
            .into_iter()
            .filter(|(_, len)| len.is_none())
            .map(|(name, _)| name.to_string())
            .collect()
    }

    fn column_lengths(&self) -> [(&'static str, Option<usize>); 5] {
        [
            ("series_id", self.series_id.as_ref().map(Vec::len)),
            ("step", self.step.as_ref().map(Vec::len)),
            ("timestamp", self.timestamp.as_ref().map(Vec::len)),
            ("anglez", self.anglez.as_ref().map(Vec::len)),
            ("enmo", self.enmo.as_ref().map(Vec::len)),
        ]
    }

    /// Validate the table and produce samples in row order
    pub fn samples(&self) -> Result<Vec<RawSample>, DetectError> {
        let missing = self.missing_columns();
        if !missing.is_empty() {
            return Err(DetectError::MissingColumns(missing));
        }

        let (Some(series_ids), Some(steps), Some(timestamps), Some(anglez), Some(enmo)) = (
            &self.series_id,
            &self.step,
            &self.timestamp,
            &self.anglez,
            &self.enmo,
        ) else {
            return Err(DetectError::Internal(
                "column presence changed during validation".to_string(),
            ));
        };

        let rows = series_ids.len();
        if rows == 0 {
            return Err(DetectError::EmptyInput);
        }

        for (name, len) in self.column_lengths() {
            let len = len.unwrap_or(0);
            if len != rows {
                return Err(DetectError::ColumnLengthMismatch {
                    column: name.to_string(),
                    expected: rows,
                    actual: len,
                });
            }
        }

        let mut samples = Vec::with_capacity(rows);
        for row in 0..rows {
            let series_id = series_ids[row].clone().ok_or_else(|| null_cell("series_id", row))?;
            let step = steps[row].ok_or_else(|| null_cell("step", row))?;
            let raw_ts = timestamps[row]
                .as_deref()
                .ok_or_else(|| null_cell("timestamp", row))?;
            let timestamp =
                normalize_timestamp(raw_ts).ok_or_else(|| DetectError::InvalidTimestamp {
                    row,
                    value: raw_ts.to_string(),
                })?;

            samples.push(RawSample {
                series_id,
                step,
                timestamp,
                anglez: anglez[row].unwrap_or(f64::NAN),
                enmo: enmo[row].unwrap_or(f64::NAN),
            });
        }

        Ok(samples)
    }

    /// Collect every problem with the table rather than stopping at the first
    pub fn validate_report(&self) -> ValidationReport {
        let mut report = ValidationReport {
            total_rows: self.len(),
            ..Default::default()
        };

        let missing = self.missing_columns();
        if !missing.is_empty() {
            report
                .errors
                .push(DetectError::MissingColumns(missing).to_string());
            return report;
        }
        if report.total_rows == 0 {
            report.errors.push(DetectError::EmptyInput.to_string());
            return report;
        }

        match self.samples() {
            Ok(samples) => {
                report.series_count = crate::window::group_rows(
                    samples.iter().map(|s| s.series_id.as_str()),
                )
                .len();
                report.warnings = sample_warnings(&samples);
            }
            Err(e) => report.errors.push(e.to_string()),
        }
        report
    }
}

/// Outcome of [`SensorTable::validate_report`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub total_rows: usize,
    pub series_count: usize,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Non-fatal issues: gaps and repeats in steps, missing or negative readings
fn sample_warnings(samples: &[RawSample]) -> Vec<String> {
    let mut warnings = Vec::new();

    let missing_readings = samples
        .iter()
        .filter(|s| s.anglez.is_nan() || s.enmo.is_nan())
        .count();
    if missing_readings > 0 {
        warnings.push(format!("{} rows have missing anglez or enmo readings", missing_readings));
    }

    let negative_enmo = samples.iter().filter(|s| s.enmo < 0.0).count();
    if negative_enmo > 0 {
        warnings.push(format!("{} rows have negative enmo", negative_enmo));
    }

    let groups = crate::window::group_rows(samples.iter().map(|s| s.series_id.as_str()));
    for rows in groups {
        let series_id = &samples[rows[0]].series_id;
        let non_contiguous = rows
            .windows(2)
            .filter(|pair| samples[pair[1]].step != samples[pair[0]].step + 1)
            .count();
        if non_contiguous > 0 {
            warnings.push(format!(
                "series {} has {} non-contiguous steps; windows assume contiguous steps",
                series_id, non_contiguous
            ));
        }
    }

    warnings
}

fn null_cell(column: &str, row: usize) -> DetectError {
    DetectError::InvalidValue {
        column: column.to_string(),
        row,
        reason: "null value".to_string(),
    }
}

fn convert_column<T>(
    cells: &[Value],
    column: &str,
    convert: fn(&Value) -> Result<Option<T>, String>,
) -> Result<Vec<Option<T>>, DetectError> {
    cells
        .iter()
        .enumerate()
        .map(|(row, cell)| {
            convert(cell).map_err(|reason| DetectError::InvalidValue {
                column: column.to_string(),
                row,
                reason,
            })
        })
        .collect()
}

fn string_cell(value: &Value) -> Result<Option<String>, String> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(format!("expected string, got {}", other)),
    }
}

fn integer_cell(value: &Value) -> Result<Option<i64>, String> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(Some(i));
            }
            match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(Some(f as i64)),
                _ => Err(format!("expected integer, got {}", n)),
            }
        }
        other => Err(format!("expected integer, got {}", other)),
    }
}

fn float_cell(value: &Value) -> Result<Option<f64>, String> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| format!("expected number, got {}", n)),
        other => Err(format!("expected number, got {}", other)),
    }
}
