//! Output encoding
//!
//! This module renders event tables (and the detailed/feature tables the CLI
//! can dump) as a JSON array of records, NDJSON, or pretty-printed JSON.

use crate::error::DetectError;
use serde::Serialize;

/// Output layout for encoded tables
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputLayout {
    /// One JSON array of records
    #[default]
    Records,
    /// One record per line
    Ndjson,
    /// Indented JSON array of records
    Pretty,
}

/// Encoder for row tables
#[derive(Debug, Clone, Default)]
pub struct EventEncoder {
    layout: OutputLayout,
}

impl EventEncoder {
    /// Create an encoder producing a compact JSON array
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_layout(layout: OutputLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> OutputLayout {
        self.layout
    }

    /// Encode rows using the configured layout
    pub fn encode<T: Serialize>(&self, rows: &[T]) -> Result<String, DetectError> {
        match self.layout {
            OutputLayout::Records => self.encode_to_json(rows),
            OutputLayout::Ndjson => self.encode_to_ndjson(rows),
            OutputLayout::Pretty => self.encode_to_pretty_json(rows),
        }
    }

    /// Encode to a compact JSON array
    pub fn encode_to_json<T: Serialize>(&self, rows: &[T]) -> Result<String, DetectError> {
        Ok(serde_json::to_string(rows)?)
    }

    /// Encode to an indented JSON array
    pub fn encode_to_pretty_json<T: Serialize>(&self, rows: &[T]) -> Result<String, DetectError> {
        Ok(serde_json::to_string_pretty(rows)?)
    }

    /// Encode one record per line; empty input yields an empty string
    pub fn encode_to_ndjson<T: Serialize>(&self, rows: &[T]) -> Result<String, DetectError> {
        let mut out = String::new();
        for row in rows {
            out.push_str(&serde_json::to_string(row)?);
            out.push('\n');
        }
        Ok(out)
    }
}
