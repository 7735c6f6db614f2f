//! Input table schema
//!
//! Sensor tables arrive as JSON records, NDJSON, or a columnar object and are
//! validated into [`RawSample`](crate::types::RawSample)s.

mod table;
mod timestamp;

pub use table::*;
pub use timestamp::{format_timestamp, normalize_timestamp};
