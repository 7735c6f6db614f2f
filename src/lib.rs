//! sleepwake-flux - Sleep onset and wakeup detection from wrist-worn accelerometry
//!
//! The detector turns a table of per-step sensor readings into per-step event
//! labels through a deterministic pipeline: feature derivation → binary
//! classification → probability smoothing → run-length segmentation.
//!
//! ## Modules
//!
//! - **Pipeline**: [`SleepPipeline`] and the stateless [`detect_events`] entry point
//! - **Classifier**: the [`Classifier`] capability plus JSON model artifacts
//! - **Schema**: input table loading and timestamp normalization

pub mod classifier;
pub mod config;
pub mod encoder;
pub mod error;
pub mod features;
pub mod pipeline;
pub mod schema;
pub mod segmenter;
pub mod smoother;
pub mod types;
pub mod window;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use classifier::{load_classifier, Classifier, FeatureMatrix, ModelArtifact};
pub use config::{PipelineConfig, WindowScope};
pub use encoder::{EventEncoder, OutputLayout};
pub use error::{DetectError, ErrorKind};
pub use features::FeatureBuilder;
pub use pipeline::{detect_events, detect_events_json, SleepPipeline};
pub use schema::{SensorTable, ValidationReport};
pub use segmenter::EventSegmenter;
pub use smoother::Smoother;
pub use types::{Event, EventKind, EventSummary, FeatureRow, PredictionRow, RawSample};

/// Library version reported by the CLI and FFI surfaces
pub const FLUX_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name reported by the CLI
pub const PRODUCER_NAME: &str = "sleepwake-flux";
