//! `whisperfile`: a fixed-size, round-robin time series file format and
//! engine, in the Whisper/RRD lineage (see spec.md / SPEC_FULL.md).
//!
//! The file format, archive-spec validation, write/propagation path, and
//! point lookup are the library's entire surface; the CLI binary
//! (`src/main.rs`) is a thin consumer.

pub mod aggregate;
pub mod clock;
pub mod error;
pub mod file;
pub mod point;
pub mod schema;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{Error, Result};
pub use file::{AggregationType, WhisperFile};
pub use point::Point;
pub use schema::{ArchiveSpec, RetentionPolicy, Schema};
