//! Metric schema, per-scrape snapshots and their text exposition.
//!
//! Typical usage in a scrape handler:
//!
//! ```ignore
//! use collector::metrics::{Snapshot, encode_text};
//!
//! let mut snapshot = Snapshot::new();
//! // ... orchestrator records samples ...
//! let body = encode_text(&snapshot)?;
//! ```

pub mod exposition;
pub mod schema;

pub use exposition::{CONTENT_TYPE, ExpositionError, encode_text};
pub use schema::{FamilySpec, MetricFamily, SCHEMA, Sample, Snapshot};
