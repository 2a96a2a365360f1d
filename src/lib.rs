//! # clients-daily-aggregates
//!
//! Generates the BigQuery statements that roll per-client telemetry probes
//! up into daily aggregates.
//!
//! Nothing is executed here. Each run reads a table schema and the probe
//! registry, keeps the schema columns that both look like a metric type and
//! name a known probe, and prints one SQL statement.
//!
//! ## Generators
//!
//! - **clients_daily_scalar_aggregates**: scalars, booleans, keyed scalars
//!   and decoded histograms of `main_summary_v4`
//! - **clients_daily_histogram_aggregates**: JSON-encoded histograms and
//!   keyed histograms of the live `main_v4` ping table
//!
//! ## Pipeline
//!
//! - **Sources**: `bq show` or a file for the schema, the probe info
//!   service or a file for the registry
//! - **Classifier**: shape rules plus registry membership per metric type
//! - **Composer**: per-probe fragments filled into a fixed template whose
//!   first step always deduplicates retransmitted documents

pub mod config;
pub mod driver;
pub mod generators;
pub mod probes;
pub mod schema;
pub mod sources;
pub mod sql;
pub mod telemetry;

mod error;

pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{QueryOptions, SourceArgs, SourceFactory, TableRef};
    pub use crate::generators::{
        Generator, HistogramAggType, HistogramAggregates, ScalarAggType, ScalarAggregates,
    };
    pub use crate::probes::{MetricType, ProbeRegistry, ProbeSet};
    pub use crate::schema::SchemaField;
    pub use crate::{Error, Result};
}
