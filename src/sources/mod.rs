//! External data sources
//!
//! The generators read two things: the source table's schema and the list
//! of known probes. Each comes from a remote service in production and from
//! a local JSON file in tests and offline runs.

mod bigquery;
mod file;
mod http;

pub use bigquery::BigQuerySchemaSource;
pub use file::{FileProbeRegistry, FileSchemaSource};
pub use http::HttpProbeRegistry;

use crate::probes::ProbeRegistry;
use crate::schema::SchemaField;
use crate::Result;
use async_trait::async_trait;

/// Where table schemas come from
#[async_trait]
pub trait SchemaSource: Send + Sync {
    /// Fetch the ordered top-level fields of the table
    async fn fetch_schema(&self) -> Result<Vec<SchemaField>>;

    /// Human-readable description for logs
    fn describe(&self) -> String;
}

/// Where the known-probe registry comes from
#[async_trait]
pub trait ProbeRegistrySource: Send + Sync {
    /// Fetch the registry
    async fn fetch_registry(&self) -> Result<ProbeRegistry>;

    /// Human-readable description for logs
    fn describe(&self) -> String;
}
