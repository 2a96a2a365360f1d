//! File-backed sources

use super::{ProbeRegistrySource, SchemaSource};
use crate::probes::ProbeRegistry;
use crate::schema::{parse_schema, SchemaField};
use crate::{Error, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

/// Reads `bq show --schema --format=json` output saved to disk
#[derive(Debug, Clone)]
pub struct FileSchemaSource {
    path: PathBuf,
}

impl FileSchemaSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SchemaSource for FileSchemaSource {
    async fn fetch_schema(&self) -> Result<Vec<SchemaField>> {
        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            Error::SchemaFetch(format!("failed to read {}: {e}", self.path.display()))
        })?;
        let fields = parse_schema(&raw)?;
        debug!(path = %self.path.display(), fields = fields.len(), "Loaded schema");
        Ok(fields)
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}

/// Reads a saved probe info service response
#[derive(Debug, Clone)]
pub struct FileProbeRegistry {
    path: PathBuf,
}

impl FileProbeRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ProbeRegistrySource for FileProbeRegistry {
    async fn fetch_registry(&self) -> Result<ProbeRegistry> {
        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            Error::RegistryFetch(format!("failed to read {}: {e}", self.path.display()))
        })?;
        let registry = ProbeRegistry::from_json(&raw)?;
        debug!(path = %self.path.display(), probes = registry.len(), "Loaded probe registry");
        Ok(registry)
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}
