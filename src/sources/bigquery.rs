//! Schema source backed by the `bq` command-line tool

use super::SchemaSource;
use crate::config::TableRef;
use crate::schema::{parse_schema, SchemaField};
use crate::{Error, Result};
use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info_span, Instrument};

/// Runs `bq show --schema --format=json <project>:<dataset.table>`
#[derive(Debug, Clone)]
pub struct BigQuerySchemaSource {
    binary: String,
    table: TableRef,
}

impl BigQuerySchemaSource {
    pub fn new(binary: impl Into<String>, table: TableRef) -> Self {
        Self {
            binary: binary.into(),
            table,
        }
    }

    fn args(&self) -> [String; 4] {
        [
            "show".to_string(),
            "--schema".to_string(),
            "--format=json".to_string(),
            self.table.bq_id(),
        ]
    }

    fn command_line(&self) -> String {
        format!("{} {}", self.binary, self.args().join(" "))
    }
}

#[async_trait]
impl SchemaSource for BigQuerySchemaSource {
    async fn fetch_schema(&self) -> Result<Vec<SchemaField>> {
        let span = info_span!("bq_show_schema", table = %self.table.bq_id());
        let output = Command::new(&self.binary)
            .args(self.args())
            .kill_on_drop(true)
            .output()
            .instrument(span)
            .await
            .map_err(|e| {
                Error::SchemaFetch(format!("failed to run `{}`: {e}", self.command_line()))
            })?;

        if !output.status.success() {
            return Err(Error::SchemaFetch(format!(
                "`{}` exited with {}: {}",
                self.command_line(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let stdout = String::from_utf8(output.stdout).map_err(|e| {
            Error::MalformedSchema(format!("bq output is not valid UTF-8: {e}"))
        })?;
        let fields = parse_schema(&stdout)?;
        debug!(table = %self.table.bq_id(), fields = fields.len(), "Fetched schema");
        Ok(fields)
    }

    fn describe(&self) -> String {
        format!("bq {}", self.table.bq_id())
    }
}
