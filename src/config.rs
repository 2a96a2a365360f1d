//! Command-line and environment configuration
//!
//! Both generator binaries share the same source options. [`SourceFactory`]
//! turns them into concrete schema and registry sources: a local file when
//! one is given, otherwise the remote service.

use crate::sources::{
    BigQuerySchemaSource, FileProbeRegistry, FileSchemaSource, HttpProbeRegistry,
    ProbeRegistrySource, SchemaSource,
};
use crate::{Error, Result};
use chrono::NaiveDate;
use clap::Args;
use std::path::PathBuf;
use tracing::info;

/// Probe info service listing every known main-ping probe
pub const DEFAULT_PROBE_INFO_SERVICE: &str =
    "https://probeinfo.telemetry.mozilla.org/firefox/all/main/all_probes";

/// Release channels rows may come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Channel {
    Release,
    Esr,
    Beta,
    Aurora,
    Default,
    Nightly,
}

impl Channel {
    pub const ALL: [Channel; 6] = [
        Channel::Release,
        Channel::Esr,
        Channel::Beta,
        Channel::Aurora,
        Channel::Default,
        Channel::Nightly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Release => "release",
            Self::Esr => "esr",
            Self::Beta => "beta",
            Self::Aurora => "aurora",
            Self::Default => "default",
            Self::Nightly => "nightly",
        }
    }
}

impl std::str::FromStr for Channel {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "release" => Ok(Self::Release),
            "esr" => Ok(Self::Esr),
            "beta" => Ok(Self::Beta),
            "aurora" => Ok(Self::Aurora),
            "default" => Ok(Self::Default),
            "nightly" => Ok(Self::Nightly),
            other => Err(format!(
                "unknown channel '{}'; expected one of release, esr, beta, aurora, default, nightly",
                other
            )),
        }
    }
}

/// Date filter of the deduplication step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubmissionDate {
    /// Leave the `@submission_date` query parameter for the scheduler
    #[default]
    Parameter,
    /// Bake a fixed date into the query
    Fixed(NaiveDate),
}

impl SubmissionDate {
    pub fn to_sql(&self) -> String {
        match self {
            SubmissionDate::Parameter => "@submission_date".to_string(),
            SubmissionDate::Fixed(date) => format!("'{}'", date.format("%Y-%m-%d")),
        }
    }
}

/// Options that change the rendered query but not the probe selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOptions {
    pub submission_date: SubmissionDate,
    /// Channels kept by the deduplication step, in [`Channel::ALL`] order
    pub channels: Vec<Channel>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            submission_date: SubmissionDate::Parameter,
            channels: Channel::ALL.to_vec(),
        }
    }
}

impl QueryOptions {
    /// Parenthesized channel list for an `IN` clause
    pub fn channel_list(&self) -> String {
        let channels = self
            .channels
            .iter()
            .map(|channel| format!("\"{}\"", channel.as_str()))
            .collect::<Vec<_>>()
            .join(", ");
        format!("({channels})")
    }
}

/// Fully qualified BigQuery table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub project: String,
    /// `dataset.table`
    pub dataset_table: String,
}

impl TableRef {
    pub fn new(project: impl Into<String>, dataset_table: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            dataset_table: dataset_table.into(),
        }
    }

    /// `project:dataset.table`, as `bq show` expects
    pub fn bq_id(&self) -> String {
        format!("{}:{}", self.project, self.dataset_table)
    }

    /// Backquoted name for use in a `FROM` clause
    pub fn sql_name(&self) -> String {
        format!("`{}.{}`", self.project, self.dataset_table)
    }
}

/// Source options shared by both generator binaries
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Read the table schema from a JSON file instead of calling `bq`
    #[arg(long, env = "SCHEMA_FILE")]
    pub schema_file: Option<PathBuf>,

    /// Read the probe registry from a JSON file instead of the probe info service
    #[arg(long, env = "PROBE_REGISTRY_FILE")]
    pub probes_file: Option<PathBuf>,

    /// Probe info service URL
    #[arg(long, env = "PROBE_INFO_SERVICE", default_value = DEFAULT_PROBE_INFO_SERVICE)]
    pub probe_info_url: String,

    /// Project owning the source table
    #[arg(long, env = "BQ_PROJECT")]
    pub project: Option<String>,

    /// Source table as dataset.table
    #[arg(long)]
    pub table: Option<String>,

    /// bq executable used to fetch the schema
    #[arg(long, env = "BQ_BINARY", default_value = "bq")]
    pub bq_binary: String,

    /// Submission date (YYYY-MM-DD); defaults to the @submission_date parameter
    #[arg(long)]
    pub submission_date: Option<NaiveDate>,

    /// Channel to include, repeatable (default: all channels)
    #[arg(long = "channel", value_name = "CHANNEL")]
    pub channels: Vec<Channel>,

    /// Log level
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl SourceArgs {
    /// Apply `--project` / `--table` overrides to a generator's default table.
    pub fn table_ref(&self, default: TableRef) -> Result<TableRef> {
        let project = self.project.clone().unwrap_or(default.project);
        let dataset_table = self.table.clone().unwrap_or(default.dataset_table);

        if project.trim().is_empty() {
            return Err(Error::Config("project cannot be empty".to_string()));
        }
        match dataset_table.split_once('.') {
            Some((dataset, table)) if !dataset.is_empty() && !table.is_empty() => {}
            _ => {
                return Err(Error::Config(format!(
                    "table must be given as dataset.table, got '{}'",
                    dataset_table
                )))
            }
        }

        Ok(TableRef::new(project, dataset_table))
    }

    pub fn query_options(&self) -> QueryOptions {
        let mut channels = if self.channels.is_empty() {
            Channel::ALL.to_vec()
        } else {
            self.channels.clone()
        };
        channels.sort();
        channels.dedup();

        QueryOptions {
            submission_date: self
                .submission_date
                .map(SubmissionDate::Fixed)
                .unwrap_or_default(),
            channels,
        }
    }
}

/// Builds sources from [`SourceArgs`]
pub struct SourceFactory;

impl SourceFactory {
    /// Schema source: `--schema-file` if set, otherwise `bq show`.
    pub fn schema_source(args: &SourceArgs, table: &TableRef) -> Box<dyn SchemaSource> {
        match &args.schema_file {
            Some(path) => {
                info!(path = %path.display(), "Using file schema source");
                Box::new(FileSchemaSource::new(path.clone()))
            }
            None => {
                info!(table = %table.bq_id(), bq = %args.bq_binary, "Using bq schema source");
                Box::new(BigQuerySchemaSource::new(args.bq_binary.clone(), table.clone()))
            }
        }
    }

    /// Probe registry: `--probes-file` if set, otherwise the probe info service.
    pub fn probe_registry(args: &SourceArgs) -> Result<Box<dyn ProbeRegistrySource>> {
        match &args.probes_file {
            Some(path) => {
                info!(path = %path.display(), "Using file probe registry");
                Ok(Box::new(FileProbeRegistry::new(path.clone())))
            }
            None => {
                info!(url = %args.probe_info_url, "Using probe info service");
                Ok(Box::new(HttpProbeRegistry::new(&args.probe_info_url)?))
            }
        }
    }
}
