//! `clients_daily_histogram_aggregates`
//!
//! Aggregates the live `main_v4` ping table. Histograms there are
//! JSON-encoded strings nested under `payload.histograms` and
//! `payload.keyed_histograms`; they are collected raw by the window and
//! decoded once per group by the shared temp functions.

use super::{grouped_select, strings, Generator, FIRST_ROW_FILTER};
use crate::config::{QueryOptions, TableRef};
use crate::probes::{classify, MetricType, NamingConvention, ProbeRegistry, ProbeSet};
use crate::schema::{find_path, SchemaField, ShapeFamily};
use crate::sql::fragments::{literal, struct_type, typed_array};
use crate::sql::udf::{
    get_histogram_type, AGGREGATE_JSON_SUM, GET_BUCKET_RANGE, GET_KEYVAL_PAIRS, STRING_TO_ARR,
};
use crate::sql::{Cte, QueryTemplate, SourceClause, TemplateSlots};
use clap::ValueEnum;
use std::fmt;
use tracing::info;

const ENCODED_HISTOGRAMS: NamingConvention = NamingConvention {
    column_prefix: "",
    strip_prefixes: &[],
    registry_prefix: "histogram/",
    family: ShapeFamily::EncodedHistogram,
};

const ARRIVAL_ORDER: &str = "submission_timestamp";
const WINDOW_ORDER: &str = "`submission_timestamp`";

const BUCKET_RANGE_TYPE: &str =
    "STRUCT<first_bucket INT64, last_bucket INT64, num_buckets INT64>";
const SUMMED_VALUE_TYPE: &str = "ARRAY<STRUCT<key STRING, value INT64>>";

/// Histogram groups under `payload`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum HistogramAggType {
    #[value(name = "histograms")]
    Histograms,
    #[value(name = "keyed_histograms")]
    KeyedHistograms,
}

impl HistogramAggType {
    /// Name of the `payload` member holding the probes
    pub fn as_str(&self) -> &'static str {
        match self {
            HistogramAggType::Histograms => "histograms",
            HistogramAggType::KeyedHistograms => "keyed_histograms",
        }
    }

    pub fn metric_type(&self) -> MetricType {
        match self {
            HistogramAggType::Histograms => MetricType::Histogram,
            HistogramAggType::KeyedHistograms => MetricType::KeyedHistogram,
        }
    }
}

impl fmt::Display for HistogramAggType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Generator for the `main_v4` based histogram aggregates
#[derive(Debug, Clone)]
pub struct HistogramAggregates {
    table: TableRef,
    options: QueryOptions,
}

impl HistogramAggregates {
    pub fn new(table: TableRef, options: QueryOptions) -> Self {
        Self { table, options }
    }

    pub fn default_table() -> TableRef {
        TableRef::new("moz-fx-data-shar-nonprod-efed", "telemetry_live.main_v4")
    }

    fn histogram_slots(&self, probes: &ProbeSet) -> TemplateSlots {
        let fragments: Vec<String> = probes
            .probes(MetricType::Histogram)
            .map(|probe| {
                format!(
                    "({}, 'histogram', '', 'summed-histogram', ARRAY_AGG(payload.histograms.{probe}) OVER w1)",
                    literal(probe)
                )
            })
            .collect();
        let element = struct_type(&[
            ("metric", "STRING"),
            ("metric_type", "STRING"),
            ("key", "STRING"),
            ("agg_type", "STRING"),
            ("value", "ARRAY<STRING>"),
        ]);

        // Every decoder reads the raw value array, so value is replaced last.
        let final_select = format!(
            "SELECT\n  * EXCEPT (_n) REPLACE (\n    ARRAY(\n      SELECT AS STRUCT\n        metric,\n        udf_get_histogram_type(value) AS metric_type,\n        key,\n        agg_type,\n        udf_get_bucket_range(value) AS bucket_range,\n        udf_aggregate_json_sum(value) AS value\n      FROM\n        UNNEST(histogram_aggregates)\n    ) AS histogram_aggregates\n  )\n{FIRST_ROW_FILTER}"
        );

        TemplateSlots {
            reshaping: Vec::new(),
            projection: strings(&[
                "DATE(submission_timestamp) AS submission_date",
                "client_id",
                "normalized_os AS os",
                "SPLIT(application.version, '.')[OFFSET(0)] AS app_version",
                "application.build_id AS app_build_id",
                "normalized_channel AS channel",
            ]),
            aggregates: vec![format!(
                "{} AS histogram_aggregates",
                typed_array(&element, &fragments, 8)
            )],
            // Window clauses cannot see select aliases.
            partition_by: strings(&[
                "client_id",
                "DATE(submission_timestamp)",
                "normalized_os",
                "SPLIT(application.version, '.')[OFFSET(0)]",
                "application.build_id",
                "normalized_channel",
            ]),
            window_order: WINDOW_ORDER.to_string(),
            final_select,
        }
    }

    fn keyed_histogram_slots(&self, probes: &ProbeSet) -> TemplateSlots {
        let entries: Vec<String> = probes
            .probes(MetricType::KeyedHistogram)
            .map(|probe| format!("({}, payload.keyed_histograms.{probe})", literal(probe)))
            .collect();
        let element = struct_type(&[
            ("name", "STRING"),
            ("value", "ARRAY<STRUCT<key STRING, value STRING>>"),
        ]);

        let grouped = format!(
            "SELECT\n  \
             submission_timestamp,\n  \
             DATE(submission_timestamp) AS submission_date,\n  \
             client_id,\n  \
             normalized_os AS os,\n  \
             SPLIT(application.version, '.')[OFFSET(0)] AS app_version,\n  \
             application.build_id AS app_build_id,\n  \
             normalized_channel AS channel,\n  \
             {} AS metrics\n\
             FROM deduplicated",
            typed_array(&element, &entries, 4)
        );
        let flattened = "SELECT\n  \
             submission_timestamp,\n  \
             submission_date,\n  \
             client_id,\n  \
             os,\n  \
             app_version,\n  \
             app_build_id,\n  \
             channel,\n  \
             metrics.name AS metric,\n  \
             kv.key AS key,\n  \
             kv.value AS value\n\
             FROM grouped_metrics\n\
             CROSS JOIN UNNEST(metrics) AS metrics\n\
             CROSS JOIN UNNEST(metrics.value) AS kv";

        let mut partition_by = strings(&[
            "client_id",
            "submission_date",
            "os",
            "app_version",
            "app_build_id",
            "channel",
        ]);
        partition_by.extend(strings(&["metric", "key"]));

        let summary = struct_type(&[
            ("metric", "STRING"),
            ("metric_type", "STRING"),
            ("key", "STRING"),
            ("agg_type", "STRING"),
            ("bucket_range", BUCKET_RANGE_TYPE),
            ("value", SUMMED_VALUE_TYPE),
        ]);
        let aggregate = format!(
            "ARRAY_AGG({summary}(\n    metric,\n    udf_get_histogram_type(value),\n    key,\n    'summed-histogram',\n    udf_get_bucket_range(value),\n    udf_aggregate_json_sum(value)\n  )) AS histogram_aggregates"
        );

        TemplateSlots {
            reshaping: vec![
                Cte::new("grouped_metrics", grouped),
                Cte::new("flattened_metrics", flattened),
            ],
            projection: strings(&[
                "submission_date",
                "client_id",
                "os",
                "app_version",
                "app_build_id",
                "channel",
            ]),
            aggregates: strings(&["metric", "key", "ARRAY_AGG(value) OVER w1 AS value"]),
            partition_by,
            window_order: WINDOW_ORDER.to_string(),
            final_select: grouped_select(&aggregate),
        }
    }
}

impl Generator for HistogramAggregates {
    type AggType = HistogramAggType;

    fn name(&self) -> &'static str {
        "clients_daily_histogram_aggregates"
    }

    fn classify(
        &self,
        schema: &[SchemaField],
        registry: &ProbeRegistry,
        agg_type: HistogramAggType,
    ) -> ProbeSet {
        match find_path(schema, &["payload", agg_type.as_str()]) {
            Some(group) => classify(
                &group.fields,
                registry,
                &ENCODED_HISTOGRAMS,
                agg_type.metric_type(),
            ),
            None => {
                info!(group = %agg_type, "Schema has no payload group; no probes to aggregate");
                ProbeSet::new()
            }
        }
    }

    fn compose(&self, probes: &ProbeSet, agg_type: HistogramAggType) -> TemplateSlots {
        match agg_type {
            HistogramAggType::Histograms => self.histogram_slots(probes),
            HistogramAggType::KeyedHistograms => self.keyed_histogram_slots(probes),
        }
    }

    fn template(&self) -> QueryTemplate {
        QueryTemplate {
            generated_by: self.name().to_string(),
            functions: vec![
                GET_KEYVAL_PAIRS.to_string(),
                STRING_TO_ARR.to_string(),
                GET_BUCKET_RANGE.to_string(),
                get_histogram_type(),
                AGGREGATE_JSON_SUM.to_string(),
            ],
            source: SourceClause {
                table: self.table.sql_name(),
                dedup_partition: strings(&["client_id", "submission_timestamp", "document_id"]),
                arrival_order: ARRIVAL_ORDER.to_string(),
                filters: vec![
                    format!(
                        "DATE(submission_timestamp) = {}",
                        self.options.submission_date.to_sql()
                    ),
                    format!("application.channel IN {}", self.options.channel_list()),
                    "client_id IS NOT NULL".to_string(),
                ],
            },
        }
    }
}
