//! `clients_daily_scalar_aggregates`
//!
//! Aggregates the flat `main_summary_v4` table, where scalars are plain
//! `scalar_parent_*` columns and histograms are `histogram_*` records that
//! have already been decoded into key/value buckets.

use super::{grouped_select, strings, Generator, FIRST_ROW_FILTER};
use crate::config::{QueryOptions, TableRef};
use crate::probes::{classify, MetricType, NamingConvention, ProbeRegistry, ProbeSet};
use crate::schema::{SchemaField, ShapeFamily};
use crate::sql::fragments::{literal, struct_type, typed_array};
use crate::sql::udf::{AGGREGATE_KEYED_MAP_SUM, AGGREGATE_MAP_SUM};
use crate::sql::{Cte, QueryTemplate, SourceClause, TemplateSlots};
use clap::ValueEnum;
use std::fmt;

const SCALAR_COLUMNS: NamingConvention = NamingConvention {
    column_prefix: "scalar_parent",
    strip_prefixes: &["scalar_parent_"],
    registry_prefix: "scalar/",
    family: ShapeFamily::Scalar,
};

const HISTOGRAM_COLUMNS: NamingConvention = NamingConvention {
    column_prefix: "histogram",
    strip_prefixes: &["histogram_parent_", "histogram_content_"],
    registry_prefix: "histogram/",
    family: ShapeFamily::Histogram,
};

/// Bucket metadata attached to every scalar aggregate: (min, max, count)
const SCALAR_BUCKETS: (u32, u32, u32) = (0, 1000, 50);

/// Bucket metadata attached to every boolean aggregate
const BOOLEAN_BUCKETS: (u32, u32, u32) = (0, 2, 2);

const ARRIVAL_ORDER: &str = "`timestamp`";

/// Columns carried through keyed flattening
const KEYED_PASSTHROUGH: [&str; 7] = [
    "`timestamp`",
    "client_id",
    "submission_date_s3",
    "os",
    "app_version",
    "app_build_id",
    "channel",
];

/// Aggregation types accepted by `clients_daily_scalar_aggregates`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ScalarAggType {
    /// Integer and boolean scalars
    Scalar,
    /// Keyed integer scalars
    KeyedScalar,
    /// Integer-keyed histograms
    Histogram,
    /// String-keyed histograms
    StringHistogram,
    /// Keyed histograms
    KeyedHistogram,
}

impl ScalarAggType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScalarAggType::Scalar => "scalar",
            ScalarAggType::KeyedScalar => "keyed-scalar",
            ScalarAggType::Histogram => "histogram",
            ScalarAggType::StringHistogram => "string-histogram",
            ScalarAggType::KeyedHistogram => "keyed-histogram",
        }
    }

    /// Probe buckets classified for this aggregation type
    pub fn metric_types(&self) -> &'static [MetricType] {
        match self {
            ScalarAggType::Scalar => &[MetricType::Scalar, MetricType::Boolean],
            ScalarAggType::KeyedScalar => &[MetricType::KeyedScalar],
            ScalarAggType::Histogram => &[MetricType::Histogram],
            ScalarAggType::StringHistogram => &[MetricType::StringHistogram],
            ScalarAggType::KeyedHistogram => &[MetricType::KeyedHistogram],
        }
    }
}

impl fmt::Display for ScalarAggType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Windowed aggregates computed for every integer scalar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScalarAggregation {
    Max,
    Avg,
    Min,
    Sum,
}

impl ScalarAggregation {
    const ALL: [ScalarAggregation; 4] = [
        ScalarAggregation::Max,
        ScalarAggregation::Avg,
        ScalarAggregation::Min,
        ScalarAggregation::Sum,
    ];

    fn label(&self) -> &'static str {
        match self {
            ScalarAggregation::Max => "max",
            ScalarAggregation::Avg => "avg",
            ScalarAggregation::Min => "min",
            ScalarAggregation::Sum => "sum",
        }
    }

    fn function(&self) -> &'static str {
        match self {
            ScalarAggregation::Max => "MAX",
            ScalarAggregation::Avg => "AVG",
            ScalarAggregation::Min => "MIN",
            ScalarAggregation::Sum => "SUM",
        }
    }
}

/// Generator for the `main_summary_v4` based scalar aggregates
#[derive(Debug, Clone)]
pub struct ScalarAggregates {
    table: TableRef,
    options: QueryOptions,
}

impl ScalarAggregates {
    pub fn new(table: TableRef, options: QueryOptions) -> Self {
        Self { table, options }
    }

    pub fn default_table() -> TableRef {
        TableRef::new("moz-fx-data-derived-datasets", "telemetry.main_summary_v4")
    }

    fn projection() -> Vec<String> {
        strings(&[
            "submission_date_s3 AS submission_date",
            "client_id",
            "os",
            "SPLIT(app_version, '.')[OFFSET(0)] AS app_version",
            "app_build_id",
            "channel",
        ])
    }

    fn partition() -> Vec<String> {
        strings(&[
            "client_id",
            "submission_date_s3",
            "os",
            "app_version",
            "app_build_id",
            "channel",
        ])
    }

    fn scalar_slots(&self, probes: &ProbeSet) -> TemplateSlots {
        let mut fragments = Vec::new();
        let (min, max, count) = SCALAR_BUCKETS;
        for probe in probes.probes(MetricType::Scalar) {
            for aggregation in ScalarAggregation::ALL {
                fragments.push(format!(
                    "({}, '{}', {}(CAST({probe} AS INT64)) OVER w1, {min}, {max}, {count})",
                    literal(probe),
                    aggregation.label(),
                    aggregation.function(),
                ));
            }
        }

        let (min, max, count) = BOOLEAN_BUCKETS;
        for probe in probes.probes(MetricType::Boolean) {
            for (label, value) in [("false", "FALSE"), ("true", "TRUE")] {
                fragments.push(format!(
                    "({}, '{label}', SUM(CASE WHEN {probe} = {value} THEN 1 ELSE 0 END) OVER w1, {min}, {max}, {count})",
                    literal(probe),
                ));
            }
        }

        let element = struct_type(&[
            ("metric", "STRING"),
            ("agg_type", "STRING"),
            ("value", "FLOAT64"),
            ("min_bucket", "INT64"),
            ("max_bucket", "INT64"),
            ("num_buckets", "INT64"),
        ]);

        TemplateSlots {
            reshaping: Vec::new(),
            projection: Self::projection(),
            aggregates: vec![format!(
                "{} AS scalar_aggregates",
                typed_array(&element, &fragments, 8)
            )],
            partition_by: Self::partition(),
            window_order: ARRIVAL_ORDER.to_string(),
            final_select: format!("SELECT\n  * EXCEPT (_n)\n{FIRST_ROW_FILTER}"),
        }
    }

    fn keyed_scalar_slots(&self, probes: &ProbeSet) -> TemplateSlots {
        let entries: Vec<String> = probes
            .probes(MetricType::KeyedScalar)
            .map(|probe| format!("({}, {probe})", literal(probe)))
            .collect();
        let element = struct_type(&[
            ("name", "STRING"),
            (
                "value",
                "STRUCT<key_value ARRAY<STRUCT<key STRING, value INT64>>>",
            ),
        ]);

        let passthrough = KEYED_PASSTHROUGH.join(",\n  ");
        let grouped = format!(
            "SELECT\n  {passthrough},\n  {} AS metrics\nFROM deduplicated",
            typed_array(&element, &entries, 4)
        );
        let flattened = format!(
            "SELECT\n  {passthrough},\n  metrics.name AS metric,\n  kv.key AS key,\n  kv.value AS value\n\
             FROM grouped_metrics\n\
             CROSS JOIN UNNEST(metrics) AS metrics\n\
             CROSS JOIN UNNEST(metrics.value.key_value) AS kv"
        );

        let mut aggregates = strings(&["metric", "key"]);
        for aggregation in ScalarAggregation::ALL {
            aggregates.push(format!(
                "{}(value) OVER w1 AS {}",
                aggregation.function(),
                aggregation.label()
            ));
        }

        let mut partition_by = Self::partition();
        partition_by.extend(strings(&["metric", "key"]));

        let rows = ScalarAggregation::ALL
            .iter()
            .map(|aggregation| {
                format!(
                    "(metric, key, '{}', {})",
                    aggregation.label(),
                    aggregation.label()
                )
            })
            .collect::<Vec<_>>()
            .join(",\n    ");

        TemplateSlots {
            reshaping: vec![
                Cte::new("grouped_metrics", grouped),
                Cte::new("flattened_metrics", flattened),
            ],
            projection: Self::projection(),
            aggregates,
            partition_by,
            window_order: ARRIVAL_ORDER.to_string(),
            final_select: grouped_select(&format!(
                "ARRAY_CONCAT_AGG([\n    {rows}\n  ]) AS scalar_aggregates"
            )),
        }
    }

    fn histogram_slots(&self, probes: &ProbeSet, metric_type: MetricType) -> TemplateSlots {
        let fragments: Vec<String> = probes
            .probes(metric_type)
            .map(|probe| {
                format!(
                    "({}, 'summed-histogram', ARRAY_AGG({probe}) OVER w1)",
                    literal(probe)
                )
            })
            .collect();

        let (value_type, sum_function) = match metric_type {
            MetricType::StringHistogram => (
                "ARRAY<STRUCT<key_value ARRAY<STRUCT<key STRING, value INT64>>>>",
                "udf_aggregate_map_sum",
            ),
            MetricType::KeyedHistogram => (
                "ARRAY<STRUCT<key_value ARRAY<STRUCT<key STRING, \
                 value STRUCT<key_value ARRAY<STRUCT<key INT64, value INT64>>>>>>>",
                "udf_aggregate_keyed_map_sum",
            ),
            _ => (
                "ARRAY<STRUCT<key_value ARRAY<STRUCT<key INT64, value INT64>>>>",
                "udf_aggregate_map_sum",
            ),
        };
        let element = struct_type(&[
            ("metric", "STRING"),
            ("agg_type", "STRING"),
            ("value", value_type),
        ]);

        let final_select = format!(
            "SELECT\n  * EXCEPT (_n) REPLACE (\n    ARRAY(\n      SELECT AS STRUCT\n        * REPLACE (\n          CASE\n            WHEN agg_type = 'summed-histogram' THEN {sum_function}(value)\n            ELSE ERROR(CONCAT('Unhandled agg_type: ', agg_type))\n          END AS value\n        )\n      FROM\n        UNNEST(histogram_aggregates)\n    ) AS histogram_aggregates\n  )\n{FIRST_ROW_FILTER}"
        );

        TemplateSlots {
            reshaping: Vec::new(),
            projection: Self::projection(),
            aggregates: vec![format!(
                "{} AS histogram_aggregates",
                typed_array(&element, &fragments, 8)
            )],
            partition_by: Self::partition(),
            window_order: ARRIVAL_ORDER.to_string(),
            final_select,
        }
    }
}

impl Generator for ScalarAggregates {
    type AggType = ScalarAggType;

    fn name(&self) -> &'static str {
        "clients_daily_scalar_aggregates"
    }

    fn classify(
        &self,
        schema: &[SchemaField],
        registry: &ProbeRegistry,
        agg_type: ScalarAggType,
    ) -> ProbeSet {
        let mut probes = ProbeSet::new();
        for &metric_type in agg_type.metric_types() {
            let convention = match metric_type {
                MetricType::Scalar | MetricType::Boolean | MetricType::KeyedScalar => {
                    &SCALAR_COLUMNS
                }
                _ => &HISTOGRAM_COLUMNS,
            };
            probes.merge(classify(schema, registry, convention, metric_type));
        }
        probes
    }

    fn compose(&self, probes: &ProbeSet, agg_type: ScalarAggType) -> TemplateSlots {
        match agg_type {
            ScalarAggType::Scalar => self.scalar_slots(probes),
            ScalarAggType::KeyedScalar => self.keyed_scalar_slots(probes),
            ScalarAggType::Histogram => self.histogram_slots(probes, MetricType::Histogram),
            ScalarAggType::StringHistogram => {
                self.histogram_slots(probes, MetricType::StringHistogram)
            }
            ScalarAggType::KeyedHistogram => {
                self.histogram_slots(probes, MetricType::KeyedHistogram)
            }
        }
    }

    fn template(&self) -> QueryTemplate {
        QueryTemplate {
            generated_by: self.name().to_string(),
            functions: vec![
                AGGREGATE_MAP_SUM.to_string(),
                AGGREGATE_KEYED_MAP_SUM.to_string(),
            ],
            source: SourceClause {
                table: self.table.sql_name(),
                dedup_partition: strings(&["client_id", "submission_date_s3", "document_id"]),
                arrival_order: ARRIVAL_ORDER.to_string(),
                filters: vec![
                    format!(
                        "submission_date_s3 = {}",
                        self.options.submission_date.to_sql()
                    ),
                    format!("channel IN {}", self.options.channel_list()),
                    "client_id IS NOT NULL".to_string(),
                ],
            },
        }
    }
}
