//! Temporary function definitions shared by every probe of a query
//!
//! Per-probe fragments only collect raw values; decoding and summing
//! happen once, in these functions, after windowing.

use std::fmt;

/// Sums decoded histograms (`STRUCT<key_value ARRAY<STRUCT<key, value>>>`)
/// bucket by bucket.
pub const AGGREGATE_MAP_SUM: &str = r#"CREATE TEMP FUNCTION
  udf_aggregate_map_sum(maps ANY TYPE) AS (STRUCT(ARRAY(
    SELECT AS STRUCT
      key,
      SUM(value) AS value
    FROM
      UNNEST(maps),
      UNNEST(key_value)
    GROUP BY
      key
  ) AS key_value));"#;

/// Keyed variant of [`AGGREGATE_MAP_SUM`]: groups by the outer key and sums
/// each inner histogram.
pub const AGGREGATE_KEYED_MAP_SUM: &str = r#"CREATE TEMP FUNCTION
  udf_aggregate_keyed_map_sum(maps ANY TYPE) AS (STRUCT(ARRAY(
    SELECT AS STRUCT
      key,
      udf_aggregate_map_sum(ARRAY_AGG(value)) AS value
    FROM
      UNNEST(maps),
      UNNEST(key_value)
    GROUP BY
      key
  ) AS key_value));"#;

/// Splits a JSON object into `"key:value"` strings.
pub const GET_KEYVAL_PAIRS: &str = r#"CREATE TEMPORARY FUNCTION get_keyval_pairs(y STRING)
RETURNS ARRAY<STRING>
LANGUAGE js AS
'''
  var z = new Array();
  var node = JSON.parse(y);
  Object.keys(node).map(function(key) {
    var value = node[key].toString();
    z.push(key + ":" + value);
  });
  return z;
''';"#;

/// Converts a string like `'[5, 6, 7]'` to an array.
pub const STRING_TO_ARR: &str = r#"CREATE TEMPORARY FUNCTION string_to_arr(y STRING)
RETURNS ARRAY<STRING>
LANGUAGE js AS
'''
  return JSON.parse(y);
''';"#;

/// Bucket range metadata taken from the first non-null histogram.
pub const GET_BUCKET_RANGE: &str = r#"CREATE TEMP FUNCTION udf_get_bucket_range(histograms ARRAY<STRING>) AS ((
  WITH buckets AS (
    SELECT
      string_to_arr(JSON_EXTRACT(histogram, "$.range")) AS bucket_range,
      CAST(JSON_EXTRACT(histogram, "$.bucket_count") AS INT64) AS num_buckets
    FROM UNNEST(histograms) AS histogram
    WHERE histogram IS NOT NULL
    LIMIT 1
  )

  SELECT AS STRUCT
    CAST(bucket_range[OFFSET(0)] AS INT64) AS first_bucket,
    CAST(bucket_range[OFFSET(1)] AS INT64) AS last_bucket,
    num_buckets
  FROM
    buckets));"#;

/// Sums the `values` maps of JSON-encoded histograms per bucket.
pub const AGGREGATE_JSON_SUM: &str = r#"CREATE TEMP FUNCTION
  udf_aggregate_json_sum(histograms ARRAY<STRING>) AS (ARRAY(
    SELECT AS STRUCT
      SPLIT(keyval, ':')[OFFSET(0)] AS key,
      SUM(CAST(SPLIT(keyval, ':')[OFFSET(1)] AS INT64)) AS value
    FROM
      UNNEST(histograms) AS histogram,
      UNNEST(get_keyval_pairs(JSON_EXTRACT(histogram, "$.values"))) AS keyval
    WHERE histogram IS NOT NULL
    GROUP BY key));"#;

/// Histogram kinds, indexed by the `histogram_type` code in the ping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistogramKind {
    Exponential,
    Linear,
    Boolean,
    Flag,
    Count,
    Categorical,
}

impl HistogramKind {
    pub const ALL: [HistogramKind; 6] = [
        HistogramKind::Exponential,
        HistogramKind::Linear,
        HistogramKind::Boolean,
        HistogramKind::Flag,
        HistogramKind::Count,
        HistogramKind::Categorical,
    ];

    /// Numeric `histogram_type` code
    pub fn code(&self) -> u8 {
        match self {
            HistogramKind::Exponential => 0,
            HistogramKind::Linear => 1,
            HistogramKind::Boolean => 2,
            HistogramKind::Flag => 3,
            HistogramKind::Count => 4,
            HistogramKind::Categorical => 5,
        }
    }

    /// Metric type label written into the output rows
    pub fn as_str(&self) -> &'static str {
        match self {
            HistogramKind::Exponential => "histogram-exponential",
            HistogramKind::Linear => "histogram-linear",
            HistogramKind::Boolean => "histogram-boolean",
            HistogramKind::Flag => "histogram-flag",
            HistogramKind::Count => "histogram-count",
            HistogramKind::Categorical => "histogram-categorical",
        }
    }
}

impl fmt::Display for HistogramKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `udf_get_histogram_type`, mapping type codes to [`HistogramKind`] labels.
pub fn get_histogram_type() -> String {
    let arms = HistogramKind::ALL
        .iter()
        .map(|kind| format!("        WHEN {} THEN '{}'", kind.code(), kind))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"CREATE TEMP FUNCTION udf_get_histogram_type(histograms ARRAY<STRING>) AS ((
    SELECT
      CASE CAST(JSON_EXTRACT(histogram, "$.histogram_type") AS INT64)
{arms}
      END AS histogram_type
    FROM UNNEST(histograms) AS histogram
    WHERE histogram IS NOT NULL
    LIMIT 1
));"#
    )
}
