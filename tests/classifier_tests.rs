//! Classification tests against realistic schema payloads
//!
//! Covers:
//! - Scalar and histogram columns of main_summary_v4
//! - Prefix collisions between parent and content histograms
//! - Missing payload groups in main_v4
//! - Malformed schema and registry payloads

use clients_daily_aggregates::config::QueryOptions;
use clients_daily_aggregates::generators::{
    Generator, HistogramAggType, HistogramAggregates, ScalarAggType, ScalarAggregates,
};
use clients_daily_aggregates::probes::{MetricType, ProbeName, ProbeRegistry};
use clients_daily_aggregates::schema::{
    classify_shape, parse_schema, FieldShape, SchemaField, ShapeFamily,
};
use clients_daily_aggregates::Error;

fn scalar_generator() -> ScalarAggregates {
    ScalarAggregates::new(ScalarAggregates::default_table(), QueryOptions::default())
}

fn histogram_generator() -> HistogramAggregates {
    HistogramAggregates::new(HistogramAggregates::default_table(), QueryOptions::default())
}

/// A trimmed main_summary_v4 schema as printed by `bq show --schema`
const MAIN_SUMMARY_SCHEMA: &str = r#"[
  {"name": "client_id", "type": "STRING", "mode": "NULLABLE"},
  {"name": "scalar_parent_telemetry_test", "type": "INTEGER", "mode": "NULLABLE"},
  {"name": "scalar_parent_browser_engagement_tab_open", "type": "INTEGER"},
  {"name": "scalar_parent_a11y_enabled", "type": "BOOLEAN"},
  {"name": "scalar_parent_unregistered", "type": "INTEGER"},
  {"name": "scalar_parent_label", "type": "STRING"},
  {"name": "scalar_parent_devtools_tool_opened", "type": "RECORD", "fields": [
    {"name": "key_value", "type": "RECORD", "mode": "REPEATED", "fields": [
      {"name": "key", "type": "STRING"},
      {"name": "value", "type": "INTEGER"}
    ]}
  ]},
  {"name": "scalar_parent_widget_flags", "type": "RECORD", "fields": [
    {"name": "key_value", "type": "RECORD", "mode": "REPEATED", "fields": [
      {"name": "key", "type": "STRING"},
      {"name": "value", "type": "BOOLEAN"}
    ]}
  ]},
  {"name": "histogram_parent_foo", "type": "RECORD", "fields": [
    {"name": "key_value", "type": "RECORD", "mode": "REPEATED", "fields": [
      {"name": "key", "type": "INTEGER"},
      {"name": "value", "type": "INTEGER"}
    ]}
  ]},
  {"name": "histogram_content_foo", "type": "RECORD", "fields": [
    {"name": "key_value", "type": "RECORD", "mode": "REPEATED", "fields": [
      {"name": "key", "type": "INTEGER"},
      {"name": "value", "type": "INTEGER"}
    ]}
  ]},
  {"name": "histogram_content_bar", "type": "RECORD", "fields": [
    {"name": "key_value", "type": "RECORD", "mode": "REPEATED", "fields": [
      {"name": "key", "type": "STRING"},
      {"name": "value", "type": "INTEGER"}
    ]}
  ]},
  {"name": "histogram_parent_search", "type": "RECORD", "fields": [
    {"name": "key_value", "type": "RECORD", "mode": "REPEATED", "fields": [
      {"name": "key", "type": "STRING"},
      {"name": "value", "type": "RECORD", "fields": [
        {"name": "key_value", "type": "RECORD", "mode": "REPEATED", "fields": [
          {"name": "key", "type": "INTEGER"},
          {"name": "value", "type": "INTEGER"}
        ]}
      ]}
    ]}
  ]}
]"#;

const REGISTRY: &str = r#"{
  "scalar/telemetry.test": {"history": {}},
  "scalar/browser.engagement.tab_open": {},
  "scalar/a11y.enabled": {},
  "scalar/devtools.tool.opened": {},
  "scalar/widget.flags": {},
  "scalar/label": {},
  "histogram/foo": {},
  "histogram/bar": {},
  "histogram/SEARCH": {},
  "histogram/GC_MS": {},
  "histogram/SEARCH_COUNTS": {}
}"#;

fn main_summary() -> (Vec<SchemaField>, ProbeRegistry) {
    (
        parse_schema(MAIN_SUMMARY_SCHEMA).unwrap(),
        ProbeRegistry::from_json(REGISTRY).unwrap(),
    )
}

// =========================================================================
// main_summary_v4
// =========================================================================

#[test]
fn test_registered_integer_scalar_is_a_scalar() {
    let (schema, registry) = main_summary();
    let probes = scalar_generator().classify(&schema, &registry, ScalarAggType::Scalar);

    assert!(probes.contains(MetricType::Scalar, "scalar_parent_telemetry_test"));
    assert!(probes.contains(MetricType::Scalar, "scalar_parent_browser_engagement_tab_open"));
    assert!(probes.contains(MetricType::Boolean, "scalar_parent_a11y_enabled"));
    assert!(
        !probes.contains(MetricType::Scalar, "scalar_parent_unregistered"),
        "Unregistered columns must not be classified"
    );
    assert!(
        !probes.contains(MetricType::Scalar, "scalar_parent_label"),
        "STRING columns are not scalars even when registered"
    );
    assert_eq!(probes.len(), 3);
}

#[test]
fn test_keyed_scalars_require_integer_values() {
    let (schema, registry) = main_summary();
    let probes = scalar_generator().classify(&schema, &registry, ScalarAggType::KeyedScalar);

    assert_eq!(
        probes.probes(MetricType::KeyedScalar).collect::<Vec<_>>(),
        vec!["scalar_parent_devtools_tool_opened"]
    );
}

#[test]
fn test_histogram_shapes_select_their_variant() {
    let (schema, registry) = main_summary();
    let generator = scalar_generator();

    let plain = generator.classify(&schema, &registry, ScalarAggType::Histogram);
    assert_eq!(
        plain.probes(MetricType::Histogram).collect::<Vec<_>>(),
        vec!["histogram_parent_foo"]
    );

    let string = generator.classify(&schema, &registry, ScalarAggType::StringHistogram);
    assert_eq!(
        string.probes(MetricType::StringHistogram).collect::<Vec<_>>(),
        vec!["histogram_content_bar"]
    );

    let keyed = generator.classify(&schema, &registry, ScalarAggType::KeyedHistogram);
    assert_eq!(
        keyed.probes(MetricType::KeyedHistogram).collect::<Vec<_>>(),
        vec!["histogram_parent_search"]
    );
}

#[test]
fn test_parent_prefix_wins_name_collisions() {
    let (schema, registry) = main_summary();
    let probes = scalar_generator().classify(&schema, &registry, ScalarAggType::Histogram);

    assert!(probes.contains(MetricType::Histogram, "histogram_parent_foo"));
    assert!(!probes.contains(MetricType::Histogram, "histogram_content_foo"));

    let collisions = probes.collisions();
    assert_eq!(collisions.len(), 1);
    assert_eq!(collisions[0].probe.as_str(), "foo");
    assert_eq!(collisions[0].kept, "histogram_parent_foo");
    assert_eq!(collisions[0].dropped, "histogram_content_foo");
}

#[test]
fn test_collision_policy_ignores_schema_order() {
    let (mut schema, registry) = main_summary();
    schema.reverse();
    let probes = scalar_generator().classify(&schema, &registry, ScalarAggType::Histogram);

    assert!(probes.contains(MetricType::Histogram, "histogram_parent_foo"));
    assert_eq!(probes.collisions()[0].dropped, "histogram_content_foo");
}

#[test]
fn test_non_identifier_columns_are_skipped() {
    let schema = parse_schema(
        r#"[
          {"name": "scalar_parent_a-b", "type": "INTEGER", "mode": "NULLABLE"},
          {"name": "scalar_parent_telemetry_test", "type": "INTEGER", "mode": "NULLABLE"}
        ]"#,
    )
    .unwrap();
    let registry =
        ProbeRegistry::from_json(r#"{"scalar/a-b": {}, "scalar/telemetry.test": {}}"#).unwrap();

    let probes = scalar_generator().classify(&schema, &registry, ScalarAggType::Scalar);
    assert_eq!(
        probes.probes(MetricType::Scalar).collect::<Vec<_>>(),
        vec!["scalar_parent_telemetry_test"]
    );
    assert!(!probes.contains(MetricType::Scalar, "scalar_parent_a-b"));
}

#[test]
fn test_classified_columns_match_shape_and_registry() {
    let (schema, registry) = main_summary();
    let generator = scalar_generator();
    let scalars = ("scalar/", ShapeFamily::Scalar, &["scalar_parent_"][..]);
    let histograms = (
        "histogram/",
        ShapeFamily::Histogram,
        &["histogram_parent_", "histogram_content_"][..],
    );
    let agg_types = [
        (ScalarAggType::Scalar, scalars),
        (ScalarAggType::KeyedScalar, scalars),
        (ScalarAggType::Histogram, histograms),
        (ScalarAggType::StringHistogram, histograms),
        (ScalarAggType::KeyedHistogram, histograms),
    ];

    for (agg_type, (registry_prefix, family, prefixes)) in agg_types {
        let probes = generator.classify(&schema, &registry, agg_type);
        let known = registry.probe_names(registry_prefix);
        for &metric_type in agg_type.metric_types() {
            for column in probes.probes(metric_type) {
                let field = schema.iter().find(|f| f.name == column).unwrap();
                assert_eq!(
                    classify_shape(family, field).metric_type(),
                    Some(metric_type),
                    "{column} classified as {metric_type} without the shape"
                );
                let (name, _) = ProbeName::from_column(column, prefixes);
                assert!(known.contains(&name), "{column} classified without a registry entry");
            }
        }
    }

    let keyed_boolean = schema
        .iter()
        .find(|f| f.name == "scalar_parent_widget_flags")
        .unwrap();
    assert!(matches!(
        classify_shape(ShapeFamily::Scalar, keyed_boolean),
        FieldShape::KeyedScalar(_)
    ));
}

// =========================================================================
// main_v4
// =========================================================================

#[test]
fn test_payload_histograms_are_classified() {
    let schema = parse_schema(
        r#"{"fields": [
          {"name": "payload", "type": "RECORD", "fields": [
            {"name": "histograms", "type": "RECORD", "fields": [
              {"name": "gc_ms", "type": "STRING"},
              {"name": "not_registered", "type": "STRING"}
            ]},
            {"name": "keyed_histograms", "type": "RECORD", "fields": [
              {"name": "search_counts", "type": "RECORD", "mode": "REPEATED", "fields": [
                {"name": "key", "type": "STRING"},
                {"name": "value", "type": "STRING"}
              ]}
            ]}
          ]}
        ]}"#,
    )
    .unwrap();
    let registry = ProbeRegistry::from_json(REGISTRY).unwrap();
    let generator = histogram_generator();

    let plain = generator.classify(&schema, &registry, HistogramAggType::Histograms);
    assert_eq!(plain.probes(MetricType::Histogram).collect::<Vec<_>>(), vec!["gc_ms"]);

    let keyed = generator.classify(&schema, &registry, HistogramAggType::KeyedHistograms);
    assert_eq!(
        keyed.probes(MetricType::KeyedHistogram).collect::<Vec<_>>(),
        vec!["search_counts"]
    );
}

#[test]
fn test_missing_payload_yields_empty_set() {
    let registry = ProbeRegistry::from_json(REGISTRY).unwrap();
    let generator = histogram_generator();

    let no_payload = parse_schema(r#"[{"name": "client_id", "type": "STRING"}]"#).unwrap();
    assert!(generator
        .classify(&no_payload, &registry, HistogramAggType::Histograms)
        .is_empty());

    let no_group = parse_schema(
        r#"[{"name": "payload", "type": "RECORD", "fields": [
          {"name": "info", "type": "STRING"}
        ]}]"#,
    )
    .unwrap();
    assert!(generator
        .classify(&no_group, &registry, HistogramAggType::KeyedHistograms)
        .is_empty());
}

// =========================================================================
// Malformed payloads
// =========================================================================

#[test]
fn test_malformed_schema_is_an_error() {
    let missing_type = parse_schema(r#"[{"name": "client_id"}]"#).unwrap_err();
    assert!(matches!(missing_type, Error::MalformedSchema(_)));
    assert!(!missing_type.is_fetch_failure());

    let wrong_root = parse_schema(r#""client_id""#).unwrap_err();
    assert!(matches!(wrong_root, Error::MalformedSchema(_)));

    let childless_record =
        parse_schema(r#"[{"name": "histogram_parent_foo", "type": "RECORD"}]"#).unwrap_err();
    assert!(matches!(childless_record, Error::MalformedSchema(_)));
    assert!(childless_record.to_string().contains("has no `fields`"));
}

#[test]
fn test_malformed_registry_is_an_error() {
    let err = ProbeRegistry::from_json(r#"["scalar/telemetry.test"]"#).unwrap_err();
    assert!(matches!(err, Error::MalformedRegistry(_)));
}
