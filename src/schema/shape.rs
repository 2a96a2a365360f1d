//! Structural classification of schema fields
//!
//! A field's metric type is decided by its nested shape alone. Keyed
//! scalars and string histograms share the same shape in the flat table,
//! so the caller picks the [`ShapeFamily`] from the field's naming
//! convention first.

use super::{FieldType, SchemaField};
use crate::probes::MetricType;

/// Which set of shape rules applies to a candidate field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeFamily {
    /// `scalar_*` columns of the flat summary table
    Scalar,
    /// `histogram_*` columns of the flat summary table, decoded into key/value records
    Histogram,
    /// Members of `payload.histograms` / `payload.keyed_histograms` in the
    /// ping table, where each histogram is a JSON string
    EncodedHistogram,
}

/// Value type of a keyed scalar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyedValue {
    Integer,
    Boolean,
}

/// Result of inspecting a field's shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldShape {
    NoMatch,
    PlainScalar,
    BooleanScalar,
    KeyedScalar(KeyedValue),
    PlainHistogram,
    StringHistogram,
    KeyedHistogram,
}

impl FieldShape {
    /// Bucket a field of this shape is aggregated under.
    ///
    /// Boolean-valued keyed scalars are recognised but have no bucket: the
    /// keyed aggregation sums values as INT64.
    pub fn metric_type(self) -> Option<MetricType> {
        match self {
            FieldShape::NoMatch => None,
            FieldShape::PlainScalar => Some(MetricType::Scalar),
            FieldShape::BooleanScalar => Some(MetricType::Boolean),
            FieldShape::KeyedScalar(KeyedValue::Integer) => Some(MetricType::KeyedScalar),
            FieldShape::KeyedScalar(KeyedValue::Boolean) => None,
            FieldShape::PlainHistogram => Some(MetricType::Histogram),
            FieldShape::StringHistogram => Some(MetricType::StringHistogram),
            FieldShape::KeyedHistogram => Some(MetricType::KeyedHistogram),
        }
    }
}

/// Classify a field under the rules of `family`.
pub fn classify_shape(family: ShapeFamily, field: &SchemaField) -> FieldShape {
    match family {
        ShapeFamily::Scalar => scalar_shape(field),
        ShapeFamily::Histogram => histogram_shape(field),
        ShapeFamily::EncodedHistogram => encoded_histogram_shape(field),
    }
}

fn scalar_shape(field: &SchemaField) -> FieldShape {
    match field.field_type {
        FieldType::Integer => FieldShape::PlainScalar,
        FieldType::Boolean => FieldShape::BooleanScalar,
        FieldType::Record => match entry_types(field) {
            Some((FieldType::String, FieldType::Integer)) => {
                FieldShape::KeyedScalar(KeyedValue::Integer)
            }
            Some((FieldType::String, FieldType::Boolean)) => {
                FieldShape::KeyedScalar(KeyedValue::Boolean)
            }
            _ => FieldShape::NoMatch,
        },
        _ => FieldShape::NoMatch,
    }
}

fn histogram_shape(field: &SchemaField) -> FieldShape {
    let Some(entries) = field.only_child() else {
        return FieldShape::NoMatch;
    };
    let Some((key, value)) = entries.key_value_pair() else {
        return FieldShape::NoMatch;
    };

    match (&key.field_type, &value.field_type) {
        (FieldType::Integer, FieldType::Integer) => FieldShape::PlainHistogram,
        (FieldType::String, FieldType::Integer) => FieldShape::StringHistogram,
        (FieldType::String, FieldType::Record) => match entry_types(value) {
            Some((FieldType::Integer, FieldType::Integer)) => FieldShape::KeyedHistogram,
            _ => FieldShape::NoMatch,
        },
        _ => FieldShape::NoMatch,
    }
}

fn encoded_histogram_shape(field: &SchemaField) -> FieldShape {
    match field.field_type {
        FieldType::String => FieldShape::PlainHistogram,
        FieldType::Record => match field.key_value_pair() {
            Some((key, value))
                if key.field_type == FieldType::String
                    && value.field_type == FieldType::String =>
            {
                FieldShape::KeyedHistogram
            }
            _ => FieldShape::NoMatch,
        },
        _ => FieldShape::NoMatch,
    }
}

/// Key and value types of a RECORD wrapping a single key/value record,
/// i.e. `RECORD<key_value RECORD<key K, value V>>`.
fn entry_types(field: &SchemaField) -> Option<(&FieldType, &FieldType)> {
    let (key, value) = field.only_child()?.key_value_pair()?;
    Some((&key.field_type, &value.field_type))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(name: &str, key: FieldType, value: SchemaField) -> SchemaField {
        SchemaField::record(
            name,
            vec![SchemaField::record(
                "key_value",
                vec![SchemaField::new("key", key), value],
            )
            .with_mode("REPEATED")],
        )
    }

    fn int_histogram(name: &str) -> SchemaField {
        entries(name, FieldType::Integer, SchemaField::new("value", FieldType::Integer))
    }

    #[test]
    fn scalar_family_shapes() {
        let int = SchemaField::new("scalar_parent_a", FieldType::Integer);
        let boolean = SchemaField::new("scalar_parent_b", FieldType::Boolean);
        let keyed = entries(
            "scalar_parent_c",
            FieldType::String,
            SchemaField::new("value", FieldType::Integer),
        );
        let keyed_bool = entries(
            "scalar_parent_d",
            FieldType::String,
            SchemaField::new("value", FieldType::Boolean),
        );
        let text = SchemaField::new("scalar_parent_e", FieldType::String);

        assert_eq!(classify_shape(ShapeFamily::Scalar, &int), FieldShape::PlainScalar);
        assert_eq!(classify_shape(ShapeFamily::Scalar, &boolean), FieldShape::BooleanScalar);
        assert_eq!(
            classify_shape(ShapeFamily::Scalar, &keyed),
            FieldShape::KeyedScalar(KeyedValue::Integer)
        );
        assert_eq!(
            classify_shape(ShapeFamily::Scalar, &keyed_bool),
            FieldShape::KeyedScalar(KeyedValue::Boolean)
        );
        assert_eq!(classify_shape(ShapeFamily::Scalar, &text), FieldShape::NoMatch);
    }

    #[test]
    fn histogram_family_shapes() {
        let plain = int_histogram("histogram_parent_gc_ms");
        let string = entries(
            "histogram_parent_labels",
            FieldType::String,
            SchemaField::new("value", FieldType::Integer),
        );
        let keyed = entries(
            "histogram_parent_keyed",
            FieldType::String,
            int_histogram("value"),
        );

        assert_eq!(classify_shape(ShapeFamily::Histogram, &plain), FieldShape::PlainHistogram);
        assert_eq!(classify_shape(ShapeFamily::Histogram, &string), FieldShape::StringHistogram);
        assert_eq!(classify_shape(ShapeFamily::Histogram, &keyed), FieldShape::KeyedHistogram);
    }

    #[test]
    fn malformed_histogram_records_do_not_match() {
        let three_children = SchemaField::record(
            "histogram_parent_x",
            vec![SchemaField::record(
                "key_value",
                vec![
                    SchemaField::new("key", FieldType::Integer),
                    SchemaField::new("value", FieldType::Integer),
                    SchemaField::new("extra", FieldType::Integer),
                ],
            )],
        );
        let empty = SchemaField::record("histogram_parent_y", vec![]);
        let leaf = SchemaField::new("histogram_parent_z", FieldType::Integer);
        let keyed_with_string_buckets = entries(
            "histogram_parent_w",
            FieldType::String,
            entries("value", FieldType::String, SchemaField::new("value", FieldType::Integer)),
        );

        for field in [&three_children, &empty, &leaf, &keyed_with_string_buckets] {
            assert_eq!(
                classify_shape(ShapeFamily::Histogram, field),
                FieldShape::NoMatch,
                "{}",
                field.name
            );
        }
    }

    #[test]
    fn encoded_histogram_shapes() {
        let plain = SchemaField::new("gc_ms", FieldType::String);
        let keyed = SchemaField::record(
            "js_telemetry",
            vec![
                SchemaField::new("key", FieldType::String),
                SchemaField::new("value", FieldType::String),
            ],
        )
        .with_mode("REPEATED");
        let number = SchemaField::new("count", FieldType::Integer);

        assert_eq!(
            classify_shape(ShapeFamily::EncodedHistogram, &plain),
            FieldShape::PlainHistogram
        );
        assert_eq!(
            classify_shape(ShapeFamily::EncodedHistogram, &keyed),
            FieldShape::KeyedHistogram
        );
        assert_eq!(classify_shape(ShapeFamily::EncodedHistogram, &number), FieldShape::NoMatch);
    }

    #[test]
    fn shapes_map_to_metric_types() {
        assert_eq!(FieldShape::PlainScalar.metric_type(), Some(MetricType::Scalar));
        assert_eq!(FieldShape::BooleanScalar.metric_type(), Some(MetricType::Boolean));
        assert_eq!(
            FieldShape::KeyedScalar(KeyedValue::Integer).metric_type(),
            Some(MetricType::KeyedScalar)
        );
        assert_eq!(FieldShape::KeyedScalar(KeyedValue::Boolean).metric_type(), None);
        assert_eq!(FieldShape::NoMatch.metric_type(), None);
    }
}
