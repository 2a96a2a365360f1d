//! Probe names, the probe registry, and classification of schema fields
//! into per-metric-type probe sets.

mod classifier;
mod registry;

pub use classifier::{classify, NameCollision, NamingConvention, ProbeSet};
pub use registry::ProbeRegistry;

use std::fmt;

/// Metric types the generators aggregate
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetricType {
    Scalar,
    Boolean,
    KeyedScalar,
    Histogram,
    StringHistogram,
    KeyedHistogram,
}

impl MetricType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::Scalar => "scalar",
            MetricType::Boolean => "boolean",
            MetricType::KeyedScalar => "keyed-scalar",
            MetricType::Histogram => "histogram",
            MetricType::StringHistogram => "string-histogram",
            MetricType::KeyedHistogram => "keyed-histogram",
        }
    }

    /// Keyed metrics are flattened to one row per key before windowing.
    pub fn is_keyed(&self) -> bool {
        matches!(self, MetricType::KeyedScalar | MetricType::KeyedHistogram)
    }
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized probe identifier shared by schema columns and registry entries.
///
/// Normalization strips a known prefix, replaces `.` with `_` and
/// lowercases, so `scalar/telemetry.test` and `scalar_parent_telemetry_test`
/// meet at `telemetry_test`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProbeName(String);

impl ProbeName {
    /// Normalize a raw name after stripping `prefix`, if present.
    pub fn normalize(raw: &str, prefix: &str) -> Self {
        let stripped = raw.strip_prefix(prefix).unwrap_or(raw);
        Self(stripped.replace('.', "_").to_lowercase())
    }

    /// Normalize a schema column name, stripping the first matching prefix.
    ///
    /// Also returns the index of the stripped prefix in `prefixes`, or
    /// `prefixes.len()` when none matched.
    pub fn from_column(column: &str, prefixes: &[&str]) -> (Self, usize) {
        for (rank, prefix) in prefixes.iter().enumerate() {
            if column.starts_with(prefix) {
                return (Self::normalize(column, prefix), rank);
            }
        }
        (Self::normalize(column, ""), prefixes.len())
    }

    /// Normalize a registry key such as `histogram/GC_MS`, or `None` when the
    /// key belongs to another probe kind.
    pub fn from_registry_key(key: &str, kind_prefix: &str) -> Option<Self> {
        key.starts_with(kind_prefix)
            .then(|| Self::normalize(key, kind_prefix))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProbeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
