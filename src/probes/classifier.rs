//! Probe classification
//!
//! Selects the schema columns that both have the shape of a metric type and
//! are listed in the probe registry, and maps them back to their original
//! column names.

use super::{MetricType, ProbeName, ProbeRegistry};
use crate::schema::{classify_shape, SchemaField, ShapeFamily};
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// How one family of schema columns is named and matched against the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamingConvention {
    /// Columns not starting with this prefix are ignored; empty keeps all
    pub column_prefix: &'static str,
    /// Prefixes stripped during normalization, highest precedence first
    pub strip_prefixes: &'static [&'static str],
    /// Registry key prefix for this probe kind
    pub registry_prefix: &'static str,
    /// Shape rules applied to candidate columns
    pub family: ShapeFamily,
}

/// Two columns that normalize to the same probe name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameCollision {
    pub probe: ProbeName,
    /// Column carried forward
    pub kept: String,
    /// Column ignored
    pub dropped: String,
}

/// Classified probes, as original column names bucketed by metric type.
///
/// Buckets are ordered sets so that composition iterates probes in
/// lexicographic order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeSet {
    buckets: BTreeMap<MetricType, BTreeSet<String>>,
    collisions: Vec<NameCollision>,
}

impl ProbeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, metric_type: MetricType, column: impl Into<String>) {
        self.buckets
            .entry(metric_type)
            .or_default()
            .insert(column.into());
    }

    /// Columns of one metric type in lexicographic order
    pub fn probes(&self, metric_type: MetricType) -> impl Iterator<Item = &str> + '_ {
        self.buckets
            .get(&metric_type)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    pub fn count(&self, metric_type: MetricType) -> usize {
        self.buckets.get(&metric_type).map_or(0, BTreeSet::len)
    }

    pub fn contains(&self, metric_type: MetricType, column: &str) -> bool {
        self.buckets
            .get(&metric_type)
            .is_some_and(|bucket| bucket.contains(column))
    }

    /// Total number of columns across all buckets
    pub fn len(&self) -> usize {
        self.buckets.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn collisions(&self) -> &[NameCollision] {
        &self.collisions
    }

    /// Fold another classification result into this one.
    pub fn merge(&mut self, other: ProbeSet) {
        for (metric_type, columns) in other.buckets {
            self.buckets.entry(metric_type).or_default().extend(columns);
        }
        self.collisions.extend(other.collisions);
    }
}

struct Candidate<'a> {
    column: &'a str,
    rank: usize,
}

/// Classify `fields` into the `metric_type` bucket.
///
/// A column is kept when it follows `convention`'s naming, its shape maps to
/// `metric_type`, and its normalized name is a known probe. When several
/// columns normalize to the same name, the one whose stripped prefix comes
/// first in `strip_prefixes` wins (ties break on the column name). The
/// collision is recorded on the result only when the name is a known probe.
pub fn classify(
    fields: &[SchemaField],
    registry: &ProbeRegistry,
    convention: &NamingConvention,
    metric_type: MetricType,
) -> ProbeSet {
    let mut probes = ProbeSet::new();
    let mut candidates: BTreeMap<ProbeName, Candidate<'_>> = BTreeMap::new();
    let mut collisions = Vec::new();

    for field in fields {
        if !field.name.starts_with(convention.column_prefix) {
            continue;
        }
        if classify_shape(convention.family, field).metric_type() != Some(metric_type) {
            continue;
        }
        if !is_plain_identifier(&field.name) {
            warn!(column = %field.name, "Skipping column whose name is not a plain identifier");
            continue;
        }

        let (name, rank) = ProbeName::from_column(&field.name, convention.strip_prefixes);
        let candidate = Candidate {
            column: field.name.as_str(),
            rank,
        };

        match candidates.entry(name) {
            Entry::Vacant(slot) => {
                slot.insert(candidate);
            }
            Entry::Occupied(mut slot) => {
                let current = slot.get();
                if current.column == candidate.column {
                    continue;
                }
                let (kept, dropped) =
                    if (candidate.rank, candidate.column) < (current.rank, current.column) {
                        let previous = slot.insert(candidate);
                        (slot.get().column, previous.column)
                    } else {
                        (current.column, candidate.column)
                    };

                collisions.push(NameCollision {
                    probe: slot.key().clone(),
                    kept: kept.to_string(),
                    dropped: dropped.to_string(),
                });
            }
        }
    }

    let known = registry.probe_names(convention.registry_prefix);
    for collision in collisions {
        if known.contains(&collision.probe) {
            warn!(
                probe = %collision.probe,
                kept = %collision.kept,
                dropped = %collision.dropped,
                "Columns normalize to the same probe name"
            );
            probes.collisions.push(collision);
        } else {
            debug!(
                probe = %collision.probe,
                kept = %collision.kept,
                dropped = %collision.dropped,
                "Ignoring collision on an unregistered name"
            );
        }
    }

    for (name, candidate) in &candidates {
        if known.contains(name) {
            probes.insert(metric_type, candidate.column);
        }
    }

    debug!(
        metric_type = %metric_type,
        candidates = candidates.len(),
        known = known.len(),
        matched = probes.count(metric_type),
        "Classified probes"
    );

    probes
}

fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}
