//! Query generators, one per target dataset
//!
//! Both generators share the same pipeline: classify the schema's probe
//! columns for the selected aggregation type, compose the per-probe SQL
//! fragments into template slots, and render the dataset's fixed template.

mod histogram;
mod scalar;

pub use histogram::{HistogramAggType, HistogramAggregates};
pub use scalar::{ScalarAggType, ScalarAggregates};

use crate::probes::{ProbeRegistry, ProbeSet};
use crate::schema::SchemaField;
use crate::sql::{QueryTemplate, TemplateSlots};
use std::fmt;

/// A query generator for one dataset
pub trait Generator {
    /// Closed set of aggregation types accepted on the command line
    type AggType: Copy + fmt::Debug + fmt::Display;

    /// Name written into the generated query's header comment
    fn name(&self) -> &'static str;

    /// Select the probes relevant to `agg_type`.
    fn classify(
        &self,
        schema: &[SchemaField],
        registry: &ProbeRegistry,
        agg_type: Self::AggType,
    ) -> ProbeSet;

    /// Fill the template slots for `agg_type` from classified probes.
    ///
    /// Probes are visited in lexicographic order, so equal inputs always
    /// compose to equal slots.
    fn compose(&self, probes: &ProbeSet, agg_type: Self::AggType) -> TemplateSlots;

    /// Fixed skeleton shared by every aggregation type of this dataset
    fn template(&self) -> QueryTemplate;

    /// Classify, compose and render in one step.
    fn generate(
        &self,
        schema: &[SchemaField],
        registry: &ProbeRegistry,
        agg_type: Self::AggType,
    ) -> String {
        let probes = self.classify(schema, registry, agg_type);
        self.template().render(&self.compose(&probes, agg_type))
    }
}

/// Dimension columns shared by both datasets once renamed
pub(crate) const DIMENSIONS: [&str; 6] = [
    "client_id",
    "submission_date",
    "os",
    "app_version",
    "app_build_id",
    "channel",
];

/// Windowed rows collapse to one per client and day; keep the first.
pub(crate) const FIRST_ROW_FILTER: &str = "FROM\n  windowed\nWHERE\n  _n = 1";

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Final projection that collapses keyed rows into an array per client and day.
fn grouped_select(aggregate: &str) -> String {
    let group_by = (1..=DIMENSIONS.len())
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "SELECT\n  {},\n  {aggregate}\n{FIRST_ROW_FILTER}\nGROUP BY\n  {group_by}",
        DIMENSIONS.join(",\n  ")
    )
}
