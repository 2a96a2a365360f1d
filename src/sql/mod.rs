//! SQL text composition
//!
//! Queries are assembled from a fixed [`QueryTemplate`] and the per-metric
//! [`TemplateSlots`] a generator fills from its classified probes.

pub mod fragments;
pub mod template;
pub mod udf;

pub use template::{Cte, QueryTemplate, SourceClause, TemplateSlots};
pub use udf::HistogramKind;
