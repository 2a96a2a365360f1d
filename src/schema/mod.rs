//! Schema introspection for the source tables
//!
//! Field descriptors come from the external schema service; this module
//! parses them and decides which shape each field has.

mod field;
mod shape;

pub use field::{find_path, parse_schema, FieldType, SchemaField};
pub use shape::{classify_shape, FieldShape, KeyedValue, ShapeFamily};
