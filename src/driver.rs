//! Fetch, classify, compose, render.

use crate::generators::Generator;
use crate::sources::{ProbeRegistrySource, SchemaSource};
use crate::Result;
use std::io::Write;
use tracing::{info, info_span, warn, Instrument};

/// Generate the query for `agg_type`.
///
/// The schema is fetched before the registry; either failure aborts before
/// anything is rendered.
pub async fn generate<G: Generator>(
    generator: &G,
    agg_type: G::AggType,
    schema_source: &dyn SchemaSource,
    registry_source: &dyn ProbeRegistrySource,
) -> Result<String> {
    let span = info_span!("generate", generator = generator.name(), agg_type = %agg_type);

    async move {
        let schema = schema_source.fetch_schema().await?;
        info!(
            source = %schema_source.describe(),
            fields = schema.len(),
            "Fetched schema"
        );

        let registry = registry_source.fetch_registry().await?;
        if registry.is_empty() {
            warn!(source = %registry_source.describe(), "Probe registry lists no probes");
        } else {
            info!(
                source = %registry_source.describe(),
                probes = registry.len(),
                "Fetched probe registry"
            );
        }

        let probes = generator.classify(&schema, &registry, agg_type);
        if probes.is_empty() {
            warn!("No probes matched; the query will aggregate nothing");
        } else {
            info!(
                probes = probes.len(),
                collisions = probes.collisions().len(),
                "Classified probes"
            );
        }

        let slots = generator.compose(&probes, agg_type);
        let sql = generator.template().render(&slots);
        info!(bytes = sql.len(), "Rendered query");
        Ok(sql)
    }
    .instrument(span)
    .await
}

/// Write the rendered query to standard output.
pub fn emit(sql: &str) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(sql.as_bytes())?;
    stdout.flush()?;
    Ok(())
}
