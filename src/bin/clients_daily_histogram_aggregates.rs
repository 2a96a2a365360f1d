//! clients_daily_histogram_aggregates query generator
//!
//! Prints the aggregation query for one `payload` histogram group of the
//! live `main_v4` table.

use clients_daily_aggregates::config::{SourceArgs, SourceFactory};
use clients_daily_aggregates::driver;
use clients_daily_aggregates::generators::{HistogramAggType, HistogramAggregates};
use clients_daily_aggregates::telemetry::Telemetry;

use clap::Parser;
use tracing::info;

/// clients_daily_histogram_aggregates query generator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Histogram group to aggregate
    #[arg(long, value_enum)]
    agg_type: HistogramAggType,

    #[command(flatten)]
    sources: SourceArgs,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let telemetry = Telemetry::init_for_component(
        "clients-daily-histogram-aggregates",
        &args.sources.log_level,
    )?;

    let table = args.sources.table_ref(HistogramAggregates::default_table())?;
    let generator = HistogramAggregates::new(table.clone(), args.sources.query_options());
    let schema_source = SourceFactory::schema_source(&args.sources, &table);
    let registry_source = SourceFactory::probe_registry(&args.sources)?;

    info!(
        agg_type = %args.agg_type,
        table = %table.bq_id(),
        run_id = telemetry.run_id(),
        "Generating query"
    );

    let sql = driver::generate(
        &generator,
        args.agg_type,
        schema_source.as_ref(),
        registry_source.as_ref(),
    )
    .await?;
    driver::emit(&sql)?;

    Ok(())
}
