use std::sync::Arc;

use anyhow::Context;
use fhirmig_config::RunConfig;
use fhirmig_engine::MigrationEngine;
use fhirmig_storage::{LocalBlobStore, OutcomeStore};

use crate::cli::RunArgs;
use crate::processors;
use crate::{input, output};

/// Executes one migration run end to end and renders its report.
pub async fn run(cfg: &RunConfig, args: &RunArgs) -> anyhow::Result<()> {
    let registry = processors::default_registry();
    let processor = registry.get(&args.data_type).with_context(|| {
        format!(
            "supported data types: {}",
            registry.names().join(", ")
        )
    })?;

    let migration_input = input::load_input(&args.input)?;

    let blobs = Arc::new(LocalBlobStore::new(&cfg.data_dir)?);
    let outcomes = Arc::new(OutcomeStore::new(blobs, &args.data_type));

    let engine = MigrationEngine::new(outcomes, &args.data_type)
        .with_chunk_size(cfg.chunk_size)
        .with_worker_count(cfg.worker_count)
        .with_mode(cfg.mode);

    let report = engine.run(migration_input, processor).await?;

    output::print_report(&report, args.details, cfg.quiet);
    if report.chunks_failed == 0 && report.totals.error == 0 {
        output::print_success("run completed with no failures");
    }

    Ok(())
}
