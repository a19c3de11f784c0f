use std::sync::Arc;

use fhirmig_config::RunConfig;
use fhirmig_core::OutcomeCategory;
use fhirmig_storage::{LocalBlobStore, OutcomeStore};

use crate::cli::ReportArgs;
use crate::output;

/// Summarizes the outcome logs prior runs left behind for a data type.
pub async fn run(cfg: &RunConfig, args: &ReportArgs) -> anyhow::Result<()> {
    let blobs = Arc::new(LocalBlobStore::new(&cfg.data_dir)?);
    let outcomes = OutcomeStore::new(blobs, &args.data_type);

    let done = outcomes.load_done(OutcomeCategory::Done).await?;
    let errors = outcomes.load_done(OutcomeCategory::Error).await?;
    let ignored = outcomes.load_done(OutcomeCategory::Ignored).await?;

    output::print_log_counts(&args.data_type, done.len(), errors.len(), ignored.len());
    Ok(())
}
