pub mod setup;

use anyhow::Result;
use dotenv::dotenv;
use std::sync::Arc;

use crate::config::{AppConfig, init_config};
use crate::orchestration::generator::AdGenerator;
use crate::pipeline;

/// Everything a process needs before it can serve its first workflow call:
/// logger, configuration and the Pipelex executor.
pub fn initialize() -> Result<(&'static AppConfig, Arc<AdGenerator>)> {
    // `.env` has to be loaded before the logger reads RUST_LOG.
    dotenv().ok();
    setup::initialize_logger(&setup::log_filter(std::env::vars()));
    let config = init_config()?;
    setup::check_workflow_files(config);
    let executor = pipeline::initialize(config)?;
    let generator = AdGenerator::new(executor, config);
    Ok((config, Arc::new(generator)))
}
