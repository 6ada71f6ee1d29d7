//! Boundary to the Pipelex workflow framework.
//!
//! The framework itself lives outside this process. A `PipelineExecutor`
//! carries one `PipeRequest` across that boundary and brings back the dumped
//! main output of the workflow. Two transports exist:
//! - `ProcessExecutor`: a bridge command fed the request JSON on stdin
//! - `RemoteExecutor`: a Pipelex API server reached over HTTP
//!
//! Both speak the same JSON document:
//!
//! ```text
//! request : {"pipe_code": "...", "plx_content": "..."?, "inputs": {name: input}}
//! reply   : {"main_stuff": <json>}   or   {"error": "..."}
//! ```

pub mod process;
pub mod remote;
pub mod types;

use anyhow::{Result, bail};
use async_trait::async_trait;
use log::info;
use std::sync::{Arc, OnceLock};

use crate::config::{AppConfig, ExecutorKind};
pub use types::{PipeInput, PipeOutput, PipeRequest, PipeTarget};

#[async_trait]
pub trait PipelineExecutor: Send + Sync {
    /// Short label used in logs
    fn name(&self) -> &'static str;

    async fn execute(&self, request: PipeRequest) -> Result<PipeOutput>;
}

static INITIALIZED: OnceLock<()> = OnceLock::new();

/// Build the process-wide executor.
///
/// Must run exactly once, during startup, before the first request is served.
/// A second call is an error rather than a silent re-initialization.
pub fn initialize(config: &AppConfig) -> Result<Arc<dyn PipelineExecutor>> {
    if INITIALIZED.set(()).is_err() {
        bail!("Pipelex executor already initialized");
    }

    let executor: Arc<dyn PipelineExecutor> = match config.executor {
        ExecutorKind::Process => Arc::new(process::ProcessExecutor::from_config(config)),
        ExecutorKind::Remote => Arc::new(remote::RemoteExecutor::from_config(config)?),
    };
    info!("Pipelex executor initialized: {}", executor.name());
    Ok(executor)
}
