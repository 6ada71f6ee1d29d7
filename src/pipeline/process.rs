use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use log::{info, warn};
use serde_json::Value;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::{PipeOutput, PipeRequest, PipelineExecutor};
use crate::config::AppConfig;

/// Runs each request through a Pipelex bridge command.
///
/// The bridge receives the request JSON on stdin and prints its reply on
/// stdout. Libraries on the Python side tend to print warnings to stdout as
/// well, so the reply is located rather than assumed to be the whole output.
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    command: String,
    args: Vec<String>,
    timeout: Duration,
}

impl ProcessExecutor {
    pub fn new(command: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            args,
            timeout,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.pipelex_command.clone(),
            config.pipelex_args.clone(),
            Duration::from_secs(config.pipeline_timeout_secs),
        )
    }
}

#[async_trait]
impl PipelineExecutor for ProcessExecutor {
    fn name(&self) -> &'static str {
        "process"
    }

    async fn execute(&self, request: PipeRequest) -> Result<PipeOutput> {
        let payload = serde_json::to_vec(&request).context("Failed to encode pipeline request")?;
        let start_time = Instant::now();

        let mut child = Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to start Pipelex bridge `{}`", self.command))?;

        // The timeout covers writing the request as well as the wait.
        let stdin = child.stdin.take();
        let feed = async move {
            if let Some(mut stdin) = stdin {
                // A bridge that dies early closes its end; its stderr explains
                // more than the broken pipe does.
                if let Err(error) = stdin.write_all(&payload).await {
                    warn!("Failed to send request to Pipelex bridge: {}", error);
                }
                // Dropping stdin closes the pipe so the bridge sees EOF.
            }
        };
        let exchange = async move {
            let ((), output) = tokio::join!(feed, child.wait_with_output());
            output
        };

        let output = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| {
                anyhow!(
                    "Pipeline `{}` timed out after {}s",
                    request.pipe_code(),
                    self.timeout.as_secs()
                )
            })?
            .context("Failed to wait for Pipelex bridge")?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            let stderr = stderr.trim();
            if stderr.is_empty() {
                match output.status.code() {
                    Some(code) => bail!("Process exited with code {}", code),
                    None => bail!("Process terminated by signal"),
                }
            }
            bail!("{}", stderr);
        }
        if !stderr.trim().is_empty() {
            warn!("Pipelex bridge stderr:\n{}", stderr.trim_end());
        }

        let reply = extract_reply(&stdout)?;
        info!(
            duration = &*format!("{:?}", start_time.elapsed());
            "Pipeline `{}` finished", request.pipe_code()
        );
        PipeOutput::from_reply(reply)
    }
}

/// Find the bridge reply inside raw stdout.
///
/// Lines that parse as JSON objects are candidates; the first one carrying
/// `main_stuff` or `error` wins, otherwise the first object at all. When no
/// single line parses (pretty-printed output), the span between the first `{`
/// and the last `}` is tried.
pub fn extract_reply(stdout: &str) -> Result<Value> {
    let mut candidates: Vec<Value> = stdout
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with('{') && line.ends_with('}'))
        .filter_map(|line| serde_json::from_str::<Value>(line).ok())
        .filter(Value::is_object)
        .collect();
    let line_match = candidates
        .iter()
        .position(|candidate| {
            candidate.get("main_stuff").is_some() || candidate.get("error").is_some()
        })
        .or_else(|| (!candidates.is_empty()).then_some(0));
    if let Some(index) = line_match {
        return Ok(candidates.swap_remove(index));
    }

    if let (Some(first), Some(last)) = (stdout.find('{'), stdout.rfind('}')) {
        if first < last {
            if let Ok(reply) = serde_json::from_str::<Value>(&stdout[first..=last]) {
                if reply.is_object() {
                    return Ok(reply);
                }
            }
        }
    }

    let preview: String = stdout.chars().take(500).collect();
    Err(anyhow!(
        "No valid JSON object found in output. Raw output: {}",
        preview
    ))
}
