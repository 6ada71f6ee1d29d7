use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use log::info;
use serde_json::Value;
use std::time::{Duration, Instant};

use super::{PipeOutput, PipeRequest, PipelineExecutor};
use crate::config::AppConfig;

/// Forwards requests to a Pipelex API server.
#[derive(Debug, Clone)]
pub struct RemoteExecutor {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
}

impl RemoteExecutor {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            endpoint: execute_endpoint(base_url),
            token: token.filter(|t| !t.trim().is_empty()),
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let base_url = config
            .pipelex_api_url
            .as_deref()
            .ok_or_else(|| anyhow!("ADFLOW_PIPELEX_API_URL is required for the remote executor"))?;
        Self::new(
            base_url,
            config.pipelex_api_token.clone(),
            Duration::from_secs(config.pipeline_timeout_secs),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn execute_endpoint(base_url: &str) -> String {
    format!("{}/pipeline/execute", base_url.trim().trim_end_matches('/'))
}

#[async_trait]
impl PipelineExecutor for RemoteExecutor {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn execute(&self, request: PipeRequest) -> Result<PipeOutput> {
        let start_time = Instant::now();
        let mut builder = self.client.post(&self.endpoint).json(&request);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }

        let response = builder
            .send()
            .await
            .with_context(|| format!("Failed to reach Pipelex API at {}", self.endpoint))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Pipelex API returned {}: {}", status, body.trim());
        }

        let reply: Value = response
            .json()
            .await
            .context("Pipelex API returned invalid JSON")?;
        info!(
            duration = &*format!("{:?}", start_time.elapsed());
            "Pipeline `{}` finished remotely", request.pipe_code()
        );
        PipeOutput::from_reply(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_is_joined_without_double_slash() {
        assert_eq!(
            execute_endpoint("http://pipelex:8081/"),
            "http://pipelex:8081/pipeline/execute"
        );
        assert_eq!(
            execute_endpoint("https://api.example/v1"),
            "https://api.example/v1/pipeline/execute"
        );
    }

    #[test]
    fn blank_token_is_dropped() {
        let executor = RemoteExecutor::new(
            "http://localhost:8081",
            Some("  ".to_string()),
            Duration::from_secs(5),
        )
        .unwrap();
        assert!(executor.token.is_none());
        assert_eq!(executor.endpoint(), "http://localhost:8081/pipeline/execute");
    }

    #[tokio::test]
    async fn unreachable_server_is_an_error() {
        let executor =
            RemoteExecutor::new("http://127.0.0.1:9", None, Duration::from_secs(2)).unwrap();
        let err = executor
            .execute(PipeRequest::new(crate::pipeline::PipeTarget::Code(
                "noop".to_string(),
            )))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to reach Pipelex API"));
    }
}
