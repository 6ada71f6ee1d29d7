use anyhow::{Context, Result, bail};
use dotenv::dotenv;
use log::info;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::OnceLock;

pub const ENV_PREFIX: &str = "ADFLOW_";

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExecutorKind {
    /// Spawn the Pipelex bridge as a child process per request
    Process,
    /// Forward requests to a Pipelex API server over HTTP
    Remote,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    pub address: String,
    pub port: u16,
    /// Workflow bundle for the combined analysis + copy + video prompt pipe
    pub complete_ad_workflow: PathBuf,
    /// Workflow bundle for text-to-video
    pub video_workflow: PathBuf,
    pub executor: ExecutorKind,
    pub pipelex_command: String,
    pub pipelex_args: Vec<String>,
    pub pipelex_api_url: Option<String>,
    pub pipelex_api_token: Option<String>,
    pub pipeline_timeout_secs: u64,
    pub allowed_origins: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".to_string(),
            port: 8000,
            complete_ad_workflow: PathBuf::from("pipelines/adflow_complete.plx"),
            video_workflow: PathBuf::from("pipelines/video_generation.plx"),
            executor: ExecutorKind::Process,
            pipelex_command: "pipelex-bridge".to_string(),
            pipelex_args: Vec::new(),
            pipelex_api_url: None,
            pipelex_api_token: None,
            pipeline_timeout_secs: 600,
            allowed_origins: vec!["*".to_string()],
        }
    }
}

pub static APP_CONFIG: OnceLock<AppConfig> = OnceLock::new();

impl AppConfig {
    /// Build a config from `ADFLOW_*` variables. A bare `PORT` is honored
    /// when `ADFLOW_PORT` is absent, since hosting platforms inject it.
    pub fn from_vars<I>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: Vec<(String, String)> = vars.into_iter().collect();
        let has_prefixed_port = vars.iter().any(|(key, _)| key == "ADFLOW_PORT");
        let platform_port = vars
            .iter()
            .find(|(key, _)| key == "PORT")
            .map(|(_, value)| value.clone());

        let mut config: AppConfig = envy::prefixed(ENV_PREFIX)
            .from_iter(vars)
            .context("Failed to read ADFLOW_* configuration")?;

        if !has_prefixed_port {
            if let Some(port) = platform_port {
                config.port = port
                    .trim()
                    .parse()
                    .with_context(|| format!("Invalid PORT value: {}", port))?;
            }
        }

        config.pipelex_args.retain(|arg| !arg.trim().is_empty());
        config.allowed_origins = config
            .allowed_origins
            .into_iter()
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.pipeline_timeout_secs == 0 {
            bail!("ADFLOW_PIPELINE_TIMEOUT_SECS must be greater than zero");
        }
        match self.executor {
            ExecutorKind::Process if self.pipelex_command.trim().is_empty() => {
                bail!("ADFLOW_PIPELEX_COMMAND must not be empty for the process executor")
            }
            ExecutorKind::Remote
                if self
                    .pipelex_api_url
                    .as_deref()
                    .is_none_or(|url| url.trim().is_empty()) =>
            {
                bail!("ADFLOW_PIPELEX_API_URL is required for the remote executor")
            }
            _ => Ok(()),
        }
    }

    pub fn allows_any_origin(&self) -> bool {
        self.allowed_origins.iter().any(|origin| origin == "*")
    }
}

/// Load `.env`, read the environment and pin the result for the rest of the
/// process. Later calls return the already loaded config.
pub fn init_config() -> Result<&'static AppConfig> {
    if let Some(config) = APP_CONFIG.get() {
        return Ok(config);
    }
    dotenv().ok();
    let config = AppConfig::from_vars(std::env::vars())?;
    info!(
        "Loaded config: executor={:?}, complete_ad_workflow={}, video_workflow={}",
        config.executor,
        config.complete_ad_workflow.display(),
        config.video_workflow.display()
    );
    Ok(APP_CONFIG.get_or_init(|| config))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_apply_without_variables() {
        let config = AppConfig::from_vars(Vec::new()).unwrap();
        assert_eq!(config, AppConfig::default());
        assert!(config.allows_any_origin());
    }

    #[test]
    fn platform_port_is_used_when_prefixed_port_missing() {
        let config = AppConfig::from_vars(vars(&[("PORT", "9100")])).unwrap();
        assert_eq!(config.port, 9100);

        let config =
            AppConfig::from_vars(vars(&[("PORT", "9100"), ("ADFLOW_PORT", "7000")])).unwrap();
        assert_eq!(config.port, 7000);
    }

    #[test]
    fn comma_separated_lists_are_split() {
        let config = AppConfig::from_vars(vars(&[
            ("ADFLOW_PIPELEX_ARGS", "run,--quiet"),
            (
                "ADFLOW_ALLOWED_ORIGINS",
                "http://localhost:3000, https://adflow.example",
            ),
        ]))
        .unwrap();
        assert_eq!(config.pipelex_args, vec!["run", "--quiet"]);
        assert_eq!(
            config.allowed_origins,
            vec!["http://localhost:3000", "https://adflow.example"]
        );
        assert!(!config.allows_any_origin());
    }

    #[test]
    fn remote_executor_requires_url() {
        let err = AppConfig::from_vars(vars(&[("ADFLOW_EXECUTOR", "remote")])).unwrap_err();
        assert!(err.to_string().contains("ADFLOW_PIPELEX_API_URL"));

        let config = AppConfig::from_vars(vars(&[
            ("ADFLOW_EXECUTOR", "remote"),
            ("ADFLOW_PIPELEX_API_URL", "http://pipelex:8081"),
        ]))
        .unwrap();
        assert_eq!(config.executor, ExecutorKind::Remote);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(AppConfig::from_vars(vars(&[("PORT", "eighty")])).is_err());
        assert!(AppConfig::from_vars(vars(&[("ADFLOW_EXECUTOR", "grpc")])).is_err());
        assert!(
            AppConfig::from_vars(vars(&[("ADFLOW_PIPELINE_TIMEOUT_SECS", "0")])).is_err()
        );
    }
}
