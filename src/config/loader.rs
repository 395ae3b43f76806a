//! Loads `.octopoid/config.yaml` and `.octopoid/agents.yaml` with a
//! consistent precedence: explicit path argument, then the project-local
//! file, then built-in defaults, then environment-variable overrides on top
//! of whatever was found.

use super::{agents_config_path, config_path, AgentsConfig, OctopoidConfig};
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// Loads and caches the two on-disk config documents for a project root.
pub struct ConfigLoader {
    project_root: PathBuf,
}

impl ConfigLoader {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
        }
    }

    /// Load the server config, honoring an explicit path override before
    /// falling back to `.octopoid/config.yaml`, and finally the environment.
    ///
    /// Returns an error if neither a file nor the environment variables
    /// provide a server URL and API key - there is no sensible default for
    /// where to submit results.
    pub async fn load_server_config(&self, explicit_path: Option<&Path>) -> Result<OctopoidConfig> {
        if let Some(config) = OctopoidConfig::from_env() {
            return Ok(config);
        }

        let path = match explicit_path {
            Some(p) => p.to_path_buf(),
            None => config_path(&self.project_root),
        };

        if !path.exists() {
            return Err(Error::Config(format!(
                "no server config found at {} and OCTOPOID_SERVER_URL/OCTOPOID_API_KEY are unset",
                path.display()
            )));
        }

        let contents = tokio::fs::read_to_string(&path).await?;
        let config: OctopoidConfig = serde_yaml::from_str(&contents)?;
        Ok(config.apply_env_overrides())
    }

    /// Load the agent pool config, defaulting when the file is absent.
    pub async fn load_agents_config(&self) -> Result<AgentsConfig> {
        let path = agents_config_path(&self.project_root);
        if !path.exists() {
            return Ok(AgentsConfig::default());
        }

        let contents = tokio::fs::read_to_string(&path).await?;
        let config: AgentsConfig = serde_yaml::from_str(&contents)?;
        Ok(config)
    }
}
