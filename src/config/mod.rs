//! Configuration loading for the orchestrator and the agent pool.
//!
//! Two documents make up Octopoid's on-disk configuration, both rooted at
//! `.octopoid/` in the project directory:
//!
//! - `config.yaml` - remote task-store connection (`server.url`, `server.api_key`)
//!   and orchestrator identity (`cluster`)
//! - `agents.yaml` - agent pool sizing and the circuit-breaker threshold
//!
//! Both follow the same precedence: an explicit `--config` path on the CLI,
//! then the project-local file, then built-in defaults. Either document's
//! values can be overridden at the field level by an environment variable,
//! which takes priority over all three so that CI and container deployments
//! never need to template the YAML.

pub mod loader;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use loader::ConfigLoader;

/// Server connection settings, the Rust equivalent of `sdk.py::get_sdk`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub url: String,
    pub api_key: String,
}

/// Top-level `.octopoid/config.yaml` document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OctopoidConfig {
    pub server: ServerConfig,
    /// Cluster name used to build the orchestrator id (`{cluster}-{machine_id}`).
    #[serde(default = "default_cluster")]
    pub cluster: String,
}

fn default_cluster() -> String {
    "default".to_string()
}

impl OctopoidConfig {
    /// Build a config straight from the environment, bypassing the YAML file.
    ///
    /// Mirrors `sdk.py::get_sdk`'s env-var shortcut: `OCTOPOID_SERVER_URL`
    /// and `OCTOPOID_API_KEY` take priority over anything on disk.
    pub fn from_env() -> Option<Self> {
        let url = std::env::var("OCTOPOID_SERVER_URL").ok()?;
        let api_key = std::env::var("OCTOPOID_API_KEY").ok()?;
        Some(Self {
            server: ServerConfig { url, api_key },
            cluster: std::env::var("OCTOPOID_CLUSTER").unwrap_or_else(|_| default_cluster()),
        })
    }

    pub fn apply_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var("OCTOPOID_SERVER_URL") {
            self.server.url = url;
        }
        if let Ok(key) = std::env::var("OCTOPOID_API_KEY") {
            self.server.api_key = key;
        }
        if let Ok(cluster) = std::env::var("OCTOPOID_CLUSTER") {
            self.cluster = cluster;
        }
        self
    }
}

/// Agent pool sizing, the Rust equivalent of the `agents:` section the
/// Python orchestrator reads off its config for pool capacity and the
/// circuit-breaker threshold.
///
/// `blueprints` is the priority-ordered list the scheduler loop walks each
/// tick (§ Scheduler loop step 1); an empty list falls back to a single
/// `implementer` blueprint sized by `pool_size`, so a bare `agents.yaml`
/// (or none at all) still produces a working pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentsConfig {
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
    #[serde(default = "default_circuit_breaker_threshold")]
    pub circuit_breaker_threshold: u32,
    #[serde(default = "default_agent_timeout_secs", with = "humantime_serde")]
    pub agent_timeout: std::time::Duration,
    /// Age past which a still-running claim is logged at `warn` level for
    /// external dashboards. Purely informational - reclamation is not
    /// handled here.
    #[serde(default = "default_soft_claim_limit", with = "humantime_serde")]
    pub soft_claim_limit: std::time::Duration,
    #[serde(default)]
    pub blueprints: Vec<crate::scheduler::AgentBlueprint>,
}

fn default_pool_size() -> usize {
    4
}

fn default_circuit_breaker_threshold() -> u32 {
    3
}

fn default_agent_timeout_secs() -> std::time::Duration {
    std::time::Duration::from_secs(180)
}

fn default_soft_claim_limit() -> std::time::Duration {
    std::time::Duration::from_secs(600)
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            pool_size: default_pool_size(),
            circuit_breaker_threshold: default_circuit_breaker_threshold(),
            agent_timeout: default_agent_timeout_secs(),
            soft_claim_limit: default_soft_claim_limit(),
            blueprints: Vec::new(),
        }
    }
}

impl AgentsConfig {
    /// The blueprint list to actually build pools from: the configured
    /// list if non-empty, otherwise a single default `implementer`
    /// blueprint sized by `pool_size`.
    pub fn effective_blueprints(&self) -> Vec<crate::scheduler::AgentBlueprint> {
        if !self.blueprints.is_empty() {
            return self.blueprints.clone();
        }
        vec![crate::scheduler::AgentBlueprint {
            blueprint_name: "implementer".to_string(),
            role: "implementer".to_string(),
            max_instances: self.pool_size,
            role_filter: None,
            type_filter: None,
            agent_hooks: Vec::new(),
        }]
    }
}

/// Resolve the `.octopoid` directory for a project root.
pub fn octopoid_dir(project_root: &Path) -> PathBuf {
    project_root.join(".octopoid")
}

pub fn config_path(project_root: &Path) -> PathBuf {
    octopoid_dir(project_root).join("config.yaml")
}

pub fn agents_config_path(project_root: &Path) -> PathBuf {
    octopoid_dir(project_root).join("agents.yaml")
}
