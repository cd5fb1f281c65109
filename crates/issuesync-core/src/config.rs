use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// SourceConfig
// ---------------------------------------------------------------------------

/// Where source issues are read from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// `owner/name` of the repository whose issues are mirrored.
    #[serde(default = "default_repository")]
    pub repository: String,
    /// Short name embedded in ticket summaries (`GH-<repo_tag>-<n>: `).
    #[serde(default = "default_repo_tag")]
    pub repo_tag: String,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_repository() -> String {
    "k-orc/openstack-resource-controller".to_string()
}

fn default_repo_tag() -> String {
    "orc".to_string()
}

fn default_page_size() -> u32 {
    100
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            repository: default_repository(),
            repo_tag: default_repo_tag(),
            page_size: default_page_size(),
        }
    }
}

// ---------------------------------------------------------------------------
// TrackerConfig
// ---------------------------------------------------------------------------

/// Where tickets live and how the tracker workflow is named.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Search selecting every ticket this tool may have created.
    #[serde(default = "default_query")]
    pub query: String,
    #[serde(default = "default_project_key")]
    pub project_key: String,
    #[serde(default = "default_component")]
    pub component: String,
    #[serde(default = "default_issue_type")]
    pub issue_type: String,
    /// Status name that counts as closed.
    #[serde(default = "default_closed")]
    pub closed_status: String,
    #[serde(default = "default_closed")]
    pub close_transition: String,
    #[serde(default = "default_reopen_transition")]
    pub reopen_transition: String,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Retries allowed per request while throttled; `null` retries forever.
    #[serde(default = "default_max_throttle_retries")]
    pub max_throttle_retries: Option<u32>,
}

fn default_base_url() -> String {
    "https://issues.redhat.com/".to_string()
}

fn default_query() -> String {
    r#"project = "OSASINFRA" AND (component in ("ORC"))"#.to_string()
}

fn default_project_key() -> String {
    "OSASINFRA".to_string()
}

fn default_component() -> String {
    "ORC".to_string()
}

fn default_issue_type() -> String {
    "Task".to_string()
}

fn default_closed() -> String {
    "Closed".to_string()
}

fn default_reopen_transition() -> String {
    "To Do".to_string()
}

fn default_max_throttle_retries() -> Option<u32> {
    Some(10)
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            query: default_query(),
            project_key: default_project_key(),
            component: default_component(),
            issue_type: default_issue_type(),
            closed_status: default_closed(),
            close_transition: default_closed(),
            reopen_transition: default_reopen_transition(),
            page_size: default_page_size(),
            max_throttle_retries: default_max_throttle_retries(),
        }
    }
}

// ---------------------------------------------------------------------------
// SyncConfig (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub tracker: TrackerConfig,
}

impl SyncConfig {
    /// Built-in defaults when `path` is `None`, otherwise the YAML file at
    /// `path` with missing keys defaulted.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let data = std::fs::read_to_string(path)?;
        let cfg: SyncConfig = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.source.repo_tag.trim().is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "source.repo_tag is empty; tickets could not be matched to issues"
                    .to_string(),
            });
        }

        if !self.source.repository.contains('/') {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!(
                    "source.repository '{}' is not of the form owner/name",
                    self.source.repository
                ),
            });
        }

        for (name, size) in [
            ("source.page_size", self.source.page_size),
            ("tracker.page_size", self.tracker.page_size),
        ] {
            if size == 0 {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("{name} must be greater than zero"),
                });
            }
        }

        if self.tracker.max_throttle_retries.is_none() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "tracker.max_throttle_retries is unset; throttled requests retry forever"
                    .to_string(),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
