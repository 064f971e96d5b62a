use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use taged_client::{ClientConfig, RefreshPolicy};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    #[serde(flatten)]
    pub client: ClientConfig,

    /// Where the session blob is kept; `~` is expanded
    #[serde(default = "default_store_path")]
    pub store_path: String,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

fn default_store_path() -> String {
    "~/.taged/session.json".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            client: ClientConfig::default(),
            store_path: default_store_path(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl CliConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let config = if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            toml::from_str(&contents)
                .with_context(|| format!("Invalid TOML in {}", path.display()))?
        } else {
            // Default to YAML
            serde_yaml::from_str(&contents)
                .with_context(|| format!("Invalid YAML in {}", path.display()))?
        };

        Ok(config)
    }

    /// `~/.taged/config.yaml`, when a home directory is known
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".taged").join("config.yaml"))
    }

    /// Load the explicit file, else the default file if present, else defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::from_file(path),
                _ => Ok(Self::default()),
            },
        }
    }

    /// Merge environment variables into config (env vars take precedence)
    pub fn merge_env(&mut self) {
        self.merge_vars(|key| std::env::var(key).ok());
    }

    fn merge_vars(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(val) = var("TAGED_STORE_PATH") {
            self.store_path = val;
        }

        if let Some(val) = var("TAGED_LOG_LEVEL") {
            self.logging.level = val;
        }

        if let Some(val) = var("TAGED_REFRESH_POLICY") {
            match val.to_lowercase().as_str() {
                "independent" => self.client.refresh_policy = RefreshPolicy::Independent,
                "coalesced" => self.client.refresh_policy = RefreshPolicy::Coalesced,
                _ => eprintln!(
                    "Warning: Invalid TAGED_REFRESH_POLICY '{}', using {:?}",
                    val, self.client.refresh_policy
                ),
            }
        }

        if let Some(val) = var("TAGED_REQUEST_DEADLINE_SECS")
            && let Ok(secs) = val.parse::<u64>()
        {
            self.client.request_deadline_secs = secs;
        }
    }

    pub fn store_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.store_path).to_string())
    }
}
