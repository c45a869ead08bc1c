use anyhow::Context;
use serde::Deserialize;
use std::path::Path;

pub const CONFIG_FILE: &str = "coursebook.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Load the demo users and courses into an empty workspace.
    pub seed_fixtures: bool,
    pub key_prefix: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    pub min_password_length: usize,
    /// Keep the session pointer in the workspace so a restart stays signed in.
    pub persist_session: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            seed_fixtures: true,
            key_prefix: "coursebook".to_string(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        AuthConfig {
            min_password_length: 6,
            persist_session: true,
        }
    }
}

impl AppConfig {
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let cfg: AppConfig = toml::from_str(raw).context("invalid coursebook.toml")?;
        if cfg.store.key_prefix.trim().is_empty() {
            anyhow::bail!("store.key_prefix must not be empty");
        }
        Ok(cfg)
    }

    /// Reads `coursebook.toml` from the workspace; defaults when the file is absent.
    pub fn load(workspace: &Path) -> anyhow::Result<Self> {
        let path = workspace.join(CONFIG_FILE);
        if !path.is_file() {
            return Ok(AppConfig::default());
        }
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.to_string_lossy()))?;
        Self::parse(&raw)
    }
}
