//! Configuration loading and merging logic
//!
//! Handles loading configuration from multiple sources and merging them
//! according to precedence rules.

use super::{defaults, paths, schema::Config};
use anyhow::{Context, Result};
use std::path::Path;

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with all layers merged
    ///
    /// Precedence order (highest to lowest):
    /// 1. Environment variable overrides
    /// 2. Config file (`path`, or the root config path)
    /// 3. Built-in defaults
    ///
    /// Command line flags are applied on top by the caller.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let root = paths::root_config_path();
        let path = path.unwrap_or(root.as_path());
        let config = if path.exists() {
            Self::load_file(path)?
        } else {
            tracing::debug!("No config file at {}, using defaults", path.display());
            Self::load_defaults()
        };
        Ok(Self::apply_env_overrides(config))
    }

    /// Load configuration from a file
    pub fn load_file(path: &Path) -> Result<Config> {
        if !path.exists() {
            return Err(anyhow::anyhow!("Config file not found: {}", path.display()));
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate configuration by loading and checking for errors
    ///
    /// Fails on invalid YAML, invalid value types, file read errors and
    /// values that cannot work at run time.
    pub fn validate(path: Option<&Path>) -> Result<Config> {
        let config = Self::load(path).context("Failed to load configuration")?;

        if config.default_platform.trim().is_empty() {
            return Err(anyhow::anyhow!("defaultPlatform must not be empty"));
        }
        for host in &config.registry.insecure_registries {
            if host.is_empty() || host.contains("://") || host.contains('/') {
                return Err(anyhow::anyhow!(
                    "registry.insecureRegistries entry {:?} must be a bare host[:port]",
                    host
                ));
            }
        }
        if config.registry.username.is_some() != config.registry.password.is_some() {
            return Err(anyhow::anyhow!(
                "registry.username and registry.password must be set together"
            ));
        }

        Ok(config)
    }

    /// Load default configuration
    pub fn load_defaults() -> Config {
        defaults::default_config()
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(config: Config) -> Config {
        Self::apply_overrides(config, |key| std::env::var(key).ok())
    }

    fn apply_overrides(mut config: Config, lookup: impl Fn(&str) -> Option<String>) -> Config {
        // KITGC_NAMESPACE override
        if let Some(namespace) = lookup("KITGC_NAMESPACE") {
            config.namespace = namespace;
        }

        // KITGC_PLATFORM override
        if let Some(platform) = lookup("KITGC_PLATFORM") {
            config.default_platform = platform;
        }

        if let Some(username) = lookup("KITGC_REGISTRY_USERNAME") {
            config.registry.username = Some(username);
        }
        if let Some(password) = lookup("KITGC_REGISTRY_PASSWORD") {
            config.registry.password = Some(password);
        }

        config
    }

    /// Save configuration to a file
    pub fn save(config: &Config, path: &Path) -> Result<()> {
        // Ensure directory exists
        if let Some(parent) = path.parent() {
            paths::ensure_dir(parent)?;
        }

        let yaml =
            serde_yaml::to_string(config).context("Failed to serialize configuration to YAML")?;

        std::fs::write(path, yaml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Save root configuration
    pub fn save_root(config: &Config) -> Result<()> {
        Self::save(config, &paths::root_config_path())
    }
}
