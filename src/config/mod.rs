//! Configuration system for kitgc
//!
//! Layered YAML configuration: built-in defaults, a config file, then
//! environment overrides. Command line flags win over all of them.

mod defaults;
pub mod loader;
pub mod paths;
pub mod schema;

pub use loader::ConfigLoader;
pub use schema::{Config, RegistryConfig};

/// Get a configuration value by key (dot notation)
pub fn get_config_value(config: &Config, key: &str) -> anyhow::Result<String> {
    match key {
        "namespace" => Ok(config.namespace.clone()),
        "defaultPlatform" => Ok(config.default_platform.clone()),
        "removeImages" => Ok(config.remove_images.to_string()),
        "registry.username" => Ok(config.registry.username.clone().unwrap_or_default()),
        "registry.password" => Ok(config
            .registry
            .password
            .as_ref()
            .map(|_| "********".to_string())
            .unwrap_or_default()),
        "registry.insecureRegistries" => serde_yaml::to_string(&config.registry.insecure_registries)
            .map_err(|e| anyhow::anyhow!("Failed to serialize insecureRegistries: {}", e)),
        _ => Err(anyhow::anyhow!("Unknown configuration key: {}", key)),
    }
}

/// Set a configuration value by key (dot notation)
pub fn set_config_value(config: &mut Config, key: &str, value: &str) -> anyhow::Result<()> {
    use anyhow::Context;
    match key {
        "namespace" => {
            config.namespace = value.to_string();
        }
        "defaultPlatform" => {
            config.default_platform = value.to_string();
        }
        "removeImages" => {
            config.remove_images = value
                .parse()
                .context("removeImages must be 'true' or 'false'")?;
        }
        "registry.username" => {
            config.registry.username = Some(value.to_string()).filter(|v| !v.is_empty());
        }
        "registry.password" => {
            config.registry.password = Some(value.to_string()).filter(|v| !v.is_empty());
        }
        "registry.insecureRegistries" => {
            // YAML array or comma-separated list
            config.registry.insecure_registries = if value.trim_start().starts_with('[') {
                serde_yaml::from_str(value).context(
                    "registry.insecureRegistries must be a YAML array (e.g., ['registry.local:5000'])",
                )?
            } else {
                value
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            };
        }
        _ => return Err(anyhow::anyhow!("Unknown configuration key: {}", key)),
    }

    Ok(())
}
