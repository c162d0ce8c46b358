//! CLI command handlers

use anyhow::{Context, Result};
use clap::Subcommand;
use std::path::Path;

use crate::config::{self, ConfigLoader, paths};

/// Configuration management subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigSubcommand {
    /// Get configuration value
    Get {
        /// Configuration key (e.g., "defaultPlatform", "registry.username")
        key: String,
    },
    /// Set configuration value
    Set {
        /// Configuration key (e.g., "defaultPlatform", "registry.username")
        key: String,
        /// Configuration value
        value: String,
    },
    /// Show the effective configuration
    Show,
    /// Show configuration file path
    Path,
    /// Validate configuration
    Validate,
}

/// Handle configuration subcommands
///
/// `config_path` overrides the root config file location.
pub fn handle_config_command(cmd: ConfigSubcommand, config_path: Option<&Path>) -> Result<()> {
    let root = paths::root_config_path();
    let path = config_path.unwrap_or(root.as_path());

    match cmd {
        ConfigSubcommand::Get { key } => {
            let config = ConfigLoader::load(Some(path)).context("Failed to load configuration")?;
            println!("{}", config::get_config_value(&config, &key)?);
        }
        ConfigSubcommand::Set { key, value } => {
            // Only the file layer is saved, not environment overrides
            let mut config = if path.exists() {
                ConfigLoader::load_file(path)?
            } else {
                ConfigLoader::load_defaults()
            };
            config::set_config_value(&mut config, &key, &value)
                .with_context(|| format!("Failed to set {}", key))?;
            ConfigLoader::save(&config, path).context("Failed to save configuration")?;
            println!("Configuration saved");
        }
        ConfigSubcommand::Show => {
            let mut config =
                ConfigLoader::load(Some(path)).context("Failed to load configuration")?;
            if config.registry.password.is_some() {
                config.registry.password = Some("********".to_string());
            }
            let yaml =
                serde_yaml::to_string(&config).context("Failed to serialize configuration")?;
            print!("{}", yaml);
        }
        ConfigSubcommand::Path => {
            println!("{}", path.display());
        }
        ConfigSubcommand::Validate => match ConfigLoader::validate(Some(path)) {
            Ok(_) => {
                println!("Configuration is valid");
            }
            Err(e) => {
                eprintln!("Configuration validation failed: {:#}", e);
                std::process::exit(1);
            }
        },
    }
    Ok(())
}
