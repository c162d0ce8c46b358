//! Configuration schema definitions
//!
//! Defines the structure of configuration files using serde for serialization.

use serde::{Deserialize, Serialize};

use crate::models::DEFAULT_PLATFORM_NAME;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Namespace to collect in; empty means the kubeconfig namespace
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,

    /// Platform used for kits that do not name one
    #[serde(default = "default_platform")]
    pub default_platform: String,

    /// Image registry access
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Squash chains and delete registry images by default
    #[serde(default = "default_false")]
    pub remove_images: bool,
}

/// Image registry configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RegistryConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Registry hosts always reached over plain http
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub insecure_registries: Vec<String>,
}

impl RegistryConfig {
    /// Credentials, when both halves are configured
    pub fn credentials(&self) -> Option<crate::registry::RegistryCredentials> {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Some(crate::registry::RegistryCredentials {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => None,
        }
    }
}

// Default value functions
fn default_platform() -> String {
    DEFAULT_PLATFORM_NAME.to_string()
}

fn default_false() -> bool {
    false
}

impl Default for Config {
    fn default() -> Self {
        Self {
            namespace: String::new(),
            default_platform: default_platform(),
            registry: RegistryConfig::default(),
            remove_images: default_false(),
        }
    }
}
