//! Per-platform registry options
//!
//! Whether a kit's registry is insecure is a property of the
//! IntegrationPlatform the kit was built by. Looking the platform up for
//! every kit would cost one API call per image, so results are cached per
//! `namespace/platform` in an explicit cache object owned by the run.

use kube::ResourceExt;
use std::collections::HashMap;

use super::RegistryTarget;
use crate::cluster::Cluster;
use crate::error::GcResult;
use crate::models::IntegrationKit;

/// How a platform's registry must be reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegistryOptions {
    pub insecure: bool,
}

/// Cache of registry options keyed by `namespace/platform`
pub struct RegistryOptionsCache {
    default_platform: String,
    insecure_registries: Vec<String>,
    entries: HashMap<String, RegistryOptions>,
}

impl RegistryOptionsCache {
    /// Create an empty cache
    ///
    /// `insecure_registries` lists registry hosts that are always reached over
    /// http, whatever their platform says.
    pub fn new(default_platform: impl Into<String>, insecure_registries: Vec<String>) -> Self {
        Self {
            default_platform: default_platform.into(),
            insecure_registries,
            entries: HashMap::new(),
        }
    }

    /// Number of cached platforms
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registry options for the platform a kit belongs to
    pub async fn options_for(
        &mut self,
        cluster: &dyn Cluster,
        kit: &IntegrationKit,
    ) -> GcResult<RegistryOptions> {
        let namespace = kit.namespace().unwrap_or_default();
        let platform = match kit.platform() {
            "" => self.default_platform.as_str(),
            name => name,
        };
        let key = format!("{}/{}", namespace, platform);
        if let Some(options) = self.entries.get(&key) {
            return Ok(*options);
        }

        tracing::debug!("Resolving registry options for platform {}", key);
        let platform = cluster.get_platform(&namespace, platform).await?;
        let options = RegistryOptions {
            insecure: platform.registry_insecure(),
        };
        self.entries.insert(key, options);
        Ok(options)
    }

    /// Registry target for a kit's current status image
    pub async fn target_for(
        &mut self,
        cluster: &dyn Cluster,
        kit: &IntegrationKit,
    ) -> GcResult<RegistryTarget> {
        let options = self.options_for(cluster, kit).await?;
        let mut target = super::client::target(kit.status_image(), options.insecure)?;
        if self
            .insecure_registries
            .iter()
            .any(|host| host == target.reference.registry())
        {
            target.insecure = true;
        }
        Ok(target)
    }
}
