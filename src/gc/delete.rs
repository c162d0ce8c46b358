//! Kit deletion

use kube::ResourceExt;

use crate::cluster::Cluster;
use crate::error::GcResult;
use crate::models::IntegrationKit;
use crate::registry::{Registry, RegistryOptionsCache};

/// Deletes kits and, when asked to, their registry images
pub struct Deleter<'a> {
    cluster: &'a dyn Cluster,
    registry: &'a dyn Registry,
    options: &'a mut RegistryOptionsCache,
    remove_images: bool,
}

impl<'a> Deleter<'a> {
    pub fn new(
        cluster: &'a dyn Cluster,
        registry: &'a dyn Registry,
        options: &'a mut RegistryOptionsCache,
        remove_images: bool,
    ) -> Self {
        Self {
            cluster,
            registry,
            options,
            remove_images,
        }
    }

    /// Delete one kit
    ///
    /// The image goes first: once the kit is gone its status no longer
    /// tells which tag to remove.
    pub async fn delete(&mut self, kit: &IntegrationKit) -> GcResult<()> {
        if self.remove_images && !kit.status_image().is_empty() {
            let target = self.options.target_for(self.cluster, kit).await?;
            tracing::debug!("Deleting image {}", target);
            self.registry.delete_image(&target).await?;
        }
        tracing::debug!("Deleting kit {}", kit.display_name());
        self.cluster
            .delete_kit(&kit.namespace().unwrap_or_default(), &kit.name_any())
            .await
    }

    pub async fn delete_all(&mut self, kits: &[IntegrationKit]) -> GcResult<()> {
        for kit in kits {
            self.delete(kit).await?;
        }
        Ok(())
    }
}
