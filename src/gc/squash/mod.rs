//! Image squashing
//!
//! For a chain `[anchor, .., oldest]` the anchor's image is rebuilt as the
//! oldest kit's layers plus one layer holding everything added since. The
//! new image is pushed by digest into the anchor's repository, the cluster
//! is re-pointed at it and the old tag is removed.

pub mod assemble;
pub mod layers;

pub use assemble::{Addendum, SquashedImage, assemble, parent_addendums};
pub use layers::{FlattenedLayer, check_prefix, decompress, flatten};

use kube::ResourceExt;

use super::planner::SquashChain;
use super::usage::ImageUsage;
use crate::cluster::{Cluster, KitStatusPatch};
use crate::error::GcResult;
use crate::registry::{Registry, RegistryOptionsCache, RegistryTarget, reference};

/// Squashes chains one after the other
pub struct Squasher<'a> {
    cluster: &'a dyn Cluster,
    registry: &'a dyn Registry,
    options: &'a mut RegistryOptionsCache,
    usage: &'a ImageUsage,
}

impl<'a> Squasher<'a> {
    pub fn new(
        cluster: &'a dyn Cluster,
        registry: &'a dyn Registry,
        options: &'a mut RegistryOptionsCache,
        usage: &'a ImageUsage,
    ) -> Self {
        Self {
            cluster,
            registry,
            options,
            usage,
        }
    }

    /// Squash one chain, returning the reference of the new image
    pub async fn squash(&mut self, chain: &SquashChain) -> GcResult<String> {
        let anchor = chain.anchor();
        let oldest = chain.oldest();
        tracing::info!(
            "Squashing {} into {}",
            chain.names().join(", "),
            anchor.display_name()
        );

        let child_target = self.options.target_for(self.cluster, anchor).await?;
        let parent_target = self.options.target_for(self.cluster, oldest).await?;
        let child = self.registry.fetch_image(&child_target).await?;
        let parent = self.registry.fetch_image(&parent_target).await?;
        check_prefix(&child, &parent)?;

        let delta = &child.layers()[parent.layers().len()..];
        tracing::debug!(
            "Flattening {} layers of {} on top of {}",
            delta.len(),
            child,
            parent
        );
        let mut tarballs = Vec::with_capacity(delta.len());
        for descriptor in delta {
            let blob = self.registry.fetch_blob(&child_target, descriptor).await?;
            tarballs.push(decompress(descriptor, blob)?);
        }
        let layer = FlattenedLayer::compress(&flatten(&tarballs)?)?;
        let image = assemble(&child, &parent, layer)?;

        let squashed = self.publish(&child_target, image).await?;
        self.repoint(chain, &squashed).await?;

        if let Err(e) = self.registry.delete_image(&child_target).await {
            tracing::warn!("Could not delete superseded image {}: {}", child_target, e);
        }
        Ok(squashed)
    }

    /// Push layer, config and manifest; the manifest goes in by digest
    async fn publish(&self, child: &RegistryTarget, image: SquashedImage) -> GcResult<String> {
        let SquashedImage {
            layer,
            config,
            config_digest,
            manifest,
            manifest_digest,
            manifest_media_type,
        } = image;

        self.registry
            .push_blob(child, layer.data, &layer.digest)
            .await?;
        self.registry.push_blob(child, config, &config_digest).await?;

        let squashed = reference::pinned(&child.reference, &manifest_digest);
        let target = child.sibling(reference::parse(&squashed)?);
        self.registry
            .push_manifest(&target, manifest, &manifest_media_type)
            .await?;
        tracing::debug!("Pushed squashed image {}", squashed);
        Ok(squashed)
    }

    /// Point the anchor kit, its dependents and its integrations at `squashed`
    async fn repoint(&self, chain: &SquashChain, squashed: &str) -> GcResult<()> {
        let anchor = chain.anchor();
        let namespace = anchor.namespace().unwrap_or_default();
        let name = anchor.name_any();

        let mut patch = KitStatusPatch {
            image: Some(squashed.to_string()),
            base_image: Some(chain.oldest().base_image().to_string()),
            ..Default::default()
        };
        if anchor.has_external_image() {
            let updated = self
                .cluster
                .patch_kit_spec_image(&namespace, &name, squashed)
                .await?;
            patch.observed_generation = updated.metadata.generation;
            // Keeps the operator from rebuilding the kit
            patch.digest = Some(updated.compute_digest()?);
        }
        self.cluster
            .patch_kit_status(&namespace, &name, &patch)
            .await?;

        for dependent in &chain.dependents {
            tracing::debug!("Rebasing {} onto {}", dependent.display_name(), squashed);
            let patch = KitStatusPatch {
                base_image: Some(squashed.to_string()),
                ..Default::default()
            };
            self.cluster
                .patch_kit_status(
                    &dependent.namespace().unwrap_or_default(),
                    &dependent.name_any(),
                    &patch,
                )
                .await?;
        }

        for integration in self.usage.integrations_for(anchor.status_image()) {
            tracing::debug!(
                "Redeploying integration {} onto {}",
                integration.name_any(),
                squashed
            );
            self.cluster
                .patch_integration_image(
                    &integration.namespace().unwrap_or_default(),
                    &integration.name_any(),
                    squashed,
                )
                .await?;
        }
        Ok(())
    }
}
