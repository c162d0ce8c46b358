//! Garbage collection driver
//!
//! A run is split in two halves so callers can show the plan and ask for
//! confirmation in between:
//!
//! ```rust,no_run
//! use kitgc::cluster::KubeCluster;
//! use kitgc::gc::{GarbageCollector, GcOptions};
//! use kitgc::registry::OciRegistry;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = kube::Client::try_default().await?;
//! let cluster = KubeCluster::new(client);
//! let registry = OciRegistry::new(None);
//! let options = GcOptions {
//!     namespace: "default".to_string(),
//!     remove_images: true,
//!     ..Default::default()
//! };
//!
//! let mut collector = GarbageCollector::new(&cluster, &registry, "camel-k", Vec::new());
//! let (plan, usage) = collector.plan(&options).await?;
//! collector.execute(&plan, &usage, options.remove_images).await?;
//! # Ok(())
//! # }
//! ```

use kube::ResourceExt;

use super::delete::Deleter;
use super::planner::GcPlan;
use super::squash::Squasher;
use super::usage::ImageUsage;
use crate::cluster::Cluster;
use crate::error::{GcError, GcResult};
use crate::models::IntegrationKit;
use crate::registry::{Registry, RegistryOptionsCache};

/// What a run should do
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GcOptions {
    pub namespace: String,
    /// Only print the plan
    pub dry_run: bool,
    /// Do not ask for confirmation
    pub assume_yes: bool,
    /// Squash chains and delete registry images of deleted kits
    pub remove_images: bool,
}

/// Plans and executes garbage collection against one cluster and registry
pub struct GarbageCollector<'a> {
    cluster: &'a dyn Cluster,
    registry: &'a dyn Registry,
    options: RegistryOptionsCache,
}

impl<'a> GarbageCollector<'a> {
    pub fn new(
        cluster: &'a dyn Cluster,
        registry: &'a dyn Registry,
        default_platform: impl Into<String>,
        insecure_registries: Vec<String>,
    ) -> Self {
        Self {
            cluster,
            registry,
            options: RegistryOptionsCache::new(default_platform, insecure_registries),
        }
    }

    /// Read kits and integrations and decide what to do
    ///
    /// Fails without planning anything when a kit is still building.
    pub async fn plan(&self, options: &GcOptions) -> GcResult<(GcPlan, ImageUsage)> {
        let kits = self.cluster.list_kits(&options.namespace).await?;
        ensure_settled(&kits)?;
        let integrations = self.cluster.list_integrations(&options.namespace).await?;
        let usage = ImageUsage::analyze(&integrations);
        tracing::debug!(
            "Found {} kits and {} integrations using {} images in namespace {}",
            kits.len(),
            integrations.len(),
            usage.len(),
            options.namespace
        );

        let plan = if options.remove_images {
            GcPlan::with_squash(&kits, &usage)?
        } else {
            GcPlan::delete_only(&kits, &usage)
        };
        tracing::info!(
            "Planned {} squashes and {} deletions",
            plan.to_squash.len(),
            plan.to_delete.len()
        );
        Ok((plan, usage))
    }

    /// Squash every chain, then delete every planned kit
    pub async fn execute(
        &mut self,
        plan: &GcPlan,
        usage: &ImageUsage,
        remove_images: bool,
    ) -> GcResult<()> {
        let mut squasher = Squasher::new(self.cluster, self.registry, &mut self.options, usage);
        for chain in &plan.to_squash {
            let squashed = squasher.squash(chain).await?;
            tracing::info!("Kit {} now runs {}", chain.anchor().name_any(), squashed);
        }

        let mut deleter = Deleter::new(
            self.cluster,
            self.registry,
            &mut self.options,
            remove_images,
        );
        deleter.delete_all(&plan.to_delete).await?;
        tracing::info!("Deleted {} kits", plan.to_delete.len());
        Ok(())
    }
}

/// Every kit must be Ready or Error before anything is planned
pub fn ensure_settled(kits: &[IntegrationKit]) -> GcResult<()> {
    for kit in kits {
        let phase = match kit.phase() {
            Ok(phase) if phase.is_settled() => continue,
            Ok(phase) => phase.to_string(),
            Err(raw) => raw,
        };
        return Err(GcError::StillBuilding {
            namespace: kit.namespace().unwrap_or_default(),
            name: kit.name_any(),
            phase,
        });
    }
    Ok(())
}
