//! Cluster API access
//!
//! Listing, patching and deleting Camel K resources goes through the
//! [`Cluster`] trait. [`KubeCluster`] implements it with kube-rs; tests use
//! mocks or an in-memory fake.

use async_trait::async_trait;
use kube::Api;
use kube::api::{DeleteParams, ListParams, Patch, PatchParams};
use serde::Serialize;
use serde_json::json;

use crate::error::{GcError, GcResult};
use crate::models::{Integration, IntegrationKit, IntegrationPlatform};

/// Fields of `IntegrationKit.status` rewritten by a squash
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct KitStatusPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

/// Cluster operations needed by the garbage collector
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Cluster: Send + Sync {
    async fn list_kits(&self, namespace: &str) -> GcResult<Vec<IntegrationKit>>;

    async fn list_integrations(&self, namespace: &str) -> GcResult<Vec<Integration>>;

    async fn get_platform(&self, namespace: &str, name: &str) -> GcResult<IntegrationPlatform>;

    /// Rewrite `spec.image` of an external kit, returning the updated object
    async fn patch_kit_spec_image(
        &self,
        namespace: &str,
        name: &str,
        image: &str,
    ) -> GcResult<IntegrationKit>;

    async fn patch_kit_status(
        &self,
        namespace: &str,
        name: &str,
        patch: &KitStatusPatch,
    ) -> GcResult<()>;

    async fn patch_integration_image(
        &self,
        namespace: &str,
        name: &str,
        image: &str,
    ) -> GcResult<()>;

    async fn delete_kit(&self, namespace: &str, name: &str) -> GcResult<()>;
}

/// kube-rs backed cluster access
pub struct KubeCluster {
    client: kube::Client,
}

impl KubeCluster {
    pub fn new(client: kube::Client) -> Self {
        Self { client }
    }

    fn kits(&self, namespace: &str) -> Api<IntegrationKit> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn integrations(&self, namespace: &str) -> Api<Integration> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl Cluster for KubeCluster {
    async fn list_kits(&self, namespace: &str) -> GcResult<Vec<IntegrationKit>> {
        let list = self
            .kits(namespace)
            .list(&ListParams::default())
            .await
            .map_err(|e| {
                GcError::cluster(
                    format!("could not retrieve IntegrationKits from namespace {}", namespace),
                    e,
                )
            })?;
        Ok(list.items)
    }

    async fn list_integrations(&self, namespace: &str) -> GcResult<Vec<Integration>> {
        let list = self
            .integrations(namespace)
            .list(&ListParams::default())
            .await
            .map_err(|e| {
                GcError::cluster(
                    format!("could not retrieve Integrations from namespace {}", namespace),
                    e,
                )
            })?;
        Ok(list.items)
    }

    async fn get_platform(&self, namespace: &str, name: &str) -> GcResult<IntegrationPlatform> {
        let api: Api<IntegrationPlatform> = Api::namespaced(self.client.clone(), namespace);
        api.get(name).await.map_err(|e| {
            GcError::cluster(
                format!("could not get IntegrationPlatform {}/{}", namespace, name),
                e,
            )
        })
    }

    async fn patch_kit_spec_image(
        &self,
        namespace: &str,
        name: &str,
        image: &str,
    ) -> GcResult<IntegrationKit> {
        let patch = json!({ "spec": { "image": image } });
        self.kits(namespace)
            .patch(name, &PatchParams::default(), &Patch::Merge(patch))
            .await
            .map_err(|e| {
                GcError::cluster(format!("could not patch spec of kit {}/{}", namespace, name), e)
            })
    }

    async fn patch_kit_status(
        &self,
        namespace: &str,
        name: &str,
        patch: &KitStatusPatch,
    ) -> GcResult<()> {
        let patch = json!({ "status": patch });
        self.kits(namespace)
            .patch_status(name, &PatchParams::default(), &Patch::Merge(patch))
            .await
            .map_err(|e| {
                GcError::cluster(
                    format!("could not patch status of kit {}/{}", namespace, name),
                    e,
                )
            })?;
        Ok(())
    }

    async fn patch_integration_image(
        &self,
        namespace: &str,
        name: &str,
        image: &str,
    ) -> GcResult<()> {
        let patch = json!({ "status": { "image": image } });
        self.integrations(namespace)
            .patch_status(name, &PatchParams::default(), &Patch::Merge(patch))
            .await
            .map_err(|e| {
                GcError::cluster(
                    format!("could not patch status of integration {}/{}", namespace, name),
                    e,
                )
            })?;
        Ok(())
    }

    async fn delete_kit(&self, namespace: &str, name: &str) -> GcResult<()> {
        self.kits(namespace)
            .delete(name, &DeleteParams::default())
            .await
            .map_err(|e| {
                GcError::cluster(format!("could not delete kit {}/{}", namespace, name), e)
            })?;
        Ok(())
    }
}
