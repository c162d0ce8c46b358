//! In-memory cluster and registry shared by the integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{Read, Write};
use std::sync::Mutex;

use async_trait::async_trait;
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use kube::ResourceExt;
use oci_distribution::manifest::{OciDescriptor, OciImageManifest};

use kitgc::cluster::{Cluster, KitStatusPatch};
use kitgc::error::{GcError, GcResult};
use kitgc::models::{
    Integration, IntegrationKit, IntegrationKitSpec, IntegrationKitStatus, IntegrationPlatform,
    IntegrationPlatformSpec, IntegrationSpec, IntegrationStatus,
};
use kitgc::registry::image::{
    OCI_CONFIG_MEDIA_TYPE, OCI_LAYER_GZIP_MEDIA_TYPE, OCI_MANIFEST_MEDIA_TYPE,
};
use kitgc::registry::{
    History, ImageConfig, Registry, RegistryTarget, RemoteImage, RootFs, sha256_digest,
};

pub const NAMESPACE: &str = "camel";
pub const PLATFORM_BASE: &str = "quay.io/camel/base:21";

pub fn image(name: &str) -> String {
    format!("registry.local/{}/kit-{}:1", NAMESPACE, name)
}

pub fn kit(name: &str, parent: Option<&str>) -> IntegrationKit {
    kit_in_phase(name, parent, "Ready")
}

pub fn kit_in_phase(name: &str, parent: Option<&str>, phase: &str) -> IntegrationKit {
    let mut kit = IntegrationKit::new(name, IntegrationKitSpec::default());
    kit.metadata.namespace = Some(NAMESPACE.to_string());
    kit.status = Some(IntegrationKitStatus {
        phase: phase.to_string(),
        image: image(name),
        base_image: parent.map(image).unwrap_or_else(|| PLATFORM_BASE.to_string()),
        version: "2.5.0".to_string(),
        ..Default::default()
    });
    kit
}

pub fn integration(name: &str, kit: &str) -> Integration {
    let mut it = Integration::new(name, IntegrationSpec::default());
    it.metadata.namespace = Some(NAMESPACE.to_string());
    it.status = Some(IntegrationStatus {
        phase: "Running".to_string(),
        image: image(kit),
        ..Default::default()
    });
    it
}

/// Cluster state plus a log of every write
#[derive(Default)]
pub struct ClusterState {
    pub kits: Vec<IntegrationKit>,
    pub integrations: Vec<Integration>,
    pub spec_patches: Vec<(String, String)>,
    pub status_patches: Vec<(String, KitStatusPatch)>,
    pub integration_patches: Vec<(String, String)>,
    pub deleted_kits: Vec<String>,
}

pub struct FakeCluster {
    pub state: Mutex<ClusterState>,
}

impl FakeCluster {
    pub fn new(kits: Vec<IntegrationKit>, integrations: Vec<Integration>) -> Self {
        Self {
            state: Mutex::new(ClusterState {
                kits,
                integrations,
                ..Default::default()
            }),
        }
    }

    pub fn status_patch(&self, kit: &str) -> Option<KitStatusPatch> {
        self.state
            .lock()
            .unwrap()
            .status_patches
            .iter()
            .find(|(name, _)| name == kit)
            .map(|(_, patch)| patch.clone())
    }

    pub fn deleted_kits(&self) -> Vec<String> {
        self.state.lock().unwrap().deleted_kits.clone()
    }

    pub fn integration_patches(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().integration_patches.clone()
    }

    pub fn writes(&self) -> usize {
        let state = self.state.lock().unwrap();
        state.spec_patches.len()
            + state.status_patches.len()
            + state.integration_patches.len()
            + state.deleted_kits.len()
    }
}

#[async_trait]
impl Cluster for FakeCluster {
    async fn list_kits(&self, _namespace: &str) -> GcResult<Vec<IntegrationKit>> {
        Ok(self.state.lock().unwrap().kits.clone())
    }

    async fn list_integrations(&self, _namespace: &str) -> GcResult<Vec<Integration>> {
        Ok(self.state.lock().unwrap().integrations.clone())
    }

    async fn get_platform(&self, _namespace: &str, name: &str) -> GcResult<IntegrationPlatform> {
        Ok(IntegrationPlatform::new(
            name,
            IntegrationPlatformSpec::default(),
        ))
    }

    async fn patch_kit_spec_image(
        &self,
        _namespace: &str,
        name: &str,
        image: &str,
    ) -> GcResult<IntegrationKit> {
        let mut state = self.state.lock().unwrap();
        state
            .spec_patches
            .push((name.to_string(), image.to_string()));
        let mut kit = state
            .kits
            .iter()
            .find(|k| k.name_any() == name)
            .cloned()
            .unwrap();
        kit.spec.image = image.to_string();
        kit.metadata.generation = Some(kit.metadata.generation.unwrap_or(1) + 1);
        Ok(kit)
    }

    async fn patch_kit_status(
        &self,
        _namespace: &str,
        name: &str,
        patch: &KitStatusPatch,
    ) -> GcResult<()> {
        self.state
            .lock()
            .unwrap()
            .status_patches
            .push((name.to_string(), patch.clone()));
        Ok(())
    }

    async fn patch_integration_image(
        &self,
        _namespace: &str,
        name: &str,
        image: &str,
    ) -> GcResult<()> {
        self.state
            .lock()
            .unwrap()
            .integration_patches
            .push((name.to_string(), image.to_string()));
        Ok(())
    }

    async fn delete_kit(&self, _namespace: &str, name: &str) -> GcResult<()> {
        self.state
            .lock()
            .unwrap()
            .deleted_kits
            .push(name.to_string());
        Ok(())
    }
}

/// A gzip layer with its digests
#[derive(Debug, Clone)]
pub struct Layer {
    pub data: Vec<u8>,
    pub digest: String,
    pub diff_id: String,
}

impl Layer {
    pub fn new(files: &[(&str, &str)]) -> Self {
        let mut builder = tar::Builder::new(Vec::new());
        for (path, contents) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(contents.len() as u64);
            header.set_mode(0o644);
            builder
                .append_data(&mut header, path, contents.as_bytes())
                .unwrap();
        }
        let tar = builder.into_inner().unwrap();
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&tar).unwrap();
        let data = encoder.finish().unwrap();
        Self {
            digest: sha256_digest(&data),
            diff_id: sha256_digest(&tar),
            data,
        }
    }

    pub fn descriptor(&self) -> OciDescriptor {
        OciDescriptor {
            media_type: OCI_LAYER_GZIP_MEDIA_TYPE.to_string(),
            digest: self.digest.clone(),
            size: self.data.len() as i64,
            ..Default::default()
        }
    }
}

/// Build an image with one history entry per layer
pub fn remote_image(reference: &str, layers: &[&Layer]) -> RemoteImage {
    let history = layers
        .iter()
        .enumerate()
        .map(|(i, _)| History {
            created_by: Some(format!("{} step {}", reference, i)),
            ..Default::default()
        })
        .collect();
    let config = ImageConfig {
        architecture: "amd64".to_string(),
        os: "linux".to_string(),
        config: Some(serde_json::json!({ "Entrypoint": ["/deployments/run-java.sh"] })),
        rootfs: RootFs {
            kind: "layers".to_string(),
            diff_ids: layers.iter().map(|l| l.diff_id.clone()).collect(),
        },
        history,
        ..Default::default()
    };
    RemoteImage {
        reference: reference.to_string(),
        digest: sha256_digest(reference.as_bytes()),
        manifest: OciImageManifest {
            schema_version: 2,
            media_type: Some(OCI_MANIFEST_MEDIA_TYPE.to_string()),
            config: OciDescriptor {
                media_type: OCI_CONFIG_MEDIA_TYPE.to_string(),
                digest: sha256_digest(format!("config of {}", reference).as_bytes()),
                ..Default::default()
            },
            layers: layers.iter().map(|l| l.descriptor()).collect(),
            ..Default::default()
        },
        config,
    }
}

/// A manifest pushed to the registry
#[derive(Debug, Clone)]
pub struct PushedManifest {
    pub reference: String,
    pub manifest: OciImageManifest,
    pub media_type: String,
}

#[derive(Default)]
pub struct RegistryState {
    pub images: HashMap<String, RemoteImage>,
    pub blobs: HashMap<String, Vec<u8>>,
    pub manifests: Vec<PushedManifest>,
    pub deleted: Vec<String>,
    pub fail_deletes: bool,
}

pub struct FakeRegistry {
    pub state: Mutex<RegistryState>,
}

impl FakeRegistry {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RegistryState::default()),
        }
    }

    pub fn add_image(&self, image: RemoteImage, layers: &[&Layer]) {
        let mut state = self.state.lock().unwrap();
        for layer in layers {
            state.blobs.insert(layer.digest.clone(), layer.data.clone());
        }
        state.images.insert(image.reference.clone(), image);
    }

    pub fn fail_deletes(&self) {
        self.state.lock().unwrap().fail_deletes = true;
    }

    pub fn manifests(&self) -> Vec<PushedManifest> {
        self.state.lock().unwrap().manifests.clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.state.lock().unwrap().deleted.clone()
    }

    pub fn blob(&self, digest: &str) -> Option<Vec<u8>> {
        self.state.lock().unwrap().blobs.get(digest).cloned()
    }
}

#[async_trait]
impl Registry for FakeRegistry {
    async fn fetch_image(&self, target: &RegistryTarget) -> GcResult<RemoteImage> {
        let reference = target.to_string();
        self.state
            .lock()
            .unwrap()
            .images
            .get(&reference)
            .cloned()
            .ok_or_else(|| {
                GcError::registry("fetch image", reference, anyhow::anyhow!("not found"))
            })
    }

    async fn fetch_blob(
        &self,
        target: &RegistryTarget,
        descriptor: &OciDescriptor,
    ) -> GcResult<Vec<u8>> {
        self.blob(&descriptor.digest).ok_or_else(|| {
            GcError::registry("fetch blob", target.to_string(), anyhow::anyhow!("not found"))
        })
    }

    async fn push_blob(
        &self,
        _target: &RegistryTarget,
        data: Vec<u8>,
        digest: &str,
    ) -> GcResult<()> {
        assert_eq!(sha256_digest(&data), digest, "blob pushed under a wrong digest");
        self.state
            .lock()
            .unwrap()
            .blobs
            .insert(digest.to_string(), data);
        Ok(())
    }

    async fn push_manifest(
        &self,
        target: &RegistryTarget,
        manifest: Vec<u8>,
        media_type: &str,
    ) -> GcResult<()> {
        let reference = target.to_string();
        assert_eq!(
            target.reference.digest(),
            Some(sha256_digest(&manifest).as_str()),
            "manifest pushed under a wrong digest"
        );
        let manifest: OciImageManifest = serde_json::from_slice(&manifest)?;
        self.state.lock().unwrap().manifests.push(PushedManifest {
            reference,
            manifest,
            media_type: media_type.to_string(),
        });
        Ok(())
    }

    async fn delete_image(&self, target: &RegistryTarget) -> GcResult<()> {
        let reference = target.to_string();
        let mut state = self.state.lock().unwrap();
        if state.fail_deletes {
            return Err(GcError::registry(
                "delete image",
                reference,
                anyhow::anyhow!("405 Method Not Allowed"),
            ));
        }
        state.images.remove(&reference);
        state.deleted.push(reference);
        Ok(())
    }
}

/// Paths and contents of a gzip layer blob
pub fn layer_listing(blob: &[u8]) -> Vec<(String, String)> {
    let mut tar = Vec::new();
    GzDecoder::new(blob).read_to_end(&mut tar).unwrap();
    let mut archive = tar::Archive::new(tar.as_slice());
    archive
        .entries()
        .unwrap()
        .map(|entry| {
            let mut entry = entry.unwrap();
            let path = entry.path().unwrap().to_string_lossy().into_owned();
            let mut contents = String::new();
            entry.read_to_string(&mut contents).unwrap();
            (path, contents)
        })
        .collect()
}
