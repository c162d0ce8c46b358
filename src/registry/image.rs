//! Image model as pulled from a registry
//!
//! The manifest is the distribution client's `OciImageManifest`; the config
//! blob is decoded into [`ImageConfig`], which keeps only what squashing
//! needs to rebuild an image (runtime config, rootfs diff ids, history).

use oci_distribution::manifest::{OciDescriptor, OciImageManifest};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub const DOCKER_MANIFEST_MEDIA_TYPE: &str =
    "application/vnd.docker.distribution.manifest.v2+json";
pub const DOCKER_CONFIG_MEDIA_TYPE: &str = "application/vnd.docker.container.image.v1+json";
pub const DOCKER_LAYER_GZIP_MEDIA_TYPE: &str = "application/vnd.docker.image.rootfs.diff.tar.gzip";
pub const DOCKER_LAYER_TAR_MEDIA_TYPE: &str = "application/vnd.docker.image.rootfs.diff.tar";
pub const OCI_MANIFEST_MEDIA_TYPE: &str = "application/vnd.oci.image.manifest.v1+json";
pub const OCI_CONFIG_MEDIA_TYPE: &str = "application/vnd.oci.image.config.v1+json";
pub const OCI_LAYER_GZIP_MEDIA_TYPE: &str = "application/vnd.oci.image.layer.v1.tar+gzip";
pub const OCI_LAYER_TAR_MEDIA_TYPE: &str = "application/vnd.oci.image.layer.v1.tar";

/// `sha256:<hex>` content digest of a byte slice
pub fn sha256_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("sha256:{:x}", hasher.finalize())
}

/// An image fetched from a registry
#[derive(Debug, Clone)]
pub struct RemoteImage {
    /// Reference the image was fetched by
    pub reference: String,
    /// Digest of the manifest
    pub digest: String,
    pub manifest: OciImageManifest,
    pub config: ImageConfig,
}

impl RemoteImage {
    /// Layer descriptors, base first
    pub fn layers(&self) -> &[OciDescriptor] {
        &self.manifest.layers
    }

    /// Whether the manifest uses Docker v2 media types rather than OCI ones
    pub fn is_docker_format(&self) -> bool {
        self.manifest
            .media_type
            .as_deref()
            .map(|m| m == DOCKER_MANIFEST_MEDIA_TYPE)
            .unwrap_or(false)
            || self.manifest.config.media_type == DOCKER_CONFIG_MEDIA_TYPE
    }

    /// Media type for a new gzip layer matching this image's format
    pub fn gzip_layer_media_type(&self) -> &'static str {
        if self.is_docker_format() {
            DOCKER_LAYER_GZIP_MEDIA_TYPE
        } else {
            OCI_LAYER_GZIP_MEDIA_TYPE
        }
    }
}

impl std::fmt::Display for RemoteImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.reference)
    }
}

/// Image configuration blob
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ImageConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub architecture: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub os: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    /// Runtime configuration (Env, Entrypoint, Cmd, WorkingDir, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<serde_json::Value>,
    #[serde(default)]
    pub rootfs: RootFs,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<History>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RootFs {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub diff_ids: Vec<String>,
}

impl Default for RootFs {
    fn default() -> Self {
        Self {
            kind: "layers".to_string(),
            diff_ids: Vec::new(),
        }
    }
}

/// One entry of an image's build history
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct History {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Marks history-only entries that did not produce a layer
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub empty_layer: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_digest_of_empty_input() {
        assert_eq!(
            sha256_digest(b""),
            "sha256:e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_config_round_trips_history_markers() {
        let raw = serde_json::json!({
            "architecture": "amd64",
            "os": "linux",
            "config": {"Env": ["A=1"]},
            "rootfs": {"type": "layers", "diff_ids": ["sha256:1"]},
            "history": [
                {"created_by": "ADD base"},
                {"created_by": "ENV A=1", "empty_layer": true}
            ]
        });
        let config: ImageConfig = serde_json::from_value(raw).unwrap();
        assert_eq!(config.history.len(), 2);
        assert!(!config.history[0].empty_layer);
        assert!(config.history[1].empty_layer);

        let encoded = serde_json::to_value(&config).unwrap();
        assert!(encoded["history"][0].get("empty_layer").is_none());
        assert_eq!(encoded["history"][1]["empty_layer"], true);
        assert_eq!(encoded["config"]["Env"][0], "A=1");
    }
}
