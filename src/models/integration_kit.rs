//! IntegrationKit custom resource
//!
//! Only the fields the garbage collector reads or patches are modelled.
//! Status updates go through JSON merge patches, so unmodelled fields on the
//! live object are never overwritten.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use kube::{CustomResource, ResourceExt};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::KitPhase;

#[derive(CustomResource, Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[kube(
    group = "camel.apache.org",
    version = "v1",
    kind = "IntegrationKit",
    plural = "integrationkits",
    shortname = "ik",
    status = "IntegrationKitStatus",
    namespaced,
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationKitSpec {
    /// Container image supplied by a third party (external kits only)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub image: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub profile: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traits: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub configuration: Vec<ConfigurationSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub repositories: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct ConfigurationSpec {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationKitStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub phase: String,
    /// Image this kit was built FROM
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub base_image: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub image: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub digest: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub platform: String,
    /// Operator version the kit was configured for
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,
}

impl IntegrationKit {
    /// Resolved image of the kit, empty while unbuilt
    pub fn status_image(&self) -> &str {
        self.status.as_ref().map(|s| s.image.as_str()).unwrap_or("")
    }

    /// Recorded base image of the kit, empty when unknown
    pub fn base_image(&self) -> &str {
        self.status
            .as_ref()
            .map(|s| s.base_image.as_str())
            .unwrap_or("")
    }

    /// Platform the kit was configured for, empty for the default platform
    pub fn platform(&self) -> &str {
        self.status
            .as_ref()
            .map(|s| s.platform.as_str())
            .unwrap_or("")
    }

    /// Parsed phase; unknown strings are reported as `Err` with the raw value
    pub fn phase(&self) -> Result<KitPhase, String> {
        let raw = self.status.as_ref().map(|s| s.phase.as_str()).unwrap_or("");
        raw.parse::<KitPhase>().map_err(|_| raw.to_string())
    }

    /// Whether the kit pins its image through `spec.image`
    pub fn has_external_image(&self) -> bool {
        !self.spec.image.is_empty()
    }

    /// `name in namespace: ns` label used in logs and reports
    pub fn display_name(&self) -> String {
        format!(
            "{} in namespace: {}",
            self.name_any(),
            self.namespace().unwrap_or_default()
        )
    }

    /// Content digest the operator uses to decide whether a kit must be rebuilt
    ///
    /// Hashes the operator version, the spec image, dependencies,
    /// configuration, repositories and traits, then encodes the result as
    /// `v` followed by unpadded URL-safe base64.
    pub fn compute_digest(&self) -> Result<String, serde_json::Error> {
        let mut hasher = Sha256::new();
        let version = self
            .status
            .as_ref()
            .map(|s| s.version.as_str())
            .unwrap_or("");
        hasher.update(version.as_bytes());
        hasher.update(self.spec.image.as_bytes());
        for dependency in &self.spec.dependencies {
            hasher.update(dependency.as_bytes());
        }
        for item in &self.spec.configuration {
            hasher.update(format!("{}={}", item.kind, item.value).as_bytes());
        }
        for repository in &self.spec.repositories {
            hasher.update(repository.as_bytes());
        }
        if let Some(traits) = &self.spec.traits {
            hasher.update(serde_json::to_vec(traits)?);
        }
        Ok(format!("v{}", URL_SAFE_NO_PAD.encode(hasher.finalize())))
    }
}
