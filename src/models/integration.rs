//! Integration custom resource
//!
//! The garbage collector only cares about which image an Integration runs,
//! so the spec is carried as an opaque map.

use kube::CustomResource;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(CustomResource, Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[kube(
    group = "camel.apache.org",
    version = "v1",
    kind = "Integration",
    plural = "integrations",
    shortname = "it",
    status = "IntegrationStatus",
    namespaced,
    schema = "disabled"
)]
pub struct IntegrationSpec {
    #[serde(flatten)]
    pub fields: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationStatus {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub phase: String,
    /// Image the integration is deployed from
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integration_kit: Option<KitReference>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct KitReference {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub namespace: String,
}

impl Integration {
    /// Image currently deployed, empty when not yet resolved
    pub fn status_image(&self) -> &str {
        self.status.as_ref().map(|s| s.image.as_str()).unwrap_or("")
    }
}
