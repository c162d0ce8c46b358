//! IntegrationPlatform custom resource
//!
//! Read only to find out whether a kit's registry must be reached over
//! plain http.

use kube::CustomResource;
use serde::{Deserialize, Serialize};

/// Name used when a kit does not record its platform
pub const DEFAULT_PLATFORM_NAME: &str = "camel-k";

#[derive(CustomResource, Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[kube(
    group = "camel.apache.org",
    version = "v1",
    kind = "IntegrationPlatform",
    plural = "integrationplatforms",
    shortname = "ip",
    status = "IntegrationPlatformStatus",
    namespaced,
    schema = "disabled"
)]
pub struct IntegrationPlatformSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<PlatformBuildSpec>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct IntegrationPlatformStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<PlatformBuildSpec>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct PlatformBuildSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry: Option<RegistrySpec>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct RegistrySpec {
    #[serde(default)]
    pub insecure: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub address: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub organization: String,
}

impl IntegrationPlatform {
    /// Whether the platform's build registry is served over http
    ///
    /// The observed status wins; the spec is consulted only when the
    /// operator has not reconciled the platform yet.
    pub fn registry_insecure(&self) -> bool {
        let from = |build: Option<&PlatformBuildSpec>| {
            build
                .and_then(|b| b.registry.as_ref())
                .map(|r| r.insecure)
        };
        from(self.status.as_ref().and_then(|s| s.build.as_ref()))
            .or_else(|| from(self.spec.build.as_ref()))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_takes_precedence_over_spec() {
        let mut platform = IntegrationPlatform::new(
            DEFAULT_PLATFORM_NAME,
            IntegrationPlatformSpec {
                build: Some(PlatformBuildSpec {
                    registry: Some(RegistrySpec {
                        insecure: true,
                        ..Default::default()
                    }),
                }),
            },
        );
        assert!(platform.registry_insecure());

        platform.status = Some(IntegrationPlatformStatus {
            build: Some(PlatformBuildSpec {
                registry: Some(RegistrySpec::default()),
            }),
        });
        assert!(!platform.registry_insecure());
    }

    #[test]
    fn test_missing_registry_is_secure() {
        let platform = IntegrationPlatform::new("p", IntegrationPlatformSpec::default());
        assert!(!platform.registry_insecure());
    }
}
