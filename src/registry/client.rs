//! OCI distribution registry client
//!
//! Pulls and pushes go through `oci_distribution::Client`. Manifest deletion
//! is not part of that client, so it is issued directly with `reqwest`
//! after resolving the tag to its manifest digest.

use async_trait::async_trait;
use oci_distribution::client::{Client, ClientConfig, ClientProtocol};
use oci_distribution::manifest::OciDescriptor;
use oci_distribution::secrets::RegistryAuth;
use oci_distribution::{Reference, RegistryOperation};
use reqwest::header::HeaderValue;

use super::image::{ImageConfig, RemoteImage, sha256_digest};
use super::{Registry, RegistryTarget};
use crate::error::{GcError, GcResult};

/// Basic credentials for the image registry
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryCredentials {
    pub username: String,
    pub password: String,
}

/// Registry implementation backed by the OCI distribution protocol
pub struct OciRegistry {
    secure: Client,
    insecure: Client,
    http: reqwest::Client,
    credentials: Option<RegistryCredentials>,
}

impl OciRegistry {
    pub fn new(credentials: Option<RegistryCredentials>) -> Self {
        Self {
            secure: Client::new(ClientConfig {
                protocol: ClientProtocol::Https,
                ..Default::default()
            }),
            insecure: Client::new(ClientConfig {
                protocol: ClientProtocol::Http,
                ..Default::default()
            }),
            http: reqwest::Client::new(),
            credentials,
        }
    }

    fn client(&self, target: &RegistryTarget) -> &Client {
        if target.insecure {
            &self.insecure
        } else {
            &self.secure
        }
    }

    fn auth(&self) -> RegistryAuth {
        match &self.credentials {
            Some(c) => RegistryAuth::Basic(c.username.clone(), c.password.clone()),
            None => RegistryAuth::Anonymous,
        }
    }

    /// Authenticate for push and delete, returning the bearer token if the
    /// registry handed one out
    async fn authenticate(&self, target: &RegistryTarget) -> GcResult<Option<String>> {
        self.client(target)
            .auth(&target.reference, &self.auth(), RegistryOperation::Push)
            .await
            .map_err(|e| GcError::registry("authenticate", target.to_string(), e))
    }

    fn manifest_url(target: &RegistryTarget, digest: &str) -> String {
        let scheme = if target.insecure { "http" } else { "https" };
        manifest_url(
            scheme,
            target.reference.resolve_registry(),
            target.reference.repository(),
            digest,
        )
    }
}

/// Credentials attached to requests sent outside the distribution client
#[derive(Debug, PartialEq)]
enum Authorization<'a> {
    Bearer(String),
    Basic(&'a RegistryCredentials),
    Anonymous,
}

impl<'a> Authorization<'a> {
    /// A token from the registry's auth exchange wins over static credentials
    fn choose(token: Option<String>, credentials: Option<&'a RegistryCredentials>) -> Self {
        match (token, credentials) {
            (Some(token), _) => Authorization::Bearer(token),
            (None, Some(credentials)) => Authorization::Basic(credentials),
            (None, None) => Authorization::Anonymous,
        }
    }
}

fn manifest_url(scheme: &str, registry: &str, repository: &str, digest: &str) -> String {
    format!("{}://{}/v2/{}/manifests/{}", scheme, registry, repository, digest)
}

#[async_trait]
impl Registry for OciRegistry {
    async fn fetch_image(&self, target: &RegistryTarget) -> GcResult<RemoteImage> {
        tracing::debug!("Fetching image {}", target);
        let (manifest, digest, config) = self
            .client(target)
            .pull_manifest_and_config(&target.reference, &self.auth())
            .await
            .map_err(|e| GcError::registry("pull manifest", target.to_string(), e))?;
        let config: ImageConfig = serde_json::from_str(&config)?;
        Ok(RemoteImage {
            reference: target.to_string(),
            digest,
            manifest,
            config,
        })
    }

    async fn fetch_blob(
        &self,
        target: &RegistryTarget,
        descriptor: &OciDescriptor,
    ) -> GcResult<Vec<u8>> {
        tracing::debug!("Fetching blob {} from {}", descriptor.digest, target);
        let mut data = Vec::with_capacity(usize::try_from(descriptor.size).unwrap_or(0));
        self.client(target)
            .pull_blob(&target.reference, descriptor, &mut data)
            .await
            .map_err(|e| GcError::registry("pull blob", descriptor.digest.clone(), e))?;
        let actual = sha256_digest(&data);
        if descriptor.digest.starts_with("sha256:") && actual != descriptor.digest {
            return Err(GcError::registry(
                "pull blob",
                descriptor.digest.clone(),
                anyhow::anyhow!("content digest mismatch: got {}", actual),
            ));
        }
        Ok(data)
    }

    async fn push_blob(
        &self,
        target: &RegistryTarget,
        data: Vec<u8>,
        digest: &str,
    ) -> GcResult<()> {
        tracing::debug!("Pushing blob {} ({} bytes) to {}", digest, data.len(), target);
        self.authenticate(target).await?;
        self.client(target)
            .push_blob(&target.reference, &data, digest)
            .await
            .map_err(|e| GcError::registry("push blob", digest.to_string(), e))?;
        Ok(())
    }

    async fn push_manifest(
        &self,
        target: &RegistryTarget,
        manifest: Vec<u8>,
        media_type: &str,
    ) -> GcResult<()> {
        tracing::debug!("Pushing manifest to {}", target);
        let content_type = HeaderValue::from_str(media_type)
            .map_err(|e| GcError::registry("push manifest", target.to_string(), e))?;
        self.authenticate(target).await?;
        self.client(target)
            .push_manifest_raw(&target.reference, manifest, content_type)
            .await
            .map_err(|e| GcError::registry("push manifest", target.to_string(), e))?;
        Ok(())
    }

    async fn delete_image(&self, target: &RegistryTarget) -> GcResult<()> {
        let digest = match target.reference.digest() {
            Some(digest) => digest.to_string(),
            None => self
                .client(target)
                .fetch_manifest_digest(&target.reference, &self.auth())
                .await
                .map_err(|e| GcError::registry("resolve digest", target.to_string(), e))?,
        };
        let url = Self::manifest_url(target, &digest);
        tracing::debug!("Deleting manifest {}", url);

        let token = self.authenticate(target).await?;
        let request = match Authorization::choose(token, self.credentials.as_ref()) {
            Authorization::Bearer(token) => self.http.delete(&url).bearer_auth(token),
            Authorization::Basic(c) => self
                .http
                .delete(&url)
                .basic_auth(&c.username, Some(&c.password)),
            Authorization::Anonymous => self.http.delete(&url),
        };
        let response = request
            .send()
            .await
            .map_err(|e| GcError::registry("delete", target.to_string(), e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(GcError::registry(
                "delete",
                target.to_string(),
                anyhow::anyhow!("registry answered {}", status),
            ));
        }
        Ok(())
    }
}

/// Parse `reference` and wrap it for a registry reached per `insecure`
pub fn target(reference: &str, insecure: bool) -> GcResult<RegistryTarget> {
    let reference: Reference = super::reference::parse(reference)?;
    Ok(RegistryTarget::new(reference, insecure))
}
