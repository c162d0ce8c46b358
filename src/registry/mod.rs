//! Container registry access
//!
//! The garbage collector talks to the registry through the [`Registry`]
//! trait so squash and delete logic can run against an in-memory registry in
//! tests. [`OciRegistry`] is the production implementation on top of the OCI
//! distribution protocol.

pub mod client;
pub mod image;
pub mod options;
pub mod reference;

pub use client::{OciRegistry, RegistryCredentials};
pub use image::{History, ImageConfig, RemoteImage, RootFs, sha256_digest};
pub use options::{RegistryOptions, RegistryOptionsCache};

use async_trait::async_trait;
use oci_distribution::Reference;
use oci_distribution::manifest::OciDescriptor;

use crate::error::GcResult;

/// An image reference together with how its registry must be reached
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryTarget {
    pub reference: Reference,
    /// Reach the registry over plain http
    pub insecure: bool,
}

impl RegistryTarget {
    pub fn new(reference: Reference, insecure: bool) -> Self {
        Self {
            reference,
            insecure,
        }
    }

    /// Target for another reference on the same registry
    pub fn sibling(&self, reference: Reference) -> Self {
        Self {
            reference,
            insecure: self.insecure,
        }
    }
}

impl std::fmt::Display for RegistryTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.reference.whole())
    }
}

/// Registry operations needed to squash and delete kit images
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Registry: Send + Sync {
    /// Fetch manifest and config of an image
    async fn fetch_image(&self, target: &RegistryTarget) -> GcResult<RemoteImage>;

    /// Fetch the raw bytes of a layer blob in the target's repository
    async fn fetch_blob(
        &self,
        target: &RegistryTarget,
        descriptor: &OciDescriptor,
    ) -> GcResult<Vec<u8>>;

    /// Upload a blob into the target's repository
    async fn push_blob(&self, target: &RegistryTarget, data: Vec<u8>, digest: &str)
    -> GcResult<()>;

    /// Upload a manifest under the target's tag or digest
    async fn push_manifest(
        &self,
        target: &RegistryTarget,
        manifest: Vec<u8>,
        media_type: &str,
    ) -> GcResult<()>;

    /// Remove the manifest the target points at
    async fn delete_image(&self, target: &RegistryTarget) -> GcResult<()>;
}
