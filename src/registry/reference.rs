//! Image reference helpers
//!
//! Kit status fields store image references as free-form strings. Parsing
//! goes through `oci_distribution::Reference`; these helpers add the
//! normalized form used to match base images against kit images and the
//! digest-pinned form written after a squash.

use oci_distribution::Reference;

use crate::error::{GcError, GcResult};

/// Parse an image reference string
pub fn parse(image: &str) -> GcResult<Reference> {
    image
        .parse::<Reference>()
        .map_err(|e| GcError::InvalidReference {
            reference: image.to_string(),
            reason: e.to_string(),
        })
}

/// Normalized spelling of an image reference
///
/// Fills in the default registry and the `latest` tag so that
/// `alpine` and `docker.io/library/alpine:latest` compare equal. Returns
/// `None` for strings that do not parse as references.
pub fn normalize(image: &str) -> Option<String> {
    let reference = image.parse::<Reference>().ok()?;
    let mut normalized = format!("{}/{}", reference.registry(), reference.repository());
    match (reference.tag(), reference.digest()) {
        (Some(tag), _) => {
            normalized.push(':');
            normalized.push_str(tag);
        }
        (None, None) => normalized.push_str(":latest"),
        (None, Some(_)) => {}
    }
    if let Some(digest) = reference.digest() {
        normalized.push('@');
        normalized.push_str(digest);
    }
    Some(normalized)
}

/// `<registry>/<repository>@<digest>` for an image in the same repository
pub fn pinned(repository_of: &Reference, digest: &str) -> String {
    format!(
        "{}/{}@{}",
        repository_of.registry(),
        repository_of.repository(),
        digest
    )
}
