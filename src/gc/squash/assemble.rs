//! Building the squashed image
//!
//! The new image keeps every layer of the parent exactly as published, then
//! adds one flattened layer holding everything the child added on top.

use oci_distribution::manifest::{OciDescriptor, OciImageManifest};

use super::layers::FlattenedLayer;
use crate::error::{GcError, GcResult};
use crate::registry::image::{
    History, ImageConfig, OCI_MANIFEST_MEDIA_TYPE, RemoteImage, RootFs, sha256_digest,
};

/// One history entry of the parent, with the layer it produced if any
#[derive(Debug, Clone)]
pub struct Addendum {
    pub layer: Option<(OciDescriptor, String)>,
    pub history: History,
}

/// Pair the parent's history with its layers
///
/// Entries marked as empty layers contribute history only. Every other
/// entry consumes the next layer and its diff id. Layers left over once the
/// history is exhausted are appended with a blank history entry.
pub fn parent_addendums(parent: &RemoteImage) -> GcResult<Vec<Addendum>> {
    let layers = parent.layers();
    let diff_ids = &parent.config.rootfs.diff_ids;
    if diff_ids.len() < layers.len() {
        return Err(GcError::MalformedHistory {
            image: parent.reference.clone(),
            reason: format!("{} layers but {} diff ids", layers.len(), diff_ids.len()),
        });
    }

    let mut addendums = Vec::with_capacity(parent.config.history.len());
    let mut next = 0;
    for history in &parent.config.history {
        if history.empty_layer {
            addendums.push(Addendum {
                layer: None,
                history: history.clone(),
            });
            continue;
        }
        let Some(descriptor) = layers.get(next) else {
            return Err(GcError::MalformedHistory {
                image: parent.reference.clone(),
                reason: format!("history references more than {} layers", layers.len()),
            });
        };
        addendums.push(Addendum {
            layer: Some((descriptor.clone(), diff_ids[next].clone())),
            history: history.clone(),
        });
        next += 1;
    }
    for (descriptor, diff_id) in layers.iter().zip(diff_ids).skip(next) {
        addendums.push(Addendum {
            layer: Some((descriptor.clone(), diff_id.clone())),
            history: History::default(),
        });
    }
    Ok(addendums)
}

/// A complete image ready to be pushed
#[derive(Debug, Clone)]
pub struct SquashedImage {
    pub layer: FlattenedLayer,
    pub config: Vec<u8>,
    pub config_digest: String,
    pub manifest: Vec<u8>,
    pub manifest_digest: String,
    pub manifest_media_type: String,
}

/// Assemble the squashed image for `child` on top of `parent`
pub fn assemble(
    child: &RemoteImage,
    parent: &RemoteImage,
    layer: FlattenedLayer,
) -> GcResult<SquashedImage> {
    let mut config = ImageConfig {
        created: child.config.created.clone(),
        author: child.config.author.clone(),
        architecture: child.config.architecture.clone(),
        os: child.config.os.clone(),
        variant: child.config.variant.clone(),
        config: child.config.config.clone(),
        rootfs: RootFs::default(),
        history: Vec::new(),
    };
    let mut layers = Vec::new();

    for addendum in parent_addendums(parent)? {
        if let Some((descriptor, diff_id)) = addendum.layer {
            layers.push(descriptor);
            config.rootfs.diff_ids.push(diff_id);
        }
        config.history.push(addendum.history);
    }

    let squashed_history = child
        .config
        .history
        .get(parent.config.history.len()..)
        .unwrap_or_default();
    config.history.push(History {
        created: child.config.created.clone(),
        created_by: Some(format!(
            "Flattened Image layers {} through {} into a single layer",
            parent.digest, child.digest
        )),
        comment: Some(serde_json::to_string(squashed_history)?),
        ..Default::default()
    });
    config.rootfs.diff_ids.push(layer.diff_id.clone());
    layers.push(OciDescriptor {
        media_type: child.gzip_layer_media_type().to_string(),
        digest: layer.digest.clone(),
        size: layer.size() as i64,
        ..Default::default()
    });

    let config_bytes = serde_json::to_vec(&config)?;
    let config_digest = sha256_digest(&config_bytes);
    let manifest = OciImageManifest {
        config: OciDescriptor {
            media_type: child.manifest.config.media_type.clone(),
            digest: config_digest.clone(),
            size: config_bytes.len() as i64,
            ..Default::default()
        },
        layers,
        annotations: child.manifest.annotations.clone(),
        ..child.manifest.clone()
    };
    let manifest_media_type = manifest
        .media_type
        .clone()
        .unwrap_or_else(|| OCI_MANIFEST_MEDIA_TYPE.to_string());
    let manifest_bytes = serde_json::to_vec(&manifest)?;

    Ok(SquashedImage {
        layer,
        config: config_bytes,
        config_digest,
        manifest_digest: sha256_digest(&manifest_bytes),
        manifest: manifest_bytes,
        manifest_media_type,
    })
}
