//! Layer level operations: ancestry check, decoding and flattening
//!
//! Flattening merges several layer tarballs, lowest first, into a single
//! tarball. Whiteout markers from the merged layers are kept in the result:
//! the flattened layer sits on top of the preserved parent layers, and a
//! marker may still need to hide a file that lives in one of those.

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use oci_distribution::manifest::OciDescriptor;
use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::PathBuf;

use crate::error::{GcError, GcResult};
use crate::registry::image::{
    DOCKER_LAYER_TAR_MEDIA_TYPE, OCI_LAYER_TAR_MEDIA_TYPE, RemoteImage, sha256_digest,
};

const WHITEOUT_PREFIX: &str = ".wh.";
const OPAQUE_WHITEOUT: &str = ".wh..wh..opq";

/// Check that `parent`'s layers are a literal prefix of `child`'s
pub fn check_prefix(child: &RemoteImage, parent: &RemoteImage) -> GcResult<()> {
    let child_layers = child.layers();
    let parent_layers = parent.layers();
    if parent_layers.len() > child_layers.len() {
        return Err(GcError::TooFewLayers {
            child: child.reference.clone(),
            parent: parent.reference.clone(),
        });
    }
    for (index, (p, c)) in parent_layers.iter().zip(child_layers).enumerate() {
        if p.digest != c.digest {
            return Err(GcError::LayerMismatch {
                child: child.reference.clone(),
                parent: parent.reference.clone(),
                index,
            });
        }
    }
    Ok(())
}

/// Turn a fetched layer blob into a plain tarball
pub fn decompress(descriptor: &OciDescriptor, blob: Vec<u8>) -> GcResult<Vec<u8>> {
    let media_type = descriptor.media_type.as_str();
    if media_type.ends_with("gzip") {
        let mut tar = Vec::new();
        GzDecoder::new(blob.as_slice()).read_to_end(&mut tar)?;
        Ok(tar)
    } else if media_type == OCI_LAYER_TAR_MEDIA_TYPE
        || media_type == DOCKER_LAYER_TAR_MEDIA_TYPE
    {
        Ok(blob)
    } else {
        Err(GcError::UnsupportedMediaType {
            digest: descriptor.digest.clone(),
            media_type: media_type.to_string(),
        })
    }
}

/// A freshly built, compressed layer
#[derive(Debug, Clone)]
pub struct FlattenedLayer {
    /// gzip bytes as pushed to the registry
    pub data: Vec<u8>,
    /// Digest of the compressed bytes
    pub digest: String,
    /// Digest of the uncompressed tarball
    pub diff_id: String,
}

impl FlattenedLayer {
    /// Compress a tarball at the best compression level
    pub fn compress(tar: &[u8]) -> GcResult<Self> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
        encoder.write_all(tar)?;
        let data = encoder.finish()?;
        Ok(Self {
            digest: sha256_digest(&data),
            diff_id: sha256_digest(tar),
            data,
        })
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }
}

struct Entry {
    header: tar::Header,
    link_name: Option<PathBuf>,
    data: Vec<u8>,
}

/// Merge tarballs, lowest layer first, into one tarball
pub fn flatten(layers: &[Vec<u8>]) -> GcResult<Vec<u8>> {
    let mut merged: BTreeMap<String, Entry> = BTreeMap::new();

    for layer in layers {
        let entries = read_entries(layer)?;

        // Whiteouts only mask what lies below this layer
        for (path, _) in &entries {
            let (dir, name) = split(path);
            if name == OPAQUE_WHITEOUT {
                remove_under(&mut merged, dir);
            } else if let Some(hidden) = name.strip_prefix(WHITEOUT_PREFIX) {
                let hidden = join(dir, hidden);
                merged.remove(&hidden);
                remove_under(&mut merged, &hidden);
            }
        }

        for (path, entry) in entries {
            let (dir, name) = split(&path);
            if !name.starts_with(WHITEOUT_PREFIX) {
                merged.remove(&join(dir, &format!("{}{}", WHITEOUT_PREFIX, name)));
                if !entry.header.entry_type().is_dir() {
                    remove_under(&mut merged, &path);
                }
            }
            merged.insert(path, entry);
        }
    }

    let mut builder = tar::Builder::new(Vec::new());
    for (path, mut entry) in merged {
        match entry.link_name.take() {
            Some(target) => builder.append_link(&mut entry.header, &path, target)?,
            None => builder.append_data(&mut entry.header, &path, entry.data.as_slice())?,
        }
    }
    Ok(builder.into_inner()?)
}

fn read_entries(layer: &[u8]) -> GcResult<Vec<(String, Entry)>> {
    let mut archive = tar::Archive::new(layer);
    let mut entries = Vec::new();
    for entry in archive.entries()? {
        let mut entry = entry?;
        let path = normalize_path(&entry.path()?.to_string_lossy());
        if path.is_empty() {
            continue;
        }
        let header = entry.header().clone();
        let link_name = entry.link_name()?.map(|p| p.into_owned());
        let mut data = Vec::new();
        entry.read_to_end(&mut data)?;
        entries.push((
            path,
            Entry {
                header,
                link_name,
                data,
            },
        ));
    }
    Ok(entries)
}

fn normalize_path(path: &str) -> String {
    let path = path.trim_start_matches("./").trim_start_matches('/');
    path.trim_end_matches('/').to_string()
}

fn split(path: &str) -> (&str, &str) {
    match path.rsplit_once('/') {
        Some((dir, name)) => (dir, name),
        None => ("", path),
    }
}

fn join(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}

fn remove_under(merged: &mut BTreeMap<String, Entry>, dir: &str) {
    if dir.is_empty() {
        merged.clear();
        return;
    }
    let prefix = format!("{}/", dir);
    merged.retain(|path, _| !path.starts_with(&prefix));
}
