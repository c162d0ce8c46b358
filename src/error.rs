//! Error kinds surfaced by the garbage collector
//!
//! Every variant carries the kit or image identifiers needed to diagnose the
//! failure. All of them abort the run; nothing here is retried.

/// Garbage collection errors
#[derive(Debug, thiserror::Error)]
pub enum GcError {
    #[error(
        "IntegrationKit {name} in namespace {namespace} is still building (phase {phase:?}). \
         GC should be run when no new integrations are being created and integrationkits are done building"
    )]
    StillBuilding {
        namespace: String,
        name: String,
        phase: String,
    },

    #[error("base image {base_image} on kit {kit} is not referencing base kit's image {parent_image}")]
    BaseImageMismatch {
        kit: String,
        base_image: String,
        parent_image: String,
    },

    #[error("kit {kit} is part of a base image cycle")]
    Cycle { kit: String },

    #[error("image {child:?} is not based on {parent:?} (too few layers)")]
    TooFewLayers { child: String, parent: String },

    #[error("image {child:?} is not based on {parent:?} (layer {index} mismatch)")]
    LayerMismatch {
        child: String,
        parent: String,
        index: usize,
    },

    #[error("image {image} has a malformed history: {reason}")]
    MalformedHistory { image: String, reason: String },

    #[error("layer {digest} has unsupported media type {media_type}")]
    UnsupportedMediaType { digest: String, media_type: String },

    #[error("invalid image reference {reference:?}: {reason}")]
    InvalidReference { reference: String, reason: String },

    #[error("registry operation {operation} failed for {reference}")]
    Registry {
        operation: &'static str,
        reference: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("kubernetes API call failed: {action}")]
    Cluster {
        action: String,
        #[source]
        source: kube::Error,
    },

    #[error("failed to process layer data")]
    Layer(#[from] std::io::Error),

    #[error("failed to encode image metadata")]
    Serialization(#[from] serde_json::Error),
}

impl GcError {
    /// Wrap a registry failure with the operation and image it concerns
    pub fn registry(
        operation: &'static str,
        reference: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        GcError::Registry {
            operation,
            reference: reference.into(),
            source: source.into(),
        }
    }

    /// Wrap a Kubernetes API failure with a description of the attempted action
    pub fn cluster(action: impl Into<String>, source: kube::Error) -> Self {
        GcError::Cluster {
            action: action.into(),
            source,
        }
    }

    /// Whether this error comes from the layer-prefix integrity check
    pub fn is_integrity(&self) -> bool {
        matches!(
            self,
            GcError::TooFewLayers { .. } | GcError::LayerMismatch { .. }
        )
    }
}

/// Result type for garbage collection operations
pub type GcResult<T> = Result<T, GcError>;
