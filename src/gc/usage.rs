//! Image usage analysis
//!
//! Maps every image reference to the Integrations currently deployed from it.

use std::collections::HashMap;

use crate::models::Integration;

/// Integrations grouped by the image they run
#[derive(Debug, Clone, Default)]
pub struct ImageUsage {
    by_image: HashMap<String, Vec<Integration>>,
}

impl ImageUsage {
    /// Group integrations by `status.image`
    ///
    /// Integrations that have not resolved an image yet are skipped, so an
    /// empty image never counts as used.
    pub fn analyze(integrations: &[Integration]) -> Self {
        let mut by_image: HashMap<String, Vec<Integration>> = HashMap::new();
        for integration in integrations {
            let image = integration.status_image();
            if image.is_empty() {
                continue;
            }
            by_image
                .entry(image.to_string())
                .or_default()
                .push(integration.clone());
        }
        Self { by_image }
    }

    /// Integrations running `image`
    pub fn integrations_for(&self, image: &str) -> &[Integration] {
        self.by_image.get(image).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether at least one integration runs `image`
    pub fn is_used(&self, image: &str) -> bool {
        !self.integrations_for(image).is_empty()
    }

    /// Number of distinct images in use
    pub fn len(&self) -> usize {
        self.by_image.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_image.is_empty()
    }
}
