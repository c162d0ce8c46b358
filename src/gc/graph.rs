//! Kit dependency forest
//!
//! Every kit with a resolved image becomes a node. A kit's recorded base
//! image names its parent: the kit whose image it was built FROM. Nodes live
//! in a single arena and refer to each other by index; `children` are the
//! owning edges, `parent` is a plain lookup.

use kube::ResourceExt;
use std::collections::HashMap;

use super::usage::ImageUsage;
use crate::error::{GcError, GcResult};
use crate::models::IntegrationKit;
use crate::registry::reference;

/// Index of a node in a [`KitGraph`]
pub type NodeId = usize;

/// One IntegrationKit in the forest
#[derive(Debug, Clone)]
pub struct KitNode {
    pub kit: IntegrationKit,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    directly_used: bool,
    used_by_children: Option<usize>,
}

impl KitNode {
    fn new(kit: IntegrationKit, directly_used: bool) -> Self {
        Self {
            kit,
            parent: None,
            children: Vec::new(),
            directly_used,
            used_by_children: None,
        }
    }

    /// Kit whose image this kit was built from, if it is tracked
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Kits built from this kit's image, in listing order
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Whether an Integration runs this kit's image
    pub fn is_directly_used(&self) -> bool {
        self.directly_used
    }

    /// How many children are in use, directly or through their own
    /// descendants. `None` until the planner has propagated usage through
    /// this node's subtree.
    pub fn used_by_children(&self) -> Option<usize> {
        self.used_by_children
    }

    /// A kit is kept as a distinct layer boundary when an Integration points
    /// at it, or when at least two in-use branches build on it.
    pub fn is_used(&self) -> bool {
        debug_assert!(
            self.used_by_children.is_some(),
            "usage read before propagation for kit {}",
            self.kit.name_any()
        );
        self.directly_used || self.used_by_children.unwrap_or(0) > 1
    }

    /// Whether this node counts as in use from its parent's point of view
    pub(super) fn contributes_usage(&self) -> bool {
        self.directly_used || self.used_by_children.unwrap_or(0) > 0
    }
}

/// Forest of kits linked by base image
#[derive(Debug, Clone, Default)]
pub struct KitGraph {
    nodes: Vec<KitNode>,
    roots: Vec<NodeId>,
}

impl KitGraph {
    /// Build the forest from a flat kit listing
    ///
    /// Kits without a status image are skipped. Base images are matched
    /// against kit images after normalization; a match whose recorded
    /// strings differ is an integrity failure, as is any loop of base images.
    pub fn build(kits: &[IntegrationKit], usage: &ImageUsage) -> GcResult<Self> {
        let mut nodes: Vec<KitNode> = Vec::new();
        let mut index: HashMap<String, NodeId> = HashMap::new();

        for kit in kits {
            let image = kit.status_image();
            if image.is_empty() {
                continue;
            }
            let key = lookup_key(image);
            if let Some(&existing) = index.get(&key) {
                tracing::warn!(
                    "Kit {} reports image {} already owned by kit {}, leaving it untouched",
                    kit.display_name(),
                    image,
                    nodes[existing].kit.display_name()
                );
                continue;
            }
            index.insert(key, nodes.len());
            nodes.push(KitNode::new(kit.clone(), usage.is_used(image)));
        }

        for id in 0..nodes.len() {
            let base_image = nodes[id].kit.base_image().to_string();
            if base_image.is_empty() {
                continue;
            }
            // Base image is not a kit, e.g. the platform's root image
            let Some(&parent) = index.get(&lookup_key(&base_image)) else {
                continue;
            };
            if parent == id {
                return Err(GcError::Cycle {
                    kit: nodes[id].kit.display_name(),
                });
            }
            let parent_image = nodes[parent].kit.status_image();
            if parent_image != base_image {
                return Err(GcError::BaseImageMismatch {
                    kit: nodes[id].kit.display_name(),
                    base_image,
                    parent_image: parent_image.to_string(),
                });
            }
            nodes[id].parent = Some(parent);
            nodes[parent].children.push(id);
        }

        let roots: Vec<NodeId> = (0..nodes.len())
            .filter(|&id| nodes[id].parent.is_none())
            .collect();
        let graph = Self { nodes, roots };
        graph.ensure_acyclic()?;
        Ok(graph)
    }

    /// Nodes unreachable from any root sit on a base image loop
    fn ensure_acyclic(&self) -> GcResult<()> {
        let mut reached = vec![false; self.nodes.len()];
        for &root in &self.roots {
            for id in self.parent_before_child(root) {
                reached[id] = true;
            }
        }
        match reached.iter().position(|r| !r) {
            Some(id) => Err(GcError::Cycle {
                kit: self.nodes[id].kit.display_name(),
            }),
            None => Ok(()),
        }
    }

    pub fn node(&self, id: NodeId) -> &KitNode {
        &self.nodes[id]
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Find a node by kit name
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.nodes.iter().position(|n| n.kit.name_any() == name)
    }

    /// All nodes of a subtree, every node strictly before its descendants
    ///
    /// Built with an explicit stack: pop a node, append it, push its
    /// children. A node is appended before any of its children are even
    /// pushed, so walking the result backwards visits children first.
    pub fn parent_before_child(&self, root: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.nodes[id].children.iter().copied());
        }
        order
    }

    /// A used child can be flattened into an unused parent
    pub fn can_be_flattened(&self, child: NodeId, parent: Option<NodeId>) -> bool {
        self.nodes[child].is_used() && parent.is_some_and(|p| !self.nodes[p].is_used())
    }

    pub(super) fn record_used_by_children(&mut self, id: NodeId, count: usize) {
        self.nodes[id].used_by_children = Some(count);
    }
}

fn lookup_key(image: &str) -> String {
    reference::normalize(image).unwrap_or_else(|| image.to_string())
}
