//! Retention planning
//!
//! Decides, per kit tree, which kits are deleted outright and which chains
//! of kits are flattened into a single image. Planning never touches the
//! cluster or the registry.

use kube::ResourceExt;
use std::collections::HashMap;

use super::graph::{KitGraph, NodeId};
use super::usage::ImageUsage;
use crate::error::GcResult;
use crate::models::IntegrationKit;

/// Trim decisions for a tree, as graph node ids
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trim {
    pub to_delete: Vec<NodeId>,
    /// Each chain starts with the used kit that anchors it, followed by its
    /// consecutive unused ancestors, nearest first
    pub to_squash: Vec<Vec<NodeId>>,
}

impl Trim {
    fn extend(&mut self, other: Trim) {
        self.to_delete.extend(other.to_delete);
        self.to_squash.extend(other.to_squash);
    }
}

/// Trim one tree of the forest
///
/// Usage is first propagated bottom-up: a node counts the children that are
/// used directly or carry used descendants. Decisions are then taken in the
/// same child-first order, so a chain is always reported from its lowest
/// used kit.
pub fn trim(graph: &mut KitGraph, root: NodeId) -> Trim {
    let order = graph.parent_before_child(root);

    for &id in order.iter().rev() {
        let count = graph
            .node(id)
            .children()
            .iter()
            .filter(|&&child| graph.node(child).contributes_usage())
            .count();
        graph.record_used_by_children(id, count);
    }

    let mut trim = Trim::default();
    for &id in order.iter().rev() {
        let node = graph.node(id);
        if !node.is_used() {
            trim.to_delete.push(id);
        } else if graph.can_be_flattened(id, node.parent()) {
            let mut chain = vec![id];
            let mut next = node.parent();
            while let Some(ancestor) = next.filter(|&p| graph.can_be_flattened(id, Some(p))) {
                chain.push(ancestor);
                next = graph.node(ancestor).parent();
            }
            trim.to_squash.push(chain);
        }
    }
    trim
}

/// Trim every tree of the forest, roots in listing order
pub fn trim_all(graph: &mut KitGraph) -> Trim {
    let roots = graph.roots().to_vec();
    let mut all = Trim::default();
    for root in roots {
        all.extend(trim(graph, root));
    }
    all
}

/// A chain of kits flattened into one image
#[derive(Debug, Clone)]
pub struct SquashChain {
    /// Anchor first, then its unused ancestors up to the oldest one
    pub kits: Vec<IntegrationKit>,
    /// Kits built directly on top of the anchor
    pub dependents: Vec<IntegrationKit>,
}

impl SquashChain {
    /// The used kit whose image is rewritten
    pub fn anchor(&self) -> &IntegrationKit {
        &self.kits[0]
    }

    /// The oldest flattened kit; its base image becomes the new base
    pub fn oldest(&self) -> &IntegrationKit {
        &self.kits[self.kits.len() - 1]
    }

    /// Kit names, anchor first
    pub fn names(&self) -> Vec<String> {
        self.kits.iter().map(|k| k.name_any()).collect()
    }
}

/// Everything a run will do, in execution order: squash, then delete
#[derive(Debug, Clone, Default)]
pub struct GcPlan {
    pub to_squash: Vec<SquashChain>,
    pub to_delete: Vec<IntegrationKit>,
}

impl GcPlan {
    /// Full plan: flatten chains and delete every unused kit
    pub fn with_squash(kits: &[IntegrationKit], usage: &ImageUsage) -> GcResult<Self> {
        let mut graph = KitGraph::build(kits, usage)?;
        let trim = trim_all(&mut graph);
        Ok(Self::from_trim(&graph, &trim))
    }

    /// Resolve node ids of a trim back to kits
    ///
    /// A child of an anchor that is itself the oldest kit of another chain
    /// is flattened away; the anchor of that chain takes its place among the
    /// dependents, since it inherits the child's base image.
    pub fn from_trim(graph: &KitGraph, trim: &Trim) -> Self {
        let anchor_of: HashMap<NodeId, NodeId> = trim
            .to_squash
            .iter()
            .filter_map(|chain| chain.last().map(|&oldest| (oldest, chain[0])))
            .collect();
        let to_squash = trim
            .to_squash
            .iter()
            .map(|chain| SquashChain {
                kits: chain.iter().map(|&id| graph.node(id).kit.clone()).collect(),
                dependents: graph
                    .node(chain[0])
                    .children()
                    .iter()
                    .map(|id| anchor_of.get(id).unwrap_or(id))
                    .map(|&id| graph.node(id).kit.clone())
                    .collect(),
            })
            .collect();
        let to_delete = trim
            .to_delete
            .iter()
            .map(|&id| graph.node(id).kit.clone())
            .collect();
        Self {
            to_squash,
            to_delete,
        }
    }

    /// Deletion-only plan: every kit no Integration runs, no graph involved
    pub fn delete_only(kits: &[IntegrationKit], usage: &ImageUsage) -> Self {
        let to_delete = kits
            .iter()
            .filter(|kit| !usage.is_used(kit.status_image()))
            .cloned()
            .collect();
        Self {
            to_squash: Vec::new(),
            to_delete,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.to_squash.is_empty() && self.to_delete.is_empty()
    }
}
