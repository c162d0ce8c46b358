//! IntegrationKit garbage collection
//!
//! Planning is pure: [`usage`] finds the images Integrations run, [`graph`]
//! links kits by base image and [`planner`] decides what to delete and what
//! to squash. Execution goes through the [`Cluster`](crate::cluster::Cluster)
//! and [`Registry`](crate::registry::Registry) collaborators.

pub mod delete;
pub mod graph;
pub mod planner;
pub mod report;
pub mod run;
pub mod squash;
pub mod usage;

pub use delete::Deleter;
pub use graph::{KitGraph, KitNode, NodeId};
pub use planner::{GcPlan, SquashChain, Trim, trim, trim_all};
pub use run::{GarbageCollector, GcOptions, ensure_settled};
pub use squash::Squasher;
pub use usage::ImageUsage;
