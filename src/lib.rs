//! Camel K IntegrationKit garbage collection
//!
//! Finds IntegrationKits no Integration runs anymore and deletes them. In
//! image mode it also rewrites chains of kits built on top of each other:
//! unused intermediate images are flattened into the image that is still in
//! use, and the old images are removed from the registry.
//!
//! The library is usable on its own; the `kitgc` binary is a thin front-end.

pub mod cli;
pub mod cluster;
pub mod config;
pub mod error;
pub mod gc;
pub mod kube;
pub mod models;
pub mod registry;

// Re-export commonly used types for convenience
pub use cluster::{Cluster, KitStatusPatch, KubeCluster};
pub use error::{GcError, GcResult};
pub use gc::{GarbageCollector, GcOptions, GcPlan, ImageUsage, KitGraph, SquashChain};
pub use registry::{OciRegistry, Registry, RegistryTarget};
