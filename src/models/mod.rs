//! Camel K custom resource models
//!
//! Structure:
//! - `integration_kit.rs` - IntegrationKit (the unit being collected)
//! - `integration.rs` - Integration (the consumer of kit images)
//! - `platform.rs` - IntegrationPlatform (registry settings)
//! - `kit_phase.rs` - typed kit phases

pub mod integration;
pub mod integration_kit;
pub mod kit_phase;
pub mod platform;

pub use integration::{Integration, IntegrationSpec, IntegrationStatus, KitReference};
pub use integration_kit::{
    ConfigurationSpec, IntegrationKit, IntegrationKitSpec, IntegrationKitStatus,
};
pub use kit_phase::KitPhase;
pub use platform::{
    DEFAULT_PLATFORM_NAME, IntegrationPlatform, IntegrationPlatformSpec,
    IntegrationPlatformStatus, PlatformBuildSpec, RegistrySpec,
};
