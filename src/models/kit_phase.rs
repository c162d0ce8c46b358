//! IntegrationKit phase definitions
//!
//! Kit phases are plain strings on the wire. This enum keeps the handful
//! of values the garbage collector reasons about in one place.

use std::fmt;
use std::str::FromStr;

/// Lifecycle phase reported in `status.phase` of an IntegrationKit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KitPhase {
    None,
    Initialization,
    WaitingForPlatform,
    BuildSubmitted,
    BuildRunning,
    Ready,
    Error,
}

impl KitPhase {
    /// Get the wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            KitPhase::None => "",
            KitPhase::Initialization => "Initialization",
            KitPhase::WaitingForPlatform => "Waiting For Platform",
            KitPhase::BuildSubmitted => "Build Submitted",
            KitPhase::BuildRunning => "Build Running",
            KitPhase::Ready => "Ready",
            KitPhase::Error => "Error",
        }
    }

    /// A kit is settled once its build either produced an image or failed.
    /// Anything else means the eventual image is still unknown.
    pub fn is_settled(&self) -> bool {
        matches!(self, KitPhase::Ready | KitPhase::Error)
    }
}

impl fmt::Display for KitPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for KitPhase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" => Ok(KitPhase::None),
            "Initialization" => Ok(KitPhase::Initialization),
            "Waiting For Platform" => Ok(KitPhase::WaitingForPlatform),
            "Build Submitted" => Ok(KitPhase::BuildSubmitted),
            "Build Running" => Ok(KitPhase::BuildRunning),
            "Ready" => Ok(KitPhase::Ready),
            "Error" => Ok(KitPhase::Error),
            other => Err(format!("Unknown IntegrationKit phase: {}", other)),
        }
    }
}
