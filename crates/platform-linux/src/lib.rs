//! Lightbox Linux Platform Integration
//!
//! Platform-specific pieces for Linux:
//! - **Devices:** Video4Linux node enumeration via sysfs
//! - **Permissions:** Capability detection and user guidance

pub mod devices;
pub mod permissions;

pub use devices::*;
