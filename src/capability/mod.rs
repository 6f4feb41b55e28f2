//! Typed views over Cloud Databases capability, group and access metadata.

pub mod allowlist;
pub mod autoscaling;
pub mod group;
pub mod version;

pub use allowlist::AllowlistEntry;
pub use autoscaling::{AutoScaling, AutoScalingRule};
pub use group::{Group, GroupResource, GroupResourceKind, HostFlavor};
pub use version::{AllowedUpgrade, SkipBackup, TransitionMethod, Version, VersionTransition};
