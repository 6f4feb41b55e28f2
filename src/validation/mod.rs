//! Rules that gate upgrade, scaling and user requests before they reach the API.

pub mod scaling;
pub mod upgrade;
pub mod user;

pub use scaling::{validate_group_scaling, ScalingError};
pub use upgrade::{check_upgrade, UpgradeError, UpgradeValidator, VersionSource};
pub use user::{DatabaseUser, UserType, UserValidationError};
