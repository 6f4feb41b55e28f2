//! Local record of credentials applied to each deployment.

pub mod models;
pub mod store;

pub use models::{fingerprint, ResourceState, StateFile, UserRecord};
pub use store::StateStore;
