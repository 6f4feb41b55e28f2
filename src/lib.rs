pub mod capability;
pub mod client;
pub mod config;
pub mod hcl;
pub mod output;
pub mod planner;
pub mod state;
pub mod validation;
