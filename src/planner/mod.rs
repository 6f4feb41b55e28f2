pub mod apply;
pub mod plan;
pub mod update;

pub use apply::{apply_plan, ApplySummary};
pub use plan::{Diagnostic, DiagnosticKind, DimensionChange, PlannedChange, ResourcePlan};
pub use update::{
    diff_allowlist, diff_tags, plan_groups, plan_resource, plan_users, validate_offline,
    validate_users, DeploymentReader, LiveDeployment, AUTOSCALING_GROUP,
};
