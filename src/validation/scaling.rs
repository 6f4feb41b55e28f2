use thiserror::Error;

use crate::capability::GroupResource;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScalingError {
    #[error("{group_id} can not change {resource} value after create")]
    NotAdjustable { group_id: String, resource: String },

    #[error("{group_id} group {resource} must be >= {minimum} and <= {maximum} in increments of {step_size}")]
    OutOfRange {
        group_id: String,
        resource: String,
        minimum: i64,
        maximum: i64,
        step_size: i64,
    },

    #[error("can not scale {group_id} group {resource} below {allocation} to {requested}")]
    ScaleDown {
        group_id: String,
        resource: String,
        allocation: i64,
        requested: i64,
    },
}

/// A zero step from the backend means any value within bounds.
fn off_step(requested: i64, resource: &GroupResource) -> bool {
    if resource.step_size <= 0 {
        return false;
    }
    let offset = i128::from(requested) - i128::from(resource.minimum);
    offset % i128::from(resource.step_size) != 0
}

/// Validate a requested value for one dimension of a group.
///
/// Rules apply in order: adjustability, then step and bounds, then scale-down.
/// `_node_count` is carried for callers but no rule depends on it.
pub fn validate_group_scaling(
    group_id: &str,
    resource_name: &str,
    requested: i64,
    resource: &GroupResource,
    _node_count: i64,
) -> Result<(), ScalingError> {
    if !resource.is_adjustable {
        return Err(ScalingError::NotAdjustable {
            group_id: group_id.to_string(),
            resource: resource_name.to_string(),
        });
    }

    let in_bounds = requested >= resource.minimum && requested <= resource.maximum;
    if !in_bounds || off_step(requested, resource) {
        return Err(ScalingError::OutOfRange {
            group_id: group_id.to_string(),
            resource: resource_name.to_string(),
            minimum: resource.minimum,
            maximum: resource.maximum,
            step_size: resource.step_size,
        });
    }

    if requested < resource.allocation && !resource.can_scale_down {
        return Err(ScalingError::ScaleDown {
            group_id: group_id.to_string(),
            resource: resource_name.to_string(),
            allocation: resource.allocation,
            requested,
        });
    }

    Ok(())
}
