use std::fmt;

use serde::{Deserialize, Deserializer};

/// A scalable dimension of a deployment group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupResourceKind {
    Members,
    Memory,
    Disk,
    Cpu,
}

impl GroupResourceKind {
    pub const ALL: [GroupResourceKind; 4] = [
        GroupResourceKind::Members,
        GroupResourceKind::Memory,
        GroupResourceKind::Disk,
        GroupResourceKind::Cpu,
    ];

    pub fn name(self) -> &'static str {
        match self {
            GroupResourceKind::Members => "members",
            GroupResourceKind::Memory => "memory",
            GroupResourceKind::Disk => "disk",
            GroupResourceKind::Cpu => "cpu",
        }
    }

    /// Attribute name used by the API and in HCL for this dimension's allocation.
    pub fn allocation_key(self) -> &'static str {
        match self {
            GroupResourceKind::Members | GroupResourceKind::Cpu => "allocation_count",
            GroupResourceKind::Memory | GroupResourceKind::Disk => "allocation_mb",
        }
    }

    /// Members are counted per group; everything else is reported as a group total.
    fn is_per_member(self) -> bool {
        !matches!(self, GroupResourceKind::Members)
    }
}

impl fmt::Display for GroupResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Scaling metadata for one dimension of a group.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GroupResource {
    pub units: String,
    pub allocation: i64,
    pub minimum: i64,
    pub maximum: i64,
    pub step_size: i64,
    pub is_adjustable: bool,
    pub is_optional: bool,
    pub can_scale_down: bool,
    pub cpu_enforcement_ratio_mb: i64,
    pub cpu_enforcement_ratio_ceiling_mb: i64,
}

impl GroupResource {
    fn divided_by(&self, count: i64) -> Self {
        Self {
            allocation: self.allocation / count,
            minimum: self.minimum / count,
            maximum: self.maximum / count,
            step_size: self.step_size / count,
            ..self.clone()
        }
    }
}

/// Wire shape of a group resource. Count-based dimensions use `*_count`
/// fields, size-based dimensions use `*_mb`.
#[derive(Debug, Deserialize)]
struct RawGroupResource {
    #[serde(default)]
    units: String,
    allocation_count: Option<i64>,
    allocation_mb: Option<i64>,
    minimum_count: Option<i64>,
    minimum_mb: Option<i64>,
    maximum_count: Option<i64>,
    maximum_mb: Option<i64>,
    step_size_count: Option<i64>,
    step_size_mb: Option<i64>,
    #[serde(default)]
    is_adjustable: bool,
    #[serde(default)]
    is_optional: bool,
    #[serde(default)]
    can_scale_down: bool,
    #[serde(default)]
    cpu_enforcement_ratio_mb: i64,
    #[serde(default)]
    cpu_enforcement_ratio_ceiling_mb: i64,
}

impl From<RawGroupResource> for GroupResource {
    fn from(raw: RawGroupResource) -> Self {
        Self {
            units: raw.units,
            allocation: raw.allocation_count.or(raw.allocation_mb).unwrap_or(0),
            minimum: raw.minimum_count.or(raw.minimum_mb).unwrap_or(0),
            maximum: raw.maximum_count.or(raw.maximum_mb).unwrap_or(0),
            step_size: raw.step_size_count.or(raw.step_size_mb).unwrap_or(0),
            is_adjustable: raw.is_adjustable,
            is_optional: raw.is_optional,
            can_scale_down: raw.can_scale_down,
            cpu_enforcement_ratio_mb: raw.cpu_enforcement_ratio_mb,
            cpu_enforcement_ratio_ceiling_mb: raw.cpu_enforcement_ratio_ceiling_mb,
        }
    }
}

impl<'de> Deserialize<'de> for GroupResource {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        RawGroupResource::deserialize(deserializer).map(GroupResource::from)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HostFlavor {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub hosting_size: Option<String>,
}

/// A named cluster of members within a deployment.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Group {
    pub id: String,
    #[serde(default)]
    pub count: i64,
    pub members: Option<GroupResource>,
    pub memory: Option<GroupResource>,
    pub disk: Option<GroupResource>,
    pub cpu: Option<GroupResource>,
    #[serde(default)]
    pub host_flavor: Option<HostFlavor>,
}

impl Group {
    pub fn resource(&self, kind: GroupResourceKind) -> Option<&GroupResource> {
        match kind {
            GroupResourceKind::Members => self.members.as_ref(),
            GroupResourceKind::Memory => self.memory.as_ref(),
            GroupResourceKind::Disk => self.disk.as_ref(),
            GroupResourceKind::Cpu => self.cpu.as_ref(),
        }
    }

    /// Number of members, preferring the members dimension over the group count.
    pub fn member_count(&self) -> i64 {
        self.members
            .as_ref()
            .map(|m| m.allocation)
            .filter(|c| *c > 0)
            .unwrap_or(self.count)
    }

    /// Express memory, disk and cpu as per-member values, the unit users
    /// write in configuration. The members dimension is left untouched.
    pub fn per_member(&self) -> Group {
        let count = self.member_count();
        if count <= 1 {
            return self.clone();
        }
        let scale = |kind: GroupResourceKind, r: &Option<GroupResource>| {
            r.as_ref().map(|res| {
                if kind.is_per_member() {
                    res.divided_by(count)
                } else {
                    res.clone()
                }
            })
        };
        Group {
            id: self.id.clone(),
            count: self.count,
            members: scale(GroupResourceKind::Members, &self.members),
            memory: scale(GroupResourceKind::Memory, &self.memory),
            disk: scale(GroupResourceKind::Disk, &self.disk),
            cpu: scale(GroupResourceKind::Cpu, &self.cpu),
            host_flavor: self.host_flavor.clone(),
        }
    }
}
