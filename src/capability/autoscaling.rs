use serde::{Deserialize, Deserializer};
use serde_json::{json, Map, Value};

/// Auto-scaling settings for one group dimension. `None` fields are not managed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AutoScalingRule {
    pub capacity_enabled: Option<bool>,
    pub free_space_less_than_percent: Option<i64>,
    pub io_enabled: Option<bool>,
    pub io_over_period: Option<String>,
    pub io_above_percent: Option<i64>,
    pub rate_increase_percent: Option<i64>,
    pub rate_period_seconds: Option<i64>,
    pub rate_limit_mb_per_member: Option<i64>,
    pub rate_limit_count_per_member: Option<i64>,
    pub rate_units: Option<String>,
}

fn changed<T: PartialEq>(wanted: &Option<T>, live: &Option<T>) -> bool {
    wanted.is_some() && wanted != live
}

impl AutoScalingRule {
    pub fn is_empty(&self) -> bool {
        self == &AutoScalingRule::default()
    }

    /// True when a managed field differs from the live rule.
    pub fn differs_from(&self, live: Option<&AutoScalingRule>) -> bool {
        let Some(live) = live else {
            return !self.is_empty();
        };
        changed(&self.capacity_enabled, &live.capacity_enabled)
            || changed(&self.free_space_less_than_percent, &live.free_space_less_than_percent)
            || changed(&self.io_enabled, &live.io_enabled)
            || changed(&self.io_over_period, &live.io_over_period)
            || changed(&self.io_above_percent, &live.io_above_percent)
            || changed(&self.rate_increase_percent, &live.rate_increase_percent)
            || changed(&self.rate_period_seconds, &live.rate_period_seconds)
            || changed(&self.rate_limit_mb_per_member, &live.rate_limit_mb_per_member)
            || changed(&self.rate_limit_count_per_member, &live.rate_limit_count_per_member)
            || changed(&self.rate_units, &live.rate_units)
    }

    /// API body with `scalers` and `rate` sections holding only managed fields.
    pub fn to_body(&self) -> Value {
        let mut capacity = Map::new();
        insert(&mut capacity, "enabled", &self.capacity_enabled);
        insert(&mut capacity, "free_space_less_than_percent", &self.free_space_less_than_percent);

        let mut io = Map::new();
        insert(&mut io, "enabled", &self.io_enabled);
        insert(&mut io, "over_period", &self.io_over_period);
        insert(&mut io, "above_percent", &self.io_above_percent);

        let mut rate = Map::new();
        insert(&mut rate, "increase_percent", &self.rate_increase_percent);
        insert(&mut rate, "period_seconds", &self.rate_period_seconds);
        insert(&mut rate, "limit_mb_per_member", &self.rate_limit_mb_per_member);
        insert(&mut rate, "limit_count_per_member", &self.rate_limit_count_per_member);
        insert(&mut rate, "units", &self.rate_units);

        let mut scalers = Map::new();
        if !capacity.is_empty() {
            scalers.insert("capacity".into(), Value::Object(capacity));
        }
        if !io.is_empty() {
            scalers.insert("io_utilization".into(), Value::Object(io));
        }

        let mut body = Map::new();
        if !scalers.is_empty() {
            body.insert("scalers".into(), Value::Object(scalers));
        }
        if !rate.is_empty() {
            body.insert("rate".into(), Value::Object(rate));
        }
        Value::Object(body)
    }
}

fn insert<T: serde::Serialize>(map: &mut Map<String, Value>, key: &str, value: &Option<T>) {
    if let Some(v) = value {
        map.insert(key.to_string(), json!(v));
    }
}

/// Auto-scaling for the disk, memory and cpu dimensions of a group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AutoScaling {
    #[serde(default)]
    pub disk: Option<AutoScalingRule>,
    #[serde(default)]
    pub memory: Option<AutoScalingRule>,
    #[serde(default)]
    pub cpu: Option<AutoScalingRule>,
}

impl AutoScaling {
    pub fn is_empty(&self) -> bool {
        self.disk.is_none() && self.memory.is_none() && self.cpu.is_none()
    }

    /// The dimensions of `self` that differ from `live`.
    pub fn changes_from(&self, live: &AutoScaling) -> AutoScaling {
        let pick = |wanted: &Option<AutoScalingRule>, live: &Option<AutoScalingRule>| {
            wanted
                .as_ref()
                .filter(|rule| rule.differs_from(live.as_ref()))
                .cloned()
        };
        AutoScaling {
            disk: pick(&self.disk, &live.disk),
            memory: pick(&self.memory, &live.memory),
            cpu: pick(&self.cpu, &live.cpu),
        }
    }

    pub fn to_body(&self) -> Value {
        let mut body = Map::new();
        for (name, rule) in [("disk", &self.disk), ("memory", &self.memory), ("cpu", &self.cpu)] {
            if let Some(rule) = rule {
                body.insert(name.to_string(), rule.to_body());
            }
        }
        json!({ "autoscaling": body })
    }
}

// ─── Wire format ─────────────────────────────────────────────────────────────

/// The API reports percentages and limits as JSON numbers that may carry a fraction.
#[derive(Debug, Default, Deserialize)]
struct RawRule {
    #[serde(default)]
    scalers: RawScalers,
    #[serde(default)]
    rate: RawRate,
}

#[derive(Debug, Default, Deserialize)]
struct RawScalers {
    capacity: Option<RawCapacity>,
    io_utilization: Option<RawIo>,
}

#[derive(Debug, Deserialize)]
struct RawCapacity {
    enabled: Option<bool>,
    free_space_less_than_percent: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawIo {
    enabled: Option<bool>,
    over_period: Option<String>,
    above_percent: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct RawRate {
    increase_percent: Option<f64>,
    period_seconds: Option<f64>,
    limit_mb_per_member: Option<f64>,
    limit_count_per_member: Option<f64>,
    units: Option<String>,
}

fn whole(value: Option<f64>) -> Option<i64> {
    value.map(|v| v.round() as i64)
}

impl From<RawRule> for AutoScalingRule {
    fn from(raw: RawRule) -> Self {
        let capacity = raw.scalers.capacity;
        let io = raw.scalers.io_utilization;
        Self {
            capacity_enabled: capacity.as_ref().and_then(|c| c.enabled),
            free_space_less_than_percent: whole(
                capacity.as_ref().and_then(|c| c.free_space_less_than_percent),
            ),
            io_enabled: io.as_ref().and_then(|i| i.enabled),
            io_over_period: io.as_ref().and_then(|i| i.over_period.clone()),
            io_above_percent: whole(io.as_ref().and_then(|i| i.above_percent)),
            rate_increase_percent: whole(raw.rate.increase_percent),
            rate_period_seconds: whole(raw.rate.period_seconds),
            rate_limit_mb_per_member: whole(raw.rate.limit_mb_per_member),
            rate_limit_count_per_member: whole(raw.rate.limit_count_per_member),
            rate_units: raw.rate.units,
        }
    }
}

impl<'de> Deserialize<'de> for AutoScalingRule {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        RawRule::deserialize(deserializer).map(AutoScalingRule::from)
    }
}
