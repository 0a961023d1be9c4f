use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

pub const MIB_PER_GIB: f64 = 1024.0;

/// Accounting policy a sizing pass is computed under.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Policy {
    /// Allocated CPU, RAM and provisioned storage from vInfo.
    Provisioned,
    /// In-use storage from vInfo, consumed memory from vMemory.
    Used,
    /// Partition-level consumed storage, consumed memory from vMemory.
    Consumed,
}

impl Policy {
    pub const ALL: [Policy; 3] = [Policy::Provisioned, Policy::Used, Policy::Consumed];

    pub const fn as_str(self) -> &'static str {
        match self {
            Policy::Provisioned => "provisioned",
            Policy::Used => "used",
            Policy::Consumed => "consumed",
        }
    }
}

impl std::fmt::Display for Policy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// VM power state as reported in the vInfo `Powerstate` column.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum PowerState {
    On,
    Off,
    Other(String),
}

impl PowerState {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "poweredOn" => PowerState::On,
            "poweredOff" => PowerState::Off,
            other => PowerState::Other(other.to_string()),
        }
    }

    pub fn is_off(&self) -> bool {
        matches!(self, PowerState::Off)
    }
}

/// One value per accounting policy.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PerPolicy<T> {
    pub provisioned: T,
    pub used: T,
    pub consumed: T,
}

impl<T> PerPolicy<T> {
    pub fn from_fn(mut f: impl FnMut(Policy) -> T) -> Self {
        Self {
            provisioned: f(Policy::Provisioned),
            used: f(Policy::Used),
            consumed: f(Policy::Consumed),
        }
    }

    pub fn try_from_fn<E>(mut f: impl FnMut(Policy) -> Result<T, E>) -> Result<Self, E> {
        Ok(Self {
            provisioned: f(Policy::Provisioned)?,
            used: f(Policy::Used)?,
            consumed: f(Policy::Consumed)?,
        })
    }

    pub fn get(&self, policy: Policy) -> &T {
        match policy {
            Policy::Provisioned => &self.provisioned,
            Policy::Used => &self.used,
            Policy::Consumed => &self.consumed,
        }
    }

    pub fn map<U>(&self, mut f: impl FnMut(Policy, &T) -> U) -> PerPolicy<U> {
        PerPolicy::from_fn(|policy| f(policy, self.get(policy)))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Policy, &T)> {
        Policy::ALL.into_iter().map(move |policy| (policy, self.get(policy)))
    }
}

/// VM names removed from one policy's scope.
pub type ExclusionSet = BTreeSet<String>;

/// User selections applied before aggregation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScopeOptions {
    pub exclude_powered_off: bool,
    pub exclusions: PerPolicy<ExclusionSet>,
}

impl ScopeOptions {
    /// One exclusion list applied to all three policies.
    pub fn shared<I, S>(exclude_powered_off: bool, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: ExclusionSet = names.into_iter().map(Into::into).collect();
        Self {
            exclude_powered_off,
            exclusions: PerPolicy::from_fn(|_| names.clone()),
        }
    }
}

impl Default for ScopeOptions {
    fn default() -> Self {
        Self::shared(true, Vec::<String>::new())
    }
}

/// Aggregated sizing metrics for one policy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub vms: u64,
    pub cpus: u64,
    pub ram_gib: f64,
    pub storage_gib: f64,
    /// Per-VM CPU count, rounded up.
    pub rcpu: u64,
    /// Per-VM RAM in GiB, rounded up.
    pub rram: u64,
    /// Per-VM storage in GiB, rounded up.
    pub rsto: u64,
    pub powered_off: u64,
}

/// Labelled row of a summary table.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MetricRow {
    pub unit: &'static str,
    pub value: f64,
}

const METRIC_UNITS: [&str; 4] = ["VM(s)", "CPU(s)", "RAM (GiB)", "Storage (GiB)"];

impl Summary {
    pub fn totals(&self) -> Vec<MetricRow> {
        metric_rows([self.vms as f64, self.cpus as f64, self.ram_gib, self.storage_gib])
    }

    pub fn rounded(&self) -> Vec<MetricRow> {
        metric_rows([
            self.vms as f64,
            self.rcpu as f64,
            self.rram as f64,
            self.rsto as f64,
        ])
    }
}

fn metric_rows(values: [f64; 4]) -> Vec<MetricRow> {
    METRIC_UNITS
        .into_iter()
        .zip(values)
        .map(|(unit, value)| MetricRow { unit, value })
        .collect()
}
