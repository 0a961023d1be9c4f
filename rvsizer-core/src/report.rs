use std::fmt::Display;

use rvsizer_recommend::Recommendation;
use rvsizer_schema::InventoryRows;
use rvsizer_types::{MetricRow, PerPolicy, Summary};
use serde::Serialize;
use uuid::Uuid;

/// A report section that may be missing for one policy only.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Section<T> {
    Available(T),
    Unavailable(Unavailable),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Unavailable {
    status: &'static str,
    pub reason: String,
}

impl<T> Section<T> {
    pub fn unavailable(reason: impl Display) -> Self {
        Section::Unavailable(Unavailable {
            status: "unavailable",
            reason: reason.to_string(),
        })
    }

    pub fn from_result<E: Display>(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Section::Available(value),
            Err(e) => Self::unavailable(e),
        }
    }

    pub fn available(&self) -> Option<&T> {
        match self {
            Section::Available(value) => Some(value),
            Section::Unavailable(_) => None,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Section::Available(_) => None,
            Section::Unavailable(u) => Some(&u.reason),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Section<U> {
        match self {
            Section::Available(value) => Section::Available(f(value)),
            Section::Unavailable(u) => Section::Unavailable(u),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct PolicyReport {
    pub summary: Section<Summary>,
    pub totals: Section<Vec<MetricRow>>,
    pub rounded: Section<Vec<MetricRow>>,
    pub recommendation: Section<Recommendation>,
    pub kept: Section<InventoryRows>,
    pub removed: Section<InventoryRows>,
    /// Memory and partition rows whose VM is missing from vInfo.
    pub unmatched: Section<InventoryRows>,
}

#[derive(Clone, Debug, Serialize)]
pub struct SizingReport {
    pub session_id: Uuid,
    pub workbook_sha256: String,
    /// RFC 3339, UTC.
    pub generated_at: String,
    pub powered_off_count: u64,
    pub powered_off_excluded: bool,
    pub policies: PerPolicy<PolicyReport>,
}
