use async_trait::async_trait;
use rvsizer_types::Summary;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod http_sizer;
pub mod response;

pub use http_sizer::{HttpSizer, DEFAULT_ENDPOINT};
pub use response::{parse_generic_response, Recommendation, StorageUsage, Usage};

#[derive(Debug, Error)]
pub enum RecommendationError {
    #[error("sizer request failed: {0}")]
    Transport(String),
    #[error("sizer returned HTTP {0}")]
    Status(u16),
    #[error("sizer response is not valid JSON: {0}")]
    Decode(String),
    #[error("sizer response is missing `{0}`")]
    MissingField(String),
    #[error("recommendations are disabled")]
    Disabled,
}

/// Per-VM averages sent to the sizer for one policy.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SizingRequest {
    pub vms: u64,
    pub vcpus_per_vm: u64,
    pub vram_per_vm_gib: u64,
    pub vmdk_size_gib: u64,
}

impl SizingRequest {
    pub fn from_summary(summary: &Summary) -> Self {
        Self {
            vms: summary.vms,
            vcpus_per_vm: summary.rcpu,
            vram_per_vm_gib: summary.rram,
            vmdk_size_gib: summary.rsto,
        }
    }
}

/// Fixed parts of the workload body.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkloadProfile {
    pub profile_name: String,
    pub workload_type: String,
    pub vcpus_per_core: u32,
    pub unit: String,
}

impl Default for WorkloadProfile {
    fn default() -> Self {
        Self {
            profile_name: "Workload Profile - 1".into(),
            workload_type: "GPW_GVM".into(),
            vcpus_per_core: 4,
            unit: "GIB".into(),
        }
    }
}

#[async_trait]
pub trait Recommender: Send + Sync {
    async fn recommend(&self, req: &SizingRequest) -> Result<Recommendation, RecommendationError>;
}

/// Offline recommender: never reaches the network.
pub struct NullRecommender;

#[async_trait]
impl Recommender for NullRecommender {
    async fn recommend(&self, _req: &SizingRequest) -> Result<Recommendation, RecommendationError> {
        Err(RecommendationError::Disabled)
    }
}
