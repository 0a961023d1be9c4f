use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    parse_generic_response, Recommendation, RecommendationError, Recommender, SizingRequest,
    WorkloadProfile,
};

pub const DEFAULT_ENDPOINT: &str =
    "https://vmc.vmware.com/api/sizer/v4/recommendation?cloudProviderType=VMC_ON_AWS";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RecommendationBody<'a> {
    global_specs: GlobalSpecs,
    workloads: [Workload<'a>; 1],
}

#[derive(Serialize)]
struct GlobalSpecs {}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Workload<'a> {
    profile_name: &'a str,
    vm_profile: VmProfile<'a>,
    workload_type: &'a str,
}

#[derive(Serialize)]
struct VmProfile<'a> {
    #[serde(rename = "vCpusPerCore")]
    vcpus_per_core: u32,
    #[serde(rename = "vCpusPerVM")]
    vcpus_per_vm: u64,
    #[serde(rename = "vRAMPerVM")]
    vram_per_vm: Quantity<'a>,
    #[serde(rename = "vmdkSize")]
    vmdk_size: Quantity<'a>,
    #[serde(rename = "vmsNum")]
    vms_num: u64,
}

#[derive(Serialize)]
struct Quantity<'a> {
    value: u64,
    unit: &'a str,
}

fn body<'a>(profile: &'a WorkloadProfile, req: &SizingRequest) -> RecommendationBody<'a> {
    RecommendationBody {
        global_specs: GlobalSpecs {},
        workloads: [Workload {
            profile_name: &profile.profile_name,
            vm_profile: VmProfile {
                vcpus_per_core: profile.vcpus_per_core,
                vcpus_per_vm: req.vcpus_per_vm,
                vram_per_vm: Quantity {
                    value: req.vram_per_vm_gib,
                    unit: &profile.unit,
                },
                vmdk_size: Quantity {
                    value: req.vmdk_size_gib,
                    unit: &profile.unit,
                },
                vms_num: req.vms,
            },
            workload_type: &profile.workload_type,
        }],
    }
}

/// Recommender backed by the public sizer REST API.
pub struct HttpSizer {
    client: reqwest::Client,
    endpoint: String,
    profile: WorkloadProfile,
}

impl HttpSizer {
    pub fn new(
        endpoint: impl Into<String>,
        profile: WorkloadProfile,
        timeout: Duration,
    ) -> Result<Self, RecommendationError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RecommendationError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            profile,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Recommender for HttpSizer {
    async fn recommend(&self, req: &SizingRequest) -> Result<Recommendation, RecommendationError> {
        debug!(endpoint = %self.endpoint, ?req, "requesting recommendation");
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&body(&self.profile, req))
            .send()
            .await
            .map_err(|e| RecommendationError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            warn!(%status, "sizer rejected request");
            return Err(RecommendationError::Status(status.as_u16()));
        }

        let value: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| RecommendationError::Decode(e.to_string()))?;
        parse_generic_response(&value)
    }
}
