use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use rvsizer_recommend::{HttpSizer, NullRecommender, Recommender, WorkloadProfile, DEFAULT_ENDPOINT};
use serde::Deserialize;
use tracing::info;

/// Sizer connection settings.
///
/// Read from the YAML file named by `RVSIZER_CONFIG` (when set), then overridden
/// by `RVSIZER_SIZER_URL`, `RVSIZER_TIMEOUT_SECS` and `RVSIZER_OFFLINE`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct SizerConfig {
    pub endpoint: String,
    pub timeout_secs: u64,
    pub offline: bool,
    pub profile: WorkloadProfile,
}

impl Default for SizerConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.into(),
            timeout_secs: 30,
            offline: false,
            profile: WorkloadProfile::default(),
        }
    }
}

impl SizerConfig {
    pub fn from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading sizer config {}", path.display()))?;
        let cfg: SizerConfig = serde_yaml::from_str(&text)
            .with_context(|| format!("parsing sizer config {}", path.display()))?;
        Ok(cfg)
    }

    pub fn from_env() -> anyhow::Result<Self> {
        let base = match std::env::var("RVSIZER_CONFIG") {
            Ok(path) if !path.is_empty() => Self::from_path(path)?,
            _ => Self::default(),
        };
        base.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply `RVSIZER_*` overrides from `lookup`.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<Self> {
        if let Some(url) = lookup("RVSIZER_SIZER_URL").filter(|v| !v.is_empty()) {
            self.endpoint = url;
        }
        if let Some(secs) = lookup("RVSIZER_TIMEOUT_SECS") {
            self.timeout_secs = secs
                .parse()
                .with_context(|| format!("RVSIZER_TIMEOUT_SECS={secs:?} is not a number"))?;
        }
        if let Some(v) = lookup("RVSIZER_OFFLINE") {
            self.offline = v == "1" || v.to_lowercase() == "true";
        }
        Ok(self)
    }

    pub fn build_recommender(&self) -> anyhow::Result<Arc<dyn Recommender>> {
        if self.offline {
            info!("sizer disabled, recommendations unavailable");
            return Ok(Arc::new(NullRecommender));
        }
        let sizer = HttpSizer::new(
            self.endpoint.clone(),
            self.profile.clone(),
            Duration::from_secs(self.timeout_secs),
        )?;
        info!(endpoint = %sizer.endpoint(), timeout_secs = self.timeout_secs, "sizer configured");
        Ok(Arc::new(sizer))
    }
}
