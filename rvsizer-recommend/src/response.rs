//! Projection of the sizer's `genericResponse` onto the fields we render.

use serde::Serialize;
use serde_json::Value;

use crate::RecommendationError;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Usage {
    pub consumed: f64,
    pub free: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StorageUsage {
    pub consumed: f64,
    pub system: f64,
    pub free: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Recommendation {
    pub node_count: f64,
    pub total_cores: f64,
    pub total_memory: f64,
    pub total_storage: f64,
    pub ftt_ftm: String,
    pub cores: Usage,
    pub memory: Usage,
    pub storage: StorageUsage,
}

impl Recommendation {
    /// Labelled rows in display order.
    pub fn rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Host Count", self.node_count.to_string()),
            ("Total Cores", self.total_cores.to_string()),
            ("Total Memory", self.total_memory.to_string()),
            ("Total Storage", self.total_storage.to_string()),
            ("FTT & FTM", self.ftt_ftm.clone()),
        ]
    }
}

/// Read the recommendation out of a full sizer response body.
pub fn parse_generic_response(body: &Value) -> Result<Recommendation, RecommendationError> {
    let generic = field(body, "/genericResponse")?;
    let num = |path: &str| number(generic, path);

    Ok(Recommendation {
        node_count: num("/sddcInformation/nodesSize")?,
        total_cores: num("/sddcInformation/provisionedCores")?,
        total_memory: num("/sddcInformation/provisionedMemory/value")?,
        total_storage: num("/sddcInformation/provisionedStorage/value")?,
        ftt_ftm: match field(generic, "/sddcInformation/fttAndftm")? {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        },
        cores: Usage {
            consumed: num("/cpuCoresUsage/consumed")?,
            free: num("/cpuCoresUsage/free")?,
        },
        memory: Usage {
            consumed: num("/memoryUsage/consumed/value")?,
            free: num("/memoryUsage/free/value")?,
        },
        storage: StorageUsage {
            consumed: num("/diskSpaceUsage/consumedStorage/value")?,
            system: num("/diskSpaceUsage/consumedSystemStorage/value")?,
            free: num("/diskSpaceUsage/freeStorage/value")?,
        },
    })
}

fn field<'a>(value: &'a Value, path: &str) -> Result<&'a Value, RecommendationError> {
    match value.pointer(path) {
        Some(Value::Null) | None => Err(RecommendationError::MissingField(dotted(path))),
        Some(v) => Ok(v),
    }
}

fn number(value: &Value, path: &str) -> Result<f64, RecommendationError> {
    field(value, path)?
        .as_f64()
        .ok_or_else(|| RecommendationError::Decode(format!("`{}` is not a number", dotted(path))))
}

fn dotted(pointer: &str) -> String {
    pointer.trim_start_matches('/').replace('/', ".")
}
