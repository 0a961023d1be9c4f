use rvsizer_loader::{load_workbook, LoadError};
use rvsizer_schema::{Inventory, SchemaError};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::info;
use uuid::Uuid;

/// One uploaded workbook and everything derived from it.
///
/// Sessions are owned by the caller; nothing here is shared between requests.
#[derive(Clone, Debug)]
pub struct SizingSession {
    id: Uuid,
    workbook_sha256: String,
    inventory: Inventory,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VmListing {
    pub vm: String,
    pub powerstate: String,
}

impl SizingSession {
    pub fn from_workbook(bytes: &[u8]) -> Result<Self, LoadError> {
        let inventory = load_workbook(bytes)?;
        let session = Self {
            id: Uuid::new_v4(),
            workbook_sha256: format!("{:x}", Sha256::digest(bytes)),
            inventory,
        };
        info!(
            session = %session.id,
            sha256 = %session.workbook_sha256,
            vms = session.inventory.vm_count(),
            "workbook loaded"
        );
        Ok(session)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn workbook_sha256(&self) -> &str {
        &self.workbook_sha256
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    /// VM names with their power state, in workbook order.
    pub fn vms(&self) -> Result<Vec<VmListing>, SchemaError> {
        let info = &self.inventory.vm_info;
        let (names, states) = (info.vm()?, info.powerstate()?);
        Ok((0..info.num_rows())
            .map(|i| VmListing {
                vm: names.value(i).to_string(),
                powerstate: states.value(i).to_string(),
            })
            .collect())
    }
}
