#![forbid(unsafe_code)]

pub mod macros;
pub mod sheet;

use arrow::array::{BooleanArray, StringArray};
use arrow::datatypes::DataType;
use arrow::error::ArrowError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use sheet::Sheet;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("table {table} is missing column '{column}'")]
    MissingColumn { table: &'static str, column: String },
    #[error("table {table} column '{column}' has type {actual}, expected {expected}")]
    ColumnType {
        table: &'static str,
        column: String,
        expected: DataType,
        actual: DataType,
    },
    #[error("arrow error: {0}")]
    Arrow(#[from] ArrowError),
}

/// Table wrappers for the three RVTools sheets the sizer reads.
pub mod generated {
    use super::Sheet;
    use crate::define_tables;

    define_tables! {
        table VmInfo (VmInfoRow) {
            sheet: Sheet::Info,
            fields: {
                vm: Utf8 = ["VM"],
                powerstate: Utf8 = ["Powerstate"],
                cpus: UInt32 = ["CPUs"],
                memory_mib: Float64 = ["Memory"],
                provisioned_mib: Float64 = ["Provisioned MB", "Provisioned MiB"],
                in_use_mib: Float64 = ["In Use MB", "In Use MiB"]
            }
        },

        table VmMemory (VmMemoryRow) {
            sheet: Sheet::Memory,
            fields: {
                vm: Utf8 = ["VM"],
                consumed_mib: Float64 = ["Consumed"]
            }
        },

        table VmPartition (VmPartitionRow) {
            sheet: Sheet::Partition,
            fields: {
                vm: Utf8 = ["VM"],
                consumed_mib: Float64 = ["Consumed MB", "Consumed MiB"]
            }
        }
    }
}

pub use generated::*;

/// Tables that carry a VM name join key.
pub trait VmKeyed: Sized {
    fn vm_column(&self) -> Result<&StringArray, SchemaError>;

    fn select(&self, mask: &BooleanArray) -> Result<Self, SchemaError>;

    /// Split rows into (matching, rest) by a predicate on the VM name.
    fn partition_by_vm(
        &self,
        mut matches: impl FnMut(&str) -> bool,
    ) -> Result<(Self, Self), SchemaError> {
        let names = self.vm_column()?;
        let hit: BooleanArray = names.iter().map(|n| Some(n.map_or(false, &mut matches))).collect();
        let miss = arrow::compute::not(&hit)?;
        Ok((self.select(&hit)?, self.select(&miss)?))
    }
}

macro_rules! impl_vm_keyed {
    ( $( $Name:ident ),* ) => {
        $(
            impl VmKeyed for $Name {
                fn vm_column(&self) -> Result<&StringArray, SchemaError> {
                    self.vm()
                }

                fn select(&self, mask: &BooleanArray) -> Result<Self, SchemaError> {
                    self.filter(mask)
                }
            }
        )*
    };
}

impl_vm_keyed!(VmInfo, VmMemory, VmPartition);

/// The three tables of one RVTools export.
#[derive(Clone, Debug)]
pub struct Inventory {
    pub vm_info: VmInfo,
    pub memory: VmMemory,
    pub partitions: VmPartition,
}

/// Row-oriented copy of an [`Inventory`], for display and JSON.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct InventoryRows {
    pub vm_info: Vec<VmInfoRow>,
    pub memory: Vec<VmMemoryRow>,
    pub partitions: Vec<VmPartitionRow>,
}

impl Inventory {
    pub fn empty() -> Self {
        Self {
            vm_info: VmInfo::empty(),
            memory: VmMemory::empty(),
            partitions: VmPartition::empty(),
        }
    }

    pub fn from_rows(rows: &InventoryRows) -> Result<Self, SchemaError> {
        Ok(Self {
            vm_info: VmInfo::from_rows(&rows.vm_info)?,
            memory: VmMemory::from_rows(&rows.memory)?,
            partitions: VmPartition::from_rows(&rows.partitions)?,
        })
    }

    pub fn rows(&self) -> Result<InventoryRows, SchemaError> {
        Ok(InventoryRows {
            vm_info: self.vm_info.rows()?,
            memory: self.memory.rows()?,
            partitions: self.partitions.rows()?,
        })
    }

    /// Split all three tables by VM name: (matching, rest).
    pub fn partition_by_vm(
        &self,
        mut matches: impl FnMut(&str) -> bool,
    ) -> Result<(Self, Self), SchemaError> {
        let (info_hit, info_miss) = self.vm_info.partition_by_vm(&mut matches)?;
        let (mem_hit, mem_miss) = self.memory.partition_by_vm(&mut matches)?;
        let (part_hit, part_miss) = self.partitions.partition_by_vm(&mut matches)?;
        Ok((
            Self {
                vm_info: info_hit,
                memory: mem_hit,
                partitions: part_hit,
            },
            Self {
                vm_info: info_miss,
                memory: mem_miss,
                partitions: part_miss,
            },
        ))
    }

    pub fn vm_count(&self) -> usize {
        self.vm_info.num_rows()
    }
}
