//! Workbook sheets an RVTools export is read from.

/// Source sheet of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sheet {
    Info,      // vInfo
    Memory,    // vMemory
    Partition, // vPartition
}

impl Sheet {
    /// Sheet name as written by RVTools.
    pub const fn name(self) -> &'static str {
        match self {
            Sheet::Info => "vInfo",
            Sheet::Memory => "vMemory",
            Sheet::Partition => "vPartition",
        }
    }
}

impl std::fmt::Display for Sheet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
