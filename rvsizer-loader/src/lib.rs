//! Inventory loader: RVTools `.xlsx` export -> typed Arrow tables.
//!
//! Only structural parsing happens here. Header text is matched once against the
//! declared table layouts so that a malformed export fails before any sizing work.

use std::collections::{HashMap, HashSet};
use std::io::Cursor;

use calamine::{open_workbook_from_rs, Data, Range, Reader, Xlsx};
use rvsizer_schema::{
    Inventory, SchemaError, Sheet, VmInfo, VmInfoRow, VmMemory, VmMemoryRow, VmPartition,
    VmPartitionRow,
};
use thiserror::Error;
use tracing::{debug, info};

#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;

type Headers = &'static [(&'static str, &'static [&'static str])];

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("workbook could not be read: {0}")]
    Workbook(String),
    #[error("workbook is missing sheet '{0}'")]
    MissingSheet(Sheet),
    #[error("sheet '{sheet}' is missing column '{column}'")]
    MissingColumn { sheet: Sheet, column: &'static str },
    #[error("sheet '{sheet}' row {row}: invalid value in column '{column}': {reason}")]
    InvalidCell {
        sheet: Sheet,
        column: &'static str,
        row: usize,
        reason: String,
    },
    #[error("VM '{0}' appears more than once in sheet 'vInfo'")]
    DuplicateVm(String),
    #[error(transparent)]
    Schema(#[from] SchemaError),
}

/// Parse raw workbook bytes into the three inventory tables.
pub fn load_workbook(bytes: &[u8]) -> Result<Inventory, LoadError> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes))
        .map_err(|e: calamine::XlsxError| LoadError::Workbook(e.to_string()))?;
    let available = workbook.sheet_names();
    debug!(sheets = ?available, "opened workbook");

    let mut range_of = |sheet: Sheet| -> Result<Range<Data>, LoadError> {
        if !available.iter().any(|name| name == sheet.name()) {
            return Err(LoadError::MissingSheet(sheet));
        }
        workbook
            .worksheet_range(sheet.name())
            .map_err(|e| LoadError::Workbook(format!("sheet '{sheet}': {e}")))
    };

    let info = range_of(Sheet::Info)?;
    let memory = range_of(Sheet::Memory)?;
    let partitions = range_of(Sheet::Partition)?;

    let inventory = Inventory {
        vm_info: VmInfo::from_rows(&read_vm_info(range_rows(&info))?)?,
        memory: VmMemory::from_rows(&read_vm_memory(range_rows(&memory))?)?,
        partitions: VmPartition::from_rows(&read_vm_partitions(range_rows(&partitions))?)?,
    };
    info!(
        vms = inventory.vm_count(),
        memory_rows = inventory.memory.num_rows(),
        partition_rows = inventory.partitions.num_rows(),
        "loaded inventory"
    );
    Ok(inventory)
}

/// Rows of a used range, paired with their 1-based sheet row number.
fn range_rows(range: &Range<Data>) -> impl Iterator<Item = (usize, &[Data])> {
    let first = range.start().map_or(0, |(row, _)| row as usize);
    range
        .rows()
        .enumerate()
        .map(move |(i, cells)| (first + i + 1, cells))
}

fn read_vm_info<'a>(
    rows: impl Iterator<Item = (usize, &'a [Data])>,
) -> Result<Vec<VmInfoRow>, LoadError> {
    let parsed = read_sheet(Sheet::Info, VmInfo::HEADERS, rows, |cells| {
        Ok(VmInfoRow {
            vm: cells.text("vm").unwrap_or_default(),
            powerstate: cells.text("powerstate").unwrap_or_default(),
            cpus: cells.count("cpus")?,
            memory_mib: cells.mib("memory_mib")?,
            provisioned_mib: cells.mib("provisioned_mib")?,
            in_use_mib: cells.mib("in_use_mib")?,
        })
    })?;

    let mut seen = HashSet::with_capacity(parsed.len());
    for row in &parsed {
        if !seen.insert(row.vm.as_str()) {
            return Err(LoadError::DuplicateVm(row.vm.clone()));
        }
    }
    Ok(parsed)
}

fn read_vm_memory<'a>(
    rows: impl Iterator<Item = (usize, &'a [Data])>,
) -> Result<Vec<VmMemoryRow>, LoadError> {
    read_sheet(Sheet::Memory, VmMemory::HEADERS, rows, |cells| {
        Ok(VmMemoryRow {
            vm: cells.text("vm").unwrap_or_default(),
            consumed_mib: cells.mib("consumed_mib")?,
        })
    })
}

fn read_vm_partitions<'a>(
    rows: impl Iterator<Item = (usize, &'a [Data])>,
) -> Result<Vec<VmPartitionRow>, LoadError> {
    read_sheet(Sheet::Partition, VmPartition::HEADERS, rows, |cells| {
        Ok(VmPartitionRow {
            vm: cells.text("vm").unwrap_or_default(),
            consumed_mib: cells.mib("consumed_mib")?,
        })
    })
}

/// Header row first, then data rows. Rows without a VM name are skipped.
fn read_sheet<'a, T>(
    sheet: Sheet,
    headers: Headers,
    mut rows: impl Iterator<Item = (usize, &'a [Data])>,
    mut build: impl FnMut(&Cells<'_>) -> Result<T, LoadError>,
) -> Result<Vec<T>, LoadError> {
    let header_row = rows.next().map(|(_, cells)| cells).unwrap_or(&[]);
    let columns = locate_columns(sheet, headers, header_row)?;

    let mut out = Vec::new();
    for (row, cells) in rows {
        let cells = Cells {
            sheet,
            row,
            cells,
            columns: &columns,
        };
        if cells.text("vm").is_none() {
            continue;
        }
        out.push(build(&cells)?);
    }
    debug!(%sheet, rows = out.len(), "parsed sheet");
    Ok(out)
}

/// Column name -> (cell index, canonical header).
type Columns = HashMap<&'static str, (usize, &'static str)>;

fn locate_columns(
    sheet: Sheet,
    headers: Headers,
    header_row: &[Data],
) -> Result<Columns, LoadError> {
    let mut columns = HashMap::with_capacity(headers.len());
    for &(column, accepted) in headers {
        let idx = header_row
            .iter()
            .position(|cell| match cell {
                Data::String(text) => accepted.iter().any(|h| *h == text.trim()),
                _ => false,
            })
            .ok_or(LoadError::MissingColumn {
                sheet,
                column: accepted[0],
            })?;
        columns.insert(column, (idx, accepted[0]));
    }
    Ok(columns)
}

struct Cells<'a> {
    sheet: Sheet,
    row: usize,
    cells: &'a [Data],
    columns: &'a Columns,
}

impl Cells<'_> {
    fn cell(&self, column: &str) -> (Option<&Data>, &'static str) {
        match self.columns.get(column) {
            Some(&(idx, header)) => (self.cells.get(idx), header),
            None => (None, ""),
        }
    }

    fn invalid(&self, column: &'static str, reason: String) -> LoadError {
        LoadError::InvalidCell {
            sheet: self.sheet,
            column,
            row: self.row,
            reason,
        }
    }

    fn text(&self, column: &str) -> Option<String> {
        let text = match self.cell(column).0? {
            Data::Empty => return None,
            Data::String(s) => s.trim().to_string(),
            other => other.to_string(),
        };
        (!text.is_empty()).then_some(text)
    }

    /// Non-negative number; empty cells read as zero.
    fn mib(&self, column: &str) -> Result<f64, LoadError> {
        let (cell, header) = self.cell(column);
        let value = match cell {
            None | Some(Data::Empty) => 0.0,
            Some(Data::Float(f)) => *f,
            Some(Data::Int(i)) => *i as f64,
            Some(Data::String(s)) if s.trim().is_empty() => 0.0,
            Some(Data::String(s)) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| self.invalid(header, format!("'{s}' is not a number")))?,
            Some(other) => return Err(self.invalid(header, format!("unexpected cell {other:?}"))),
        };
        if !value.is_finite() || value < 0.0 {
            return Err(self.invalid(header, format!("{value} is not a non-negative number")));
        }
        Ok(value)
    }

    fn count(&self, column: &str) -> Result<u32, LoadError> {
        let value = self.mib(column)?;
        let header = self.cell(column).1;
        if value.fract() != 0.0 || value > f64::from(u32::MAX) {
            return Err(self.invalid(header, format!("{value} is not a whole count")));
        }
        Ok(value as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::WorkbookBuilder;
    use super::*;

    fn s(text: &str) -> Data {
        Data::String(text.to_string())
    }

    fn numbered(rows: &[Vec<Data>]) -> impl Iterator<Item = (usize, &[Data])> {
        rows.iter().enumerate().map(|(i, r)| (i + 1, r.as_slice()))
    }

    #[test]
    fn accepts_mib_header_spelling_and_skips_blank_rows() {
        let rows = vec![
            vec![s("VM"), s("Consumed MiB")],
            vec![s("vm-a"), Data::Float(512.0)],
            vec![Data::Empty, Data::Empty],
            vec![s("vm-a"), Data::Int(256)],
        ];
        let parsed = read_vm_partitions(numbered(&rows)).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1].consumed_mib, 256.0);
    }

    #[test]
    fn empty_numeric_cell_counts_as_zero() {
        let rows = vec![
            vec![s("VM"), s("Consumed")],
            vec![s("vm-a"), Data::Empty],
            vec![s("vm-b"), s(" 2048 ")],
        ];
        let parsed = read_vm_memory(numbered(&rows)).unwrap();
        assert_eq!(parsed[0].consumed_mib, 0.0);
        assert_eq!(parsed[1].consumed_mib, 2048.0);
    }

    #[test]
    fn missing_column_names_canonical_header() {
        let rows = vec![vec![s("VM"), s("Capacity MB")]];
        let err = read_vm_partitions(numbered(&rows)).unwrap_err();
        assert!(matches!(
            err,
            LoadError::MissingColumn { sheet: Sheet::Partition, column: "Consumed MB" }
        ));
        assert_eq!(
            err.to_string(),
            "sheet 'vPartition' is missing column 'Consumed MB'"
        );
    }

    #[test]
    fn rejects_text_and_fractional_cpu_counts() {
        let header = vec![
            s("VM"),
            s("Powerstate"),
            s("CPUs"),
            s("Memory"),
            s("Provisioned MB"),
            s("In Use MB"),
        ];
        let rows = vec![
            header.clone(),
            vec![s("vm-a"), s("poweredOn"), s("many"), Data::Float(1.0), Data::Float(1.0), Data::Float(1.0)],
        ];
        let err = read_vm_info(numbered(&rows)).unwrap_err();
        assert!(matches!(err, LoadError::InvalidCell { column: "CPUs", row: 2, .. }), "{err}");

        let rows = vec![
            header,
            vec![s("vm-a"), s("poweredOn"), Data::Float(1.5), Data::Float(1.0), Data::Float(1.0), Data::Float(1.0)],
        ];
        assert!(matches!(
            read_vm_info(numbered(&rows)),
            Err(LoadError::InvalidCell { column: "CPUs", .. })
        ));
    }

    #[test]
    fn rejects_negative_storage() {
        let rows = vec![
            vec![s("VM"), s("Consumed MB")],
            vec![s("vm-a"), Data::Float(-1.0)],
        ];
        assert!(matches!(
            read_vm_partitions(numbered(&rows)),
            Err(LoadError::InvalidCell { .. })
        ));
    }

    #[test]
    fn loads_fixture_workbook() {
        let bytes = WorkbookBuilder::new()
            .vm("web-01", "poweredOn", 4, 8192.0, 40960.0, 20480.0)
            .vm("db-01", "poweredOff", 8, 16384.0, 102400.0, 51200.0)
            .memory("web-01", 4096.0)
            .partition("web-01", 10240.0)
            .partition("web-01", 2048.0)
            .build()
            .unwrap();

        let inv = load_workbook(&bytes).unwrap();
        assert_eq!(inv.vm_count(), 2);
        assert_eq!(inv.memory.num_rows(), 1);
        assert_eq!(inv.partitions.num_rows(), 2);
        assert_eq!(inv.vm_info.cpus().unwrap().value(1), 8);
        assert_eq!(inv.vm_info.powerstate().unwrap().value(1), "poweredOff");
    }

    #[test]
    fn reports_missing_sheet() {
        let bytes = WorkbookBuilder::new()
            .vm("web-01", "poweredOn", 1, 1.0, 1.0, 1.0)
            .without_sheet(Sheet::Memory)
            .build()
            .unwrap();
        let err = load_workbook(&bytes).unwrap_err();
        assert!(matches!(err, LoadError::MissingSheet(Sheet::Memory)));
        assert_eq!(err.to_string(), "workbook is missing sheet 'vMemory'");
    }

    #[test]
    fn reports_missing_column() {
        let bytes = WorkbookBuilder::new()
            .vm("web-01", "poweredOn", 1, 1.0, 1.0, 1.0)
            .without_column("In Use MB")
            .build()
            .unwrap();
        assert!(matches!(
            load_workbook(&bytes),
            Err(LoadError::MissingColumn { sheet: Sheet::Info, column: "In Use MB" })
        ));
    }

    #[test]
    fn rejects_duplicate_vm_names() {
        let bytes = WorkbookBuilder::new()
            .vm("web-01", "poweredOn", 1, 1.0, 1.0, 1.0)
            .vm("web-01", "poweredOff", 1, 1.0, 1.0, 1.0)
            .build()
            .unwrap();
        assert!(matches!(load_workbook(&bytes), Err(LoadError::DuplicateVm(name)) if name == "web-01"));
    }

    #[test]
    fn rejects_non_workbook_bytes() {
        assert!(matches!(
            load_workbook(b"not a workbook"),
            Err(LoadError::Workbook(_))
        ));
    }
}
