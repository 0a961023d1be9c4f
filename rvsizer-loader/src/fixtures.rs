//! Builder for small RVTools-shaped workbooks used in tests.

use rust_xlsxwriter::{Workbook, XlsxError};
use rvsizer_schema::{Sheet, VmInfo, VmMemory, VmPartition};

enum Cell {
    Text(String),
    Number(f64),
}

/// Writes canonical headers for each sheet, in table column order.
#[derive(Default)]
pub struct WorkbookBuilder {
    vm_info: Vec<Vec<Cell>>,
    memory: Vec<Vec<Cell>>,
    partitions: Vec<Vec<Cell>>,
    skip_sheet: Option<Sheet>,
    skip_header: Option<&'static str>,
}

impl WorkbookBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vm(
        mut self,
        name: &str,
        powerstate: &str,
        cpus: u32,
        memory_mib: f64,
        provisioned_mib: f64,
        in_use_mib: f64,
    ) -> Self {
        self.vm_info.push(vec![
            Cell::Text(name.into()),
            Cell::Text(powerstate.into()),
            Cell::Number(f64::from(cpus)),
            Cell::Number(memory_mib),
            Cell::Number(provisioned_mib),
            Cell::Number(in_use_mib),
        ]);
        self
    }

    pub fn memory(mut self, name: &str, consumed_mib: f64) -> Self {
        self.memory
            .push(vec![Cell::Text(name.into()), Cell::Number(consumed_mib)]);
        self
    }

    pub fn partition(mut self, name: &str, consumed_mib: f64) -> Self {
        self.partitions
            .push(vec![Cell::Text(name.into()), Cell::Number(consumed_mib)]);
        self
    }

    pub fn without_sheet(mut self, sheet: Sheet) -> Self {
        self.skip_sheet = Some(sheet);
        self
    }

    /// Drop every column whose canonical header is `header`.
    pub fn without_column(mut self, header: &'static str) -> Self {
        self.skip_header = Some(header);
        self
    }

    pub fn build(&self) -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();
        let sheets = [
            (Sheet::Info, VmInfo::HEADERS, &self.vm_info),
            (Sheet::Memory, VmMemory::HEADERS, &self.memory),
            (Sheet::Partition, VmPartition::HEADERS, &self.partitions),
        ];
        for (sheet, headers, rows) in sheets {
            if self.skip_sheet == Some(sheet) {
                continue;
            }
            self.write_sheet(&mut workbook, sheet, headers, rows)?;
        }
        workbook.save_to_buffer()
    }

    fn write_sheet(
        &self,
        workbook: &mut Workbook,
        sheet: Sheet,
        headers: &[(&'static str, &'static [&'static str])],
        rows: &[Vec<Cell>],
    ) -> Result<(), XlsxError> {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(sheet.name())?;

        let kept: Vec<usize> = headers
            .iter()
            .enumerate()
            .filter(|(_, (_, accepted))| Some(accepted[0]) != self.skip_header)
            .map(|(i, _)| i)
            .collect();

        for (col, &i) in kept.iter().enumerate() {
            worksheet.write_string(0, col as u16, headers[i].1[0])?;
        }
        for (r, row) in rows.iter().enumerate() {
            let row_num = r as u32 + 1;
            for (col, &i) in kept.iter().enumerate() {
                match &row[i] {
                    Cell::Text(text) => worksheet.write_string(row_num, col as u16, text)?,
                    Cell::Number(n) => worksheet.write_number(row_num, col as u16, *n)?,
                };
            }
        }
        Ok(())
    }
}
