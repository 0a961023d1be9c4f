use std::fmt::{self, Write};

use arrow::util::pretty::pretty_format_batches;
use rvsizer_core::{Section, SizingReport};
use rvsizer_schema::Inventory;
use rvsizer_scope::ScopedInventory;
use rvsizer_types::MetricRow;

pub fn report(report: &SizingReport) -> Result<String, fmt::Error> {
    let mut out = String::new();
    writeln!(
        out,
        "workbook sha256 {}\npowered off VMs: {} ({})",
        report.workbook_sha256,
        report.powered_off_count,
        if report.powered_off_excluded { "excluded" } else { "included" },
    )?;
    for (policy, section) in report.policies.iter() {
        writeln!(out, "\n== {policy} ==")?;
        metrics(&mut out, "Sizing Metrics Total", &section.totals)?;
        metrics(&mut out, "Sizing Metrics Rounded", &section.rounded)?;
        match &section.recommendation {
            Section::Available(rec) => {
                writeln!(out, "Recommendation")?;
                for (label, value) in rec.rows() {
                    writeln!(out, "  {label:<16}{value}")?;
                }
            }
            other => {
                writeln!(out, "Recommendation: unavailable ({})", other.reason().unwrap_or(""))?;
            }
        }
    }
    Ok(out)
}

fn metrics(out: &mut String, title: &str, rows: &Section<Vec<MetricRow>>) -> fmt::Result {
    match rows {
        Section::Available(rows) => {
            writeln!(out, "{title}")?;
            for row in rows {
                writeln!(out, "  {:<16}{}", row.unit, row.value)?;
            }
        }
        other => {
            writeln!(out, "{title}: unavailable ({})", other.reason().unwrap_or(""))?;
        }
    }
    Ok(())
}

/// Kept, removed and unmatched tables of every policy, as Arrow pretty tables.
pub fn scope_tables(scoped: &ScopedInventory) -> anyhow::Result<String> {
    let mut out = String::new();
    if scoped.powered_off_excluded {
        inventory(&mut out, "powered off (excluded)", &scoped.powered_off)?;
    }
    for (policy, scope) in scoped.scopes.iter() {
        inventory(&mut out, &format!("{policy} kept"), &scope.kept)?;
        inventory(&mut out, &format!("{policy} removed"), &scope.removed)?;
        if scope.unmatched.memory.num_rows() + scope.unmatched.partitions.num_rows() > 0 {
            inventory(&mut out, &format!("{policy} unmatched"), &scope.unmatched)?;
        }
    }
    Ok(out)
}

fn inventory(out: &mut String, title: &str, inv: &Inventory) -> anyhow::Result<()> {
    let tables = [
        (inv.vm_info.inner(), "vInfo"),
        (inv.memory.inner(), "vMemory"),
        (inv.partitions.inner(), "vPartition"),
    ];
    for (batch, sheet) in tables {
        writeln!(out, "\n-- {title}: {sheet} ({} rows)", batch.num_rows())?;
        if batch.num_rows() > 0 {
            writeln!(out, "{}", pretty_format_batches(&[(**batch).clone()])?)?;
        }
    }
    Ok(())
}
