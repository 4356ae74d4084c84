use crate::dashboard::{TableOutput, TableRows};
use serde::Serialize;
use std::error::Error;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), Box<dyn Error>> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), Box<dyn Error>> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

pub fn write_bytes(path: &Path, bytes: &[u8]) -> Result<(), Box<dyn Error>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bytes)?;
    Ok(())
}

/// Export a view table as `<dir>/<name>.csv`. The goal distribution is also
/// written as JSON next to it.
pub fn export_table(dir: &Path, table: &TableOutput) -> Result<Vec<PathBuf>, Box<dyn Error>> {
    std::fs::create_dir_all(dir)?;
    let csv_path = dir.join(format!("{}.csv", table.name));
    let mut written = vec![csv_path.clone()];
    match &table.rows {
        TableRows::Records(r) => write_csv(&csv_path, r)?,
        TableRows::YearSummary(r) => write_csv(&csv_path, r)?,
        TableRows::Achievers(r) => write_csv(&csv_path, r)?,
        TableRows::Goals(r) => write_csv(&csv_path, r)?,
        TableRows::GoalShares(r) => {
            write_csv(&csv_path, r)?;
            let json_path = dir.join(format!("{}.json", table.name));
            write_json(&json_path, r)?;
            written.push(json_path);
        }
    }
    Ok(written)
}

/// Markdown rendering of the first `max_rows` rows.
pub fn table_markdown<T>(rows: &[T], max_rows: usize) -> String
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        return "(no rows)".to_string();
    }
    Table::new(slice).with(Style::markdown()).to_string()
}

pub fn preview_table_rows(table: &TableOutput, max_rows: usize) {
    let rendered = match &table.rows {
        TableRows::Records(r) => table_markdown(r, max_rows),
        TableRows::YearSummary(r) => table_markdown(r, max_rows),
        TableRows::Achievers(r) => table_markdown(r, max_rows),
        TableRows::GoalShares(r) => table_markdown(r, max_rows),
        TableRows::Goals(r) => table_markdown(r, max_rows),
    };
    println!("{}\n", rendered);
    let total = table.rows.len();
    if total > max_rows {
        println!("({} of {} rows shown)\n", max_rows, total);
    }
}
