//! CSV input of author names and CSV output of paper rows.

use crate::error::{CollectError, Result};
use crate::rows::{PaperRow, PAPER_COLUMNS};
use std::collections::HashSet;
use std::io::{Read, Write};
use std::path::Path;
use tracing::info;

/// Distinct non-empty values of `column`, in first-seen order.
pub fn read_author_names<R: Read>(reader: R, column: &str) -> Result<Vec<String>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let index = rdr
        .headers()?
        .iter()
        .position(|h| h.trim() == column)
        .ok_or_else(|| CollectError::Validation(format!("Column {:?} not found in input", column)))?;

    let mut names = Vec::new();
    for record in rdr.records() {
        let record = record?;
        if let Some(value) = record.get(index) {
            names.push(value.to_string());
        }
    }
    Ok(distinct_names(names))
}

pub fn read_author_names_from_path(path: &Path, column: &str) -> Result<Vec<String>> {
    let file = std::fs::File::open(path)?;
    let names = read_author_names(file, column)?;
    info!(path = %path.display(), column = column, names = names.len(), "Loaded author names");
    Ok(names)
}

/// Drop blank entries and repeats, preserving first-seen order.
pub fn distinct_names<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    names
        .into_iter()
        .map(|n| n.as_ref().trim().to_string())
        .filter(|n| !n.is_empty())
        .filter(|n| seen.insert(n.clone()))
        .collect()
}

/// Header plus one record per row. The header is written even with no rows.
pub fn write_rows<W: Write>(writer: W, rows: &[PaperRow]) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    wtr.write_record(PAPER_COLUMNS)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_rows_to_path(path: &Path, rows: &[PaperRow]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)?;
    write_rows(file, rows)?;
    info!(path = %path.display(), rows = rows.len(), "Saved rows");
    Ok(())
}
