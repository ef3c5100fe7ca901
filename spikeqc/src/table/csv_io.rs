use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::error::QcError;
use crate::table::frame::{Cell, MetricsTable};

/// Writes `table` as CSV: an unnamed row-index column, the key column, then the
/// metric columns. Missing cells are written empty.
///
/// The table goes to a hidden sibling file that is renamed over `path` once complete,
/// so a failed write leaves any previous output in place.
pub fn write_csv(table: &MetricsTable, path: &Path) -> Result<(), QcError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| QcError::io(path, e))?;
    }
    let tmp = temp_path(path);
    let result = write_records(table, &tmp).and_then(|()| std::fs::rename(&tmp, path).map_err(|e| QcError::io(path, e)));
    if result.is_err() {
        let _ = std::fs::remove_file(&tmp);
    }
    result
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("metrics");
    path.with_file_name(format!(".{name}.tmp"))
}

fn write_records(table: &MetricsTable, path: &Path) -> Result<(), QcError> {
    let mut wtr = csv::Writer::from_path(path).map_err(|e| QcError::csv(path, e))?;

    let mut header = Vec::with_capacity(table.columns().len() + 2);
    header.push(String::new());
    header.push(table.key().to_string());
    header.extend(table.columns().iter().cloned());
    wtr.write_record(&header).map_err(|e| QcError::csv(path, e))?;

    for (i, (unit_id, cells)) in table.rows().enumerate() {
        let mut record = Vec::with_capacity(cells.len() + 2);
        record.push(i.to_string());
        record.push(unit_id.to_string());
        record.extend(cells.iter().map(Cell::render));
        wtr.write_record(&record).map_err(|e| QcError::csv(path, e))?;
    }
    wtr.flush().map_err(|e| QcError::io(path, e))?;
    Ok(())
}

/// Reads a CSV table keyed by `key`. A leading unnamed index column is dropped.
pub fn read_csv(path: &Path, key: &str) -> Result<MetricsTable, QcError> {
    let file = File::open(path).map_err(|e| QcError::io(path, e))?;
    read_table(file, path, key)
}

fn read_table<R: Read>(reader: R, path: &Path, key: &str) -> Result<MetricsTable, QcError> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let mut headers: Vec<String> = rdr
        .headers()
        .map_err(|e| QcError::csv(path, e))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let skip_index = headers.first().is_some_and(|h| is_index_header(h) && h != key);
    if skip_index {
        headers.remove(0);
    }
    let key_pos = headers
        .iter()
        .position(|h| h == key)
        .ok_or_else(|| QcError::MissingColumn { column: key.to_string() })?;

    let columns: Vec<String> = headers.iter().enumerate().filter(|&(i, _)| i != key_pos).map(|(_, h)| h.clone()).collect();
    let mut table = MetricsTable::new(key, columns);

    for (row, record) in rdr.records().enumerate() {
        let record = record.map_err(|e| QcError::csv(path, e))?;
        let fields: Vec<&str> = record.iter().skip(usize::from(skip_index)).collect();
        if fields.len() != headers.len() {
            return Err(QcError::RowWidth { row, expected: headers.len(), found: fields.len() });
        }
        let unit_id = parse_unit_id(fields[key_pos]).ok_or_else(|| QcError::InvalidKey {
            row,
            value: fields[key_pos].to_string(),
        })?;
        let cells = fields
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != key_pos)
            .map(|(_, f)| Cell::parse(f))
            .collect();
        table.insert_row(unit_id, cells)?;
    }
    Ok(table)
}

fn is_index_header(h: &str) -> bool {
    h.is_empty() || h.starts_with("Unnamed: 0")
}

/// Accepts integral ids written as floats ("12.0").
fn parse_unit_id(raw: &str) -> Option<u32> {
    let s = raw.trim();
    if let Ok(id) = s.parse::<u32>() {
        return Some(id);
    }
    let v = s.parse::<f64>().ok()?;
    if v.fract() == 0.0 && v >= 0.0 && v <= u32::MAX as f64 {
        Some(v as u32)
    } else {
        None
    }
}
