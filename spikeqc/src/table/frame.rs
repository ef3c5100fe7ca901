use std::collections::BTreeMap;

use spikecore::MetricValue;

use crate::error::QcError;

/// One table cell.
#[derive(Clone, Debug, PartialEq)]
pub enum Cell {
    Number(f64),
    Text(String),
    Missing,
}

impl Cell {
    /// Parses a CSV field. Empty fields and `nan`/`NaN` read as [`Cell::Missing`].
    pub fn parse(raw: &str) -> Self {
        let s = raw.trim();
        match s {
            "" | "nan" | "NaN" => Cell::Missing,
            _ => match s.parse::<f64>() {
                Ok(v) => Cell::Number(v),
                Err(_) => Cell::Text(s.to_string()),
            },
        }
    }

    pub fn render(&self) -> String {
        match self {
            Cell::Number(v) if v.is_nan() => String::new(),
            Cell::Number(v) => v.to_string(),
            Cell::Text(s) => s.clone(),
            Cell::Missing => String::new(),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }
}

impl From<MetricValue> for Cell {
    fn from(v: MetricValue) -> Self {
        match v {
            MetricValue::Value(x) => Cell::Number(x),
            MetricValue::Undefined => Cell::Missing,
        }
    }
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        Cell::from(MetricValue::from_f64(v))
    }
}

/// Rows keyed by unit id, ascending; every row has one cell per column.
#[derive(Clone, Debug, PartialEq)]
pub struct MetricsTable {
    key: String,
    columns: Vec<String>,
    rows: BTreeMap<u32, Vec<Cell>>,
}

impl MetricsTable {
    pub fn new(key: impl Into<String>, columns: Vec<String>) -> Self {
        Self { key: key.into(), columns, rows: BTreeMap::new() }
    }

    /// Adds a row; unit ids are unique and rows must match the column count.
    pub fn insert_row(&mut self, unit_id: u32, cells: Vec<Cell>) -> Result<(), QcError> {
        if cells.len() != self.columns.len() {
            return Err(QcError::RowWidth { row: self.rows.len(), expected: self.columns.len(), found: cells.len() });
        }
        if self.rows.contains_key(&unit_id) {
            return Err(QcError::DuplicateUnit { unit_id });
        }
        self.rows.insert(unit_id, cells);
        Ok(())
    }

    pub(crate) fn insert_unchecked(&mut self, unit_id: u32, cells: Vec<Cell>) {
        debug_assert_eq!(cells.len(), self.columns.len());
        self.rows.insert(unit_id, cells);
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn unit_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.rows.keys().copied()
    }

    pub fn rows(&self) -> impl Iterator<Item = (u32, &[Cell])> + '_ {
        self.rows.iter().map(|(&id, cells)| (id, cells.as_slice()))
    }

    pub fn row(&self, unit_id: u32) -> Option<&[Cell]> {
        self.rows.get(&unit_id).map(Vec::as_slice)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn get(&self, unit_id: u32, column: &str) -> Option<&Cell> {
        let i = self.column_index(column)?;
        self.rows.get(&unit_id).map(|cells| &cells[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_parse() {
        assert_eq!(Cell::parse(""), Cell::Missing);
        assert_eq!(Cell::parse("nan"), Cell::Missing);
        assert_eq!(Cell::parse("NaN"), Cell::Missing);
        assert_eq!(Cell::parse(" 2.5 "), Cell::Number(2.5));
        assert_eq!(Cell::parse("good"), Cell::Text("good".to_string()));
        assert_eq!(Cell::from(MetricValue::Undefined).render(), "");
        assert_eq!(Cell::from(f64::NAN), Cell::Missing);
    }

    #[test]
    fn test_rows_are_unique_and_sorted() {
        let mut t = MetricsTable::new("cluster_id", vec!["a".to_string()]);
        t.insert_row(5, vec![Cell::Number(1.0)]).unwrap();
        t.insert_row(2, vec![Cell::Number(2.0)]).unwrap();
        assert!(matches!(t.insert_row(5, vec![Cell::Missing]), Err(QcError::DuplicateUnit { unit_id: 5 })));
        assert!(matches!(t.insert_row(7, vec![]), Err(QcError::RowWidth { .. })));

        assert_eq!(t.unit_ids().collect::<Vec<_>>(), vec![2, 5]);
        assert_eq!(t.get(5, "a"), Some(&Cell::Number(1.0)));
        assert_eq!(t.get(5, "b"), None);
    }
}
