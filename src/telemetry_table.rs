use csv::Writer;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::tb_rust_client::{TimeseriesData, TsPoint};

#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub ts: i64,
    pub cells: Vec<Option<Value>>,
}

/// Wide telemetry table: one row per timestamp, one column per telemetry key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetryTable {
    columns: Vec<String>,
    rows: Vec<TableRow>,
}

impl TelemetryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Two-column table (`ts`, `key`) for a single series.
    pub fn from_series(key: &str, points: &[TsPoint]) -> Self {
        Self {
            columns: vec![key.to_string()],
            rows: points
                .iter()
                .map(|point| TableRow {
                    ts: point.ts,
                    cells: vec![Some(point.value.clone())],
                })
                .collect(),
        }
    }

    /// Reshapes one values/timeseries response by inner-joining every key on `ts`.
    ///
    /// A timestamp missing from any series is dropped from the result.
    pub fn from_response(data: &TimeseriesData) -> Self {
        let mut merged: Option<TelemetryTable> = None;
        for (key, points) in data.iter() {
            let table = Self::from_series(key, points);
            merged = Some(match merged {
                None => table,
                Some(left) => left.inner_join(&table),
            });
        }
        merged.unwrap_or_default()
    }

    /// Relational inner join on `ts`, keeping the row order of `self`.
    pub fn inner_join(&self, other: &TelemetryTable) -> TelemetryTable {
        let mut index: HashMap<i64, Vec<&TableRow>> = HashMap::new();
        for row in &other.rows {
            index.entry(row.ts).or_default().push(row);
        }

        let mut rows = Vec::new();
        for left in &self.rows {
            if let Some(matches) = index.get(&left.ts) {
                for right in matches {
                    let mut cells = left.cells.clone();
                    cells.extend(right.cells.iter().cloned());
                    rows.push(TableRow { ts: left.ts, cells });
                }
            }
        }

        let mut columns = self.columns.clone();
        columns.extend(other.columns.iter().cloned());
        TelemetryTable { columns, rows }
    }

    /// Stacks tables in order. Columns are the union in first-seen order;
    /// cells a table has no column for stay empty.
    pub fn concat<I>(tables: I) -> TelemetryTable
    where
        I: IntoIterator<Item = TelemetryTable>,
    {
        let tables: Vec<TelemetryTable> = tables.into_iter().collect();

        let mut columns: Vec<String> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        for table in &tables {
            for column in &table.columns {
                if !positions.contains_key(column) {
                    positions.insert(column.clone(), columns.len());
                    columns.push(column.clone());
                }
            }
        }

        let mut rows = Vec::with_capacity(tables.iter().map(|t| t.rows.len()).sum());
        for table in tables {
            let mapping: Vec<usize> = table.columns.iter().map(|c| positions[c]).collect();
            for row in table.rows {
                let mut cells = vec![None; columns.len()];
                for (source, cell) in row.cells.into_iter().enumerate() {
                    cells[mapping[source]] = cell;
                }
                rows.push(TableRow { ts: row.ts, cells });
            }
        }

        TelemetryTable { columns, rows }
    }

    /// Keeps the first row seen for every timestamp.
    pub fn dedup_by_ts(&mut self) {
        let mut seen = HashSet::new();
        self.rows.retain(|row| seen.insert(row.ts));
    }

    pub fn sort_by_ts(&mut self) {
        self.rows.sort_by_key(|row| row.ts);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&Value> {
        let position = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row)?.cells.get(position)?.as_ref()
    }

    /// Writes the table with a leading unnamed 0-based row index column, then `ts`, then the keys.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut writer = Writer::from_writer(writer);

        let mut header = vec![String::new(), "ts".to_string()];
        header.extend(self.columns.iter().cloned());
        writer.write_record(&header)?;

        for (index, row) in self.rows.iter().enumerate() {
            let mut record = Vec::with_capacity(row.cells.len() + 2);
            record.push(index.to_string());
            record.push(row.ts.to_string());
            record.extend(row.cells.iter().map(|cell| cell.as_ref().map(render_cell).unwrap_or_default()));
            writer.write_record(&record)?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Creates or truncates `path` and writes the table to it.
    pub fn save_csv(&self, path: &Path) -> Result<(), csv::Error> {
        let file = File::create(path)?;
        self.write_csv(file)
    }
}

fn render_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        other => other.to_string(),
    }
}
