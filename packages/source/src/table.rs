//! In-memory table of raw dataset records.
//!
//! Columns are the union of record keys in first-seen order, which for a
//! SODA response is the order the service lists them (`serde_json` is built
//! with `preserve_order`). Cells are
//! rendered as text the same way for CSV output and for typed decoding, so
//! a row read back from the audit CSV matches the row handed to the
//! correlator.

use std::collections::BTreeSet;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::SourceError;

/// Raw records of one extracted dataset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    records: Vec<Map<String, Value>>,
}

impl Table {
    /// Builds a table from SODA records. Non-object records are skipped.
    #[must_use]
    pub fn from_records(records: Vec<Value>) -> Self {
        let mut columns = Vec::new();
        let mut seen = BTreeSet::new();
        let mut rows = Vec::with_capacity(records.len());

        for record in records {
            let map = match record {
                Value::Object(map) => map,
                other => {
                    log::warn!("Skipping non-object record: {other}");
                    continue;
                }
            };
            for key in map.keys() {
                if seen.insert(key.clone()) {
                    columns.push(key.clone());
                }
            }
            rows.push(map);
        }

        Self {
            columns,
            records: rows,
        }
    }

    /// Column names in output order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Cell texts of one record, aligned with [`Self::columns`].
    fn row_values<'a>(
        &'a self,
        record: &'a Map<String, Value>,
    ) -> impl Iterator<Item = String> + 'a {
        self.columns
            .iter()
            .map(move |column| record.get(column).map(cell_text).unwrap_or_default())
    }

    /// Decodes every record into `T`, with each cell passed as its text
    /// form.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Json`] if a record does not fit `T`.
    pub fn rows<T: DeserializeOwned>(&self) -> Result<Vec<T>, SourceError> {
        self.records
            .iter()
            .map(|record| {
                let text: Map<String, Value> = record
                    .iter()
                    .map(|(key, value)| (key.clone(), Value::String(cell_text(value))))
                    .collect();
                Ok(serde_json::from_value(Value::Object(text))?)
            })
            .collect()
    }

    /// Writes the table to `path` as CSV with a header row, replacing any
    /// existing file. An empty table produces an empty file.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the file cannot be written.
    pub fn write_csv(&self, path: &Path) -> Result<(), SourceError> {
        let mut writer = csv::Writer::from_path(path)?;
        if !self.columns.is_empty() {
            writer.write_record(&self.columns)?;
        }
        for record in &self.records {
            writer.write_record(self.row_values(record))?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Text form of a JSON cell: strings verbatim, `null` as empty, everything
/// else as compact JSON.
#[must_use]
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
