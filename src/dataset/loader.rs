//! CSV loading.

use crate::core::error::{EnsembleError, Result};
use crate::dataset::Dataset;
use csv::{ReaderBuilder, StringRecord};
use ndarray::{Array1, Array2};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// What to do with a named column while loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetColumn<'a> {
    /// Every column is a feature
    None,
    /// The named column is the target and must exist
    Required(&'a str),
    /// The named column is dropped when present; no target is kept
    Ignore(&'a str),
}

/// Loads headered numeric CSV data into a [`Dataset`].
#[derive(Debug, Clone)]
pub struct CsvLoader {
    delimiter: u8,
}

impl Default for CsvLoader {
    fn default() -> Self {
        CsvLoader { delimiter: b',' }
    }
}

impl CsvLoader {
    /// Loader for comma separated data
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different field delimiter
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Column names of headered CSV data
    pub fn headers<R: Read>(&self, reader: R) -> Result<Vec<String>> {
        let mut reader = self.reader(reader);
        Ok(reader.headers()?.iter().map(str::to_string).collect())
    }

    /// Load from a file
    pub fn load_path<P: AsRef<Path>>(&self, path: P, target: TargetColumn<'_>) -> Result<Dataset> {
        let path = path.as_ref();
        log::debug!("Loading CSV file: {}", path.display());
        self.load(File::open(path)?, target)
    }

    /// Load from in-memory bytes
    pub fn load_bytes(&self, bytes: &[u8], target: TargetColumn<'_>) -> Result<Dataset> {
        self.load(bytes, target)
    }

    /// Load from any reader
    pub fn load<R: Read>(&self, reader: R, target: TargetColumn<'_>) -> Result<Dataset> {
        let mut reader = self.reader(reader);
        let headers = reader.headers()?.clone();
        if headers.is_empty() {
            return Err(EnsembleError::invalid_input("CSV data has no columns"));
        }

        let target_index = match target {
            TargetColumn::Required(name) => Some(position(&headers, name).ok_or_else(|| {
                EnsembleError::invalid_input(format!("target column '{}' not found", name))
            })?),
            TargetColumn::Ignore(name) => position(&headers, name),
            TargetColumn::None => None,
        };

        let feature_cols: Vec<usize> = (0..headers.len())
            .filter(|&col| Some(col) != target_index)
            .collect();
        let feature_names: Vec<String> = feature_cols
            .iter()
            .map(|&col| headers[col].to_string())
            .collect();

        let mut values = Vec::new();
        let mut targets = Vec::new();
        let mut n_rows = 0;

        for (row, record) in reader.records().enumerate() {
            let record = record?;
            if record.len() != headers.len() {
                return Err(EnsembleError::invalid_input(format!(
                    "row {} has {} fields, expected {}",
                    row + 1,
                    record.len(),
                    headers.len()
                )));
            }

            for &col in &feature_cols {
                values.push(parse_numeric_value(&record[col], row, &headers[col])?);
            }
            if let (Some(col), TargetColumn::Required(_)) = (target_index, target) {
                targets.push(parse_numeric_value(&record[col], row, &headers[col])?);
            }
            n_rows += 1;
        }

        let features = Array2::from_shape_vec((n_rows, feature_cols.len()), values)
            .map_err(|err| EnsembleError::internal(format!("feature matrix shape: {}", err)))?;

        let target = match target {
            TargetColumn::Required(name) => Some((name.to_string(), Array1::from_vec(targets))),
            _ => None,
        };

        Dataset::new(feature_names, features, target)
    }

    fn reader<R: Read>(&self, reader: R) -> csv::Reader<R> {
        ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader)
    }
}

fn position(headers: &StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|header| header == name)
}

fn parse_numeric_value(value: &str, row: usize, column: &str) -> Result<f64> {
    value.trim().parse::<f64>().map_err(|_| {
        EnsembleError::invalid_input(format!(
            "invalid value '{}' at row {}, column '{}'",
            value,
            row + 1,
            column
        ))
    })
}
