//! Tabular reports: column derivation, row materialization and CSV export

use std::fs::File;
use std::io::Write;
use std::path::Path;

use csv::{QuoteStyle, WriterBuilder};
use indexmap::IndexSet;
use serde_json::Value;

use super::ExperimentRecord;
use crate::Result;

/// Cell value emitted when no source carries the column.
pub const MISSING_VALUE: &str = "?";

/// Field delimiter for every report.
pub const DELIMITER: u8 = b';';

/// Quote character for fields that need quoting.
pub const QUOTE: u8 = b'|';

/// A rendered table for one benchmark.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Report {
    /// Build the report for `benchmark`.
    ///
    /// Columns are derived from every experiment in `schema_sources`; rows
    /// come only from `row_sources`. The aggregate report passes the same
    /// experiments for both, a per-experiment report narrows the rows.
    #[must_use]
    pub fn build<'a, S, R>(benchmark: &str, schema_sources: S, row_sources: R) -> Self
    where
        S: IntoIterator<Item = &'a ExperimentRecord>,
        R: IntoIterator<Item = &'a ExperimentRecord>,
    {
        let columns = derive_columns(schema_sources, benchmark);
        let rows = row_sources
            .into_iter()
            .flat_map(|experiment| materialize_rows(experiment, benchmark, &columns))
            .collect();
        Self { columns, rows }
    }

    /// Column titles, in output order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Data rows, one per data point.
    #[must_use]
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Value of `column` in row `row`, if both exist.
    #[must_use]
    pub fn cell(&self, row: usize, column: &str) -> Option<&str> {
        let index = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row).map(|r| r[index].as_str())
    }

    /// Write the header and rows as semicolon-delimited CSV.
    ///
    /// A report without columns writes nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying writer fails.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        if self.columns.is_empty() {
            return Ok(());
        }
        let mut wtr = WriterBuilder::new()
            .delimiter(DELIMITER)
            .quote(QUOTE)
            .quote_style(QuoteStyle::Necessary)
            .flexible(true)
            .from_writer(writer);

        wtr.write_record(&self.columns)?;
        for row in &self.rows {
            wtr.write_record(row)?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Render the report into a string.
    ///
    /// # Errors
    ///
    /// Returns an error if CSV encoding fails.
    pub fn to_csv_string(&self) -> Result<String> {
        let mut buffer = Vec::new();
        self.write_csv(&mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    /// Write the report to `path`, replacing any previous content.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written.
    pub fn write_file(&self, path: &Path) -> Result<()> {
        self.write_csv(File::create(path)?)
    }
}

/// Derive report columns for `benchmark`.
///
/// Data-point keys are seeded from the first data point of each experiment.
/// Configuration keys that are not data-point keys go to the leading group.
/// Keys that first appear in later data points join the data-point group.
/// Output is the leading group followed by the data-point group.
pub fn derive_columns<'a, I>(experiments: I, benchmark: &str) -> Vec<String>
where
    I: IntoIterator<Item = &'a ExperimentRecord>,
{
    let experiments: Vec<&ExperimentRecord> = experiments.into_iter().collect();
    let mut data_keys: IndexSet<&str> = IndexSet::new();
    let mut other_keys: IndexSet<&str> = IndexSet::new();

    for experiment in &experiments {
        if let Some(first) = experiment.data_points(benchmark).first() {
            data_keys.extend(first.keys().map(String::as_str));
        }
    }

    for experiment in &experiments {
        for key in experiment.configuration().keys() {
            if !data_keys.contains(key.as_str()) {
                other_keys.insert(key);
            }
        }
    }

    for experiment in &experiments {
        for point in experiment.data_points(benchmark).iter().skip(1) {
            for key in point.keys() {
                if !other_keys.contains(key.as_str()) {
                    data_keys.insert(key);
                }
            }
        }
    }

    other_keys
        .into_iter()
        .chain(data_keys)
        .map(String::from)
        .collect()
}

/// Materialize one row per data point of `benchmark` in `experiment`.
///
/// Each cell takes the first value found in the data point, then the
/// configuration, then the metadata, else [`MISSING_VALUE`].
#[must_use]
pub fn materialize_rows(
    experiment: &ExperimentRecord,
    benchmark: &str,
    columns: &[String],
) -> Vec<Vec<String>> {
    experiment
        .data_points(benchmark)
        .iter()
        .map(|point| {
            columns
                .iter()
                .map(|column| {
                    point
                        .get(column)
                        .or_else(|| experiment.configuration().get(column))
                        .or_else(|| experiment.metadata().get(column))
                        .map_or_else(|| MISSING_VALUE.to_string(), render_value)
                })
                .collect()
        })
        .collect()
}

/// Render a JSON value as a CSV cell.
#[must_use]
pub fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
