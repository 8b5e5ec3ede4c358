//! Histogram tables backed by Arrow record batches.
//!
//! A histogram becomes a table of `Float64` columns:
//!
//! - 1D: `{x_label}` (lower bin edges) and `values`.
//! - 2D: `{x_label}` and one column `{y_label}_{i}` per y bin. The source array is
//!   indexed `[y_bin][x_bin]`, so each y slice becomes one column of length `n_x`.
//!
//! Table-level metadata is stored as Arrow schema metadata and survives the IPC
//! round trip through [`write_table`] / [`read_table`].

use crate::error::{SimtoolsError, SimtoolsResult};
use arrow::array::{Array, ArrayRef, Float64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::ipc::reader::FileReader;
use arrow::ipc::writer::FileWriter;
use arrow::record_batch::RecordBatch;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// File extension used for persisted tables.
pub const TABLE_EXTENSION: &str = "arrow";

/// Column name holding 1D histogram contents.
pub const VALUES_COLUMN: &str = "values";

/// Histogram contents.
#[derive(Debug, Clone, PartialEq)]
pub enum Histogram {
    /// One value per x bin.
    OneD(Vec<f64>),
    /// One slice per y bin, each with one value per x bin.
    TwoD(Vec<Vec<f64>>),
}

/// Named-column histogram table with metadata annotations.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramTable {
    batch: RecordBatch,
}

impl HistogramTable {
    /// Number of rows (x bins).
    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    /// Number of columns including the x column.
    pub fn num_columns(&self) -> usize {
        self.batch.num_columns()
    }

    /// Column names in table order.
    pub fn column_names(&self) -> Vec<String> {
        self.batch
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect()
    }

    /// Values of a column, or `None` if no column has that name.
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        self.batch
            .column_by_name(name)?
            .as_any()
            .downcast_ref::<Float64Array>()
            .map(|array| array.values().to_vec())
    }

    /// Table-level metadata.
    pub fn metadata(&self) -> &HashMap<String, String> {
        self.batch.schema_ref().metadata()
    }

    /// Copy of this table with `extra` merged into its metadata (existing keys win).
    pub fn with_metadata(&self, extra: HashMap<String, String>) -> SimtoolsResult<Self> {
        let schema = self.batch.schema();
        let mut metadata = extra;
        metadata.extend(schema.metadata().clone());
        let schema = Arc::new(Schema::new(schema.fields().clone()).with_metadata(metadata));
        Ok(Self {
            batch: self.batch.clone().with_schema(schema)?,
        })
    }

    /// Underlying Arrow record batch.
    pub fn record_batch(&self) -> &RecordBatch {
        &self.batch
    }
}

/// Build a histogram table.
///
/// `y_bin_edges` and `y_label` are required for [`Histogram::TwoD`] and must be absent
/// for [`Histogram::OneD`].
///
/// # Errors
///
/// `ShapeMismatch` when the histogram does not match `len(edges) - 1` bins along either
/// axis; data is never truncated. `MissingKey` for a 2D histogram without `y_label`.
/// `InvalidValue` when `x_label` collides with a value column name (`values`, or
/// `{y_label}_{i}`).
pub fn fill_table(
    hist: &Histogram,
    x_bin_edges: &[f64],
    y_bin_edges: Option<&[f64]>,
    x_label: &str,
    y_label: Option<&str>,
    meta: &HashMap<String, String>,
) -> SimtoolsResult<HistogramTable> {
    if x_bin_edges.len() < 2 {
        return Err(SimtoolsError::ShapeMismatch(format!(
            "need at least two x bin edges, got {}",
            x_bin_edges.len()
        )));
    }
    let n_x = x_bin_edges.len() - 1;

    let mut fields = vec![Field::new(x_label, DataType::Float64, false)];
    let mut columns: Vec<ArrayRef> = vec![Arc::new(Float64Array::from(
        x_bin_edges[..n_x].to_vec(),
    ))];

    match (hist, y_bin_edges) {
        (Histogram::OneD(values), None) => {
            check_len(values.len(), n_x, "histogram length vs. x bins")?;
            fields.push(Field::new(VALUES_COLUMN, DataType::Float64, false));
            columns.push(Arc::new(Float64Array::from(values.clone())));
        }
        (Histogram::OneD(_), Some(_)) => {
            return Err(SimtoolsError::ShapeMismatch(
                "y bin edges given for a 1D histogram".to_string(),
            ));
        }
        (Histogram::TwoD(_), None) => {
            return Err(SimtoolsError::ShapeMismatch(
                "2D histogram requires y bin edges".to_string(),
            ));
        }
        (Histogram::TwoD(slices), Some(y_edges)) => {
            let y_label = y_label.ok_or_else(|| SimtoolsError::missing("y_label"))?;
            if y_edges.len() < 2 {
                return Err(SimtoolsError::ShapeMismatch(format!(
                    "need at least two y bin edges, got {}",
                    y_edges.len()
                )));
            }
            let n_y = y_edges.len() - 1;
            check_len(slices.len(), n_y, "histogram slices vs. y bins")?;
            for (i, slice) in slices.iter().enumerate() {
                check_len(slice.len(), n_x, &format!("slice {} vs. x bins", i))?;
                fields.push(Field::new(
                    format!("{}_{}", y_label, i),
                    DataType::Float64,
                    false,
                ));
                columns.push(Arc::new(Float64Array::from(slice.clone())));
            }
        }
    }

    check_unique_names(&fields)?;
    let schema = Arc::new(Schema::new(fields).with_metadata(meta.clone()));
    let batch = RecordBatch::try_new(schema, columns)?;
    Ok(HistogramTable { batch })
}

/// Column names must be unique, otherwise one column shadows another by name.
fn check_unique_names(fields: &[Field]) -> SimtoolsResult<()> {
    let mut seen = HashSet::new();
    for field in fields {
        if !seen.insert(field.name().as_str()) {
            tracing::error!("Duplicate column name {} in histogram table", field.name());
            return Err(SimtoolsError::invalid("column name", field.name().as_str()));
        }
    }
    Ok(())
}

fn check_len(actual: usize, expected: usize, what: &str) -> SimtoolsResult<()> {
    if actual != expected {
        return Err(SimtoolsError::ShapeMismatch(format!(
            "{}: {} != {}",
            what, actual, expected
        )));
    }
    Ok(())
}

/// Write a table to an Arrow IPC file, creating parent directories.
pub fn write_table<P: AsRef<Path>>(table: &HistogramTable, path: P) -> SimtoolsResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let file = File::create(path)?;
    let mut writer = FileWriter::try_new(file, &table.batch.schema())?;
    writer.write(&table.batch)?;
    writer.finish()?;

    tracing::info!(
        "Wrote histogram table ({} rows, {} columns) to {}",
        table.num_rows(),
        table.num_columns(),
        path.display()
    );
    Ok(())
}

/// Read a table written by [`write_table`].
pub fn read_table<P: AsRef<Path>>(path: P) -> SimtoolsResult<HistogramTable> {
    let path = path.as_ref();
    let reader = FileReader::try_new(File::open(path)?, None)?;
    let schema = reader.schema();
    let mut batches = reader.collect::<Result<Vec<_>, _>>()?;
    let batch = match batches.len() {
        0 => RecordBatch::new_empty(schema),
        1 => batches.remove(0),
        _ => arrow::compute::concat_batches(&schema, &batches)?,
    };
    tracing::debug!("Read histogram table from {}", path.display());
    Ok(HistogramTable { batch })
}

/// Read every `*.arrow` table in a directory, ordered by file name.
pub fn read_tables<P: AsRef<Path>>(dir: P) -> SimtoolsResult<Vec<HistogramTable>> {
    let mut paths = std::fs::read_dir(dir.as_ref())?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<PathBuf>, _>>()?;
    paths.retain(|p| p.extension().and_then(|e| e.to_str()) == Some(TABLE_EXTENSION));
    paths.sort();
    paths.iter().map(read_table).collect()
}
