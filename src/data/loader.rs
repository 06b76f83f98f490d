use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};

use arrow::array::{Array, ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::DataType;
use log::{debug, info, warn};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::model::{Column, Record, Table, Value};
use crate::error::LoadError;

// ---------------------------------------------------------------------------
// Column names (boundary renaming)
// ---------------------------------------------------------------------------

/// Source header for each schema column. Renaming happens here and nowhere
/// else; matching is exact and case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnNames {
    pub region: String,
    pub gender: String,
    pub age: String,
    pub visits: String,
    pub latitude: String,
    pub longitude: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        ColumnNames {
            region: Column::Region.default_header().to_string(),
            gender: Column::Gender.default_header().to_string(),
            age: Column::Age.default_header().to_string(),
            visits: Column::Visits.default_header().to_string(),
            latitude: Column::Latitude.default_header().to_string(),
            longitude: Column::Longitude.default_header().to_string(),
        }
    }
}

impl ColumnNames {
    pub fn header(&self, column: Column) -> &str {
        match column {
            Column::Region => &self.region,
            Column::Gender => &self.gender,
            Column::Age => &self.age,
            Column::Visits => &self.visits,
            Column::Latitude => &self.latitude,
            Column::Longitude => &self.longitude,
        }
    }

    /// Map each schema column to its position among `headers`.
    fn resolve<'h, I>(&self, headers: I) -> Result<[usize; 6], LoadError>
    where
        I: IntoIterator<Item = &'h str>,
    {
        let headers: Vec<&str> = headers.into_iter().map(str::trim).collect();
        let mut index = [0usize; 6];
        let mut missing = Vec::new();
        for column in Column::ALL {
            let wanted = self.header(column);
            match headers.iter().position(|h| *h == wanted) {
                Some(pos) => index[column.index()] = pos,
                None => missing.push(wanted.to_string()),
            }
        }
        if missing.is_empty() {
            Ok(index)
        } else {
            Err(LoadError::Schema { missing })
        }
    }
}

// ---------------------------------------------------------------------------
// Load results
// ---------------------------------------------------------------------------

/// A row that was skipped because one of its cells could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowWarning {
    /// 1-based position in the source: the file line for CSV (the header
    /// is line 1), the record number for JSON and Parquet.
    pub line: usize,
    /// Header of the offending column, when the problem is cell-specific.
    pub column: Option<String>,
    pub message: String,
}

impl fmt::Display for RowWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.column {
            Some(col) => write!(f, "line {}, {col}: {}", self.line, self.message),
            None => write!(f, "line {}: {}", self.line, self.message),
        }
    }
}

/// A successfully loaded source: the table plus every skipped row.
#[derive(Debug, Clone)]
pub struct LoadedDataset {
    pub table: Table,
    pub warnings: Vec<RowWarning>,
    pub source: PathBuf,
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load a patient table using the default Spanish headers.
pub fn load(path: &Path) -> Result<LoadedDataset, LoadError> {
    load_with(path, &ColumnNames::default())
}

/// Load a patient table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row plus one patient per line
/// * `.json`    – `[{ "Departamento": ..., "Edad": ..., ... }, ...]`
/// * `.parquet` – one column per schema field
pub fn load_with(path: &Path, names: &ColumnNames) -> Result<LoadedDataset, LoadError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let mut rows = RowCollector::new(names);
    match ext.as_str() {
        "csv" => load_csv(path, names, &mut rows)?,
        "json" => load_json(path, names, &mut rows)?,
        "parquet" | "pq" => load_parquet(path, names, &mut rows)?,
        other => return Err(LoadError::UnsupportedFormat(other.to_string())),
    }

    let (table, warnings) = rows.finish();
    info!(
        "loaded {} patient records from {} ({} rows skipped)",
        table.len(),
        path.display(),
        warnings.len()
    );
    Ok(LoadedDataset {
        table,
        warnings,
        source: path.to_path_buf(),
    })
}

fn unavailable(path: &Path, source: std::io::Error) -> LoadError {
    LoadError::SourceUnavailable {
        path: path.to_path_buf(),
        source,
    }
}

fn malformed(path: &Path, message: impl fmt::Display) -> LoadError {
    LoadError::Malformed {
        path: path.to_path_buf(),
        message: message.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Row validation shared by every format
// ---------------------------------------------------------------------------

/// Accumulates valid records and per-row warnings.
struct RowCollector<'a> {
    names: &'a ColumnNames,
    records: Vec<Record>,
    warnings: Vec<RowWarning>,
}

impl<'a> RowCollector<'a> {
    fn new(names: &'a ColumnNames) -> Self {
        RowCollector {
            names,
            records: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Validate one raw row (cells in [`Column::ALL`] order).
    fn push(&mut self, line: usize, cells: [Value; 6]) {
        match self.parse(line, cells) {
            Ok(record) => self.records.push(record),
            Err(warning) => self.skip(warning),
        }
    }

    fn skip(&mut self, warning: RowWarning) {
        warn!("skipping row: {warning}");
        self.warnings.push(warning);
    }

    fn parse(&self, line: usize, cells: [Value; 6]) -> Result<Record, RowWarning> {
        let [region, gender, age, visits, latitude, longitude] = cells;
        let fail = |column: Column, message: String| RowWarning {
            line,
            column: Some(self.names.header(column).to_string()),
            message,
        };

        let age = match to_integer(&age).map_err(|m| fail(Column::Age, m))? {
            Some(a) if (0..=99).contains(&a) => Some(a as u8),
            Some(a) => return Err(fail(Column::Age, format!("{a} is outside 0–99"))),
            None => None,
        };
        let visits = match to_integer(&visits).map_err(|m| fail(Column::Visits, m))? {
            Some(v) => Some(
                u32::try_from(v)
                    .map_err(|_| fail(Column::Visits, format!("{v} is not a valid visit count")))?,
            ),
            None => None,
        };

        Ok(Record {
            region: to_text(region),
            gender: to_text(gender),
            age,
            visits,
            latitude: to_float(&latitude).map_err(|m| fail(Column::Latitude, m))?,
            longitude: to_float(&longitude).map_err(|m| fail(Column::Longitude, m))?,
        })
    }

    fn finish(self) -> (Table, Vec<RowWarning>) {
        (Table::from_records(self.records), self.warnings)
    }
}

/// Empty or whitespace-only text is treated as a missing value.
fn to_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Text(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else if trimmed.len() == s.len() {
                Some(s)
            } else {
                Some(trimmed.to_string())
            }
        }
        other => Some(other.to_string()),
    }
}

fn to_integer(value: &Value) -> Result<Option<i64>, String> {
    match value {
        Value::Null => Ok(None),
        Value::Integer(i) => Ok(Some(*i)),
        Value::Float(f) => integral(*f)
            .map(Some)
            .ok_or_else(|| format!("{f} is not an integer")),
        Value::Text(s) => {
            let s = s.trim();
            if s.is_empty() {
                return Ok(None);
            }
            if let Ok(i) = s.parse::<i64>() {
                return Ok(Some(i));
            }
            s.parse::<f64>()
                .ok()
                .and_then(integral)
                .map(Some)
                .ok_or_else(|| format!("'{s}' is not an integer"))
        }
    }
}

/// Accept whole floats such as `34.0`, which pandas writes for integer
/// columns that contain nulls.
fn integral(f: f64) -> Option<i64> {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

fn to_float(value: &Value) -> Result<Option<f64>, String> {
    match value {
        Value::Null => Ok(None),
        Value::Integer(i) => Ok(Some(*i as f64)),
        Value::Float(f) => Ok(Some(*f)),
        Value::Text(s) => {
            let s = s.trim();
            if s.is_empty() {
                return Ok(None);
            }
            s.parse::<f64>()
                .map(Some)
                .map_err(|_| format!("'{s}' is not a number"))
        }
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, one patient per record.
/// Extra columns are ignored.
fn load_csv(path: &Path, names: &ColumnNames, rows: &mut RowCollector<'_>) -> Result<(), LoadError> {
    let file = File::open(path).map_err(|e| unavailable(path, e))?;
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(file);
    let headers = reader
        .headers()
        .map_err(|e| malformed(path, format!("reading CSV headers: {e}")))?
        .clone();
    let index = names.resolve(headers.iter())?;
    debug!("CSV column positions: {index:?}");

    for (row_no, result) in reader.records().enumerate() {
        let fallback_line = row_no + 2;
        let record = match result {
            Ok(record) => record,
            Err(e) if e.is_io_error() => return Err(malformed(path, e)),
            Err(e) => {
                let line = e
                    .position()
                    .map_or(fallback_line, |p| p.line() as usize);
                rows.skip(RowWarning {
                    line,
                    column: None,
                    message: e.to_string(),
                });
                continue;
            }
        };
        let line = record
            .position()
            .map_or(fallback_line, |p| p.line() as usize);

        if record.len() != headers.len() {
            rows.skip(RowWarning {
                line,
                column: None,
                message: format!(
                    "expected {} fields, found {}",
                    headers.len(),
                    record.len()
                ),
            });
            continue;
        }

        let cells = index.map(|i| match record.get(i) {
            Some(s) if !s.trim().is_empty() => Value::Text(s.to_string()),
            _ => Value::Null,
        });
        rows.push(line, cells);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, the default
/// `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "Departamento": "Antioquia", "Genero": "Femenino", "Edad": 34,
///     "Visitas": 2, "Latitud": 6.25, "Longitud": -75.56 },
///   ...
/// ]
/// ```
///
/// The first object fixes the schema (a source with no object at all has
/// none of the required columns); later objects lacking a key read it as
/// null.
fn load_json(path: &Path, names: &ColumnNames, rows: &mut RowCollector<'_>) -> Result<(), LoadError> {
    let text = std::fs::read_to_string(path).map_err(|e| unavailable(path, e))?;
    let root: JsonValue =
        serde_json::from_str(&text).map_err(|e| malformed(path, format!("parsing JSON: {e}")))?;
    let records = root
        .as_array()
        .ok_or_else(|| malformed(path, "expected top-level JSON array"))?;

    let first = records.iter().find_map(JsonValue::as_object);
    names.resolve(first.into_iter().flat_map(|obj| obj.keys().map(String::as_str)))?;

    for (i, rec) in records.iter().enumerate() {
        let line = i + 1;
        let Some(obj) = rec.as_object() else {
            rows.skip(RowWarning {
                line,
                column: None,
                message: "record is not a JSON object".to_string(),
            });
            continue;
        };
        let cells = Column::ALL.map(|c| obj.get(names.header(c)).map_or(Value::Null, json_to_value));
        rows.push(line, cells);
    }
    Ok(())
}

fn json_to_value(val: &JsonValue) -> Value {
    match val {
        JsonValue::String(s) => Value::Text(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Integer(i)
            } else if let Some(f) = n.as_f64() {
                Value::Float(f)
            } else {
                Value::Text(n.to_string())
            }
        }
        JsonValue::Null => Value::Null,
        other => Value::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file with one column per schema field.
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`). Each column is normalised once per
/// batch (see [`normalise`]), so cells are read from three array types only.
fn load_parquet(
    path: &Path,
    names: &ColumnNames,
    rows: &mut RowCollector<'_>,
) -> Result<(), LoadError> {
    let file = File::open(path).map_err(|e| unavailable(path, e))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(|e| malformed(path, format!("reading parquet metadata: {e}")))?;

    let index = names.resolve(builder.schema().fields().iter().map(|f| f.name().as_str()))?;

    let reader = builder
        .build()
        .map_err(|e| malformed(path, format!("building parquet reader: {e}")))?;

    let mut line = 0;
    for batch_result in reader {
        let batch =
            batch_result.map_err(|e| malformed(path, format!("reading parquet record batch: {e}")))?;

        let mut columns = Vec::with_capacity(index.len());
        for column in Column::ALL {
            let array = normalise(batch.column(index[column.index()]), column).map_err(|e| {
                malformed(path, format!("column {}: {e}", names.header(column)))
            })?;
            columns.push(array);
        }

        for row in 0..batch.num_rows() {
            line += 1;
            let cells = Column::ALL.map(|c| arrow_cell(&columns[c.index()], row));
            rows.push(line, cells);
        }
    }
    Ok(())
}

// -- Parquet / Arrow helpers --

/// Cast a source column to one of Utf8, Int64 or Float64.
///
/// Categorical columns become Utf8 whatever their type (dictionary,
/// boolean, numbers). Numeric columns keep numbers numeric: signed and
/// small unsigned integers widen to Int64, UInt64 goes through Float64 so
/// values past `i64::MAX` fail the row instead of wrapping, and anything
/// else becomes Utf8 and is parsed per cell like CSV text.
fn normalise(col: &ArrayRef, column: Column) -> Result<ArrayRef, arrow::error::ArrowError> {
    let source = col.data_type();
    let target = if !column.is_numeric() {
        DataType::Utf8
    } else if matches!(source, DataType::UInt64) || source.is_floating() {
        DataType::Float64
    } else if source.is_integer() {
        DataType::Int64
    } else {
        DataType::Utf8
    };
    if *source == target {
        Ok(col.clone())
    } else {
        arrow::compute::cast(col, &target)
    }
}

/// Extract a single cell from a normalised column at a given row.
fn arrow_cell(col: &ArrayRef, row: usize) -> Value {
    if col.is_null(row) {
        return Value::Null;
    }
    let any = col.as_any();
    if let Some(a) = any.downcast_ref::<StringArray>() {
        Value::Text(a.value(row).to_string())
    } else if let Some(a) = any.downcast_ref::<Int64Array>() {
        Value::Integer(a.value(row))
    } else if let Some(a) = any.downcast_ref::<Float64Array>() {
        Value::Float(a.value(row))
    } else {
        // Not produced by `normalise`; reported as an unparseable cell.
        Value::Text(format!("<{:?}>", col.data_type()))
    }
}
