use std::path::Path;
use std::sync::Arc;

use arrow::array::{Array, Float32Array, Float64Array, LargeListArray, ListArray};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use super::error::LoadError;
use super::model::{DatasetId, RawDataset, Samples};

/// Tokens accepted in place of a number and skipped.
const MISSING_PLACEHOLDERS: &[&str] = &["", "nan", "NaN", "NAN", "NA", "N/A"];

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a raw dataset from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv` / `.txt` – comma-separated numeric rows, no header
/// * `.parquet`      – first float column; a `List<Float>` column holds one trace per row
pub fn load_file(path: &Path) -> Result<RawDataset, LoadError> {
    let name = display_name(path);
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "csv" | "txt" => {
            let content = std::fs::read(path).map_err(|source| LoadError::Io {
                file: name.clone(),
                source,
            })?;
            parse_csv(&name, &content)
        }
        "parquet" | "pq" => load_parquet(path, &name),
        other => Err(LoadError::UnsupportedFormat {
            file: name,
            extension: other.to_string(),
        }),
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| path.display().to_string())
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// Parse comma-delimited numeric rows.
///
/// Shape rule: a single row or a single column is one flat sequence, anything
/// else is one trace per row.  Rows may differ in length.
pub fn parse_csv(name: &str, content: &[u8]) -> Result<RawDataset, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content);

    let mut rows: Vec<Vec<f64>> = Vec::new();
    let mut widest = 0;
    let mut missing = 0;

    for (row_no, result) in reader.records().enumerate() {
        let record = result.map_err(|source| LoadError::Csv {
            file: name.to_string(),
            source,
        })?;
        widest = widest.max(record.len());

        let mut row = Vec::with_capacity(record.len());
        for (col_no, token) in record.iter().enumerate() {
            if MISSING_PLACEHOLDERS.contains(&token) {
                missing += 1;
                continue;
            }
            let value: f64 = token.parse().map_err(|_| LoadError::MalformedInput {
                file: name.to_string(),
                row: row_no + 1,
                column: col_no + 1,
                token: token.to_string(),
            })?;
            if !value.is_finite() {
                return Err(LoadError::NonFiniteValue {
                    file: name.to_string(),
                    row: row_no + 1,
                    column: col_no + 1,
                    token: token.to_string(),
                });
            }
            row.push(value);
        }
        rows.push(row);
    }

    if missing > 0 {
        log::warn!("{name}: skipped {missing} missing-value placeholder(s)");
    }

    let samples = if rows.len() <= 1 || widest <= 1 {
        Samples::Flat(rows.into_iter().flatten().collect())
    } else {
        Samples::Traces(rows)
    };

    let mut dataset = RawDataset::new(DatasetId::from_content(name, content), name, samples);
    dataset.missing = missing;
    Ok(dataset)
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load traces from a Parquet file.
///
/// The first column of type `List<Float64|Float32>` (one trace per row) or
/// plain `Float64|Float32` (one flat sequence) is used; other columns are
/// ignored.  Null entries count as missing values.
fn load_parquet(path: &Path, name: &str) -> Result<RawDataset, LoadError> {
    let io_err = |source| LoadError::Io {
        file: name.to_string(),
        source,
    };
    let parquet_err = |source| LoadError::Parquet {
        file: name.to_string(),
        source,
    };

    let content = std::fs::read(path).map_err(io_err)?;
    let file = std::fs::File::open(path).map_err(io_err)?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .map_err(parquet_err)?
        .build()
        .map_err(parquet_err)?;

    let mut flat: Vec<f64> = Vec::new();
    let mut traces: Vec<Vec<f64>> = Vec::new();
    let mut is_list = None;
    let mut missing = 0;
    let mut row_base = 0;

    for batch_result in reader {
        let batch = batch_result.map_err(|e| LoadError::Arrow {
            file: name.to_string(),
            message: e.to_string(),
        })?;
        let schema = batch.schema();

        let col_idx = schema
            .fields()
            .iter()
            .position(|f| is_float_list(f.data_type()) || is_float(f.data_type()))
            .ok_or_else(|| LoadError::Arrow {
                file: name.to_string(),
                message: "no float or list-of-float column".to_string(),
            })?;
        let column = batch.column(col_idx);
        let list = is_float_list(column.data_type());
        is_list.get_or_insert(list);
        let plain = if list { Vec::new() } else { float_values(column) };

        for row in 0..batch.num_rows() {
            let abs_row = row_base + row + 1;
            if list {
                if column.is_null(row) {
                    missing += 1;
                    continue;
                }
                let inner = list_value(column, row).map_err(|message| LoadError::Arrow {
                    file: name.to_string(),
                    message,
                })?;
                let mut trace = Vec::with_capacity(inner.len());
                for (j, v) in float_values(&inner).into_iter().enumerate() {
                    match v {
                        Some(v) => trace.push(check_finite(name, abs_row, j + 1, v)?),
                        None => missing += 1,
                    }
                }
                traces.push(trace);
            } else {
                match plain.get(row).copied().flatten() {
                    Some(v) => flat.push(check_finite(name, abs_row, col_idx + 1, v)?),
                    None => missing += 1,
                }
            }
        }
        row_base += batch.num_rows();
    }

    if missing > 0 {
        log::warn!("{name}: skipped {missing} null value(s)");
    }

    let samples = match is_list {
        Some(true) => Samples::Traces(traces),
        _ => Samples::Flat(flat),
    };
    let mut dataset = RawDataset::new(DatasetId::from_content(name, &content), name, samples);
    dataset.missing = missing;
    Ok(dataset)
}

// -- Parquet / Arrow helpers --

fn is_float(dt: &DataType) -> bool {
    matches!(dt, DataType::Float64 | DataType::Float32)
}

fn is_float_list(dt: &DataType) -> bool {
    match dt {
        DataType::List(field) | DataType::LargeList(field) => is_float(field.data_type()),
        _ => false,
    }
}

fn list_value(col: &Arc<dyn Array>, row: usize) -> Result<Arc<dyn Array>, String> {
    match col.data_type() {
        DataType::List(_) => col
            .as_any()
            .downcast_ref::<ListArray>()
            .map(|l| l.value(row))
            .ok_or_else(|| "expected ListArray".to_string()),
        DataType::LargeList(_) => col
            .as_any()
            .downcast_ref::<LargeListArray>()
            .map(|l| l.value(row))
            .ok_or_else(|| "expected LargeListArray".to_string()),
        other => Err(format!("expected List or LargeList column, got {other:?}")),
    }
}

/// Float64 or Float32 values, `None` for nulls.
fn float_values(array: &Arc<dyn Array>) -> Vec<Option<f64>> {
    if let Some(arr) = array.as_any().downcast_ref::<Float64Array>() {
        arr.iter().collect()
    } else if let Some(arr) = array.as_any().downcast_ref::<Float32Array>() {
        arr.iter().map(|v| v.map(f64::from)).collect()
    } else {
        Vec::new()
    }
}

fn check_finite(name: &str, row: usize, column: usize, value: f64) -> Result<f64, LoadError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(LoadError::NonFiniteValue {
            file: name.to_string(),
            row,
            column,
            token: value.to_string(),
        })
    }
}
