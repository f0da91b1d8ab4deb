use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{Map, Number, Value};
use tracing::debug;

use super::table::{Row, Table};
use crate::error::PipelineError;

/// Nested coordinate field split into the `lat`/`lang` columns.
pub const COORDINATES_COLUMN: &str = "location.coordinates";
pub const LAT_COLUMN: &str = "lat";
pub const LANG_COLUMN: &str = "lang";

/// Load any supported record file, choosing the reader by extension.
pub fn load_file(path: &Path) -> Result<Table, PipelineError> {
    let is_csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    if is_csv {
        CsvLoader::new(path)?.load()
    } else {
        RecordLoader::new(path)?.load()
    }
}

fn ensure_file(path: &Path) -> Result<PathBuf, PipelineError> {
    if !path.is_file() {
        return Err(PipelineError::NotFound {
            path: path.to_path_buf(),
        });
    }
    Ok(path.to_path_buf())
}

/// Reads one JSON record file into a flat table.
#[derive(Debug, Clone)]
pub struct RecordLoader {
    path: PathBuf,
}

impl RecordLoader {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        Ok(Self {
            path: ensure_file(path.as_ref())?,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The raw JSON document.
    pub fn load_json(&self) -> Result<Value, PipelineError> {
        let text = fs::read_to_string(&self.path).map_err(|source| PipelineError::Io {
            path: self.path.clone(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| PipelineError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    /// Flattened rows: one per object, nested keys joined with `.`.
    pub fn load(&self) -> Result<Table, PipelineError> {
        let rows = match self.load_json()? {
            Value::Object(object) => vec![normalize(&object)],
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::Object(object) => Ok(normalize(object)),
                    _ => Err(PipelineError::Layout {
                        path: self.path.clone(),
                    }),
                })
                .collect::<Result<Vec<_>, _>>()?,
            _ => {
                return Err(PipelineError::Layout {
                    path: self.path.clone(),
                })
            }
        };
        debug!(path = %self.path.display(), rows = rows.len(), "Loaded record file");
        Ok(Table::from_rows(rows))
    }
}

/// Flatten one object and split its coordinate pair.
pub fn normalize(object: &Map<String, Value>) -> Row {
    let mut row = Row::new();
    flatten_into(&mut row, None, object);
    derive_coordinates(&mut row);
    row
}

fn flatten_into(row: &mut Row, prefix: Option<&str>, object: &Map<String, Value>) {
    for (key, value) in object {
        let column = match prefix {
            Some(prefix) => format!("{}.{}", prefix, key),
            None => key.clone(),
        };
        match value {
            Value::Object(nested) if !nested.is_empty() => {
                flatten_into(row, Some(&column), nested)
            }
            Value::Null => {}
            other => {
                row.insert(column, other.clone());
            }
        }
    }
}

fn derive_coordinates(row: &mut Row) {
    let Some(coordinates) = row.remove(COORDINATES_COLUMN) else {
        return;
    };
    if let Value::Array(pair) = coordinates {
        for (index, column) in [LAT_COLUMN, LANG_COLUMN].into_iter().enumerate() {
            if let Some(value) = pair.get(index).filter(|v| !v.is_null()) {
                row.insert(column.to_string(), value.clone());
            }
        }
    }
}

/// Reads the `dtg, lat, lon, cause` demo CSV into a table.
#[derive(Debug, Clone)]
pub struct CsvLoader {
    path: PathBuf,
}

impl CsvLoader {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        Ok(Self {
            path: ensure_file(path.as_ref())?,
        })
    }

    pub fn load(&self) -> Result<Table, PipelineError> {
        let csv_error = |source| PipelineError::Csv {
            path: self.path.clone(),
            source,
        };
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(&self.path)
            .map_err(csv_error)?;
        let headers = reader.headers().map_err(csv_error)?.clone();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(csv_error)?;
            let row: Row = headers
                .iter()
                .zip(record.iter())
                .filter(|(_, raw)| !raw.is_empty())
                .map(|(header, raw)| (header.to_string(), csv_cell(raw)))
                .collect();
            rows.push(row);
        }
        debug!(path = %self.path.display(), rows = rows.len(), "Loaded CSV file");
        Ok(Table::with_columns(
            headers.iter().map(str::to_string).collect(),
            rows,
        ))
    }
}

fn csv_cell(raw: &str) -> Value {
    if let Ok(int) = raw.parse::<i64>() {
        return Value::from(int);
    }
    raw.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = RecordLoader::new("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, PipelineError::NotFound { .. }));
    }

    #[test]
    fn nested_fields_are_flattened_and_coordinates_split() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "a.txt",
            r#"[{"count": 4, "source": {"id": "BXL01"},
                 "location": {"type": "Point", "coordinates": [4.35, 50.84]}},
                {"count": 2, "source": {"id": "BXL02"}}]"#,
        );
        let table = RecordLoader::new(&path).unwrap().load().unwrap();

        assert_eq!(table.len(), 2);
        let first = &table.rows()[0];
        assert_eq!(first.get("source.id"), Some(&json!("BXL01")));
        assert_eq!(first.get("location.type"), Some(&json!("Point")));
        assert_eq!(first.get("lat"), Some(&json!(4.35)));
        assert_eq!(first.get("lang"), Some(&json!(50.84)));
        assert!(!first.contains_key(COORDINATES_COLUMN));

        let second = &table.rows()[1];
        assert!(!second.contains_key("lat"));
        assert!(table.has_column("lat"));
    }

    #[test]
    fn single_object_is_one_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "one.json", r#"{"count": 1}"#);
        assert_eq!(RecordLoader::new(&path).unwrap().load().unwrap().len(), 1);
    }

    #[test]
    fn scalar_document_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "bad.json", "42");
        let err = RecordLoader::new(&path).unwrap().load().unwrap_err();
        assert!(matches!(err, PipelineError::Layout { .. }));
    }

    #[test]
    fn csv_cells_are_typed() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "incidents.csv",
            "dtg,lat,lon,cause\n2023-05-01 08:00,52.1,10.2,collision\n2023-05-01 09:00,,10.3,\n",
        );
        let table = load_file(&path).unwrap();

        assert_eq!(table.columns(), ["dtg", "lat", "lon", "cause"]);
        assert_eq!(table.rows()[0].get("lat"), Some(&json!(52.1)));
        assert_eq!(table.rows()[0].get("cause"), Some(&json!("collision")));
        assert!(!table.rows()[1].contains_key("lat"));
        assert!(!table.rows()[1].contains_key("cause"));
    }
}
