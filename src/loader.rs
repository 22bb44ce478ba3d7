//! Loading of whitespace-delimited measurement files.
//!
//! Simulator and estimator outputs are plain text with one flow instance
//! per line and one measurement per column. Which column holds which
//! metric is configuration; this module only knows how to pull a column
//! out of a file.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// How values are rounded as they are read
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rounding {
    /// Keep values as written
    #[default]
    None,
    /// Round half away from zero to the nearest integer
    Nearest,
}

impl Rounding {
    pub fn apply(self, value: f64) -> f64 {
        match self {
            Rounding::None => value,
            Rounding::Nearest => value.round(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}:{line}: missing column {column}")]
    MissingColumn {
        path: PathBuf,
        line: usize,
        column: usize,
    },

    #[error("{path}:{line}: column {column} is not a number: '{value}'")]
    InvalidNumber {
        path: PathBuf,
        line: usize,
        column: usize,
        value: String,
    },

    #[error("{path}:{line}: column {column} is not finite: '{value}'")]
    NonFinite {
        path: PathBuf,
        line: usize,
        column: usize,
        value: String,
    },

    #[error("{path}: no records")]
    Empty { path: PathBuf },
}

/// Read one numeric column from every record of a file
pub fn read_column(path: &Path, column: usize, rounding: Rounding) -> Result<Vec<f64>, LoadError> {
    read_records(path, |line_no, fields| {
        let value = parse_field(path, line_no, fields, column)?;
        Ok(rounding.apply(value))
    })
}

/// Read an integer identifier column; `"3"` and `"3.0"` are both accepted
pub fn read_id_column(path: &Path, column: usize) -> Result<Vec<i64>, LoadError> {
    read_records(path, |line_no, fields| {
        let raw = field(path, line_no, fields, column)?;
        if let Ok(id) = raw.parse::<i64>() {
            return Ok(id);
        }
        let value = parse_field(path, line_no, fields, column)?;
        // i64::MAX as f64 rounds up to 2^63, which is already out of range
        if value.fract() != 0.0 || value < i64::MIN as f64 || value >= i64::MAX as f64 {
            return Err(LoadError::InvalidNumber {
                path: path.to_path_buf(),
                line: line_no,
                column,
                value: raw.to_string(),
            });
        }
        Ok(value as i64)
    })
}

/// Read `(source, destination)` pairs from a topology file
pub fn read_endpoints(
    path: &Path,
    source_column: usize,
    destination_column: usize,
) -> Result<Vec<(i64, i64)>, LoadError> {
    let sources = read_id_column(path, source_column)?;
    let destinations = read_id_column(path, destination_column)?;
    Ok(sources.into_iter().zip(destinations).collect())
}

/// Count the records of a file without parsing any column
pub fn count_records(path: &Path) -> Result<usize, LoadError> {
    read_records(path, |_, _| Ok(())).map(|records| records.len())
}

fn read_records<T, F>(path: &Path, mut parse: F) -> Result<Vec<T>, LoadError>
where
    F: FnMut(usize, &[&str]) -> Result<T, LoadError>,
{
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = BufReader::with_capacity(64 * 1024, file);

    let mut records = Vec::new();
    for (idx, line_result) in reader.lines().enumerate() {
        let line = line_result.map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = trimmed.split_whitespace().collect();
        records.push(parse(idx + 1, &fields)?);
    }

    if records.is_empty() {
        return Err(LoadError::Empty {
            path: path.to_path_buf(),
        });
    }
    log::debug!("Read {} records from {}", records.len(), path.display());
    Ok(records)
}

fn field<'a>(
    path: &Path,
    line: usize,
    fields: &[&'a str],
    column: usize,
) -> Result<&'a str, LoadError> {
    fields.get(column).copied().ok_or_else(|| LoadError::MissingColumn {
        path: path.to_path_buf(),
        line,
        column,
    })
}

fn parse_field(path: &Path, line: usize, fields: &[&str], column: usize) -> Result<f64, LoadError> {
    let raw = field(path, line, fields, column)?;
    let value: f64 = raw.parse().map_err(|_| LoadError::InvalidNumber {
        path: path.to_path_buf(),
        line,
        column,
        value: raw.to_string(),
    })?;
    if !value.is_finite() {
        return Err(LoadError::NonFinite {
            path: path.to_path_buf(),
            line,
            column,
            value: raw.to_string(),
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn file_with(content: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", content).unwrap();
        temp_file
    }

    #[test]
    fn test_read_column_with_rounding() {
        let file = file_with("0.91 1 512.4\n\n# comment\n0.88 1 487.6\n");
        let raw = read_column(file.path(), 2, Rounding::None).unwrap();
        assert_eq!(raw, vec![512.4, 487.6]);
        let rounded = read_column(file.path(), 2, Rounding::Nearest).unwrap();
        assert_eq!(rounded, vec![512.0, 488.0]);
    }

    #[test]
    fn test_read_id_column() {
        let file = file_with("a 3\nb 4.0\n");
        assert_eq!(read_id_column(file.path(), 1).unwrap(), vec![3, 4]);

        let file = file_with("a 3.5\n");
        assert!(matches!(
            read_id_column(file.path(), 1),
            Err(LoadError::InvalidNumber { line: 1, column: 1, .. })
        ));
    }

    #[test]
    fn test_read_id_column_out_of_range() {
        let file = file_with("a 7
b 1e30
");
        let err = read_id_column(file.path(), 1).unwrap_err();
        assert!(matches!(
            err,
            LoadError::InvalidNumber { line: 2, column: 1, ref value, .. } if value == "1e30"
        ));

        let file = file_with("a -1e19
");
        assert!(matches!(
            read_id_column(file.path(), 1),
            Err(LoadError::InvalidNumber { line: 1, .. })
        ));

        let file = file_with("a 1e3
");
        assert_eq!(read_id_column(file.path(), 1).unwrap(), vec![1000]);
    }

    #[test]
    fn test_missing_column() {
        let file = file_with("1 2 3\n1 2\n");
        let err = read_column(file.path(), 2, Rounding::None).unwrap_err();
        assert!(matches!(err, LoadError::MissingColumn { line: 2, column: 2, .. }));
    }

    #[test]
    fn test_invalid_and_non_finite() {
        let file = file_with("1 abc\n");
        assert!(matches!(
            read_column(file.path(), 1, Rounding::None),
            Err(LoadError::InvalidNumber { .. })
        ));

        let file = file_with("1 inf\n");
        assert!(matches!(
            read_column(file.path(), 1, Rounding::None),
            Err(LoadError::NonFinite { .. })
        ));
    }

    #[test]
    fn test_empty_and_missing_file() {
        let file = file_with("\n# only a comment\n");
        assert!(matches!(count_records(file.path()), Err(LoadError::Empty { .. })));

        let err = count_records(Path::new("/nonexistent/flowrank/input.txt")).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[test]
    fn test_read_endpoints() {
        let file = file_with("0 5\n2 5\n");
        assert_eq!(read_endpoints(file.path(), 0, 1).unwrap(), vec![(0, 5), (2, 5)]);
    }
}
