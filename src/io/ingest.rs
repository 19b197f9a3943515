//! CSV ingest.
//!
//! Turns an `x,y` CSV into `Observations`.
//!
//! Design goals:
//! - **Strict schema**: both `x` and `y` columns must exist (case-insensitive)
//! - **Fail fast**: any unparsable or missing value aborts the load with its line
//!   number, before any optimization starts
//! - **Separation of concerns**: no fitting logic here

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use csv::StringRecord;
use log::info;

use crate::domain::{DatasetStats, Observations};
use crate::error::AppError;

/// Load observed points from a CSV file with `x` and `y` columns.
pub fn load_observations(path: &Path) -> Result<Observations, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::data(format!("Could not open '{}': {e}", path.display())))?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| {
            AppError::data(format!(
                "Failed to read CSV headers from '{}': {e}",
                path.display()
            ))
        })?
        .clone();

    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(AppError::data(format!("'{}' is empty.", path.display())));
    }

    let header_map = build_header_map(&headers);
    let x_idx = required_column(&header_map, "x")?;
    let y_idx = required_column(&header_map, "y")?;

    let mut x = Vec::new();
    let mut y = Vec::new();

    for (idx, result) in reader.records().enumerate() {
        // +2: records start after the header and lines are 1-based.
        let line = idx + 2;
        let record = result
            .map_err(|e| AppError::data(format!("CSV parse error on line {line}: {e}")))?;

        if record.iter().all(|field| field.is_empty()) {
            continue;
        }

        x.push(parse_value(&record, x_idx, "x", line)?);
        y.push(parse_value(&record, y_idx, "y", line)?);
    }

    if x.len() != y.len() {
        return Err(AppError::data("Number of x and y values must be equal."));
    }
    if x.is_empty() {
        return Err(AppError::data(format!("'{}' has no data rows.", path.display())));
    }

    info!("Loaded {} data points from {}", x.len(), path.display());
    Ok(Observations { x, y })
}

/// Summary of the loaded points plus the `t` range they are fitted over.
pub fn compute_stats(obs: &Observations, t_min: f64, t_max: f64) -> Option<DatasetStats> {
    if obs.is_empty() {
        return None;
    }

    let (x_min, x_max) = min_max(&obs.x);
    let (y_min, y_max) = min_max(&obs.y);
    let n = obs.len() as f64;

    Some(DatasetStats {
        n_points: obs.len(),
        x_range: (x_min, x_max),
        y_range: (y_min, y_max),
        x_mean: obs.x.iter().sum::<f64>() / n,
        y_mean: obs.y.iter().sum::<f64>() / n,
        t_range: (t_min, t_max),
    })
}

fn min_max(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    let mut map = HashMap::new();
    for (idx, name) in headers.iter().enumerate() {
        // First occurrence wins for duplicated headers.
        map.entry(normalize_header_name(name)).or_insert(idx);
    }
    map
}

fn normalize_header_name(name: &str) -> String {
    // Excel and other tools sometimes emit UTF-8 CSVs with a BOM prefix on the
    // first header. If we don't strip it, schema validation will incorrectly
    // report a missing `x` column.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn required_column(header_map: &HashMap<String, usize>, name: &str) -> Result<usize, AppError> {
    header_map
        .get(name)
        .copied()
        .ok_or_else(|| {
            AppError::data(format!(
                "CSV file must contain 'x' and 'y' columns (missing `{name}`)."
            ))
        })
}

fn parse_value(
    record: &StringRecord,
    idx: usize,
    name: &str,
    line: usize,
) -> Result<f64, AppError> {
    let raw = record
        .get(idx)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::data(format!("Missing `{name}` value on line {line}.")))?;
    let v = raw
        .parse::<f64>()
        .map_err(|_| AppError::data(format!("Invalid `{name}` value '{raw}' on line {line}.")))?;
    if v.is_finite() {
        Ok(v)
    } else {
        Err(AppError::data(format!("Non-finite `{name}` value on line {line}.")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn csv_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn loads_x_and_y_columns() {
        let file = csv_file("x,y\n1.5,42.0\n2.0,43.25\n3,44\n");
        let obs = load_observations(file.path()).unwrap();
        assert_eq!(obs.x, vec![1.5, 2.0, 3.0]);
        assert_eq!(obs.y, vec![42.0, 43.25, 44.0]);
    }

    #[test]
    fn header_lookup_ignores_case_bom_and_extra_columns() {
        let file = csv_file("\u{feff}id, Y ,X\na,10,1\nb,20,2\n");
        let obs = load_observations(file.path()).unwrap();
        assert_eq!(obs.x, vec![1.0, 2.0]);
        assert_eq!(obs.y, vec![10.0, 20.0]);
    }

    #[test]
    fn missing_y_column_is_a_data_error() {
        let file = csv_file("x\n1\n2\n");
        let err = load_observations(file.path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Data);
        assert!(err.to_string().contains("`y`"));
    }

    #[test]
    fn empty_file_is_a_data_error() {
        let file = csv_file("");
        let err = load_observations(file.path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Data);
    }

    #[test]
    fn header_only_file_is_a_data_error() {
        let file = csv_file("x,y\n");
        let err = load_observations(file.path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Data);
        assert!(err.to_string().contains("no data rows"));
    }

    #[test]
    fn nonexistent_path_is_a_data_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_observations(&dir.path().join("missing.csv")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Data);
    }

    #[test]
    fn bad_value_reports_line_number() {
        let file = csv_file("x,y\n1,2\n3,abc\n");
        let err = load_observations(file.path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Data);
        assert!(err.to_string().contains("line 3"), "{err}");
    }

    #[test]
    fn short_row_is_a_data_error() {
        let file = csv_file("x,y\n1,2\n3\n");
        let err = load_observations(file.path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Data);
        assert!(err.to_string().contains("Missing `y`"), "{err}");
    }

    #[test]
    fn stats_cover_ranges_and_means() {
        let obs = Observations {
            x: vec![1.0, 3.0, 5.0],
            y: vec![40.0, 44.0, 42.0],
        };
        let stats = compute_stats(&obs, 6.0, 60.0).unwrap();
        assert_eq!(stats.n_points, 3);
        assert_eq!(stats.x_range, (1.0, 5.0));
        assert_eq!(stats.y_range, (40.0, 44.0));
        assert_eq!(stats.x_mean, 3.0);
        assert_eq!(stats.y_mean, 42.0);
        assert_eq!(stats.t_range, (6.0, 60.0));
    }
}
