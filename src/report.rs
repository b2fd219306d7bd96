//! CSV report generation for Insights query results, plus the naming rules
//! for report files and bucket keys.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use thiserror::Error;

use crate::types::ResultField;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("query returned no rows; nothing to write")]
    EmptyResultSet,
    #[error("report io error: {0}")]
    Io(#[from] io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

/// One query result record as an ordered field → value mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultRow {
    fields: Vec<(String, String)>,
}

impl ResultRow {
    /// Later duplicates of a field overwrite the value but keep the first position.
    pub fn from_fields(fields: &[ResultField]) -> Self {
        let mut row = Self::default();
        for f in fields {
            row.insert(&f.field, &f.value);
        }
        row
    }

    pub fn insert(&mut self, key: &str, value: &str) {
        match self.fields.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value.to_string(),
            None => self.fields.push((key.to_string(), value.to_string())),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

pub fn flatten_records(records: &[Vec<ResultField>]) -> Vec<ResultRow> {
    records.iter().map(|r| ResultRow::from_fields(r)).collect()
}

/// Writes `rows` as CSV. The header is fixed by the first row: a later row's
/// missing fields are written empty and its extra fields are dropped.
pub fn write_csv<W: io::Write>(rows: &[ResultRow], writer: W) -> Result<(), ReportError> {
    let first = rows.first().ok_or(ReportError::EmptyResultSet)?;
    let header: Vec<&str> = first.keys().collect();

    let mut wtr = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);
    wtr.write_record(&header)?;

    for (idx, row) in rows.iter().enumerate() {
        let extra = row.keys().filter(|k| !header.contains(k)).count();
        if extra > 0 {
            tracing::warn!(row = idx, extra, "Dropping fields not present in header row");
        }
        wtr.write_record(header.iter().map(|k| row.get(k).unwrap_or("")))?;
    }

    wtr.flush()?;
    Ok(())
}

/// `{job}-{yyyy}-{mm}-{dd}-{HH}-{MM}-{SS}.csv`
pub fn report_filename(job_name: &str, now: DateTime<Utc>) -> String {
    format!("{}-{}.csv", job_name, now.format("%Y-%m-%d-%H-%M-%S"))
}

/// Joins a bucket prefix and a leaf without doubling or leading slashes.
pub fn object_key(prefix: &str, leaf: &str) -> String {
    let prefix = prefix.trim_matches('/');
    let leaf = leaf.trim_start_matches('/');
    if prefix.is_empty() {
        leaf.to_string()
    } else {
        format!("{prefix}/{leaf}")
    }
}

/// Date partition used for export task output: `{prefix}/{year}/{month}/{day}`,
/// unpadded to match the existing bucket layout.
pub fn date_prefix(prefix: &str, date: NaiveDate) -> String {
    object_key(
        prefix,
        &format!("{}/{}/{}", date.year(), date.month(), date.day()),
    )
}

/// A CSV report in scratch storage. The file is removed when dropped.
#[derive(Debug)]
pub struct ReportFile {
    path: PathBuf,
    filename: String,
}

impl ReportFile {
    pub fn write(dir: &Path, filename: &str, rows: &[ResultRow]) -> Result<Self, ReportError> {
        if rows.is_empty() {
            return Err(ReportError::EmptyResultSet);
        }
        std::fs::create_dir_all(dir)?;
        let path = dir.join(filename);
        let report = Self {
            path,
            filename: filename.to_string(),
        };
        write_csv(rows, File::create(&report.path)?)?;
        Ok(report)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }
}

impl Drop for ReportFile {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove scratch report");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn row(pairs: &[(&str, &str)]) -> Vec<ResultField> {
        pairs.iter().map(|(k, v)| ResultField::new(*k, *v)).collect()
    }

    fn to_csv(rows: &[ResultRow]) -> String {
        let mut buf = Vec::new();
        write_csv(rows, &mut buf).expect("csv");
        String::from_utf8(buf).expect("utf8")
    }

    #[test]
    fn single_count_row() {
        let rows = flatten_records(&[row(&[("count(*)", "42")])]);
        assert_eq!(to_csv(&rows), "count(*)\n42\n");
    }

    #[test]
    fn header_comes_from_first_row() {
        let rows = flatten_records(&[
            row(&[("ip", "10.0.0.1"), ("hits", "3")]),
            row(&[("hits", "7"), ("ip", "10.0.0.2"), ("country", "KR")]),
            row(&[("ip", "10.0.0.3")]),
        ]);
        assert_eq!(
            to_csv(&rows),
            "ip,hits\n10.0.0.1,3\n10.0.0.2,7\n10.0.0.3,\n"
        );
    }

    #[test]
    fn values_needing_quotes_are_escaped() {
        let rows = flatten_records(&[row(&[("@message", "GET /a,b \"x\"")])]);
        assert_eq!(to_csv(&rows), "@message\n\"GET /a,b \"\"x\"\"\"\n");
    }

    #[test]
    fn duplicate_fields_keep_first_position_and_last_value() {
        let r = ResultRow::from_fields(&row(&[("a", "1"), ("b", "2"), ("a", "3")]));
        assert_eq!(r.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(r.get("a"), Some("3"));
    }

    #[test]
    fn empty_result_set_is_an_error() {
        let mut buf = Vec::new();
        assert!(matches!(
            write_csv(&[], &mut buf),
            Err(ReportError::EmptyResultSet)
        ));
        assert!(buf.is_empty());
    }

    #[test]
    fn filename_is_zero_padded() {
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 9, 7, 2).unwrap();
        assert_eq!(
            report_filename("waf-insights", now),
            "waf-insights-2024-03-05-09-07-02.csv"
        );
    }

    #[test]
    fn keys_never_start_with_slash() {
        assert_eq!(object_key("", "a.csv"), "a.csv");
        assert_eq!(object_key("reports/", "a.csv"), "reports/a.csv");
        assert_eq!(object_key("/reports", "a.csv"), "reports/a.csv");
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(date_prefix("waf", date), "waf/2024/3/5");
        assert_eq!(date_prefix("", date), "2024/3/5");
    }

    #[test]
    fn report_file_is_removed_on_drop() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let rows = flatten_records(&[row(&[("count", "1")])]);
        let path = {
            let report = ReportFile::write(tmp.path(), "r.csv", &rows).expect("write");
            assert_eq!(
                std::fs::read_to_string(report.path()).unwrap(),
                "count\n1\n"
            );
            report.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn empty_rows_create_no_file() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let result = ReportFile::write(tmp.path(), "r.csv", &[]);
        assert!(matches!(result, Err(ReportError::EmptyResultSet)));
        assert!(!tmp.path().join("r.csv").exists());
    }
}
