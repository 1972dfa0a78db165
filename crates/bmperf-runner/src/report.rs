//! Report sinks.

use std::fs::File;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::ReportError;

/// File name of the report inside the output directory.
pub const REPORT_FILE: &str = "stats.csv";

/// Append-only destination for report rows.
pub trait RowSink {
    fn write_header(&mut self, header: &[String]) -> Result<(), ReportError>;
    fn write_row(&mut self, row: &[String]) -> Result<(), ReportError>;
}

/// CSV file that is flushed after every record, so rows written before a
/// crash or interrupt are kept.
pub struct CsvReport {
    writer: csv::Writer<File>,
    path: PathBuf,
    rows: usize,
}

impl CsvReport {
    /// Create (or truncate) `path`, creating parent directories as needed.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, ReportError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ReportError::Create {
                path: path.clone(),
                source,
            })?;
        }
        let file = File::create(&path).map_err(|source| ReportError::Create {
            path: path.clone(),
            source,
        })?;
        info!(path = %path.display(), "writing report");
        Ok(Self {
            writer: csv::Writer::from_writer(file),
            path,
            rows: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Data rows written so far.
    pub fn rows(&self) -> usize {
        self.rows
    }
}

impl RowSink for CsvReport {
    fn write_header(&mut self, header: &[String]) -> Result<(), ReportError> {
        self.writer.write_record(header)?;
        self.writer.flush()?;
        Ok(())
    }

    fn write_row(&mut self, row: &[String]) -> Result<(), ReportError> {
        self.writer.write_record(row)?;
        self.writer.flush()?;
        self.rows += 1;
        Ok(())
    }
}

/// In-memory sink.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryReport {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RowSink for MemoryReport {
    fn write_header(&mut self, header: &[String]) -> Result<(), ReportError> {
        self.header = header.to_vec();
        Ok(())
    }

    fn write_row(&mut self, row: &[String]) -> Result<(), ReportError> {
        self.rows.push(row.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cells(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn rows_are_visible_before_close() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output").join(REPORT_FILE);
        let mut report = CsvReport::create(&path).unwrap();
        let header = cells(&["name", "shape", "time(ms)"]);
        let row = cells(&["resnet50", "1x3x224x224", "2.000"]);
        report.write_header(&header).unwrap();
        report.write_row(&row).unwrap();
        assert_eq!(report.rows(), 1);

        let text = std::fs::read_to_string(report.path()).unwrap();
        assert_eq!(text, "name,shape,time(ms)\nresnet50,1x3x224x224,2.000\n");
    }

    #[test]
    fn cells_with_commas_are_quoted() {
        let dir = tempfile::tempdir().unwrap();
        let mut report = CsvReport::create(dir.path().join(REPORT_FILE)).unwrap();
        report.write_row(&cells(&["m", "[1, 2]"])).unwrap();
        let text = std::fs::read_to_string(report.path()).unwrap();
        assert_eq!(text, "m,\"[1, 2]\"\n");
    }

    #[test]
    fn memory_report_collects() {
        let mut report = MemoryReport::default();
        report.write_header(&cells(&["name"])).unwrap();
        report.write_row(&cells(&["a"])).unwrap();
        report.write_row(&cells(&["b"])).unwrap();
        assert_eq!(report.rows, vec![cells(&["a"]), cells(&["b"])]);
    }
}
